//! WattScope CLI: processing, quality checks and cache management.
//!
//! Commands:
//! - `process` resample a dataset, derive calendar features and report on both tables
//! - `check` print a data-quality report for a dataset as-is
//! - `cache status` list cached processed tables
//! - `cache clean` remove cached tables older than N days

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};
use wattscope_core::data::{save_table, DatasetSource, FileFormat, FileSource};
use wattscope_core::quality::{check_with_rng, QualityReport, SampleSizes};
use wattscope_core::rng::sampling_rng;
use wattscope_core::{fingerprint, Frequency, PipelineConfig, ValidationPolicy};
use wattscope_runner::{
    markdown_summary, report_json, run_analysis, save_artifacts, AnalysisRun, ProcessedCache,
};

#[derive(Parser)]
#[command(
    name = "wattscope",
    about = "WattScope: power-consumption time-series processing and data-quality reports"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Resample a dataset, add calendar features and report on raw and processed data.
    Process {
        /// Input dataset (csv, parquet or json).
        #[arg(long)]
        input: PathBuf,

        /// Override the format inferred from the file extension.
        #[arg(long)]
        format: Option<String>,

        /// Path to a TOML pipeline config. Defaults to the built-in hourly schema.
        #[arg(long)]
        config: Option<PathBuf>,

        /// Resampling frequency (e.g. 10min, h, 4h, D, W).
        #[arg(long)]
        freq: Option<String>,

        /// Fail on time-range violations instead of logging them.
        #[arg(long, default_value_t = false)]
        strict: bool,

        /// Seed for duplicate-example sampling.
        #[arg(long)]
        seed: Option<u64>,

        /// Write the processed table here.
        #[arg(long)]
        output: Option<PathBuf>,

        /// Format for --output. Defaults to the extension of --output.
        #[arg(long)]
        output_format: Option<String>,

        /// Cache directory. Defaults to ./cache.
        #[arg(long, default_value = "cache")]
        cache_dir: PathBuf,

        /// Always recompute the processed table.
        #[arg(long, default_value_t = false)]
        no_cache: bool,

        /// Directory for the report artifact bundle.
        #[arg(long)]
        artifacts: Option<PathBuf>,
    },
    /// Print a data-quality report for a dataset.
    Check {
        /// Input dataset (csv, parquet or json).
        #[arg(long)]
        input: PathBuf,

        /// Override the format inferred from the file extension.
        #[arg(long)]
        format: Option<String>,

        /// Rows in each of the head, middle and tail samples.
        #[arg(long, conflicts_with = "sizes")]
        sample: Option<usize>,

        /// Separate head, middle and tail sample sizes.
        #[arg(long, num_args = 3, value_names = ["HEAD", "MIDDLE", "TAIL"])]
        sizes: Option<Vec<usize>>,

        /// Seed for duplicate-example sampling.
        #[arg(long)]
        seed: Option<u64>,

        /// Print the full report as JSON.
        #[arg(long, default_value_t = false)]
        json: bool,
    },
    /// Cache management commands.
    Cache {
        #[command(subcommand)]
        action: CacheAction,
    },
}

#[derive(Subcommand)]
enum CacheAction {
    /// List cached processed tables.
    Status {
        /// Cache directory. Defaults to ./cache.
        #[arg(long, default_value = "cache")]
        cache_dir: PathBuf,
    },
    /// Remove cached tables created more than the given number of days ago.
    Clean {
        /// Remove entries older than this many days.
        #[arg(long)]
        older_than_days: u64,

        /// Cache directory. Defaults to ./cache.
        #[arg(long, default_value = "cache")]
        cache_dir: PathBuf,

        /// Actually delete (without this flag, only previews what would be removed).
        #[arg(long, default_value_t = false)]
        confirm: bool,
    },
}

/// Options for `process`, gathered from the command line.
struct ProcessArgs {
    input: PathBuf,
    format: Option<String>,
    config: Option<PathBuf>,
    freq: Option<String>,
    strict: bool,
    seed: Option<u64>,
    output: Option<PathBuf>,
    output_format: Option<String>,
    cache_dir: PathBuf,
    no_cache: bool,
    artifacts: Option<PathBuf>,
}

fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Process {
            input,
            format,
            config,
            freq,
            strict,
            seed,
            output,
            output_format,
            cache_dir,
            no_cache,
            artifacts,
        } => run_process(ProcessArgs {
            input,
            format,
            config,
            freq,
            strict,
            seed,
            output,
            output_format,
            cache_dir,
            no_cache,
            artifacts,
        }),
        Commands::Check {
            input,
            format,
            sample,
            sizes,
            seed,
            json,
        } => run_check(&input, format.as_deref(), sample, sizes, seed, json),
        Commands::Cache { action } => match action {
            CacheAction::Status { cache_dir } => run_cache_status(&cache_dir),
            CacheAction::Clean {
                older_than_days,
                cache_dir,
                confirm,
            } => run_cache_clean(&cache_dir, older_than_days, confirm),
        },
    }
}

fn open_source(input: &Path, format: Option<&str>) -> Result<FileSource> {
    let source = match format {
        Some(f) => FileSource::with_format(input, f.parse::<FileFormat>()?),
        None => FileSource::new(input)?,
    };
    Ok(source)
}

fn run_process(args: ProcessArgs) -> Result<()> {
    let mut config = match &args.config {
        Some(path) => PipelineConfig::from_file(path)?,
        None => PipelineConfig::default(),
    };
    if let Some(freq) = &args.freq {
        config.frequency = freq
            .parse::<Frequency>()
            .with_context(|| format!("invalid --freq '{freq}'"))?;
    }
    if args.strict {
        config.validation = ValidationPolicy::Strict;
    }
    if args.seed.is_some() {
        config.seed = args.seed;
    }

    let source = open_source(&args.input, args.format.as_deref())?;
    let cache = if args.no_cache {
        None
    } else {
        Some(ProcessedCache::new(&args.cache_dir)?)
    };

    let run = run_analysis(&config, &source, cache.as_ref())?;
    print_run_summary(&run);

    if let Some(path) = &args.output {
        let format = match &args.output_format {
            Some(f) => f.parse::<FileFormat>()?,
            None => FileFormat::from_path(path)?,
        };
        save_table(&run.processed, path, format)
            .with_context(|| format!("failed to write {}", path.display()))?;
        println!("Processed table saved to: {}", path.display());
    }

    if let Some(dir) = &args.artifacts {
        let out = save_artifacts(&run, dir)?;
        println!("Artifacts saved to: {}", out.display());
    }

    Ok(())
}

fn run_check(
    input: &Path,
    format: Option<&str>,
    sample: Option<usize>,
    sizes: Option<Vec<usize>>,
    seed: Option<u64>,
    json: bool,
) -> Result<()> {
    let sizes = match (sample, sizes) {
        (Some(n), _) => SampleSizes::from(n),
        (None, Some(v)) => SampleSizes::try_from(v)?,
        (None, None) => SampleSizes::default(),
    };

    let source = open_source(input, format)?;
    let table = source.load()?;
    let hash = fingerprint::dataset_hash(&table);
    let report = check_with_rng(&table, sizes, &mut sampling_rng(seed, &hash));

    if json {
        println!("{}", report_json(&report)?);
    } else {
        print_report(source.name(), &report);
    }
    Ok(())
}

fn run_cache_status(cache_dir: &Path) -> Result<()> {
    if !cache_dir.exists() {
        println!("Cache directory does not exist: {}", cache_dir.display());
        return Ok(());
    }

    let cache = ProcessedCache::new(cache_dir)?;
    let entries = cache.status()?;
    if entries.is_empty() {
        println!("Cache is empty: {}", cache_dir.display());
        return Ok(());
    }

    let total: u64 = entries.iter().map(|e| e.size_bytes).sum();
    println!("Cache: {}", cache_dir.display());
    println!("Entries: {}", entries.len());
    println!("Total size: {}", format_size(total));
    println!();
    println!(
        "{:<18} {:<24} {:<12} {:<20} {:>10}",
        "Run", "Source", "Shape", "Created", "Size"
    );
    println!("{}", "-".repeat(88));
    for e in &entries {
        println!(
            "{:<18} {:<24} {:<12} {:<20} {:>10}",
            e.meta.run_id,
            e.meta.source,
            format!("{}x{}", e.meta.rows, e.meta.columns),
            e.meta.created_at.format("%Y-%m-%d %H:%M:%S"),
            format_size(e.size_bytes)
        );
    }
    Ok(())
}

fn run_cache_clean(cache_dir: &Path, older_than_days: u64, confirm: bool) -> Result<()> {
    if !cache_dir.exists() {
        println!("Cache directory does not exist: {}", cache_dir.display());
        return Ok(());
    }
    let Ok(days) = i64::try_from(older_than_days) else {
        bail!("--older-than-days is too large: {older_than_days}");
    };

    let cache = ProcessedCache::new(cache_dir)?;
    let report = cache.clean(days, confirm)?;

    if report.matched.is_empty() {
        println!("No entries older than {older_than_days} days to remove.");
        return Ok(());
    }

    println!(
        "Found {} entr{} older than {older_than_days} days:",
        report.matched.len(),
        if report.matched.len() == 1 { "y" } else { "ies" }
    );
    for run_id in &report.matched {
        println!("  {run_id}");
    }

    if !confirm {
        println!();
        println!("Dry run: pass --confirm to actually delete.");
        return Ok(());
    }

    println!("Done. Removed {} file(s).", report.removed_files);
    Ok(())
}

// ── Output ───────────────────────────────────────────────────────────

fn format_size(bytes: u64) -> String {
    if bytes < 1024 {
        format!("{bytes} B")
    } else if bytes < 1024 * 1024 {
        format!("{:.1} KB", bytes as f64 / 1024.0)
    } else {
        format!("{:.1} MB", bytes as f64 / (1024.0 * 1024.0))
    }
}

fn print_run_summary(run: &AnalysisRun) {
    println!();
    println!("{}", markdown_summary(run));
}

fn print_report(name: &str, report: &QualityReport) {
    println!();
    println!("=== Data Quality: {name} ===");
    println!(
        "Shape:          {} rows x {} columns",
        report.shape.rows, report.shape.columns
    );
    println!();
    println!("--- Types ---");
    for (column, dtype) in &report.dtypes {
        println!("{column:<32} {dtype}");
    }
    println!();
    println!("--- Missing values ---");
    if report.missing_values.by_column.is_empty() {
        println!("none");
    }
    for (column, n) in &report.missing_values.by_column {
        println!("{column:<32} {n}");
    }
    println!("Total:          {}", report.missing_values.total);
    println!();
    println!("Duplicate rows: {}", report.duplicates.total);
    println!();
    println!("--- Outliers (1.5 x IQR) ---");
    if report.outliers.is_none_detected() {
        println!("{}", wattscope_core::quality::NO_OUTLIERS_MESSAGE);
    }
    for (column, o) in report.outliers.iter() {
        println!(
            "{column:<32} {:>6} ({:>7})  [{:.3}, {:.3}]",
            o.count, o.percent, o.limits[0], o.limits[1]
        );
    }
    println!();
}
