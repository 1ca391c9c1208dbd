//! Analysis runner: load → report → process (or reuse) → report.
//!
//! A run is identified by the dataset hash and the configuration hash, so
//! re-running the same configuration on the same data reuses the cached
//! processed table.

use thiserror::Error;
use tracing::{info, warn};

use wattscope_core::config::{ConfigError, PipelineConfig};
use wattscope_core::data::{DataError, DatasetSource};
use wattscope_core::fingerprint::dataset_hash;
use wattscope_core::quality::{check_with_rng, QualityReport};
use wattscope_core::rng::sampling_rng;
use wattscope_core::{PipelineError, ProcessingPipeline, Table};

use crate::cache::{CacheMeta, ProcessedCache};

#[derive(Debug, Error)]
pub enum RunError {
    #[error("config error: {0}")]
    Config(#[from] ConfigError),
    #[error("data error: {0}")]
    Data(#[from] DataError),
    #[error("pipeline error: {0}")]
    Pipeline(#[from] PipelineError),
    #[error("cache error: {0}")]
    Cache(String),
}

/// Everything produced by one analysis.
#[derive(Debug, Clone)]
pub struct AnalysisRun {
    pub run_id: String,
    pub source: String,
    pub dataset_hash: String,
    pub config_hash: String,
    pub raw_report: QualityReport,
    pub processed_report: QualityReport,
    pub processed: Table,
    /// Whether `processed` came from the cache.
    pub from_cache: bool,
}

/// Content-addressed id of a (dataset, configuration) pair.
pub fn run_id(dataset_hash: &str, config_hash: &str) -> String {
    let mut hasher = blake3::Hasher::new();
    hasher.update(dataset_hash.as_bytes());
    hasher.update(b":");
    hasher.update(config_hash.as_bytes());
    hasher.finalize().to_hex()[..16].to_string()
}

pub fn run_analysis(
    config: &PipelineConfig,
    source: &dyn DatasetSource,
    cache: Option<&ProcessedCache>,
) -> Result<AnalysisRun, RunError> {
    config.validate()?;

    let raw = source.load()?;
    let dataset_hash = dataset_hash(&raw);
    let config_hash = config.config_hash();
    let run_id = run_id(&dataset_hash, &config_hash);
    info!(source = source.name(), %run_id, rows = raw.height(), "starting analysis");

    let raw_report = check_with_rng(
        &raw,
        config.sample_sizes,
        &mut sampling_rng(config.seed, &dataset_hash),
    );

    let cached = match cache {
        Some(cache) => cache
            .get(&run_id)
            .map_err(|e| RunError::Cache(format!("{e:#}")))?,
        None => None,
    };
    let from_cache = cached.is_some();

    let processed = match cached {
        Some(table) => {
            info!(%run_id, "reusing cached processed table");
            table
        }
        None => {
            let processed = ProcessingPipeline::from_config(config).process(&raw)?;
            if let Some(cache) = cache {
                let meta = CacheMeta {
                    run_id: run_id.clone(),
                    dataset_hash: dataset_hash.clone(),
                    config_hash: config_hash.clone(),
                    source: source.name().to_string(),
                    rows: processed.height(),
                    columns: processed.width(),
                    created_at: chrono::Local::now().naive_local(),
                };
                if let Err(e) = cache.put(&meta, &processed) {
                    warn!(%run_id, error = %format!("{e:#}"), "failed to cache processed table");
                }
            }
            processed
        }
    };

    let processed_hash = wattscope_core::fingerprint::dataset_hash(&processed);
    let processed_report = check_with_rng(
        &processed,
        config.sample_sizes,
        &mut sampling_rng(config.seed, &processed_hash),
    );

    Ok(AnalysisRun {
        run_id,
        source: source.name().to_string(),
        dataset_hash,
        config_hash,
        raw_report,
        processed_report,
        processed,
        from_cache,
    })
}
