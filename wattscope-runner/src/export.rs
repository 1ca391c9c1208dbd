//! Report export: JSON, CSV and Markdown artifacts.
//!
//! - **JSON**: the full quality report
//! - **CSV**: per-column summaries and outlier fences for spreadsheet tools
//! - **Markdown**: a short human-readable summary of a run

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use wattscope_core::data::{save_table, FileFormat};
use wattscope_core::quality::{ColumnSummary, QualityReport};

use crate::runner::AnalysisRun;

// ─── JSON export ────────────────────────────────────────────────────

pub fn report_json(report: &QualityReport) -> Result<String> {
    serde_json::to_string_pretty(report).context("failed to serialize QualityReport to JSON")
}

// ─── CSV export ─────────────────────────────────────────────────────

fn opt(v: Option<f64>) -> String {
    v.map(|x| format!("{x:.6}")).unwrap_or_default()
}

/// One row per column. Numeric and categorical columns share the header;
/// fields that do not apply are left empty.
pub fn describe_csv(report: &QualityReport) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record([
        "column", "kind", "count", "mean", "std", "min", "25%", "50%", "75%", "max", "unique",
        "top", "freq",
    ])?;

    for (name, summary) in &report.describe {
        match summary {
            ColumnSummary::Numeric(s) => wtr.write_record([
                name.as_str(),
                "numeric",
                &s.count.to_string(),
                &opt(s.mean),
                &opt(s.std),
                &opt(s.min),
                &opt(s.q25),
                &opt(s.q50),
                &opt(s.q75),
                &opt(s.max),
                "",
                "",
                "",
            ])?,
            ColumnSummary::Categorical(s) => wtr.write_record([
                name.as_str(),
                "categorical",
                &s.count.to_string(),
                "",
                "",
                "",
                "",
                "",
                "",
                "",
                &s.unique.to_string(),
                &s.top.as_ref().map(ToString::to_string).unwrap_or_default(),
                &s.freq.map(|f| f.to_string()).unwrap_or_default(),
            ])?,
        }
    }

    let data = wtr.into_inner().context("failed to flush CSV writer")?;
    String::from_utf8(data).context("CSV output is not valid UTF-8")
}

/// Columns with outliers: count, percent and fences. Header only when none.
pub fn outliers_csv(report: &QualityReport) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record(["column", "count", "percent", "lower", "upper"])?;
    for (name, o) in report.outliers.iter() {
        wtr.write_record([
            name.as_str(),
            &o.count.to_string(),
            &o.percent,
            &format!("{:.6}", o.limits[0]),
            &format!("{:.6}", o.limits[1]),
        ])?;
    }
    let data = wtr.into_inner().context("failed to flush CSV writer")?;
    String::from_utf8(data).context("CSV output is not valid UTF-8")
}

// ─── Markdown ───────────────────────────────────────────────────────

fn report_section(md: &mut String, title: &str, report: &QualityReport) {
    md.push_str(&format!("## {title}\n\n"));
    md.push_str("| Metric | Value |\n");
    md.push_str("| --- | --- |\n");
    md.push_str(&format!(
        "| Shape | {} rows × {} columns |\n",
        report.shape.rows, report.shape.columns
    ));
    md.push_str(&format!(
        "| Missing values | {} |\n",
        report.missing_values.total
    ));
    md.push_str(&format!("| Duplicate rows | {} |\n", report.duplicates.total));
    if report.outliers.is_none_detected() {
        md.push_str("| Outliers | none detected |\n");
    } else {
        md.push_str(&format!(
            "| Outliers | {} columns |\n",
            report.outliers.len()
        ));
    }
    md.push('\n');

    if !report.missing_values.by_column.is_empty() {
        md.push_str("Missing by column:\n\n");
        for (column, n) in &report.missing_values.by_column {
            md.push_str(&format!("- `{column}`: {n}\n"));
        }
        md.push('\n');
    }

    if !report.outliers.is_none_detected() {
        md.push_str("| Column | Outliers | Share | Lower | Upper |\n");
        md.push_str("| --- | --- | --- | --- | --- |\n");
        for (column, o) in report.outliers.iter() {
            md.push_str(&format!(
                "| {column} | {} | {} | {:.3} | {:.3} |\n",
                o.count, o.percent, o.limits[0], o.limits[1]
            ));
        }
        md.push('\n');
    }
}

pub fn markdown_summary(run: &AnalysisRun) -> String {
    let mut md = String::new();
    md.push_str("# Data Quality Summary\n\n");
    md.push_str("| Field | Value |\n");
    md.push_str("| --- | --- |\n");
    md.push_str(&format!("| Source | {} |\n", run.source));
    md.push_str(&format!("| Run ID | {} |\n", run.run_id));
    md.push_str(&format!("| Dataset Hash | {} |\n", run.dataset_hash));
    md.push_str(&format!("| Config Hash | {} |\n", run.config_hash));
    if run.from_cache {
        md.push_str("| Processed table | cached |\n");
    }
    md.push('\n');

    report_section(&mut md, "Raw Data", &run.raw_report);
    report_section(&mut md, "Processed Data", &run.processed_report);
    md
}

// ─── Artifact bundle ────────────────────────────────────────────────

/// Write the artifact set for a run into `output_dir`:
/// - `raw_report.json`, `processed_report.json`
/// - `describe.csv`, `outliers.csv` (processed table)
/// - `summary.md`
/// - `processed.parquet`
pub fn save_artifacts(run: &AnalysisRun, output_dir: &Path) -> Result<PathBuf> {
    fs::create_dir_all(output_dir)
        .with_context(|| format!("failed to create artifact dir: {}", output_dir.display()))?;

    fs::write(output_dir.join("raw_report.json"), report_json(&run.raw_report)?)?;
    fs::write(
        output_dir.join("processed_report.json"),
        report_json(&run.processed_report)?,
    )?;
    fs::write(output_dir.join("describe.csv"), describe_csv(&run.processed_report)?)?;
    fs::write(output_dir.join("outliers.csv"), outliers_csv(&run.processed_report)?)?;
    fs::write(output_dir.join("summary.md"), markdown_summary(run))?;
    save_table(
        &run.processed,
        &output_dir.join("processed.parquet"),
        FileFormat::Parquet,
    )
    .context("failed to write processed table")?;

    Ok(output_dir.to_path_buf())
}

#[cfg(test)]
mod tests {
    use super::*;
    use wattscope_core::quality::check;
    use wattscope_core::{Column, Table};

    fn report() -> QualityReport {
        let table = Table::new(vec![
            Column::ints("x", [1, 2, 3, 4, 100].map(Some)),
            Column::strs("zone", [Some("a"), Some("a"), None, Some("b"), Some("c")]),
        ])
        .unwrap();
        check(&table, &[1, 1, 1]).unwrap()
    }

    #[test]
    fn describe_csv_has_row_per_column() {
        let csv = describe_csv(&report()).unwrap();
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("column,kind,count,mean"));
        assert!(lines[1].starts_with("x,numeric,5,22.000000"));
        assert!(lines[2].starts_with("zone,categorical,4,"));
        assert!(lines[2].ends_with(",3,a,2"));
    }

    #[test]
    fn outliers_csv_lists_fences() {
        let csv = outliers_csv(&report()).unwrap();
        assert_eq!(csv.lines().count(), 2);
        assert!(csv.contains("x,1,20.00%,-1.000000,7.000000"));
    }

    #[test]
    fn outliers_csv_header_only_when_clean() {
        let table = Table::new(vec![Column::ints("x", [1, 2, 3].map(Some))]).unwrap();
        let report = check(&table, &[1, 1, 1]).unwrap();
        assert_eq!(outliers_csv(&report).unwrap(), "column,count,percent,lower,upper\n");
    }

    #[test]
    fn report_json_uses_sentinel() {
        let table = Table::new(vec![Column::ints("x", [1, 2, 3].map(Some))]).unwrap();
        let json = report_json(&check(&table, &[3, 3, 3]).unwrap()).unwrap();
        assert!(json.contains("\"outliers\": \"no significant outliers detected\""));
    }
}
