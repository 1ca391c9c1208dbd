//! Data quality report.
//!
//! `check` produces a [`QualityReport`] with seven sections: shape, column
//! types, head/middle/tail samples, per-column summaries, missing values,
//! duplicate rows and IQR outliers. Empty tables produce well-formed empty
//! sections; the only error is a malformed sample-size list.

pub mod describe;
pub mod duplicates;
pub mod outliers;
pub mod stats;

pub use describe::{describe, CategoricalSummary, ColumnSummary, NumericSummary};
pub use duplicates::{duplicate_rows, find_duplicates, Duplicates};
pub use outliers::{detect_outliers, ColumnOutliers, Outliers, NO_OUTLIERS_MESSAGE};

use crate::table::{Record, Table};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;
use tracing::{debug, info};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReportError {
    #[error("sample sizes must have exactly 3 elements (head, middle, tail), got {0}")]
    InvalidSampleSizes(usize),
}

/// Rows shown in the head, middle and tail samples.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<usize>", into = "Vec<usize>")]
pub struct SampleSizes {
    pub head: usize,
    pub middle: usize,
    pub tail: usize,
}

impl SampleSizes {
    pub fn new(head: usize, middle: usize, tail: usize) -> Self {
        Self { head, middle, tail }
    }
}

impl Default for SampleSizes {
    fn default() -> Self {
        Self::new(3, 3, 3)
    }
}

impl From<usize> for SampleSizes {
    fn from(n: usize) -> Self {
        Self::new(n, n, n)
    }
}

impl TryFrom<&[usize]> for SampleSizes {
    type Error = ReportError;

    fn try_from(sizes: &[usize]) -> Result<Self, Self::Error> {
        match *sizes {
            [head, middle, tail] => Ok(Self::new(head, middle, tail)),
            _ => Err(ReportError::InvalidSampleSizes(sizes.len())),
        }
    }
}

impl TryFrom<Vec<usize>> for SampleSizes {
    type Error = ReportError;

    fn try_from(sizes: Vec<usize>) -> Result<Self, Self::Error> {
        Self::try_from(sizes.as_slice())
    }
}

impl From<SampleSizes> for Vec<usize> {
    fn from(s: SampleSizes) -> Self {
        vec![s.head, s.middle, s.tail]
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Shape {
    pub rows: usize,
    pub columns: usize,
}

impl PartialEq<(usize, usize)> for Shape {
    fn eq(&self, other: &(usize, usize)) -> bool {
        (self.rows, self.columns) == *other
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Samples {
    pub head: Vec<Record>,
    pub middle: Vec<Record>,
    pub tail: Vec<Record>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MissingValues {
    pub total: usize,
    /// Only columns with at least one missing cell.
    pub by_column: BTreeMap<String, usize>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QualityReport {
    pub shape: Shape,
    pub dtypes: BTreeMap<String, String>,
    pub samples: Samples,
    pub describe: BTreeMap<String, ColumnSummary>,
    pub missing_values: MissingValues,
    pub duplicates: Duplicates,
    pub outliers: Outliers,
}

/// Build a report with `sizes = [head, middle, tail]`.
///
/// Duplicate examples are drawn from the thread RNG; use
/// [`check_with_rng`] for reproducible output.
pub fn check(table: &Table, sizes: &[usize]) -> Result<QualityReport, ReportError> {
    let sizes = SampleSizes::try_from(sizes)?;
    Ok(check_with_rng(table, sizes, &mut rand::thread_rng()))
}

pub fn check_with_rng<R: Rng + ?Sized>(
    table: &Table,
    sizes: SampleSizes,
    rng: &mut R,
) -> QualityReport {
    info!(rows = table.height(), columns = table.width(), "checking data quality");

    let (rows, columns) = table.shape();
    let dtypes = table
        .columns()
        .iter()
        .map(|c| (c.name().to_string(), c.dtype().type_name().to_string()))
        .collect();

    let report = QualityReport {
        shape: Shape { rows, columns },
        dtypes,
        samples: samples(table, sizes),
        describe: describe(table),
        missing_values: missing_values(table),
        duplicates: find_duplicates(table, rng),
        outliers: detect_outliers(table),
    };
    debug!(
        missing = report.missing_values.total,
        duplicates = report.duplicates.total,
        outlier_columns = report.outliers.len(),
        "quality report complete"
    );
    report
}

/// Head, middle and tail rows. The middle sample spans
/// `[len/2 - n/2, len/2 + n/2)`, clamped to the table.
pub fn samples(table: &Table, sizes: SampleSizes) -> Samples {
    let mid = table.height() / 2;
    let half = sizes.middle / 2;
    Samples {
        head: table.head(sizes.head),
        middle: table.records(mid.saturating_sub(half)..mid + half),
        tail: table.tail(sizes.tail),
    }
}

pub fn missing_values(table: &Table) -> MissingValues {
    let by_column: BTreeMap<String, usize> = table
        .columns()
        .iter()
        .map(|c| (c.name().to_string(), c.null_count()))
        .filter(|(_, n)| *n > 0)
        .collect();
    MissingValues {
        total: by_column.values().sum(),
        by_column,
    }
}
