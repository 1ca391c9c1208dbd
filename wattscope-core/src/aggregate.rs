//! Temporal aggregation (resampling).
//!
//! Rows are grouped into fixed-width buckets anchored at midnight of the day
//! of the earliest timestamp. Every bucket between the first and the last
//! populated one produces exactly one output row, labelled by its start;
//! empty buckets carry nulls. The aggregation schema is an ordered list of
//! `(source, function, output)` rules, so output naming can never drift out
//! of step with the functions applied.

use crate::table::{Column, ColumnData, DType, Table, TableError};
use chrono::{Duration, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum AggregateError {
    #[error("unsupported aggregation function '{0}' (supported: mean, sum, min, max, count)")]
    UnsupportedFunction(String),

    #[error("invalid frequency '{0}' (expected e.g. 'h', '15min', 'D', '7D', 'W')")]
    InvalidFrequency(String),

    #[error("aggregation schema is empty")]
    EmptySchema,

    #[error("aggregation schema produces {functions} columns but the naming schema has {names} names")]
    NamingMismatch { functions: usize, names: usize },

    #[error("duplicate output column '{0}'")]
    DuplicateOutput(String),

    #[error("index column '{0}' not found")]
    MissingIndex(String),

    #[error("index column '{column}' must be a timestamp column, got {actual}")]
    IndexNotTimestamp { column: String, actual: DType },

    #[error("source column '{0}' not found")]
    MissingSource(String),

    #[error("cannot apply {function} to non-numeric column '{column}' ({actual})")]
    NonNumericSource {
        column: String,
        function: AggFn,
        actual: DType,
    },

    #[error(transparent)]
    Table(#[from] TableError),
}

/// Aggregation function applied to one bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AggFn {
    Mean,
    Sum,
    Min,
    Max,
    Count,
}

impl AggFn {
    pub fn as_str(&self) -> &'static str {
        match self {
            AggFn::Mean => "mean",
            AggFn::Sum => "sum",
            AggFn::Min => "min",
            AggFn::Max => "max",
            AggFn::Count => "count",
        }
    }

    fn output_dtype(&self, source: DType) -> DType {
        match (self, source) {
            (AggFn::Sum, DType::Int) | (AggFn::Count, _) => DType::Int,
            _ => DType::Float,
        }
    }
}

impl fmt::Display for AggFn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AggFn {
    type Err = AggregateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "mean" | "avg" => Ok(AggFn::Mean),
            "sum" => Ok(AggFn::Sum),
            "min" => Ok(AggFn::Min),
            "max" => Ok(AggFn::Max),
            "count" => Ok(AggFn::Count),
            _ => Err(AggregateError::UnsupportedFunction(s.to_string())),
        }
    }
}

/// One output column: `function(source)` written as `output`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AggregationRule {
    pub source: String,
    pub function: AggFn,
    pub output: String,
}

impl AggregationRule {
    pub fn new(source: impl Into<String>, function: AggFn, output: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            function,
            output: output.into(),
        }
    }
}

/// Ordered list of aggregation rules with unique output names.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct AggregationSchema {
    rules: Vec<AggregationRule>,
}

impl AggregationSchema {
    pub fn new(rules: Vec<AggregationRule>) -> Result<Self, AggregateError> {
        if rules.is_empty() {
            return Err(AggregateError::EmptySchema);
        }
        let mut seen = HashSet::new();
        for rule in &rules {
            if !seen.insert(rule.output.as_str()) {
                return Err(AggregateError::DuplicateOutput(rule.output.clone()));
            }
        }
        Ok(Self { rules })
    }

    /// Build from a column → functions mapping plus a positional list of
    /// output names (column-then-function order).
    ///
    /// The number of (column, function) pairs must equal the number of names.
    pub fn from_legacy(
        functions: &[(String, Vec<AggFn>)],
        names: &[String],
    ) -> Result<Self, AggregateError> {
        let pairs: Vec<(&String, AggFn)> = functions
            .iter()
            .flat_map(|(source, fns)| fns.iter().map(move |f| (source, *f)))
            .collect();
        if pairs.len() != names.len() {
            return Err(AggregateError::NamingMismatch {
                functions: pairs.len(),
                names: names.len(),
            });
        }
        Self::new(
            pairs
                .into_iter()
                .zip(names)
                .map(|((source, function), output)| AggregationRule::new(source, function, output))
                .collect(),
        )
    }

    /// Weather columns averaged; each zone's consumption summed and averaged.
    pub fn power_consumption() -> Self {
        let mut rules: Vec<AggregationRule> = [
            "Temperature",
            "Humidity",
            "WindSpeed",
            "GeneralDiffuseFlows",
            "DiffuseFlows",
        ]
        .into_iter()
        .map(|c| AggregationRule::new(c, AggFn::Mean, c))
        .collect();

        for zone in 1..=3 {
            let source = format!("PowerConsumption_Zone{zone}");
            rules.push(AggregationRule::new(
                &source,
                AggFn::Sum,
                format!("TotalPowerConsumption_Zone{zone}"),
            ));
            rules.push(AggregationRule::new(
                &source,
                AggFn::Mean,
                format!("AveragePowerConsumption_Zone{zone}"),
            ));
        }
        Self { rules }
    }

    pub fn rules(&self) -> &[AggregationRule] {
        &self.rules
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

impl Default for AggregationSchema {
    fn default() -> Self {
        Self::power_consumption()
    }
}

impl<'de> Deserialize<'de> for AggregationSchema {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let rules = Vec::<AggregationRule>::deserialize(deserializer)?;
        AggregationSchema::new(rules).map_err(serde::de::Error::custom)
    }
}

/// Unit of a [`Frequency`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FreqUnit {
    Second,
    Minute,
    Hour,
    Day,
    Week,
}

impl FreqUnit {
    fn seconds(&self) -> i64 {
        match self {
            FreqUnit::Second => 1,
            FreqUnit::Minute => 60,
            FreqUnit::Hour => 3_600,
            FreqUnit::Day => 86_400,
            FreqUnit::Week => 7 * 86_400,
        }
    }

    fn alias(&self) -> &'static str {
        match self {
            FreqUnit::Second => "s",
            FreqUnit::Minute => "min",
            FreqUnit::Hour => "h",
            FreqUnit::Day => "D",
            FreqUnit::Week => "W",
        }
    }
}

/// Bucket width, parsed from an offset alias such as `h`, `15min` or `7D`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Frequency {
    multiple: u32,
    unit: FreqUnit,
}

impl Frequency {
    pub fn new(multiple: u32, unit: FreqUnit) -> Result<Self, AggregateError> {
        if multiple == 0 {
            return Err(AggregateError::InvalidFrequency(format!("0{}", unit.alias())));
        }
        Ok(Self { multiple, unit })
    }

    pub fn hourly() -> Self {
        Self {
            multiple: 1,
            unit: FreqUnit::Hour,
        }
    }

    pub fn daily() -> Self {
        Self {
            multiple: 1,
            unit: FreqUnit::Day,
        }
    }

    pub fn step(&self) -> Duration {
        Duration::seconds(i64::from(self.multiple) * self.unit.seconds())
    }
}

impl Default for Frequency {
    fn default() -> Self {
        Self::hourly()
    }
}

impl fmt::Display for Frequency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.multiple == 1 {
            f.write_str(self.unit.alias())
        } else {
            write!(f, "{}{}", self.multiple, self.unit.alias())
        }
    }
}

impl FromStr for Frequency {
    type Err = AggregateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let split = trimmed
            .find(|c: char| !c.is_ascii_digit())
            .unwrap_or(trimmed.len());
        let (digits, alias) = trimmed.split_at(split);
        let multiple = if digits.is_empty() {
            1
        } else {
            digits
                .parse::<u32>()
                .map_err(|_| AggregateError::InvalidFrequency(s.to_string()))?
        };
        let unit = match alias {
            "s" | "S" => FreqUnit::Second,
            "min" | "T" => FreqUnit::Minute,
            "h" | "H" => FreqUnit::Hour,
            "d" | "D" => FreqUnit::Day,
            "w" | "W" => FreqUnit::Week,
            _ => return Err(AggregateError::InvalidFrequency(s.to_string())),
        };
        Frequency::new(multiple, unit).map_err(|_| AggregateError::InvalidFrequency(s.to_string()))
    }
}

impl TryFrom<String> for Frequency {
    type Error = AggregateError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Frequency> for String {
    fn from(value: Frequency) -> Self {
        value.to_string()
    }
}

/// Resample `table` to `frequency` buckets keyed on `index_column`.
///
/// Output columns: the index column (bucket start), then one column per rule
/// in schema order. Rows with a missing timestamp are dropped.
pub fn aggregate(
    table: &Table,
    frequency: Frequency,
    index_column: &str,
    schema: &AggregationSchema,
) -> Result<Table, AggregateError> {
    let index = table
        .column(index_column)
        .ok_or_else(|| AggregateError::MissingIndex(index_column.to_string()))?;
    let stamps = match index.data() {
        ColumnData::Timestamp(values) => values,
        other => {
            return Err(AggregateError::IndexNotTimestamp {
                column: index_column.to_string(),
                actual: other.dtype(),
            })
        }
    };

    let mut sources = Vec::with_capacity(schema.len());
    for rule in schema.rules() {
        let source = table
            .column(&rule.source)
            .ok_or_else(|| AggregateError::MissingSource(rule.source.clone()))?;
        if !source.dtype().is_numeric() && rule.function != AggFn::Count {
            return Err(AggregateError::NonNumericSource {
                column: rule.source.clone(),
                function: rule.function,
                actual: source.dtype(),
            });
        }
        sources.push(source.data());
    }

    let buckets = assign_buckets(stamps, frequency);
    debug!(
        rows = table.height(),
        buckets = buckets.groups.len(),
        %frequency,
        "resampled table"
    );

    let mut columns = Vec::with_capacity(schema.len() + 1);
    columns.push(Column::timestamps(
        index_column,
        buckets.labels.iter().copied().map(Some),
    ));
    for (rule, source) in schema.rules().iter().zip(sources) {
        let data = aggregate_column(source, rule.function, &buckets.groups);
        columns.push(Column::new(rule.output.clone(), data));
    }
    Ok(Table::new(columns)?)
}

struct Buckets {
    labels: Vec<NaiveDateTime>,
    groups: Vec<Vec<usize>>,
}

fn assign_buckets(stamps: &[Option<NaiveDateTime>], frequency: Frequency) -> Buckets {
    let Some(earliest) = stamps.iter().flatten().min().copied() else {
        return Buckets {
            labels: Vec::new(),
            groups: Vec::new(),
        };
    };
    let origin = earliest.date().and_hms_opt(0, 0, 0).unwrap_or(earliest);
    let step_ms = frequency.step().num_milliseconds();

    let bucket_of = |ts: NaiveDateTime| (ts - origin).num_milliseconds().div_euclid(step_ms);
    let indices: Vec<Option<i64>> = stamps.iter().map(|ts| ts.map(bucket_of)).collect();
    let first = indices.iter().flatten().min().copied().unwrap_or(0);
    let last = indices.iter().flatten().max().copied().unwrap_or(0);

    let count = (last - first + 1) as usize;
    let mut groups = vec![Vec::new(); count];
    for (row, idx) in indices.iter().enumerate() {
        if let Some(idx) = idx {
            groups[(idx - first) as usize].push(row);
        }
    }
    let labels = (first..=last)
        .map(|k| origin + Duration::milliseconds(k * step_ms))
        .collect();

    Buckets { labels, groups }
}

fn aggregate_column(source: &ColumnData, function: AggFn, groups: &[Vec<usize>]) -> ColumnData {
    if function == AggFn::Count {
        return ColumnData::Int(
            groups
                .iter()
                .map(|rows| Some(rows.iter().filter(|&&r| !source.is_null(r)).count() as i64))
                .collect(),
        );
    }

    if let (AggFn::Sum, ColumnData::Int(values)) = (function, source) {
        return ColumnData::Int(
            groups
                .iter()
                .map(|rows| {
                    // overflowing sums are null
                    let mut present = rows.iter().filter_map(|&r| values[r]).peekable();
                    present.peek()?;
                    present.try_fold(0i64, i64::checked_add)
                })
                .collect(),
        );
    }

    debug_assert_eq!(function.output_dtype(source.dtype()), DType::Float);
    ColumnData::Float(
        groups
            .iter()
            .map(|rows| {
                let values: Vec<f64> = rows
                    .iter()
                    .filter_map(|&r| match source {
                        ColumnData::Int(v) => v[r].map(|x| x as f64),
                        ColumnData::Float(v) => v[r].filter(|x| !x.is_nan()),
                        _ => None,
                    })
                    .collect();
                reduce(&values, function)
            })
            .collect(),
    )
}

fn reduce(values: &[f64], function: AggFn) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    match function {
        AggFn::Mean => Some(values.iter().sum::<f64>() / values.len() as f64),
        AggFn::Sum => Some(values.iter().sum()),
        AggFn::Min => values.iter().copied().reduce(f64::min),
        AggFn::Max => values.iter().copied().reduce(f64::max),
        AggFn::Count => Some(values.len() as f64),
    }
}
