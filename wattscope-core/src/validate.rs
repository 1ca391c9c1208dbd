//! Time-range validation for time-indexed tables.
//!
//! Four checks run against a timestamp column:
//! 1. the column exists
//! 2. it is timestamp-typed
//! 3. successive intervals take exactly one distinct value
//! 4. that interval does not exceed the caller's maximum
//!
//! Violations are always logged. Under [`ValidationPolicy::Lenient`] they are
//! returned in the [`ValidationOutcome`] and processing continues; under
//! [`ValidationPolicy::Strict`] they become a [`ValidationError`].

use crate::table::{ColumnData, DType, Table};
use chrono::{Duration, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use thiserror::Error;
use tracing::error;

/// Whether validation violations stop processing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValidationPolicy {
    /// Log violations and keep going.
    #[default]
    Lenient,
    /// Fail on the first check that reports violations.
    Strict,
}

/// A single failed check.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Violation {
    #[error("column '{column}' not found in table")]
    MissingColumn { column: String },

    #[error("column '{column}' must be timestamp type, got {actual}")]
    NotTimestamp { column: String, actual: DType },

    #[error("time intervals between records must be constant ({distinct} distinct intervals in '{column}')")]
    NonConstantInterval { column: String, distinct: usize },

    #[error(
        "time interval ({}) exceeds maximum allowed ({})",
        format_interval(.interval),
        format_interval(.max)
    )]
    IntervalExceeded {
        column: String,
        interval: Duration,
        max: Duration,
    },
}

/// Result of running the checks on one column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationOutcome {
    pub column: String,
    pub violations: Vec<Violation>,
}

impl ValidationOutcome {
    pub fn is_ok(&self) -> bool {
        self.violations.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("time-range validation failed for '{column}': {summary}")]
    Violations {
        column: String,
        summary: String,
        violations: Vec<Violation>,
    },
}

/// Validator with an explicit strict/lenient policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TimeRangeValidator {
    policy: ValidationPolicy,
}

impl TimeRangeValidator {
    pub fn new(policy: ValidationPolicy) -> Self {
        Self { policy }
    }

    pub fn lenient() -> Self {
        Self::new(ValidationPolicy::Lenient)
    }

    pub fn strict() -> Self {
        Self::new(ValidationPolicy::Strict)
    }

    pub fn policy(&self) -> ValidationPolicy {
        self.policy
    }

    /// Run all checks, log each violation, and apply the policy.
    pub fn check(
        &self,
        table: &Table,
        column: &str,
        max_interval: Duration,
    ) -> Result<ValidationOutcome, ValidationError> {
        let outcome = inspect(table, column, max_interval);
        for violation in &outcome.violations {
            error!(column, %violation, "time-range validation");
        }

        if self.policy == ValidationPolicy::Strict && !outcome.is_ok() {
            let summary = outcome
                .violations
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join("; ");
            return Err(ValidationError::Violations {
                column: outcome.column,
                summary,
                violations: outcome.violations,
            });
        }
        Ok(outcome)
    }
}

/// Lenient validation: logs violations and always returns `true`.
pub fn validate(table: &Table, column: &str, max_interval: Duration) -> bool {
    // Lenient check never returns Err.
    let _ = TimeRangeValidator::lenient().check(table, column, max_interval);
    true
}

/// Run the four checks without logging or policy.
pub fn inspect(table: &Table, column: &str, max_interval: Duration) -> ValidationOutcome {
    let mut violations = Vec::new();

    match table.column(column).map(|c| c.data()) {
        None => violations.push(Violation::MissingColumn {
            column: column.to_string(),
        }),
        Some(ColumnData::Timestamp(values)) => {
            let intervals = successive_intervals(values);
            let distinct: BTreeSet<Duration> = intervals.iter().copied().collect();
            if distinct.len() > 1 {
                violations.push(Violation::NonConstantInterval {
                    column: column.to_string(),
                    distinct: distinct.len(),
                });
            }
            if let Some(&interval) = intervals.first() {
                if interval > max_interval {
                    violations.push(Violation::IntervalExceeded {
                        column: column.to_string(),
                        interval,
                        max: max_interval,
                    });
                }
            }
        }
        Some(other) => violations.push(Violation::NotTimestamp {
            column: column.to_string(),
            actual: other.dtype(),
        }),
    }

    ValidationOutcome {
        column: column.to_string(),
        violations,
    }
}

/// Differences between consecutive non-missing timestamps.
pub fn successive_intervals(values: &[Option<NaiveDateTime>]) -> Vec<Duration> {
    values
        .windows(2)
        .filter_map(|pair| match pair {
            [Some(a), Some(b)] => Some(*b - *a),
            _ => None,
        })
        .collect()
}

/// Render an interval the way offset aliases read (`6h`, `1d`, `10min`).
pub fn format_interval(interval: &Duration) -> String {
    let secs = interval.num_seconds();
    if secs != 0 && secs % 86_400 == 0 {
        format!("{}d", secs / 86_400)
    } else if secs != 0 && secs % 3_600 == 0 {
        format!("{}h", secs / 3_600)
    } else if secs != 0 && secs % 60 == 0 {
        format!("{}min", secs / 60)
    } else {
        format!("{secs}s")
    }
}
