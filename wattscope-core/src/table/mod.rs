//! In-memory table model.
//!
//! Column-oriented storage with one declared type per column and nullable
//! cells. Rows are exposed as [`Record`]s for sampling and reporting.
//! Transformations never mutate a table in place; they return a new one.

mod column;
mod value;

pub use column::{Column, ColumnData};
pub use value::{DType, Record, Value};

pub(crate) use column::CellKey;

use chrono::NaiveDateTime;
use std::collections::HashSet;
use std::ops::Range;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum TableError {
    #[error("column '{0}' not found")]
    MissingColumn(String),

    #[error("duplicate column name '{0}'")]
    DuplicateColumn(String),

    #[error("column '{name}' has {actual} rows, expected {expected}")]
    LengthMismatch {
        name: String,
        expected: usize,
        actual: usize,
    },

    #[error("column '{column}': expected {expected}, got {actual}")]
    TypeMismatch {
        column: String,
        expected: DType,
        actual: DType,
    },
}

/// An ordered set of equally long, uniquely named columns.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Table {
    columns: Vec<Column>,
}

impl Table {
    pub fn new(columns: Vec<Column>) -> Result<Self, TableError> {
        let mut seen = HashSet::new();
        for col in &columns {
            if !seen.insert(col.name()) {
                return Err(TableError::DuplicateColumn(col.name().to_string()));
            }
        }
        if let Some(first) = columns.first() {
            let expected = first.len();
            if let Some(bad) = columns.iter().find(|c| c.len() != expected) {
                return Err(TableError::LengthMismatch {
                    name: bad.name().to_string(),
                    expected,
                    actual: bad.len(),
                });
            }
        }
        Ok(Self { columns })
    }

    /// Row count.
    pub fn height(&self) -> usize {
        self.columns.first().map_or(0, Column::len)
    }

    /// Column count.
    pub fn width(&self) -> usize {
        self.columns.len()
    }

    pub fn shape(&self) -> (usize, usize) {
        (self.height(), self.width())
    }

    pub fn is_empty(&self) -> bool {
        self.height() == 0
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(Column::name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.column(name).is_some()
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name() == name)
    }

    pub fn require(&self, name: &str) -> Result<&Column, TableError> {
        self.column(name)
            .ok_or_else(|| TableError::MissingColumn(name.to_string()))
    }

    /// Borrow a timestamp column's cells.
    pub fn timestamps(&self, name: &str) -> Result<&[Option<NaiveDateTime>], TableError> {
        let col = self.require(name)?;
        match col.data() {
            ColumnData::Timestamp(values) => Ok(values),
            other => Err(TableError::TypeMismatch {
                column: name.to_string(),
                expected: DType::Timestamp,
                actual: other.dtype(),
            }),
        }
    }

    /// Return a copy with `column` added, replacing any column of the same name
    /// at its existing position.
    pub fn with_column(&self, column: Column) -> Result<Table, TableError> {
        if !self.columns.is_empty() && column.len() != self.height() {
            return Err(TableError::LengthMismatch {
                name: column.name().to_string(),
                expected: self.height(),
                actual: column.len(),
            });
        }
        let mut columns = self.columns.clone();
        match columns.iter().position(|c| c.name() == column.name()) {
            Some(idx) => columns[idx] = column,
            None => columns.push(column),
        }
        Ok(Table { columns })
    }

    pub fn row(&self, index: usize) -> Record {
        self.columns
            .iter()
            .map(|c| (c.name().to_string(), c.value(index)))
            .collect()
    }

    /// Records for `range`, clamped to the available rows.
    pub fn records(&self, range: Range<usize>) -> Vec<Record> {
        let end = range.end.min(self.height());
        let start = range.start.min(end);
        (start..end).map(|i| self.row(i)).collect()
    }

    pub fn head(&self, n: usize) -> Vec<Record> {
        self.records(0..n)
    }

    pub fn tail(&self, n: usize) -> Vec<Record> {
        let len = self.height();
        self.records(len.saturating_sub(n)..len)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Table {
        Table::new(vec![
            Column::ints("a", (0..5).map(Some)),
            Column::strs("b", ["v", "w", "x", "y", "z"].map(Some)),
        ])
        .unwrap()
    }

    #[test]
    fn rejects_ragged_columns() {
        let err = Table::new(vec![
            Column::ints("a", [Some(1), Some(2)]),
            Column::ints("b", [Some(1)]),
        ])
        .unwrap_err();
        assert!(matches!(err, TableError::LengthMismatch { .. }));
    }

    #[test]
    fn rejects_duplicate_names() {
        let err = Table::new(vec![
            Column::ints("a", [Some(1)]),
            Column::ints("a", [Some(1)]),
        ])
        .unwrap_err();
        assert_eq!(err, TableError::DuplicateColumn("a".into()));
    }

    #[test]
    fn with_column_replaces_in_place() {
        let table = sample();
        let replaced = table
            .with_column(Column::ints("a", (10..15).map(Some)))
            .unwrap();
        assert_eq!(replaced.column_names().collect::<Vec<_>>(), ["a", "b"]);
        assert_eq!(replaced.row(0)["a"], Value::Int(10));
        // original untouched
        assert_eq!(table.row(0)["a"], Value::Int(0));
    }

    #[test]
    fn head_and_tail_clamp() {
        let table = sample();
        assert_eq!(table.head(10).len(), 5);
        let tail = table.tail(2);
        assert_eq!(tail.len(), 2);
        assert_eq!(tail[1]["b"], Value::Str("z".into()));
        assert!(table.records(7..9).is_empty());
    }

    #[test]
    fn timestamps_requires_timestamp_type() {
        let err = sample().timestamps("a").unwrap_err();
        assert!(matches!(err, TableError::TypeMismatch { .. }));
    }
}
