use super::value::{DType, Value};
use chrono::NaiveDateTime;

/// Typed cell storage for one column. `None` is a missing cell.
#[derive(Debug, Clone, PartialEq)]
pub enum ColumnData {
    Int(Vec<Option<i64>>),
    Float(Vec<Option<f64>>),
    Str(Vec<Option<String>>),
    Timestamp(Vec<Option<NaiveDateTime>>),
}

impl ColumnData {
    /// Empty storage of the given type.
    pub fn empty(dtype: DType) -> Self {
        match dtype {
            DType::Int => ColumnData::Int(Vec::new()),
            DType::Float => ColumnData::Float(Vec::new()),
            DType::Str => ColumnData::Str(Vec::new()),
            DType::Timestamp => ColumnData::Timestamp(Vec::new()),
        }
    }

    pub fn len(&self) -> usize {
        match self {
            ColumnData::Int(v) => v.len(),
            ColumnData::Float(v) => v.len(),
            ColumnData::Str(v) => v.len(),
            ColumnData::Timestamp(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn dtype(&self) -> DType {
        match self {
            ColumnData::Int(_) => DType::Int,
            ColumnData::Float(_) => DType::Float,
            ColumnData::Str(_) => DType::Str,
            ColumnData::Timestamp(_) => DType::Timestamp,
        }
    }

    /// Whether the cell at `row` is missing. Float NaN counts as missing.
    pub fn is_null(&self, row: usize) -> bool {
        match self {
            ColumnData::Int(v) => v[row].is_none(),
            ColumnData::Float(v) => v[row].map_or(true, f64::is_nan),
            ColumnData::Str(v) => v[row].is_none(),
            ColumnData::Timestamp(v) => v[row].is_none(),
        }
    }

    pub fn null_count(&self) -> usize {
        (0..self.len()).filter(|&i| self.is_null(i)).count()
    }

    pub fn value(&self, row: usize) -> Value {
        match self {
            ColumnData::Int(v) => v[row].map_or(Value::Null, Value::Int),
            ColumnData::Float(v) => match v[row] {
                Some(x) if !x.is_nan() => Value::Float(x),
                _ => Value::Null,
            },
            ColumnData::Str(v) => v[row].clone().map_or(Value::Null, Value::Str),
            ColumnData::Timestamp(v) => v[row].map_or(Value::Null, Value::Timestamp),
        }
    }

    /// Non-missing cells as `f64`, in row order. `None` for non-numeric columns.
    pub fn numeric_values(&self) -> Option<Vec<f64>> {
        match self {
            ColumnData::Int(v) => Some(v.iter().flatten().map(|&x| x as f64).collect()),
            ColumnData::Float(v) => Some(v.iter().flatten().copied().filter(|x| !x.is_nan()).collect()),
            _ => None,
        }
    }

    /// Hashable identity of a cell, used for duplicate and frequency counting.
    pub(crate) fn key(&self, row: usize) -> CellKey<'_> {
        match self {
            ColumnData::Int(v) => v[row].map_or(CellKey::Null, CellKey::Int),
            ColumnData::Float(v) => match v[row] {
                Some(x) if x.is_nan() => CellKey::Null,
                // -0.0 and 0.0 compare equal
                Some(x) if x == 0.0 => CellKey::Float(0.0f64.to_bits()),
                Some(x) => CellKey::Float(x.to_bits()),
                None => CellKey::Null,
            },
            ColumnData::Str(v) => v[row].as_deref().map_or(CellKey::Null, CellKey::Str),
            ColumnData::Timestamp(v) => v[row].map_or(CellKey::Null, CellKey::Timestamp),
        }
    }
}

/// Cell identity where missing cells compare equal to each other.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) enum CellKey<'a> {
    Null,
    Int(i64),
    Float(u64),
    Str(&'a str),
    Timestamp(NaiveDateTime),
}

/// A named column.
#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    name: String,
    data: ColumnData,
}

impl Column {
    pub fn new(name: impl Into<String>, data: ColumnData) -> Self {
        Self {
            name: name.into(),
            data,
        }
    }

    pub fn ints(name: impl Into<String>, values: impl IntoIterator<Item = Option<i64>>) -> Self {
        Self::new(name, ColumnData::Int(values.into_iter().collect()))
    }

    pub fn floats(name: impl Into<String>, values: impl IntoIterator<Item = Option<f64>>) -> Self {
        Self::new(name, ColumnData::Float(values.into_iter().collect()))
    }

    pub fn strs<S: Into<String>>(
        name: impl Into<String>,
        values: impl IntoIterator<Item = Option<S>>,
    ) -> Self {
        Self::new(
            name,
            ColumnData::Str(values.into_iter().map(|v| v.map(Into::into)).collect()),
        )
    }

    pub fn timestamps(
        name: impl Into<String>,
        values: impl IntoIterator<Item = Option<NaiveDateTime>>,
    ) -> Self {
        Self::new(name, ColumnData::Timestamp(values.into_iter().collect()))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn data(&self) -> &ColumnData {
        &self.data
    }

    pub fn into_data(self) -> ColumnData {
        self.data
    }

    pub fn dtype(&self) -> DType {
        self.data.dtype()
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn null_count(&self) -> usize {
        self.data.null_count()
    }

    pub fn value(&self, row: usize) -> Value {
        self.data.value(row)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn null_count_includes_nan() {
        let col = Column::floats("x", [Some(1.0), None, Some(f64::NAN)]);
        assert_eq!(col.null_count(), 2);
        assert_eq!(col.data().numeric_values(), Some(vec![1.0]));
    }

    #[test]
    fn numeric_values_only_for_numbers() {
        let col = Column::strs("s", [Some("a"), None]);
        assert!(col.data().numeric_values().is_none());
        let col = Column::ints("i", [Some(2), None, Some(5)]);
        assert_eq!(col.data().numeric_values(), Some(vec![2.0, 5.0]));
    }

    #[test]
    fn signed_zero_shares_a_key() {
        let data = ColumnData::Float(vec![Some(0.0), Some(-0.0), None, Some(f64::NAN)]);
        assert_eq!(data.key(0), data.key(1));
        assert_eq!(data.key(2), data.key(3));
    }
}
