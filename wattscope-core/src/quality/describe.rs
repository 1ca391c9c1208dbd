use super::stats;
use crate::table::{CellKey, Column, Table, Value};
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};

/// Summary statistics for one column.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ColumnSummary {
    Numeric(NumericSummary),
    Categorical(CategoricalSummary),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NumericSummary {
    pub count: usize,
    pub mean: Option<f64>,
    pub std: Option<f64>,
    pub min: Option<f64>,
    #[serde(rename = "25%")]
    pub q25: Option<f64>,
    #[serde(rename = "50%")]
    pub q50: Option<f64>,
    #[serde(rename = "75%")]
    pub q75: Option<f64>,
    pub max: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoricalSummary {
    pub count: usize,
    pub unique: usize,
    pub top: Option<Value>,
    pub freq: Option<usize>,
}

pub fn describe(table: &Table) -> BTreeMap<String, ColumnSummary> {
    table
        .columns()
        .iter()
        .map(|col| (col.name().to_string(), summarize(col)))
        .collect()
}

pub fn summarize(column: &Column) -> ColumnSummary {
    match column.data().numeric_values() {
        Some(values) => ColumnSummary::Numeric(numeric(&values)),
        None => ColumnSummary::Categorical(categorical(column)),
    }
}

fn numeric(values: &[f64]) -> NumericSummary {
    let sorted = stats::sorted(values);
    NumericSummary {
        count: values.len(),
        mean: stats::mean(values),
        std: stats::sample_std(values),
        min: sorted.first().copied(),
        q25: stats::quantile(&sorted, 0.25),
        q50: stats::quantile(&sorted, 0.5),
        q75: stats::quantile(&sorted, 0.75),
        max: sorted.last().copied(),
    }
}

fn categorical(column: &Column) -> CategoricalSummary {
    let data = column.data();
    // value -> (occurrences, first row seen)
    let mut freq: HashMap<CellKey<'_>, (usize, usize)> = HashMap::new();
    let mut count = 0;
    for row in 0..data.len() {
        if data.is_null(row) {
            continue;
        }
        count += 1;
        freq.entry(data.key(row))
            .and_modify(|(n, _)| *n += 1)
            .or_insert((1, row));
    }

    let top = freq
        .values()
        .max_by(|(n1, r1), (n2, r2)| n1.cmp(n2).then(r2.cmp(r1)))
        .copied();

    CategoricalSummary {
        count,
        unique: freq.len(),
        top: top.map(|(_, row)| data.value(row)),
        freq: top.map(|(n, _)| n),
    }
}
