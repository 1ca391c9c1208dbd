use super::stats::iqr_bounds;
use crate::table::Table;
use serde::{Serialize, Serializer};
use std::collections::BTreeMap;

/// Serialized form of [`Outliers::NoneDetected`].
pub const NO_OUTLIERS_MESSAGE: &str = "no significant outliers detected";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ColumnOutliers {
    pub count: usize,
    /// Share of all rows, formatted as `"20.00%"`.
    pub percent: String,
    /// `[lower, upper]` fences.
    pub limits: [f64; 2],
}

/// IQR outliers per numeric column.
#[derive(Debug, Clone, PartialEq)]
pub enum Outliers {
    NoneDetected,
    Detected(BTreeMap<String, ColumnOutliers>),
}

impl Outliers {
    pub fn is_none_detected(&self) -> bool {
        matches!(self, Outliers::NoneDetected)
    }

    pub fn get(&self, column: &str) -> Option<&ColumnOutliers> {
        match self {
            Outliers::NoneDetected => None,
            Outliers::Detected(map) => map.get(column),
        }
    }

    /// Number of columns with outliers.
    pub fn len(&self) -> usize {
        match self {
            Outliers::NoneDetected => 0,
            Outliers::Detected(map) => map.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &ColumnOutliers)> {
        match self {
            Outliers::NoneDetected => None,
            Outliers::Detected(map) => Some(map.iter()),
        }
        .into_iter()
        .flatten()
    }
}

impl Serialize for Outliers {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Outliers::NoneDetected => serializer.serialize_str(NO_OUTLIERS_MESSAGE),
            Outliers::Detected(map) => map.serialize(serializer),
        }
    }
}

pub fn detect_outliers(table: &Table) -> Outliers {
    let rows = table.height();
    let mut found = BTreeMap::new();

    for column in table.columns() {
        let Some(values) = column.data().numeric_values() else {
            continue;
        };
        let Some((lower, upper)) = iqr_bounds(&values) else {
            continue;
        };
        let count = values.iter().filter(|&&v| v < lower || v > upper).count();
        if count > 0 {
            found.insert(
                column.name().to_string(),
                ColumnOutliers {
                    count,
                    percent: format!("{:.2}%", count as f64 / rows as f64 * 100.0),
                    limits: [lower, upper],
                },
            );
        }
    }

    if found.is_empty() {
        Outliers::NoneDetected
    } else {
        Outliers::Detected(found)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::Column;

    #[test]
    fn single_extreme_value() {
        let table = Table::new(vec![
            Column::ints("x", [1, 2, 3, 4, 100].map(Some)),
            Column::strs("label", ["a", "b", "c", "d", "e"].map(Some)),
        ])
        .unwrap();
        let outliers = detect_outliers(&table);
        let x = outliers.get("x").unwrap();
        assert_eq!(x.count, 1);
        assert_eq!(x.percent, "20.00%");
        assert!(x.limits[1] > 4.0 && x.limits[1] < 100.0);
        assert_eq!(outliers.len(), 1);
    }

    #[test]
    fn uniform_data_has_sentinel() {
        let table = Table::new(vec![Column::floats("x", (0..10).map(|i| Some(f64::from(i))))]).unwrap();
        let outliers = detect_outliers(&table);
        assert!(outliers.is_none_detected());
        assert_eq!(
            serde_json::to_value(&outliers).unwrap(),
            serde_json::json!(NO_OUTLIERS_MESSAGE)
        );
    }

    #[test]
    fn percent_counts_rows_with_missing_values() {
        let table = Table::new(vec![Column::floats(
            "x",
            [Some(1.0), Some(2.0), Some(3.0), Some(4.0), Some(100.0), None, None, None, None, None],
        )])
        .unwrap();
        assert_eq!(detect_outliers(&table).get("x").unwrap().percent, "10.00%");
    }
}
