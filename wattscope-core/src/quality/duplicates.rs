use crate::table::{CellKey, Record, Table};
use rand::seq::index;
use rand::Rng;
use serde::Serialize;
use std::collections::HashMap;

/// Maximum number of duplicate rows shown as examples.
pub const MAX_EXAMPLES: usize = 2;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Duplicates {
    /// Rows identical to at least one other row (every copy counts).
    pub total: usize,
    /// Up to [`MAX_EXAMPLES`] of those rows, `None` when there are none.
    pub examples: Option<Vec<Record>>,
}

/// Indices of rows whose full contents appear more than once.
/// Missing cells compare equal to each other.
pub fn duplicate_rows(table: &Table) -> Vec<usize> {
    let keys: Vec<Vec<CellKey<'_>>> = (0..table.height())
        .map(|row| table.columns().iter().map(|c| c.data().key(row)).collect())
        .collect();

    let mut counts: HashMap<&[CellKey<'_>], usize> = HashMap::new();
    for key in &keys {
        *counts.entry(key.as_slice()).or_default() += 1;
    }

    keys.iter()
        .enumerate()
        .filter(|(_, key)| counts[key.as_slice()] > 1)
        .map(|(row, _)| row)
        .collect()
}

pub fn find_duplicates<R: Rng + ?Sized>(table: &Table, rng: &mut R) -> Duplicates {
    let rows = duplicate_rows(table);
    if rows.is_empty() {
        return Duplicates {
            total: 0,
            examples: None,
        };
    }

    let mut picked: Vec<usize> = index::sample(rng, rows.len(), rows.len().min(MAX_EXAMPLES))
        .into_iter()
        .map(|i| rows[i])
        .collect();
    picked.sort_unstable();

    Duplicates {
        total: rows.len(),
        examples: Some(picked.into_iter().map(|row| table.row(row)).collect()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::Column;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn pair_of_identical_rows_counts_two() {
        let table = Table::new(vec![
            Column::ints("a", [Some(1), Some(2), Some(1)]),
            Column::strs("b", [Some("x"), Some("y"), Some("x")]),
        ])
        .unwrap();
        let dup = find_duplicates(&table, &mut StdRng::seed_from_u64(7));
        assert_eq!(dup.total, 2);
        assert_eq!(dup.examples.as_ref().map(Vec::len), Some(2));
    }

    #[test]
    fn nulls_compare_equal() {
        let table = Table::new(vec![
            Column::floats("a", [None, Some(f64::NAN), Some(1.0)]),
        ])
        .unwrap();
        assert_eq!(duplicate_rows(&table), vec![0, 1]);
    }

    #[test]
    fn examples_capped_and_reproducible() {
        let table = Table::new(vec![Column::ints("a", [Some(5); 6])]).unwrap();
        let a = find_duplicates(&table, &mut StdRng::seed_from_u64(1));
        let b = find_duplicates(&table, &mut StdRng::seed_from_u64(1));
        assert_eq!(a.total, 6);
        assert_eq!(a.examples.as_ref().unwrap().len(), MAX_EXAMPLES);
        assert_eq!(a, b);
    }

    #[test]
    fn no_duplicates_has_no_examples() {
        let table = Table::new(vec![Column::ints("a", [Some(1), Some(2)])]).unwrap();
        let dup = find_duplicates(&table, &mut rand::thread_rng());
        assert_eq!(dup, Duplicates { total: 0, examples: None });
    }
}
