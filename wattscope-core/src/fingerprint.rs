//! Dataset fingerprinting.
//!
//! A dataset hash identifies table contents independently of where the table
//! was loaded from, so cached results can be reused across file formats.

use crate::table::{ColumnData, Table};

/// BLAKE3 over column names, types and every cell, hex-encoded.
pub fn dataset_hash(table: &Table) -> String {
    let mut hasher = blake3::Hasher::new();
    hasher.update(&(table.width() as u64).to_le_bytes());
    hasher.update(&(table.height() as u64).to_le_bytes());

    for column in table.columns() {
        hasher.update(column.name().as_bytes());
        hasher.update(&[0]);
        hasher.update(column.dtype().type_name().as_bytes());
        hasher.update(&[0]);

        match column.data() {
            ColumnData::Int(values) => {
                for v in values {
                    hash_cell(&mut hasher, v.map(|x| x.to_le_bytes()));
                }
            }
            ColumnData::Float(values) => {
                for v in values {
                    let bits = v.filter(|x| !x.is_nan()).map(|x| x.to_bits().to_le_bytes());
                    hash_cell(&mut hasher, bits);
                }
            }
            ColumnData::Str(values) => {
                for v in values {
                    match v {
                        Some(s) => {
                            hasher.update(&[1]);
                            hasher.update(&(s.len() as u64).to_le_bytes());
                            hasher.update(s.as_bytes());
                        }
                        None => {
                            hasher.update(&[0]);
                        }
                    }
                }
            }
            ColumnData::Timestamp(values) => {
                for v in values {
                    let millis = v.map(|ts| ts.and_utc().timestamp_millis().to_le_bytes());
                    hash_cell(&mut hasher, millis);
                }
            }
        }
    }

    hasher.finalize().to_hex().to_string()
}

fn hash_cell(hasher: &mut blake3::Hasher, bytes: Option<[u8; 8]>) {
    match bytes {
        Some(b) => {
            hasher.update(&[1]);
            hasher.update(&b);
        }
        None => {
            hasher.update(&[0]);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::Column;

    fn table(values: [Option<f64>; 3]) -> Table {
        Table::new(vec![
            Column::floats("x", values),
            Column::strs("s", [Some("a"), None, Some("c")]),
        ])
        .unwrap()
    }

    #[test]
    fn hash_is_deterministic() {
        let t = table([Some(1.0), None, Some(3.0)]);
        assert_eq!(dataset_hash(&t), dataset_hash(&t.clone()));
        assert_eq!(dataset_hash(&t).len(), 64);
    }

    #[test]
    fn hash_changes_with_content_and_names() {
        let a = table([Some(1.0), None, Some(3.0)]);
        let b = table([Some(1.0), Some(2.0), Some(3.0)]);
        assert_ne!(dataset_hash(&a), dataset_hash(&b));

        let renamed = Table::new(vec![
            Column::floats("y", [Some(1.0), None, Some(3.0)]),
            Column::strs("s", [Some("a"), None, Some("c")]),
        ])
        .unwrap();
        assert_ne!(dataset_hash(&a), dataset_hash(&renamed));
    }

    #[test]
    fn nan_hashes_like_missing() {
        assert_eq!(
            dataset_hash(&table([Some(f64::NAN), None, None])),
            dataset_hash(&table([None, None, None]))
        );
    }
}
