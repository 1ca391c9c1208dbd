use super::provider::DataError;
use crate::table::{Column, ColumnData, DType, Table, TableError};
use chrono::{NaiveDate, NaiveDateTime};

const DATETIME_FORMATS: [&str; 4] = [
    "%m/%d/%Y %H:%M",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
];

/// Parse one timestamp in any of the accepted layouts.
///
/// `1/1/2017 0:00` (the Tetouan export layout), ISO-8601 with a space or `T`
/// separator, with or without seconds, and plain dates (midnight).
pub fn parse_timestamp(raw: &str) -> Option<NaiveDateTime> {
    let s = raw.trim();
    DATETIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
        .or_else(|| {
            NaiveDate::parse_from_str(s, "%Y-%m-%d")
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })
}

/// Return a copy of `table` with the string column `name` converted to
/// timestamps. Blank cells become missing; timestamp columns pass through.
pub fn parse_timestamp_column(table: &Table, name: &str) -> Result<Table, DataError> {
    let column = table.require(name)?;
    let raw = match column.data() {
        ColumnData::Timestamp(_) => return Ok(table.clone()),
        ColumnData::Str(values) => values,
        other => {
            return Err(TableError::TypeMismatch {
                column: name.to_string(),
                expected: DType::Timestamp,
                actual: other.dtype(),
            }
            .into())
        }
    };

    let parsed = raw
        .iter()
        .enumerate()
        .map(|(row, cell)| match cell.as_deref().map(str::trim) {
            None | Some("") => Ok(None),
            Some(value) => parse_timestamp(value).map(Some).ok_or_else(|| {
                DataError::TimestampParse {
                    column: name.to_string(),
                    row,
                    value: value.to_string(),
                }
            }),
        })
        .collect::<Result<Vec<_>, _>>()?;

    Ok(table.with_column(Column::timestamps(name, parsed))?)
}
