//! Conversion between polars `DataFrame`s and [`Table`]s.
//!
//! Integer dtypes map to `Int`, floats to `Float` (NaN becomes missing),
//! `Datetime`/`Date` to `Timestamp`; everything else is rendered as strings.
//! Timestamps are written back as millisecond `Datetime`.

use super::provider::DataError;
use crate::table::{Column as TableColumn, ColumnData, Table};
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use polars::prelude::*;

fn column_err(name: &str) -> impl Fn(PolarsError) -> DataError + '_ {
    move |e| DataError::Polars(format!("column '{name}': {e}"))
}

pub fn dataframe_to_table(df: &DataFrame) -> Result<Table, DataError> {
    let columns = df
        .get_columns()
        .iter()
        .map(|col| {
            let name = col.name().as_str();
            convert_column(col).map(|data| TableColumn::new(name, data))
        })
        .collect::<Result<Vec<_>, _>>()?;
    Ok(Table::new(columns)?)
}

fn convert_column(col: &Column) -> Result<ColumnData, DataError> {
    let name = col.name().as_str();
    let map_err = column_err(name);

    let data = match col.dtype() {
        dt if dt.is_integer() => {
            let cast = col.cast(&DataType::Int64).map_err(&map_err)?;
            ColumnData::Int(cast.i64().map_err(&map_err)?.into_iter().collect())
        }
        dt if dt.is_float() => {
            let cast = col.cast(&DataType::Float64).map_err(&map_err)?;
            ColumnData::Float(
                cast.f64()
                    .map_err(&map_err)?
                    .into_iter()
                    .map(|v| v.filter(|x| !x.is_nan()))
                    .collect(),
            )
        }
        DataType::Datetime(unit, _) => {
            let unit = *unit;
            let cast = col.cast(&DataType::Int64).map_err(&map_err)?;
            ColumnData::Timestamp(
                cast.i64()
                    .map_err(&map_err)?
                    .into_iter()
                    .map(|v| v.and_then(|raw| from_epoch(raw, unit)))
                    .collect(),
            )
        }
        DataType::Date => {
            let cast = col.cast(&DataType::Int32).map_err(&map_err)?;
            ColumnData::Timestamp(
                cast.i32()
                    .map_err(&map_err)?
                    .into_iter()
                    .map(|v| v.and_then(from_epoch_days))
                    .collect(),
            )
        }
        DataType::Null => ColumnData::Str(vec![None; col.len()]),
        dt @ (DataType::List(_) | DataType::Binary) => {
            return Err(DataError::UnsupportedDtype {
                column: name.to_string(),
                dtype: dt.to_string(),
            })
        }
        _ => {
            let cast = col.cast(&DataType::String).map_err(&map_err)?;
            ColumnData::Str(
                cast.str()
                    .map_err(&map_err)?
                    .into_iter()
                    .map(|v| v.map(str::to_string))
                    .collect(),
            )
        }
    };
    Ok(data)
}

fn from_epoch(raw: i64, unit: TimeUnit) -> Option<NaiveDateTime> {
    match unit {
        TimeUnit::Milliseconds => DateTime::from_timestamp_millis(raw),
        TimeUnit::Microseconds => DateTime::from_timestamp_micros(raw),
        TimeUnit::Nanoseconds => Some(DateTime::from_timestamp_nanos(raw)),
    }
    .map(|dt| dt.naive_utc())
}

fn from_epoch_days(days: i32) -> Option<NaiveDateTime> {
    let epoch = NaiveDate::from_ymd_opt(1970, 1, 1)?;
    epoch
        .checked_add_signed(chrono::Duration::days(i64::from(days)))?
        .and_hms_opt(0, 0, 0)
}

pub fn table_to_dataframe(table: &Table) -> Result<DataFrame, DataError> {
    let columns = table
        .columns()
        .iter()
        .map(|col| {
            let name: PlSmallStr = col.name().into();
            let map_err = column_err(col.name());
            let column = match col.data() {
                ColumnData::Int(values) => Column::new(name, values),
                ColumnData::Float(values) => Column::new(name, values),
                ColumnData::Str(values) => Column::new(name, values),
                ColumnData::Timestamp(values) => {
                    let millis: Vec<Option<i64>> = values
                        .iter()
                        .map(|v| v.map(|ts| ts.and_utc().timestamp_millis()))
                        .collect();
                    Column::new(name, millis)
                        .cast(&DataType::Datetime(TimeUnit::Milliseconds, None))
                        .map_err(&map_err)?
                }
            };
            Ok(column)
        })
        .collect::<Result<Vec<_>, DataError>>()?;

    DataFrame::new(columns).map_err(|e| DataError::Polars(format!("dataframe creation: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::{DType, Value};

    #[test]
    fn maps_polars_dtypes() {
        let df = DataFrame::new(vec![
            Column::new("i32".into(), [Some(1i32), None]),
            Column::new("f".into(), [Some(1.5f64), Some(f64::NAN)]),
            Column::new("b".into(), [true, false]),
            Column::new("s".into(), ["x", "y"]),
            Column::new("d".into(), [17167i32, 17168])
                .cast(&DataType::Date)
                .unwrap(),
        ])
        .unwrap();

        let table = dataframe_to_table(&df).unwrap();
        assert_eq!(table.column("i32").unwrap().dtype(), DType::Int);
        assert_eq!(table.column("f").unwrap().null_count(), 1);
        assert_eq!(table.row(0)["b"], Value::Str("true".into()));
        assert_eq!(
            table.row(0)["d"],
            Value::Timestamp(
                NaiveDate::from_ymd_opt(2017, 1, 1)
                    .unwrap()
                    .and_hms_opt(0, 0, 0)
                    .unwrap()
            )
        );
    }

    #[test]
    fn timestamps_written_as_millisecond_datetime() {
        let ts = NaiveDate::from_ymd_opt(2017, 1, 1)
            .unwrap()
            .and_hms_opt(0, 10, 0)
            .unwrap();
        let table = Table::new(vec![TableColumn::timestamps("Datetime", [Some(ts), None])]).unwrap();
        let df = table_to_dataframe(&table).unwrap();
        assert_eq!(
            df.column("Datetime").unwrap().dtype(),
            &DataType::Datetime(TimeUnit::Milliseconds, None)
        );
        assert_eq!(dataframe_to_table(&df).unwrap(), table);
    }
}
