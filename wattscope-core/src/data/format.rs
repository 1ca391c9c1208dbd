//! File formats and table load/save.
//!
//! Writes are atomic: the frame is written to `{path}.tmp` and renamed into
//! place, so a crashed save never leaves a truncated file behind.

use super::frame::{dataframe_to_table, table_to_dataframe};
use super::provider::DataError;
use crate::table::Table;
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::Path;
use std::str::FromStr;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileFormat {
    Csv,
    Parquet,
    Json,
}

impl FileFormat {
    pub const ALL: [FileFormat; 3] = [FileFormat::Csv, FileFormat::Parquet, FileFormat::Json];

    pub fn extension(&self) -> &'static str {
        match self {
            FileFormat::Csv => "csv",
            FileFormat::Parquet => "parquet",
            FileFormat::Json => "json",
        }
    }

    /// Comma-separated list of supported format names.
    pub fn supported() -> String {
        Self::ALL
            .iter()
            .map(FileFormat::extension)
            .collect::<Vec<_>>()
            .join(", ")
    }

    pub fn from_path(path: &Path) -> Result<Self, DataError> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or_default();
        ext.parse()
    }
}

impl fmt::Display for FileFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

impl FromStr for FileFormat {
    type Err = DataError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "csv" => Ok(FileFormat::Csv),
            "parquet" | "pq" => Ok(FileFormat::Parquet),
            "json" => Ok(FileFormat::Json),
            _ => Err(DataError::UnsupportedFormat {
                found: s.to_string(),
            }),
        }
    }
}

fn polars_err(context: &str) -> impl Fn(PolarsError) -> DataError + '_ {
    move |e| DataError::Polars(format!("{context}: {e}"))
}

/// Read a table from `path`.
pub fn load_table(path: &Path, format: FileFormat) -> Result<Table, DataError> {
    let df = match format {
        FileFormat::Csv => {
            if !path.exists() {
                return Err(DataError::io(
                    path,
                    std::io::Error::new(std::io::ErrorKind::NotFound, "file not found"),
                ));
            }
            LazyCsvReader::new(path)
                .with_has_header(true)
                .finish()
                .map_err(polars_err("scan csv"))?
                .collect()
                .map_err(polars_err("read csv"))?
        }
        FileFormat::Parquet => {
            let file = fs::File::open(path).map_err(|e| DataError::io(path, e))?;
            ParquetReader::new(file)
                .finish()
                .map_err(polars_err("read parquet"))?
        }
        FileFormat::Json => {
            let file = fs::File::open(path).map_err(|e| DataError::io(path, e))?;
            JsonReader::new(file)
                .finish()
                .map_err(polars_err("read json"))?
        }
    };

    let table = dataframe_to_table(&df)?;
    debug!(
        path = %path.display(),
        %format,
        rows = table.height(),
        columns = table.width(),
        "loaded table"
    );
    Ok(table)
}

/// Write `table` to `path`, creating parent directories as needed.
pub fn save_table(table: &Table, path: &Path, format: FileFormat) -> Result<(), DataError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|e| DataError::io(parent, e))?;
    }

    let mut df = table_to_dataframe(table)?;
    let tmp_path = path.with_extension(format!("{}.tmp", format.extension()));
    let file = fs::File::create(&tmp_path).map_err(|e| DataError::io(&tmp_path, e))?;

    let written = match format {
        FileFormat::Csv => CsvWriter::new(file)
            .include_header(true)
            .with_datetime_format(Some("%Y-%m-%d %H:%M:%S".to_string()))
            .finish(&mut df)
            .map_err(polars_err("write csv")),
        FileFormat::Parquet => ParquetWriter::new(file)
            .finish(&mut df)
            .map(|_| ())
            .map_err(polars_err("write parquet")),
        FileFormat::Json => JsonWriter::new(file)
            .with_json_format(JsonFormat::Json)
            .finish(&mut df)
            .map_err(polars_err("write json")),
    };
    if let Err(e) = written {
        let _ = fs::remove_file(&tmp_path);
        return Err(e);
    }

    fs::rename(&tmp_path, path).map_err(|e| {
        let _ = fs::remove_file(&tmp_path);
        DataError::io(path, e)
    })?;
    debug!(path = %path.display(), %format, rows = table.height(), "saved table");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::{Column, DType, Value};
    use chrono::NaiveDate;

    fn sample() -> Table {
        let ts = |h| {
            NaiveDate::from_ymd_opt(2017, 1, 1)
                .unwrap()
                .and_hms_opt(h, 0, 0)
                .unwrap()
        };
        Table::new(vec![
            Column::timestamps("Datetime", [Some(ts(0)), Some(ts(1)), None]),
            Column::floats("Temperature", [Some(6.559), None, Some(5.9)]),
            Column::ints("count", [Some(1), Some(2), Some(3)]),
            Column::strs("zone", [Some("a"), None, Some("c")]),
        ])
        .unwrap()
    }

    #[test]
    fn parses_format_names() {
        assert_eq!("CSV".parse::<FileFormat>().unwrap(), FileFormat::Csv);
        assert_eq!("pq".parse::<FileFormat>().unwrap(), FileFormat::Parquet);
        assert!("pickle".parse::<FileFormat>().is_err());
        assert_eq!(
            FileFormat::from_path(Path::new("x/y.json")).unwrap(),
            FileFormat::Json
        );
        assert!(FileFormat::from_path(Path::new("noext")).is_err());
    }

    #[test]
    fn parquet_preserves_types_and_nulls() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/out.parquet");
        save_table(&sample(), &path, FileFormat::Parquet).unwrap();
        assert!(!path.with_extension("parquet.tmp").exists());

        let loaded = load_table(&path, FileFormat::Parquet).unwrap();
        assert_eq!(loaded, sample());
    }

    #[test]
    fn csv_writes_readable_timestamps() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.csv");
        save_table(&sample(), &path, FileFormat::Csv).unwrap();

        let text = fs::read_to_string(&path).unwrap();
        assert!(text.contains("2017-01-01 01:00:00"), "{text}");

        let loaded = load_table(&path, FileFormat::Csv).unwrap();
        assert_eq!(loaded.shape(), (3, 4));
        assert_eq!(loaded.column("count").unwrap().dtype(), DType::Int);
        assert_eq!(loaded.row(1)["Temperature"], Value::Null);
    }

    #[test]
    fn missing_file_is_io_error() {
        let err = load_table(Path::new("/nonexistent/x.csv"), FileFormat::Csv).unwrap_err();
        assert!(matches!(err, DataError::Io { .. }));
        let err = load_table(Path::new("/nonexistent/x.parquet"), FileFormat::Parquet).unwrap_err();
        assert!(matches!(err, DataError::Io { .. }));
    }
}
