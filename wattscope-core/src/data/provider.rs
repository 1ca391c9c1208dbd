//! Dataset sources and the structured error type for data operations.
//!
//! `DatasetSource` abstracts over where a table comes from (a file on disk,
//! a table already in memory) so the runner can be driven the same way in
//! the CLI and in tests.

use super::format::{load_table, FileFormat};
use crate::table::{Table, TableError};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DataError {
    #[error("unsupported file type '{found}'. Supported types: {}", FileFormat::supported())]
    UnsupportedFormat { found: String },

    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("polars error: {0}")]
    Polars(String),

    #[error("column '{column}' has unsupported dtype {dtype}")]
    UnsupportedDtype { column: String, dtype: String },

    #[error("column '{column}', row {row}: cannot parse timestamp '{value}'")]
    TimestampParse {
        column: String,
        row: usize,
        value: String,
    },

    #[error(transparent)]
    Table(#[from] TableError),
}

impl DataError {
    pub(crate) fn io(path: &Path, source: std::io::Error) -> Self {
        DataError::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

/// Anything that can produce a raw table.
pub trait DatasetSource {
    /// Human-readable name, recorded in cache metadata and logs.
    fn name(&self) -> &str;

    fn load(&self) -> Result<Table, DataError>;
}

/// A dataset stored in a single file.
#[derive(Debug, Clone)]
pub struct FileSource {
    path: PathBuf,
    format: FileFormat,
    name: String,
}

impl FileSource {
    /// Source with the format inferred from the file extension.
    pub fn new(path: impl Into<PathBuf>) -> Result<Self, DataError> {
        let path = path.into();
        let format = FileFormat::from_path(&path)?;
        Ok(Self::with_format(path, format))
    }

    pub fn with_format(path: impl Into<PathBuf>, format: FileFormat) -> Self {
        let path = path.into();
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        Self { path, format, name }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn format(&self) -> FileFormat {
        self.format
    }
}

impl DatasetSource for FileSource {
    fn name(&self) -> &str {
        &self.name
    }

    fn load(&self) -> Result<Table, DataError> {
        load_table(&self.path, self.format)
    }
}

/// A table that is already loaded.
#[derive(Debug, Clone)]
pub struct InMemorySource {
    name: String,
    table: Table,
}

impl InMemorySource {
    pub fn new(name: impl Into<String>, table: Table) -> Self {
        Self {
            name: name.into(),
            table,
        }
    }
}

impl DatasetSource for InMemorySource {
    fn name(&self) -> &str {
        &self.name
    }

    fn load(&self) -> Result<Table, DataError> {
        Ok(self.table.clone())
    }
}
