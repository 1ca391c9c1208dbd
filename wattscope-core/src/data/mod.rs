//! Dataset I/O: file formats, polars conversion, timestamp parsing, sources.

pub mod format;
pub mod frame;
pub mod provider;
pub mod timestamps;

pub use format::{load_table, save_table, FileFormat};
pub use frame::{dataframe_to_table, table_to_dataframe};
pub use provider::{DataError, DatasetSource, FileSource, InMemorySource};
pub use timestamps::{parse_timestamp, parse_timestamp_column};
