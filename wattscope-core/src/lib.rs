//! WattScope Core: table model, time-range validation, resampling, calendar
//! features and data-quality reports for power-consumption time series.
//!
//! - [`table`]: typed, column-oriented in-memory tables
//! - [`validate`]: interval checks on timestamp columns (strict or lenient)
//! - [`aggregate`]: fixed-frequency resampling driven by an aggregation schema
//! - [`features`]: shift / weekday / utility / season columns
//! - [`pipeline`]: parse → aggregate → derive features
//! - [`quality`]: shape, types, samples, summaries, missing values,
//!   duplicates and IQR outliers
//! - [`data`]: CSV / Parquet / JSON adapters backed by polars
//! - [`config`]: TOML pipeline configuration

pub mod aggregate;
pub mod config;
pub mod data;
pub mod features;
pub mod fingerprint;
pub mod pipeline;
pub mod quality;
pub mod rng;
pub mod table;
pub mod validate;

pub use aggregate::{aggregate, AggFn, AggregateError, AggregationRule, AggregationSchema, Frequency};
pub use config::{ConfigError, PipelineConfig};
pub use features::{CalendarFeatures, FeatureError, HolidayCalendar};
pub use pipeline::{process_table, PipelineError, ProcessingPipeline};
pub use quality::{check, check_with_rng, QualityReport, ReportError, SampleSizes};
pub use table::{Column, ColumnData, DType, Record, Table, TableError, Value};
pub use validate::{TimeRangeValidator, ValidationError, ValidationPolicy};
