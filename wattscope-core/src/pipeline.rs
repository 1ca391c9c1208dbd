//! Processing pipeline: timestamp parsing → resampling → calendar features.

use crate::aggregate::{aggregate, AggregateError, AggregationSchema, Frequency};
use crate::config::PipelineConfig;
use crate::data::{parse_timestamp_column, DataError};
use crate::features::{CalendarFeatures, FeatureError};
use crate::table::Table;
use thiserror::Error;
use tracing::info;

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("timestamp conversion failed: {0}")]
    Data(#[from] DataError),

    #[error("aggregation failed: {0}")]
    Aggregate(#[from] AggregateError),

    #[error("feature derivation failed: {0}")]
    Feature(#[from] FeatureError),
}

/// Turns a raw time-indexed table into an aggregated, feature-enriched one.
#[derive(Debug, Clone)]
pub struct ProcessingPipeline {
    frequency: Frequency,
    index_column: String,
    schema: AggregationSchema,
    features: CalendarFeatures,
}

impl ProcessingPipeline {
    pub fn new(
        frequency: Frequency,
        index_column: impl Into<String>,
        schema: AggregationSchema,
        features: CalendarFeatures,
    ) -> Self {
        let index_column = index_column.into();
        Self {
            frequency,
            features: features.with_timestamp_column(index_column.clone()),
            index_column,
            schema,
        }
    }

    pub fn from_config(config: &PipelineConfig) -> Self {
        Self::new(
            config.frequency,
            config.index_column.clone(),
            config.schema().clone(),
            CalendarFeatures::new(config.holiday_calendar(), config.validator()),
        )
    }

    pub fn frequency(&self) -> Frequency {
        self.frequency
    }

    pub fn index_column(&self) -> &str {
        &self.index_column
    }

    pub fn schema(&self) -> &AggregationSchema {
        &self.schema
    }

    pub fn features(&self) -> &CalendarFeatures {
        &self.features
    }

    /// Parse the index column and resample, without deriving features.
    pub fn aggregate(&self, raw: &Table) -> Result<Table, PipelineError> {
        info!(column = %self.index_column, "converting index column to timestamps");
        let parsed = parse_timestamp_column(raw, &self.index_column)?;

        info!(
            frequency = %self.frequency,
            column = %self.index_column,
            "aggregating by time frequency"
        );
        let aggregated = aggregate(&parsed, self.frequency, &self.index_column, &self.schema)?;
        info!(rows = aggregated.height(), "data aggregated");
        Ok(aggregated)
    }

    pub fn process(&self, raw: &Table) -> Result<Table, PipelineError> {
        info!(rows = raw.height(), columns = raw.width(), "processing data");
        let aggregated = self.aggregate(raw)?;
        let processed = self.features.derive_all(&aggregated)?;
        info!(
            rows = processed.height(),
            columns = processed.width(),
            "data processed"
        );
        Ok(processed)
    }
}

impl Default for ProcessingPipeline {
    fn default() -> Self {
        Self::from_config(&PipelineConfig::default())
    }
}

/// Run the default pipeline (hourly, `Datetime`, power-consumption schema).
pub fn process_table(raw: &Table) -> Result<Table, PipelineError> {
    ProcessingPipeline::default().process(raw)
}
