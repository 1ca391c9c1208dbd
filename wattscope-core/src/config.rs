//! Pipeline configuration loaded from TOML.
//!
//! ```toml
//! frequency = "h"
//! index_column = "Datetime"
//! validation = "lenient"
//! sample_sizes = [3, 3, 3]
//! seed = 42
//! holidays = ["2017-01-11", "2017-05-01"]
//!
//! [[rules]]
//! source = "PowerConsumption_Zone1"
//! function = "sum"
//! output = "TotalPowerConsumption_Zone1"
//! ```
//!
//! Every field is optional; missing fields take the defaults of the Tetouan
//! power-consumption dataset.

use crate::aggregate::{AggregationSchema, Frequency};
use crate::features::{CalendarFeature, HolidayCalendar};
use crate::quality::SampleSizes;
use crate::validate::{TimeRangeValidator, ValidationPolicy};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("read config file {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("parse config TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("serialize config TOML: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PipelineConfig {
    pub frequency: Frequency,
    pub index_column: String,
    pub validation: ValidationPolicy,
    pub sample_sizes: SampleSizes,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,
    /// Replaces the built-in 2017 calendar when present.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub holidays: Option<Vec<NaiveDate>>,
    // arrays of tables serialize last in TOML
    pub rules: AggregationSchema,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            frequency: Frequency::hourly(),
            index_column: "Datetime".to_string(),
            validation: ValidationPolicy::Lenient,
            sample_sizes: SampleSizes::default(),
            seed: None,
            holidays: None,
            rules: AggregationSchema::power_consumption(),
        }
    }
}

impl PipelineConfig {
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Cross-field checks that serde cannot express.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.index_column.trim().is_empty() {
            return Err(ConfigError::Invalid("index_column must not be empty".into()));
        }
        let reserved: Vec<&str> = std::iter::once(self.index_column.as_str())
            .chain(CalendarFeature::ALL.iter().map(|f| f.column_name()))
            .collect();
        if let Some(rule) = self
            .rules
            .rules()
            .iter()
            .find(|r| reserved.contains(&r.output.as_str()))
        {
            return Err(ConfigError::Invalid(format!(
                "rule output '{}' collides with a reserved column",
                rule.output
            )));
        }
        Ok(())
    }

    pub fn schema(&self) -> &AggregationSchema {
        &self.rules
    }

    pub fn holiday_calendar(&self) -> HolidayCalendar {
        match &self.holidays {
            Some(dates) => HolidayCalendar::new(dates.iter().copied()),
            None => HolidayCalendar::tetouan_2017(),
        }
    }

    pub fn validator(&self) -> TimeRangeValidator {
        TimeRangeValidator::new(self.validation)
    }

    /// BLAKE3 of the canonical JSON form.
    pub fn config_hash(&self) -> String {
        let json = serde_json::to_string(self).expect("PipelineConfig must serialize");
        blake3::hash(json.as_bytes()).to_hex().to_string()
    }
}
