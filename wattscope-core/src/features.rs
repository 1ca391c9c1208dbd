//! Calendar feature derivation.
//!
//! Adds four integer columns derived from the timestamp column:
//! - `turno`: shift of the day (1 morning, 2 afternoon, 3 evening, 4 night)
//! - `dia_semana`: ISO weekday (Monday = 1 … Sunday = 7)
//! - `utilidade`: 3 holiday, 2 weekend, 1 working day
//! - `estacao`: season (1 spring, 2 summer, 3 autumn, 4 winter)
//!
//! Each derivation first validates the timestamp column against a tolerance
//! past which the feature stops being meaningful.

use crate::table::{Column, ColumnData, Table, TableError};
use crate::validate::{TimeRangeValidator, ValidationError};
use chrono::{Datelike, Duration, NaiveDate, NaiveDateTime, Timelike};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use thiserror::Error;

pub const SHIFT_COLUMN: &str = "turno";
pub const WEEKDAY_COLUMN: &str = "dia_semana";
pub const UTILITY_COLUMN: &str = "utilidade";
pub const SEASON_COLUMN: &str = "estacao";

/// Sentinel for an hour outside every shift range.
pub const UNCLASSIFIED_SHIFT: i64 = -1;
/// Sentinel for a month outside every season group.
pub const UNCLASSIFIED_SEASON: i64 = 0;

/// Public holidays observed in the 2017 Tetouan dataset, as (month, day).
const HOLIDAYS_2017: [(u32, u32); 9] = [
    (1, 11),
    (5, 1),
    (6, 26),
    (8, 14),
    (8, 21),
    (9, 1),
    (9, 21),
    (11, 6),
    (12, 1),
];

#[derive(Debug, Error)]
pub enum FeatureError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Table(#[from] TableError),
}

/// The four derivable features.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CalendarFeature {
    Shift,
    Weekday,
    Utility,
    Season,
}

impl CalendarFeature {
    pub const ALL: [CalendarFeature; 4] = [
        CalendarFeature::Shift,
        CalendarFeature::Weekday,
        CalendarFeature::Utility,
        CalendarFeature::Season,
    ];

    pub fn column_name(&self) -> &'static str {
        match self {
            CalendarFeature::Shift => SHIFT_COLUMN,
            CalendarFeature::Weekday => WEEKDAY_COLUMN,
            CalendarFeature::Utility => UTILITY_COLUMN,
            CalendarFeature::Season => SEASON_COLUMN,
        }
    }

    /// Coarsest sampling interval at which the feature is still meaningful.
    pub fn max_interval(&self) -> Duration {
        match self {
            CalendarFeature::Shift => Duration::hours(6),
            CalendarFeature::Weekday | CalendarFeature::Utility => Duration::days(1),
            CalendarFeature::Season => Duration::days(90),
        }
    }
}

/// A fixed set of holiday dates.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HolidayCalendar {
    dates: BTreeSet<NaiveDate>,
}

impl HolidayCalendar {
    pub fn new(dates: impl IntoIterator<Item = NaiveDate>) -> Self {
        Self {
            dates: dates.into_iter().collect(),
        }
    }

    pub fn empty() -> Self {
        Self::new([])
    }

    /// The holidays of the 2017 power-consumption dataset.
    pub fn tetouan_2017() -> Self {
        Self::new(
            HOLIDAYS_2017
                .iter()
                .filter_map(|&(month, day)| NaiveDate::from_ymd_opt(2017, month, day)),
        )
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.dates.contains(&date)
    }

    pub fn len(&self) -> usize {
        self.dates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dates.is_empty()
    }

    pub fn dates(&self) -> impl Iterator<Item = &NaiveDate> {
        self.dates.iter()
    }
}

impl Default for HolidayCalendar {
    fn default() -> Self {
        Self::tetouan_2017()
    }
}

pub fn shift_of(hour: u32) -> i64 {
    match hour {
        6..=11 => 1,
        12..=17 => 2,
        18..=23 => 3,
        0..=5 => 4,
        _ => UNCLASSIFIED_SHIFT,
    }
}

pub fn weekday_of(ts: NaiveDateTime) -> i64 {
    i64::from(ts.weekday().number_from_monday())
}

pub fn season_of(month: u32) -> i64 {
    match month {
        3..=5 => 1,
        6..=8 => 2,
        9..=11 => 3,
        12 | 1 | 2 => 4,
        _ => UNCLASSIFIED_SEASON,
    }
}

pub fn utility_of(date: NaiveDate, weekday: i64, holidays: &HolidayCalendar) -> i64 {
    if holidays.contains(date) {
        3
    } else if weekday >= 6 {
        2
    } else {
        1
    }
}

/// Derives calendar columns from a timestamp column.
#[derive(Debug, Clone)]
pub struct CalendarFeatures {
    holidays: HolidayCalendar,
    validator: TimeRangeValidator,
    timestamp_column: String,
}

impl CalendarFeatures {
    pub fn new(holidays: HolidayCalendar, validator: TimeRangeValidator) -> Self {
        Self {
            holidays,
            validator,
            timestamp_column: "Datetime".to_string(),
        }
    }

    pub fn with_timestamp_column(mut self, name: impl Into<String>) -> Self {
        self.timestamp_column = name.into();
        self
    }

    pub fn holidays(&self) -> &HolidayCalendar {
        &self.holidays
    }

    pub fn timestamp_column(&self) -> &str {
        &self.timestamp_column
    }

    pub fn add_shift(&self, table: &Table) -> Result<Table, FeatureError> {
        let stamps = self.guarded(table, CalendarFeature::Shift)?;
        let values = stamps.iter().map(|ts| ts.map(|t| shift_of(t.hour())));
        Ok(table.with_column(Column::ints(SHIFT_COLUMN, values))?)
    }

    pub fn add_weekday(&self, table: &Table) -> Result<Table, FeatureError> {
        let stamps = self.guarded(table, CalendarFeature::Weekday)?;
        let values = stamps.iter().map(|ts| ts.map(weekday_of));
        Ok(table.with_column(Column::ints(WEEKDAY_COLUMN, values))?)
    }

    /// Uses an integer `dia_semana` when present; derives and adds it otherwise.
    pub fn add_utility(&self, table: &Table) -> Result<Table, FeatureError> {
        let stamps = self.guarded(table, CalendarFeature::Utility)?;
        let (table, weekdays) = match table.column(WEEKDAY_COLUMN).map(|c| c.data()) {
            Some(ColumnData::Int(values)) => (table.clone(), values.clone()),
            _ => {
                let weekdays: Vec<Option<i64>> = stamps.iter().map(|ts| ts.map(weekday_of)).collect();
                let with_weekday =
                    table.with_column(Column::ints(WEEKDAY_COLUMN, weekdays.iter().copied()))?;
                (with_weekday, weekdays)
            }
        };

        let values: Vec<Option<i64>> = stamps
            .iter()
            .zip(&weekdays)
            .map(|(ts, weekday)| match (ts, weekday) {
                (Some(ts), Some(weekday)) => Some(utility_of(ts.date(), *weekday, &self.holidays)),
                _ => None,
            })
            .collect();
        Ok(table.with_column(Column::ints(UTILITY_COLUMN, values))?)
    }

    pub fn add_season(&self, table: &Table) -> Result<Table, FeatureError> {
        let stamps = self.guarded(table, CalendarFeature::Season)?;
        let values = stamps.iter().map(|ts| ts.map(|t| season_of(t.month())));
        Ok(table.with_column(Column::ints(SEASON_COLUMN, values))?)
    }

    /// Adds shift, weekday, utility and season, in that order.
    pub fn derive_all(&self, table: &Table) -> Result<Table, FeatureError> {
        let table = self.add_shift(table)?;
        let table = self.add_weekday(&table)?;
        let table = self.add_utility(&table)?;
        self.add_season(&table)
    }

    fn guarded<'t>(
        &self,
        table: &'t Table,
        feature: CalendarFeature,
    ) -> Result<&'t [Option<NaiveDateTime>], FeatureError> {
        self.validator
            .check(table, &self.timestamp_column, feature.max_interval())?;
        Ok(table.timestamps(&self.timestamp_column)?)
    }
}

impl Default for CalendarFeatures {
    fn default() -> Self {
        Self::new(HolidayCalendar::default(), TimeRangeValidator::default())
    }
}
