use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use smartclinic_core::{AppError, AppResult};

const DATE_FORMAT: &str = "%Y-%m-%d";

/// Inclusive reporting window used by the dashboard analytics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    from: NaiveDate,
    to: NaiveDate,
}

impl DateRange {
    /// Creates a validated range.
    pub fn new(from: NaiveDate, to: NaiveDate) -> AppResult<Self> {
        if from > to {
            return Err(AppError::Validation(format!(
                "date range start {from} is after its end {to}"
            )));
        }

        Ok(Self { from, to })
    }

    /// Parses `YYYY-MM-DD` bounds.
    pub fn parse(from: &str, to: &str) -> AppResult<Self> {
        Self::new(parse_date(from)?, parse_date(to)?)
    }

    /// First day of `today`'s month through `today`.
    #[must_use]
    pub fn month_to_date(today: NaiveDate) -> Self {
        let from = today.with_day(1).unwrap_or(today);
        Self { from, to: today }
    }

    /// Returns the first day.
    #[must_use]
    pub fn start(&self) -> NaiveDate {
        self.from
    }

    /// Returns the last day.
    #[must_use]
    pub fn end(&self) -> NaiveDate {
        self.to
    }

    /// Returns the start as `YYYY-MM-DD`, the query format of the reports API.
    #[must_use]
    pub fn from_param(&self) -> String {
        self.from.format(DATE_FORMAT).to_string()
    }

    /// Returns the end as `YYYY-MM-DD`.
    #[must_use]
    pub fn to_param(&self) -> String {
        self.to.format(DATE_FORMAT).to_string()
    }

    /// Number of days covered, both bounds included.
    #[must_use]
    pub fn days(&self) -> i64 {
        (self.to - self.from).num_days() + 1
    }
}

fn parse_date(value: &str) -> AppResult<NaiveDate> {
    NaiveDate::parse_from_str(value.trim(), DATE_FORMAT)
        .map_err(|error| AppError::Validation(format!("invalid date '{value}': {error}")))
}
