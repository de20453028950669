//! Time helpers: resample granularities and second/duration conversion.
//!
//! All timestamps in the crate are junction-local wall-clock times
//! (`NaiveDateTime`); rush windows and hour-of-day patterns are defined on the
//! local clock.

use chrono::{Datelike, Duration, NaiveDate, NaiveDateTime, NaiveTime, Timelike};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{ErrorContext, SchedulerError};

/// Bucket width used when resampling history.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Granularity {
    Hourly,
    #[default]
    Daily,
    /// Calendar weeks starting Monday 00:00.
    Weekly,
    /// Calendar months starting on the 1st.
    Monthly,
}

impl Granularity {
    /// Start of the window containing `at`.
    pub fn window_start(self, at: NaiveDateTime) -> NaiveDateTime {
        let date = at.date();
        match self {
            Granularity::Hourly => date.and_time(
                NaiveTime::from_hms_opt(at.hour(), 0, 0).unwrap_or(NaiveTime::MIN),
            ),
            Granularity::Daily => date.and_time(NaiveTime::MIN),
            Granularity::Weekly => {
                let offset = i64::from(date.weekday().num_days_from_monday());
                date.checked_sub_signed(Duration::days(offset))
                    .unwrap_or(date)
                    .and_time(NaiveTime::MIN)
            }
            Granularity::Monthly => NaiveDate::from_ymd_opt(date.year(), date.month(), 1)
                .unwrap_or(date)
                .and_time(NaiveTime::MIN),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Granularity::Hourly => "hourly",
            Granularity::Daily => "daily",
            Granularity::Weekly => "weekly",
            Granularity::Monthly => "monthly",
        }
    }
}

impl fmt::Display for Granularity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Granularity {
    type Err = SchedulerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "hourly" | "hour" | "h" => Ok(Granularity::Hourly),
            "daily" | "day" | "d" => Ok(Granularity::Daily),
            "weekly" | "week" | "w" => Ok(Granularity::Weekly),
            "monthly" | "month" | "m" => Ok(Granularity::Monthly),
            other => Err(SchedulerError::invalid_input_with_context(
                format!("unknown granularity '{}'", other),
                ErrorContext::new("parse_granularity"),
            )),
        }
    }
}

/// Convert fractional seconds to a duration with microsecond resolution.
pub fn seconds_to_duration(seconds: f64) -> Duration {
    Duration::microseconds((seconds * 1e6).round() as i64)
}

/// Convert a duration back to fractional seconds.
pub fn duration_to_seconds(duration: Duration) -> f64 {
    match duration.num_microseconds() {
        Some(us) => us as f64 / 1e6,
        None => duration.num_milliseconds() as f64 / 1e3,
    }
}
