use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use super::{SectionId, WeatherCondition};

/// One historical observation of a section's load.
///
/// Samples are immutable once appended; the history store is their only writer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoadSample {
    pub section: SectionId,
    /// Weighted load, always >= 0
    pub weighted_load: f64,
    /// Junction-local observation time
    pub timestamp: NaiveDateTime,
    pub weather: WeatherCondition,
    /// Mean wait time observed in the section (seconds)
    #[serde(default)]
    pub wait_time: f64,
    /// Vehicles that cleared the section during the observation
    #[serde(default)]
    pub throughput: f64,
}

impl LoadSample {
    pub fn new(
        section: SectionId,
        weighted_load: f64,
        timestamp: NaiveDateTime,
        weather: WeatherCondition,
    ) -> Self {
        Self {
            section,
            weighted_load,
            timestamp,
            weather,
            wait_time: 0.0,
            throughput: 0.0,
        }
    }

    /// Attach wait-time and throughput observations.
    pub fn with_observation(mut self, observation: SectionObservation) -> Self {
        self.wait_time = observation.wait_time;
        self.throughput = observation.throughput;
        self
    }
}

/// Actuation-side measurements reported for a section during a cycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct SectionObservation {
    #[serde(default)]
    pub wait_time: f64,
    #[serde(default)]
    pub throughput: f64,
}
