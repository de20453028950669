//! Data Transfer Objects for the HTTP API.
//!
//! Domain results (`CycleReport`, `TrafficReport`, `LoadPrediction`,
//! `TrendSummary`) already derive Serialize and are returned as-is.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::models::{
    Detection, Granularity, OverlapRule, Region, SectionId, SectionObservation, WeatherCondition,
};
use crate::services::{LoadPrediction, RawSectionCounts, TrendSummary};

pub use crate::services::{CycleReport, TrafficReport};

/// Request body for a scheduling cycle from per-section counts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CycleRequest {
    /// Section name → vehicle class name → count; all ten classes required
    pub counts: RawSectionCounts,
    #[serde(default)]
    pub weather: String,
    /// Junction-local cycle start; defaults to the server's local clock
    #[serde(default)]
    pub timestamp: Option<NaiveDateTime>,
    #[serde(default)]
    pub observations: BTreeMap<SectionId, SectionObservation>,
}

/// Request body for a scheduling cycle from raw detector output.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetectionCycleRequest {
    pub regions: Vec<Region>,
    pub detections: Vec<Detection>,
    #[serde(default)]
    pub rule: OverlapRule,
    #[serde(default)]
    pub weather: WeatherCondition,
    #[serde(default)]
    pub timestamp: Option<NaiveDateTime>,
}

/// Request body for recording an externally computed sample.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecordSampleRequest {
    pub weighted_load: f64,
    #[serde(default)]
    pub timestamp: Option<NaiveDateTime>,
    #[serde(default)]
    pub weather: WeatherCondition,
    #[serde(default)]
    pub wait_time: f64,
    #[serde(default)]
    pub throughput: f64,
}

/// Response for a recorded sample.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecordSampleResponse {
    pub section: SectionId,
    pub timestamp: NaiveDateTime,
    /// Samples retained for the section after the append
    pub retained: usize,
}

/// Query parameters for the prediction endpoint.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct PredictionQuery {
    #[serde(default)]
    pub at: Option<NaiveDateTime>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PredictionResponse {
    pub section: SectionId,
    pub at: NaiveDateTime,
    /// Absent when no history matches
    pub prediction: Option<LoadPrediction>,
}

/// Query parameters for the anomaly endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnomalyQuery {
    pub load: f64,
    /// Overrides the configured z threshold
    #[serde(default)]
    pub z: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnomalyResponse {
    pub section: SectionId,
    pub load: f64,
    pub z_threshold: f64,
    pub anomalous: bool,
    pub sample_count: usize,
}

/// Query parameters for the trend endpoint.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct TrendQuery {
    /// hourly, daily (default), weekly or monthly
    #[serde(default)]
    pub granularity: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrendResponse {
    pub section: SectionId,
    pub granularity: Granularity,
    /// Absent when fewer than two windows hold samples
    pub trend: Option<TrendSummary>,
}

/// Query parameters for the report endpoint.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ReportQuery {
    #[serde(default)]
    pub granularity: Option<String>,
    #[serde(default)]
    pub at: Option<NaiveDateTime>,
}

/// Health check response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    /// Status of the service
    pub status: String,
    /// Version of the API
    pub version: String,
    /// History repository status
    pub repository: String,
    /// Sections with recorded history
    pub sections: usize,
}
