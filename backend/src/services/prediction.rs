//! History-based load prediction, anomaly detection and trends.
//!
//! Missing history never fails: `predict` and `trend` return `None` and
//! `adjust_duration` falls back to the base duration.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::debug;

use super::stats::{linear_regression, mean, population_std_dev};
use crate::config::PredictionSettings;
use crate::db::{HistoryStore, ResampledWindow};
use crate::models::{Granularity, SectionId};

/// Expected load at a time-of-week, from matching history.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LoadPrediction {
    pub expected_load: f64,
    /// Population standard deviation of the matched loads
    pub std_dev: f64,
    pub sample_count: usize,
}

/// Regression of window mean load against window index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrendSummary {
    pub granularity: Granularity,
    /// Load change per window
    pub slope: f64,
    pub correlation: f64,
    pub mean_load: f64,
    pub mean_wait: f64,
    pub mean_throughput: f64,
    pub windows: Vec<ResampledWindow>,
}

pub struct PredictionEngine {
    history: Arc<HistoryStore>,
    settings: PredictionSettings,
}

impl PredictionEngine {
    pub fn new(history: Arc<HistoryStore>, settings: PredictionSettings) -> Self {
        Self { history, settings }
    }

    pub fn settings(&self) -> &PredictionSettings {
        &self.settings
    }

    /// Mean and spread of loads recorded at the same hour and weekday as `at`.
    pub fn predict(&self, section: &SectionId, at: NaiveDateTime) -> Option<LoadPrediction> {
        let loads: Vec<f64> = self
            .history
            .query_similar(section, at)
            .iter()
            .map(|s| s.weighted_load)
            .collect();

        let expected_load = mean(&loads)?;
        let std_dev = population_std_dev(&loads)?;
        Some(LoadPrediction {
            expected_load,
            std_dev,
            sample_count: loads.len(),
        })
    }

    /// Whether `current_load` deviates more than `z_threshold` standard
    /// deviations from the section's full history.
    ///
    /// Always false below the configured minimum sample count or when the
    /// history has no spread.
    pub fn detect_anomaly(&self, section: &SectionId, current_load: f64, z_threshold: f64) -> bool {
        let loads = self.history.loads(section);
        if loads.len() < self.settings.min_anomaly_samples {
            return false;
        }
        let (Some(mean_load), Some(std_dev)) = (mean(&loads), population_std_dev(&loads)) else {
            return false;
        };
        if std_dev == 0.0 {
            return false;
        }

        let z = (current_load - mean_load).abs() / std_dev;
        let anomalous = z > z_threshold;
        if anomalous {
            debug!(section = %section, current_load, mean_load, std_dev, z, "load anomaly");
        }
        anomalous
    }

    /// `detect_anomaly` with the configured threshold.
    pub fn detect_anomaly_default(&self, section: &SectionId, current_load: f64) -> bool {
        self.detect_anomaly(section, current_load, self.settings.z_threshold)
    }

    /// Trend over the section's resampled history; `None` below two windows.
    pub fn trend(&self, section: &SectionId, granularity: Granularity) -> Option<TrendSummary> {
        let windows = self.history.resample(section, granularity);
        trend_from_windows(windows, granularity)
    }

    /// Scale `base_duration` up or down when `current_load` falls outside one
    /// standard deviation of the predicted load at `at`.
    pub fn adjust_duration(
        &self,
        section: &SectionId,
        current_load: f64,
        base_duration: f64,
        at: NaiveDateTime,
    ) -> f64 {
        let Some(prediction) = self.predict(section, at) else {
            return base_duration;
        };

        let upper = prediction.expected_load + prediction.std_dev;
        let lower = prediction.expected_load - prediction.std_dev;
        if current_load > upper {
            base_duration * self.settings.increase_factor
        } else if current_load < lower {
            base_duration * self.settings.decrease_factor
        } else {
            base_duration
        }
    }
}

pub(crate) fn trend_from_windows(
    windows: Vec<ResampledWindow>,
    granularity: Granularity,
) -> Option<TrendSummary> {
    let index: Vec<f64> = (0..windows.len()).map(|i| i as f64).collect();
    let loads: Vec<f64> = windows.iter().map(|w| w.mean_weighted_load).collect();
    let fit = linear_regression(&index, &loads)?;

    let waits: Vec<f64> = windows.iter().map(|w| w.mean_wait_time).collect();
    let throughputs: Vec<f64> = windows.iter().map(|w| w.mean_throughput).collect();

    Some(TrendSummary {
        granularity,
        slope: fit.slope,
        correlation: fit.correlation,
        mean_load: mean(&loads)?,
        mean_wait: mean(&waits)?,
        mean_throughput: mean(&throughputs)?,
        windows,
    })
}
