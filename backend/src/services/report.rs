//! Per-section traffic reports: trend, prediction, peak hours, weekday
//! patterns and wait/throughput performance.

use chrono::{Datelike, NaiveDateTime, Timelike};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BTreeMap;

use super::prediction::{trend_from_windows, LoadPrediction, PredictionEngine, TrendSummary};
use super::stats::{mean, population_std_dev};
use crate::db::history_store::resample_samples;
use crate::db::HistoryStore;
use crate::error::{SchedulerError, SchedulerResult};
use crate::models::{Granularity, LoadSample, SectionId};

/// How many peak hours a report lists.
pub const PEAK_HOUR_COUNT: usize = 3;

const WEEKDAY_NAMES: [&str; 7] = [
    "Monday",
    "Tuesday",
    "Wednesday",
    "Thursday",
    "Friday",
    "Saturday",
    "Sunday",
];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PeakHour {
    /// Hour of day, 0-23
    pub hour: u32,
    pub mean_load: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeekdayAverage {
    /// Monday = 0 … Sunday = 6
    pub weekday: u32,
    pub name: String,
    pub mean_load: f64,
    pub sample_count: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PerformanceMetrics {
    pub mean_wait_time: f64,
    pub wait_time_std: f64,
    pub mean_throughput: f64,
    pub throughput_std: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrafficReport {
    pub section: SectionId,
    pub generated_for: NaiveDateTime,
    pub sample_count: usize,
    pub trend: Option<TrendSummary>,
    pub prediction: Option<LoadPrediction>,
    pub peak_hours: Vec<PeakHour>,
    pub weekday_averages: Vec<WeekdayAverage>,
    pub busiest_day: Option<WeekdayAverage>,
    pub quietest_day: Option<WeekdayAverage>,
    pub performance: PerformanceMetrics,
}

/// Build a report for `section` from one consistent history snapshot.
///
/// Fails with `InvalidInput` when the section has never been observed.
pub fn build_report(
    history: &HistoryStore,
    engine: &PredictionEngine,
    section: &SectionId,
    granularity: Granularity,
    at: NaiveDateTime,
) -> SchedulerResult<TrafficReport> {
    let samples: Vec<LoadSample> = history
        .with_samples(section, |samples| samples.iter().cloned().collect())
        .ok_or_else(|| SchedulerError::unknown_section(section, "traffic_report"))?;

    let weekday_averages = weekday_averages(&samples);
    let busiest_day = pick_day(&weekday_averages, Ordering::Greater);
    let quietest_day = pick_day(&weekday_averages, Ordering::Less);

    Ok(TrafficReport {
        section: section.clone(),
        generated_for: at,
        sample_count: samples.len(),
        trend: trend_from_windows(resample_samples(samples.iter(), granularity), granularity),
        prediction: engine.predict(section, at),
        peak_hours: peak_hours(&samples, PEAK_HOUR_COUNT),
        busiest_day,
        quietest_day,
        weekday_averages,
        performance: performance(&samples),
    })
}

/// Hours of day with the highest mean load, descending; ties by hour.
pub(crate) fn peak_hours(samples: &[LoadSample], n: usize) -> Vec<PeakHour> {
    let mut by_hour: BTreeMap<u32, Vec<f64>> = BTreeMap::new();
    for sample in samples {
        by_hour
            .entry(sample.timestamp.hour())
            .or_default()
            .push(sample.weighted_load);
    }

    let mut hours: Vec<PeakHour> = by_hour
        .into_iter()
        .filter_map(|(hour, loads)| mean(&loads).map(|mean_load| PeakHour { hour, mean_load }))
        .collect();
    hours.sort_by(|a, b| match b.mean_load.total_cmp(&a.mean_load) {
        Ordering::Equal => a.hour.cmp(&b.hour),
        other => other,
    });
    hours.truncate(n);
    hours
}

pub(crate) fn weekday_averages(samples: &[LoadSample]) -> Vec<WeekdayAverage> {
    let mut by_day: BTreeMap<u32, Vec<f64>> = BTreeMap::new();
    for sample in samples {
        by_day
            .entry(sample.timestamp.weekday().num_days_from_monday())
            .or_default()
            .push(sample.weighted_load);
    }

    by_day
        .into_iter()
        .filter_map(|(weekday, loads)| {
            Some(WeekdayAverage {
                weekday,
                name: WEEKDAY_NAMES[weekday as usize].to_string(),
                mean_load: mean(&loads)?,
                sample_count: loads.len(),
            })
        })
        .collect()
}

/// First day (lowest weekday) whose mean is extreme in the `wanted` direction.
fn pick_day(days: &[WeekdayAverage], wanted: Ordering) -> Option<WeekdayAverage> {
    let mut best: Option<&WeekdayAverage> = None;
    for day in days {
        match best {
            Some(current) if day.mean_load.total_cmp(&current.mean_load) != wanted => {}
            _ => best = Some(day),
        }
    }
    best.cloned()
}

fn performance(samples: &[LoadSample]) -> PerformanceMetrics {
    let waits: Vec<f64> = samples.iter().map(|s| s.wait_time).collect();
    let throughputs: Vec<f64> = samples.iter().map(|s| s.throughput).collect();
    PerformanceMetrics {
        mean_wait_time: mean(&waits).unwrap_or(0.0),
        wait_time_std: population_std_dev(&waits).unwrap_or(0.0),
        mean_throughput: mean(&throughputs).unwrap_or(0.0),
        throughput_std: population_std_dev(&throughputs).unwrap_or(0.0),
    }
}
