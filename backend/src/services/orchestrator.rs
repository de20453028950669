//! One scheduling cycle end to end: counts → loads → anomaly flags →
//! schedule → feedback hints → history.
//!
//! The orchestrator owns the history store explicitly and shares it with the
//! prediction engine through an `Arc`. Cycles are computed synchronously;
//! concurrent callers only contend on the per-section history locks.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, info, warn};

use super::detection::count_detections;
use super::load_aggregator::{parse_section_counts, LoadAggregator, RawSectionCounts, SectionLoads};
use super::prediction::{LoadPrediction, PredictionEngine, TrendSummary};
use super::report::{build_report, TrafficReport};
use super::schedule_generator::ScheduleGenerator;
use crate::config::SchedulerConfig;
use crate::db::{HistoryRepository, HistoryStore, RepositoryFactory, RetentionPolicy};
use crate::error::{ErrorContext, SchedulerError, SchedulerResult};
use crate::models::{
    Detection, Granularity, LoadSample, OverlapRule, Region, ScheduleEntry, SectionId,
    SectionObservation, VehicleCounts, WeatherCondition,
};

/// Inputs for one scheduling cycle.
#[derive(Debug, Clone)]
pub struct CycleInput {
    pub counts: BTreeMap<SectionId, VehicleCounts>,
    pub weather: WeatherCondition,
    pub at: NaiveDateTime,
    /// Optional wait/throughput per section; missing sections record zeros
    pub observations: BTreeMap<SectionId, SectionObservation>,
}

impl CycleInput {
    pub fn new(
        counts: BTreeMap<SectionId, VehicleCounts>,
        weather: WeatherCondition,
        at: NaiveDateTime,
    ) -> Self {
        Self {
            counts,
            weather,
            at,
            observations: BTreeMap::new(),
        }
    }

    pub fn with_observations(mut self, observations: BTreeMap<SectionId, SectionObservation>) -> Self {
        self.observations = observations;
        self
    }
}

/// Everything one cycle produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CycleReport {
    pub at: NaiveDateTime,
    pub loads: SectionLoads,
    pub schedule: Vec<ScheduleEntry>,
    /// Anomaly flag per section, judged against history before this cycle
    pub anomalies: BTreeMap<SectionId, bool>,
    /// History-adjusted green duration per section, clamped to bounds.
    /// Advisory only; `schedule` is never rewritten by feedback.
    pub duration_hints: BTreeMap<SectionId, f64>,
}

impl CycleReport {
    pub fn anomalous_sections(&self) -> impl Iterator<Item = &SectionId> {
        self.anomalies
            .iter()
            .filter(|(_, &flag)| flag)
            .map(|(section, _)| section)
    }
}

pub struct Orchestrator {
    config: SchedulerConfig,
    aggregator: LoadAggregator,
    generator: ScheduleGenerator,
    prediction: PredictionEngine,
    history: Arc<HistoryStore>,
    repository: Arc<dyn HistoryRepository>,
}

impl Orchestrator {
    /// Build from configuration, creating the configured repository and
    /// replaying its history.
    pub fn from_config(config: SchedulerConfig) -> SchedulerResult<Self> {
        let repository = RepositoryFactory::from_settings(&config.repository)?;
        Self::new(config, repository)
    }

    /// Build around an existing repository, replaying its history.
    pub fn new(
        config: SchedulerConfig,
        repository: Arc<dyn HistoryRepository>,
    ) -> SchedulerResult<Self> {
        config.validate()?;

        let history = Arc::new(HistoryStore::new(RetentionPolicy::from(&config.history)));
        let replayed = history.hydrate(repository.as_ref())?;
        info!(
            replayed,
            sections = history.sections().len(),
            "history hydrated from repository"
        );

        Ok(Self {
            aggregator: LoadAggregator::new(config.load.clone()),
            generator: ScheduleGenerator::new(config.timing.clone()),
            prediction: PredictionEngine::new(Arc::clone(&history), config.prediction.clone()),
            history,
            repository,
            config,
        })
    }

    pub fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    pub fn history(&self) -> &Arc<HistoryStore> {
        &self.history
    }

    pub fn prediction(&self) -> &PredictionEngine {
        &self.prediction
    }

    /// Run one full cycle.
    pub fn run_cycle(&self, input: CycleInput) -> SchedulerResult<CycleReport> {
        let CycleInput {
            counts,
            weather,
            at,
            mut observations,
        } = input;

        let loads = self.aggregator.compute_loads(&counts, &weather, at);

        // judged against history before this cycle's samples land
        let anomalies: BTreeMap<SectionId, bool> = loads
            .iter()
            .map(|(section, &load)| {
                (
                    section.clone(),
                    self.prediction.detect_anomaly_default(section, load),
                )
            })
            .collect();

        let schedule = self.generator.generate(&loads, at)?;

        let duration_hints: BTreeMap<SectionId, f64> = schedule
            .iter()
            .map(|entry| {
                let hint = self.prediction.adjust_duration(
                    &entry.section,
                    entry.weight,
                    entry.duration_seconds,
                    at,
                );
                (entry.section.clone(), self.generator.clamp(hint))
            })
            .collect();

        for (section, &load) in &loads {
            let observation = observations.remove(section).unwrap_or_default();
            let sample =
                LoadSample::new(section.clone(), load, at, weather.clone()).with_observation(observation);
            self.store(sample);
        }
        for section in observations.keys() {
            warn!(section = %section, "observation for section without counts ignored");
        }

        let flagged = anomalies.values().filter(|&&f| f).count();
        if flagged > 0 {
            warn!(at = %at, flagged, "anomalous section loads this cycle");
        }
        info!(
            at = %at,
            sections = loads.len(),
            weather = %weather,
            total_green_secs = schedule.iter().map(|e| e.duration_seconds).sum::<f64>(),
            "scheduling cycle complete"
        );

        Ok(CycleReport {
            at,
            loads,
            schedule,
            anomalies,
            duration_hints,
        })
    }

    /// Validate name-keyed counts, then run a cycle.
    pub fn run_raw_cycle(
        &self,
        counts: &RawSectionCounts,
        weather: &str,
        at: NaiveDateTime,
        observations: BTreeMap<SectionId, SectionObservation>,
    ) -> SchedulerResult<CycleReport> {
        let counts = parse_section_counts(counts)?;
        self.run_cycle(
            CycleInput::new(counts, WeatherCondition::parse(weather), at).with_observations(observations),
        )
    }

    /// Count detections against regions, then run a cycle.
    ///
    /// Every region is validated first; a malformed one fails the whole cycle.
    pub fn run_detection_cycle(
        &self,
        regions: &[Region],
        detections: &[Detection],
        rule: OverlapRule,
        weather: WeatherCondition,
        at: NaiveDateTime,
    ) -> SchedulerResult<CycleReport> {
        for region in regions {
            region
                .validate()
                .map_err(|e| e.with_operation("run_detection_cycle"))?;
        }
        let counts = count_detections(regions, detections, rule);
        self.run_cycle(CycleInput::new(counts, weather, at))
    }

    /// Record an externally computed sample.
    ///
    /// Unlike cycle appends, persistence failures are returned to the caller.
    pub fn record_sample(&self, sample: LoadSample) -> SchedulerResult<()> {
        if !sample.weighted_load.is_finite() || sample.weighted_load < 0.0 {
            return Err(SchedulerError::invalid_input_with_context(
                format!("weighted load must be a finite value >= 0, got {}", sample.weighted_load),
                ErrorContext::new("record_sample").with_section(&sample.section),
            ));
        }
        self.repository.append(&sample)?;
        self.history.append(sample);
        Ok(())
    }

    pub fn predict(&self, section: &SectionId, at: NaiveDateTime) -> Option<LoadPrediction> {
        self.prediction.predict(section, at)
    }

    /// Anomaly check with an explicit or configured z threshold.
    pub fn detect_anomaly(&self, section: &SectionId, load: f64, z_threshold: Option<f64>) -> bool {
        let z = z_threshold.unwrap_or(self.config.prediction.z_threshold);
        self.prediction.detect_anomaly(section, load, z)
    }

    pub fn trend(&self, section: &SectionId, granularity: Granularity) -> Option<TrendSummary> {
        self.prediction.trend(section, granularity)
    }

    pub fn report(
        &self,
        section: &SectionId,
        granularity: Granularity,
        at: NaiveDateTime,
    ) -> SchedulerResult<TrafficReport> {
        build_report(&self.history, &self.prediction, section, granularity, at)
    }

    pub fn health_check(&self) -> SchedulerResult<bool> {
        self.repository.health_check()
    }

    /// Append in memory and write through; a failed write is logged, never fatal.
    fn store(&self, sample: LoadSample) {
        if let Err(e) = self.repository.append(&sample) {
            warn!(section = %sample.section, error = %e, "failed to persist load sample");
        } else {
            debug!(section = %sample.section, load = sample.weighted_load, "persisted load sample");
        }
        self.history.append(sample);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::InMemoryRepository;
    use crate::models::VehicleClass;
    use chrono::{Duration, NaiveDate};

    fn at_hour(day: u32, hour: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 3, day)
            .unwrap()
            .and_hms_opt(hour, 0, 0)
            .unwrap()
    }

    fn section(name: &str) -> SectionId {
        SectionId::new(name).unwrap()
    }

    fn orchestrator() -> (Orchestrator, Arc<InMemoryRepository>) {
        let repo = Arc::new(InMemoryRepository::new());
        let orch = Orchestrator::new(SchedulerConfig::default(), repo.clone()).unwrap();
        (orch, repo)
    }

    fn counts(cars: u32) -> VehicleCounts {
        VehicleCounts::zero().with(VehicleClass::Car, cars)
    }

    #[test]
    fn test_cycle_schedules_and_records() {
        let (orch, repo) = orchestrator();
        let mut input = BTreeMap::new();
        input.insert(section("s1"), counts(16).with(VehicleClass::Van, 3));
        input.insert(section("s2"), counts(1));
        let mut observations = BTreeMap::new();
        observations.insert(
            section("s1"),
            SectionObservation {
                wait_time: 42.0,
                throughput: 9.0,
            },
        );

        let report = orch
            .run_cycle(
                CycleInput::new(input, WeatherCondition::Rain, at_hour(14, 11))
                    .with_observations(observations),
            )
            .unwrap();

        assert_eq!(report.schedule.len(), 2);
        assert_eq!(report.schedule[0].section, section("s1"));
        assert_eq!(report.schedule[0].duration_seconds, 120.0);
        assert_eq!(report.schedule[0].start_time, at_hour(14, 11));
        assert!(report.anomalies.values().all(|&f| !f));
        assert_eq!(report.duration_hints[&section("s1")], 120.0);

        assert_eq!(repo.sample_count(), 2);
        let stored = orch.history().samples(&section("s1"));
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].wait_time, 42.0);
        assert_eq!(orch.history().samples(&section("s2"))[0].throughput, 0.0);
    }

    #[test]
    fn test_empty_cycle() {
        let (orch, _) = orchestrator();
        let report = orch
            .run_cycle(CycleInput::new(BTreeMap::new(), WeatherCondition::Normal, at_hour(14, 3)))
            .unwrap();
        assert!(report.schedule.is_empty());
        assert!(report.loads.is_empty());
    }

    #[test]
    fn test_anomaly_flag_uses_prior_history() {
        let (orch, _) = orchestrator();
        let s1 = section("s1");
        for i in 0..10 {
            let load = if i % 2 == 0 { 90.0 } else { 110.0 };
            orch.record_sample(LoadSample::new(
                s1.clone(),
                load,
                at_hour(1, 3) + Duration::hours(i),
                WeatherCondition::Normal,
            ))
            .unwrap();
        }

        let mut input = BTreeMap::new();
        input.insert(s1.clone(), counts(100));
        let report = orch
            .run_cycle(CycleInput::new(input, WeatherCondition::Normal, at_hour(14, 12)))
            .unwrap();
        assert!(report.anomalies[&s1]);
        assert_eq!(report.anomalous_sections().count(), 1);
        assert_eq!(orch.history().len(&s1), 11);
    }

    #[test]
    fn test_duration_hints_follow_history() {
        let (orch, _) = orchestrator();
        let s1 = section("s1");
        // Thursdays 12:00, loads 100 and 200
        for (day, load) in [(7, 100.0), (14, 200.0)] {
            orch.record_sample(LoadSample::new(s1.clone(), load, at_hour(day, 12), WeatherCondition::Normal))
                .unwrap();
        }

        let mut input = BTreeMap::new();
        // 13 cars: 260 × (1 + 0.2·log10(14)) ≈ 319.6, above 150 + 50
        input.insert(s1.clone(), counts(13));
        let report = orch
            .run_cycle(CycleInput::new(input, WeatherCondition::Normal, at_hour(21, 12)))
            .unwrap();
        let base = report.schedule[0].duration_seconds;
        assert!((report.duration_hints[&s1] - base * 1.2).abs() < 1e-9);
    }

    #[test]
    fn test_raw_cycle_rejects_missing_class() {
        let (orch, repo) = orchestrator();
        let mut raw = RawSectionCounts::new();
        raw.insert("s1".to_string(), [("car".to_string(), 3)].into_iter().collect());
        let err = orch
            .run_raw_cycle(&raw, "clear", at_hour(14, 10), BTreeMap::new())
            .unwrap_err();
        assert!(err.is_invalid_input());
        assert_eq!(repo.sample_count(), 0);
    }

    #[test]
    fn test_record_sample_rejects_negative_load() {
        let (orch, _) = orchestrator();
        let err = orch
            .record_sample(LoadSample::new(section("s1"), -5.0, at_hour(14, 10), WeatherCondition::Normal))
            .unwrap_err();
        assert!(err.is_invalid_input());
        assert!(!orch.history().contains(&section("s1")));
    }

    #[test]
    fn test_history_hydrated_on_start() {
        let repo = Arc::new(InMemoryRepository::new());
        repo.append(&LoadSample::new(section("s9"), 12.0, at_hour(14, 10), WeatherCondition::Normal))
            .unwrap();
        let orch = Orchestrator::new(SchedulerConfig::default(), repo).unwrap();
        assert_eq!(orch.history().loads(&section("s9")), vec![12.0]);
        assert!(orch.report(&section("s9"), Granularity::Daily, at_hour(14, 10)).is_ok());
        assert!(orch.report(&section("s1"), Granularity::Daily, at_hour(14, 10)).is_err());
    }

    #[test]
    fn test_invalid_config_rejected() {
        let mut config = SchedulerConfig::default();
        config.timing.min_duration_secs = 200.0;
        let result = Orchestrator::new(config, Arc::new(InMemoryRepository::new()));
        assert!(result.is_err());
    }
}
