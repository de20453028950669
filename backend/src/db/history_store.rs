//! In-memory, per-section history of load samples.
//!
//! The store is an explicit instance owned by the orchestrator (and shared
//! through an `Arc` with the HTTP layer). Each section's series sits behind its
//! own lock, so an `append` and a `resample`/`query_similar` on the same section
//! always see a consistent snapshot while different sections never contend.
//!
//! Retention is bounded per section by a sample-count ring buffer and,
//! optionally, by sample age relative to the newest sample.

use chrono::{Datelike, Duration, NaiveDateTime, Timelike};
use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::Arc;
use tracing::{debug, trace};

use super::repository::HistoryRepository;
use crate::config::HistorySettings;
use crate::error::SchedulerResult;
use crate::models::{Granularity, LoadSample, SectionId};

/// Per-section retention bounds.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetentionPolicy {
    pub max_samples: usize,
    pub max_age: Option<Duration>,
}

impl RetentionPolicy {
    /// Keep at most `max_samples` per section, no age bound.
    pub fn max_samples(max_samples: usize) -> Self {
        Self {
            max_samples: max_samples.max(1),
            max_age: None,
        }
    }

    pub fn with_max_age(mut self, max_age: Duration) -> Self {
        self.max_age = Some(max_age);
        self
    }
}

impl Default for RetentionPolicy {
    fn default() -> Self {
        RetentionPolicy::from(&HistorySettings::default())
    }
}

impl From<&HistorySettings> for RetentionPolicy {
    fn from(settings: &HistorySettings) -> Self {
        let policy = RetentionPolicy::max_samples(settings.max_samples_per_section);
        match settings.max_age_days {
            Some(days) if days > 0 => policy.with_max_age(Duration::days(days)),
            _ => policy,
        }
    }
}

/// Mean values over one resample window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResampledWindow {
    pub window_start: NaiveDateTime,
    pub sample_count: usize,
    pub mean_weighted_load: f64,
    pub mean_wait_time: f64,
    pub mean_throughput: f64,
}

#[derive(Default)]
struct SectionLog {
    samples: VecDeque<LoadSample>,
}

impl SectionLog {
    /// Push a sample and apply retention; returns how many samples were evicted.
    fn push(&mut self, sample: LoadSample, retention: &RetentionPolicy) -> usize {
        let newest = match self.samples.back() {
            Some(last) if last.timestamp > sample.timestamp => last.timestamp,
            _ => sample.timestamp,
        };
        self.samples.push_back(sample);

        let mut evicted = 0;
        while self.samples.len() > retention.max_samples {
            self.samples.pop_front();
            evicted += 1;
        }
        // no age eviction when the cutoff falls before the representable range
        if let Some(cutoff) = retention
            .max_age
            .and_then(|max_age| newest.checked_sub_signed(max_age))
        {
            while matches!(self.samples.front(), Some(s) if s.timestamp < cutoff) {
                self.samples.pop_front();
                evicted += 1;
            }
        }
        evicted
    }
}

/// Process-wide history of section loads.
pub struct HistoryStore {
    sections: RwLock<HashMap<SectionId, Arc<Mutex<SectionLog>>>>,
    retention: RetentionPolicy,
}

impl HistoryStore {
    /// Create an empty store with the given retention policy.
    pub fn new(retention: RetentionPolicy) -> Self {
        Self {
            sections: RwLock::new(HashMap::new()),
            retention,
        }
    }

    pub fn retention(&self) -> RetentionPolicy {
        self.retention
    }

    fn section_log(&self, section: &SectionId) -> Option<Arc<Mutex<SectionLog>>> {
        self.sections.read().get(section).cloned()
    }

    fn section_log_or_insert(&self, section: &SectionId) -> Arc<Mutex<SectionLog>> {
        if let Some(log) = self.section_log(section) {
            return log;
        }
        self.sections
            .write()
            .entry(section.clone())
            .or_default()
            .clone()
    }

    /// Append a sample to its section's series. Never fails; no deduplication.
    pub fn append(&self, sample: LoadSample) {
        let section = sample.section.clone();
        let log = self.section_log_or_insert(&section);
        let evicted = log.lock().push(sample, &self.retention);
        if evicted > 0 {
            trace!(section = %section, evicted, "history retention evicted samples");
        }
    }

    /// Run `f` over a consistent snapshot of one section's samples.
    ///
    /// Returns `None` when the section has never been observed.
    pub fn with_samples<R>(
        &self,
        section: &SectionId,
        f: impl FnOnce(&VecDeque<LoadSample>) -> R,
    ) -> Option<R> {
        let log = self.section_log(section)?;
        let guard = log.lock();
        Some(f(&guard.samples))
    }

    /// Copy of every retained sample for a section, oldest first.
    pub fn samples(&self, section: &SectionId) -> Vec<LoadSample> {
        self.with_samples(section, |samples| samples.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Every retained weighted load for a section, oldest first.
    pub fn loads(&self, section: &SectionId) -> Vec<f64> {
        self.with_samples(section, |samples| {
            samples.iter().map(|s| s.weighted_load).collect()
        })
        .unwrap_or_default()
    }

    /// Number of retained samples for a section.
    pub fn len(&self, section: &SectionId) -> usize {
        self.with_samples(section, |samples| samples.len())
            .unwrap_or(0)
    }

    pub fn contains(&self, section: &SectionId) -> bool {
        self.sections.read().contains_key(section)
    }

    /// Sections with at least one recorded sample, sorted.
    pub fn sections(&self) -> Vec<SectionId> {
        let mut ids: Vec<SectionId> = self.sections.read().keys().cloned().collect();
        ids.sort();
        ids
    }

    /// Samples recorded at the same hour-of-day and weekday as `at`.
    ///
    /// An unknown section or no matching sample yields an empty vector.
    pub fn query_similar(&self, section: &SectionId, at: NaiveDateTime) -> Vec<LoadSample> {
        let hour = at.hour();
        let weekday = at.weekday();
        self.with_samples(section, |samples| {
            samples
                .iter()
                .filter(|s| s.timestamp.hour() == hour && s.timestamp.weekday() == weekday)
                .cloned()
                .collect()
        })
        .unwrap_or_default()
    }

    /// Bucket a section's samples by `granularity` and average each bucket.
    ///
    /// Windows are ordered by start time; windows without samples are omitted.
    pub fn resample(&self, section: &SectionId, granularity: Granularity) -> Vec<ResampledWindow> {
        self.with_samples(section, |samples| resample_samples(samples.iter(), granularity))
            .unwrap_or_default()
    }

    /// Replay persisted samples into the store, subject to retention.
    pub fn hydrate(&self, repository: &dyn HistoryRepository) -> SchedulerResult<usize> {
        let mut replayed = 0;
        for section in repository.sections()? {
            let mut samples = repository.list_by_section(&section)?;
            samples.sort_by_key(|s| s.timestamp);
            replayed += samples.len();
            for sample in samples {
                self.append(sample);
            }
        }
        debug!(replayed, sections = self.sections.read().len(), "history hydrated");
        Ok(replayed)
    }
}

impl Default for HistoryStore {
    fn default() -> Self {
        Self::new(RetentionPolicy::default())
    }
}

#[derive(Default)]
struct WindowAccumulator {
    count: usize,
    load: f64,
    wait: f64,
    throughput: f64,
}

pub(crate) fn resample_samples<'a>(
    samples: impl Iterator<Item = &'a LoadSample>,
    granularity: Granularity,
) -> Vec<ResampledWindow> {
    let mut buckets: BTreeMap<NaiveDateTime, WindowAccumulator> = BTreeMap::new();
    for sample in samples {
        let acc = buckets
            .entry(granularity.window_start(sample.timestamp))
            .or_default();
        acc.count += 1;
        acc.load += sample.weighted_load;
        acc.wait += sample.wait_time;
        acc.throughput += sample.throughput;
    }

    buckets
        .into_iter()
        .map(|(window_start, acc)| {
            let n = acc.count as f64;
            ResampledWindow {
                window_start,
                sample_count: acc.count,
                mean_weighted_load: acc.load / n,
                mean_wait_time: acc.wait / n,
                mean_throughput: acc.throughput / n,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::WeatherCondition;

    fn at(s: &str) -> NaiveDateTime {
        NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S").unwrap()
    }

    fn section(name: &str) -> SectionId {
        SectionId::new(name).unwrap()
    }

    fn sample(name: &str, load: f64, ts: &str) -> LoadSample {
        LoadSample::new(section(name), load, at(ts), WeatherCondition::Normal)
    }

    #[test]
    fn test_empty_store() {
        let store = HistoryStore::default();
        let s1 = section("s1");
        assert!(store.samples(&s1).is_empty());
        assert!(store.query_similar(&s1, at("2024-03-14 10:00:00")).is_empty());
        assert!(store.resample(&s1, Granularity::Hourly).is_empty());
        assert!(!store.contains(&s1));
    }

    #[test]
    fn test_append_keeps_order_and_duplicates() {
        let store = HistoryStore::default();
        store.append(sample("s1", 10.0, "2024-03-14 10:00:00"));
        store.append(sample("s1", 10.0, "2024-03-14 10:00:00"));
        store.append(sample("s1", 30.0, "2024-03-14 11:00:00"));
        assert_eq!(store.loads(&section("s1")), vec![10.0, 10.0, 30.0]);
        assert_eq!(store.sections(), vec![section("s1")]);
    }

    #[test]
    fn test_query_similar_matches_hour_and_weekday() {
        let store = HistoryStore::default();
        // 2024-03-14 and 2024-03-21 are Thursdays
        store.append(sample("s1", 1.0, "2024-03-14 08:05:00"));
        store.append(sample("s1", 2.0, "2024-03-21 08:59:59"));
        store.append(sample("s1", 3.0, "2024-03-21 09:00:00"));
        store.append(sample("s1", 4.0, "2024-03-15 08:10:00"));

        let similar = store.query_similar(&section("s1"), at("2024-03-28 08:30:00"));
        let loads: Vec<f64> = similar.iter().map(|s| s.weighted_load).collect();
        assert_eq!(loads, vec![1.0, 2.0]);
    }

    #[test]
    fn test_resample_omits_empty_windows() {
        let store = HistoryStore::default();
        let mut s = sample("s1", 10.0, "2024-03-14 08:10:00");
        s.wait_time = 20.0;
        s.throughput = 4.0;
        store.append(s);
        let mut s = sample("s1", 30.0, "2024-03-14 08:50:00");
        s.wait_time = 40.0;
        s.throughput = 8.0;
        store.append(s);
        store.append(sample("s1", 7.0, "2024-03-14 11:00:00"));

        let windows = store.resample(&section("s1"), Granularity::Hourly);
        assert_eq!(windows.len(), 2);
        assert_eq!(windows[0].window_start, at("2024-03-14 08:00:00"));
        assert_eq!(windows[0].sample_count, 2);
        assert_eq!(windows[0].mean_weighted_load, 20.0);
        assert_eq!(windows[0].mean_wait_time, 30.0);
        assert_eq!(windows[0].mean_throughput, 6.0);
        assert_eq!(windows[1].window_start, at("2024-03-14 11:00:00"));
        assert_eq!(windows[1].mean_weighted_load, 7.0);
    }

    #[test]
    fn test_ring_buffer_retention() {
        let store = HistoryStore::new(RetentionPolicy::max_samples(3));
        for (i, ts) in [
            "2024-03-14 08:00:00",
            "2024-03-14 08:01:00",
            "2024-03-14 08:02:00",
            "2024-03-14 08:03:00",
            "2024-03-14 08:04:00",
        ]
        .iter()
        .enumerate()
        {
            store.append(sample("s1", i as f64, ts));
        }
        assert_eq!(store.loads(&section("s1")), vec![2.0, 3.0, 4.0]);
    }

    #[test]
    fn test_age_retention() {
        let store = HistoryStore::new(
            RetentionPolicy::max_samples(100).with_max_age(Duration::days(1)),
        );
        store.append(sample("s1", 1.0, "2024-03-10 08:00:00"));
        store.append(sample("s1", 2.0, "2024-03-14 07:00:00"));
        store.append(sample("s1", 3.0, "2024-03-14 08:00:00"));
        assert_eq!(store.loads(&section("s1")), vec![2.0, 3.0]);
    }

    #[test]
    fn test_age_retention_near_earliest_timestamp() {
        let store = HistoryStore::new(
            RetentionPolicy::max_samples(100).with_max_age(Duration::days(90)),
        );
        let earliest = LoadSample::new(
            section("s1"),
            7.0,
            NaiveDateTime::MIN,
            WeatherCondition::Normal,
        );
        store.append(earliest.clone());
        store.append(earliest);
        assert_eq!(store.loads(&section("s1")), vec![7.0, 7.0]);
        assert_eq!(store.resample(&section("s1"), Granularity::Weekly).len(), 1);
    }

    #[test]
    fn test_retention_from_settings() {
        let settings = HistorySettings {
            max_samples_per_section: 50,
            max_age_days: Some(0),
        };
        let policy = RetentionPolicy::from(&settings);
        assert_eq!(policy.max_samples, 50);
        assert_eq!(policy.max_age, None);
    }

    #[test]
    fn test_sections_are_independent() {
        let store = HistoryStore::default();
        store.append(sample("s2", 5.0, "2024-03-14 08:00:00"));
        store.append(sample("s1", 6.0, "2024-03-14 08:00:00"));
        assert_eq!(store.len(&section("s1")), 1);
        assert_eq!(store.len(&section("s2")), 1);
        assert_eq!(store.sections(), vec![section("s1"), section("s2")]);
    }

    #[test]
    fn test_concurrent_appends_are_all_recorded() {
        let store = Arc::new(HistoryStore::new(RetentionPolicy::max_samples(10_000)));
        let handles: Vec<_> = (0..4)
            .map(|t| {
                let store = Arc::clone(&store);
                std::thread::spawn(move || {
                    for i in 0..250 {
                        let ts = at("2024-03-14 00:00:00") + Duration::seconds(i);
                        store.append(LoadSample::new(
                            SectionId::new(format!("s{}", t % 2)).unwrap(),
                            i as f64,
                            ts,
                            WeatherCondition::Normal,
                        ));
                        let _ = store.resample(&SectionId::new("s0").unwrap(), Granularity::Hourly);
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }
        assert_eq!(store.len(&section("s0")) + store.len(&section("s1")), 1000);
    }
}
