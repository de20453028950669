//! History store retention, resampling and file-backed persistence.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{Duration, NaiveDate, NaiveDateTime};
use signal_scheduler::config::SchedulerConfig;
use signal_scheduler::db::{
    HistoryRepository, HistoryStore, JsonLinesRepository, RepositoryFactory, RepositoryType,
    RetentionPolicy,
};
use signal_scheduler::models::{
    Granularity, LoadSample, SectionId, VehicleClass, VehicleCounts, WeatherCondition,
};
use signal_scheduler::{CycleInput, Orchestrator};

fn start() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2024, 3, 11)
        .unwrap()
        .and_hms_opt(0, 0, 0)
        .unwrap()
}

fn section(name: &str) -> SectionId {
    SectionId::new(name).unwrap()
}

#[test]
fn test_hourly_resample_conserves_sample_count() {
    let store = HistoryStore::new(RetentionPolicy::max_samples(10_000));
    let s1 = section("s1");
    let n = 500;
    for i in 0..n {
        store.append(LoadSample::new(
            s1.clone(),
            (i % 37) as f64,
            start() + Duration::minutes(7 * i),
            WeatherCondition::Normal,
        ));
    }

    let windows = store.resample(&s1, Granularity::Hourly);
    let total: usize = windows.iter().map(|w| w.sample_count).sum();
    assert_eq!(total, n as usize);
    for pair in windows.windows(2) {
        assert!(pair[0].window_start < pair[1].window_start);
    }
}

#[test]
fn test_jsonl_repository_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let repo = JsonLinesRepository::open(dir.path().join("history.jsonl")).unwrap();

    let mut sample = LoadSample::new(section("s2"), 12.5, start(), WeatherCondition::parse("hail"));
    sample.wait_time = 33.0;
    repo.append(&sample).unwrap();
    repo.append(&LoadSample::new(section("s1"), 4.0, start(), WeatherCondition::Rain))
        .unwrap();

    assert_eq!(repo.sections().unwrap(), vec![section("s1"), section("s2")]);
    let listed = repo.list_by_section(&section("s2")).unwrap();
    assert_eq!(listed, vec![sample]);
    assert_eq!(listed[0].weather.label(), "hail");
}

#[test]
fn test_malformed_history_line_is_persistence_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("history.jsonl");
    std::fs::write(&path, "{not json}\n").unwrap();
    let repo = JsonLinesRepository::open(&path).unwrap();
    let err = repo.sections().unwrap_err();
    assert!(err.to_string().contains("line 1"));
}

#[test]
fn test_orchestrator_restart_replays_history() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("history.jsonl");

    let mut config = SchedulerConfig::default();
    config.repository.repo_type = "jsonl".to_string();
    config.repository.path = Some(path.clone());

    {
        let orch = Orchestrator::from_config(config.clone()).unwrap();
        for i in 0..5 {
            let mut counts = BTreeMap::new();
            counts.insert(section("s1"), VehicleCounts::zero().with(VehicleClass::Bus, 1 + i));
            orch.run_cycle(CycleInput::new(
                counts,
                WeatherCondition::Normal,
                start() + Duration::hours(i64::from(i)),
            ))
            .unwrap();
        }
    }

    let restarted = Orchestrator::from_config(config).unwrap();
    assert_eq!(restarted.history().len(&section("s1")), 5);
    assert!(restarted.health_check().unwrap());
    let report = restarted
        .report(&section("s1"), Granularity::Hourly, start())
        .unwrap();
    assert_eq!(report.sample_count, 5);
}

#[test]
fn test_hydrate_respects_retention() {
    let repo = RepositoryFactory::create(RepositoryType::Memory, None).unwrap();
    for i in 0..20 {
        repo.append(&LoadSample::new(
            section("s1"),
            i as f64,
            start() + Duration::minutes(i),
            WeatherCondition::Normal,
        ))
        .unwrap();
    }

    let store = HistoryStore::new(RetentionPolicy::max_samples(8));
    assert_eq!(store.hydrate(repo.as_ref()).unwrap(), 20);
    let loads = store.loads(&section("s1"));
    assert_eq!(loads.len(), 8);
    assert_eq!(loads[0], 12.0);
}

#[test]
fn test_concurrent_cycles_share_history() {
    let orch = Arc::new(
        Orchestrator::new(
            SchedulerConfig::default(),
            RepositoryFactory::create_memory(),
        )
        .unwrap(),
    );

    let handles: Vec<_> = (0..4)
        .map(|t| {
            let orch = Arc::clone(&orch);
            std::thread::spawn(move || {
                for i in 0..25 {
                    let mut counts = BTreeMap::new();
                    counts.insert(
                        SectionId::new(format!("s{}", t)).unwrap(),
                        VehicleCounts::zero().with(VehicleClass::Car, i),
                    );
                    counts.insert(
                        SectionId::new("shared").unwrap(),
                        VehicleCounts::zero().with(VehicleClass::Van, i),
                    );
                    orch.run_cycle(CycleInput::new(
                        counts,
                        WeatherCondition::Normal,
                        start() + Duration::minutes(i64::from(i)),
                    ))
                    .unwrap();
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    assert_eq!(orch.history().len(&section("shared")), 100);
    for t in 0..4 {
        assert_eq!(orch.history().len(&section(&format!("s{}", t))), 25);
    }
}
