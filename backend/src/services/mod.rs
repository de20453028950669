//! Service layer: load aggregation, scheduling, prediction and reporting.
//!
//! The hard core is `load_aggregator`, `schedule_generator` and `prediction`
//! over the `db::HistoryStore`. `orchestrator` wires them into one cycle;
//! `detection` and `report` are the upstream and monitoring edges.

pub mod detection;
pub mod load_aggregator;
pub mod orchestrator;
pub mod prediction;
pub mod report;
pub mod schedule_generator;
mod stats;

pub use detection::{count_detections, load_regions, parse_regions};
pub use load_aggregator::{parse_section_counts, LoadAggregator, RawSectionCounts, SectionLoads};
pub use orchestrator::{CycleInput, CycleReport, Orchestrator};
pub use prediction::{LoadPrediction, PredictionEngine, TrendSummary};
pub use report::{PeakHour, PerformanceMetrics, TrafficReport, WeekdayAverage};
pub use schedule_generator::ScheduleGenerator;
