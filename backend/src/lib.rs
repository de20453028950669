//! # Signal Scheduler
//!
//! Adaptive green-light scheduling for multi-section traffic junctions.
//!
//! Per-section vehicle counts are turned into weighted loads, loads into an
//! ordered schedule of green windows with a green-wave offset, and every cycle
//! is recorded so that history can predict, flag anomalies and report trends.
//!
//! ## Architecture
//!
//! - [`models`]: sections, vehicle counts, weather, samples and schedule entries
//! - [`services`]: load aggregation, schedule generation, prediction, reporting
//!   and the cycle orchestrator
//! - [`db`]: the in-process history store and its persistence seam
//! - [`config`]: TOML configuration with environment overrides
//! - [`http`]: Axum REST surface (feature `http-server`)

pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod services;

#[cfg(feature = "http-server")]
pub mod http;

pub use config::SchedulerConfig;
pub use error::{SchedulerError, SchedulerResult};
pub use services::{CycleInput, CycleReport, Orchestrator};
