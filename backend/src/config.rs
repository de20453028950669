//! Scheduler configuration file support.
//!
//! Configuration is read from a TOML file. Every field has a default, so an
//! empty file (or no file at all) yields the stock timing constants. A handful
//! of deployment settings can be overridden from the environment.

use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::error::{ErrorContext, SchedulerError, SchedulerResult};

/// Full scheduler configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SchedulerConfig {
    #[serde(default)]
    pub timing: TimingSettings,
    #[serde(default)]
    pub load: LoadSettings,
    #[serde(default)]
    pub history: HistorySettings,
    #[serde(default)]
    pub prediction: PredictionSettings,
    #[serde(default)]
    pub repository: RepositorySettings,
    #[serde(default)]
    pub server: ServerSettings,
}

/// Green duration bounds and green-wave settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimingSettings {
    #[serde(default = "default_min_duration")]
    pub min_duration_secs: f64,
    #[serde(default = "default_max_duration")]
    pub max_duration_secs: f64,
    /// Seconds of green granted per unit of weighted load
    #[serde(default = "default_seconds_per_load_unit")]
    pub seconds_per_load_unit: f64,
    #[serde(default = "default_green_wave_offset")]
    pub green_wave_offset_secs: f64,
    #[serde(default = "default_true")]
    pub green_wave_enabled: bool,
}

/// Contextual load multipliers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoadSettings {
    #[serde(default = "default_rush_multiplier")]
    pub rush_multiplier: f64,
    /// Half-open `[start, end)` hour-of-day windows
    #[serde(default = "default_rush_windows")]
    pub rush_windows: Vec<(u32, u32)>,
    #[serde(default = "default_congestion_coefficient")]
    pub congestion_coefficient: f64,
}

/// History retention bounds.
///
/// `max_age_days = 0` disables time-based eviction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistorySettings {
    #[serde(default = "default_max_samples")]
    pub max_samples_per_section: usize,
    #[serde(default = "default_max_age_days")]
    pub max_age_days: Option<i64>,
}

/// Anomaly and feedback tuning.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionSettings {
    #[serde(default = "default_z_threshold")]
    pub z_threshold: f64,
    #[serde(default = "default_min_anomaly_samples")]
    pub min_anomaly_samples: usize,
    #[serde(default = "default_increase_factor")]
    pub increase_factor: f64,
    #[serde(default = "default_decrease_factor")]
    pub decrease_factor: f64,
}

/// Where history is persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RepositorySettings {
    #[serde(rename = "type", default = "default_repository_type")]
    pub repo_type: String,
    #[serde(default)]
    pub path: Option<PathBuf>,
}

/// HTTP bind address.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerSettings {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_min_duration() -> f64 {
    15.0
}

fn default_max_duration() -> f64 {
    120.0
}

fn default_seconds_per_load_unit() -> f64 {
    0.2
}

fn default_green_wave_offset() -> f64 {
    5.0
}

fn default_true() -> bool {
    true
}

fn default_rush_multiplier() -> f64 {
    1.5
}

fn default_rush_windows() -> Vec<(u32, u32)> {
    vec![(6, 9), (16, 19)]
}

fn default_congestion_coefficient() -> f64 {
    0.2
}

fn default_max_samples() -> usize {
    // one week of one-minute cycles
    10_080
}

fn default_max_age_days() -> Option<i64> {
    Some(90)
}

fn default_z_threshold() -> f64 {
    2.0
}

fn default_min_anomaly_samples() -> usize {
    10
}

fn default_increase_factor() -> f64 {
    1.2
}

fn default_decrease_factor() -> f64 {
    0.8
}

fn default_repository_type() -> String {
    "memory".to_string()
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

impl Default for TimingSettings {
    fn default() -> Self {
        Self {
            min_duration_secs: default_min_duration(),
            max_duration_secs: default_max_duration(),
            seconds_per_load_unit: default_seconds_per_load_unit(),
            green_wave_offset_secs: default_green_wave_offset(),
            green_wave_enabled: true,
        }
    }
}

impl Default for LoadSettings {
    fn default() -> Self {
        Self {
            rush_multiplier: default_rush_multiplier(),
            rush_windows: default_rush_windows(),
            congestion_coefficient: default_congestion_coefficient(),
        }
    }
}

impl Default for HistorySettings {
    fn default() -> Self {
        Self {
            max_samples_per_section: default_max_samples(),
            max_age_days: default_max_age_days(),
        }
    }
}

impl Default for PredictionSettings {
    fn default() -> Self {
        Self {
            z_threshold: default_z_threshold(),
            min_anomaly_samples: default_min_anomaly_samples(),
            increase_factor: default_increase_factor(),
            decrease_factor: default_decrease_factor(),
        }
    }
}

impl Default for RepositorySettings {
    fn default() -> Self {
        Self {
            repo_type: default_repository_type(),
            path: None,
        }
    }
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

impl SchedulerConfig {
    /// Parse configuration from TOML text and validate it.
    pub fn from_toml_str(content: &str) -> SchedulerResult<Self> {
        let config: SchedulerConfig = toml::from_str(content).map_err(|e| {
            SchedulerError::configuration(format!("Failed to parse config file: {}", e))
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a TOML file.
    ///
    /// # Arguments
    /// * `path` - Path to the configuration file
    ///
    /// # Returns
    /// * `Ok(SchedulerConfig)` if the file was read, parsed and validated
    /// * `Err(SchedulerError::Configuration)` otherwise
    pub fn from_file<P: AsRef<Path>>(path: P) -> SchedulerResult<Self> {
        let content = fs::read_to_string(path.as_ref()).map_err(|e| {
            SchedulerError::configuration(format!(
                "Failed to read config file {}: {}",
                path.as_ref().display(),
                e
            ))
        })?;
        Self::from_toml_str(&content)
    }

    /// Load configuration from the default location.
    ///
    /// Searches for `scheduler.toml` in:
    /// 1. Current directory
    /// 2. `backend/` directory
    /// 3. Parent directory
    pub fn from_default_location() -> SchedulerResult<Self> {
        match Self::default_path() {
            Some(path) => Self::from_file(path),
            None => Err(SchedulerError::configuration(
                "No scheduler.toml found in standard locations",
            )),
        }
    }

    fn default_path() -> Option<PathBuf> {
        [
            PathBuf::from("scheduler.toml"),
            PathBuf::from("backend/scheduler.toml"),
            PathBuf::from("../scheduler.toml"),
        ]
        .into_iter()
        .find(|path| path.exists())
    }

    /// Resolve the runtime configuration.
    ///
    /// `SCHEDULER_CONFIG` names the file when set; otherwise the default
    /// location is searched and built-in defaults are used when nothing is
    /// found. Environment overrides are applied last.
    pub fn load() -> SchedulerResult<Self> {
        let config = match env::var("SCHEDULER_CONFIG") {
            Ok(path) => Self::from_file(path)?,
            Err(_) => match Self::default_path() {
                Some(path) => Self::from_file(path)?,
                None => {
                    debug!("no scheduler.toml found, using built-in defaults");
                    Self::default()
                }
            },
        };
        config.apply_env_overrides()
    }

    /// Apply environment overrides.
    ///
    /// # Environment Variables
    /// - `SCHEDULER_HOST`: server host
    /// - `SCHEDULER_PORT`: server port
    /// - `SCHEDULER_HISTORY_PATH`: JSON-lines history file (switches the repository to `jsonl`)
    /// - `SCHEDULER_MAX_SAMPLES`: per-section retention bound
    pub fn apply_env_overrides(mut self) -> SchedulerResult<Self> {
        if let Ok(host) = env::var("SCHEDULER_HOST") {
            self.server.host = host;
        }
        if let Ok(port) = env::var("SCHEDULER_PORT") {
            self.server.port = port.parse().map_err(|_| {
                SchedulerError::configuration("SCHEDULER_PORT must be a valid port number")
            })?;
        }
        if let Ok(path) = env::var("SCHEDULER_HISTORY_PATH") {
            self.repository.repo_type = "jsonl".to_string();
            self.repository.path = Some(PathBuf::from(path));
        }
        if let Ok(max) = env::var("SCHEDULER_MAX_SAMPLES") {
            self.history.max_samples_per_section = max.parse().map_err(|_| {
                SchedulerError::configuration("SCHEDULER_MAX_SAMPLES must be a positive integer")
            })?;
        }
        self.validate()?;
        Ok(self)
    }

    /// Check cross-field invariants.
    pub fn validate(&self) -> SchedulerResult<()> {
        let ctx = || ErrorContext::new("validate_config");
        let t = &self.timing;
        if !(t.min_duration_secs > 0.0 && t.min_duration_secs <= t.max_duration_secs) {
            return Err(SchedulerError::Configuration {
                message: format!(
                    "duration bounds must satisfy 0 < min <= max (min={}, max={})",
                    t.min_duration_secs, t.max_duration_secs
                ),
                context: ctx(),
            });
        }
        if !(t.seconds_per_load_unit > 0.0) || !(t.green_wave_offset_secs >= 0.0) {
            return Err(SchedulerError::Configuration {
                message: "seconds_per_load_unit must be > 0 and green_wave_offset_secs >= 0"
                    .to_string(),
                context: ctx(),
            });
        }
        for &(start, end) in &self.load.rush_windows {
            if start >= end || end > 24 {
                return Err(SchedulerError::Configuration {
                    message: format!("invalid rush window [{}, {})", start, end),
                    context: ctx(),
                });
            }
        }
        if self.history.max_samples_per_section == 0 {
            return Err(SchedulerError::Configuration {
                message: "max_samples_per_section must be at least 1".to_string(),
                context: ctx(),
            });
        }
        if matches!(self.history.max_age_days, Some(days) if days < 0) {
            return Err(SchedulerError::Configuration {
                message: "max_age_days must not be negative".to_string(),
                context: ctx(),
            });
        }
        if !(self.prediction.z_threshold > 0.0) {
            return Err(SchedulerError::Configuration {
                message: "z_threshold must be positive".to_string(),
                context: ctx(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = SchedulerConfig::from_toml_str("").unwrap();
        assert_eq!(config, SchedulerConfig::default());
        assert_eq!(config.timing.min_duration_secs, 15.0);
        assert_eq!(config.timing.max_duration_secs, 120.0);
        assert_eq!(config.load.rush_windows, vec![(6, 9), (16, 19)]);
        assert_eq!(config.prediction.min_anomaly_samples, 10);
        assert_eq!(config.repository.repo_type, "memory");
    }

    #[test]
    fn test_parse_partial_config() {
        let toml = r#"
[timing]
max_duration_secs = 90.0
green_wave_enabled = false

[history]
max_samples_per_section = 500

[repository]
type = "jsonl"
path = "/var/lib/signals/history.jsonl"
"#;

        let config = SchedulerConfig::from_toml_str(toml).unwrap();
        assert_eq!(config.timing.max_duration_secs, 90.0);
        assert_eq!(config.timing.min_duration_secs, 15.0);
        assert!(!config.timing.green_wave_enabled);
        assert_eq!(config.history.max_samples_per_section, 500);
        assert_eq!(config.history.max_age_days, Some(90));
        assert_eq!(config.repository.repo_type, "jsonl");
        assert_eq!(
            config.repository.path,
            Some(PathBuf::from("/var/lib/signals/history.jsonl"))
        );
    }

    #[test]
    fn test_inverted_bounds_rejected() {
        let toml = r#"
[timing]
min_duration_secs = 60.0
max_duration_secs = 30.0
"#;
        let err = SchedulerConfig::from_toml_str(toml).unwrap_err();
        assert!(matches!(err, SchedulerError::Configuration { .. }));
    }

    #[test]
    fn test_bad_rush_window_rejected() {
        let toml = r#"
[load]
rush_windows = [[9, 6]]
"#;
        assert!(SchedulerConfig::from_toml_str(toml).is_err());
    }

    #[test]
    fn test_zero_retention_rejected() {
        let toml = r#"
[history]
max_samples_per_section = 0
"#;
        assert!(SchedulerConfig::from_toml_str(toml).is_err());
    }

    #[test]
    fn test_malformed_toml() {
        let err = SchedulerConfig::from_toml_str("[timing\nmin = ").unwrap_err();
        assert!(err.to_string().contains("Failed to parse config file"));
    }
}
