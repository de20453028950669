//! Repository factory for dependency injection.
//!
//! This module creates history repository instances from runtime
//! configuration.

use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;

use super::repositories::{InMemoryRepository, JsonLinesRepository};
use super::repository::HistoryRepository;
use crate::config::RepositorySettings;
use crate::error::{SchedulerError, SchedulerResult};

/// Repository type configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RepositoryType {
    /// Nothing persisted beyond the process
    Memory,
    /// Append-only JSON-lines file
    JsonLines,
}

impl FromStr for RepositoryType {
    type Err = SchedulerError;

    /// Parse repository type from string ("memory", "local", "jsonl", "file").
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "memory" | "local" => Ok(Self::Memory),
            "jsonl" | "json-lines" | "file" => Ok(Self::JsonLines),
            _ => Err(SchedulerError::configuration(format!(
                "Unknown repository type: {}",
                s
            ))),
        }
    }
}

/// Default history file when the JSON-lines repository has no explicit path.
pub const DEFAULT_HISTORY_PATH: &str = "history.jsonl";

/// Repository factory for creating repository instances.
pub struct RepositoryFactory;

impl RepositoryFactory {
    /// Create a repository instance based on type.
    ///
    /// # Arguments
    /// * `repo_type` - Type of repository to create
    /// * `path` - History file (JSON-lines only; defaults to `history.jsonl`)
    pub fn create(
        repo_type: RepositoryType,
        path: Option<PathBuf>,
    ) -> SchedulerResult<Arc<dyn HistoryRepository>> {
        match repo_type {
            RepositoryType::Memory => Ok(Self::create_memory()),
            RepositoryType::JsonLines => {
                let path = path.unwrap_or_else(|| PathBuf::from(DEFAULT_HISTORY_PATH));
                Ok(Arc::new(JsonLinesRepository::open(path)?))
            }
        }
    }

    /// Create an in-memory repository.
    pub fn create_memory() -> Arc<dyn HistoryRepository> {
        Arc::new(InMemoryRepository::new())
    }

    /// Create a repository from the `[repository]` configuration section.
    pub fn from_settings(settings: &RepositorySettings) -> SchedulerResult<Arc<dyn HistoryRepository>> {
        let repo_type = RepositoryType::from_str(&settings.repo_type)?;
        Self::create(repo_type, settings.path.clone())
    }
}
