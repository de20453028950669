//! Persistence seam for section history.
//!
//! The history store is authoritative while the process runs; a repository only
//! keeps samples across restarts. Implementations must be cheap to call once per
//! section per cycle.

use crate::error::SchedulerResult;
use crate::models::{LoadSample, SectionId};

/// Append-only persistence of load samples, listable by section.
pub trait HistoryRepository: Send + Sync {
    /// Persist one sample.
    fn append(&self, sample: &LoadSample) -> SchedulerResult<()>;

    /// All persisted samples for a section, in the order they were appended.
    fn list_by_section(&self, section: &SectionId) -> SchedulerResult<Vec<LoadSample>>;

    /// Sections with at least one persisted sample, sorted.
    fn sections(&self) -> SchedulerResult<Vec<SectionId>>;

    /// Whether the backing storage is reachable.
    fn health_check(&self) -> SchedulerResult<bool> {
        Ok(true)
    }
}
