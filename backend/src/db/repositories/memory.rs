//! In-memory history repository.

use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::sync::Arc;

use crate::db::repository::HistoryRepository;
use crate::error::SchedulerResult;
use crate::models::{LoadSample, SectionId};

/// In-memory repository.
///
/// Nothing survives the process; useful for tests and for deployments that
/// do not need history across restarts.
#[derive(Clone, Default)]
pub struct InMemoryRepository {
    data: Arc<RwLock<BTreeMap<SectionId, Vec<LoadSample>>>>,
}

impl InMemoryRepository {
    /// Create a new empty repository.
    pub fn new() -> Self {
        Self::default()
    }

    /// Total number of stored samples across all sections.
    pub fn sample_count(&self) -> usize {
        self.data.read().values().map(Vec::len).sum()
    }

    /// Clear all data from the repository.
    pub fn clear(&self) {
        self.data.write().clear();
    }
}

impl HistoryRepository for InMemoryRepository {
    fn append(&self, sample: &LoadSample) -> SchedulerResult<()> {
        self.data
            .write()
            .entry(sample.section.clone())
            .or_default()
            .push(sample.clone());
        Ok(())
    }

    fn list_by_section(&self, section: &SectionId) -> SchedulerResult<Vec<LoadSample>> {
        Ok(self.data.read().get(section).cloned().unwrap_or_default())
    }

    fn sections(&self) -> SchedulerResult<Vec<SectionId>> {
        Ok(self.data.read().keys().cloned().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::WeatherCondition;
    use chrono::NaiveDate;

    #[test]
    fn test_append_and_list() {
        let repo = InMemoryRepository::new();
        let ts = NaiveDate::from_ymd_opt(2024, 3, 14)
            .unwrap()
            .and_hms_opt(8, 0, 0)
            .unwrap();
        let s1 = SectionId::new("s1").unwrap();
        repo.append(&LoadSample::new(s1.clone(), 12.0, ts, WeatherCondition::Rain))
            .unwrap();
        repo.append(&LoadSample::new(s1.clone(), 14.0, ts, WeatherCondition::Rain))
            .unwrap();

        assert_eq!(repo.list_by_section(&s1).unwrap().len(), 2);
        assert_eq!(repo.sections().unwrap(), vec![s1]);
        assert_eq!(repo.sample_count(), 2);

        repo.clear();
        assert_eq!(repo.sample_count(), 0);
    }
}
