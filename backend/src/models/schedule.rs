use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use super::SectionId;

/// One green window in a generated schedule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduleEntry {
    pub section: SectionId,
    pub start_time: NaiveDateTime,
    pub end_time: NaiveDateTime,
    /// Green duration in seconds, within the configured bounds
    pub duration_seconds: f64,
    /// Weighted load that produced this entry
    pub weight: f64,
}

impl ScheduleEntry {
    /// Move the window so that it starts at `start`, keeping its duration.
    ///
    /// Returns `None` and leaves the entry unchanged when the new end time is
    /// not representable.
    pub fn shift_to(&mut self, start: NaiveDateTime) -> Option<()> {
        let length = self.end_time.signed_duration_since(self.start_time);
        let end_time = start.checked_add_signed(length)?;
        self.start_time = start;
        self.end_time = end_time;
        Some(())
    }
}
