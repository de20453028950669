use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{ErrorContext, SchedulerError};

/// Identifier of one signal approach (section) within a junction.
///
/// Identifiers are unique per junction and never empty. Ordering is plain
/// lexicographic, which the schedule generator uses to break load ties.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct SectionId(String);

impl SectionId {
    /// Create a section identifier, rejecting blank names.
    pub fn new(value: impl Into<String>) -> Result<Self, SchedulerError> {
        let value = value.into();
        let trimmed = value.trim();
        if trimmed.is_empty() {
            return Err(SchedulerError::invalid_input_with_context(
                "section identifier must not be empty",
                ErrorContext::new("section_id"),
            ));
        }
        Ok(SectionId(trimmed.to_string()))
    }

    /// Section identifier for a numbered region, e.g. region 3 -> `s3`.
    pub fn for_region(region_id: u32) -> Self {
        SectionId(format!("s{}", region_id))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for SectionId {
    type Err = SchedulerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        SectionId::new(s)
    }
}

impl TryFrom<String> for SectionId {
    type Error = SchedulerError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        SectionId::new(value)
    }
}

impl From<SectionId> for String {
    fn from(id: SectionId) -> Self {
        id.0
    }
}
