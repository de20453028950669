//! JSON-lines history repository.
//!
//! Each sample is one serialized `LoadSample` per line. Writes append to the
//! file; reads scan it. Malformed lines are reported with their line number.

use parking_lot::Mutex;
use std::collections::BTreeSet;
use std::fs::{self, File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

use crate::db::repository::HistoryRepository;
use crate::error::{ErrorContext, SchedulerError, SchedulerResult};
use crate::models::{LoadSample, SectionId};

/// File-backed append-only repository.
pub struct JsonLinesRepository {
    path: PathBuf,
    // serialises writers within this process
    writer: Mutex<()>,
}

impl JsonLinesRepository {
    /// Open (or create) a history file.
    pub fn open<P: AsRef<Path>>(path: P) -> SchedulerResult<Self> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(|e| {
                    SchedulerError::persistence_with_context(
                        e.to_string(),
                        ErrorContext::new("open_history").with_details(path.display().to_string()),
                    )
                })?;
            }
        }
        OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(|e| {
                SchedulerError::persistence_with_context(
                    e.to_string(),
                    ErrorContext::new("open_history").with_details(path.display().to_string()),
                )
            })?;
        Ok(Self {
            path,
            writer: Mutex::new(()),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_all(&self) -> SchedulerResult<Vec<LoadSample>> {
        let file = File::open(&self.path)?;
        let mut samples = Vec::new();
        for (line_no, line) in BufReader::new(file).lines().enumerate() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            let sample: LoadSample = serde_json::from_str(&line).map_err(|e| {
                SchedulerError::persistence_with_context(
                    format!("malformed history line {}: {}", line_no + 1, e),
                    ErrorContext::new("read_history").with_details(self.path.display().to_string()),
                )
            })?;
            samples.push(sample);
        }
        Ok(samples)
    }
}

impl HistoryRepository for JsonLinesRepository {
    fn append(&self, sample: &LoadSample) -> SchedulerResult<()> {
        let line = serde_json::to_string(sample).map_err(|e| {
            SchedulerError::persistence_with_context(
                e.to_string(),
                ErrorContext::new("append_history").with_section(&sample.section),
            )
        })?;
        let _guard = self.writer.lock();
        let mut file = OpenOptions::new().append(true).open(&self.path)?;
        writeln!(file, "{}", line)?;
        Ok(())
    }

    fn list_by_section(&self, section: &SectionId) -> SchedulerResult<Vec<LoadSample>> {
        Ok(self
            .read_all()?
            .into_iter()
            .filter(|s| &s.section == section)
            .collect())
    }

    fn sections(&self) -> SchedulerResult<Vec<SectionId>> {
        let unique: BTreeSet<SectionId> = self.read_all()?.into_iter().map(|s| s.section).collect();
        Ok(unique.into_iter().collect())
    }

    fn health_check(&self) -> SchedulerResult<bool> {
        Ok(self.path.exists())
    }
}
