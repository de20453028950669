//! Green-light schedule generation.
//!
//! Sections are served in descending load order. Each gets
//! `load × seconds_per_load_unit` seconds of green, clamped to the configured
//! bounds, laid end to end from the cycle start.
//!
//! A green-wave pass then walks adjacent pairs left to right. When the earlier
//! entry runs longer than the minimum duration, the later entry is pushed to
//! start `offset` seconds after the earlier entry's (possibly already shifted)
//! start plus its duration. Entries only ever move forward, so shifts compound
//! along the sequence and no entry overlaps its predecessor.
//!
//! The wave therefore never overlaps green windows: a later section starts
//! `offset` seconds after its predecessor's green ends, not `offset` seconds
//! after it starts. Actuators must not assume overlapping greens.
//!
//! Timestamps near the end of the representable range fail with
//! `InvalidInput` rather than wrapping.

use chrono::NaiveDateTime;
use std::cmp::Ordering;
use tracing::debug;

use super::load_aggregator::SectionLoads;
use crate::config::TimingSettings;
use crate::error::{ErrorContext, SchedulerError, SchedulerResult};
use crate::models::{seconds_to_duration, ScheduleEntry, SectionId};

/// Builds ordered, non-overlapping green windows from section loads.
#[derive(Debug, Clone, Default)]
pub struct ScheduleGenerator {
    settings: TimingSettings,
}

impl ScheduleGenerator {
    pub fn new(settings: TimingSettings) -> Self {
        Self { settings }
    }

    pub fn settings(&self) -> &TimingSettings {
        &self.settings
    }

    /// Clamp a duration into `[min_duration, max_duration]`.
    pub fn clamp(&self, seconds: f64) -> f64 {
        seconds.clamp(self.settings.min_duration_secs, self.settings.max_duration_secs)
    }

    /// Green duration granted to a load.
    pub fn duration_for(&self, load: f64) -> f64 {
        self.clamp(load * self.settings.seconds_per_load_unit)
    }

    /// Contiguous timeline ordered by descending load, before green-wave offsets.
    ///
    /// Ties are broken by section identifier ascending.
    pub fn build_timeline(
        &self,
        loads: &SectionLoads,
        start_time: NaiveDateTime,
    ) -> SchedulerResult<Vec<ScheduleEntry>> {
        validate_loads(loads)?;

        let mut ordered: Vec<(&SectionId, f64)> = loads.iter().map(|(s, &l)| (s, l)).collect();
        ordered.sort_by(|(sa, la), (sb, lb)| match lb.total_cmp(la) {
            Ordering::Equal => sa.cmp(sb),
            other => other,
        });

        let mut cursor = start_time;
        let mut entries = Vec::with_capacity(ordered.len());
        for (section, load) in ordered {
            let duration_seconds = self.duration_for(load);
            let end_time = advance(cursor, duration_seconds, section)?;
            entries.push(ScheduleEntry {
                section: section.clone(),
                start_time: cursor,
                end_time,
                duration_seconds,
                weight: load,
            });
            cursor = end_time;
        }
        Ok(entries)
    }

    /// Shift later entries forward to form a green wave.
    ///
    /// Fails with `InvalidInput` when a shifted window would end past the
    /// representable range; entries before the failing one keep their shifts.
    pub fn apply_green_wave(&self, entries: &mut [ScheduleEntry]) -> SchedulerResult<()> {
        for i in 1..entries.len() {
            let (done, rest) = entries.split_at_mut(i);
            let current = &done[i - 1];
            let next = &mut rest[0];

            let mut gap = current.duration_seconds;
            if current.duration_seconds > self.settings.min_duration_secs {
                gap += self.settings.green_wave_offset_secs;
            }
            let anchor = advance(current.start_time, gap, &next.section)?;
            if anchor > next.start_time {
                debug!(
                    section = %next.section,
                    from = %next.start_time,
                    to = %anchor,
                    "green wave shift"
                );
                next.shift_to(anchor)
                    .ok_or_else(|| out_of_range(&next.section))?;
            }
        }
        Ok(())
    }

    /// Generate the schedule for one cycle.
    ///
    /// An empty load map yields an empty schedule. Negative or non-finite loads
    /// fail with `InvalidInput`.
    pub fn generate(
        &self,
        loads: &SectionLoads,
        start_time: NaiveDateTime,
    ) -> SchedulerResult<Vec<ScheduleEntry>> {
        let mut entries = self.build_timeline(loads, start_time)?;
        if self.settings.green_wave_enabled {
            self.apply_green_wave(&mut entries)?;
        }
        Ok(entries)
    }
}

/// `at + seconds`, or `InvalidInput` when the result is out of range.
fn advance(at: NaiveDateTime, seconds: f64, section: &SectionId) -> SchedulerResult<NaiveDateTime> {
    at.checked_add_signed(seconds_to_duration(seconds))
        .ok_or_else(|| out_of_range(section))
}

fn out_of_range(section: &SectionId) -> SchedulerError {
    SchedulerError::invalid_input_with_context(
        "schedule extends past the latest representable timestamp",
        ErrorContext::new("generate_schedule").with_section(section),
    )
}

fn validate_loads(loads: &SectionLoads) -> SchedulerResult<()> {
    for (section, &load) in loads {
        if !load.is_finite() || load < 0.0 {
            return Err(SchedulerError::invalid_input_with_context(
                format!("weighted load must be a finite value >= 0, got {}", load),
                ErrorContext::new("generate_schedule").with_section(section),
            ));
        }
    }
    Ok(())
}
