//! Weighted load computation.
//!
//! A section's load is the class-weighted vehicle sum scaled by three context
//! multipliers: rush hour, congestion density and weather.
//!
//! ```text
//! load = Σ(count × weight) × time_factor × congestion_factor × weather_factor
//! ```

use chrono::{NaiveDateTime, Timelike};
use std::collections::BTreeMap;
use tracing::{debug, warn};

use crate::config::LoadSettings;
use crate::error::{ErrorContext, SchedulerError, SchedulerResult};
use crate::models::{SectionId, VehicleCounts, WeatherCondition};

/// Weighted load per section.
pub type SectionLoads = BTreeMap<SectionId, f64>;

/// Name-keyed counts per section, as received from the detection collaborator.
pub type RawSectionCounts = BTreeMap<String, BTreeMap<String, i64>>;

/// Converts per-section vehicle counts into weighted loads.
#[derive(Debug, Clone, Default)]
pub struct LoadAggregator {
    settings: LoadSettings,
}

impl LoadAggregator {
    pub fn new(settings: LoadSettings) -> Self {
        Self { settings }
    }

    /// Rush-hour multiplier for the hour of `at`.
    pub fn time_factor(&self, at: NaiveDateTime) -> f64 {
        let hour = at.hour();
        let in_rush = self
            .settings
            .rush_windows
            .iter()
            .any(|&(start, end)| start <= hour && hour < end);
        if in_rush {
            self.settings.rush_multiplier
        } else {
            1.0
        }
    }

    /// Sub-linear density penalty: `1 + c·log10(total + 1)`, or 1 when empty.
    pub fn congestion_factor(&self, counts: &VehicleCounts) -> f64 {
        let total = counts.total();
        if total == 0 {
            return 1.0;
        }
        1.0 + self.settings.congestion_coefficient * ((total + 1) as f64).log10()
    }

    /// Weighted load of one section.
    pub fn weighted_load(
        &self,
        counts: &VehicleCounts,
        weather: &WeatherCondition,
        at: NaiveDateTime,
    ) -> f64 {
        counts.weighted_sum() * self.time_factor(at) * self.congestion_factor(counts) * weather.factor()
    }

    /// Weighted load for every section.
    pub fn compute_loads(
        &self,
        counts_by_section: &BTreeMap<SectionId, VehicleCounts>,
        weather: &WeatherCondition,
        at: NaiveDateTime,
    ) -> SectionLoads {
        if !weather.is_recognized() {
            warn!(weather = %weather, "unrecognized weather condition, using neutral multiplier");
        }

        counts_by_section
            .iter()
            .map(|(section, counts)| {
                let load = self.weighted_load(counts, weather, at);
                debug!(
                    section = %section,
                    base = counts.weighted_sum(),
                    vehicles = counts.total(),
                    load,
                    "computed section load"
                );
                (section.clone(), load)
            })
            .collect()
    }

    /// Validate raw counts and compute loads.
    ///
    /// Fails with `InvalidInput` on a blank section name, an unknown class, a
    /// negative count, or a missing class.
    pub fn compute_loads_raw(
        &self,
        raw: &RawSectionCounts,
        weather: &WeatherCondition,
        at: NaiveDateTime,
    ) -> SchedulerResult<SectionLoads> {
        let counts = parse_section_counts(raw)?;
        Ok(self.compute_loads(&counts, weather, at))
    }
}

/// Validate name-keyed counts for every section.
pub fn parse_section_counts(
    raw: &RawSectionCounts,
) -> SchedulerResult<BTreeMap<SectionId, VehicleCounts>> {
    raw.iter()
        .map(|(name, counts)| {
            let section = SectionId::new(name.as_str())?;
            let counts = VehicleCounts::from_raw(counts).map_err(|e| match e {
                SchedulerError::InvalidInput { message, context } => {
                    SchedulerError::invalid_input_with_context(
                        message,
                        ErrorContext {
                            section: Some(section.to_string()),
                            ..context
                        },
                    )
                }
                other => other,
            })?;
            Ok((section, counts))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::VehicleClass;
    use chrono::NaiveDate;
    use proptest::prelude::*;

    fn at_hour(hour: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 3, 14)
            .unwrap()
            .and_hms_opt(hour, 30, 0)
            .unwrap()
    }

    fn section(name: &str) -> SectionId {
        SectionId::new(name).unwrap()
    }

    #[test]
    fn test_rush_windows_are_half_open() {
        let agg = LoadAggregator::default();
        assert_eq!(agg.time_factor(at_hour(5)), 1.0);
        assert_eq!(agg.time_factor(at_hour(6)), 1.5);
        assert_eq!(agg.time_factor(at_hour(8)), 1.5);
        assert_eq!(agg.time_factor(at_hour(9)), 1.0);
        assert_eq!(agg.time_factor(at_hour(16)), 1.5);
        assert_eq!(agg.time_factor(at_hour(18)), 1.5);
        assert_eq!(agg.time_factor(at_hour(19)), 1.0);
    }

    #[test]
    fn test_zero_counts_give_zero_load() {
        let agg = LoadAggregator::default();
        let counts = VehicleCounts::zero();
        assert_eq!(agg.congestion_factor(&counts), 1.0);
        assert_eq!(
            agg.weighted_load(&counts, &WeatherCondition::Snow, at_hour(7)),
            0.0
        );
    }

    #[test]
    fn test_reference_example() {
        let agg = LoadAggregator::default();
        let counts = VehicleCounts::zero()
            .with(VehicleClass::Car, 16)
            .with(VehicleClass::Van, 3);
        let mut input = BTreeMap::new();
        input.insert(section("s1"), counts);

        let loads = agg.compute_loads(&input, &WeatherCondition::Rain, at_hour(11));
        let expected = 470.0 * (1.0 + 0.2 * 20f64.log10()) * 1.2;
        assert!((loads[&section("s1")] - expected).abs() < 1e-9);
        assert!((loads[&section("s1")] - 710.76).abs() < 0.01);
    }

    #[test]
    fn test_congestion_stays_sub_linear() {
        let agg = LoadAggregator::default();
        let heavy = VehicleCounts::zero().with(VehicleClass::Car, 1000);
        let factor = agg.congestion_factor(&heavy);
        assert!(factor > 1.5 && factor < 1.61);
    }

    #[test]
    fn test_unknown_weather_is_neutral() {
        let agg = LoadAggregator::default();
        let counts = VehicleCounts::zero().with(VehicleClass::Bus, 1);
        let neutral = agg.weighted_load(&counts, &WeatherCondition::Normal, at_hour(12));
        let unknown = agg.weighted_load(&counts, &WeatherCondition::parse("volcanic ash"), at_hour(12));
        assert_eq!(neutral, unknown);
    }

    #[test]
    fn test_raw_counts_missing_class_names_section() {
        let agg = LoadAggregator::default();
        let mut counts: BTreeMap<String, i64> = VehicleClass::ALL
            .iter()
            .map(|c| (c.name().to_string(), 1))
            .collect();
        counts.remove("motor");
        let mut raw = RawSectionCounts::new();
        raw.insert("north".to_string(), counts);

        let err = agg
            .compute_loads_raw(&raw, &WeatherCondition::Normal, at_hour(12))
            .unwrap_err();
        assert!(err.is_invalid_input());
        assert_eq!(err.context().section.as_deref(), Some("north"));
        assert!(err.to_string().contains("motor"));
    }

    #[test]
    fn test_raw_counts_valid() {
        let agg = LoadAggregator::default();
        let counts: BTreeMap<String, i64> = VehicleClass::ALL
            .iter()
            .map(|c| (c.name().to_string(), 0))
            .collect();
        let mut raw = RawSectionCounts::new();
        raw.insert("s1".to_string(), counts.clone());
        raw.insert("s2".to_string(), counts);

        let loads = agg
            .compute_loads_raw(&raw, &WeatherCondition::Normal, at_hour(12))
            .unwrap();
        assert_eq!(loads.len(), 2);
        assert!(loads.values().all(|&l| l == 0.0));
    }

    fn counts_strategy() -> impl Strategy<Value = [u32; 10]> {
        prop::array::uniform10(0u32..500)
    }

    fn build(counts: [u32; 10]) -> VehicleCounts {
        VehicleClass::ALL
            .iter()
            .zip(counts)
            .fold(VehicleCounts::zero(), |acc, (&class, n)| acc.with(class, n))
    }

    proptest! {
        #[test]
        fn prop_load_is_monotonic_in_each_class(
            counts in counts_strategy(),
            class_idx in 0usize..10,
            extra in 1u32..100,
            hour in 0u32..24,
        ) {
            let agg = LoadAggregator::default();
            let base = build(counts);
            let class = VehicleClass::ALL[class_idx];
            let bumped = base.with(class, base.get(class) + extra);
            let weather = WeatherCondition::Fog;
            let before = agg.weighted_load(&base, &weather, at_hour(hour));
            let after = agg.weighted_load(&bumped, &weather, at_hour(hour));
            prop_assert!(after >= before);
        }

        #[test]
        fn prop_load_is_non_negative(counts in counts_strategy(), hour in 0u32..24) {
            let agg = LoadAggregator::default();
            let load = agg.weighted_load(&build(counts), &WeatherCondition::Snow, at_hour(hour));
            prop_assert!(load >= 0.0);
        }
    }
}
