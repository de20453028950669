//! Vehicle classes and per-section vehicle counts.
//!
//! The class set is closed: the detector emits exactly these ten classes and
//! every observation must report all of them. A missing class is a malformed
//! observation, never an implicit zero.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use crate::error::{ErrorContext, SchedulerError, SchedulerResult};

/// Road user classes reported by the detector, in detector class-index order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum VehicleClass {
    Pedestrian,
    People,
    Bicycle,
    Car,
    Van,
    Truck,
    Bus,
    Motor,
    Tricycle,
    AwningTricycle,
}

impl VehicleClass {
    /// All classes in detector class-index order.
    pub const ALL: [VehicleClass; 10] = [
        VehicleClass::Pedestrian,
        VehicleClass::People,
        VehicleClass::Bicycle,
        VehicleClass::Car,
        VehicleClass::Van,
        VehicleClass::Truck,
        VehicleClass::Bus,
        VehicleClass::Motor,
        VehicleClass::Tricycle,
        VehicleClass::AwningTricycle,
    ];

    /// Number of known classes.
    pub const COUNT: usize = 10;

    /// Canonical class name as emitted by the detector.
    pub fn name(self) -> &'static str {
        match self {
            VehicleClass::Pedestrian => "pedestrian",
            VehicleClass::People => "people",
            VehicleClass::Bicycle => "bicycle",
            VehicleClass::Car => "car",
            VehicleClass::Van => "van",
            VehicleClass::Truck => "truck",
            VehicleClass::Bus => "bus",
            VehicleClass::Motor => "motor",
            VehicleClass::Tricycle => "tricycle",
            VehicleClass::AwningTricycle => "awning-tricycle",
        }
    }

    /// Demand weight of one road user of this class.
    pub fn weight(self) -> u32 {
        match self {
            VehicleClass::Pedestrian => 1,
            VehicleClass::People => 2,
            VehicleClass::Bicycle => 5,
            VehicleClass::Car => 20,
            VehicleClass::Van => 50,
            VehicleClass::Truck => 100,
            VehicleClass::Bus => 100,
            VehicleClass::Motor => 10,
            VehicleClass::Tricycle => 7,
            VehicleClass::AwningTricycle => 8,
        }
    }

    /// Class for a detector class index, `None` when out of range.
    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }

    pub fn index(self) -> usize {
        self as usize
    }
}

impl fmt::Display for VehicleClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for VehicleClass {
    type Err = SchedulerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        VehicleClass::ALL
            .iter()
            .copied()
            .find(|class| class.name() == s)
            .ok_or_else(|| {
                SchedulerError::invalid_input_with_context(
                    format!("unknown vehicle class '{}'", s),
                    ErrorContext::new("parse_vehicle_class"),
                )
            })
    }
}

/// Counts of every vehicle class observed in one section at one instant.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(
    try_from = "BTreeMap<String, i64>",
    into = "BTreeMap<String, u32>"
)]
pub struct VehicleCounts {
    counts: [u32; VehicleClass::COUNT],
}

impl VehicleCounts {
    /// All classes at zero.
    pub fn zero() -> Self {
        Self::default()
    }

    /// Builder-style setter.
    pub fn with(mut self, class: VehicleClass, count: u32) -> Self {
        self.counts[class.index()] = count;
        self
    }

    pub fn get(&self, class: VehicleClass) -> u32 {
        self.counts[class.index()]
    }

    pub fn increment(&mut self, class: VehicleClass) {
        self.counts[class.index()] = self.counts[class.index()].saturating_add(1);
    }

    /// Total number of road users across all classes.
    pub fn total(&self) -> u64 {
        self.counts.iter().map(|&c| u64::from(c)).sum()
    }

    /// Σ count × class weight.
    pub fn weighted_sum(&self) -> f64 {
        self.iter()
            .map(|(class, count)| f64::from(count) * f64::from(class.weight()))
            .sum()
    }

    /// Iterate `(class, count)` pairs in class-index order.
    pub fn iter(&self) -> impl Iterator<Item = (VehicleClass, u32)> + '_ {
        VehicleClass::ALL
            .iter()
            .map(move |&class| (class, self.counts[class.index()]))
    }

    /// Validate a name-keyed observation.
    ///
    /// Fails with `InvalidInput` on an unknown class name, a negative count, or
    /// when any of the ten classes is absent.
    pub fn from_raw(raw: &BTreeMap<String, i64>) -> SchedulerResult<Self> {
        let mut counts = [None; VehicleClass::COUNT];

        for (name, &count) in raw {
            let class: VehicleClass = name.parse()?;
            if count < 0 {
                return Err(SchedulerError::invalid_input_with_context(
                    format!("negative count {} for class '{}'", count, name),
                    ErrorContext::new("parse_vehicle_counts"),
                ));
            }
            let count = u32::try_from(count).map_err(|_| {
                SchedulerError::invalid_input_with_context(
                    format!("count {} for class '{}' is out of range", count, name),
                    ErrorContext::new("parse_vehicle_counts"),
                )
            })?;
            counts[class.index()] = Some(count);
        }

        let missing: Vec<&str> = VehicleClass::ALL
            .iter()
            .filter(|class| counts[class.index()].is_none())
            .map(|class| class.name())
            .collect();
        if !missing.is_empty() {
            return Err(SchedulerError::invalid_input_with_context(
                format!("missing vehicle classes: {}", missing.join(", ")),
                ErrorContext::new("parse_vehicle_counts"),
            ));
        }

        let mut out = VehicleCounts::zero();
        for class in VehicleClass::ALL {
            out.counts[class.index()] = counts[class.index()].unwrap_or_default();
        }
        Ok(out)
    }
}

impl TryFrom<BTreeMap<String, i64>> for VehicleCounts {
    type Error = SchedulerError;

    fn try_from(raw: BTreeMap<String, i64>) -> Result<Self, Self::Error> {
        VehicleCounts::from_raw(&raw)
    }
}

impl From<VehicleCounts> for BTreeMap<String, u32> {
    fn from(counts: VehicleCounts) -> Self {
        counts
            .iter()
            .map(|(class, count)| (class.name().to_string(), count))
            .collect()
    }
}
