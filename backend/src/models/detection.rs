use serde::{Deserialize, Serialize};

use super::SectionId;
use crate::error::{ErrorContext, SchedulerError, SchedulerResult};

/// Axis-aligned box in image pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub xmin: f64,
    pub ymin: f64,
    pub xmax: f64,
    pub ymax: f64,
}

impl BoundingBox {
    pub fn new(xmin: f64, ymin: f64, xmax: f64, ymax: f64) -> Self {
        Self { xmin, ymin, xmax, ymax }
    }

    /// Inclusive containment of `other` within `self`.
    pub fn contains(&self, other: &BoundingBox) -> bool {
        other.xmin >= self.xmin
            && other.ymin >= self.ymin
            && other.xmax <= self.xmax
            && other.ymax <= self.ymax
    }

    /// Whether the boxes share any point; touching edges count.
    pub fn intersects(&self, other: &BoundingBox) -> bool {
        !(other.xmax < self.xmin
            || other.xmin > self.xmax
            || other.ymax < self.ymin
            || other.ymin > self.ymax)
    }
}

/// Annotated rectangular region of a camera image mapped to one section.
///
/// Extents are non-negative and the far corner fits in `i64`; deserialization
/// enforces this through [`Region::new`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RegionFields")]
pub struct Region {
    pub id: u32,
    pub x: i64,
    pub y: i64,
    pub width: i64,
    pub height: i64,
}

#[derive(Deserialize)]
struct RegionFields {
    id: u32,
    x: i64,
    y: i64,
    width: i64,
    height: i64,
}

impl TryFrom<RegionFields> for Region {
    type Error = SchedulerError;

    fn try_from(f: RegionFields) -> Result<Self, Self::Error> {
        Region::new(f.id, f.x, f.y, f.width, f.height)
    }
}

impl Region {
    pub fn new(id: u32, x: i64, y: i64, width: i64, height: i64) -> SchedulerResult<Self> {
        let region = Self { id, x, y, width, height };
        region.validate()?;
        Ok(region)
    }

    /// Reject negative extents and corners outside the `i64` range.
    pub fn validate(&self) -> SchedulerResult<()> {
        let invalid = |message: String| {
            SchedulerError::invalid_input_with_context(
                message,
                ErrorContext::new("validate_region").with_section(&self.section()),
            )
        };
        if self.width < 0 || self.height < 0 {
            return Err(invalid(format!(
                "region {} has negative extent {}x{}",
                self.id, self.width, self.height
            )));
        }
        if self.x.checked_add(self.width).is_none() || self.y.checked_add(self.height).is_none() {
            return Err(invalid(format!("region {} extends past the coordinate range", self.id)));
        }
        Ok(())
    }

    pub fn section(&self) -> SectionId {
        SectionId::for_region(self.id)
    }

    pub fn bounds(&self) -> BoundingBox {
        let (x, y) = (self.x as f64, self.y as f64);
        BoundingBox::new(x, y, x + self.width as f64, y + self.height as f64)
    }
}

/// One detector output: class index, box and confidence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Detection {
    pub class_index: usize,
    pub bbox: BoundingBox,
    #[serde(default)]
    pub confidence: f64,
}

/// How a detection is matched against a region.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OverlapRule {
    /// Box must lie fully inside the region
    Contained,
    /// Any overlap with the region counts
    #[default]
    Intersects,
}
