//! Counting detector boxes against annotated image regions.
//!
//! Each region maps to section `s{id}`. Counting yields all ten classes for
//! every region, so the result always satisfies the `VehicleCounts` contract.

use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::Path;
use tracing::{debug, trace};

use crate::error::{ErrorContext, SchedulerError, SchedulerResult};
use crate::models::{Detection, OverlapRule, Region, SectionId, VehicleClass, VehicleCounts};

/// Bucket detections into per-section vehicle counts.
///
/// Detections with an out-of-range class index are skipped. A detection may
/// count toward several regions when they overlap.
pub fn count_detections(
    regions: &[Region],
    detections: &[Detection],
    rule: OverlapRule,
) -> BTreeMap<SectionId, VehicleCounts> {
    let mut counts: BTreeMap<SectionId, VehicleCounts> = regions
        .iter()
        .map(|r| (r.section(), VehicleCounts::zero()))
        .collect();

    for detection in detections {
        let Some(class) = VehicleClass::from_index(detection.class_index) else {
            trace!(class_index = detection.class_index, "skipping detection with unknown class");
            continue;
        };
        for region in regions {
            let bounds = region.bounds();
            let matched = match rule {
                OverlapRule::Contained => bounds.contains(&detection.bbox),
                OverlapRule::Intersects => bounds.intersects(&detection.bbox),
            };
            if matched {
                if let Some(section_counts) = counts.get_mut(&region.section()) {
                    section_counts.increment(class);
                }
            }
        }
    }

    debug!(
        regions = regions.len(),
        detections = detections.len(),
        ?rule,
        "counted detections"
    );
    counts
}

#[derive(Debug, Deserialize)]
struct RegionRecord {
    image_name: String,
    roi_id: u32,
    roi_x: i64,
    roi_y: i64,
    roi_width: i64,
    roi_height: i64,
}

/// Parse region annotations and keep those for `image_name`.
pub fn parse_regions(content: &str, image_name: &str) -> SchedulerResult<Vec<Region>> {
    let records: Vec<RegionRecord> = serde_json::from_str(content).map_err(|e| {
        SchedulerError::invalid_input_with_context(
            format!("malformed region annotations: {}", e),
            ErrorContext::new("load_regions").with_details(image_name),
        )
    })?;

    records
        .into_iter()
        .filter(|r| r.image_name == image_name)
        .map(|r| {
            Region::new(r.roi_id, r.roi_x, r.roi_y, r.roi_width, r.roi_height)
                .map_err(|e| e.with_operation("load_regions"))
        })
        .collect()
}

/// Read a JSON annotation file and return the regions for one image.
pub fn load_regions(path: impl AsRef<Path>, image_name: &str) -> SchedulerResult<Vec<Region>> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path).map_err(|e| {
        SchedulerError::persistence_with_context(
            format!("failed to read region annotations: {}", e),
            ErrorContext::new("load_regions").with_details(path.display().to_string()),
        )
    })?;
    let regions = parse_regions(&content, image_name)?;
    debug!(path = %path.display(), image_name, regions = regions.len(), "loaded regions");
    Ok(regions)
}
