//! Spatial join: attach zone attributes to the regions they intersect.

use crate::geometry::{geometries_intersect, geometry_bbox};
use crate::geometry::crs::require_same_crs;
use crate::models::{DataError, FeatureTable, Value};
use tracing::debug;

/// Result of a [`spatial_join`], with the multi-match count surfaced so
/// callers can warn about possible double counting downstream.
#[derive(Debug)]
pub struct SpatialJoinResult {
    /// Joined table: one row per (region, intersecting zone) pair.
    pub table: FeatureTable,
    /// Regions that intersected more than one zone.
    pub multi_zone_regions: usize,
    /// Regions that intersected no zone at all (dropped).
    pub unmatched_regions: usize,
}

/// Join every `regions` feature to each `zones` feature it intersects.
///
/// Contract: a region intersecting K zones contributes K output rows, each
/// carrying that zone's attributes (suffix-renamed on collision). This is
/// the behavior downstream aggregation must account for — a region
/// straddling two zones is counted in both. Both tables must be in the same
/// CRS; regions without geometry are dropped.
pub fn spatial_join(
    regions: &FeatureTable,
    zones: &FeatureTable,
) -> Result<SpatialJoinResult, DataError> {
    require_same_crs(regions, zones)?;
    if zones.geometry_count() == 0 {
        return Err(DataError::NoGeometry {
            table: "zones table".to_string(),
        });
    }

    // Precompute zone bounds for the cheap reject before the full predicate.
    let zone_bounds: Vec<_> = zones
        .features
        .iter()
        .map(|z| z.geometry.as_ref().map(geometry_bbox))
        .collect();

    let renamed: Vec<(String, String)> = zones
        .columns
        .iter()
        .map(|c| {
            let target = if regions.has_column(c) {
                format!("{c}_zone")
            } else {
                c.clone()
            };
            (c.clone(), target)
        })
        .collect();

    let mut out = FeatureTable::new(regions.crs);
    out.columns = regions.columns.clone();
    for (_, target) in &renamed {
        out.register_column(target);
    }

    let mut multi_zone_regions = 0usize;
    let mut unmatched_regions = 0usize;

    for region in &regions.features {
        let Some(ref region_geometry) = region.geometry else {
            unmatched_regions += 1;
            continue;
        };
        let region_bbox = geometry_bbox(region_geometry);

        let mut hits = 0usize;
        for (zone, bounds) in zones.features.iter().zip(zone_bounds.iter()) {
            let Some(ref zone_geometry) = zone.geometry else {
                continue;
            };
            let Some(bounds) = bounds else { continue };
            if !region_bbox.overlaps(bounds) {
                continue;
            }
            if !geometries_intersect(region_geometry, zone_geometry) {
                continue;
            }

            hits += 1;
            let mut joined = region.clone();
            for (source, target) in &renamed {
                let value = zone.attributes.get(source).cloned().unwrap_or(Value::Null);
                joined.attributes.insert(target.clone(), value);
            }
            out.features.push(joined);
        }

        match hits {
            0 => unmatched_regions += 1,
            1 => {}
            _ => multi_zone_regions += 1,
        }
    }

    debug!(
        "spatial join: {} rows out, {} multi-zone regions, {} unmatched",
        out.len(),
        multi_zone_regions,
        unmatched_regions
    );

    Ok(SpatialJoinResult {
        table: out,
        multi_zone_regions,
        unmatched_regions,
    })
}
