use geo::relate::IntersectionMatrix;
use geo::{BooleanOps, MultiPolygon, Relate};

use crate::config::EngineConfig;
use crate::geom::{polygon_area, BoundingBox, Geometry, Location};
use crate::geom::algorithm::pip::{locate_in_polygon, locate_in_polygons};

// Everything in this module assumes validated operands.

/// Full DE-9IM matrix of `a` against `b`.
#[inline]
fn matrix(a: &Geometry, b: &Geometry) -> IntersectionMatrix {
    a.to_geo().relate(&b.to_geo())
}

/// Match against a constant DE-9IM pattern.
#[inline]
fn pattern(im: &IntersectionMatrix, mask: &str) -> bool {
    im.matches(mask).unwrap_or(false)
}

fn boxes(a: &Geometry, b: &Geometry) -> Option<(BoundingBox, BoundingBox)> {
    Some((a.bounding_box()?, b.bounding_box()?))
}

/// Location of a single point relative to an areal geometry, when that is
/// the shape of the pair.
fn point_location(a: &Geometry, b: &Geometry) -> Option<Location> {
    let Geometry::Point(p) = a else { return None };
    match b {
        Geometry::Polygon(polygon) => Some(locate_in_polygon(p.0, polygon)),
        Geometry::MultiPolygon(polygons) => Some(locate_in_polygons(p.0, polygons)),
        _ => None,
    }
}

pub(crate) fn intersects(a: &Geometry, b: &Geometry) -> bool {
    let Some((ba, bb)) = boxes(a, b) else { return false };
    if !ba.intersects(&bb) { return false }
    if let Some(loc) = point_location(a, b).or_else(|| point_location(b, a)) {
        return loc != Location::Exterior;
    }
    matrix(a, b).is_intersects()
}

pub(crate) fn touches(a: &Geometry, b: &Geometry) -> bool {
    let Some((ba, bb)) = boxes(a, b) else { return false };
    if !ba.intersects(&bb) { return false }
    if let Some(loc) = point_location(a, b).or_else(|| point_location(b, a)) {
        return loc == Location::Boundary;
    }
    matrix(a, b).is_touches()
}

/// Interior of `a` meets interior of `b` and no part of `a` is outside `b`.
/// A point on a polygon's boundary is not within it.
pub(crate) fn within(a: &Geometry, b: &Geometry) -> bool {
    let Some((ba, bb)) = boxes(a, b) else { return false };
    if !bb.contains(&ba) { return false }
    if let Some(loc) = point_location(a, b) {
        return loc == Location::Interior;
    }
    pattern(&matrix(a, b), "T*F**F***")
}

/// No part of `a` is outside `b`; boundary contact allowed.
pub(crate) fn covered_by(a: &Geometry, b: &Geometry) -> bool {
    let Some((ba, bb)) = boxes(a, b) else { return false };
    if !bb.contains(&ba) { return false }
    if let Some(loc) = point_location(a, b) {
        return loc != Location::Exterior;
    }
    let im = matrix(a, b);
    ["T*F**F***", "*TF**F***", "**FT*F***", "**F*TF***"].iter().any(|mask| pattern(&im, mask))
}

/// Interiors intersect, the result has the operands' dimension, and
/// neither covers the other.
pub(crate) fn overlaps(a: &Geometry, b: &Geometry) -> bool {
    let (Some(da), Some(db)) = (a.dimension(), b.dimension()) else { return false };
    if da != db { return false }
    let Some((ba, bb)) = boxes(a, b) else { return false };
    if !ba.intersects(&bb) { return false }

    let im = matrix(a, b);
    if da == 1 { pattern(&im, "1*T***T**") } else { pattern(&im, "T*T***T**") }
}

/// Interiors intersect in something of lower dimension than the larger
/// operand, and neither contains the other.
pub(crate) fn crosses(a: &Geometry, b: &Geometry) -> bool {
    let (Some(da), Some(db)) = (a.dimension(), b.dimension()) else { return false };
    if da == db && da != 1 { return false }
    let Some((ba, bb)) = boxes(a, b) else { return false };
    if !ba.intersects(&bb) { return false }

    let im = matrix(a, b);
    match da.cmp(&db) {
        std::cmp::Ordering::Less => pattern(&im, "T*T******"),
        std::cmp::Ordering::Greater => pattern(&im, "T*****T**"),
        std::cmp::Ordering::Equal => pattern(&im, "0********"),
    }
}

/// Point-set equality, independent of vertex order, ring start and winding.
///
/// Polygonal pairs compare the area of their symmetric difference against
/// the relative tolerance; everything else uses the DE-9IM equality pattern.
pub(crate) fn equals(a: &Geometry, b: &Geometry) -> bool {
    let Some((ba, bb)) = boxes(a, b) else { return a.is_empty() && b.is_empty() };

    if a.is_polygonal() && b.is_polygonal() {
        let extent = ba.union(&bb);
        let config = EngineConfig::default();
        if !close_boxes(&ba, &bb, config.length_tolerance(&extent)) { return false }

        let left = MultiPolygon(a.polygon_parts());
        let right = MultiPolygon(b.polygon_parts());
        let residue: f64 = left.xor(&right).0.iter().map(polygon_area).sum();
        return residue <= config.area_tolerance(&extent);
    }

    if a.dimension() != b.dimension() || ba != bb { return false }
    pattern(&matrix(a, b), "T*F**FFF*")
}

fn close_boxes(a: &BoundingBox, b: &BoundingBox, tolerance: f64) -> bool {
    (a.min_x - b.min_x).abs() <= tolerance
        && (a.min_y - b.min_y).abs() <= tolerance
        && (a.max_x - b.max_x).abs() <= tolerance
        && (a.max_y - b.max_y).abs() <= tolerance
}
