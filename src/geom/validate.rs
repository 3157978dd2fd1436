use std::f64::consts::TAU;

use geo::{Coord, LineString, Polygon};

use crate::error::{GeoError, Result};
use crate::geom::Geometry;
use crate::geom::algorithm::segment::{self, SegmentIntersection};

impl Geometry {
    /// Check the structural invariants every operation relies on:
    /// finite coordinates, line strings with at least two coordinates, closed
    /// rings of at least four coordinates, and simple (non-self-intersecting)
    /// rings. Empty multi-geometries and collections are valid.
    ///
    /// Holes are checked for simplicity only; their placement inside the
    /// exterior is not verified.
    pub fn validate(&self) -> Result<()> { self.check(false) }

    /// [`Geometry::validate`], except that rings whose vertices all lie on one
    /// line are accepted. Such rings enclose nothing; measures treat them as
    /// zero-area, while predicates and overlay still reject them.
    pub(crate) fn validate_measurable(&self) -> Result<()> { self.check(true) }

    fn check(&self, collinear_ok: bool) -> Result<()> {
        let mut bad = None;
        self.for_each_coord(&mut |c| {
            if bad.is_none() && !(c.x.is_finite() && c.y.is_finite()) { bad = Some(c) }
        });
        if let Some(c) = bad {
            return Err(GeoError::invalid(format!("non-finite coordinate ({}, {})", c.x, c.y)));
        }

        let polygon = |p: &Polygon<f64>| validate_polygon(p, collinear_ok);
        match self {
            Geometry::Point(_) | Geometry::MultiPoint(_) => Ok(()),
            Geometry::LineString(ls) => validate_line(ls),
            Geometry::MultiLineString(mls) => mls.0.iter().try_for_each(validate_line),
            Geometry::Polygon(p) => polygon(p),
            Geometry::MultiPolygon(mp) => mp.0.iter().try_for_each(polygon),
            Geometry::Collection(members) => members.iter().try_for_each(|m| m.check(collinear_ok)),
        }
    }

    /// Shorthand for `validate().is_ok()`.
    pub fn is_valid(&self) -> bool { self.validate().is_ok() }
}

fn validate_line(ls: &LineString<f64>) -> Result<()> {
    if ls.0.len() < 2 {
        return Err(GeoError::invalid(format!("line string with {} coordinate(s)", ls.0.len())));
    }
    Ok(())
}

fn validate_polygon(polygon: &Polygon<f64>, collinear_ok: bool) -> Result<()> {
    validate_ring(polygon.exterior(), "exterior", collinear_ok)?;
    polygon.interiors().iter().try_for_each(|hole| validate_ring(hole, "interior", collinear_ok))
}

fn validate_ring(ring: &LineString<f64>, which: &str, collinear_ok: bool) -> Result<()> {
    if ring.0.is_empty() {
        return Err(GeoError::invalid(format!("empty {which} ring")));
    }
    if ring.0.first() != ring.0.last() {
        return Err(GeoError::invalid(format!("{which} ring is not closed")));
    }

    // Repeated consecutive vertices carry no shape; drop them before counting.
    let mut coords: Vec<Coord<f64>> = Vec::with_capacity(ring.0.len());
    for &c in &ring.0 {
        if coords.last() != Some(&c) { coords.push(c) }
    }
    if coords.len() < 4 {
        return Err(GeoError::invalid(format!(
            "{which} ring has {} distinct coordinate(s), needs at least 3", coords.len().saturating_sub(1)
        )));
    }

    if collinear_ok && coords.iter().all(|&c| segment::orient(coords[0], coords[1], c) == 0.0) {
        return Ok(());
    }
    if let Some((i, j)) = find_self_intersection(&coords) {
        return Err(GeoError::invalid(format!(
            "{which} ring self-intersects between edges {i} and {j}"
        )));
    }
    if let Some(c) = find_crossing_vertex(&coords) {
        return Err(GeoError::invalid(format!("{which} ring crosses itself at ({}, {})", c.x, c.y)));
    }
    Ok(())
}

/// Sweep-and-prune over ring edges sorted by their minimum x. Returns the first
/// pair of edges that meet anywhere other than a shared vertex.
///
/// Non-neighbouring edges may share a vertex (a pinch, as produced by
/// polygon overlay); whether the ring passes straight through such a vertex
/// is left to [`find_crossing_vertex`].
fn find_self_intersection(coords: &[Coord<f64>]) -> Option<(usize, usize)> {
    let n = coords.len() - 1; // number of edges in the closed ring
    let edge = |i: usize| (coords[i], coords[i + 1]);
    let adjacent = |i: usize, j: usize| {
        let (lo, hi) = (i.min(j), i.max(j));
        hi == lo + 1 || (lo == 0 && hi == n - 1)
    };
    let is_endpoint = |p: Coord<f64>, i: usize| p == coords[i] || p == coords[i + 1];

    let mut order: Vec<usize> = (0..n).collect();
    order.sort_by(|&a, &b| {
        let (a0, a1) = edge(a);
        let (b0, b1) = edge(b);
        a0.x.min(a1.x).total_cmp(&b0.x.min(b1.x))
    });

    for (k, &i) in order.iter().enumerate() {
        let (p1, p2) = edge(i);
        let max_x = p1.x.max(p2.x);
        let (min_y, max_y) = (p1.y.min(p2.y), p1.y.max(p2.y));

        for &j in &order[k + 1..] {
            let (q1, q2) = edge(j);
            if q1.x.min(q2.x) > max_x { break }
            if q1.y.max(q2.y) < min_y || q1.y.min(q2.y) > max_y { continue }

            match segment::intersect(p1, p2, q1, q2) {
                SegmentIntersection::None => {}
                // Neighbouring edges always share one vertex; anything more is a fold.
                SegmentIntersection::Point(_) if adjacent(i, j) => {}
                SegmentIntersection::Point(p) if is_endpoint(p, i) && is_endpoint(p, j) => {}
                _ => return Some((i.min(j), i.max(j))),
            }
        }
    }
    None
}

/// First vertex the ring visits more than once in a way that crosses over
/// itself. Visits that only touch (the ring comes in and leaves on the same
/// side of the other visit) are allowed.
fn find_crossing_vertex(coords: &[Coord<f64>]) -> Option<Coord<f64>> {
    let n = coords.len() - 1;
    let mut order: Vec<usize> = (0..n).collect();
    order.sort_by(|&a, &b| coords[a].x.total_cmp(&coords[b].x).then(coords[a].y.total_cmp(&coords[b].y)));

    // Directions (as angles) of the previous and next vertex seen from vertex `k`.
    let spokes = |k: usize| {
        let v = coords[k];
        let angle = |p: Coord<f64>| (p.y - v.y).atan2(p.x - v.x);
        (angle(coords[(k + n - 1) % n]), angle(coords[k + 1]))
    };
    let in_arc = |from: f64, to: f64, t: f64| {
        let offset = (t - from).rem_euclid(TAU);
        offset > 0.0 && offset < (to - from).rem_euclid(TAU)
    };

    for group in order.chunk_by(|&a, &b| coords[a] == coords[b]) {
        for (k, &a) in group.iter().enumerate() {
            let (a_in, a_out) = spokes(a);
            for &b in &group[k + 1..] {
                let (b_in, b_out) = spokes(b);
                if in_arc(a_in, a_out, b_in) != in_arc(a_in, a_out, b_out) {
                    return Some(coords[a]);
                }
            }
        }
    }
    None
}
