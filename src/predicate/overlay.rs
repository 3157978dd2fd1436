use geo::{BooleanOps, Coord, LineString, MultiLineString, MultiPolygon, Point};
use rayon::prelude::*;

use crate::config::EngineConfig;
use crate::geom::algorithm::pip::locate_in_polygons;
use crate::geom::algorithm::segment::{intersect, lerp, on_segment, param, SegmentIntersection};
use crate::geom::{line_length, polygon_area, Geometry, Location};

/// A geometry split by dimension. Set operations work part by part and
/// reassemble the pieces with [`normalize`].
struct Parts {
    points: Vec<Point<f64>>,
    lines: Vec<LineString<f64>>,
    areas: MultiPolygon<f64>,
}

impl Parts {
    fn of(geometry: &Geometry) -> Self {
        Self {
            points: geometry.point_parts(),
            lines: geometry.line_parts(),
            areas: MultiPolygon(geometry.polygon_parts()),
        }
    }

    /// True when `coord` belongs to the closed point set.
    fn covers(&self, coord: Coord<f64>) -> bool {
        self.points.iter().any(|p| p.0 == coord)
            || self.lines.iter().any(|ls| ls.lines().any(|l| on_segment(coord, l.start, l.end)))
            || (!self.areas.0.is_empty() && locate_in_polygons(coord, &self.areas) != Location::Exterior)
    }
}

// ---------------------------------------------------------------------------
// Operators (unchecked)
// ---------------------------------------------------------------------------

pub(crate) fn intersection(a: &Geometry, b: &Geometry) -> Geometry {
    let (pa, pb) = (Parts::of(a), Parts::of(b));

    let areas = if pa.areas.0.is_empty() || pb.areas.0.is_empty() {
        MultiPolygon(Vec::new())
    } else {
        pa.areas.intersection(&pb.areas)
    };

    let mut lines = clip_inside(&pa.lines, &pb.areas);
    lines.extend(clip_inside(&pb.lines, &pa.areas));
    let (shared, mut points) = line_intersection(&pa.lines, &pb.lines);
    lines.extend(shared);

    points.extend(pa.points.iter().filter(|p| pb.covers(p.0)));
    points.extend(pb.points.iter().filter(|p| pa.covers(p.0)));

    normalize(points, lines, areas)
}

pub(crate) fn difference(a: &Geometry, b: &Geometry) -> Geometry {
    let (pa, pb) = (Parts::of(a), Parts::of(b));

    // Removing something of lower dimension leaves an area unchanged.
    let areas = if pa.areas.0.is_empty() || pb.areas.0.is_empty() {
        pa.areas.clone()
    } else {
        pa.areas.difference(&pb.areas)
    };
    let lines = subtract_lines(&clip_outside(&pa.lines, &pb.areas), &pb.lines);
    let points = pa.points.iter().filter(|p| !pb.covers(p.0)).copied().collect();

    normalize(points, lines, areas)
}

pub(crate) fn union(a: &Geometry, b: &Geometry) -> Geometry {
    let (pa, pb) = (Parts::of(a), Parts::of(b));

    let areas = match (pa.areas.0.is_empty(), pb.areas.0.is_empty()) {
        (true, _) => pb.areas.clone(),
        (_, true) => pa.areas.clone(),
        _ => pa.areas.union(&pb.areas),
    };
    let mut lines = pa.lines.clone();
    lines.extend(subtract_lines(&pb.lines, &pa.lines));
    let mut points = pa.points;
    points.extend(pb.points);

    normalize(points, lines, areas)
}

pub(crate) fn symmetric_difference(a: &Geometry, b: &Geometry) -> Geometry {
    union(&difference(a, b), &difference(b, a))
}

/// Union of many geometries by pairwise reduction: neighbours are merged
/// layer by layer so each union works on operands of similar size.
pub(crate) fn unary_union(geometries: &[Geometry]) -> Option<Geometry> {
    let config = EngineConfig::default();
    let merge = |pair: &[Geometry]| match pair {
        [a, b] => union(a, b),
        [a] => a.clone(),
        _ => Geometry::empty(),
    };

    let mut layer = match geometries {
        [] => return None,
        [single] => return Some(single.clone()),
        _ => geometries.to_vec(),
    };
    while layer.len() > 1 {
        layer = if config.run_parallel(layer.len()) {
            layer.par_chunks(2).map(merge).collect()
        } else {
            layer.chunks(2).map(merge).collect()
        };
    }
    layer.pop()
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Drop empty pieces, lines covered by areas and points covered by lines or
/// areas, then assemble the simplest geometry.
fn normalize(points: Vec<Point<f64>>, lines: Vec<LineString<f64>>, areas: MultiPolygon<f64>) -> Geometry {
    let areas = MultiPolygon(areas.0.into_iter().filter(|p| polygon_area(p) > 0.0).collect());
    let lines: Vec<_> = clip_outside(&lines, &areas).into_iter()
        .filter(|ls| line_length(ls) > 0.0)
        .collect();

    let covered = Parts { points: Vec::new(), lines, areas };
    let mut kept: Vec<Point<f64>> = Vec::new();
    for p in points {
        if !covered.covers(p.0) && !kept.contains(&p) {
            kept.push(p);
        }
    }
    Geometry::from_parts(kept, covered.lines, covered.areas.0)
}

/// Pieces of `lines` inside `areas`.
fn clip_inside(lines: &[LineString<f64>], areas: &MultiPolygon<f64>) -> Vec<LineString<f64>> {
    if lines.is_empty() || areas.0.is_empty() { return Vec::new() }
    areas.clip(&MultiLineString(lines.to_vec()), false).0
}

/// Pieces of `lines` outside `areas`.
fn clip_outside(lines: &[LineString<f64>], areas: &MultiPolygon<f64>) -> Vec<LineString<f64>> {
    if lines.is_empty() || areas.0.is_empty() { return lines.to_vec() }
    areas.clip(&MultiLineString(lines.to_vec()), true).0
}

/// Shared stretches and crossing points of two sets of lines.
fn line_intersection(a: &[LineString<f64>], b: &[LineString<f64>]) -> (Vec<LineString<f64>>, Vec<Point<f64>>) {
    let mut shared = Chain::default();
    let mut points = Vec::new();

    for sa in a.iter().flat_map(LineString::lines) {
        for sb in b.iter().flat_map(LineString::lines) {
            match intersect(sa.start, sa.end, sb.start, sb.end) {
                SegmentIntersection::None => {}
                SegmentIntersection::Point(c) => points.push(Point(c)),
                SegmentIntersection::Overlap(s, e) => shared.push(s, e),
            }
        }
    }
    (shared.finish(), points)
}

/// Remove from `lines` every stretch that runs along `cut`.
fn subtract_lines(lines: &[LineString<f64>], cut: &[LineString<f64>]) -> Vec<LineString<f64>> {
    if cut.is_empty() { return lines.to_vec() }

    let mut pieces = Chain::default();
    for line in lines {
        for seg in line.lines() {
            let at = |t: f64| match t {
                t if t <= 0.0 => seg.start,
                t if t >= 1.0 => seg.end,
                t => lerp(seg.start, seg.end, t),
            };

            let mut covered: Vec<(f64, f64)> = cut.iter()
                .flat_map(LineString::lines)
                .filter_map(|c| match intersect(seg.start, seg.end, c.start, c.end) {
                    SegmentIntersection::Overlap(s, e) => {
                        Some((param(s, seg.start, seg.end), param(e, seg.start, seg.end)))
                    }
                    _ => None,
                })
                .collect();
            covered.sort_by(|x, y| x.0.total_cmp(&y.0));

            let mut t = 0.0;
            for (s, e) in covered {
                if s > t { pieces.push(at(t), at(s)) }
                t = f64::max(t, e);
            }
            if t < 1.0 { pieces.push(at(t), seg.end) }
        }
        pieces.break_here();
    }
    pieces.finish()
}

/// Joins consecutive segments that share an endpoint into line strings.
#[derive(Default)]
struct Chain {
    current: Vec<Coord<f64>>,
    done: Vec<LineString<f64>>,
}

impl Chain {
    fn push(&mut self, start: Coord<f64>, end: Coord<f64>) {
        if start == end { return }
        if self.current.last() == Some(&start) {
            self.current.push(end);
        } else {
            self.break_here();
            self.current = vec![start, end];
        }
    }

    fn break_here(&mut self) {
        let current = std::mem::take(&mut self.current);
        if current.len() >= 2 { self.done.push(LineString(current)) }
    }

    fn finish(mut self) -> Vec<LineString<f64>> {
        self.break_here();
        self.done
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn area(g: &Geometry) -> f64 { g.area().unwrap() }

    #[test]
    fn overlapping_squares() {
        let a = Geometry::rect(0.0, 0.0, 2.0, 2.0);
        let b = Geometry::rect(1.0, 1.0, 3.0, 3.0);

        assert!((area(&union(&a, &b)) - 7.0).abs() < 1e-9);
        assert!((area(&intersection(&a, &b)) - 1.0).abs() < 1e-9);
        assert!((area(&difference(&a, &b)) - 3.0).abs() < 1e-9);
        assert!((area(&symmetric_difference(&a, &b)) - 6.0).abs() < 1e-9);
    }

    #[test]
    fn disjoint_intersection_is_empty() {
        let a = Geometry::rect(0.0, 0.0, 1.0, 1.0);
        let b = Geometry::rect(5.0, 5.0, 6.0, 6.0);
        assert!(intersection(&a, &b).is_empty());
        assert!((area(&difference(&a, &b)) - 1.0).abs() < 1e-9);
    }

    #[test]
    fn line_against_polygon() {
        let sq = Geometry::rect(0.0, 0.0, 2.0, 2.0);
        let line = Geometry::line_string([(-1.0, 1.0), (3.0, 1.0)]);

        let inside = intersection(&line, &sq);
        assert_eq!(inside.dimension(), Some(1));
        assert!((inside.length().unwrap() - 2.0).abs() < 1e-9);

        let outside = difference(&line, &sq);
        assert!((outside.length().unwrap() - 2.0).abs() < 1e-9);

        // Polygon minus a line is the polygon.
        assert!((area(&difference(&sq, &line)) - 4.0).abs() < 1e-9);

        // Union keeps both dimensions.
        let Geometry::Collection(members) = union(&sq, &line) else { panic!("expected collection") };
        assert_eq!(members.len(), 2);
    }

    #[test]
    fn line_against_line() {
        let a = Geometry::line_string([(0.0, 0.0), (4.0, 0.0)]);
        let b = Geometry::line_string([(2.0, 0.0), (6.0, 0.0)]);
        let c = Geometry::line_string([(1.0, -1.0), (1.0, 1.0)]);

        let shared = intersection(&a, &b);
        assert!((shared.length().unwrap() - 2.0).abs() < 1e-12);

        let crossing = intersection(&a, &c);
        assert_eq!(crossing, Geometry::MultiPoint(vec![Point::new(1.0, 0.0)].into()));

        let rest = difference(&a, &b);
        assert!((rest.length().unwrap() - 2.0).abs() < 1e-12);

        let merged = union(&a, &b);
        assert!((merged.length().unwrap() - 6.0).abs() < 1e-12);
    }

    #[test]
    fn points_by_membership() {
        let sq = Geometry::rect(0.0, 0.0, 2.0, 2.0);
        let points = Geometry::MultiPoint(vec![Point::new(1.0, 1.0), Point::new(5.0, 5.0)].into());

        assert_eq!(intersection(&points, &sq), Geometry::MultiPoint(vec![Point::new(1.0, 1.0)].into()));
        assert_eq!(difference(&points, &sq), Geometry::MultiPoint(vec![Point::new(5.0, 5.0)].into()));

        // The covered point is absorbed by the polygon.
        let Geometry::Collection(members) = union(&sq, &points) else { panic!("expected collection") };
        assert_eq!(members[0], Geometry::MultiPoint(vec![Point::new(5.0, 5.0)].into()));
    }

    #[test]
    fn unary_union_reduces_pairwise() {
        let squares: Vec<Geometry> = (0..5).map(|i| Geometry::rect(i as f64, 0.0, i as f64 + 1.0, 1.0)).collect();
        let merged = unary_union(&squares).unwrap();
        assert!((area(&merged) - 5.0).abs() < 1e-9);
        assert!(unary_union(&[]).is_none());
    }
}
