use geo::{Coord, LineString, MultiPolygon, Polygon};

use super::segment::on_segment;

/// Where a coordinate sits relative to an areal geometry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Location {
    Interior,
    Boundary,
    Exterior,
}

/// Ray casting against one closed ring. Points on an edge are `Boundary`.
pub(crate) fn locate_in_ring(coord: Coord<f64>, ring: &LineString<f64>) -> Location {
    let mut inside = false;
    for line in ring.lines() {
        let (a, b) = (line.start, line.end);
        if on_segment(coord, a, b) { return Location::Boundary }

        // Half-open rule on y so a ray through a vertex is counted once.
        if (a.y > coord.y) != (b.y > coord.y) {
            let x = a.x + (coord.y - a.y) * (b.x - a.x) / (b.y - a.y);
            if coord.x < x { inside = !inside }
        }
    }
    if inside { Location::Interior } else { Location::Exterior }
}

/// Locate against a polygon with holes.
pub(crate) fn locate_in_polygon(coord: Coord<f64>, polygon: &Polygon<f64>) -> Location {
    match locate_in_ring(coord, polygon.exterior()) {
        Location::Interior => {}
        other => return other,
    }
    for hole in polygon.interiors() {
        match locate_in_ring(coord, hole) {
            Location::Interior => return Location::Exterior,
            Location::Boundary => return Location::Boundary,
            Location::Exterior => {}
        }
    }
    Location::Interior
}

/// Locate against the members of a multipolygon; interior wins over boundary.
pub(crate) fn locate_in_polygons(coord: Coord<f64>, polygons: &MultiPolygon<f64>) -> Location {
    let mut location = Location::Exterior;
    for polygon in &polygons.0 {
        match locate_in_polygon(coord, polygon) {
            Location::Interior => return Location::Interior,
            Location::Boundary => location = Location::Boundary,
            Location::Exterior => {}
        }
    }
    location
}

#[cfg(test)]
mod tests {
    use super::*;

    fn donut() -> Polygon<f64> {
        Polygon::new(
            LineString::from(vec![(0.0, 0.0), (10.0, 0.0), (10.0, 10.0), (0.0, 10.0), (0.0, 0.0)]),
            vec![LineString::from(vec![(4.0, 4.0), (6.0, 4.0), (6.0, 6.0), (4.0, 6.0), (4.0, 4.0)])],
        )
    }

    #[test]
    fn interior_exterior_boundary() {
        let p = donut();
        assert_eq!(locate_in_polygon(Coord { x: 1.0, y: 1.0 }, &p), Location::Interior);
        assert_eq!(locate_in_polygon(Coord { x: 5.0, y: 5.0 }, &p), Location::Exterior);
        assert_eq!(locate_in_polygon(Coord { x: 11.0, y: 5.0 }, &p), Location::Exterior);
        assert_eq!(locate_in_polygon(Coord { x: 10.0, y: 5.0 }, &p), Location::Boundary);
        assert_eq!(locate_in_polygon(Coord { x: 4.0, y: 5.0 }, &p), Location::Boundary);
    }

    #[test]
    fn ray_through_vertex_counts_once() {
        let diamond = LineString::from(vec![(0.0, 1.0), (1.0, 0.0), (2.0, 1.0), (1.0, 2.0), (0.0, 1.0)]);
        assert_eq!(locate_in_ring(Coord { x: 0.5, y: 1.0 }, &diamond), Location::Interior);
        assert_eq!(locate_in_ring(Coord { x: -0.5, y: 1.0 }, &diamond), Location::Exterior);
    }

    #[test]
    fn multipolygon_prefers_interior() {
        let mp = MultiPolygon(vec![
            Polygon::new(LineString::from(vec![(0.0, 0.0), (1.0, 0.0), (1.0, 1.0), (0.0, 1.0), (0.0, 0.0)]), vec![]),
            Polygon::new(LineString::from(vec![(1.0, 0.0), (3.0, 0.0), (3.0, 1.0), (1.0, 1.0), (1.0, 0.0)]), vec![]),
        ]);
        assert_eq!(locate_in_polygons(Coord { x: 2.0, y: 0.5 }, &mp), Location::Interior);
        assert_eq!(locate_in_polygons(Coord { x: 0.0, y: 0.5 }, &mp), Location::Boundary);
        assert_eq!(locate_in_polygons(Coord { x: 5.0, y: 0.5 }, &mp), Location::Exterior);
    }
}
