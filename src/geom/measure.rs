use geo::{Coord, Distance, Euclidean, LineString, Point, Polygon};

use crate::error::{GeoError, Result};
use crate::geom::Geometry;
use crate::geom::algorithm::segment::{distance, lerp};

impl Geometry {
    /// Planar area in squared CRS units. Holes are subtracted; points and
    /// lines have zero area, as do degenerate rings (all vertices on one line).
    pub fn area(&self) -> Result<f64> {
        self.validate_measurable()?;
        Ok(self.polygon_parts().iter().map(polygon_area).sum())
    }

    /// Length of line parts plus the boundary length (holes included) of polygon parts.
    pub fn length(&self) -> Result<f64> {
        self.validate_measurable()?;
        let lines: f64 = self.line_parts().iter().map(line_length).sum();
        let rings: f64 = self.polygon_parts().iter()
            .map(|p| line_length(p.exterior()) + p.interiors().iter().map(line_length).sum::<f64>())
            .sum();
        Ok(lines + rings)
    }

    /// Centroid of the highest-dimension parts: area-weighted for polygons,
    /// length-weighted for lines, the mean for points. The polygon centroid
    /// may fall outside non-convex shapes; use
    /// [`Geometry::representative_point`] for a point guaranteed inside.
    pub fn centroid(&self) -> Result<Point<f64>> {
        self.validate_measurable()?;
        let centroid = match self.dimension() {
            None => None,
            Some(2) => polygons_centroid(&self.polygon_parts()),
            Some(1) => lines_centroid(&self.line_parts()),
            Some(_) => points_centroid(self.point_parts().iter().map(|p| p.0)),
        };
        centroid.ok_or_else(|| GeoError::invalid("empty geometry has no centroid"))
    }

    /// Shortest planar distance to `other` in CRS units; zero when the two
    /// intersect (including containment). Both operands must be valid and
    /// non-empty.
    pub fn distance(&self, other: &Geometry) -> Result<f64> {
        self.validate()?;
        other.validate()?;
        if self.is_empty() || other.is_empty() {
            return Err(GeoError::InvalidQuery("distance to an empty geometry".to_string()));
        }
        Ok(Euclidean.distance(&self.to_geo(), &other.to_geo()))
    }

    /// A point guaranteed to lie in the interior of the geometry.
    ///
    /// Polygons are cut by a horizontal scan line at a height that avoids every
    /// vertex, and the midpoint of the widest interior interval is returned.
    /// Multi-polygons use their largest member, lines the point halfway along
    /// their length, multi-lines their longest member, multi-points their first point.
    pub fn representative_point(&self) -> Result<Point<f64>> {
        self.validate()?;
        match self.dimension() {
            None => Err(GeoError::invalid("empty geometry has no representative point")),
            Some(2) => {
                let polygons = self.polygon_parts();
                let largest = polygons.iter()
                    .max_by(|a, b| polygon_area(a).total_cmp(&polygon_area(b)))
                    .ok_or_else(|| GeoError::invalid("no polygon parts"))?;
                scanline_point(largest)
            }
            Some(1) => {
                let lines = self.line_parts();
                let longest = lines.iter()
                    .max_by(|a, b| line_length(a).total_cmp(&line_length(b)))
                    .ok_or_else(|| GeoError::invalid("no line parts"))?;
                Ok(Point(point_along(longest, line_length(longest) / 2.0)))
            }
            Some(_) => self.point_parts().first().copied()
                .ok_or_else(|| GeoError::invalid("no point parts")),
        }
    }
}

// ---------------------------------------------------------------------------
// Rings and lines
// ---------------------------------------------------------------------------

/// Signed shoelace area and first moments of a ring, relative to `origin`.
/// Counter-clockwise rings are positive.
fn ring_moments(ring: &LineString<f64>, origin: Coord<f64>) -> (f64, f64, f64) {
    let (mut area, mut mx, mut my) = (0.0, 0.0, 0.0);
    for line in ring.lines() {
        let (x0, y0) = (line.start.x - origin.x, line.start.y - origin.y);
        let (x1, y1) = (line.end.x - origin.x, line.end.y - origin.y);
        let cross = x0 * y1 - x1 * y0;
        area += cross;
        mx += (x0 + x1) * cross;
        my += (y0 + y1) * cross;
    }
    (area / 2.0, mx / 6.0, my / 6.0)
}

pub(crate) fn ring_signed_area(ring: &LineString<f64>) -> f64 {
    let origin = ring.0.first().copied().unwrap_or(Coord { x: 0.0, y: 0.0 });
    ring_moments(ring, origin).0
}

pub(crate) fn polygon_area(polygon: &Polygon<f64>) -> f64 {
    let exterior = ring_signed_area(polygon.exterior()).abs();
    let holes: f64 = polygon.interiors().iter().map(|h| ring_signed_area(h).abs()).sum();
    (exterior - holes).max(0.0)
}

pub(crate) fn line_length(line: &LineString<f64>) -> f64 {
    line.lines().map(|l| distance(l.start, l.end)).sum()
}

/// Coordinate `offset` units along the line, clamped to its ends.
fn point_along(line: &LineString<f64>, offset: f64) -> Coord<f64> {
    let mut remaining = offset;
    for l in line.lines() {
        let len = distance(l.start, l.end);
        if len > 0.0 && remaining <= len {
            return lerp(l.start, l.end, remaining / len);
        }
        remaining -= len;
    }
    line.0.last().copied().unwrap_or(Coord { x: f64::NAN, y: f64::NAN })
}

// ---------------------------------------------------------------------------
// Centroids
// ---------------------------------------------------------------------------

fn polygons_centroid(polygons: &[Polygon<f64>]) -> Option<Point<f64>> {
    let origin = polygons.first()?.exterior().0.first().copied()?;
    let (mut area, mut mx, mut my) = (0.0, 0.0, 0.0);

    for polygon in polygons {
        let rings = std::iter::once((polygon.exterior(), 1.0))
            .chain(polygon.interiors().iter().map(|h| (h, -1.0)));
        for (ring, sign) in rings {
            // Orientation-independent: exteriors add, holes subtract.
            let (a, x, y) = ring_moments(ring, origin);
            let orientation = if a < 0.0 { -1.0 } else { 1.0 };
            area += sign * orientation * a;
            mx += sign * orientation * x;
            my += sign * orientation * y;
        }
    }

    if area > 0.0 {
        return Some(Point::new(origin.x + mx / area, origin.y + my / area));
    }

    // Zero-area polygons collapse onto their boundary.
    let boundaries: Vec<LineString<f64>> = polygons.iter()
        .flat_map(|p| std::iter::once(p.exterior().clone()).chain(p.interiors().iter().cloned()))
        .collect();
    lines_centroid(&boundaries)
}

fn lines_centroid(lines: &[LineString<f64>]) -> Option<Point<f64>> {
    let (mut total, mut x, mut y) = (0.0, 0.0, 0.0);
    for l in lines.iter().flat_map(|ls| ls.lines()) {
        let len = distance(l.start, l.end);
        total += len;
        x += len * (l.start.x + l.end.x) / 2.0;
        y += len * (l.start.y + l.end.y) / 2.0;
    }

    if total > 0.0 {
        Some(Point::new(x / total, y / total))
    } else {
        points_centroid(lines.iter().flat_map(|ls| ls.0.iter().copied()))
    }
}

fn points_centroid(coords: impl Iterator<Item = Coord<f64>>) -> Option<Point<f64>> {
    let (mut n, mut x, mut y) = (0usize, 0.0, 0.0);
    for c in coords {
        n += 1;
        x += c.x;
        y += c.y;
    }
    (n > 0).then(|| Point::new(x / n as f64, y / n as f64))
}

// ---------------------------------------------------------------------------
// Representative point
// ---------------------------------------------------------------------------

fn scanline_point(polygon: &Polygon<f64>) -> Result<Point<f64>> {
    let rings: Vec<&LineString<f64>> = std::iter::once(polygon.exterior())
        .chain(polygon.interiors().iter())
        .collect();

    let mut ys: Vec<f64> = rings.iter().flat_map(|r| r.0.iter().map(|c| c.y)).collect();
    ys.sort_by(f64::total_cmp);
    ys.dedup();
    let (Some(&min_y), Some(&max_y)) = (ys.first(), ys.last()) else {
        return Err(GeoError::invalid("polygon has no vertices"));
    };

    // Scan at the midpoint of the vertex-free band around the middle height,
    // so every crossing is transversal.
    let middle = (min_y + max_y) / 2.0;
    let y = ys.windows(2)
        .find(|w| w[0] <= middle && middle <= w[1])
        .map(|w| (w[0] + w[1]) / 2.0)
        .ok_or_else(|| GeoError::invalid("polygon has no interior"))?;

    let mut xs: Vec<f64> = Vec::new();
    for line in rings.iter().flat_map(|r| r.lines()) {
        let (a, b) = (line.start, line.end);
        if (a.y > y) != (b.y > y) {
            xs.push(a.x + (y - a.y) * (b.x - a.x) / (b.y - a.y));
        }
    }
    xs.sort_by(f64::total_cmp);

    let widest = xs.chunks_exact(2)
        .filter(|pair| pair[1] > pair[0])
        .max_by(|p, q| (p[1] - p[0]).total_cmp(&(q[1] - q[0])))
        .ok_or_else(|| GeoError::invalid("polygon has no interior"))?;

    Ok(Point::new((widest[0] + widest[1]) / 2.0, y))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geom::algorithm::pip::{Location, locate_in_polygon};

    fn close(a: f64, b: f64) -> bool { (a - b).abs() < 1e-9 }

    #[test]
    fn square_area_and_perimeter() {
        let sq = Geometry::rect(0.0, 0.0, 2.0, 2.0);
        assert!(close(sq.area().unwrap(), 4.0));
        assert!(close(sq.length().unwrap(), 8.0));
    }

    #[test]
    fn area_ignores_winding_and_subtracts_holes() {
        let cw = Geometry::polygon([(0.0, 0.0), (0.0, 10.0), (10.0, 10.0), (10.0, 0.0)], vec![]);
        assert!(close(cw.area().unwrap(), 100.0));

        let donut = Geometry::polygon(
            [(0.0, 0.0), (10.0, 0.0), (10.0, 10.0), (0.0, 10.0)],
            vec![vec![(4.0, 4.0), (6.0, 4.0), (6.0, 6.0), (4.0, 6.0)]],
        );
        assert!(close(donut.area().unwrap(), 96.0));
        assert!(close(donut.length().unwrap(), 48.0));
    }

    #[test]
    fn lines_and_points_have_no_area() {
        assert_eq!(Geometry::line_string([(0.0, 0.0), (3.0, 4.0)]).area().unwrap(), 0.0);
        assert!(close(Geometry::line_string([(0.0, 0.0), (3.0, 4.0)]).length().unwrap(), 5.0));
        assert_eq!(Geometry::point(1.0, 1.0).length().unwrap(), 0.0);
    }

    #[test]
    fn l_shape_centroid_is_area_weighted() {
        // 2x1 block plus 1x1 block on top of its left half.
        let l = Geometry::polygon([(0.0, 0.0), (2.0, 0.0), (2.0, 1.0), (1.0, 1.0), (1.0, 2.0), (0.0, 2.0)], vec![]);
        let c = l.centroid().unwrap();
        assert!(close(c.x(), 5.0 / 6.0));
        assert!(close(c.y(), 5.0 / 6.0));
    }

    #[test]
    fn centroid_may_fall_outside_but_representative_point_does_not() {
        // A "C" shape whose area centroid lies in the notch.
        let c_shape = Geometry::polygon(
            [(0.0, 0.0), (4.0, 0.0), (4.0, 1.0), (1.0, 1.0), (1.0, 3.0), (4.0, 3.0), (4.0, 4.0), (0.0, 4.0)],
            vec![],
        );
        let Geometry::Polygon(poly) = &c_shape else { unreachable!() };

        let centroid = c_shape.centroid().unwrap();
        assert_eq!(locate_in_polygon(centroid.0, poly), Location::Exterior);

        let rep = c_shape.representative_point().unwrap();
        assert_eq!(locate_in_polygon(rep.0, poly), Location::Interior);
    }

    #[test]
    fn representative_point_avoids_holes() {
        let donut = Geometry::polygon(
            [(0.0, 0.0), (10.0, 0.0), (10.0, 10.0), (0.0, 10.0)],
            vec![vec![(2.0, 2.0), (8.0, 2.0), (8.0, 8.0), (2.0, 8.0)]],
        );
        let Geometry::Polygon(poly) = &donut else { unreachable!() };
        let rep = donut.representative_point().unwrap();
        assert_eq!(locate_in_polygon(rep.0, poly), Location::Interior);
    }

    #[test]
    fn line_representative_point_is_halfway() {
        let line = Geometry::line_string([(0.0, 0.0), (2.0, 0.0), (2.0, 2.0)]);
        assert_eq!(line.representative_point().unwrap(), Point::new(2.0, 0.0));
        assert_eq!(Geometry::point(3.0, 4.0).representative_point().unwrap(), Point::new(3.0, 4.0));
    }

    #[test]
    fn multi_centroids() {
        let mp = Geometry::from_parts(vec![], vec![], vec![
            geo::Polygon::new(LineString::from(vec![(0.0, 0.0), (1.0, 0.0), (1.0, 1.0), (0.0, 1.0), (0.0, 0.0)]), vec![]),
            geo::Polygon::new(LineString::from(vec![(3.0, 0.0), (4.0, 0.0), (4.0, 1.0), (3.0, 1.0), (3.0, 0.0)]), vec![]),
        ]);
        let c = mp.centroid().unwrap();
        assert!(close(c.x(), 2.0) && close(c.y(), 0.5));

        let pts = Geometry::MultiPoint(vec![Point::new(0.0, 0.0), Point::new(2.0, 4.0)].into());
        assert_eq!(pts.centroid().unwrap(), Point::new(1.0, 2.0));
    }

    #[test]
    fn collinear_ring_has_zero_area_and_a_boundary_centroid() {
        let flat = Geometry::polygon([(0.0, 0.0), (1.0, 0.0), (2.0, 0.0)], vec![]);
        assert_eq!(flat.area().unwrap(), 0.0);
        assert!(close(flat.length().unwrap(), 4.0));
        let c = flat.centroid().unwrap();
        assert!(close(c.x(), 1.0) && close(c.y(), 0.0));

        // Still rejected where an interior is needed.
        assert!(!flat.is_valid());
        assert_eq!(flat.representative_point().unwrap_err().kind(), "geometry-invalid");
    }

    #[test]
    fn distance_between_shapes() {
        let square = Geometry::rect(0.0, 0.0, 2.0, 2.0);
        assert!(close(square.distance(&Geometry::point(5.0, 6.0)).unwrap(), 5.0));
        assert!(close(square.distance(&Geometry::rect(3.0, 0.0, 4.0, 1.0)).unwrap(), 1.0));
        assert!(close(Geometry::line_string([(0.0, 4.0), (4.0, 4.0)]).distance(&square).unwrap(), 2.0));

        // Touching, crossing and contained operands are at distance zero.
        assert_eq!(square.distance(&Geometry::rect(2.0, 0.0, 3.0, 1.0)).unwrap(), 0.0);
        assert_eq!(square.distance(&Geometry::line_string([(-1.0, 1.0), (3.0, 1.0)])).unwrap(), 0.0);
        assert_eq!(square.distance(&Geometry::point(1.0, 1.0)).unwrap(), 0.0);

        assert_eq!(square.distance(&Geometry::empty()).unwrap_err().kind(), "invalid-query");
        let bow_tie = Geometry::polygon([(0.0, 0.0), (2.0, 2.0), (2.0, 0.0), (0.0, 2.0)], vec![]);
        assert_eq!(square.distance(&bow_tie).unwrap_err().kind(), "geometry-invalid");
    }

    #[test]
    fn empty_and_malformed_fail() {
        assert_eq!(Geometry::empty().centroid().unwrap_err().kind(), "geometry-invalid");
        assert_eq!(Geometry::point(f64::NAN, 0.0).area().unwrap_err().kind(), "geometry-invalid");
    }
}
