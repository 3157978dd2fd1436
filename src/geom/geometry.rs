use geo::{Coord, LineString, MultiLineString, MultiPoint, MultiPolygon, Point, Polygon};

use crate::error::Result;
use crate::geom::BoundingBox;

/// A planar geometry.
///
/// The single-type variants wrap the matching `geo` types. `Collection` holds
/// the mixed-dimension results of set operations; an empty `Collection` is the
/// canonical empty geometry.
#[derive(Debug, Clone, PartialEq)]
pub enum Geometry {
    Point(Point<f64>),
    LineString(LineString<f64>),
    Polygon(Polygon<f64>),
    MultiPoint(MultiPoint<f64>),
    MultiLineString(MultiLineString<f64>),
    MultiPolygon(MultiPolygon<f64>),
    Collection(Vec<Geometry>),
}

impl Geometry {
    // -----------------------------------------------------------------------
    // Construction
    // -----------------------------------------------------------------------

    pub fn point(x: f64, y: f64) -> Self { Geometry::Point(Point::new(x, y)) }

    pub fn line_string(coords: impl IntoIterator<Item = (f64, f64)>) -> Self {
        Geometry::LineString(coords.into_iter().collect::<Vec<_>>().into())
    }

    /// Polygon from an exterior ring and holes. Open rings are closed.
    pub fn polygon(
        exterior: impl IntoIterator<Item = (f64, f64)>,
        holes: Vec<Vec<(f64, f64)>>,
    ) -> Self {
        Geometry::Polygon(Polygon::new(
            exterior.into_iter().collect::<Vec<_>>().into(),
            holes.into_iter().map(LineString::from).collect(),
        ))
    }

    /// Axis-aligned rectangle as a polygon.
    pub fn rect(min_x: f64, min_y: f64, max_x: f64, max_y: f64) -> Self {
        Geometry::Polygon(BoundingBox::new(min_x, min_y, max_x, max_y).to_polygon())
    }

    /// The canonical empty geometry.
    pub fn empty() -> Self { Geometry::Collection(Vec::new()) }

    /// Assemble loose parts into the simplest geometry holding all of them:
    /// a homogeneous multi-geometry when only one dimension is present,
    /// otherwise a `Collection` ordered points, lines, polygons.
    pub(crate) fn from_parts(
        points: Vec<Point<f64>>,
        lines: Vec<LineString<f64>>,
        polygons: Vec<Polygon<f64>>,
    ) -> Self {
        let mut parts = Vec::with_capacity(3);
        if !points.is_empty() { parts.push(Geometry::MultiPoint(MultiPoint(points))) }
        if !lines.is_empty() { parts.push(Geometry::MultiLineString(MultiLineString(lines))) }
        if !polygons.is_empty() { parts.push(Geometry::MultiPolygon(MultiPolygon(polygons))) }

        match parts.len() {
            0 => Geometry::empty(),
            1 => parts.pop().unwrap_or_else(Geometry::empty),
            _ => Geometry::Collection(parts),
        }
    }

    /// Convert any `geo` geometry. Lines, rectangles and triangles become
    /// line strings and polygons.
    pub fn from_geo(geometry: geo::Geometry<f64>) -> Self {
        match geometry {
            geo::Geometry::Point(p) => Geometry::Point(p),
            geo::Geometry::Line(l) => Geometry::LineString(LineString::from(vec![l.start, l.end])),
            geo::Geometry::LineString(ls) => Geometry::LineString(ls),
            geo::Geometry::Polygon(p) => Geometry::Polygon(p),
            geo::Geometry::MultiPoint(mp) => Geometry::MultiPoint(mp),
            geo::Geometry::MultiLineString(mls) => Geometry::MultiLineString(mls),
            geo::Geometry::MultiPolygon(mp) => Geometry::MultiPolygon(mp),
            geo::Geometry::GeometryCollection(gc) => {
                Geometry::Collection(gc.0.into_iter().map(Geometry::from_geo).collect())
            }
            geo::Geometry::Rect(r) => Geometry::Polygon(r.to_polygon()),
            geo::Geometry::Triangle(t) => Geometry::Polygon(t.to_polygon()),
        }
    }

    /// The equivalent `geo` geometry, used for DE-9IM evaluation.
    pub fn to_geo(&self) -> geo::Geometry<f64> {
        match self {
            Geometry::Point(p) => geo::Geometry::Point(*p),
            Geometry::LineString(ls) => geo::Geometry::LineString(ls.clone()),
            Geometry::Polygon(p) => geo::Geometry::Polygon(p.clone()),
            Geometry::MultiPoint(mp) => geo::Geometry::MultiPoint(mp.clone()),
            Geometry::MultiLineString(mls) => geo::Geometry::MultiLineString(mls.clone()),
            Geometry::MultiPolygon(mp) => geo::Geometry::MultiPolygon(mp.clone()),
            Geometry::Collection(members) => geo::Geometry::GeometryCollection(
                geo::GeometryCollection(members.iter().map(Geometry::to_geo).collect()),
            ),
        }
    }

    // -----------------------------------------------------------------------
    // Shape
    // -----------------------------------------------------------------------

    pub fn type_name(&self) -> &'static str {
        match self {
            Geometry::Point(_) => "Point",
            Geometry::LineString(_) => "LineString",
            Geometry::Polygon(_) => "Polygon",
            Geometry::MultiPoint(_) => "MultiPoint",
            Geometry::MultiLineString(_) => "MultiLineString",
            Geometry::MultiPolygon(_) => "MultiPolygon",
            Geometry::Collection(_) => "Collection",
        }
    }

    /// Topological dimension: 0 for points, 1 for lines, 2 for polygons.
    /// `None` for empty geometries.
    pub fn dimension(&self) -> Option<u8> {
        if self.is_empty() { return None }
        match self {
            Geometry::Point(_) | Geometry::MultiPoint(_) => Some(0),
            Geometry::LineString(_) | Geometry::MultiLineString(_) => Some(1),
            Geometry::Polygon(_) | Geometry::MultiPolygon(_) => Some(2),
            Geometry::Collection(members) => members.iter().filter_map(Geometry::dimension).max(),
        }
    }

    pub fn is_empty(&self) -> bool {
        match self {
            Geometry::Point(_) => false,
            Geometry::LineString(ls) => ls.0.is_empty(),
            Geometry::Polygon(p) => p.exterior().0.is_empty(),
            Geometry::MultiPoint(mp) => mp.0.is_empty(),
            Geometry::MultiLineString(mls) => mls.0.iter().all(|ls| ls.0.is_empty()),
            Geometry::MultiPolygon(mp) => mp.0.iter().all(|p| p.exterior().0.is_empty()),
            Geometry::Collection(members) => members.iter().all(Geometry::is_empty),
        }
    }

    /// True for Polygon and MultiPolygon (and non-empty collections of only those).
    pub fn is_polygonal(&self) -> bool {
        match self {
            Geometry::Polygon(_) | Geometry::MultiPolygon(_) => true,
            Geometry::Collection(members) => {
                !self.is_empty() && members.iter().filter(|m| !m.is_empty()).all(Geometry::is_polygonal)
            }
            _ => false,
        }
    }

    /// Visit every coordinate, rings included with their closing coordinate.
    pub fn for_each_coord(&self, f: &mut impl FnMut(Coord<f64>)) {
        fn ring(ls: &LineString<f64>, f: &mut impl FnMut(Coord<f64>)) {
            ls.0.iter().for_each(|c| f(*c))
        }
        fn polygon(p: &Polygon<f64>, f: &mut impl FnMut(Coord<f64>)) {
            ring(p.exterior(), f);
            p.interiors().iter().for_each(|hole| ring(hole, f));
        }

        match self {
            Geometry::Point(p) => f(p.0),
            Geometry::LineString(ls) => ring(ls, f),
            Geometry::Polygon(p) => polygon(p, f),
            Geometry::MultiPoint(mp) => mp.0.iter().for_each(|p| f(p.0)),
            Geometry::MultiLineString(mls) => mls.0.iter().for_each(|ls| ring(ls, f)),
            Geometry::MultiPolygon(mp) => mp.0.iter().for_each(|p| polygon(p, f)),
            Geometry::Collection(members) => members.iter().for_each(|m| m.for_each_coord(f)),
        }
    }

    /// Number of coordinates.
    pub fn num_coords(&self) -> usize {
        let mut count = 0;
        self.for_each_coord(&mut |_| count += 1);
        count
    }

    /// Bounding box of all coordinates; `None` only for empty geometries.
    pub fn bounding_box(&self) -> Option<BoundingBox> {
        let mut bbox: Option<BoundingBox> = None;
        self.for_each_coord(&mut |c| {
            bbox = Some(match bbox {
                Some(b) => b.expanded_to(c),
                None => BoundingBox::from_coord(c),
            })
        });
        bbox
    }

    // -----------------------------------------------------------------------
    // Decomposition
    // -----------------------------------------------------------------------

    /// Every point part (points nested in collections included).
    pub(crate) fn point_parts(&self) -> Vec<Point<f64>> {
        match self {
            Geometry::Point(p) => vec![*p],
            Geometry::MultiPoint(mp) => mp.0.clone(),
            Geometry::Collection(members) => members.iter().flat_map(Geometry::point_parts).collect(),
            _ => Vec::new(),
        }
    }

    /// Every non-empty line part.
    pub(crate) fn line_parts(&self) -> Vec<LineString<f64>> {
        match self {
            Geometry::LineString(ls) if !ls.0.is_empty() => vec![ls.clone()],
            Geometry::MultiLineString(mls) => mls.0.iter().filter(|ls| !ls.0.is_empty()).cloned().collect(),
            Geometry::Collection(members) => members.iter().flat_map(Geometry::line_parts).collect(),
            _ => Vec::new(),
        }
    }

    /// Every non-empty polygon part.
    pub(crate) fn polygon_parts(&self) -> Vec<Polygon<f64>> {
        match self {
            Geometry::Polygon(p) if !p.exterior().0.is_empty() => vec![p.clone()],
            Geometry::MultiPolygon(mp) => mp.0.iter().filter(|p| !p.exterior().0.is_empty()).cloned().collect(),
            Geometry::Collection(members) => members.iter().flat_map(Geometry::polygon_parts).collect(),
            _ => Vec::new(),
        }
    }

    // -----------------------------------------------------------------------
    // Coordinate transforms
    // -----------------------------------------------------------------------

    /// Apply a fallible function to every coordinate, keeping the structure.
    pub fn try_map_coords(&self, f: &mut impl FnMut(Coord<f64>) -> Result<Coord<f64>>) -> Result<Geometry> {
        fn line(ls: &LineString<f64>, f: &mut impl FnMut(Coord<f64>) -> Result<Coord<f64>>) -> Result<LineString<f64>> {
            Ok(LineString(ls.0.iter().map(|c| f(*c)).collect::<Result<Vec<_>>>()?))
        }
        fn polygon(p: &Polygon<f64>, f: &mut impl FnMut(Coord<f64>) -> Result<Coord<f64>>) -> Result<Polygon<f64>> {
            let exterior = line(p.exterior(), f)?;
            let holes = p.interiors().iter().map(|h| line(h, f)).collect::<Result<Vec<_>>>()?;
            Ok(Polygon::new(exterior, holes))
        }

        Ok(match self {
            Geometry::Point(p) => Geometry::Point(Point(f(p.0)?)),
            Geometry::LineString(ls) => Geometry::LineString(line(ls, f)?),
            Geometry::Polygon(p) => Geometry::Polygon(polygon(p, f)?),
            Geometry::MultiPoint(mp) => Geometry::MultiPoint(MultiPoint(
                mp.0.iter().map(|p| f(p.0).map(Point)).collect::<Result<Vec<_>>>()?,
            )),
            Geometry::MultiLineString(mls) => Geometry::MultiLineString(MultiLineString(
                mls.0.iter().map(|ls| line(ls, f)).collect::<Result<Vec<_>>>()?,
            )),
            Geometry::MultiPolygon(mp) => Geometry::MultiPolygon(MultiPolygon(
                mp.0.iter().map(|p| polygon(p, f)).collect::<Result<Vec<_>>>()?,
            )),
            Geometry::Collection(members) => Geometry::Collection(
                members.iter().map(|m| m.try_map_coords(f)).collect::<Result<Vec<_>>>()?,
            ),
        })
    }

    /// Round every coordinate to `precision` decimal digits. Precisions past
    /// what an `f64` can scale to leave the coordinates unchanged.
    pub fn round(&self, precision: u32) -> Geometry {
        let scale = 10f64.powi(i32::try_from(precision).unwrap_or(i32::MAX));
        let round = |v: f64| {
            let scaled = v * scale;
            if scaled.is_finite() { scaled.round() / scale } else { v }
        };
        // The closure never fails, so neither does the mapping.
        self.try_map_coords(&mut |c| Ok(Coord { x: round(c.x), y: round(c.y) }))
            .unwrap_or_else(|_| self.clone())
    }

    /// Shift by `(dx, dy)`.
    pub fn translate(&self, dx: f64, dy: f64) -> Geometry {
        self.try_map_coords(&mut |c| Ok(Coord { x: c.x + dx, y: c.y + dy }))
            .unwrap_or_else(|_| self.clone())
    }
}

impl From<Point<f64>> for Geometry {
    fn from(p: Point<f64>) -> Self { Geometry::Point(p) }
}

impl From<LineString<f64>> for Geometry {
    fn from(ls: LineString<f64>) -> Self { Geometry::LineString(ls) }
}

impl From<Polygon<f64>> for Geometry {
    fn from(p: Polygon<f64>) -> Self { Geometry::Polygon(p) }
}

impl From<MultiPoint<f64>> for Geometry {
    fn from(mp: MultiPoint<f64>) -> Self { Geometry::MultiPoint(mp) }
}

impl From<MultiLineString<f64>> for Geometry {
    fn from(mls: MultiLineString<f64>) -> Self { Geometry::MultiLineString(mls) }
}

impl From<MultiPolygon<f64>> for Geometry {
    fn from(mp: MultiPolygon<f64>) -> Self { Geometry::MultiPolygon(mp) }
}

impl From<geo::Geometry<f64>> for Geometry {
    fn from(g: geo::Geometry<f64>) -> Self { Geometry::from_geo(g) }
}
