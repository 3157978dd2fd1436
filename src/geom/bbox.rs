use geo::{Coord, LineString, Polygon, Rect};
use rstar::AABB;
use serde::{Deserialize, Serialize};

/// Axis-aligned bounding box. Degenerates to a point when `min == max`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub min_x: f64,
    pub min_y: f64,
    pub max_x: f64,
    pub max_y: f64,
}

impl BoundingBox {
    /// Build a box from its corners, as given. Use [`BoundingBox::is_valid`]
    /// before trusting caller-supplied values.
    pub fn new(min_x: f64, min_y: f64, max_x: f64, max_y: f64) -> Self {
        Self { min_x, min_y, max_x, max_y }
    }

    /// A zero-size box around a single coordinate.
    pub fn from_coord(coord: Coord<f64>) -> Self {
        Self::new(coord.x, coord.y, coord.x, coord.y)
    }

    /// Smallest box covering every coordinate, or `None` for an empty iterator.
    pub fn from_coords(coords: impl IntoIterator<Item = Coord<f64>>) -> Option<Self> {
        coords.into_iter().fold(None, |acc: Option<Self>, coord| match acc {
            Some(bbox) => Some(bbox.expanded_to(coord)),
            None => Some(Self::from_coord(coord)),
        })
    }

    #[inline] pub fn width(&self) -> f64 { self.max_x - self.min_x }

    #[inline] pub fn height(&self) -> f64 { self.max_y - self.min_y }

    #[inline] pub fn area(&self) -> f64 { self.width() * self.height() }

    #[inline] pub fn diagonal(&self) -> f64 { self.width().hypot(self.height()) }

    #[inline]
    pub fn center(&self) -> Coord<f64> {
        Coord { x: (self.min_x + self.max_x) / 2.0, y: (self.min_y + self.max_y) / 2.0 }
    }

    /// True when every bound is a finite number.
    #[inline]
    pub fn is_finite(&self) -> bool {
        self.min_x.is_finite() && self.min_y.is_finite() && self.max_x.is_finite() && self.max_y.is_finite()
    }

    /// Finite and correctly ordered (`min <= max` on both axes).
    #[inline]
    pub fn is_valid(&self) -> bool {
        self.is_finite() && self.min_x <= self.max_x && self.min_y <= self.max_y
    }

    /// True when the boxes share at least one point (closed intervals).
    #[inline]
    pub fn intersects(&self, other: &BoundingBox) -> bool {
        self.min_x <= other.max_x
            && self.max_x >= other.min_x
            && self.min_y <= other.max_y
            && self.max_y >= other.min_y
    }

    #[inline]
    pub fn contains_coord(&self, coord: Coord<f64>) -> bool {
        coord.x >= self.min_x && coord.x <= self.max_x && coord.y >= self.min_y && coord.y <= self.max_y
    }

    /// True when `other` lies entirely inside this box (boundary included).
    #[inline]
    pub fn contains(&self, other: &BoundingBox) -> bool {
        self.min_x <= other.min_x
            && self.min_y <= other.min_y
            && self.max_x >= other.max_x
            && self.max_y >= other.max_y
    }

    /// Smallest box covering both boxes.
    pub fn union(&self, other: &BoundingBox) -> BoundingBox {
        BoundingBox::new(
            self.min_x.min(other.min_x),
            self.min_y.min(other.min_y),
            self.max_x.max(other.max_x),
            self.max_y.max(other.max_y),
        )
    }

    /// Grow the box to cover `coord`.
    pub fn expanded_to(&self, coord: Coord<f64>) -> BoundingBox {
        self.union(&BoundingBox::from_coord(coord))
    }

    /// Pad every side by `delta`.
    pub fn expand_by(&self, delta: f64) -> BoundingBox {
        BoundingBox::new(self.min_x - delta, self.min_y - delta, self.max_x + delta, self.max_y + delta)
    }

    /// Envelope in the form the R-tree expects.
    #[inline]
    pub fn to_aabb(&self) -> AABB<[f64; 2]> {
        AABB::from_corners([self.min_x, self.min_y], [self.max_x, self.max_y])
    }

    pub fn to_rect(&self) -> Rect<f64> {
        Rect::new(Coord { x: self.min_x, y: self.min_y }, Coord { x: self.max_x, y: self.max_y })
    }

    /// The box as a closed, counter-clockwise polygon.
    pub fn to_polygon(&self) -> Polygon<f64> {
        Polygon::new(
            LineString::from(vec![
                (self.min_x, self.min_y),
                (self.max_x, self.min_y),
                (self.max_x, self.max_y),
                (self.min_x, self.max_y),
                (self.min_x, self.min_y),
            ]),
            vec![],
        )
    }
}

impl From<Rect<f64>> for BoundingBox {
    fn from(rect: Rect<f64>) -> Self {
        Self::new(rect.min().x, rect.min().y, rect.max().x, rect.max().y)
    }
}
