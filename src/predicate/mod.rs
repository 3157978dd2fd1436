//! Binary predicates and set operations over [`Geometry`] values.
//!
//! The public functions validate both operands and fail with
//! `geometry-invalid`; batch operations call the unchecked variants on
//! features validated at construction.

use std::fmt;
use std::str::FromStr;

use crate::error::{GeoError, Result};
use crate::geom::Geometry;

mod overlay;
mod relate;

fn checked<T>(a: &Geometry, b: &Geometry, op: impl FnOnce(&Geometry, &Geometry) -> T) -> Result<T> {
    a.validate()?;
    b.validate()?;
    Ok(op(a, b))
}

// ---------------------------------------------------------------------------
// Predicates
// ---------------------------------------------------------------------------

/// True when the closed point sets share at least one point.
pub fn intersects(a: &Geometry, b: &Geometry) -> Result<bool> { checked(a, b, relate::intersects) }

pub fn disjoint(a: &Geometry, b: &Geometry) -> Result<bool> { Ok(!intersects(a, b)?) }

/// Boundaries meet but interiors do not.
pub fn touches(a: &Geometry, b: &Geometry) -> Result<bool> { checked(a, b, relate::touches) }

/// `a` lies in `b` and their interiors meet. Points on `b`'s boundary are not within.
pub fn within(a: &Geometry, b: &Geometry) -> Result<bool> { checked(a, b, relate::within) }

pub fn contains(a: &Geometry, b: &Geometry) -> Result<bool> { within(b, a) }

/// No point of `a` lies outside `b`.
pub fn covered_by(a: &Geometry, b: &Geometry) -> Result<bool> { checked(a, b, relate::covered_by) }

pub fn covers(a: &Geometry, b: &Geometry) -> Result<bool> { covered_by(b, a) }

pub fn overlaps(a: &Geometry, b: &Geometry) -> Result<bool> { checked(a, b, relate::overlaps) }

pub fn crosses(a: &Geometry, b: &Geometry) -> Result<bool> { checked(a, b, relate::crosses) }

/// Point-set equality; vertex order, ring start and winding do not matter.
pub fn equals(a: &Geometry, b: &Geometry) -> Result<bool> { checked(a, b, relate::equals) }

/// Equality after rounding every coordinate to `decimal` places.
pub fn almost_equals(a: &Geometry, b: &Geometry, decimal: i32) -> Result<bool> {
    let decimal = u32::try_from(decimal)
        .map_err(|_| GeoError::InvalidQuery(format!("decimal must be non-negative, got {decimal}")))?;
    equals(&a.round(decimal), &b.round(decimal))
}

/// A named binary predicate, as accepted by spatial joins.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Predicate {
    #[default]
    Intersects,
    Disjoint,
    Touches,
    Within,
    Contains,
    Crosses,
    Overlaps,
    Covers,
    CoveredBy,
    Equals,
}

impl Predicate {
    pub const ALL: [Predicate; 10] = [
        Predicate::Intersects,
        Predicate::Disjoint,
        Predicate::Touches,
        Predicate::Within,
        Predicate::Contains,
        Predicate::Crosses,
        Predicate::Overlaps,
        Predicate::Covers,
        Predicate::CoveredBy,
        Predicate::Equals,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Predicate::Intersects => "intersects",
            Predicate::Disjoint => "disjoint",
            Predicate::Touches => "touches",
            Predicate::Within => "within",
            Predicate::Contains => "contains",
            Predicate::Crosses => "crosses",
            Predicate::Overlaps => "overlaps",
            Predicate::Covers => "covers",
            Predicate::CoveredBy => "covered_by",
            Predicate::Equals => "equals",
        }
    }

    /// Whether a true result implies the bounding boxes intersect, so an
    /// index lookup can pre-filter candidates.
    #[inline]
    pub fn needs_overlap(&self) -> bool { !matches!(self, Predicate::Disjoint) }

    pub fn evaluate(&self, a: &Geometry, b: &Geometry) -> Result<bool> {
        checked(a, b, |a, b| self.evaluate_unchecked(a, b))
    }

    pub(crate) fn evaluate_unchecked(&self, a: &Geometry, b: &Geometry) -> bool {
        match self {
            Predicate::Intersects => relate::intersects(a, b),
            Predicate::Disjoint => !relate::intersects(a, b),
            Predicate::Touches => relate::touches(a, b),
            Predicate::Within => relate::within(a, b),
            Predicate::Contains => relate::within(b, a),
            Predicate::Crosses => relate::crosses(a, b),
            Predicate::Overlaps => relate::overlaps(a, b),
            Predicate::Covers => relate::covered_by(b, a),
            Predicate::CoveredBy => relate::covered_by(a, b),
            Predicate::Equals => relate::equals(a, b),
        }
    }
}

impl FromStr for Predicate {
    type Err = GeoError;

    fn from_str(s: &str) -> Result<Self> {
        let name = s.trim().to_ascii_lowercase();
        Predicate::ALL.into_iter()
            .find(|p| p.name() == name)
            .ok_or_else(|| GeoError::InvalidQuery(format!("unknown predicate {s:?}")))
    }
}

impl fmt::Display for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.name()) }
}

// ---------------------------------------------------------------------------
// Set operations
// ---------------------------------------------------------------------------

/// Every point in `a` or `b`. Results of mixed dimension come back as a
/// `Collection`; a single dimension as the matching multi-geometry.
pub fn union(a: &Geometry, b: &Geometry) -> Result<Geometry> { checked(a, b, overlay::union) }

pub fn intersection(a: &Geometry, b: &Geometry) -> Result<Geometry> { checked(a, b, overlay::intersection) }

/// Points of `a` not in `b`. Subtracting something of lower dimension
/// leaves `a`'s areas unchanged.
pub fn difference(a: &Geometry, b: &Geometry) -> Result<Geometry> { checked(a, b, overlay::difference) }

pub fn symmetric_difference(a: &Geometry, b: &Geometry) -> Result<Geometry> {
    checked(a, b, overlay::symmetric_difference)
}

/// Union of all geometries. Fails with `empty-collection` when there are none.
pub fn unary_union(geometries: &[Geometry]) -> Result<Geometry> {
    geometries.iter().try_for_each(Geometry::validate)?;
    unary_union_unchecked(geometries)
}

pub(crate) fn unary_union_unchecked(geometries: &[Geometry]) -> Result<Geometry> {
    overlay::unary_union(geometries).ok_or(GeoError::EmptyCollection("unary_union"))
}
