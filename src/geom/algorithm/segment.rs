use geo::Coord;

/// How two closed segments meet.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) enum SegmentIntersection {
    None,
    Point(Coord<f64>),
    /// Collinear overlap, endpoints ordered along the first segment.
    Overlap(Coord<f64>, Coord<f64>),
}

/// Twice the signed area of triangle `abc`: positive when `c` lies left of `a -> b`.
#[inline]
pub(crate) fn orient(a: Coord<f64>, b: Coord<f64>, c: Coord<f64>) -> f64 {
    (b.x - a.x) * (c.y - a.y) - (b.y - a.y) * (c.x - a.x)
}

/// True when `p` lies on the closed segment `ab`.
#[inline]
pub(crate) fn on_segment(p: Coord<f64>, a: Coord<f64>, b: Coord<f64>) -> bool {
    orient(a, b, p) == 0.0
        && p.x >= a.x.min(b.x) && p.x <= a.x.max(b.x)
        && p.y >= a.y.min(b.y) && p.y <= a.y.max(b.y)
}

/// Parameter of `p` along `ab` (0 at `a`, 1 at `b`), measured on the dominant axis.
#[inline]
pub(crate) fn param(p: Coord<f64>, a: Coord<f64>, b: Coord<f64>) -> f64 {
    let (dx, dy) = (b.x - a.x, b.y - a.y);
    if dx == 0.0 && dy == 0.0 { return 0.0 }
    if dx.abs() >= dy.abs() { (p.x - a.x) / dx } else { (p.y - a.y) / dy }
}

#[inline]
pub(crate) fn lerp(a: Coord<f64>, b: Coord<f64>, t: f64) -> Coord<f64> {
    Coord { x: a.x + (b.x - a.x) * t, y: a.y + (b.y - a.y) * t }
}

#[inline]
pub(crate) fn distance(a: Coord<f64>, b: Coord<f64>) -> f64 {
    (b.x - a.x).hypot(b.y - a.y)
}

/// Intersect closed segments `p1p2` and `q1q2`.
pub(crate) fn intersect(p1: Coord<f64>, p2: Coord<f64>, q1: Coord<f64>, q2: Coord<f64>) -> SegmentIntersection {
    // Degenerate segments reduce to point-on-segment tests.
    if p1 == p2 {
        return if on_segment(p1, q1, q2) { SegmentIntersection::Point(p1) } else { SegmentIntersection::None };
    }
    if q1 == q2 {
        return if on_segment(q1, p1, p2) { SegmentIntersection::Point(q1) } else { SegmentIntersection::None };
    }

    let d1 = orient(q1, q2, p1);
    let d2 = orient(q1, q2, p2);
    let d3 = orient(p1, p2, q1);
    let d4 = orient(p1, p2, q2);

    if d1 == 0.0 && d2 == 0.0 {
        return collinear_overlap(p1, p2, q1, q2);
    }

    if d1 * d2 < 0.0 && d3 * d4 < 0.0 {
        return SegmentIntersection::Point(lerp(p1, p2, d1 / (d1 - d2)));
    }

    // Touching at an endpoint.
    if d1 == 0.0 && on_segment(p1, q1, q2) { return SegmentIntersection::Point(p1) }
    if d2 == 0.0 && on_segment(p2, q1, q2) { return SegmentIntersection::Point(p2) }
    if d3 == 0.0 && on_segment(q1, p1, p2) { return SegmentIntersection::Point(q1) }
    if d4 == 0.0 && on_segment(q2, p1, p2) { return SegmentIntersection::Point(q2) }

    SegmentIntersection::None
}

fn collinear_overlap(p1: Coord<f64>, p2: Coord<f64>, q1: Coord<f64>, q2: Coord<f64>) -> SegmentIntersection {
    let (t1, t2) = (param(q1, p1, p2), param(q2, p1, p2));
    let start = t1.min(t2).max(0.0);
    let end = t1.max(t2).min(1.0);
    // Endpoints come back exactly so callers can compare them with vertices.
    let at = |t: f64| if t <= 0.0 { p1 } else if t >= 1.0 { p2 } else { lerp(p1, p2, t) };

    if start > end {
        SegmentIntersection::None
    } else if start == end {
        SegmentIntersection::Point(at(start))
    } else {
        SegmentIntersection::Overlap(at(start), at(end))
    }
}
