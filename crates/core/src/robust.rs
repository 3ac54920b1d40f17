//! Robust geometric predicates.
//!
//! Orientation tests go through Shewchuk's adaptive-precision `orient2d`
//! so that convexity and segment-crossing checks stay correct for nearly
//! collinear input, which is common for outlines exported from meshes.

use crate::geometry::Point;
use robust::{orient2d as robust_orient2d, Coord};

/// Result of an orientation test.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Orientation {
    /// Left turn.
    CounterClockwise,
    /// Right turn.
    Clockwise,
    /// Points are on one line.
    Collinear,
}

impl Orientation {
    #[inline]
    pub fn is_ccw(self) -> bool {
        matches!(self, Orientation::CounterClockwise)
    }

    #[inline]
    pub fn is_cw(self) -> bool {
        matches!(self, Orientation::Clockwise)
    }

    #[inline]
    pub fn is_collinear(self) -> bool {
        matches!(self, Orientation::Collinear)
    }
}

/// Orientation of `pc` relative to the directed line `pa -> pb`.
#[inline]
pub fn orient2d(pa: Point, pb: Point, pc: Point) -> Orientation {
    let det = robust_orient2d(
        Coord { x: pa.0, y: pa.1 },
        Coord { x: pb.0, y: pb.1 },
        Coord { x: pc.0, y: pc.1 },
    );

    if det > 0.0 {
        Orientation::CounterClockwise
    } else if det < 0.0 {
        Orientation::Clockwise
    } else {
        Orientation::Collinear
    }
}

/// Checks if a polygon is convex. Collinear runs are ignored.
pub fn is_convex(polygon: &[Point]) -> bool {
    let n = polygon.len();
    if n < 3 {
        return false;
    }

    let mut expected: Option<Orientation> = None;
    for i in 0..n {
        let o = orient2d(polygon[i], polygon[(i + 1) % n], polygon[(i + 2) % n]);
        if o.is_collinear() {
            continue;
        }
        match expected {
            None => expected = Some(o),
            Some(e) if e != o => return false,
            _ => {}
        }
    }

    expected.is_some()
}

/// Returns true if segments `a1-a2` and `b1-b2` cross at a single interior point.
///
/// Touching at an endpoint or overlapping collinearly does not count.
pub fn segments_cross(a1: Point, a2: Point, b1: Point, b2: Point) -> bool {
    let o1 = orient2d(a1, a2, b1);
    let o2 = orient2d(a1, a2, b2);
    let o3 = orient2d(b1, b2, a1);
    let o4 = orient2d(b1, b2, a2);

    if o1.is_collinear() || o2.is_collinear() || o3.is_collinear() || o4.is_collinear() {
        return false;
    }

    o1 != o2 && o3 != o4
}
