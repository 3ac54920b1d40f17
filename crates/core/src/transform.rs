//! Placement transforms and axis-aligned bounding boxes.
//!
//! Every placed item is described in bed-local coordinates by rotating its
//! outline about the local origin and then translating it.

use crate::geometry::Point;
use nalgebra::{Isometry2, Point2, Vector2};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// A 2D rigid transformation (rotation about the origin, then translation).
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Transform2D {
    /// Translation in x direction.
    pub tx: f64,
    /// Translation in y direction.
    pub ty: f64,
    /// Rotation angle in radians.
    pub angle: f64,
}

impl Transform2D {
    /// Creates a new identity transform.
    pub fn identity() -> Self {
        Self::default()
    }

    /// Creates a transform with both translation and rotation.
    pub fn new(tx: f64, ty: f64, angle: f64) -> Self {
        Self { tx, ty, angle }
    }

    /// Creates a translation-only transform.
    pub fn translation(tx: f64, ty: f64) -> Self {
        Self::new(tx, ty, 0.0)
    }

    /// Creates a rotation-only transform.
    pub fn rotation(angle: f64) -> Self {
        Self::new(0.0, 0.0, angle)
    }

    /// Converts to a nalgebra Isometry2.
    pub fn to_isometry(&self) -> Isometry2<f64> {
        Isometry2::new(Vector2::new(self.tx, self.ty), self.angle)
    }

    /// Transforms a single point.
    pub fn transform_point(&self, p: Point) -> Point {
        let q = self.to_isometry().transform_point(&Point2::new(p.0, p.1));
        (q.x, q.y)
    }

    /// Transforms an outline.
    pub fn transform_points(&self, points: &[Point]) -> Vec<Point> {
        if self.angle == 0.0 {
            return points
                .iter()
                .map(|&(x, y)| (x + self.tx, y + self.ty))
                .collect();
        }
        let iso = self.to_isometry();
        points
            .iter()
            .map(|&(x, y)| {
                let q = iso.transform_point(&Point2::new(x, y));
                (q.x, q.y)
            })
            .collect()
    }

    /// Checks if this is approximately an identity transform.
    pub fn is_identity(&self, epsilon: f64) -> bool {
        self.tx.abs() < epsilon && self.ty.abs() < epsilon && self.angle.abs() < epsilon
    }
}

/// Axis-aligned bounding box in bed coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct AABB2D {
    /// Minimum x coordinate.
    pub min_x: f64,
    /// Minimum y coordinate.
    pub min_y: f64,
    /// Maximum x coordinate.
    pub max_x: f64,
    /// Maximum y coordinate.
    pub max_y: f64,
}

impl AABB2D {
    /// Creates a new AABB from min/max coordinates.
    pub fn new(min_x: f64, min_y: f64, max_x: f64, max_y: f64) -> Self {
        Self {
            min_x,
            min_y,
            max_x,
            max_y,
        }
    }

    /// Creates an AABB from a set of points.
    pub fn from_points(points: &[Point]) -> Option<Self> {
        let (&first, rest) = points.split_first()?;
        let mut bb = Self::new(first.0, first.1, first.0, first.1);
        for &(x, y) in rest {
            bb.min_x = bb.min_x.min(x);
            bb.min_y = bb.min_y.min(y);
            bb.max_x = bb.max_x.max(x);
            bb.max_y = bb.max_y.max(y);
        }
        Some(bb)
    }

    pub fn width(&self) -> f64 {
        self.max_x - self.min_x
    }

    pub fn height(&self) -> f64 {
        self.max_y - self.min_y
    }

    pub fn area(&self) -> f64 {
        self.width() * self.height()
    }

    pub fn center(&self) -> Point {
        (
            (self.min_x + self.max_x) / 2.0,
            (self.min_y + self.max_y) / 2.0,
        )
    }

    pub fn min_corner(&self) -> Point {
        (self.min_x, self.min_y)
    }

    pub fn max_corner(&self) -> Point {
        (self.max_x, self.max_y)
    }

    pub fn top_left(&self) -> Point {
        (self.min_x, self.max_y)
    }

    pub fn bottom_right(&self) -> Point {
        (self.max_x, self.min_y)
    }

    /// Checks if this AABB contains a point (boundary inclusive).
    pub fn contains_point(&self, p: Point) -> bool {
        p.0 >= self.min_x && p.0 <= self.max_x && p.1 >= self.min_y && p.1 <= self.max_y
    }

    /// Checks if `other` lies inside this box, allowing `tolerance` of slack.
    pub fn contains(&self, other: &Self, tolerance: f64) -> bool {
        other.min_x >= self.min_x - tolerance
            && other.min_y >= self.min_y - tolerance
            && other.max_x <= self.max_x + tolerance
            && other.max_y <= self.max_y + tolerance
    }

    /// Checks if this AABB intersects another AABB.
    pub fn intersects(&self, other: &Self) -> bool {
        self.min_x <= other.max_x
            && self.max_x >= other.min_x
            && self.min_y <= other.max_y
            && self.max_y >= other.min_y
    }

    /// Returns the union (bounding box) of two AABBs.
    pub fn union(&self, other: &Self) -> Self {
        Self {
            min_x: self.min_x.min(other.min_x),
            min_y: self.min_y.min(other.min_y),
            max_x: self.max_x.max(other.max_x),
            max_y: self.max_y.max(other.max_y),
        }
    }

    /// Expands the AABB by a margin on all sides. Negative margins shrink it.
    pub fn expand(&self, margin: f64) -> Self {
        self.expand_xy(margin, margin)
    }

    /// Expands the AABB by separate margins per axis.
    pub fn expand_xy(&self, mx: f64, my: f64) -> Self {
        Self {
            min_x: self.min_x - mx,
            min_y: self.min_y - my,
            max_x: self.max_x + mx,
            max_y: self.max_y + my,
        }
    }

    pub fn translate(&self, dx: f64, dy: f64) -> Self {
        Self::new(self.min_x + dx, self.min_y + dy, self.max_x + dx, self.max_y + dy)
    }

    /// Returns the box outline as a CCW polygon.
    pub fn to_polygon(&self) -> Vec<Point> {
        vec![
            (self.min_x, self.min_y),
            (self.max_x, self.min_y),
            (self.max_x, self.max_y),
            (self.min_x, self.max_y),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use std::f64::consts::PI;

    #[test]
    fn test_transform_rotates_then_translates() {
        let t = Transform2D::new(10.0, 5.0, PI / 2.0);
        let (x, y) = t.transform_point((1.0, 0.0));
        assert_relative_eq!(x, 10.0, epsilon = 1e-10);
        assert_relative_eq!(y, 6.0, epsilon = 1e-10);
    }

    #[test]
    fn test_transform_translation_fast_path() {
        let t = Transform2D::translation(2.0, 3.0);
        let pts = t.transform_points(&[(0.0, 0.0), (1.0, 1.0)]);
        assert_eq!(pts, vec![(2.0, 3.0), (3.0, 4.0)]);
        assert!(Transform2D::identity().is_identity(1e-12));
    }

    #[test]
    fn test_aabb_from_points() {
        let bb = AABB2D::from_points(&[(1.0, 2.0), (4.0, -1.0), (0.0, 3.0)]).unwrap();
        assert_relative_eq!(bb.width(), 4.0);
        assert_relative_eq!(bb.height(), 4.0);
        assert_eq!(bb.center(), (2.0, 1.0));
        assert_eq!(bb.top_left(), (0.0, 3.0));
        assert_eq!(bb.bottom_right(), (4.0, -1.0));
        assert!(AABB2D::from_points(&[]).is_none());
    }

    #[test]
    fn test_aabb_union_and_contains() {
        let a = AABB2D::new(0.0, 0.0, 10.0, 10.0);
        let b = AABB2D::new(5.0, 5.0, 20.0, 12.0);
        let u = a.union(&b);
        assert_eq!(u, AABB2D::new(0.0, 0.0, 20.0, 12.0));
        assert!(u.contains(&a, 0.0));
        assert!(!a.contains(&b, 0.0));
        assert!(a.intersects(&b));
        assert!(!a.intersects(&b.translate(30.0, 0.0)));
    }

    #[test]
    fn test_aabb_expand_negative_shrinks() {
        let bb = AABB2D::new(0.0, 0.0, 100.0, 50.0).expand_xy(-5.0, -2.0);
        assert_relative_eq!(bb.width(), 90.0);
        assert_relative_eq!(bb.height(), 46.0);
    }
}
