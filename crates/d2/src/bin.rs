//! Print bed abstraction.
//!
//! A [`Bin`] is built once per run from the bed outline points and gives the
//! Placer and the scorer a uniform view over rectangular, circular, general
//! polygonal and unbounded beds.

use platepack_core::geometry::{
    area, bounding_box, clean_polygon, distance, ensure_ccw, fit_circle, polygon_inside, Point,
    EPSILON,
};
use platepack_core::AABB2D;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Half extent of the square that stands in for an unbounded bed.
pub const INFINITE_BED_HALF_SIZE: f64 = 1.0e6;

/// Relative gap between outline area and bounding-box area below which a
/// bed is treated as a box.
pub const BOX_AREA_TOLERANCE: f64 = 1e-3;

/// Maximum per-vertex radius deviation for a circular bed.
pub const CIRCLE_TOLERANCE: f64 = 10.0 * EPSILON;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum BinKind {
    Box,
    Circle,
    Polygon,
    Infinite,
}

/// A print surface.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Bin {
    Box(AABB2D),
    Circle { center: Point, radius: f64 },
    Polygon { outline: Vec<Point>, bbox: AABB2D },
    Infinite { center: Point },
}

impl Bin {
    /// Classifies a bed outline.
    ///
    /// - no points: unbounded bed at the origin
    /// - one point: unbounded bed centered there
    /// - outline area within 0.1% of its bounding box: box
    /// - every vertex within tolerance of a fitted circle: circle
    /// - otherwise: general polygon
    ///
    /// Outlines without area fall back to their bounding box, or to an
    /// unbounded bed when even that is flat.
    pub fn from_outline(points: &[Point]) -> Bin {
        let pts = ensure_ccw(&clean_polygon(points));
        match pts.len() {
            0 => return Bin::Infinite { center: (0.0, 0.0) },
            1 => return Bin::Infinite { center: pts[0] },
            _ => {}
        }

        let Some(bb) = bounding_box(&pts) else {
            return Bin::Infinite { center: (0.0, 0.0) };
        };
        if bb.area() <= f64::EPSILON {
            log::warn!("bed outline has no extent, using an unbounded bed");
            return Bin::Infinite { center: bb.center() };
        }

        let poly_area = area(&pts);
        if pts.len() < 3 || poly_area <= f64::EPSILON {
            log::warn!("bed outline has no area, using its bounding box");
            return Bin::Box(bb);
        }

        if 1.0 - poly_area / bb.area() < BOX_AREA_TOLERANCE {
            return Bin::Box(bb);
        }

        match fit_circle(&pts, CIRCLE_TOLERANCE) {
            Ok((center, radius)) => Bin::Circle { center, radius },
            Err(_) => Bin::Polygon {
                outline: pts,
                bbox: bb,
            },
        }
    }

    pub fn kind(&self) -> BinKind {
        match self {
            Bin::Box(_) => BinKind::Box,
            Bin::Circle { .. } => BinKind::Circle,
            Bin::Polygon { .. } => BinKind::Polygon,
            Bin::Infinite { .. } => BinKind::Infinite,
        }
    }

    pub fn is_bounded(&self) -> bool {
        !matches!(self, Bin::Infinite { .. })
    }

    pub fn bounding_box(&self) -> AABB2D {
        match self {
            Bin::Box(bb) => *bb,
            Bin::Circle { center, radius } => AABB2D::new(
                center.0 - radius,
                center.1 - radius,
                center.0 + radius,
                center.1 + radius,
            ),
            Bin::Polygon { bbox, .. } => *bbox,
            Bin::Infinite { center } => AABB2D::new(
                center.0 - INFINITE_BED_HALF_SIZE,
                center.1 - INFINITE_BED_HALF_SIZE,
                center.0 + INFINITE_BED_HALF_SIZE,
                center.1 + INFINITE_BED_HALF_SIZE,
            ),
        }
    }

    pub fn center(&self) -> Point {
        match self {
            Bin::Circle { center, .. } | Bin::Infinite { center } => *center,
            _ => self.bounding_box().center(),
        }
    }

    pub fn area(&self) -> f64 {
        match self {
            Bin::Box(bb) => bb.area(),
            Bin::Circle { radius, .. } => std::f64::consts::PI * radius * radius,
            Bin::Polygon { outline, .. } => area(outline),
            Bin::Infinite { .. } => self.bounding_box().area(),
        }
    }

    /// Checks that a placed outline lies on the bed.
    pub fn contains(&self, outline: &[Point], tolerance: f64) -> bool {
        match self {
            Bin::Box(bb) => bounding_box(outline)
                .map(|ob| bb.contains(&ob, tolerance))
                .unwrap_or(true),
            Bin::Circle { center, radius } => outline
                .iter()
                .all(|&p| distance(p, *center) <= radius + tolerance),
            Bin::Polygon { outline: bed, bbox } => {
                bounding_box(outline)
                    .map(|ob| bbox.contains(&ob, tolerance))
                    .unwrap_or(true)
                    && polygon_inside(outline, bed, tolerance)
            }
            Bin::Infinite { .. } => true,
        }
    }

    /// How far a pile sticks out of the bed.
    ///
    /// Boxes and polygons compare the pile bounding box against the bed
    /// bounding box, circles measure the farthest hull vertex against the
    /// radius. Zero when the pile fits.
    pub fn overfit(&self, pile_bb: &AABB2D, pile_hull: &[Point]) -> f64 {
        match self {
            Bin::Box(bb) | Bin::Polygon { bbox: bb, .. } => {
                let wdiff = pile_bb.width() - bb.width();
                let hdiff = pile_bb.height() - bb.height();
                wdiff.max(0.0) + hdiff.max(0.0)
            }
            Bin::Circle { center, radius } => pile_hull
                .iter()
                .map(|&p| distance(p, *center) - radius)
                .fold(0.0, f64::max),
            Bin::Infinite { .. } => 0.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use platepack_core::geometry::regular_polygon;

    #[test]
    fn test_rectangle_outline_is_box() {
        let bin = Bin::from_outline(&[(0.0, 0.0), (100.0, 0.0), (100.0, 50.0), (0.0, 50.0)]);
        assert_eq!(bin.kind(), BinKind::Box);
        assert_relative_eq!(bin.area(), 5000.0);
        assert_eq!(bin.center(), (50.0, 25.0));
    }

    #[test]
    fn test_round_outline_is_circle() {
        let bin = Bin::from_outline(&regular_polygon((0.0, 0.0), 90.0, 64));
        match bin {
            Bin::Circle { center, radius } => {
                assert_relative_eq!(center.0, 0.0, epsilon = 1e-9);
                assert_relative_eq!(center.1, 0.0, epsilon = 1e-9);
                assert_relative_eq!(radius, 90.0, epsilon = 1e-9);
            }
            other => panic!("expected circle, got {:?}", other.kind()),
        }
    }

    #[test]
    fn test_l_outline_is_polygon() {
        let bin = Bin::from_outline(&[
            (0.0, 0.0),
            (200.0, 0.0),
            (200.0, 100.0),
            (100.0, 100.0),
            (100.0, 200.0),
            (0.0, 200.0),
        ]);
        assert_eq!(bin.kind(), BinKind::Polygon);
        assert_relative_eq!(bin.area(), 30000.0);
    }

    #[test]
    fn test_empty_and_single_point_are_infinite() {
        assert_eq!(Bin::from_outline(&[]).kind(), BinKind::Infinite);
        let bin = Bin::from_outline(&[(10.0, 20.0)]);
        assert_eq!(bin, Bin::Infinite { center: (10.0, 20.0) });
        assert!(bin.contains(&[(1e5, 1e5)], 0.0));
    }

    #[test]
    fn test_flat_outline_degrades() {
        let bin = Bin::from_outline(&[(0.0, 0.0), (100.0, 0.0), (50.0, 50.0)]);
        // A triangle is neither box nor circle.
        assert_eq!(bin.kind(), BinKind::Polygon);
        let bin = Bin::from_outline(&[(0.0, 0.0), (100.0, 0.0)]);
        assert_eq!(bin.kind(), BinKind::Infinite);
    }

    #[test]
    fn test_contains_and_overfit_box() {
        let bin = Bin::Box(AABB2D::new(0.0, 0.0, 50.0, 50.0));
        assert!(bin.contains(&[(0.0, 0.0), (10.0, 0.0), (10.0, 10.0)], 1e-9));
        assert!(!bin.contains(&[(45.0, 0.0), (55.0, 0.0), (55.0, 10.0)], 1e-9));

        let pile = AABB2D::new(0.0, 0.0, 60.0, 55.0);
        assert_relative_eq!(bin.overfit(&pile, &[]), 15.0);
        assert_relative_eq!(bin.overfit(&AABB2D::new(0.0, 0.0, 5.0, 5.0), &[]), 0.0);
    }

    #[test]
    fn test_overfit_circle() {
        let bin = Bin::Circle {
            center: (0.0, 0.0),
            radius: 10.0,
        };
        let hull = vec![(0.0, 0.0), (12.0, 0.0), (0.0, 5.0)];
        let bb = AABB2D::new(0.0, 0.0, 12.0, 5.0);
        assert_relative_eq!(bin.overfit(&bb, &hull), 2.0);
        assert!(!bin.contains(&hull, 1e-9));
    }
}
