//! Rotation search over convex hull edges (rotating calipers).
//!
//! An optimal bounding rectangle of a convex outline always has one side
//! collinear with a hull edge, so both searches only visit hull edge angles.

use crate::geometry::{bounding_box, convex_hull, rotate_polygon, Point};
use crate::{Error, Result};
use std::f64::consts::PI;

const AREA_TOLERANCE: f64 = 1e-9;

/// Maps an angle into (−π/2, π/2]. Bounding boxes repeat every π/2, with
/// width and height swapped, so a half-turn range keeps both orientations.
fn normalize_half_turn(angle: f64) -> f64 {
    let mut a = angle % PI;
    if a <= -PI / 2.0 {
        a += PI;
    } else if a > PI / 2.0 {
        a -= PI;
    }
    a
}

/// Rotations that bring each hull edge onto the X axis, deduplicated.
fn edge_rotations(hull: &[Point]) -> Vec<f64> {
    let n = hull.len();
    let mut angles: Vec<f64> = Vec::with_capacity(n);
    for i in 0..n {
        let (a, b) = (hull[i], hull[(i + 1) % n]);
        let r = normalize_half_turn(-(b.1 - a.1).atan2(b.0 - a.0));
        if !angles.iter().any(|&x| (x - r).abs() < 1e-12) {
            angles.push(r);
        }
    }
    angles
}

fn hull_of(points: &[Point]) -> Result<Vec<Point>> {
    convex_hull(points).map_err(|e| Error::RotationFailed(e.to_string()))
}

/// Rotation (radians) that minimizes the axis-aligned bounding box area.
///
/// Ties prefer the smallest absolute rotation, so already-aligned outlines
/// come back with `0.0`.
pub fn min_area_rect_rotation(points: &[Point]) -> Result<f64> {
    let hull = hull_of(points)?;

    let mut best: Option<(f64, f64)> = None;
    for r in edge_rotations(&hull) {
        let Some(bb) = bounding_box(&rotate_polygon(&hull, r)) else {
            continue;
        };
        let area = bb.area();
        best = match best {
            None => Some((r, area)),
            Some((br, ba)) => {
                let tol = AREA_TOLERANCE * ba.max(1.0);
                if area < ba - tol || (area <= ba + tol && r.abs() < br.abs() - 1e-12) {
                    Some((r, area))
                } else {
                    Some((br, ba))
                }
            }
        };
    }

    match best {
        Some((r, area)) if area > 0.0 && area.is_finite() => Ok(r),
        _ => Err(Error::RotationFailed("no finite bounding box".into())),
    }
}

/// Rotation (radians) whose bounding box overflows a `width` × `height` box
/// the least. Ties prefer the smaller box, then the smaller rotation.
pub fn fit_into_box_rotation(points: &[Point], width: f64, height: f64) -> Result<f64> {
    let hull = hull_of(points)?;

    let mut best: Option<(f64, f64, f64)> = None;
    for base in edge_rotations(&hull) {
        for r in [base, normalize_half_turn(base + PI / 2.0)] {
            let Some(bb) = bounding_box(&rotate_polygon(&hull, r)) else {
                continue;
            };
            let overfit = (bb.width() - width).max(0.0) + (bb.height() - height).max(0.0);
            let key = (overfit, bb.area(), r.abs());
            let better = match best {
                None => true,
                Some((bo, ba, br)) => {
                    if (key.0 - bo).abs() > 1e-9 {
                        key.0 < bo
                    } else if (key.1 - ba).abs() > AREA_TOLERANCE * ba.max(1.0) {
                        key.1 < ba
                    } else {
                        key.2 < br.abs() - 1e-12
                    }
                }
            };
            if better {
                best = Some((overfit, bb.area(), r));
            }
        }
    }

    best.map(|(_, _, r)| r)
        .ok_or_else(|| Error::RotationFailed("empty hull".into()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn rect(w: f64, h: f64) -> Vec<Point> {
        vec![(0.0, 0.0), (w, 0.0), (w, h), (0.0, h)]
    }

    #[test]
    fn test_aligned_rectangle_needs_no_rotation() {
        let r = min_area_rect_rotation(&rect(30.0, 10.0)).unwrap();
        assert_relative_eq!(r, 0.0, epsilon = 1e-12);
    }

    #[test]
    fn test_tilted_rectangle_is_straightened() {
        let tilted = rotate_polygon(&rect(30.0, 10.0), 0.3);
        let r = min_area_rect_rotation(&tilted).unwrap();
        let bb = bounding_box(&rotate_polygon(&tilted, r)).unwrap();
        assert_relative_eq!(bb.area(), 300.0, epsilon = 1e-6);
    }

    #[test]
    fn test_degenerate_outline_fails_closed() {
        let line = vec![(0.0, 0.0), (5.0, 5.0), (10.0, 10.0)];
        assert!(matches!(
            min_area_rect_rotation(&line),
            Err(Error::RotationFailed(_))
        ));
        assert!(fit_into_box_rotation(&line, 10.0, 10.0).is_err());
    }

    #[test]
    fn test_fit_into_box_turns_long_side() {
        // 60 x 10 does not fit a 40 x 80 box until it stands up.
        let r = fit_into_box_rotation(&rect(60.0, 10.0), 40.0, 80.0).unwrap();
        let bb = bounding_box(&rotate_polygon(&rect(60.0, 10.0), r)).unwrap();
        assert!(bb.width() <= 40.0 + 1e-9);
        assert!(bb.height() <= 80.0 + 1e-9);
    }

    #[test]
    fn test_normalize_half_turn() {
        assert_relative_eq!(normalize_half_turn(PI), 0.0, epsilon = 1e-12);
        assert_relative_eq!(normalize_half_turn(-PI / 2.0), PI / 2.0, epsilon = 1e-12);
        assert_relative_eq!(normalize_half_turn(3.0 * PI / 4.0), -PI / 4.0, epsilon = 1e-12);
    }
}
