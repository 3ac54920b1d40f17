//! Polygon kernel.
//!
//! Outlines are plain `(x, y)` vertex lists in millimetres, open (the closing
//! vertex is not repeated). Functions that build new outlines return them in
//! counter-clockwise order.

use crate::nfp::minkowski_sum_convex;
use crate::robust::{is_convex as is_convex_robust, orient2d, segments_cross};
use crate::transform::AABB2D;
use crate::{Error, Result};
use geo::{ConvexHull, Coord, LineString};
use i_overlay::core::fill_rule::FillRule;
use i_overlay::core::overlay_rule::OverlayRule;
use i_overlay::float::single::SingleFloatOverlay;
use std::f64::consts::PI;

/// A point in bed coordinates.
pub type Point = (f64, f64);

/// Geometric tolerance in millimetres.
pub const EPSILON: f64 = 1e-4;

/// Number of segments used to approximate round offsets.
pub const OFFSET_SEGMENTS: usize = 16;

/// Computes the signed area of a polygon.
/// Positive for counter-clockwise, negative for clockwise.
pub fn signed_area(polygon: &[Point]) -> f64 {
    let n = polygon.len();
    if n < 3 {
        return 0.0;
    }

    let mut area = 0.0;
    for i in 0..n {
        let j = (i + 1) % n;
        area += polygon[i].0 * polygon[j].1;
        area -= polygon[j].0 * polygon[i].1;
    }

    area / 2.0
}

pub fn area(polygon: &[Point]) -> f64 {
    signed_area(polygon).abs()
}

/// Ensures polygon vertices are in counter-clockwise order.
pub fn ensure_ccw(polygon: &[Point]) -> Vec<Point> {
    if signed_area(polygon) < 0.0 {
        polygon.iter().rev().copied().collect()
    } else {
        polygon.to_vec()
    }
}

/// Removes repeated consecutive vertices and a repeated closing vertex.
pub fn clean_polygon(polygon: &[Point]) -> Vec<Point> {
    let mut out: Vec<Point> = Vec::with_capacity(polygon.len());
    for &p in polygon {
        if let Some(&last) = out.last() {
            if distance(last, p) <= EPSILON * 1e-3 {
                continue;
            }
        }
        out.push(p);
    }
    while out.len() > 1 {
        let (first, last) = (out[0], out[out.len() - 1]);
        if distance(first, last) <= EPSILON * 1e-3 {
            out.pop();
        } else {
            break;
        }
    }
    out
}

pub fn bounding_box(polygon: &[Point]) -> Option<AABB2D> {
    AABB2D::from_points(polygon)
}

/// Area-weighted centroid, falling back to the vertex average for zero-area input.
pub fn centroid(polygon: &[Point]) -> Point {
    let n = polygon.len();
    if n == 0 {
        return (0.0, 0.0);
    }

    let a = signed_area(polygon);
    if a.abs() < f64::EPSILON {
        let sx: f64 = polygon.iter().map(|p| p.0).sum();
        let sy: f64 = polygon.iter().map(|p| p.1).sum();
        return (sx / n as f64, sy / n as f64);
    }

    let (mut cx, mut cy) = (0.0, 0.0);
    for i in 0..n {
        let (x0, y0) = polygon[i];
        let (x1, y1) = polygon[(i + 1) % n];
        let cross = x0 * y1 - x1 * y0;
        cx += (x0 + x1) * cross;
        cy += (y0 + y1) * cross;
    }
    (cx / (6.0 * a), cy / (6.0 * a))
}

#[inline]
pub fn distance(a: Point, b: Point) -> f64 {
    ((a.0 - b.0).powi(2) + (a.1 - b.1).powi(2)).sqrt()
}

pub fn translate_polygon(polygon: &[Point], dx: f64, dy: f64) -> Vec<Point> {
    polygon.iter().map(|&(x, y)| (x + dx, y + dy)).collect()
}

/// Rotates a polygon around the origin by the given angle (in radians).
pub fn rotate_polygon(polygon: &[Point], angle: f64) -> Vec<Point> {
    if angle.abs() < 1e-12 {
        return polygon.to_vec();
    }

    let (sin_a, cos_a) = angle.sin_cos();
    polygon
        .iter()
        .map(|&(x, y)| (x * cos_a - y * sin_a, x * sin_a + y * cos_a))
        .collect()
}

/// Convex hull of a point set, CCW, without the closing vertex.
///
/// Fails on fewer than three points or a collinear set.
pub fn convex_hull(points: &[Point]) -> Result<Vec<Point>> {
    if points.len() < 3 {
        return Err(Error::DegenerateGeometry(format!(
            "convex hull needs 3 points, got {}",
            points.len()
        )));
    }

    let coords: Vec<Coord<f64>> = points.iter().map(|&(x, y)| Coord { x, y }).collect();
    let hull = LineString::from(coords).convex_hull();
    let ring: Vec<Point> = hull.exterior().coords().map(|c| (c.x, c.y)).collect();
    let hull = ensure_ccw(&clean_polygon(&ring));

    if hull.len() < 3 || area(&hull) <= f64::EPSILON {
        return Err(Error::DegenerateGeometry("collinear point set".into()));
    }
    Ok(hull)
}

pub fn is_convex(polygon: &[Point]) -> bool {
    is_convex_robust(polygon)
}

/// Ray-casting point-in-polygon test. Boundary points may land on either side.
pub fn point_in_polygon(point: Point, polygon: &[Point]) -> bool {
    let (px, py) = point;
    let n = polygon.len();
    if n < 3 {
        return false;
    }

    let mut inside = false;
    let mut j = n - 1;
    for i in 0..n {
        let (xi, yi) = polygon[i];
        let (xj, yj) = polygon[j];

        if ((yi > py) != (yj > py)) && (px < (xj - xi) * (py - yi) / (yj - yi) + xi) {
            inside = !inside;
        }
        j = i;
    }

    inside
}

/// Distance from `p` to the segment `a-b`.
pub fn distance_to_segment(p: Point, a: Point, b: Point) -> f64 {
    let (dx, dy) = (b.0 - a.0, b.1 - a.1);
    let len_sq = dx * dx + dy * dy;
    if len_sq <= f64::EPSILON {
        return distance(p, a);
    }
    let t = (((p.0 - a.0) * dx + (p.1 - a.1) * dy) / len_sq).clamp(0.0, 1.0);
    distance(p, (a.0 + t * dx, a.1 + t * dy))
}

/// Distance from `p` to the nearest edge of `polygon`.
pub fn distance_to_boundary(p: Point, polygon: &[Point]) -> f64 {
    let n = polygon.len();
    (0..n)
        .map(|i| distance_to_segment(p, polygon[i], polygon[(i + 1) % n]))
        .fold(f64::INFINITY, f64::min)
}

/// True if `p` is inside `polygon` and farther than `tolerance` from its boundary.
pub fn point_strictly_inside(p: Point, polygon: &[Point], tolerance: f64) -> bool {
    point_in_polygon(p, polygon) && distance_to_boundary(p, polygon) > tolerance
}

/// True if `p` is inside `polygon` or within `tolerance` of its boundary.
pub fn point_inside_or_on(p: Point, polygon: &[Point], tolerance: f64) -> bool {
    point_in_polygon(p, polygon) || distance_to_boundary(p, polygon) <= tolerance
}

/// Checks that `inner` lies within `outer`: every vertex inside (or on) and
/// no pair of edges crossing.
pub fn polygon_inside(inner: &[Point], outer: &[Point], tolerance: f64) -> bool {
    if !inner.iter().all(|&p| point_inside_or_on(p, outer, tolerance)) {
        return false;
    }

    let (n, m) = (inner.len(), outer.len());
    for i in 0..n {
        let (a1, a2) = (inner[i], inner[(i + 1) % n]);
        for j in 0..m {
            if segments_cross(a1, a2, outer[j], outer[(j + 1) % m]) {
                return false;
            }
        }
    }
    true
}

/// True if the interiors of two convex outlines overlap by more than `tolerance`.
pub fn convex_polygons_overlap(a: &[Point], b: &[Point], tolerance: f64) -> bool {
    // Separating axis test over the edge normals of both outlines.
    for poly in [a, b] {
        let n = poly.len();
        for i in 0..n {
            let (p, q) = (poly[i], poly[(i + 1) % n]);
            let len = distance(p, q);
            if len <= f64::EPSILON {
                continue;
            }
            let axis = (-(q.1 - p.1) / len, (q.0 - p.0) / len);
            let project = |pts: &[Point]| {
                pts.iter()
                    .map(|&(x, y)| x * axis.0 + y * axis.1)
                    .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
                        (lo.min(v), hi.max(v))
                    })
            };
            let (amin, amax) = project(a);
            let (bmin, bmax) = project(b);
            if amax <= bmin + tolerance || bmax <= amin + tolerance {
                return false;
            }
        }
    }
    true
}

/// Regular polygon with `segments` vertices on a circle.
pub fn regular_polygon(center: Point, radius: f64, segments: usize) -> Vec<Point> {
    let n = segments.max(3);
    (0..n)
        .map(|i| {
            let t = 2.0 * PI * i as f64 / n as f64;
            (center.0 + radius * t.cos(), center.1 + radius * t.sin())
        })
        .collect()
}

/// Offsets a convex outline by `delta`.
///
/// Positive deltas take the Minkowski sum with a polygon circumscribing a
/// circle of radius `delta`, so the result always contains the true round
/// offset. Negative deltas move every edge inward along its normal.
pub fn offset_convex(hull: &[Point], delta: f64) -> Result<Vec<Point>> {
    if hull.len() < 3 {
        return Err(Error::DegenerateGeometry("offset of fewer than 3 points".into()));
    }
    if delta.abs() < f64::EPSILON {
        return Ok(ensure_ccw(hull));
    }

    if delta > 0.0 {
        let circumradius = delta / (PI / OFFSET_SEGMENTS as f64).cos();
        let disc = regular_polygon((0.0, 0.0), circumradius, OFFSET_SEGMENTS);
        return Ok(minkowski_sum_convex(hull, &disc));
    }

    let poly = ensure_ccw(hull);
    let n = poly.len();
    let inset = -delta;
    let mut out = Vec::with_capacity(n);
    for i in 0..n {
        let prev = poly[(i + n - 1) % n];
        let curr = poly[i];
        let next = poly[(i + 1) % n];
        let n1 = inward_normal(prev, curr);
        let n2 = inward_normal(curr, next);
        let p1 = (prev.0 + n1.0 * inset, prev.1 + n1.1 * inset);
        let d1 = (curr.0 - prev.0, curr.1 - prev.1);
        let p2 = (curr.0 + n2.0 * inset, curr.1 + n2.1 * inset);
        let d2 = (next.0 - curr.0, next.1 - curr.1);
        match line_intersection(p1, d1, p2, d2) {
            Some(p) => out.push(p),
            // Collinear neighbours: shift the vertex straight in.
            None => out.push((curr.0 + n2.0 * inset, curr.1 + n2.1 * inset)),
        }
    }

    // An inset past the inradius crosses opposite edges over; the result
    // can still have positive area, so check every edge keeps its direction.
    for i in 0..n {
        let (a, b) = (poly[i], poly[(i + 1) % n]);
        let (p, q) = (out[i], out[(i + 1) % n]);
        let dot = (q.0 - p.0) * (b.0 - a.0) + (q.1 - p.1) * (b.1 - a.1);
        if dot <= f64::EPSILON {
            return Err(Error::DegenerateGeometry(format!(
                "inward offset {} collapses edge {}",
                inset, i
            )));
        }
    }
    if signed_area(&out) <= f64::EPSILON {
        return Err(Error::DegenerateGeometry("inward offset collapsed".into()));
    }
    Ok(out)
}

fn inward_normal(a: Point, b: Point) -> Point {
    let len = distance(a, b);
    if len <= f64::EPSILON {
        return (0.0, 0.0);
    }
    (-(b.1 - a.1) / len, (b.0 - a.0) / len)
}

fn line_intersection(p: Point, r: Point, q: Point, s: Point) -> Option<Point> {
    let denom = r.0 * s.1 - r.1 * s.0;
    if denom.abs() < 1e-12 {
        return None;
    }
    let t = ((q.0 - p.0) * s.1 - (q.1 - p.1) * s.0) / denom;
    Some((p.0 + t * r.0, p.1 + t * r.1))
}

/// Unions outlines using i_overlay and returns the outer contours of the result.
pub fn union_polygons(polygons: &[Vec<Point>]) -> Vec<Vec<Point>> {
    let mut iter = polygons.iter().filter(|p| p.len() >= 3);
    let Some(first) = iter.next() else {
        return Vec::new();
    };

    let mut result: Vec<Vec<[f64; 2]>> = vec![first.iter().map(|&(x, y)| [x, y]).collect()];

    for polygon in iter {
        let clip: Vec<[f64; 2]> = polygon.iter().map(|&(x, y)| [x, y]).collect();
        let shapes = result.overlay(&[clip], OverlayRule::Union, FillRule::NonZero);

        let merged: Vec<Vec<[f64; 2]>> = shapes
            .into_iter()
            .filter_map(|shape| shape.into_iter().next())
            .filter(|contour| contour.len() >= 3)
            .collect();

        // Keep the previous state if the overlay produced nothing usable.
        if !merged.is_empty() {
            result = merged;
        }
    }

    result
        .into_iter()
        .map(|contour| ensure_ccw(&contour.into_iter().map(|[x, y]| (x, y)).collect::<Vec<_>>()))
        .collect()
}

/// Fits a circle to an outline using its bounding-box center.
///
/// Returns `(center, radius)` when every vertex lies within `tolerance` of the
/// mean radius.
pub fn fit_circle(points: &[Point], tolerance: f64) -> Result<(Point, f64)> {
    let bb = bounding_box(points)
        .ok_or_else(|| Error::InvalidBed("empty outline".into()))?;
    let center = bb.center();
    let radius = points.iter().map(|&p| distance(p, center)).sum::<f64>() / points.len() as f64;

    if radius <= EPSILON {
        return Err(Error::InvalidBed("zero radius".into()));
    }
    if let Some(dev) = points
        .iter()
        .map(|&p| (distance(p, center) - radius).abs())
        .find(|&d| d > tolerance)
    {
        return Err(Error::InvalidBed(format!(
            "vertex deviates {dev:.6} from fitted radius"
        )));
    }
    Ok((center, radius))
}

/// Checks if the winding of a simple polygon is counter-clockwise using an extreme vertex.
pub fn is_ccw(polygon: &[Point]) -> bool {
    let n = polygon.len();
    if n < 3 {
        return false;
    }
    let mut idx = 0;
    for (i, &(x, y)) in polygon.iter().enumerate() {
        let (mx, my) = polygon[idx];
        if y < my || (y == my && x < mx) {
            idx = i;
        }
    }
    orient2d(polygon[(idx + n - 1) % n], polygon[idx], polygon[(idx + 1) % n]).is_ccw()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn square(side: f64) -> Vec<Point> {
        vec![(0.0, 0.0), (side, 0.0), (side, side), (0.0, side)]
    }

    #[test]
    fn test_signed_area_and_winding() {
        let sq = square(10.0);
        assert_relative_eq!(signed_area(&sq), 100.0);
        let cw: Vec<Point> = sq.iter().rev().copied().collect();
        assert_relative_eq!(signed_area(&cw), -100.0);
        assert!(is_ccw(&ensure_ccw(&cw)));
        assert!(!is_ccw(&cw));
    }

    #[test]
    fn test_clean_polygon_drops_duplicates() {
        let dirty = vec![(0.0, 0.0), (0.0, 0.0), (1.0, 0.0), (1.0, 1.0), (0.0, 0.0)];
        assert_eq!(clean_polygon(&dirty), vec![(0.0, 0.0), (1.0, 0.0), (1.0, 1.0)]);
    }

    #[test]
    fn test_centroid() {
        let (cx, cy) = centroid(&square(4.0));
        assert_relative_eq!(cx, 2.0, epsilon = 1e-12);
        assert_relative_eq!(cy, 2.0, epsilon = 1e-12);
    }

    #[test]
    fn test_convex_hull_of_l_shape() {
        let l_shape = vec![
            (0.0, 0.0),
            (20.0, 0.0),
            (20.0, 10.0),
            (10.0, 10.0),
            (10.0, 20.0),
            (0.0, 20.0),
        ];
        let hull = convex_hull(&l_shape).unwrap();
        assert_eq!(hull.len(), 5);
        assert!(is_ccw(&hull));
        assert!(is_convex(&hull));
    }

    #[test]
    fn test_convex_hull_collinear_fails() {
        let line = vec![(0.0, 0.0), (1.0, 1.0), (2.0, 2.0)];
        assert!(matches!(convex_hull(&line), Err(Error::DegenerateGeometry(_))));
    }

    #[test]
    fn test_point_in_polygon_and_boundary() {
        let sq = square(10.0);
        assert!(point_in_polygon((5.0, 5.0), &sq));
        assert!(!point_in_polygon((15.0, 5.0), &sq));
        assert!(point_inside_or_on((10.0, 5.0), &sq, 1e-9));
        assert!(!point_strictly_inside((10.0, 5.0), &sq, 1e-9));
        assert_relative_eq!(distance_to_boundary((5.0, 2.0), &sq), 2.0);
    }

    #[test]
    fn test_polygon_inside() {
        let outer = vec![
            (0.0, 0.0),
            (20.0, 0.0),
            (20.0, 10.0),
            (10.0, 10.0),
            (10.0, 20.0),
            (0.0, 20.0),
        ];
        let small = translate_polygon(&square(4.0), 2.0, 2.0);
        assert!(polygon_inside(&small, &outer, 1e-9));
        // Corners inside both arms, but the square spans the notch.
        let spanning = vec![(8.0, 8.0), (14.0, 8.0), (14.0, 9.0), (9.0, 14.0), (8.0, 14.0)];
        assert!(!polygon_inside(&spanning, &outer, 1e-9));
    }

    #[test]
    fn test_convex_overlap_touching_is_not_overlap() {
        let a = square(10.0);
        let b = translate_polygon(&square(10.0), 10.0, 0.0);
        assert!(!convex_polygons_overlap(&a, &b, 1e-9));
        let c = translate_polygon(&square(10.0), 9.0, 0.0);
        assert!(convex_polygons_overlap(&a, &c, 1e-9));
    }

    #[test]
    fn test_offset_convex_grows_and_shrinks() {
        let sq = square(10.0);
        let grown = offset_convex(&sq, 1.0).unwrap();
        let bb = bounding_box(&grown).unwrap();
        assert_relative_eq!(bb.width(), 12.0, epsilon = 0.05);
        assert!(area(&grown) > 100.0 + 4.0 * 10.0);

        let shrunk = offset_convex(&sq, -1.0).unwrap();
        let bb = bounding_box(&shrunk).unwrap();
        assert_relative_eq!(bb.width(), 8.0, epsilon = 1e-9);
        assert_relative_eq!(area(&shrunk), 64.0, epsilon = 1e-9);

        assert!(offset_convex(&sq, -6.0).is_err());
        assert!(offset_convex(&sq, -5.0).is_err());
        let thin = vec![(0.0, 0.0), (40.0, 0.0), (40.0, 4.0), (0.0, 4.0)];
        assert!(offset_convex(&thin, -2.5).is_err());
        assert!(offset_convex(&thin, -1.5).is_ok());
    }

    #[test]
    fn test_union_of_overlapping_squares() {
        let a = square(10.0);
        let b = translate_polygon(&square(10.0), 5.0, 0.0);
        let merged = union_polygons(&[a, b]);
        assert_eq!(merged.len(), 1);
        assert_relative_eq!(area(&merged[0]), 150.0, epsilon = 1e-6);
    }

    #[test]
    fn test_union_of_disjoint_squares() {
        let a = square(10.0);
        let b = translate_polygon(&square(10.0), 20.0, 0.0);
        assert_eq!(union_polygons(&[a, b]).len(), 2);
        assert!(union_polygons(&[]).is_empty());
    }

    #[test]
    fn test_fit_circle() {
        let circle = regular_polygon((5.0, -3.0), 40.0, 64);
        let (center, radius) = fit_circle(&circle, 10.0 * EPSILON).unwrap();
        assert_relative_eq!(center.0, 5.0, epsilon = 1e-9);
        assert_relative_eq!(center.1, -3.0, epsilon = 1e-9);
        assert_relative_eq!(radius, 40.0, epsilon = 1e-9);

        let l_shape = vec![
            (0.0, 0.0),
            (20.0, 0.0),
            (20.0, 10.0),
            (10.0, 10.0),
            (10.0, 20.0),
            (0.0, 20.0),
        ];
        assert!(fit_circle(&l_shape, 10.0 * EPSILON).is_err());
    }
}
