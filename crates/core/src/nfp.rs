//! No-Fit Polygon (NFP) primitives.
//!
//! The NFP of a stationary outline A and an orbiting outline B is the set of
//! reference-point positions at which B touches or overlaps A. For convex
//! outlines it is the Minkowski sum A ⊕ (−B), computed in O(n + m) by merging
//! edge vectors sorted by angle.
//!
//! The inner-fit rectangle (IFP) is the dual for a rectangular container: the
//! positions at which B stays inside it.

use crate::geometry::{ensure_ccw, Point};
use crate::transform::AABB2D;
use std::f64::consts::PI;

/// Minkowski sum of two convex outlines. Both inputs may have either winding.
pub fn minkowski_sum_convex(poly_a: &[Point], poly_b: &[Point]) -> Vec<Point> {
    if poly_a.is_empty() || poly_b.is_empty() {
        return Vec::new();
    }

    let a = ensure_ccw(poly_a);
    let b = ensure_ccw(poly_b);

    let edges_a = edge_vectors(&a);
    let edges_b = edge_vectors(&b);

    let start_a = bottom_left_vertex(&a);
    let start_b = bottom_left_vertex(&b);

    let merged = merge_edge_vectors(&edges_a, start_a, &edges_b, start_b);

    let mut result = Vec::with_capacity(merged.len() + 1);
    let mut current = (a[start_a].0 + b[start_b].0, a[start_a].1 + b[start_b].1);
    result.push(current);
    for (dx, dy) in merged {
        current = (current.0 + dx, current.1 + dy);
        result.push(current);
    }

    // The walk returns to its start; drop the repeated vertex.
    if result.len() > 1 {
        let (first, last) = (result[0], result[result.len() - 1]);
        if (first.0 - last.0).abs() < 1e-9 && (first.1 - last.1).abs() < 1e-9 {
            result.pop();
        }
    }

    result
}

/// NFP of two convex outlines, both given in their placed coordinates.
///
/// A reference point `t` is inside the result exactly when `orbiting + t`
/// overlaps `stationary`.
pub fn nfp_convex(stationary: &[Point], orbiting: &[Point]) -> Vec<Point> {
    let reflected: Vec<Point> = orbiting.iter().map(|&(x, y)| (-x, -y)).collect();
    minkowski_sum_convex(stationary, &reflected)
}

/// Inner-fit rectangle: translations that keep a shape with local bounding
/// box `shape` inside `container`. `None` when the shape is too large.
pub fn inner_fit_rect(container: &AABB2D, shape: &AABB2D, tolerance: f64) -> Option<AABB2D> {
    let min_x = container.min_x - shape.min_x;
    let max_x = container.max_x - shape.max_x;
    let min_y = container.min_y - shape.min_y;
    let max_y = container.max_y - shape.max_y;

    if max_x < min_x - tolerance || max_y < min_y - tolerance {
        return None;
    }

    // Collapse near-zero slack into a single line/point.
    Some(AABB2D::new(
        min_x.min(max_x),
        min_y.min(max_y),
        max_x.max(min_x),
        max_y.max(min_y),
    ))
}

/// Points along every edge of `polygon`, `per_edge` interior samples each.
pub fn sample_edges(polygon: &[Point], per_edge: usize) -> Vec<Point> {
    let n = polygon.len();
    if per_edge == 0 || n < 2 {
        return Vec::new();
    }

    let mut out = Vec::with_capacity(n * per_edge);
    for i in 0..n {
        let (a, b) = (polygon[i], polygon[(i + 1) % n]);
        for k in 1..=per_edge {
            let t = k as f64 / (per_edge + 1) as f64;
            out.push((a.0 + (b.0 - a.0) * t, a.1 + (b.1 - a.1) * t));
        }
    }
    out
}

fn edge_vectors(polygon: &[Point]) -> Vec<Point> {
    let n = polygon.len();
    (0..n)
        .map(|i| {
            let j = (i + 1) % n;
            (polygon[j].0 - polygon[i].0, polygon[j].1 - polygon[i].1)
        })
        .collect()
}

/// Index of the bottom-most (then left-most) vertex.
fn bottom_left_vertex(polygon: &[Point]) -> usize {
    let mut min_idx = 0;
    for (i, &(x, y)) in polygon.iter().enumerate() {
        let (min_x, min_y) = polygon[min_idx];
        if y < min_y || (y == min_y && x < min_x) {
            min_idx = i;
        }
    }
    min_idx
}

/// Edge angle in [0, 2π).
fn edge_angle(dx: f64, dy: f64) -> f64 {
    let angle = dy.atan2(dx);
    if angle < 0.0 {
        angle + 2.0 * PI
    } else {
        angle
    }
}

fn merge_edge_vectors(
    edges_a: &[Point],
    start_a: usize,
    edges_b: &[Point],
    start_b: usize,
) -> Vec<Point> {
    let (n_a, n_b) = (edges_a.len(), edges_b.len());
    let mut result = Vec::with_capacity(n_a + n_b);
    let (mut i_a, mut i_b) = (0, 0);

    while i_a < n_a || i_b < n_b {
        if i_a >= n_a {
            result.push(edges_b[(start_b + i_b) % n_b]);
            i_b += 1;
        } else if i_b >= n_b {
            result.push(edges_a[(start_a + i_a) % n_a]);
            i_a += 1;
        } else {
            let ea = edges_a[(start_a + i_a) % n_a];
            let eb = edges_b[(start_b + i_b) % n_b];
            let angle_a = edge_angle(ea.0, ea.1);
            let angle_b = edge_angle(eb.0, eb.1);

            if (angle_a - angle_b).abs() <= 1e-10 {
                // Parallel edges fuse into one.
                result.push((ea.0 + eb.0, ea.1 + eb.1));
                i_a += 1;
                i_b += 1;
            } else if angle_a < angle_b {
                result.push(ea);
                i_a += 1;
            } else {
                result.push(eb);
                i_b += 1;
            }
        }
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::{area, bounding_box, point_strictly_inside, translate_polygon};
    use approx::assert_relative_eq;

    fn rect(w: f64, h: f64) -> Vec<Point> {
        vec![(0.0, 0.0), (w, 0.0), (w, h), (0.0, h)]
    }

    #[test]
    fn test_minkowski_sum_of_squares() {
        let sum = minkowski_sum_convex(&rect(10.0, 10.0), &rect(5.0, 5.0));
        assert_eq!(sum.len(), 4);
        assert_relative_eq!(area(&sum), 225.0, epsilon = 1e-9);
    }

    #[test]
    fn test_minkowski_sum_square_triangle() {
        let tri = vec![(0.0, 0.0), (4.0, 0.0), (0.0, 4.0)];
        let sum = minkowski_sum_convex(&rect(10.0, 10.0), &tri);
        // 100 + 8 + perimeter-swept strips 10*4 + 10*4
        assert_relative_eq!(area(&sum), 188.0, epsilon = 1e-9);
        assert_eq!(sum.len(), 5);
    }

    #[test]
    fn test_nfp_convex_marks_overlapping_positions() {
        let fixed = translate_polygon(&rect(10.0, 10.0), 20.0, 20.0);
        let moving = rect(4.0, 4.0);
        let nfp = nfp_convex(&fixed, &moving);
        let bb = bounding_box(&nfp).unwrap();
        assert_relative_eq!(bb.min_x, 16.0, epsilon = 1e-9);
        assert_relative_eq!(bb.max_x, 30.0, epsilon = 1e-9);
        assert!(point_strictly_inside((25.0, 25.0), &nfp, 1e-9));
        // Touching from the left is on the boundary, not inside.
        assert!(!point_strictly_inside((16.0, 25.0), &nfp, 1e-9));
    }

    #[test]
    fn test_inner_fit_rect() {
        let bin = AABB2D::new(0.0, 0.0, 50.0, 50.0);
        let item = AABB2D::new(-5.0, -5.0, 5.0, 5.0);
        let ifp = inner_fit_rect(&bin, &item, 1e-9).unwrap();
        assert_eq!(ifp, AABB2D::new(5.0, 5.0, 45.0, 45.0));

        let big = AABB2D::new(0.0, 0.0, 60.0, 10.0);
        assert!(inner_fit_rect(&bin, &big, 1e-9).is_none());

        let exact = AABB2D::new(0.0, 0.0, 50.0, 10.0);
        let ifp = inner_fit_rect(&bin, &exact, 1e-9).unwrap();
        assert_relative_eq!(ifp.width(), 0.0);
    }

    #[test]
    fn test_sample_edges() {
        let samples = sample_edges(&rect(4.0, 4.0), 3);
        assert_eq!(samples.len(), 12);
        assert_eq!(samples[0], (1.0, 0.0));
        assert!(sample_edges(&rect(4.0, 4.0), 0).is_empty());
    }
}
