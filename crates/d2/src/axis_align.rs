//! Principal-axis pre-rotation from polygon area moments.
//!
//! The moments up to third order are accumulated edge by edge with Green's
//! theorem, normalized by the signed area, and turned into the central
//! second-moment matrix `[[a, b], [b, c]]` of the outline. Its major axis is
//! at `atan2(2b, a − c) / 2` from X.

use platepack_core::geometry::Point;
use std::f64::consts::PI;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Ratio of the smaller to the larger variance above which an outline has
/// no dominant axis.
pub const NO_DOMINANT_AXIS_RATIO: f64 = 0.66;

/// Results within this distance of ±π are treated as already vertical.
pub const VERTICAL_SNAP: f64 = 0.01;

const AREA_EPSILON: f64 = 1e-9;

/// Axis that the long side of a part is turned onto.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum AlignAxis {
    X,
    Y,
}

/// Raw moment sums over the outline edges.
#[derive(Debug, Default, Clone, Copy)]
struct Moments {
    a00: f64,
    a10: f64,
    a01: f64,
    a20: f64,
    a11: f64,
    a02: f64,
    a30: f64,
    a21: f64,
    a12: f64,
    a03: f64,
}

impl Moments {
    fn accumulate(pts: &[Point]) -> Self {
        let mut m = Moments::default();
        let Some(&(mut xi_1, mut yi_1)) = pts.last() else {
            return m;
        };
        let mut xi_12 = xi_1 * xi_1;
        let mut yi_12 = yi_1 * yi_1;

        for &(xi, yi) in pts {
            let xi2 = xi * xi;
            let yi2 = yi * yi;
            let dxy = xi_1 * yi - xi * yi_1;
            let xii_1 = xi_1 + xi;
            let yii_1 = yi_1 + yi;

            m.a00 += dxy;
            m.a10 += dxy * xii_1;
            m.a01 += dxy * yii_1;
            m.a20 += dxy * (xi_1 * xii_1 + xi2);
            m.a11 += dxy * (xi_1 * (yii_1 + yi_1) + xi * (yii_1 + yi));
            m.a02 += dxy * (yi_1 * yii_1 + yi2);
            m.a30 += dxy * xii_1 * (xi_12 + xi2);
            m.a03 += dxy * yii_1 * (yi_12 + yi2);
            m.a21 += dxy
                * (xi_12 * (3.0 * yi_1 + yi) + 2.0 * xi * xi_1 * yii_1 + xi2 * (yi_1 + 3.0 * yi));
            m.a12 += dxy
                * (yi_12 * (3.0 * xi_1 + xi) + 2.0 * yi * yi_1 * xii_1 + yi2 * (xi_1 + 3.0 * xi));

            xi_1 = xi;
            yi_1 = yi;
            xi_12 = xi2;
            yi_12 = yi2;
        }
        m
    }

    /// Central second moments `(a, b, c)`, or `None` for a zero-area outline.
    fn covariance(&self) -> Option<(f64, f64, f64)> {
        if self.a00.abs() <= AREA_EPSILON {
            return None;
        }
        // Winding only flips the sign of every sum.
        let s = self.a00.signum();
        let m00 = self.a00 * s / 2.0;
        let m10 = self.a10 * s / 6.0;
        let m01 = self.a01 * s / 6.0;
        let m20 = self.a20 * s / 12.0;
        let m11 = self.a11 * s / 24.0;
        let m02 = self.a02 * s / 12.0;

        let cx = m10 / m00;
        let cy = m01 / m00;
        let a = m20 / m00 - cx * cx;
        let b = m11 / m00 - cx * cy;
        let c = m02 / m00 - cy * cy;
        Some((a, b, c))
    }
}

/// Rotation that turns the outline's principal axis onto `axis`.
///
/// Returns `None` when the outline has no area or no dominant axis.
pub fn principal_axis_rotation(outline: &[Point], axis: AlignAxis) -> Option<f64> {
    let (a, b, c) = Moments::accumulate(outline).covariance()?;

    let ratio = if a.abs() > c.abs() {
        (c / a).abs()
    } else if c.abs() > 0.0 {
        (a / c).abs()
    } else {
        0.0
    };
    if ratio >= NO_DOMINANT_AXIS_RATIO {
        return None;
    }

    let major = (2.0 * b).atan2(a - c) / 2.0;
    let to_y = {
        let angle = PI / 2.0 - major;
        if ((angle.abs()) - PI).abs() < VERTICAL_SNAP {
            0.0
        } else {
            angle
        }
    };

    Some(match axis {
        AlignAxis::Y => to_y,
        AlignAxis::X => -major,
    })
}
