//! # Platepack Core
//!
//! Geometry kernel and shared types for the platepack bed arranger.
//!
//! ## Core Components
//!
//! - **Polygon kernel**: [`geometry`] - area, winding, convex hull, containment,
//!   convex offsets, boolean union
//! - **Predicates**: [`robust`] - exact orientation tests
//! - **NFP primitives**: [`nfp`] - convex Minkowski sums and inner-fit rectangles
//! - **Rotation search**: [`rotcalipers`] - minimum-area and fit-into-box rotations
//! - **Transform types**: [`Transform2D`], [`AABB2D`]
//! - **Run summary**: [`ArrangeSummary`]
//!
//! ```rust
//! use platepack_core::geometry::{convex_hull, offset_convex};
//!
//! let outline = vec![(0.0, 0.0), (20.0, 0.0), (20.0, 10.0), (10.0, 10.0), (10.0, 20.0), (0.0, 20.0)];
//! let hull = convex_hull(&outline).unwrap();
//! let inflated = offset_convex(&hull, 1.5).unwrap();
//! assert!(inflated.len() > hull.len());
//! ```
//!
//! ## Feature Flags
//!
//! - `serde`: Enable serialization/deserialization support

pub mod error;
pub mod geometry;
pub mod nfp;
pub mod result;
pub mod robust;
pub mod rotcalipers;
pub mod transform;

// Re-exports
pub use error::{Error, Result};
pub use geometry::{Point, EPSILON};
pub use result::ArrangeSummary;
pub use transform::{Transform2D, AABB2D};
