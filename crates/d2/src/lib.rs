//! # Platepack 2D
//!
//! Arrangement controller and placement scorer for 3D-print beds.
//!
//! Parts are packed onto one or more beds by an NFP-based Placer. The
//! controller decides the search order, the candidate rotations and the
//! alignment; the scorer ranks every candidate position with manufacturing
//! rules in mind (sequential-print clearance, temperatures, materials).
//!
//! ## Features
//!
//! - Box, circle, polygon and unbounded beds
//! - Multi-bed first-fit with shared exclusion regions
//! - Sequential and batch printing rules
//! - Brim, skirt and tree-support aware clearances
//! - Parallel candidate scoring
//!
//! ## Quick Start
//!
//! ```rust
//! use platepack_d2::{arrange, ArrangeParams, ArrangePolygon};
//!
//! let bed = vec![(0.0, 0.0), (200.0, 0.0), (200.0, 200.0), (0.0, 200.0)];
//! let mut parts: Vec<ArrangePolygon> = (0..4)
//!     .map(|i| ArrangePolygon::rectangle(40.0, 30.0).with_name(format!("part {}", i)))
//!     .collect();
//!
//! let params = ArrangeParams::new().with_min_obj_distance(6.0);
//! let summary = arrange(&mut parts, &[], &bed, &params);
//!
//! assert!(summary.all_placed());
//! assert!(parts.iter().all(|p| p.bed_index == Some(0)));
//! ```
//!
//! ## Print-aware clearances
//!
//! ```rust
//! use platepack_d2::inflation::{update_arrange_params, update_selected_items_inflation, BedConfig};
//! use platepack_d2::{arrange, ArrangeParams, ArrangePolygon};
//!
//! let outline = vec![(0.0, 0.0), (250.0, 0.0), (250.0, 250.0), (0.0, 250.0)];
//! let bed = BedConfig::new(outline.clone()).with_skirt(1, 2.0, 0.4);
//! let mut parts = vec![
//!     ArrangePolygon::rectangle(30.0, 30.0).with_brim(5.0).with_height(40.0),
//!     ArrangePolygon::rectangle(20.0, 50.0).with_height(10.0),
//! ];
//!
//! let mut params = ArrangeParams::new()
//!     .with_seq_print(true)
//!     .with_clearance(35.0, 25.0, 120.0);
//! update_arrange_params(&mut params, &bed, &parts);
//! update_selected_items_inflation(&mut parts, &bed, &params);
//!
//! let summary = arrange(&mut parts, &[], &outline, &params);
//! assert_eq!(summary.placed, 2);
//! ```

pub mod arrange;
pub mod axis_align;
pub mod bin;
pub mod controller;
pub mod inflation;
pub mod item;
pub mod nfp_placer;
pub mod params;
pub mod pile;
pub mod placer;
pub mod scorer;
pub mod spatial_index;

// Re-exports
pub use arrange::{arrange, ArrangePolygon};
pub use axis_align::{principal_axis_rotation, AlignAxis};
pub use bin::{Bin, BinKind};
pub use controller::{ArrangeController, ControllerState};
pub use inflation::BedConfig;
pub use item::{FilamentTempType, Item, ItemId};
pub use nfp_placer::NfpPlacer;
pub use params::{ArrangeCallbacks, ArrangeParams};
pub use pile::PileState;
pub use placer::{Alignment, PackContext, PlacementConfig, Placer, LARGE_COST_TO_REJECT};
pub use scorer::{ScoreWeights, Scorer};
pub use platepack_core::{ArrangeSummary, Error, Result, Transform2D, AABB2D};
