//! Clearance and bed-shrink calculation.
//!
//! These helpers run before [`arrange`](crate::arrange::arrange). They turn
//! print settings (brim, skirt, tree support, sequential-print clearance)
//! into a per-item `inflation` and a bed shrink on each axis.

use crate::arrange::ArrangePolygon;
use crate::axis_align::{principal_axis_rotation, AlignAxis};
use crate::params::ArrangeParams;
use platepack_core::geometry::{area, bounding_box, rotate_polygon, Point, EPSILON};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Outer diameter of the largest nozzle the clearance model accounts for.
pub const MAX_OUTER_NOZZLE_DIAMETER: f64 = 4.0;

/// Added to sequential-print distances so equal clearances never touch.
pub const SEQUENTIAL_DISTANCE_MARGIN: f64 = 0.001;

/// Outlines below this area (mm²) cannot be printed.
pub const MIN_PRINTABLE_AREA: f64 = 0.001;

/// Print settings that influence clearances but are not arrangement options.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct BedConfig {
    /// Bed outline points.
    pub outline: Vec<Point>,
    pub skirt_loops: u32,
    /// Gap between the part (or its brim) and the first skirt loop.
    pub skirt_distance: f64,
    /// Extrusion width of one skirt loop.
    pub skirt_line_width: f64,
    /// Largest tree-support branch diameter.
    pub tree_support_branch_diameter: f64,
}

impl Default for BedConfig {
    fn default() -> Self {
        Self {
            outline: Vec::new(),
            skirt_loops: 0,
            skirt_distance: 0.0,
            skirt_line_width: 0.4,
            tree_support_branch_diameter: 5.0,
        }
    }
}

impl BedConfig {
    pub fn new(outline: Vec<Point>) -> Self {
        Self {
            outline,
            ..Self::default()
        }
    }

    pub fn with_skirt(mut self, loops: u32, distance: f64, line_width: f64) -> Self {
        self.skirt_loops = loops;
        self.skirt_distance = distance;
        self.skirt_line_width = line_width;
        self
    }

    pub fn with_tree_support_branch_diameter(mut self, diameter: f64) -> Self {
        self.tree_support_branch_diameter = diameter;
        self
    }
}

/// Room the skirt takes around the parts. Zero without skirt loops.
pub fn real_skirt_distance(bed: &BedConfig) -> f64 {
    if bed.skirt_loops == 0 {
        0.0
    } else {
        bed.skirt_distance + bed.skirt_loops as f64 * bed.skirt_line_width
    }
}

/// Moves every bed point toward the bed center by the configured shrink.
pub fn shrink_bed_points(bed: &[Point], params: &ArrangeParams) -> Vec<Point> {
    let Some(bb) = bounding_box(bed) else {
        return bed.to_vec();
    };
    let (cx, cy) = bb.center();
    let step = |v: f64, c: f64, shrink: f64| {
        if v < c {
            (v + shrink).min(c)
        } else if v > c {
            (v - shrink).max(c)
        } else {
            v
        }
    };
    bed.iter()
        .map(|&(x, y)| {
            (
                step(x, cx, params.bed_shrink_x),
                step(y, cy, params.bed_shrink_y),
            )
        })
        .collect()
}

/// Derives skirt distance, bed shrink and the sequential minimum distance.
pub fn update_arrange_params(
    params: &mut ArrangeParams,
    bed: &BedConfig,
    selected: &[ArrangePolygon],
) {
    params.brim_skirt_distance = real_skirt_distance(bed);
    params.bed_shrink_x += params.brim_skirt_distance;
    params.bed_shrink_y += params.brim_skirt_distance;

    if params.is_seq_print {
        let rod = params.clearance_height_to_rod;
        params.all_objects_are_short =
            rod <= 0.0 || selected.iter().all(|ap| ap.height < rod);

        let required = if params.all_objects_are_short {
            (MAX_OUTER_NOZZLE_DIAMETER / 2.0).max(2.0 * params.object_skirt_offset)
        } else {
            params.clearance_radius
        } + SEQUENTIAL_DISTANCE_MARGIN;
        params.min_obj_distance = params.min_obj_distance.max(required);

        params.bed_shrink_x += params.clearance_radius / 2.0;
        params.bed_shrink_y += params.clearance_radius / 2.0;
    }

    log::debug!(
        "bed shrink ({:.3}, {:.3}), min distance {:.3}",
        params.bed_shrink_x,
        params.bed_shrink_y,
        params.min_obj_distance
    );
}

/// Inflation for the parts being arranged.
///
/// An explicit minimum distance wins. Otherwise, if any part uses tree
/// support, every part gets half the widest of the branch diameter and the
/// brims; else each part keeps its own brim. The result is capped so an
/// inflated part still fits the shrunk bed.
pub fn update_selected_items_inflation(
    items: &mut [ArrangePolygon],
    bed: &BedConfig,
    params: &ArrangeParams,
) {
    let has_tree_support = items.iter().any(|ap| ap.has_tree_support);
    let mut brim_max = items.iter().map(|ap| ap.brim_width).fold(0.0, f64::max);
    if has_tree_support {
        brim_max = brim_max.max(bed.tree_support_branch_diameter);
    }

    let bed_bb = bounding_box(&shrink_bed_points(&bed.outline, params));

    for ap in items.iter_mut() {
        let mut inflation = if params.min_obj_distance != 0.0 {
            params.min_obj_distance / 2.0
        } else if has_tree_support {
            brim_max / 2.0
        } else {
            ap.brim_width
        };

        if let (Some(bed_bb), Some(item_bb)) = (bed_bb, bounding_box(&ap.placed_outline())) {
            let diffx = bed_bb.width() - item_bb.width() - EPSILON;
            let diffy = bed_bb.height() - item_bb.height() - EPSILON;
            if diffx > 0.0 && diffy > 0.0 {
                inflation = inflation.min(diffx.min(diffy) / 2.0);
            }
        }
        ap.inflation = inflation;
    }
}

/// Inflation for parts and regions that stay where they are.
///
/// Real parts get the same gap as movable ones. Virtual regions get a
/// margin that grows with the sequential-print clearance, except extrusion
/// calibration regions which may be printed over.
pub fn update_unselected_items_inflation(unselected: &mut [ArrangePolygon], params: &ArrangeParams) {
    let exclusion_gap = if params.is_seq_print {
        (params.clearance_radius / 2.0 + params.bed_shrink_x + 1.0).max(1.0)
    } else {
        1.0
    };

    for ap in unselected.iter_mut() {
        ap.inflation = if ap.is_virt_object {
            if ap.is_extrusion_cali_object {
                0.0
            } else {
                exclusion_gap
            }
        } else if params.min_obj_distance != 0.0 {
            params.min_obj_distance / 2.0
        } else {
            ap.brim_width
        };
    }
}

/// Pre-rotates elongated parts along the configured axis.
///
/// `align_to_y_axis` turns long sides onto Y; otherwise sequential printing
/// turns them onto X. Nothing happens in other modes, or for parts without a
/// dominant axis.
pub fn update_selected_items_axis_align(items: &mut [ArrangePolygon], params: &ArrangeParams) {
    let axis = if params.align_to_y_axis {
        AlignAxis::Y
    } else if params.is_seq_print {
        AlignAxis::X
    } else {
        return;
    };

    for ap in items.iter_mut() {
        let outline = rotate_polygon(&ap.poly, ap.rotation);
        if let Some(angle) = principal_axis_rotation(&outline, axis) {
            ap.rotation += angle;
        }
    }
}

/// True when a part cannot be printed on this bed at all.
pub fn check_unprintable(ap: &ArrangePolygon, params: &ArrangeParams) -> bool {
    let too_small = area(&ap.poly) < MIN_PRINTABLE_AREA;
    let too_tall = params.printable_height > 0.0 && ap.height > params.printable_height;
    if too_small || too_tall {
        log::info!(
            "{} is unprintable (area {:.4}, height {:.2})",
            ap.display_name(),
            area(&ap.poly),
            ap.height
        );
    }
    too_small || too_tall
}
