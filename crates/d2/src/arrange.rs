//! Entry point and caller records.
//!
//! [`arrange`] converts the caller's [`ArrangePolygon`] records into items,
//! runs the [`ArrangeController`] on the bed described by an outline, and
//! writes translation, rotation, bed index and sequence back into the records.
//! It never fails: items that cannot be placed come back with
//! `bed_index == None` and are listed in the returned summary.

use crate::bin::Bin;
use crate::controller::ArrangeController;
use crate::inflation::{check_unprintable, shrink_bed_points};
use crate::item::{FilamentTempType, Item, ItemId};
use crate::params::ArrangeParams;
use platepack_core::geometry::{rotate_polygon, Point, EPSILON};
use platepack_core::{ArrangeSummary, Result};
use std::collections::BTreeSet;
use std::sync::Arc;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Inflation change applied to fixed items and regions so parts may touch
/// their boundary.
pub const FIXED_ITEM_SHRINK: f64 = 2.0 * EPSILON;

/// One part (or region) as the caller sees it.
///
/// `translation`, `rotation`, `bed_index` and `item_id` are written by
/// [`arrange`]; everything else is read-only input.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ArrangePolygon {
    /// Footprint in local coordinates.
    pub poly: Vec<Point>,
    pub translation: Point,
    pub rotation: f64,
    /// Assigned bed, `None` when unplaced. On fixed items, the bed they occupy.
    pub bed_index: Option<usize>,
    /// Placement sequence, `-1` until placed.
    pub item_id: i64,
    pub priority: i32,
    pub extrude_ids: BTreeSet<i32>,
    pub height: f64,
    pub bed_temp: f64,
    pub print_temp: f64,
    pub vitrify_temp: f64,
    pub temp_type: FilamentTempType,
    pub brim_width: f64,
    pub has_tree_support: bool,
    pub is_virt_object: bool,
    pub is_wipe_tower: bool,
    pub is_extrusion_cali_object: bool,
    /// Clearance grown around the footprint while placing.
    pub inflation: f64,
    pub name: String,
}

impl Default for ArrangePolygon {
    fn default() -> Self {
        Self {
            poly: Vec::new(),
            translation: (0.0, 0.0),
            rotation: 0.0,
            bed_index: None,
            item_id: -1,
            priority: 0,
            extrude_ids: BTreeSet::new(),
            height: 0.0,
            bed_temp: 0.0,
            print_temp: 0.0,
            vitrify_temp: 0.0,
            temp_type: FilamentTempType::Undefined,
            brim_width: 0.0,
            has_tree_support: false,
            is_virt_object: false,
            is_wipe_tower: false,
            is_extrusion_cali_object: false,
            inflation: 0.0,
            name: String::new(),
        }
    }
}

impl ArrangePolygon {
    pub fn new(poly: Vec<Point>) -> Self {
        Self {
            poly,
            ..Self::default()
        }
    }

    /// Axis-aligned rectangle with its min corner at the local origin.
    pub fn rectangle(width: f64, height: f64) -> Self {
        Self::new(vec![(0.0, 0.0), (width, 0.0), (width, height), (0.0, height)])
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_height(mut self, height: f64) -> Self {
        self.height = height;
        self
    }

    pub fn with_brim(mut self, width: f64) -> Self {
        self.brim_width = width;
        self
    }

    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_extruders<I: IntoIterator<Item = i32>>(mut self, ids: I) -> Self {
        self.extrude_ids = ids.into_iter().collect();
        self
    }

    /// Sets bed, print and vitrification temperatures.
    pub fn with_temperatures(mut self, bed: f64, print: f64, vitrify: f64) -> Self {
        self.bed_temp = bed;
        self.print_temp = print;
        self.vitrify_temp = vitrify;
        self
    }

    pub fn with_temp_type(mut self, temp_type: FilamentTempType) -> Self {
        self.temp_type = temp_type;
        self
    }

    pub fn with_tree_support(mut self, enabled: bool) -> Self {
        self.has_tree_support = enabled;
        self
    }

    pub fn with_translation(mut self, x: f64, y: f64) -> Self {
        self.translation = (x, y);
        self
    }

    pub fn with_rotation(mut self, rotation: f64) -> Self {
        self.rotation = rotation;
        self
    }

    pub fn with_inflation(mut self, inflation: f64) -> Self {
        self.inflation = inflation;
        self
    }

    /// Places a fixed item on `bed`.
    pub fn fixed_on(mut self, bed: usize) -> Self {
        self.bed_index = Some(bed);
        self
    }

    pub fn as_virtual(mut self) -> Self {
        self.is_virt_object = true;
        self
    }

    pub fn as_extrusion_cali(mut self) -> Self {
        self.is_extrusion_cali_object = true;
        self
    }

    pub fn as_wipe_tower(mut self) -> Self {
        self.is_wipe_tower = true;
        self.is_virt_object = true;
        self
    }

    /// Footprint with the current rotation applied, before translation.
    pub fn placed_outline(&self) -> Vec<Point> {
        rotate_polygon(&self.poly, self.rotation)
    }

    /// Footprint on the bed.
    pub fn transformed_outline(&self) -> Vec<Point> {
        self.placed_outline()
            .into_iter()
            .map(|(x, y)| (x + self.translation.0, y + self.translation.1))
            .collect()
    }

    pub fn is_placed(&self) -> bool {
        self.bed_index.is_some()
    }

    /// Name for log messages.
    pub fn display_name(&self) -> String {
        if self.name.is_empty() {
            format!("part #{}", self.item_id)
        } else {
            self.name.clone()
        }
    }

    fn to_item(&self, inflation: f64) -> Result<Item> {
        let mut item = Item::new(&self.poly)?
            .with_rotation(self.rotation)
            .with_translation(self.translation.0, self.translation.1)
            .with_priority(self.priority)
            .with_height(self.height)
            .with_bed_temp(self.bed_temp)
            .with_temp_type(self.temp_type)
            .with_extruders(self.extrude_ids.iter().copied())
            .with_inflation(inflation);
        item.print_temp = self.print_temp;
        item.vitrify_temp = self.vitrify_temp;
        item.is_virtual = self.is_virt_object || self.is_wipe_tower;
        item.is_wipe_tower = self.is_wipe_tower;
        item.is_extrusion_cali = self.is_extrusion_cali_object;
        Ok(item)
    }
}

/// Arranges `items` on the bed described by `bed`.
///
/// `excludes` are parts and regions that stay where they are; each occupies
/// its own `bed_index` (bed 0 when unset). The regions in
/// `params.excluded_regions` and, when `avoid_extrusion_cali_region` is set,
/// `params.nonpreferred_regions` block the same area on every bed.
///
/// Inflation comes from each record (see the [`inflation`](crate::inflation)
/// helpers); a record without one gets half of `min_obj_distance`.
pub fn arrange(
    items: &mut [ArrangePolygon],
    excludes: &[ArrangePolygon],
    bed: &[Point],
    params: &ArrangeParams,
) -> ArrangeSummary {
    let bin = Bin::from_outline(&shrink_bed_points(bed, params));
    log::debug!("arranging {} items on a {:?} bed", items.len(), bin.kind());

    let mut run_params = params.clone();
    run_params.min_obj_distance = 0.0;
    run_params.callbacks.on_packed = None;

    let mut controller = ArrangeController::new(bin, run_params);
    if let Some(on_packed) = params.callbacks.on_packed.clone() {
        let records: Arc<Vec<ArrangePolygon>> = Arc::new(items.to_vec());
        controller = controller.with_packed_hook(Arc::new(move |item: &Item| {
            let Some(record) = item.source.and_then(|idx| records.get(idx)) else {
                return;
            };
            let mut record = record.clone();
            write_back(&mut record, item);
            on_packed(&record);
        }));
    }

    let default_inflation = params.min_obj_distance / 2.0;
    let mut handles: Vec<Option<ItemId>> = vec![None; items.len()];
    let mut rejected = Vec::new();
    for (idx, ap) in items.iter().enumerate() {
        if check_unprintable(ap, params) {
            rejected.push(idx);
            continue;
        }
        let inflation = if ap.inflation != 0.0 {
            ap.inflation
        } else {
            default_inflation
        };
        match ap.to_item(inflation) {
            Ok(mut item) => {
                item.source = Some(idx);
                if item.is_wipe_tower {
                    item.priority += 1;
                }
                handles[idx] = Some(controller.add_item(item));
            }
            Err(e) => {
                log::warn!("{} skipped: {}", ap.display_name(), e);
                rejected.push(idx);
            }
        }
    }

    for ap in excludes {
        match ap.to_item(ap.inflation - FIXED_ITEM_SHRINK) {
            Ok(mut item) => {
                item.bin_id = Some(ap.bed_index.unwrap_or(0));
                controller.add_fixed(item);
            }
            Err(e) => log::warn!("fixed {} ignored: {}", ap.display_name(), e),
        }
    }

    let mut regions: Vec<&ArrangePolygon> = params.excluded_regions.iter().collect();
    if params.avoid_extrusion_cali_region {
        regions.extend(params.nonpreferred_regions.iter());
    }
    for ap in regions {
        match ap.to_item(ap.inflation - FIXED_ITEM_SHRINK) {
            Ok(item) => {
                controller.add_region(item);
            }
            Err(e) => log::warn!("region {} ignored: {}", ap.display_name(), e),
        }
    }

    let mut summary = controller.run();

    for (ap, handle) in items.iter_mut().zip(&handles) {
        match handle.and_then(|id| controller.item(id)) {
            Some(item) => write_back(ap, item),
            None => {
                ap.bed_index = None;
                ap.item_id = -1;
            }
        }
        ap.inflation = 0.0;
    }

    for idx in rejected {
        summary.mark_unplaced(idx);
    }
    summary.unplaced.sort_unstable();
    summary
}

fn write_back(ap: &mut ArrangePolygon, item: &Item) {
    ap.translation = item.translation;
    ap.rotation = item.rotation();
    ap.bed_index = item.bin_id;
    ap.item_id = if item.bin_id.is_some() { item.sequence } else { -1 };
    ap.priority = item.priority;
}
