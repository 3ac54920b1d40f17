//! Arrangement controller.
//!
//! Owns the item arena for one run and walks it through
//! `Init → Configure → PreloadFixed → RotateSearch → Pack → ExtractResults → Done`.
//! The Placer does the searching; the controller decides what it searches
//! with (sort order, rotations, alignment, objective) and cleans up after it.

use crate::bin::Bin;
use crate::item::{Item, ItemId};
use crate::nfp_placer::{NfpPlacer, PLACEMENT_TOLERANCE};
use crate::params::ArrangeParams;
use crate::pile::PileState;
use crate::placer::{
    Alignment, BeforePackingFn, ObjectiveFn, PackContext, PackedFn, PlacementConfig, Placer,
    SortFn,
};
use crate::scorer::Scorer;
use platepack_core::nfp::inner_fit_rect;
use platepack_core::rotcalipers::{fit_into_box_rotation, min_area_rect_rotation};
use platepack_core::ArrangeSummary;
use std::f64::consts::PI;
use std::sync::Arc;
use std::time::Instant;

/// Where a run currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControllerState {
    Init,
    Configure,
    PreloadFixed,
    RotateSearch,
    Pack,
    ExtractResults,
    Done,
}

/// Try-order of the Placer.
///
/// Priority first, then hotter beds, then (sequential) shorter parts or
/// (batch) lower first extruder, then bigger parts. Equal keys keep their
/// input order.
pub fn sort_function(is_seq_print: bool) -> SortFn {
    Arc::new(move |a: &Item, b: &Item| {
        b.priority
            .cmp(&a.priority)
            .then_with(|| b.bed_temp.total_cmp(&a.bed_temp))
            .then_with(|| {
                if is_seq_print {
                    a.height.total_cmp(&b.height)
                } else {
                    a.first_extruder().cmp(&b.first_extruder())
                }
            })
            .then_with(|| b.area().total_cmp(&a.area()))
    })
}

/// Drives one arrangement run over an item arena.
pub struct ArrangeController {
    bin: Bin,
    params: ArrangeParams,
    items: Vec<Item>,
    movable: Vec<ItemId>,
    fixed: Vec<ItemId>,
    regions: Vec<ItemId>,
    /// Movable items dropped before packing.
    skipped: usize,
    packed_hook: Option<PackedFn>,
    state: ControllerState,
}

impl ArrangeController {
    pub fn new(bin: Bin, params: ArrangeParams) -> Self {
        Self {
            bin,
            params,
            items: Vec::new(),
            movable: Vec::new(),
            fixed: Vec::new(),
            regions: Vec::new(),
            skipped: 0,
            packed_hook: None,
            state: ControllerState::Init,
        }
    }

    /// Called with every item the Placer commits.
    pub fn with_packed_hook(mut self, hook: PackedFn) -> Self {
        self.packed_hook = Some(hook);
        self
    }

    /// Adds an item the Placer may move.
    pub fn add_item(&mut self, mut item: Item) -> ItemId {
        let id = ItemId(self.items.len());
        item.fixed = false;
        item.bin_id = None;
        self.items.push(item);
        self.movable.push(id);
        id
    }

    /// Adds a static obstacle on its own bed (bed 0 when unset).
    pub fn add_fixed(&mut self, mut item: Item) -> ItemId {
        let id = ItemId(self.items.len());
        item.fixed = true;
        item.bin_id = Some(item.bin_id.unwrap_or(0));
        self.items.push(item);
        self.fixed.push(id);
        id
    }

    /// Adds a region that blocks the same area on every bed.
    pub fn add_region(&mut self, mut item: Item) -> ItemId {
        let id = ItemId(self.items.len());
        item.fixed = true;
        item.is_virtual = true;
        item.bin_id = Some(0);
        self.items.push(item);
        self.regions.push(id);
        id
    }

    pub fn bin(&self) -> &Bin {
        &self.bin
    }

    pub fn items(&self) -> &[Item] {
        &self.items
    }

    pub fn item(&self, id: ItemId) -> Option<&Item> {
        self.items.get(id.0)
    }

    pub fn state(&self) -> ControllerState {
        self.state
    }

    /// Runs with the default [`NfpPlacer`].
    pub fn run(&mut self) -> ArrangeSummary {
        let mut placer = NfpPlacer::new(self.bin.clone());
        self.run_with(&mut placer)
    }

    /// Runs with a caller-supplied Placer.
    pub fn run_with<P: Placer<PileState>>(&mut self, placer: &mut P) -> ArrangeSummary {
        let start = Instant::now();

        self.state = ControllerState::Configure;
        let rotations = self.rotation_candidates();

        self.state = ControllerState::PreloadFixed;
        self.preload();

        self.state = ControllerState::RotateSearch;
        if self.params.allow_rotations && !self.params.is_seq_print {
            self.rotate_search();
        }
        let packable = self.remove_large_items(&rotations);

        self.state = ControllerState::Pack;
        // Built after preload so the scorer only counts items that take part.
        let config = self.configure().with_shared_obstacles(self.regions.clone());
        log::debug!(
            "configured: start {:?}, alignment {:?}, {} rotations, bed {:?}",
            config.starting_point,
            config.alignment,
            config.rotations.len(),
            self.bin.kind()
        );
        placer.configure(config);
        if let Some(f) = &self.params.callbacks.progress {
            placer.progress_indicator(Arc::clone(f));
        }
        if let Some(f) = &self.params.callbacks.stop_condition {
            placer.stop_condition(Arc::clone(f));
        }
        if let Some(f) = &self.params.callbacks.unfit {
            placer.unfit_indicator(Arc::clone(f));
        }
        if let Some(f) = &self.packed_hook {
            placer.packed_indicator(Arc::clone(f));
        }
        let beds_used = placer.execute(&mut self.items, &packable);

        self.state = ControllerState::ExtractResults;
        for item in &mut self.items {
            if item.inflation() != 0.0 {
                item.set_inflation(0.0);
            }
        }

        let mut summary = ArrangeSummary::new();
        for &id in &self.movable {
            let item = &self.items[id.0];
            if item.bin_id.is_some() {
                summary.placed += 1;
            } else {
                summary.mark_unplaced(item.source.unwrap_or(id.0));
            }
        }
        summary.beds_used = beds_used;
        summary.cancelled = placer.was_stopped();
        summary.computation_time_ms = start.elapsed().as_millis() as u64;

        log::info!(
            "arranged {} of {} items on {} beds in {} ms",
            summary.placed,
            self.movable.len(),
            summary.beds_used,
            summary.computation_time_ms
        );
        self.state = ControllerState::Done;
        summary
    }

    /// Rotations tried for every item, relative to its start rotation.
    pub fn rotation_candidates(&self) -> Vec<f64> {
        if self.params.allow_rotations {
            vec![0.0, PI / 4.0, PI / 2.0, 3.0 * PI / 4.0]
        } else {
            vec![0.0]
        }
    }

    /// Number of items the scorer weighs the pile progress against.
    pub fn active_item_count(&self) -> usize {
        self.movable.len() - self.skipped + self.fixed.len() + self.regions.len()
    }

    /// Builds the placement configuration and the objective for this run.
    pub fn configure(&self) -> PlacementConfig<PileState> {
        let params = &self.params;
        let bin_bb = self.bin.bounding_box();

        let starting_point = if !self.bin.is_bounded() {
            Alignment::Center
        } else if params.is_seq_print {
            Alignment::BottomLeft
        } else {
            Alignment::TopRight
        };

        let has_obstacles = !self.fixed.is_empty() || !self.regions.is_empty();
        let alignment = if params.is_seq_print || has_obstacles {
            Alignment::DontAlign
        } else if params.align_center {
            Alignment::Center
        } else {
            Alignment::UserDefined
        };
        let best_object_pos = (
            bin_bb.min_x + params.best_object_pos.0 * bin_bb.width(),
            bin_bb.min_y + params.best_object_pos.1 * bin_bb.height(),
        );

        let scorer = Arc::new(Scorer::new(
            &self.bin,
            params,
            starting_point,
            self.active_item_count(),
        ));
        let before_packing: BeforePackingFn<PileState> = {
            let scorer = Arc::clone(&scorer);
            Arc::new(move |ctx: &PackContext<'_>| scorer.snapshot(ctx))
        };
        let objective: ObjectiveFn<PileState> =
            Arc::new(move |item: &Item, pile: &PileState| scorer.score(item, pile));

        PlacementConfig::new(before_packing, objective)
            .with_rotations(self.rotation_candidates())
            .with_alignment(alignment)
            .with_starting_point(starting_point)
            .with_best_object_pos(best_object_pos)
            .with_accuracy(params.accuracy)
            .with_parallel(params.parallel)
            .with_sort_function(sort_function(params.is_seq_print))
    }

    /// Drops obstacles that are not on the bed and pins the rest.
    fn preload(&mut self) {
        let bin = &self.bin;
        let items = &mut self.items;
        let mut dropped = 0usize;
        let mut keep = |id: &ItemId| {
            let item = &mut items[id.0];
            if bin.contains(&item.transformed_footprint(), PLACEMENT_TOLERANCE) {
                true
            } else {
                item.fixed = false;
                item.bin_id = None;
                dropped += 1;
                false
            }
        };
        self.fixed.retain(&mut keep);
        self.regions.retain(&mut keep);

        if dropped > 0 {
            log::warn!("{} fixed items lie outside the bed and were ignored", dropped);
        }
        log::debug!(
            "preloaded {} fixed items and {} regions",
            self.fixed.len(),
            self.regions.len()
        );
    }

    /// Starts every movable item at its minimum-area rotation, turning items
    /// that still overflow a box bed to their best-fitting rotation.
    fn rotate_search(&mut self) {
        let bin_bb = self.bin.bounding_box();
        let is_box = matches!(self.bin, Bin::Box(_));
        for &id in &self.movable {
            let item = &mut self.items[id.0];
            match min_area_rect_rotation(item.hull()) {
                Ok(r) => item.set_rotation(r),
                Err(e) => {
                    log::debug!("item {}: keeping rotation ({})", id.0, e);
                    continue;
                }
            }

            if !is_box {
                continue;
            }
            let bb = item.local_bounding_box();
            if bb.width() >= bin_bb.width() || bb.height() >= bin_bb.height() {
                match fit_into_box_rotation(item.local_outline(), bin_bb.width(), bin_bb.height()) {
                    Ok(r) => item.rotate(r),
                    Err(e) => log::debug!("item {}: no fitting rotation ({})", id.0, e),
                }
            }
        }
    }

    /// Movable items that fit the bed alone in at least one rotation.
    fn remove_large_items(&mut self, rotations: &[f64]) -> Vec<ItemId> {
        let bin_bb = self.bin.bounding_box();
        let mut packable = Vec::with_capacity(self.movable.len());
        for &id in &self.movable {
            let item = &self.items[id.0];
            let fits = rotations.iter().any(|&r| {
                let mut trial = item.clone();
                if r != 0.0 {
                    trial.rotate(r);
                }
                inner_fit_rect(&bin_bb, &trial.local_bounding_box(), PLACEMENT_TOLERANCE)
                    .is_some()
            });
            if fits {
                packable.push(id);
            } else {
                log::info!("item {} is larger than the bed and was skipped", id.0);
            }
        }
        self.skipped = self.movable.len() - packable.len();
        packable
    }
}
