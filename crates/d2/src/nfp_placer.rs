//! First-fit NFP placer.
//!
//! For each item, in sort order, beds are tried from the first one. On a bed
//! the candidate reference points are:
//!
//! - corners and center of the inner-fit rectangle (IFR)
//! - vertices of every no-fit polygon (NFP) against placed items, clamped into the IFR
//! - interior samples along NFP edges, denser with higher accuracy
//! - a coarse grid over the IFR on bounded beds
//!
//! A candidate is feasible when it lies in the IFR, is not strictly inside any
//! NFP and, on circular or polygonal beds, keeps the outline on the bed. The
//! feasible candidate with the lowest score wins; ties go to the earlier
//! candidate. When no bed accepts the item a fresh bed is tried, and failing
//! that the item is left unplaced.

use crate::bin::Bin;
use crate::item::{Item, ItemId};
use crate::placer::{
    Alignment, PackContext, PackedFn, PlacementConfig, Placer, ProgressFn, StopFn, UnfitFn,
    LARGE_COST_TO_REJECT,
};
use platepack_core::geometry::{
    convex_polygons_overlap, point_strictly_inside, translate_polygon, Point, EPSILON,
};
use platepack_core::nfp::{inner_fit_rect, nfp_convex, sample_edges};
use platepack_core::AABB2D;
use rayon::prelude::*;

/// Distance below which outlines count as touching rather than overlapping.
pub const PLACEMENT_TOLERANCE: f64 = EPSILON;

/// Grid resolution per axis at full accuracy.
const MAX_GRID_CELLS: usize = 32;
const MIN_GRID_CELLS: usize = 4;

/// One rotation of the item being placed, with its feasibility data.
struct Variant {
    item: Item,
    ifr: AABB2D,
    nfps: Vec<Vec<Point>>,
}

struct Candidate {
    variant: usize,
    translation: Point,
}

/// The default [`Placer`].
pub struct NfpPlacer<S> {
    bin: Bin,
    config: Option<PlacementConfig<S>>,
    progress: Option<ProgressFn>,
    stop: Option<StopFn>,
    unfit: Option<UnfitFn>,
    packed: Option<PackedFn>,
    result: Vec<Vec<ItemId>>,
    last_bin: Option<usize>,
    stopped: bool,
    next_sequence: i64,
}

impl<S> NfpPlacer<S> {
    pub fn new(bin: Bin) -> Self {
        Self {
            bin,
            config: None,
            progress: None,
            stop: None,
            unfit: None,
            packed: None,
            result: Vec::new(),
            last_bin: None,
            stopped: false,
            next_sequence: 0,
        }
    }

    pub fn bin(&self) -> &Bin {
        &self.bin
    }

    fn should_stop(&self) -> bool {
        self.stop.as_ref().map(|f| f()).unwrap_or(false)
    }

    fn candidate_points(
        &self,
        ifr: &AABB2D,
        nfps: &[Vec<Point>],
        config: &PlacementConfig<S>,
    ) -> Vec<Point> {
        let clamp = |(x, y): Point| {
            (
                x.clamp(ifr.min_x, ifr.max_x),
                y.clamp(ifr.min_y, ifr.max_y),
            )
        };

        let mut points = vec![
            ifr.min_corner(),
            ifr.bottom_right(),
            ifr.max_corner(),
            ifr.top_left(),
            ifr.center(),
        ];

        let per_edge = (config.accuracy * 3.0).round() as usize;
        for nfp in nfps {
            points.extend(nfp.iter().map(|&p| clamp(p)));
            points.extend(sample_edges(nfp, per_edge).into_iter().map(clamp));
        }

        if self.bin.is_bounded() {
            let cells = MIN_GRID_CELLS
                + ((MAX_GRID_CELLS - MIN_GRID_CELLS) as f64 * config.accuracy).round() as usize;
            let (w, h) = (ifr.width(), ifr.height());
            for i in 0..=cells {
                for j in 0..=cells {
                    let fx = i as f64 / cells as f64;
                    let fy = j as f64 / cells as f64;
                    points.push((ifr.min_x + w * fx, ifr.min_y + h * fy));
                }
            }
        }

        points
    }

    /// Finds the best rotation and translation for `id` against `placed`.
    fn search(
        &self,
        items: &[Item],
        id: ItemId,
        placed: &[ItemId],
        snapshot: &S,
        config: &PlacementConfig<S>,
    ) -> Option<(f64, Point)>
    where
        S: Sync,
    {
        let base = &items[id.0];
        let bin = &self.bin;
        let bin_bb = bin.bounding_box();
        let placed_shapes: Vec<Vec<Point>> = placed
            .iter()
            .map(|p| items[p.0].transformed_shape())
            .collect();

        let rotations: &[f64] = if config.rotations.is_empty() {
            &[0.0]
        } else {
            &config.rotations
        };

        let mut variants = Vec::with_capacity(rotations.len());
        let mut candidates = Vec::new();
        for &rotation in rotations {
            let mut trial = base.clone();
            if rotation != 0.0 {
                trial.set_rotation(base.rotation() + rotation);
            }
            let Some(ifr) =
                inner_fit_rect(&bin_bb, &trial.local_bounding_box(), PLACEMENT_TOLERANCE)
            else {
                continue;
            };
            let nfps: Vec<Vec<Point>> = placed_shapes
                .iter()
                .map(|shape| nfp_convex(shape, trial.local_outline()))
                .collect();

            let variant = variants.len();
            candidates.extend(
                self.candidate_points(&ifr, &nfps, config)
                    .into_iter()
                    .map(|translation| Candidate {
                        variant,
                        translation,
                    }),
            );
            variants.push(Variant {
                item: trial,
                ifr,
                nfps,
            });
        }

        if candidates.is_empty() {
            return None;
        }

        let exact_bed_check = matches!(bin, Bin::Circle { .. } | Bin::Polygon { .. });
        let objective = &config.object_function;
        let evaluate = |(index, candidate): (usize, &Candidate)| -> Option<(usize, f64)> {
            let variant = &variants[candidate.variant];
            let t = candidate.translation;
            if !variant.ifr.expand(PLACEMENT_TOLERANCE).contains_point(t) {
                return None;
            }
            if variant
                .nfps
                .iter()
                .any(|nfp| nfp.len() >= 3 && point_strictly_inside(t, nfp, PLACEMENT_TOLERANCE))
            {
                return None;
            }

            let mut trial = variant.item.clone();
            trial.translation = t;
            if exact_bed_check && !bin.contains(&trial.transformed_shape(), PLACEMENT_TOLERANCE) {
                return None;
            }

            let score = objective(&trial, snapshot);
            if !score.is_finite() || score >= LARGE_COST_TO_REJECT {
                return None;
            }
            Some((index, score))
        };

        let scored: Vec<(usize, f64)> = if config.parallel {
            candidates.par_iter().enumerate().filter_map(evaluate).collect()
        } else {
            candidates.iter().enumerate().filter_map(evaluate).collect()
        };

        scored
            .into_iter()
            .min_by(|a, b| a.1.total_cmp(&b.1).then(a.0.cmp(&b.0)))
            .map(|(index, _)| {
                let c = &candidates[index];
                (variants[c.variant].item.rotation(), c.translation)
            })
    }

    /// Moves the packed items of one bed as a group to the configured anchor.
    ///
    /// Skipped when the move would push an item off the bed or into an
    /// obstacle.
    fn align_bed(
        &self,
        items: &mut [Item],
        packed: &[ItemId],
        obstacles: &[ItemId],
        config: &PlacementConfig<S>,
    ) {
        let bin_bb = self.bin.bounding_box();
        let Some(target) = config.alignment.anchor(&bin_bb, config.best_object_pos) else {
            return;
        };
        let Some(pile_bb) = packed
            .iter()
            .filter(|id| !items[id.0].is_virtual)
            .map(|id| items[id.0].bounding_box())
            .reduce(|a, b| a.union(&b))
        else {
            return;
        };

        let own = match config.alignment {
            Alignment::UserDefined => pile_bb.center(),
            a => match a.anchor(&pile_bb, pile_bb.center()) {
                Some(p) => p,
                None => return,
            },
        };
        let (dx, dy) = (target.0 - own.0, target.1 - own.1);
        if dx.abs() <= f64::EPSILON && dy.abs() <= f64::EPSILON {
            return;
        }

        let obstacle_shapes: Vec<Vec<Point>> = obstacles
            .iter()
            .map(|id| items[id.0].transformed_shape())
            .collect();
        let valid = packed.iter().all(|id| {
            let moved = translate_polygon(&items[id.0].transformed_shape(), dx, dy);
            self.bin.contains(&moved, PLACEMENT_TOLERANCE)
                && !obstacle_shapes
                    .iter()
                    .any(|o| convex_polygons_overlap(&moved, o, PLACEMENT_TOLERANCE))
        });
        if !valid {
            log::debug!("final alignment skipped, pile would leave the bed or hit an obstacle");
            return;
        }

        for id in packed {
            let item = &mut items[id.0];
            item.translation = (item.translation.0 + dx, item.translation.1 + dy);
        }
    }
}

fn bed_contents(
    shared: &[ItemId],
    obstacles: &[Vec<ItemId>],
    packed: &[Vec<ItemId>],
    bin: usize,
) -> Vec<ItemId> {
    let mut placed = shared.to_vec();
    if let Some(fixed) = obstacles.get(bin) {
        placed.extend_from_slice(fixed);
    }
    if let Some(ids) = packed.get(bin) {
        placed.extend_from_slice(ids);
    }
    placed
}

impl<S: Send + Sync> Placer<S> for NfpPlacer<S> {
    fn configure(&mut self, config: PlacementConfig<S>) {
        self.config = Some(config);
    }

    fn execute(&mut self, items: &mut [Item], movable: &[ItemId]) -> usize {
        self.result.clear();
        self.last_bin = None;
        self.stopped = false;
        self.next_sequence = 0;

        let Some(config) = self.config.clone() else {
            log::warn!("placer executed without a configuration");
            return 0;
        };

        let mut order: Vec<ItemId> = movable
            .iter()
            .copied()
            .filter(|id| id.0 < items.len() && !items[id.0].fixed)
            .collect();
        if let Some(sort) = &config.sort_function {
            order.sort_by(|a, b| sort(&items[a.0], &items[b.0]));
        }

        let mut obstacles: Vec<Vec<ItemId>> = Vec::new();
        for (i, item) in items.iter().enumerate() {
            let id = ItemId(i);
            if !item.fixed || config.shared_obstacles.contains(&id) {
                continue;
            }
            if let Some(bin) = item.bin_id {
                if obstacles.len() <= bin {
                    obstacles.resize_with(bin + 1, Vec::new);
                }
                obstacles[bin].push(id);
            }
        }

        let mut open = obstacles.len().max(1);
        let mut packed: Vec<Vec<ItemId>> = vec![Vec::new(); open];

        for (idx, &id) in order.iter().enumerate() {
            if self.should_stop() {
                log::info!("stop requested, {} items left unplaced", order.len() - idx);
                self.stopped = true;
                break;
            }

            let remaining = &order[idx + 1..];
            let mut committed = None;
            let mut bin_idx = 0;
            // `bin_idx == open` tries a fresh bed.
            while bin_idx <= open {
                let placed = bed_contents(&config.shared_obstacles, &obstacles, &packed, bin_idx);
                let ctx = PackContext {
                    items: &*items,
                    bin_index: bin_idx,
                    placed: &placed,
                    remaining,
                    current: id,
                };
                let snapshot = (config.before_packing)(&ctx);
                if let Some(found) = self.search(items, id, &placed, &snapshot, &config) {
                    committed = Some((bin_idx, found));
                    break;
                }
                bin_idx += 1;
            }

            match committed {
                Some((bin_idx, (rotation, translation))) => {
                    let item = &mut items[id.0];
                    if (item.rotation() - rotation).abs() > f64::EPSILON {
                        item.set_rotation(rotation);
                    }
                    item.translation = translation;
                    item.bin_id = Some(bin_idx);
                    item.sequence = self.next_sequence;
                    self.next_sequence += 1;

                    if packed.len() <= bin_idx {
                        packed.resize_with(bin_idx + 1, Vec::new);
                    }
                    packed[bin_idx].push(id);
                    open = open.max(bin_idx + 1);
                    self.last_bin = Some(bin_idx);
                    log::debug!(
                        "item {} packed on bed {} at ({:.3}, {:.3})",
                        id.0,
                        bin_idx,
                        translation.0,
                        translation.1
                    );
                    if let Some(f) = &self.packed {
                        f(&items[id.0]);
                    }
                }
                None => {
                    items[id.0].bin_id = None;
                    log::debug!("item {} fits on no bed", id.0);
                    if let Some(f) = &self.unfit {
                        f(&format!("item {} does not fit on any bed", id.0));
                    }
                }
            }

            if let Some(f) = &self.progress {
                f(remaining.len());
            }
        }

        for (bin_idx, ids) in packed.iter().enumerate() {
            if ids.is_empty() {
                continue;
            }
            let obstacles_here = bed_contents(&config.shared_obstacles, &obstacles, &[], bin_idx);
            self.align_bed(items, ids, &obstacles_here, &config);
        }

        let used = packed
            .iter()
            .rposition(|ids| !ids.is_empty())
            .map_or(0, |i| i + 1);
        self.result = packed;
        used
    }

    fn progress_indicator(&mut self, f: ProgressFn) {
        self.progress = Some(f);
    }

    fn stop_condition(&mut self, f: StopFn) {
        self.stop = Some(f);
    }

    fn unfit_indicator(&mut self, f: UnfitFn) {
        self.unfit = Some(f);
    }

    fn packed_indicator(&mut self, f: PackedFn) {
        self.packed = Some(f);
    }

    fn last_result(&self) -> &[Vec<ItemId>] {
        &self.result
    }

    fn last_packed_bin_id(&self) -> Option<usize> {
        self.last_bin
    }

    fn was_stopped(&self) -> bool {
        self.stopped
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    /// Snapshot for tests: nothing but the bed index.
    fn bottom_left_config() -> PlacementConfig<usize> {
        PlacementConfig::new(
            Arc::new(|ctx: &PackContext<'_>| ctx.bin_index),
            Arc::new(|item: &Item, _: &usize| {
                let bb = item.bounding_box();
                bb.min_y * 10.0 + bb.min_x
            }),
        )
        .with_alignment(Alignment::DontAlign)
    }

    fn squares(n: usize, side: f64) -> Vec<Item> {
        (0..n).map(|_| Item::rectangle(side, side).unwrap()).collect()
    }

    fn ids(n: usize) -> Vec<ItemId> {
        (0..n).map(ItemId).collect()
    }

    #[test]
    fn test_packs_without_overlap() {
        let mut items = squares(4, 10.0);
        let mut placer = NfpPlacer::new(Bin::Box(AABB2D::new(0.0, 0.0, 30.0, 30.0)));
        placer.configure(bottom_left_config());
        let used = placer.execute(&mut items, &ids(4));

        assert_eq!(used, 1);
        for (i, a) in items.iter().enumerate() {
            assert_eq!(a.bin_id, Some(0));
            assert!(AABB2D::new(0.0, 0.0, 30.0, 30.0).contains(&a.bounding_box(), 1e-3));
            for b in &items[i + 1..] {
                assert!(!convex_polygons_overlap(
                    &a.transformed_shape(),
                    &b.transformed_shape(),
                    1e-3
                ));
            }
        }
        // Bottom-left objective starts in the corner.
        assert!(items[0].bounding_box().min_x.abs() < 1e-6);
        assert!(items[0].bounding_box().min_y.abs() < 1e-6);
    }

    #[test]
    fn test_overflow_opens_second_bed() {
        let mut items = squares(3, 20.0);
        let mut placer = NfpPlacer::new(Bin::Box(AABB2D::new(0.0, 0.0, 30.0, 30.0)));
        placer.configure(bottom_left_config());
        let used = placer.execute(&mut items, &ids(3));

        assert_eq!(used, 3);
        let beds: Vec<_> = items.iter().map(|i| i.bin_id).collect();
        assert_eq!(beds, vec![Some(0), Some(1), Some(2)]);
        assert_eq!(placer.last_packed_bin_id(), Some(2));
        assert_eq!(placer.last_result().len(), 3);
    }

    #[test]
    fn test_oversized_item_is_unplaced() {
        let mut items = vec![Item::rectangle(50.0, 5.0).unwrap()];
        let unfit = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&unfit);
        let mut placer = NfpPlacer::new(Bin::Box(AABB2D::new(0.0, 0.0, 30.0, 30.0)));
        placer.configure(bottom_left_config());
        placer.unfit_indicator(Arc::new(move |_: &str| {
            counter.fetch_add(1, Ordering::Relaxed);
        }));
        let used = placer.execute(&mut items, &ids(1));

        assert_eq!(used, 0);
        assert_eq!(items[0].bin_id, None);
        assert_eq!(unfit.load(Ordering::Relaxed), 1);
    }

    #[test]
    fn test_fixed_item_is_an_obstacle() {
        let mut items = squares(2, 10.0);
        items[0] = Item::rectangle(15.0, 15.0).unwrap().fixed_on(0);
        let mut placer = NfpPlacer::new(Bin::Box(AABB2D::new(0.0, 0.0, 30.0, 30.0)));
        placer.configure(bottom_left_config());
        placer.execute(&mut items, &[ItemId(1)]);

        assert_eq!(items[0].translation, (0.0, 0.0));
        assert_eq!(items[1].bin_id, Some(0));
        assert!(!convex_polygons_overlap(
            &items[0].transformed_shape(),
            &items[1].transformed_shape(),
            1e-3
        ));
    }

    #[test]
    fn test_stop_condition_before_first_item() {
        let mut items = squares(2, 5.0);
        let mut placer = NfpPlacer::new(Bin::Box(AABB2D::new(0.0, 0.0, 30.0, 30.0)));
        placer.configure(bottom_left_config());
        placer.stop_condition(Arc::new(|| true));
        placer.execute(&mut items, &ids(2));

        assert!(placer.was_stopped());
        assert!(items.iter().all(|i| i.bin_id.is_none()));
    }

    #[test]
    fn test_center_alignment_moves_pile() {
        let mut items = squares(1, 10.0);
        let mut placer = NfpPlacer::new(Bin::Box(AABB2D::new(0.0, 0.0, 100.0, 100.0)));
        placer.configure(bottom_left_config().with_alignment(Alignment::Center));
        placer.execute(&mut items, &ids(1));

        let c = items[0].bounding_box().center();
        assert!((c.0 - 50.0).abs() < 1e-6);
        assert!((c.1 - 50.0).abs() < 1e-6);
    }

    #[test]
    fn test_sequence_and_progress() {
        let mut items = squares(3, 5.0);
        let calls = Arc::new(AtomicUsize::new(0));
        let seen = Arc::clone(&calls);
        let mut placer = NfpPlacer::new(Bin::Box(AABB2D::new(0.0, 0.0, 50.0, 50.0)));
        placer.configure(bottom_left_config().with_parallel(true));
        placer.progress_indicator(Arc::new(move |_: usize| {
            seen.fetch_add(1, Ordering::Relaxed);
        }));
        placer.execute(&mut items, &ids(3));

        let mut seqs: Vec<i64> = items.iter().map(|i| i.sequence).collect();
        seqs.sort_unstable();
        assert_eq!(seqs, vec![0, 1, 2]);
        assert_eq!(calls.load(Ordering::Relaxed), 3);
    }
}
