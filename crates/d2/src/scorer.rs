//! Placement objective.
//!
//! The [`Scorer`] turns a candidate (an item with a trial transform) and a
//! frozen [`PileState`] into a cost; lower is better. It is evaluated for
//! every candidate position the Placer tries, possibly on several threads,
//! and never mutates anything.
//!
//! The score is the sum of
//!
//! 1. a geometric term, chosen by case:
//!    - big item with more to come: stay close to the pile, keep it dense and
//!      snap to same-size neighbours
//!    - last big item: stay close to the pile center
//!    - small item: gather around the big items
//! 2. manufacturing penalties (sequential clearance, temperature, materials)
//! 3. a per-bed overfit term, selected by bed kind
//!
//! Anything above [`LARGE_COST_TO_REJECT`] saturates at 1.5 times that value,
//! so the Placer rejects it.

use crate::bin::Bin;
use crate::item::Item;
use crate::params::ArrangeParams;
use crate::pile::PileState;
use crate::placer::{Alignment, PackContext, LARGE_COST_TO_REJECT};
use crate::spatial_index::{is_big, BIG_ITEM_THRESHOLD};
use platepack_core::geometry::{convex_hull, distance, Point, EPSILON};
use platepack_core::AABB2D;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Relative area difference under which two parts count as the same size.
const SAME_AREA_TOLERANCE: f64 = 1e-6;

/// Tuned scoring constants.
///
/// The defaults reproduce the reference behavior; changing them changes the
/// layouts produced but never their validity.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ScoreWeights {
    /// Bed-area fraction above which an item is big.
    pub big_item_threshold: f64,
    /// Share of the pile distance in the big-item distance blend.
    pub pile_distance_weight: f64,
    /// Share of the origin distance in the big-item and small-item blends.
    pub origin_distance_weight: f64,
    /// Distance and density shares when a big item has no neighbours.
    pub lone_distance_weight: f64,
    pub lone_density_weight: f64,
    /// Distance, density and alignment shares when it has neighbours.
    pub distance_weight: f64,
    pub density_weight: f64,
    pub alignment_weight: f64,
    /// Weight of the X offset in the bottom-left distance.
    pub bottom_left_x_weight: f64,
    /// Multiplier for candidates left of or below the origin.
    pub wrong_side_penalty: f64,
    /// Share of the bottom-left distance in sequential big-item scoring.
    pub sequential_bottom_left_weight: f64,
    /// Weight of the averaged height difference in batch mode.
    pub height_similarity_weight: f64,
    /// Cost per extruder added to the plate in batch mode.
    pub extruder_change_weight: f64,
    /// Multiplier of the rejection cost for rod clearance violations.
    pub rod_clearance_penalty: f64,
    /// Multiplier of the rejection cost for mixing materials.
    pub material_penalty: f64,
    /// Saturation level, as a multiple of the rejection cost.
    pub saturation: f64,
}

impl Default for ScoreWeights {
    fn default() -> Self {
        Self {
            big_item_threshold: BIG_ITEM_THRESHOLD,
            pile_distance_weight: 0.8,
            origin_distance_weight: 0.2,
            lone_distance_weight: 0.5,
            lone_density_weight: 0.5,
            distance_weight: 0.5,
            density_weight: 0.2,
            alignment_weight: 0.3,
            bottom_left_x_weight: 0.2,
            wrong_side_penalty: 10.0,
            sequential_bottom_left_weight: 0.8,
            height_similarity_weight: 0.1,
            extruder_change_weight: 1.0,
            rod_clearance_penalty: 1.1,
            material_penalty: 1.3,
            saturation: 1.5,
        }
    }
}

/// Which geometric model applies to a candidate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScoreCase {
    BigItem,
    LastBigItem,
    SmallItem,
}

/// The objective function of one arrangement run.
#[derive(Debug, Clone)]
pub struct Scorer {
    bin: Bin,
    bin_bb: AABB2D,
    bin_area: f64,
    norm: f64,
    origin: Point,
    starting_point: Alignment,
    item_count: usize,
    is_seq_print: bool,
    clearance_height_to_rod: f64,
    clearance_height_to_lid: f64,
    allow_multi_materials: bool,
    weights: ScoreWeights,
}

impl Scorer {
    /// `item_count` counts every item of the run, fixed ones included.
    pub fn new(
        bin: &Bin,
        params: &ArrangeParams,
        starting_point: Alignment,
        item_count: usize,
    ) -> Self {
        let bin_bb = bin.bounding_box();
        let bin_area = bin.area();
        let origin = starting_point
            .anchor(&bin_bb, bin.center())
            .unwrap_or_else(|| bin.center());
        Self {
            bin: bin.clone(),
            bin_bb,
            bin_area,
            norm: bin_area.max(f64::EPSILON).sqrt(),
            origin,
            starting_point,
            item_count: item_count.max(1),
            is_seq_print: params.is_seq_print,
            clearance_height_to_rod: params.clearance_height_to_rod,
            clearance_height_to_lid: params.clearance_height_to_lid,
            allow_multi_materials: params.allow_multi_materials_on_same_plate,
            weights: params.weights.clone(),
        }
    }

    /// Origin anchor the distances are measured against.
    pub fn origin(&self) -> Point {
        self.origin
    }

    pub fn weights(&self) -> &ScoreWeights {
        &self.weights
    }

    /// The `before_packing` half: freezes the bed for the next search.
    pub fn snapshot(&self, ctx: &PackContext<'_>) -> PileState {
        PileState::from_context(ctx, self.bin_area, self.weights.big_item_threshold)
    }

    /// The objective half: cost of `item` at its current transform.
    pub fn score(&self, item: &Item, pile: &PileState) -> f64 {
        let ibb = item.bounding_box();
        let fullbb = pile.pile_bbox.map_or(ibb, |pbb| pbb.union(&ibb));

        let mut score = if item.is_wipe_tower {
            self.norm(distance(ibb.center(), self.origin))
        } else {
            let geometric = self.geometric_score(item, &ibb, &fullbb, pile);
            geometric + self.manufacturing_penalty(item, &ibb, pile)
        };

        score += self.overfit_penalty(item, &fullbb, pile);
        if pile.has_fixed {
            score += self.fixed_overfit(&fullbb);
        }

        if score > LARGE_COST_TO_REJECT {
            score = self.weights.saturation * LARGE_COST_TO_REJECT;
        }
        score
    }

    /// Case selection for a candidate against a pile.
    pub fn score_case(&self, item: &Item, pile: &PileState) -> ScoreCase {
        let bigitems = self.is_big(item.area()) || pile.index.big.is_empty();
        match (bigitems, pile.remaining == 0) {
            (true, false) => ScoreCase::BigItem,
            (true, true) => ScoreCase::LastBigItem,
            (false, _) => ScoreCase::SmallItem,
        }
    }

    fn norm(&self, value: f64) -> f64 {
        value / self.norm
    }

    fn is_big(&self, area: f64) -> bool {
        is_big(area, self.bin_area, self.weights.big_item_threshold)
    }

    fn geometric_score(&self, item: &Item, ibb: &AABB2D, fullbb: &AABB2D, pile: &PileState) -> f64 {
        let w = &self.weights;
        match self.score_case(item, pile) {
            ScoreCase::BigItem => {
                let cc = fullbb.center();
                let dist = [
                    ibb.min_corner(),
                    ibb.max_corner(),
                    ibb.center(),
                    ibb.top_left(),
                    ibb.bottom_right(),
                ]
                .into_iter()
                .map(|p| distance(p, cc))
                .fold(f64::INFINITY, f64::min);

                let anchor = if self.starting_point == Alignment::BottomLeft {
                    ibb.min_corner()
                } else {
                    ibb.center()
                };
                let bindist = self.norm(distance(anchor, self.origin));
                let mut dist =
                    w.pile_distance_weight * self.norm(dist) + w.origin_distance_weight * bindist;
                if self.is_seq_print {
                    let bl = self.norm(self.dist_for_bottom_left(ibb, pile));
                    dist = w.sequential_bottom_left_weight * bl
                        + (1.0 - w.sequential_bottom_left_weight) * dist;
                }

                let index = if self.is_big(item.area()) {
                    &pile.index.big
                } else {
                    &pile.index.all
                };
                let neighbours = index.query(ibb);
                let area = item.area();
                let alignment = neighbours
                    .iter()
                    .filter_map(|id| pile.get(*id))
                    .filter(|p| area > 0.0 && (1.0 - p.area() / area).abs() < SAME_AREA_TOLERANCE)
                    .map(|p| {
                        let union_area = p.bounding_box().union(ibb).area();
                        if union_area > 0.0 {
                            1.0 - (area + p.area()) / union_area
                        } else {
                            1.0
                        }
                    })
                    .fold(1.0, f64::min);

                let density = (self.norm(fullbb.width()) * self.norm(fullbb.height())).sqrt();
                if neighbours.is_empty() {
                    w.lone_distance_weight * dist + w.lone_density_weight * density
                } else {
                    let r = pile.remaining as f64 / self.item_count as f64;
                    w.distance_weight * dist
                        + (1.0 - r) * w.density_weight * density
                        + w.alignment_weight * alignment
                }
            }
            ScoreCase::LastBigItem => {
                if self.is_seq_print {
                    self.norm(self.dist_for_bottom_left(ibb, pile))
                } else {
                    let center = pile.pile_bbox.map_or(ibb.center(), |b| b.center());
                    self.norm(distance(ibb.center(), center))
                }
            }
            ScoreCase::SmallItem => {
                if self.is_seq_print {
                    self.norm(self.dist_for_bottom_left(ibb, pile))
                } else {
                    let bigbb = pile.index.big.bounds().unwrap_or(*fullbb);
                    let dist = self.norm(distance(ibb.center(), bigbb.center()));
                    let bindist = self.norm(distance(ibb.center(), self.origin));
                    w.pile_distance_weight * dist + w.origin_distance_weight * bindist
                }
            }
        }
    }

    /// Row-major distance from the origin corner.
    ///
    /// Rows are formed by the first placed part whose Y range overlaps the
    /// candidate; sitting off that row's baseline costs extra.
    fn dist_for_bottom_left(&self, ibb: &AABB2D, pile: &PileState) -> f64 {
        let w = &self.weights;
        let mut dist =
            (ibb.min_y - self.origin.1) + w.bottom_left_x_weight * (ibb.min_x - self.origin.0);
        let row = pile
            .items()
            .filter(|p| !p.is_virtual)
            .map(|p| p.bounding_box())
            .find(|pbb| y_overlap(pbb, ibb));
        if let Some(row) = row {
            dist += (ibb.min_y - row.min_y).abs();
        }
        if ibb.min_x < self.origin.0 - EPSILON || ibb.min_y < self.origin.1 - EPSILON {
            dist = dist.abs() * w.wrong_side_penalty;
        }
        dist
    }

    fn manufacturing_penalty(&self, item: &Item, ibb: &AABB2D, pile: &PileState) -> f64 {
        let w = &self.weights;
        let mut penalty = 0.0;

        if self.is_seq_print {
            for p in pile.items().filter(|p| !p.is_virtual) {
                let pbb = p.bounding_box();
                if y_overlap(&pbb, ibb) {
                    let first = if prints_before(&pbb, ibb) { p } else { item };
                    if self.clearance_height_to_rod > 0.0
                        && first.height > self.clearance_height_to_rod
                    {
                        penalty += w.rod_clearance_penalty * LARGE_COST_TO_REJECT;
                    }
                }
                // Everything already placed prints before the candidate.
                if self.clearance_height_to_lid > 0.0 && p.height > self.clearance_height_to_lid {
                    penalty += LARGE_COST_TO_REJECT;
                }
                if !item.temperature_compatible(p) {
                    penalty += LARGE_COST_TO_REJECT;
                }
            }
        } else {
            let mut height_diff = 0.0;
            let mut count = 0usize;
            for p in pile.items().filter(|p| !p.is_virtual) {
                if !item.temperature_compatible(p) {
                    penalty += LARGE_COST_TO_REJECT;
                    break;
                }
                height_diff += (item.height - p.height).abs();
                count += 1;
            }
            if count > 0 {
                penalty += w.height_similarity_weight * self.norm(height_diff / count as f64);
            }
        }

        if !pile.plate_extruders.is_empty() && !item.extrude_ids.is_empty() {
            if !self.allow_multi_materials {
                let subset = item.extrude_ids.is_subset(&pile.plate_extruders);
                let superset = item.extrude_ids.is_superset(&pile.plate_extruders);
                if !subset && !superset {
                    penalty += w.material_penalty * LARGE_COST_TO_REJECT;
                }
            }
            if !self.is_seq_print {
                let added = item.extrude_ids.difference(&pile.plate_extruders).count();
                penalty += w.extruder_change_weight * added as f64;
            }
        }

        penalty
    }

    /// Bed-specific term for a pile that sticks out of the bed.
    fn overfit_penalty(&self, item: &Item, fullbb: &AABB2D, pile: &PileState) -> f64 {
        match &self.bin {
            Bin::Box(_) => {
                let miss = self.bin.overfit(fullbb, &[]);
                miss * miss
            }
            Bin::Circle { .. } => {
                if !self.is_big(item.area()) {
                    return 0.0;
                }
                let mut points: Vec<Point> = pile.merged_pile.iter().flatten().copied().collect();
                points.extend(item.transformed_shape());
                let miss = match convex_hull(&points) {
                    Ok(hull) => self.bin.overfit(fullbb, &hull),
                    Err(_) => self.bin.overfit(fullbb, &points),
                };
                miss * miss
            }
            Bin::Polygon { .. } => {
                if self.starting_point == Alignment::BottomLeft
                    && !self.bin.contains(&item.transformed_shape(), EPSILON)
                {
                    LARGE_COST_TO_REJECT
                } else {
                    0.0
                }
            }
            Bin::Infinite { .. } => 0.0,
        }
    }

    /// Area by which the pile pushes the bed bounding box outward.
    fn fixed_overfit(&self, fullbb: &AABB2D) -> f64 {
        let grown = fullbb.union(&self.bin_bb);
        (grown.area() - self.bin_bb.area()).max(0.0)
    }
}

fn y_overlap(a: &AABB2D, b: &AABB2D) -> bool {
    a.min_y < b.max_y && b.min_y < a.max_y
}

/// Sequential print order: lower rows first, then left to right.
fn prints_before(a: &AABB2D, b: &AABB2D) -> bool {
    a.min_y < b.min_y || (a.min_y == b.min_y && a.min_x < b.min_x)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::item::{FilamentTempType, ItemId};
    use approx::assert_relative_eq;

    fn bed() -> Bin {
        Bin::Box(AABB2D::new(0.0, 0.0, 200.0, 200.0))
    }

    fn square(side: f64, x: f64, y: f64) -> Item {
        Item::rectangle(side, side).unwrap().with_translation(x, y)
    }

    fn pile_of(items: &[Item], remaining: usize) -> PileState {
        let placed: Vec<ItemId> = (0..items.len()).map(ItemId).collect();
        let waiting: Vec<ItemId> = (0..remaining).map(|i| ItemId(1000 + i)).collect();
        let ctx = PackContext {
            items,
            bin_index: 0,
            placed: &placed,
            remaining: &waiting,
            current: ItemId(999),
        };
        PileState::from_context(&ctx, bed().area(), BIG_ITEM_THRESHOLD)
    }

    fn scorer(params: &ArrangeParams, start: Alignment) -> Scorer {
        Scorer::new(&bed(), params, start, 10)
    }

    #[test]
    fn test_score_is_repeatable() {
        let params = ArrangeParams::default();
        let s = scorer(&params, Alignment::TopRight);
        let pile = pile_of(&[square(40.0, 0.0, 0.0), square(40.0, 40.0, 0.0)], 3);
        let candidate = square(40.0, 80.0, 0.0);
        let a = s.score(&candidate, &pile);
        let b = s.score(&candidate, &pile);
        assert_eq!(a.to_bits(), b.to_bits());
        assert!(a.is_finite());
    }

    #[test]
    fn test_case_dispatch() {
        let params = ArrangeParams::default();
        let s = scorer(&params, Alignment::TopRight);
        let big = square(40.0, 0.0, 0.0);
        let small = square(5.0, 100.0, 100.0);

        let empty = pile_of(&[], 2);
        // An empty big index makes everything big.
        assert_eq!(s.score_case(&small, &empty), ScoreCase::BigItem);

        let pile = pile_of(&[big.clone()], 2);
        assert_eq!(s.score_case(&big, &pile), ScoreCase::BigItem);
        assert_eq!(s.score_case(&small, &pile), ScoreCase::SmallItem);

        let last = pile_of(&[big.clone()], 0);
        assert_eq!(s.score_case(&big, &last), ScoreCase::LastBigItem);
    }

    #[test]
    fn test_big_item_prefers_pile_contact() {
        let params = ArrangeParams::default();
        let s = scorer(&params, Alignment::Center);
        let pile = pile_of(&[square(40.0, 80.0, 80.0)], 3);
        let near = square(40.0, 120.0, 80.0);
        let far = square(40.0, 160.0, 160.0);
        assert!(s.score(&near, &pile) < s.score(&far, &pile));
    }

    #[test]
    fn test_box_overfit_is_squared() {
        let params = ArrangeParams::default();
        let s = scorer(&params, Alignment::Center);
        let pile = pile_of(&[], 0);
        let item = square(10.0, 195.0, 0.0);
        assert_relative_eq!(
            s.overfit_penalty(&item, &AABB2D::new(0.0, 0.0, 100.0, 10.0), &pile),
            0.0
        );
        assert_relative_eq!(
            s.overfit_penalty(&item, &AABB2D::new(0.0, 0.0, 205.0, 10.0), &pile),
            25.0
        );
    }

    #[test]
    fn test_sequential_taller_first_is_worse() {
        let params = ArrangeParams::default()
            .with_seq_print(true)
            .with_clearance(10.0, 20.0, 200.0);
        let s = scorer(&params, Alignment::BottomLeft);

        let tall = square(20.0, 0.0, 0.0).with_height(50.0);
        let pile = pile_of(&[tall], 1);
        // The short part shares the row but sits higher, so the tall one prints first.
        let short_after = square(20.0, 40.0, 5.0).with_height(10.0);
        let tall_first = s.score(&short_after, &pile);

        let short = square(20.0, 0.0, 0.0).with_height(10.0);
        let pile = pile_of(&[short], 1);
        let tall_after = square(20.0, 40.0, 5.0).with_height(50.0);
        let short_first = s.score(&tall_after, &pile);

        assert!(tall_first >= LARGE_COST_TO_REJECT);
        assert!(short_first < LARGE_COST_TO_REJECT);
        assert!(tall_first > short_first);
    }

    #[test]
    fn test_sequential_unset_clearance_is_unlimited() {
        let params = ArrangeParams::default().with_seq_print(true);
        let s = scorer(&params, Alignment::BottomLeft);
        let pile = pile_of(&[square(20.0, 0.0, 0.0).with_height(10.0)], 1);
        let next = square(20.0, 40.0, 0.0).with_height(10.0);
        assert!(s.score(&next, &pile) < LARGE_COST_TO_REJECT);
    }

    #[test]
    fn test_temperature_conflict_rejects() {
        let params = ArrangeParams::default();
        let s = scorer(&params, Alignment::TopRight);
        let pla = square(30.0, 0.0, 0.0).with_temp_type(FilamentTempType::LowTemp);
        let pile = pile_of(&[pla], 1);
        let abs = square(30.0, 40.0, 0.0).with_temp_type(FilamentTempType::HighTemp);
        assert!(s.score(&abs, &pile) >= LARGE_COST_TO_REJECT);
        let petg = square(30.0, 40.0, 0.0).with_temp_type(FilamentTempType::HighLowCompatible);
        assert!(s.score(&petg, &pile) < LARGE_COST_TO_REJECT);
    }

    #[test]
    fn test_material_mixing() {
        let params = ArrangeParams::default().with_multi_materials(false);
        let s = scorer(&params, Alignment::TopRight);
        let pile = pile_of(&[square(30.0, 0.0, 0.0).with_extruders([1, 2])], 1);

        let subset = square(30.0, 40.0, 0.0).with_extruders([1]);
        let disjoint = square(30.0, 40.0, 0.0).with_extruders([3]);
        assert!(s.score(&subset, &pile) < LARGE_COST_TO_REJECT);
        assert_relative_eq!(
            s.score(&disjoint, &pile),
            s.weights().saturation * LARGE_COST_TO_REJECT
        );

        // Allowed mixing only costs the extra extruder.
        let mixed = scorer(&ArrangeParams::default(), Alignment::TopRight);
        let a = mixed.score(&subset, &pile);
        let b = mixed.score(&disjoint, &pile);
        assert_relative_eq!(b - a, 1.0, epsilon = 1e-9);
    }

    #[test]
    fn test_wipe_tower_stays_near_origin() {
        let params = ArrangeParams::default();
        let s = scorer(&params, Alignment::TopRight);
        let pile = pile_of(&[], 0);
        let mut near = square(10.0, 190.0, 190.0);
        near.is_wipe_tower = true;
        near.is_virtual = true;
        let mut far = near.clone();
        far.translation = (0.0, 0.0);
        assert!(s.score(&near, &pile) < s.score(&far, &pile));
    }

    #[test]
    fn test_fixed_overfit() {
        let params = ArrangeParams::default();
        let s = scorer(&params, Alignment::Center);
        assert_relative_eq!(s.fixed_overfit(&AABB2D::new(0.0, 0.0, 100.0, 100.0)), 0.0);
        assert_relative_eq!(s.fixed_overfit(&AABB2D::new(0.0, 0.0, 210.0, 100.0)), 2000.0);
    }

    #[test]
    fn test_origin_follows_starting_point() {
        let params = ArrangeParams::default();
        assert_eq!(scorer(&params, Alignment::BottomLeft).origin(), (0.0, 0.0));
        assert_eq!(scorer(&params, Alignment::TopRight).origin(), (200.0, 200.0));
        assert_eq!(scorer(&params, Alignment::Center).origin(), (100.0, 100.0));
    }
}
