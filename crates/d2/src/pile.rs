//! Frozen view of one bed, rebuilt before every search.
//!
//! The Placer calls the controller's `before_packing` hook between items; the
//! hook builds a [`PileState`] from the current bed contents. Scoring threads
//! only ever read it, so it owns copies of everything it needs.

use crate::item::{Item, ItemId};
use crate::placer::PackContext;
use crate::spatial_index::PileIndex;
use platepack_core::geometry::{union_polygons, Point};
use platepack_core::AABB2D;
use std::collections::{BTreeMap, BTreeSet};

/// Bed contents at the moment one item is about to be placed.
#[derive(Debug, Default)]
pub struct PileState {
    pub bin_index: usize,
    /// Union of every placed outline on the bed.
    pub merged_pile: Vec<Vec<Point>>,
    /// Bounding box of the merged pile, `None` on an empty bed.
    pub pile_bbox: Option<AABB2D>,
    /// Placed items (obstacles included) by handle.
    pub placed: BTreeMap<ItemId, Item>,
    /// Handles in placement order.
    pub order: Vec<ItemId>,
    /// Number of items still waiting after the current one.
    pub remaining: usize,
    /// Extruders used by the real parts already on the bed.
    pub plate_extruders: BTreeSet<i32>,
    /// The bed carries fixed items.
    pub has_fixed: bool,
    pub index: PileIndex,
}

impl PileState {
    /// Freezes the bed described by `ctx`.
    pub fn from_context(ctx: &PackContext<'_>, bin_area: f64, big_threshold: f64) -> Self {
        let mut state = PileState {
            bin_index: ctx.bin_index,
            remaining: ctx.remaining.len(),
            ..PileState::default()
        };

        let mut shapes = Vec::with_capacity(ctx.placed.len());
        for &id in ctx.placed {
            let Some(item) = ctx.items.get(id.0) else {
                continue;
            };
            let bb = item.bounding_box();
            state.pile_bbox = Some(match state.pile_bbox {
                Some(pile) => pile.union(&bb),
                None => bb,
            });
            if !item.is_virtual {
                state.plate_extruders.extend(item.extrude_ids.iter().copied());
            }
            state.has_fixed |= item.fixed;
            shapes.push(item.transformed_shape());
            state.placed.insert(id, item.clone());
            state.order.push(id);
        }

        state.merged_pile = union_polygons(&shapes);
        state
            .index
            .rebuild(state.placed.iter().map(|(&id, item)| (id, item)), bin_area, big_threshold);
        state
    }

    pub fn get(&self, id: ItemId) -> Option<&Item> {
        self.placed.get(&id)
    }

    /// Placed items in placement order.
    pub fn items(&self) -> impl Iterator<Item = &Item> {
        self.order.iter().filter_map(move |id| self.placed.get(id))
    }

    pub fn is_empty(&self) -> bool {
        self.placed.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spatial_index::BIG_ITEM_THRESHOLD;
    use approx::assert_relative_eq;

    #[test]
    fn test_from_context() {
        let items = vec![
            Item::rectangle(20.0, 20.0).unwrap().with_extruders([1]),
            Item::rectangle(20.0, 20.0)
                .unwrap()
                .with_translation(15.0, 0.0)
                .with_extruders([2]),
            Item::rectangle(5.0, 5.0)
                .unwrap()
                .with_translation(60.0, 60.0)
                .virtual_object()
                .with_extruders([9])
                .fixed_on(0),
            Item::rectangle(1.0, 1.0).unwrap(),
        ];
        let placed = [ItemId(0), ItemId(1), ItemId(2)];
        let remaining = [ItemId(3)];
        let ctx = PackContext {
            items: &items,
            bin_index: 0,
            placed: &placed,
            remaining: &remaining,
            current: ItemId(3),
        };

        let state = PileState::from_context(&ctx, 100.0 * 100.0, BIG_ITEM_THRESHOLD);
        assert_eq!(state.remaining, 1);
        assert!(state.has_fixed);
        assert_eq!(state.plate_extruders, BTreeSet::from([1, 2]));
        assert_eq!(state.pile_bbox, Some(AABB2D::new(0.0, 0.0, 65.0, 65.0)));
        // The two overlapping squares merge; the marker stays separate.
        assert_eq!(state.merged_pile.len(), 2);
        assert_eq!(state.index.all.len(), 2);
        assert_eq!(state.index.big.len(), 2);
        assert_eq!(state.items().count(), 3);
        assert_relative_eq!(state.get(ItemId(1)).unwrap().translation.0, 15.0);
    }

    #[test]
    fn test_empty_bed() {
        let items: Vec<Item> = Vec::new();
        let ctx = PackContext {
            items: &items,
            bin_index: 2,
            placed: &[],
            remaining: &[],
            current: ItemId(0),
        };
        let state = PileState::from_context(&ctx, 1.0, BIG_ITEM_THRESHOLD);
        assert!(state.is_empty());
        assert!(state.pile_bbox.is_none());
        assert!(state.merged_pile.is_empty());
        assert_eq!(state.bin_index, 2);
    }
}
