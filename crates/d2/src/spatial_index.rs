//! Spatial indexing of placed items using R*-trees.
//!
//! The scorer asks "which placed items touch this bounding box" for every
//! candidate position, so the placed items of the current bed are kept in
//! two R*-trees: one for big items and one for all real (non-virtual) items.
//! Both are rebuilt from scratch whenever the pile changes.

use crate::item::{Item, ItemId};
use platepack_core::AABB2D;
use rstar::{RTree, RTreeObject, AABB};

/// Area fraction of the bed above which an item counts as big.
pub const BIG_ITEM_THRESHOLD: f64 = 0.02;

/// An entry in the index: a placed item's bounding box and handle.
#[derive(Debug, Clone)]
pub struct SpatialEntry {
    pub id: ItemId,
    /// Axis-aligned bounding box (min_x, min_y, max_x, max_y)
    pub aabb: [f64; 4],
}

impl SpatialEntry {
    pub fn new(id: ItemId, bb: &AABB2D) -> Self {
        Self {
            id,
            aabb: [bb.min_x, bb.min_y, bb.max_x, bb.max_y],
        }
    }
}

impl RTreeObject for SpatialEntry {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        AABB::from_corners([self.aabb[0], self.aabb[1]], [self.aabb[2], self.aabb[3]])
    }
}

/// Bounding-box index over placed items.
#[derive(Debug)]
pub struct SpatialIndex {
    tree: RTree<SpatialEntry>,
    bounds: Option<AABB2D>,
}

impl SpatialIndex {
    /// Creates a new empty spatial index.
    pub fn new() -> Self {
        Self {
            tree: RTree::new(),
            bounds: None,
        }
    }

    /// Inserts an item's bounding box.
    pub fn insert(&mut self, bb: AABB2D, id: ItemId) {
        self.bounds = Some(match self.bounds {
            Some(b) => b.union(&bb),
            None => bb,
        });
        self.tree.insert(SpatialEntry::new(id, &bb));
    }

    /// Clears all entries from the index.
    pub fn clear(&mut self) {
        self.tree = RTree::new();
        self.bounds = None;
    }

    /// Handles of all entries whose boxes intersect `bb`.
    pub fn query(&self, bb: &AABB2D) -> Vec<ItemId> {
        let envelope = AABB::from_corners([bb.min_x, bb.min_y], [bb.max_x, bb.max_y]);
        let mut ids: Vec<ItemId> = self
            .tree
            .locate_in_envelope_intersecting(&envelope)
            .map(|e| e.id)
            .collect();
        // Tree traversal order is not part of the contract; keep scores reproducible.
        ids.sort_unstable();
        ids
    }

    /// Union of all inserted boxes, `None` when empty.
    pub fn bounds(&self) -> Option<AABB2D> {
        self.bounds
    }

    pub fn len(&self) -> usize {
        self.tree.size()
    }

    pub fn is_empty(&self) -> bool {
        self.tree.size() == 0
    }

    pub fn iter(&self) -> impl Iterator<Item = &SpatialEntry> {
        self.tree.iter()
    }
}

impl Default for SpatialIndex {
    fn default() -> Self {
        Self::new()
    }
}

/// The pair of indices the scorer consults.
#[derive(Debug, Default)]
pub struct PileIndex {
    /// Non-virtual items whose area exceeds the big-item threshold.
    pub big: SpatialIndex,
    /// All non-virtual items.
    pub all: SpatialIndex,
}

impl PileIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuilds both indices from the placed items of one bed.
    pub fn rebuild<'a, I>(&mut self, placed: I, bin_area: f64, big_threshold: f64)
    where
        I: IntoIterator<Item = (ItemId, &'a Item)>,
    {
        self.big.clear();
        self.all.clear();
        for (id, item) in placed {
            if item.is_virtual {
                continue;
            }
            let bb = item.bounding_box();
            if is_big(item.area(), bin_area, big_threshold) {
                self.big.insert(bb, id);
            }
            self.all.insert(bb, id);
        }
    }
}

/// True when `area` is a large enough share of the bed.
pub fn is_big(area: f64, bin_area: f64, threshold: f64) -> bool {
    bin_area > 0.0 && area / bin_area > threshold
}
