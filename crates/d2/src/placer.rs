//! Placer interface.
//!
//! A Placer walks the movable items in order, searches candidate positions on
//! each bed, asks the objective function to score them and commits the best
//! one. The controller never looks inside the search; it only supplies a
//! [`PlacementConfig`] and reads results back.
//!
//! The config is generic over the scoring snapshot `S`. Before each item the
//! Placer calls `before_packing`, which freezes the current pile into an `S`.
//! Every objective call for that item then reads the same snapshot, possibly
//! from several threads at once.

use crate::item::{Item, ItemId};
use platepack_core::geometry::Point;
use platepack_core::AABB2D;
use std::cmp::Ordering;
use std::fmt;
use std::sync::Arc;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Scores at or above this make a candidate infeasible.
pub const LARGE_COST_TO_REJECT: f64 = 1e7;

/// Where a pile or a start position is anchored on the bed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Alignment {
    #[default]
    Center,
    BottomLeft,
    BottomRight,
    TopLeft,
    TopRight,
    DontAlign,
    UserDefined,
}

impl Alignment {
    /// The anchor point of `bb` for this alignment. `user` is used for
    /// `UserDefined`; `DontAlign` has no anchor.
    pub fn anchor(self, bb: &AABB2D, user: Point) -> Option<Point> {
        match self {
            Alignment::Center => Some(bb.center()),
            Alignment::BottomLeft => Some(bb.min_corner()),
            Alignment::BottomRight => Some(bb.bottom_right()),
            Alignment::TopLeft => Some(bb.top_left()),
            Alignment::TopRight => Some(bb.max_corner()),
            Alignment::UserDefined => Some(user),
            Alignment::DontAlign => None,
        }
    }
}

/// What the Placer knows when it is about to search for one item.
pub struct PackContext<'a> {
    /// The whole item arena.
    pub items: &'a [Item],
    /// The bed being tried.
    pub bin_index: usize,
    /// Items already on that bed (obstacles first, then packed items).
    pub placed: &'a [ItemId],
    /// Items still waiting after the current one.
    pub remaining: &'a [ItemId],
    /// The item about to be placed.
    pub current: ItemId,
}

pub type BeforePackingFn<S> = Arc<dyn Fn(&PackContext<'_>) -> S + Send + Sync>;
pub type ObjectiveFn<S> = Arc<dyn Fn(&Item, &S) -> f64 + Send + Sync>;
pub type SortFn = Arc<dyn Fn(&Item, &Item) -> Ordering + Send + Sync>;
pub type PackedFn = Arc<dyn Fn(&Item) + Send + Sync>;
pub type ProgressFn = Arc<dyn Fn(usize) + Send + Sync>;
pub type StopFn = Arc<dyn Fn() -> bool + Send + Sync>;
pub type UnfitFn = Arc<dyn Fn(&str) + Send + Sync>;

/// Placement settings, fixed for the whole run.
pub struct PlacementConfig<S> {
    /// Rotations tried for every item, relative to its current rotation.
    pub rotations: Vec<f64>,
    /// Final pile alignment.
    pub alignment: Alignment,
    /// Corner the search starts from.
    pub starting_point: Alignment,
    /// Pile anchor used by `Alignment::UserDefined`, in bed coordinates.
    pub best_object_pos: Point,
    /// Search thoroughness in `[0, 1]`.
    pub accuracy: f64,
    /// Score candidates on the rayon pool.
    pub parallel: bool,
    /// Fixed items treated as obstacles on every bed.
    pub shared_obstacles: Vec<ItemId>,
    pub before_packing: BeforePackingFn<S>,
    pub object_function: ObjectiveFn<S>,
    pub sort_function: Option<SortFn>,
}

impl<S> PlacementConfig<S> {
    pub fn new(before_packing: BeforePackingFn<S>, object_function: ObjectiveFn<S>) -> Self {
        Self {
            rotations: vec![0.0],
            alignment: Alignment::Center,
            starting_point: Alignment::Center,
            best_object_pos: (0.0, 0.0),
            accuracy: 0.65,
            parallel: false,
            shared_obstacles: Vec::new(),
            before_packing,
            object_function,
            sort_function: None,
        }
    }

    pub fn with_rotations(mut self, rotations: Vec<f64>) -> Self {
        self.rotations = rotations;
        self
    }

    pub fn with_alignment(mut self, alignment: Alignment) -> Self {
        self.alignment = alignment;
        self
    }

    pub fn with_starting_point(mut self, starting_point: Alignment) -> Self {
        self.starting_point = starting_point;
        self
    }

    pub fn with_best_object_pos(mut self, pos: Point) -> Self {
        self.best_object_pos = pos;
        self
    }

    pub fn with_accuracy(mut self, accuracy: f64) -> Self {
        self.accuracy = accuracy.clamp(0.0, 1.0);
        self
    }

    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    pub fn with_shared_obstacles(mut self, ids: Vec<ItemId>) -> Self {
        self.shared_obstacles = ids;
        self
    }

    pub fn with_sort_function(mut self, sort: SortFn) -> Self {
        self.sort_function = Some(sort);
        self
    }
}

impl<S> Clone for PlacementConfig<S> {
    fn clone(&self) -> Self {
        Self {
            rotations: self.rotations.clone(),
            alignment: self.alignment,
            starting_point: self.starting_point,
            best_object_pos: self.best_object_pos,
            accuracy: self.accuracy,
            parallel: self.parallel,
            shared_obstacles: self.shared_obstacles.clone(),
            before_packing: Arc::clone(&self.before_packing),
            object_function: Arc::clone(&self.object_function),
            sort_function: self.sort_function.clone(),
        }
    }
}

impl<S> fmt::Debug for PlacementConfig<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PlacementConfig")
            .field("rotations", &self.rotations)
            .field("alignment", &self.alignment)
            .field("starting_point", &self.starting_point)
            .field("best_object_pos", &self.best_object_pos)
            .field("accuracy", &self.accuracy)
            .field("parallel", &self.parallel)
            .field("shared_obstacles", &self.shared_obstacles)
            .field("sort_function", &self.sort_function.is_some())
            .finish()
    }
}

/// The packing engine driven by the arrangement controller.
pub trait Placer<S> {
    /// Installs the run configuration.
    fn configure(&mut self, config: PlacementConfig<S>);

    /// Places `movable` items. Items marked `fixed` in the arena are
    /// obstacles on their bed. Returns the number of beds in use.
    fn execute(&mut self, items: &mut [Item], movable: &[ItemId]) -> usize;

    fn progress_indicator(&mut self, f: ProgressFn);

    fn stop_condition(&mut self, f: StopFn);

    fn unfit_indicator(&mut self, f: UnfitFn);

    fn packed_indicator(&mut self, f: PackedFn);

    /// Movable items per bed, in commit order.
    fn last_result(&self) -> &[Vec<ItemId>];

    /// Bed of the most recent commit.
    fn last_packed_bin_id(&self) -> Option<usize>;

    /// Whether the last `execute` ended on the stop condition.
    fn was_stopped(&self) -> bool;
}
