//! Arrangement run summary.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Outcome of one arrangement run.
///
/// Per-item results are written into the caller's records; this is the
/// aggregate view.
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ArrangeSummary {
    /// Number of movable items that received a bed.
    pub placed: usize,

    /// Caller indices of items left without a bed.
    pub unplaced: Vec<usize>,

    /// Number of beds holding at least one movable item.
    pub beds_used: usize,

    /// Whether the stop condition ended the run early.
    pub cancelled: bool,

    /// Computation time in milliseconds.
    pub computation_time_ms: u64,
}

impl ArrangeSummary {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true if every movable item was placed.
    pub fn all_placed(&self) -> bool {
        self.unplaced.is_empty()
    }

    pub fn unplaced_count(&self) -> usize {
        self.unplaced.len()
    }

    /// Returns true if the run completed without being stopped.
    pub fn completed_normally(&self) -> bool {
        !self.cancelled
    }

    /// Records an unplaced item, ignoring repeats.
    pub fn mark_unplaced(&mut self, index: usize) {
        if !self.unplaced.contains(&index) {
            self.unplaced.push(index);
        }
    }
}
