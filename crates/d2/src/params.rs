//! Arrangement configuration.

use crate::arrange::ArrangePolygon;
use crate::scorer::ScoreWeights;
use std::fmt;
use std::sync::Arc;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Called once per committed placement with the updated caller record.
pub type PackedCallback = Arc<dyn Fn(&ArrangePolygon) + Send + Sync>;
/// Called after every commit with the number of items still to place.
pub type ProgressCallback = Arc<dyn Fn(usize) + Send + Sync>;
/// Polled between items; returning `true` stops the run.
pub type StopCondition = Arc<dyn Fn() -> bool + Send + Sync>;
/// Called with a message when an item cannot be placed anywhere.
pub type UnfitCallback = Arc<dyn Fn(&str) + Send + Sync>;

/// Caller hooks. All of them are optional and must be cheap.
#[derive(Clone, Default)]
pub struct ArrangeCallbacks {
    pub on_packed: Option<PackedCallback>,
    pub progress: Option<ProgressCallback>,
    pub stop_condition: Option<StopCondition>,
    pub unfit: Option<UnfitCallback>,
}

impl fmt::Debug for ArrangeCallbacks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ArrangeCallbacks")
            .field("on_packed", &self.on_packed.is_some())
            .field("progress", &self.progress.is_some())
            .field("stop_condition", &self.stop_condition.is_some())
            .field("unfit", &self.unfit.is_some())
            .finish()
    }
}

/// Settings for one arrangement run. Read-only once the run starts.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ArrangeParams {
    /// Minimum gap between parts; `0` means "derive from brim width".
    pub min_obj_distance: f64,

    /// Distance the usable bed shrinks toward its center on each axis.
    pub bed_shrink_x: f64,
    pub bed_shrink_y: f64,

    /// Gap between the outermost brim and the skirt.
    pub brim_skirt_distance: f64,

    /// Print objects one at a time instead of layer by layer.
    pub is_seq_print: bool,

    pub allow_rotations: bool,

    /// Search thoroughness in `[0, 1]`.
    pub accuracy: f64,

    /// Score candidate positions on worker threads.
    pub parallel: bool,

    /// Center the finished pile on the bed.
    pub align_center: bool,

    /// Pre-rotate elongated parts along Y.
    pub align_to_y_axis: bool,

    /// Pile anchor when not centering, as a fraction of the bed bounding box.
    pub best_object_pos: (f64, f64),

    /// Regions nothing may be placed on.
    pub excluded_regions: Vec<ArrangePolygon>,

    /// Regions to avoid (extrusion calibration areas).
    pub nonpreferred_regions: Vec<ArrangePolygon>,

    /// Radius of the print head assembly that must clear finished parts.
    pub clearance_radius: f64,
    /// Height of the X gantry rod above the bed. Zero or less means no limit.
    pub clearance_height_to_rod: f64,
    /// Height of the enclosure lid above the bed. Zero or less means no limit.
    pub clearance_height_to_lid: f64,

    /// Maximum printable part height.
    pub printable_height: f64,

    /// All parts are shorter than the rod clearance.
    pub all_objects_are_short: bool,

    /// Extra distance reserved around each part's own skirt.
    pub object_skirt_offset: f64,

    pub allow_multi_materials_on_same_plate: bool,

    pub avoid_extrusion_cali_region: bool,

    /// Tuned scoring constants.
    pub weights: ScoreWeights,

    #[cfg_attr(feature = "serde", serde(skip))]
    pub callbacks: ArrangeCallbacks,
}

impl Default for ArrangeParams {
    fn default() -> Self {
        Self {
            min_obj_distance: 0.0,
            bed_shrink_x: 0.0,
            bed_shrink_y: 0.0,
            brim_skirt_distance: 0.0,
            is_seq_print: false,
            allow_rotations: false,
            accuracy: 0.65,
            parallel: true,
            align_center: true,
            align_to_y_axis: false,
            best_object_pos: (0.5, 0.5),
            excluded_regions: Vec::new(),
            nonpreferred_regions: Vec::new(),
            clearance_radius: 0.0,
            clearance_height_to_rod: 0.0,
            clearance_height_to_lid: 0.0,
            printable_height: 256.0,
            all_objects_are_short: false,
            object_skirt_offset: 0.0,
            allow_multi_materials_on_same_plate: true,
            avoid_extrusion_cali_region: true,
            weights: ScoreWeights::default(),
            callbacks: ArrangeCallbacks::default(),
        }
    }
}

impl ArrangeParams {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_min_obj_distance(mut self, distance: f64) -> Self {
        self.min_obj_distance = distance;
        self
    }

    pub fn with_bed_shrink(mut self, x: f64, y: f64) -> Self {
        self.bed_shrink_x = x;
        self.bed_shrink_y = y;
        self
    }

    pub fn with_seq_print(mut self, enabled: bool) -> Self {
        self.is_seq_print = enabled;
        self
    }

    pub fn with_rotations(mut self, enabled: bool) -> Self {
        self.allow_rotations = enabled;
        self
    }

    pub fn with_accuracy(mut self, accuracy: f64) -> Self {
        self.accuracy = accuracy.clamp(0.0, 1.0);
        self
    }

    pub fn with_parallel(mut self, enabled: bool) -> Self {
        self.parallel = enabled;
        self
    }

    pub fn with_align_center(mut self, enabled: bool) -> Self {
        self.align_center = enabled;
        self
    }

    pub fn with_align_to_y_axis(mut self, enabled: bool) -> Self {
        self.align_to_y_axis = enabled;
        self
    }

    pub fn with_best_object_pos(mut self, fx: f64, fy: f64) -> Self {
        self.best_object_pos = (fx, fy);
        self
    }

    pub fn with_excluded_regions(mut self, regions: Vec<ArrangePolygon>) -> Self {
        self.excluded_regions = regions;
        self
    }

    pub fn with_nonpreferred_regions(mut self, regions: Vec<ArrangePolygon>) -> Self {
        self.nonpreferred_regions = regions;
        self
    }

    /// Sets the tool-head clearance used by sequential printing.
    pub fn with_clearance(mut self, radius: f64, height_to_rod: f64, height_to_lid: f64) -> Self {
        self.clearance_radius = radius;
        self.clearance_height_to_rod = height_to_rod;
        self.clearance_height_to_lid = height_to_lid;
        self
    }

    pub fn with_printable_height(mut self, height: f64) -> Self {
        self.printable_height = height;
        self
    }

    pub fn with_multi_materials(mut self, allowed: bool) -> Self {
        self.allow_multi_materials_on_same_plate = allowed;
        self
    }

    pub fn with_weights(mut self, weights: ScoreWeights) -> Self {
        self.weights = weights;
        self
    }

    pub fn on_packed<F>(mut self, f: F) -> Self
    where
        F: Fn(&ArrangePolygon) + Send + Sync + 'static,
    {
        self.callbacks.on_packed = Some(Arc::new(f));
        self
    }

    pub fn on_progress<F>(mut self, f: F) -> Self
    where
        F: Fn(usize) + Send + Sync + 'static,
    {
        self.callbacks.progress = Some(Arc::new(f));
        self
    }

    pub fn with_stop_condition<F>(mut self, f: F) -> Self
    where
        F: Fn() -> bool + Send + Sync + 'static,
    {
        self.callbacks.stop_condition = Some(Arc::new(f));
        self
    }

    pub fn on_unfit<F>(mut self, f: F) -> Self
    where
        F: Fn(&str) + Send + Sync + 'static,
    {
        self.callbacks.unfit = Some(Arc::new(f));
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};

    #[test]
    fn test_builder() {
        let params = ArrangeParams::new()
            .with_min_obj_distance(6.0)
            .with_seq_print(true)
            .with_accuracy(3.0)
            .with_clearance(35.0, 20.0, 120.0);
        assert_eq!(params.min_obj_distance, 6.0);
        assert!(params.is_seq_print);
        assert_eq!(params.accuracy, 1.0);
        assert_eq!(params.clearance_height_to_rod, 20.0);
    }

    #[test]
    fn test_stop_condition() {
        let flag = Arc::new(AtomicBool::new(false));
        let f = flag.clone();
        let params = ArrangeParams::new().with_stop_condition(move || f.load(Ordering::Relaxed));
        let stop = params.callbacks.stop_condition.clone().unwrap();
        assert!(!stop());
        flag.store(true, Ordering::Relaxed);
        assert!(stop());
        assert!(ArrangeCallbacks::default().stop_condition.is_none());
    }

    #[test]
    fn test_callbacks_debug_hides_closures() {
        let params = ArrangeParams::new().on_progress(|_| {});
        let text = format!("{:?}", params.callbacks);
        assert!(text.contains("progress: true"));
        assert!(text.contains("on_packed: false"));
    }
}
