//! Placement items.
//!
//! An [`Item`] wraps one part footprint together with the manufacturing
//! attributes the scorer needs. Its outline is kept in local coordinates and
//! placed on the bed by rotating about the local origin and translating.
//!
//! The Placer works on the convex hull of the footprint grown by the item's
//! inflation (the "placement outline"). That outline depends on rotation and
//! inflation, so both are only changed through setters which rebuild it.

use platepack_core::geometry::{
    area, clean_polygon, convex_hull, ensure_ccw, offset_convex, rotate_polygon,
    translate_polygon, Point,
};
use platepack_core::{Error, Result, Transform2D, AABB2D};
use std::collections::BTreeSet;
use std::sync::Arc;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Stable handle of an item inside one arrangement run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ItemId(pub usize);

/// Bed vitrification margin used by temperature compatibility checks.
pub const VITRIFY_TEMP_DIFF_THRESHOLD: f64 = 10.0;

/// Filament temperature class of an item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum FilamentTempType {
    HighTemp,
    LowTemp,
    HighLowCompatible,
    #[default]
    Undefined,
}

impl FilamentTempType {
    /// High- and low-temperature filaments cannot share a plate.
    pub fn compatible_with(self, other: Self) -> bool {
        !matches!(
            (self, other),
            (Self::HighTemp, Self::LowTemp) | (Self::LowTemp, Self::HighTemp)
        )
    }
}

/// One placeable unit.
#[derive(Debug, Clone)]
pub struct Item {
    shape: Arc<[Point]>,
    hull: Arc<[Point]>,
    rotation: f64,
    inflation: f64,
    /// Rotated, inflated hull in local coordinates.
    outline: Vec<Point>,
    outline_bb: AABB2D,

    /// Current translation. The Placer writes it when committing.
    pub translation: Point,
    /// Assigned bed, `None` while unplaced.
    pub bin_id: Option<usize>,
    pub priority: i32,
    /// Placement sequence number, assigned when the item is committed.
    pub sequence: i64,
    pub extrude_ids: BTreeSet<i32>,
    pub height: f64,
    pub bed_temp: f64,
    pub print_temp: f64,
    pub vitrify_temp: f64,
    pub temp_type: FilamentTempType,
    /// Occupies space but is not a printed part.
    pub is_virtual: bool,
    pub is_wipe_tower: bool,
    pub is_extrusion_cali: bool,
    /// Static obstacle; never moved by the Placer.
    pub fixed: bool,
    /// Index of the caller record this item was built from.
    pub source: Option<usize>,
}

impl Item {
    /// Builds an item from a footprint outline.
    ///
    /// Repeated vertices are dropped and the winding is normalized to CCW.
    /// Outlines with fewer than three vertices or no area are rejected.
    pub fn new(shape: &[Point]) -> Result<Self> {
        let cleaned = ensure_ccw(&clean_polygon(shape));
        if cleaned.len() < 3 {
            return Err(Error::InvalidGeometry(format!(
                "outline has {} distinct vertices",
                cleaned.len()
            )));
        }
        if area(&cleaned) <= f64::EPSILON {
            return Err(Error::DegenerateGeometry("outline has no area".into()));
        }
        let hull = convex_hull(&cleaned)?;

        let mut item = Self {
            outline_bb: AABB2D::new(0.0, 0.0, 0.0, 0.0),
            outline: Vec::new(),
            shape: cleaned.into(),
            hull: hull.into(),
            rotation: 0.0,
            inflation: 0.0,
            translation: (0.0, 0.0),
            bin_id: None,
            priority: 0,
            sequence: -1,
            extrude_ids: BTreeSet::new(),
            height: 0.0,
            bed_temp: 0.0,
            print_temp: 0.0,
            vitrify_temp: 0.0,
            temp_type: FilamentTempType::Undefined,
            is_virtual: false,
            is_wipe_tower: false,
            is_extrusion_cali: false,
            fixed: false,
            source: None,
        };
        item.refresh_outline();
        Ok(item)
    }

    /// Rectangle of the given size with its min corner at the local origin.
    pub fn rectangle(width: f64, height: f64) -> Result<Self> {
        Self::new(&[(0.0, 0.0), (width, 0.0), (width, height), (0.0, height)])
    }

    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_height(mut self, height: f64) -> Self {
        self.height = height;
        self
    }

    pub fn with_bed_temp(mut self, bed_temp: f64) -> Self {
        self.bed_temp = bed_temp;
        self
    }

    pub fn with_temp_type(mut self, temp_type: FilamentTempType) -> Self {
        self.temp_type = temp_type;
        self
    }

    pub fn with_extruders<I: IntoIterator<Item = i32>>(mut self, ids: I) -> Self {
        self.extrude_ids = ids.into_iter().collect();
        self
    }

    pub fn with_inflation(mut self, inflation: f64) -> Self {
        self.set_inflation(inflation);
        self
    }

    pub fn with_rotation(mut self, rotation: f64) -> Self {
        self.set_rotation(rotation);
        self
    }

    pub fn with_translation(mut self, x: f64, y: f64) -> Self {
        self.translation = (x, y);
        self
    }

    /// Marks the item as a static obstacle on `bin`.
    pub fn fixed_on(mut self, bin: usize) -> Self {
        self.fixed = true;
        self.bin_id = Some(bin);
        self
    }

    pub fn virtual_object(mut self) -> Self {
        self.is_virtual = true;
        self
    }

    /// The footprint in local coordinates (CCW).
    pub fn shape(&self) -> &[Point] {
        &self.shape
    }

    /// Convex hull of the footprint in local coordinates.
    pub fn hull(&self) -> &[Point] {
        &self.hull
    }

    pub fn rotation(&self) -> f64 {
        self.rotation
    }

    pub fn inflation(&self) -> f64 {
        self.inflation
    }

    pub fn set_rotation(&mut self, rotation: f64) {
        self.rotation = rotation;
        self.refresh_outline();
    }

    pub fn set_inflation(&mut self, inflation: f64) {
        self.inflation = inflation;
        self.refresh_outline();
    }

    /// Adds `delta` to the current rotation.
    pub fn rotate(&mut self, delta: f64) {
        self.set_rotation(self.rotation + delta);
    }

    pub fn transform(&self) -> Transform2D {
        Transform2D::new(self.translation.0, self.translation.1, self.rotation)
    }

    /// Placement outline in local coordinates (rotation and inflation applied).
    pub fn local_outline(&self) -> &[Point] {
        &self.outline
    }

    /// Bounding box of the placement outline before translation.
    pub fn local_bounding_box(&self) -> AABB2D {
        self.outline_bb
    }

    /// Placement outline on the bed.
    pub fn transformed_shape(&self) -> Vec<Point> {
        translate_polygon(&self.outline, self.translation.0, self.translation.1)
    }

    /// The raw footprint on the bed, without inflation.
    pub fn transformed_footprint(&self) -> Vec<Point> {
        self.transform().transform_points(&self.shape)
    }

    /// Bounding box of the placement outline on the bed.
    pub fn bounding_box(&self) -> AABB2D {
        self.outline_bb
            .translate(self.translation.0, self.translation.1)
    }

    /// Area of the placement outline.
    pub fn area(&self) -> f64 {
        area(&self.outline)
    }

    /// Area of the raw footprint.
    pub fn footprint_area(&self) -> f64 {
        area(&self.shape)
    }

    /// Checks the temperature rules against another item on the same plate.
    pub fn temperature_compatible(&self, other: &Item) -> bool {
        if !self.temp_type.compatible_with(other.temp_type) {
            return false;
        }
        let exceeds = |bed: f64, vitrify: f64| {
            bed > 0.0 && vitrify > 0.0 && bed > vitrify + VITRIFY_TEMP_DIFF_THRESHOLD
        };
        !exceeds(self.bed_temp, other.vitrify_temp) && !exceeds(other.bed_temp, self.vitrify_temp)
    }

    /// Smallest extruder id, used as a sort key in batch mode.
    pub fn first_extruder(&self) -> i32 {
        self.extrude_ids.iter().next().copied().unwrap_or(i32::MAX)
    }

    fn refresh_outline(&mut self) {
        let rotated = rotate_polygon(&self.hull, self.rotation);
        self.outline = match offset_convex(&rotated, self.inflation) {
            Ok(outline) => outline,
            Err(e) => {
                log::debug!("inflation {} dropped: {}", self.inflation, e);
                rotated
            }
        };
        if let Some(bb) = AABB2D::from_points(&self.outline) {
            self.outline_bb = bb;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use std::f64::consts::PI;

    #[test]
    fn test_new_normalizes_winding() {
        let cw = vec![(0.0, 0.0), (0.0, 10.0), (10.0, 10.0), (10.0, 0.0)];
        let item = Item::new(&cw).unwrap();
        assert!(platepack_core::geometry::signed_area(item.shape()) > 0.0);
        assert_relative_eq!(item.footprint_area(), 100.0);
    }

    #[test]
    fn test_new_rejects_degenerate() {
        assert!(Item::new(&[(0.0, 0.0), (1.0, 1.0)]).is_err());
        assert!(Item::new(&[(0.0, 0.0), (1.0, 1.0), (2.0, 2.0)]).is_err());
        assert!(Item::new(&[(0.0, 0.0), (0.0, 0.0), (1.0, 0.0), (1.0, 0.0)]).is_err());
    }

    #[test]
    fn test_bounding_box_tracks_transform() {
        let mut item = Item::rectangle(20.0, 10.0).unwrap();
        item.translation = (5.0, 5.0);
        let bb = item.bounding_box();
        assert_relative_eq!(bb.min_x, 5.0);
        assert_relative_eq!(bb.max_x, 25.0);

        item.set_rotation(PI / 2.0);
        let bb = item.bounding_box();
        assert_relative_eq!(bb.width(), 10.0, epsilon = 1e-9);
        assert_relative_eq!(bb.height(), 20.0, epsilon = 1e-9);
    }

    #[test]
    fn test_inflation_grows_outline() {
        let mut item = Item::rectangle(10.0, 10.0).unwrap();
        item.set_inflation(1.0);
        assert!(item.bounding_box().width() >= 12.0);
        assert!(item.area() > 140.0);
        item.set_inflation(0.0);
        assert_relative_eq!(item.area(), 100.0, epsilon = 1e-9);
    }

    #[test]
    fn test_inset_past_inradius_keeps_hull() {
        let mut item = Item::rectangle(10.0, 10.0).unwrap().with_inflation(-6.0);
        assert_relative_eq!(item.area(), 100.0, epsilon = 1e-9);
        item.set_inflation(-2.0);
        assert_relative_eq!(item.area(), 36.0, epsilon = 1e-9);
    }

    #[test]
    fn test_temperature_compatibility() {
        let pla = Item::rectangle(1.0, 1.0)
            .unwrap()
            .with_temp_type(FilamentTempType::LowTemp)
            .with_bed_temp(60.0);
        let abs = Item::rectangle(1.0, 1.0)
            .unwrap()
            .with_temp_type(FilamentTempType::HighTemp)
            .with_bed_temp(100.0);
        let petg = Item::rectangle(1.0, 1.0)
            .unwrap()
            .with_temp_type(FilamentTempType::HighLowCompatible)
            .with_bed_temp(70.0);
        assert!(!pla.temperature_compatible(&abs));
        assert!(pla.temperature_compatible(&petg));
        assert!(abs.temperature_compatible(&petg));

        let mut soft = petg.clone();
        soft.vitrify_temp = 50.0;
        // 100 > 50 + 10
        assert!(!abs.temperature_compatible(&soft));
    }

    #[test]
    fn test_first_extruder() {
        let item = Item::rectangle(1.0, 1.0).unwrap().with_extruders([3, 1, 2]);
        assert_eq!(item.first_extruder(), 1);
        assert_eq!(Item::rectangle(1.0, 1.0).unwrap().first_extruder(), i32::MAX);
    }
}
