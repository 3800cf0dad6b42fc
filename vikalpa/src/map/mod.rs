//! Occupancy map model.
//!
//! An [`OccupancyMap`] owns a row-major grid of occupancy probabilities in
//! `[0, 1]` (or [`UNKNOWN`]). Row 0 is the bottom of the world, so cell
//! `(x, y)` covers `origin + [x, x+1) * resolution` horizontally and
//! `origin + [y, y+1) * resolution` vertically.
//!
//! ## Cell classification
//!
//! | Probability | Class |
//! |-------------|-------|
//! | `p < free_thresh` | free |
//! | `p > occupied_thresh` | occupied |
//! | otherwise, or [`UNKNOWN`] | unknown (not traversable) |
//!
//! Clearance queries live in [`clearance`]; file I/O lives in
//! [`crate::io`].

pub mod clearance;

pub use clearance::ClearanceMask;

use sha2::{Digest, Sha256};

use crate::core::{GridCoord, Pose2D, WorldPoint};
use crate::error::{Result, VariationError};

/// Sentinel cell value for unknown space.
pub const UNKNOWN: f32 = -1.0;

/// Default ROS `occupied_thresh`.
pub const DEFAULT_OCCUPIED_THRESH: f32 = 0.65;

/// Default ROS `free_thresh`.
pub const DEFAULT_FREE_THRESH: f32 = 0.196;

/// Thresholds that classify cell probabilities.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Thresholds {
    /// Probabilities strictly below this are free.
    pub free: f32,
    /// Probabilities strictly above this are occupied.
    pub occupied: f32,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            free: DEFAULT_FREE_THRESH,
            occupied: DEFAULT_OCCUPIED_THRESH,
        }
    }
}

/// 2D occupancy grid, read-only after construction.
#[derive(Clone, Debug, PartialEq)]
pub struct OccupancyMap {
    width: usize,
    height: usize,
    resolution: f32,
    inv_resolution: f32,
    origin: Pose2D,
    thresholds: Thresholds,
    cells: Vec<f32>,
    fingerprint: String,
}

impl OccupancyMap {
    /// Create a map from raw cells (row-major, bottom row first).
    ///
    /// Fails with a map error if the resolution is not positive, a dimension
    /// is zero, the cell count does not match, a cell is outside `[0, 1]`
    /// (other than [`UNKNOWN`]) or the thresholds are not ordered.
    pub fn new(
        width: usize,
        height: usize,
        resolution: f32,
        origin: Pose2D,
        thresholds: Thresholds,
        cells: Vec<f32>,
    ) -> Result<Self> {
        if !(resolution.is_finite() && resolution > 0.0) {
            return Err(VariationError::Map(format!(
                "resolution must be positive, got {}",
                resolution
            )));
        }
        if width == 0 || height == 0 {
            return Err(VariationError::Map(format!(
                "map dimensions must be non-zero, got {}x{}",
                width, height
            )));
        }
        if cells.len() != width * height {
            return Err(VariationError::Map(format!(
                "expected {} cells for {}x{} map, got {}",
                width * height,
                width,
                height,
                cells.len()
            )));
        }
        if let Some(bad) = cells
            .iter()
            .find(|&&c| c != UNKNOWN && !(0.0..=1.0).contains(&c))
        {
            return Err(VariationError::Map(format!(
                "cell probability {} outside [0, 1]",
                bad
            )));
        }
        if !(0.0..=1.0).contains(&thresholds.free)
            || !(0.0..=1.0).contains(&thresholds.occupied)
            || thresholds.free > thresholds.occupied
        {
            return Err(VariationError::Map(format!(
                "invalid thresholds: free {} occupied {}",
                thresholds.free, thresholds.occupied
            )));
        }

        let mut map = Self {
            width,
            height,
            resolution,
            inv_resolution: 1.0 / resolution,
            origin,
            thresholds,
            cells,
            fingerprint: String::new(),
        };
        map.fingerprint = map.compute_fingerprint();
        Ok(map)
    }

    /// Create an all-free map.
    pub fn empty(width: usize, height: usize, resolution: f32, origin: Pose2D) -> Result<Self> {
        Self::new(
            width,
            height,
            resolution,
            origin,
            Thresholds::default(),
            vec![0.0; width * height],
        )
    }

    /// Return a copy with every cell inside the world-space rectangle set to `value`.
    ///
    /// Used to carve walls and furniture into synthetic maps.
    pub fn with_rect(mut self, min: WorldPoint, max: WorldPoint, value: f32) -> Self {
        let lo = self.world_to_grid(min);
        let hi = self.world_to_grid(max);
        for y in lo.y.max(0)..=hi.y.min(self.height as i32 - 1) {
            for x in lo.x.max(0)..=hi.x.min(self.width as i32 - 1) {
                let idx = y as usize * self.width + x as usize;
                self.cells[idx] = value;
            }
        }
        self.fingerprint = self.compute_fingerprint();
        self
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    /// Width in cells.
    #[inline]
    pub fn width(&self) -> usize {
        self.width
    }

    /// Height in cells.
    #[inline]
    pub fn height(&self) -> usize {
        self.height
    }

    /// Meters per cell.
    #[inline]
    pub fn resolution(&self) -> f32 {
        self.resolution
    }

    /// World pose of the bottom-left corner of cell (0, 0).
    #[inline]
    pub fn origin(&self) -> Pose2D {
        self.origin
    }

    /// Classification thresholds.
    #[inline]
    pub fn thresholds(&self) -> Thresholds {
        self.thresholds
    }

    /// Raw cells, row-major with the bottom row first.
    #[inline]
    pub fn cells(&self) -> &[f32] {
        &self.cells
    }

    /// World-space bounds as (min, max) corners.
    pub fn bounds(&self) -> (WorldPoint, WorldPoint) {
        let min = WorldPoint::new(self.origin.x, self.origin.y);
        let max = WorldPoint::new(
            self.origin.x + self.width as f32 * self.resolution,
            self.origin.y + self.height as f32 * self.resolution,
        );
        (min, max)
    }

    // ========================================================================
    // Coordinates
    // ========================================================================

    /// Convert a world point to the cell containing it (may be out of bounds).
    #[inline]
    pub fn world_to_grid(&self, point: WorldPoint) -> GridCoord {
        GridCoord::new(
            ((point.x - self.origin.x) * self.inv_resolution).floor() as i32,
            ((point.y - self.origin.y) * self.inv_resolution).floor() as i32,
        )
    }

    /// World position of a cell centre.
    #[inline]
    pub fn grid_to_world(&self, coord: GridCoord) -> WorldPoint {
        WorldPoint::new(
            self.origin.x + (coord.x as f32 + 0.5) * self.resolution,
            self.origin.y + (coord.y as f32 + 0.5) * self.resolution,
        )
    }

    /// Check if a cell coordinate lies inside the grid.
    #[inline]
    pub fn is_valid_coord(&self, coord: GridCoord) -> bool {
        coord.x >= 0 && coord.y >= 0 && (coord.x as usize) < self.width && (coord.y as usize) < self.height
    }

    /// Check if a world point lies inside the map.
    #[inline]
    pub fn contains(&self, point: WorldPoint) -> bool {
        self.is_valid_coord(self.world_to_grid(point))
    }

    /// Occupancy probability of a cell, `None` if out of bounds.
    #[inline]
    pub fn cell(&self, coord: GridCoord) -> Option<f32> {
        if self.is_valid_coord(coord) {
            Some(self.cells[coord.y as usize * self.width + coord.x as usize])
        } else {
            None
        }
    }

    /// Whether a single cell is known free. Out of bounds is not free.
    #[inline]
    pub fn is_cell_free(&self, coord: GridCoord) -> bool {
        match self.cell(coord) {
            Some(p) => p != UNKNOWN && p < self.thresholds.free,
            None => false,
        }
    }

    /// Whether a single cell is occupied. Out of bounds counts as occupied.
    #[inline]
    pub fn is_cell_occupied(&self, coord: GridCoord) -> bool {
        match self.cell(coord) {
            Some(p) => p != UNKNOWN && p > self.thresholds.occupied,
            None => true,
        }
    }

    /// Stable content hash, hex encoded.
    ///
    /// Two maps with equal fingerprints answer every query identically.
    /// Path and obstacle cache keys include it.
    #[inline]
    pub fn fingerprint(&self) -> &str {
        &self.fingerprint
    }

    fn compute_fingerprint(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update((self.width as u64).to_le_bytes());
        hasher.update((self.height as u64).to_le_bytes());
        for v in [
            self.resolution,
            self.origin.x,
            self.origin.y,
            self.origin.yaw,
            self.thresholds.free,
            self.thresholds.occupied,
        ] {
            hasher.update(v.to_bits().to_le_bytes());
        }
        for c in &self.cells {
            hasher.update(c.to_bits().to_le_bytes());
        }
        hasher
            .finalize()
            .iter()
            .map(|b| format!("{:02x}", b))
            .collect()
    }
}
