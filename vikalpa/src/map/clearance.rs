//! Footprint clearance queries.
//!
//! Every synthesizer asks the same question: can a circular robot of a
//! given radius stand here? [`OccupancyMap::is_free`] answers it by scanning
//! the cells whose centres fall inside the circle, treating unknown and
//! out-of-bounds cells as blocking.

use std::f32::consts::FRAC_1_SQRT_2;

use log::{debug, trace};

use super::OccupancyMap;
use crate::core::{GridCoord, Path, WorldPoint};

impl OccupancyMap {
    /// Check whether a circle of radius `clearance` around `point` is free.
    ///
    /// True iff `point` lies inside the map and every cell whose centre is
    /// within `clearance` of `point` (plus the cell containing it) is free.
    pub fn is_free(&self, point: WorldPoint, clearance: f32) -> bool {
        if !self.contains(point) {
            return false;
        }

        let center = self.world_to_grid(point);
        if !self.is_cell_free(center) {
            return false;
        }

        let clearance = clearance.max(0.0);
        let cells_radius = (clearance / self.resolution()).ceil() as i32;

        for dy in -cells_radius..=cells_radius {
            for dx in -cells_radius..=cells_radius {
                let coord = center + GridCoord::new(dx, dy);
                let cell_world = self.grid_to_world(coord);
                if cell_world.distance(&point) <= clearance && !self.is_cell_free(coord) {
                    return false;
                }
            }
        }

        true
    }

    /// Check whether a straight segment keeps `clearance` along its length.
    ///
    /// Samples at half-resolution steps, both endpoints included.
    pub fn is_segment_free(&self, from: WorldPoint, to: WorldPoint, clearance: f32) -> bool {
        let length = from.distance(&to);
        let step = self.resolution() * 0.5;
        let samples = (length / step).ceil().max(1.0) as usize;

        for i in 0..=samples {
            let t = i as f32 / samples as f32;
            if !self.is_free(from.lerp(&to, t), clearance) {
                trace!(
                    "[Clearance] segment ({:.2},{:.2})->({:.2},{:.2}) blocked at t={:.2}",
                    from.x, from.y, to.x, to.y, t
                );
                return false;
            }
        }

        true
    }

    /// Check every waypoint and every segment of a path.
    pub fn is_path_clear(&self, path: &Path, clearance: f32) -> bool {
        if path.waypoints.iter().any(|w| !self.is_free(w.position(), clearance)) {
            return false;
        }
        path.waypoints
            .windows(2)
            .all(|w| self.is_segment_free(w[0].position(), w[1].position(), clearance))
    }

    /// Distance from `point` to the nearest non-free cell centre, capped at `max_range`.
    ///
    /// Returns 0 when the point itself is out of bounds or not free.
    pub fn distance_to_wall(&self, point: WorldPoint, max_range: f32) -> f32 {
        let center = self.world_to_grid(point);
        if !self.is_cell_free(center) {
            return 0.0;
        }

        let cells_radius = (max_range / self.resolution()).ceil() as i32;
        let mut nearest = max_range;

        for dy in -cells_radius..=cells_radius {
            for dx in -cells_radius..=cells_radius {
                let coord = center + GridCoord::new(dx, dy);
                if self.is_cell_free(coord) {
                    continue;
                }
                let d = self.grid_to_world(coord).distance(&point);
                if d < nearest {
                    nearest = d;
                }
            }
        }

        nearest
    }

    /// Whether `point` is free but closer than `clearance` to a wall.
    #[inline]
    pub fn is_too_close_to_wall(&self, point: WorldPoint, clearance: f32) -> bool {
        self.contains(point) && self.is_cell_free(self.world_to_grid(point)) && !self.is_free(point, clearance)
    }

    /// Centres of all free cells, bottom row first.
    pub fn free_cells(&self) -> Vec<WorldPoint> {
        let mut free = Vec::new();
        for y in 0..self.height() as i32 {
            for x in 0..self.width() as i32 {
                let coord = GridCoord::new(x, y);
                if self.is_cell_free(coord) {
                    free.push(self.grid_to_world(coord));
                }
            }
        }
        free
    }
}

/// Pre-computed per-cell clearance for repeated segment queries.
///
/// A cell is marked safe when every point inside it passes
/// [`OccupancyMap::is_free`] with the mask's clearance, so a segment accepted
/// by the mask is also accepted by the exact check. The reverse does not hold
/// within half a cell diagonal of obstacles.
pub struct ClearanceMask<'a> {
    map: &'a OccupancyMap,
    clearance: f32,
    safe: Vec<bool>,
}

impl<'a> ClearanceMask<'a> {
    /// Build the mask. Cost is O(cells × footprint area), paid once.
    pub fn new(map: &'a OccupancyMap, clearance: f32) -> Self {
        let inflated = clearance.max(0.0) + map.resolution() * FRAC_1_SQRT_2;
        let (width, height) = (map.width(), map.height());

        let mut safe = vec![false; width * height];
        for y in 0..height {
            for x in 0..width {
                let coord = GridCoord::new(x as i32, y as i32);
                safe[y * width + x] = map.is_free(map.grid_to_world(coord), inflated);
            }
        }

        debug!(
            "[ClearanceMask] {} of {} cells safe at clearance {:.3}",
            safe.iter().filter(|&&s| s).count(),
            safe.len(),
            clearance
        );

        Self {
            map,
            clearance,
            safe,
        }
    }

    /// Clearance the mask was built for.
    #[inline]
    pub fn clearance(&self) -> f32 {
        self.clearance
    }

    /// Whether the cell containing `point` is safe.
    #[inline]
    pub fn is_safe(&self, point: WorldPoint) -> bool {
        let coord = self.map.world_to_grid(point);
        self.map.is_valid_coord(coord)
            && self.safe[coord.y as usize * self.map.width() + coord.x as usize]
    }

    /// Segment check: exact at both endpoints, mask lookups in between.
    pub fn is_segment_free(&self, from: WorldPoint, to: WorldPoint) -> bool {
        if !self.map.is_free(from, self.clearance) || !self.map.is_free(to, self.clearance) {
            return false;
        }
        let step = self.map.resolution() * 0.5;
        let samples = (from.distance(&to) / step).ceil().max(1.0) as usize;
        (1..samples).all(|i| {
            let t = i as f32 / samples as f32;
            self.is_safe(from.lerp(&to, t))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::ClearanceMask;
    use crate::core::{Path, Pose2D, WorldPoint};
    use crate::map::OccupancyMap;
    use approx::assert_relative_eq;

    /// 10m x 10m room with a wall along x = 5 from y = 0 to y = 6.
    fn walled_room() -> OccupancyMap {
        OccupancyMap::empty(200, 200, 0.05, Pose2D::new(0.0, 0.0, 0.0))
            .unwrap()
            .with_rect(WorldPoint::new(5.0, 0.0), WorldPoint::new(5.1, 6.0), 1.0)
    }

    #[test]
    fn test_is_free_respects_clearance() {
        let map = walled_room();
        assert!(map.is_free(WorldPoint::new(2.0, 2.0), 0.2));
        // 0.3m from the wall face at x=5.0
        assert!(map.is_free(WorldPoint::new(4.7, 2.0), 0.2));
        assert!(!map.is_free(WorldPoint::new(4.7, 2.0), 0.4));
        assert!(!map.is_free(WorldPoint::new(5.05, 2.0), 0.0));
    }

    #[test]
    fn test_is_free_out_of_bounds() {
        let map = walled_room();
        assert!(!map.is_free(WorldPoint::new(-1.0, 2.0), 0.0));
        // Inside, but the footprint pokes outside the map
        assert!(!map.is_free(WorldPoint::new(0.1, 2.0), 0.2));
        assert!(map.is_free(WorldPoint::new(0.1, 2.0), 0.0));
    }

    #[test]
    fn test_segment_through_wall() {
        let map = walled_room();
        let a = WorldPoint::new(2.0, 3.0);
        let b = WorldPoint::new(8.0, 3.0);
        assert!(!map.is_segment_free(a, b, 0.1));

        // Over the top of the wall
        let c = WorldPoint::new(2.0, 8.0);
        let d = WorldPoint::new(8.0, 8.0);
        assert!(map.is_segment_free(c, d, 0.2));
    }

    #[test]
    fn test_path_clear() {
        let map = walled_room();
        let ok = Path::new(vec![Pose2D::new(2.0, 2.0, 0.0), Pose2D::new(2.0, 8.0, 0.0)]);
        let blocked = Path::new(vec![Pose2D::new(2.0, 2.0, 0.0), Pose2D::new(8.0, 2.0, 0.0)]);
        assert!(map.is_path_clear(&ok, 0.2));
        assert!(!map.is_path_clear(&blocked, 0.2));
    }

    #[test]
    fn test_distance_to_wall() {
        let map = walled_room();
        let d = map.distance_to_wall(WorldPoint::new(4.0, 3.0), 2.0);
        assert_relative_eq!(d, 1.025, epsilon = 0.03);
        assert_eq!(map.distance_to_wall(WorldPoint::new(5.05, 3.0), 2.0), 0.0);
        assert!(map.is_too_close_to_wall(WorldPoint::new(4.8, 3.0), 0.5));
        assert!(!map.is_too_close_to_wall(WorldPoint::new(2.0, 3.0), 0.5));
    }

    #[test]
    fn test_free_cells() {
        let map = OccupancyMap::empty(4, 3, 1.0, Pose2D::default())
            .unwrap()
            .with_rect(WorldPoint::new(0.0, 0.0), WorldPoint::new(0.5, 0.5), 1.0);
        let free = map.free_cells();
        assert_eq!(free.len(), 11);
        assert_eq!(free[0], WorldPoint::new(1.5, 0.5));
    }

    #[test]
    fn test_mask_is_conservative() {
        let map = walled_room();
        let mask = ClearanceMask::new(&map, 0.2);

        // Far from the wall both agree
        assert!(mask.is_safe(WorldPoint::new(2.0, 2.0)));
        assert!(!mask.is_safe(WorldPoint::new(5.05, 2.0)));

        // Wherever the mask says safe, the exact check agrees
        for i in 0..200 {
            let p = WorldPoint::new(i as f32 * 0.05 + 0.01, 3.0);
            if mask.is_safe(p) {
                assert!(map.is_free(p, 0.2), "mask unsafe at {:?}", p);
            }
        }
    }

    #[test]
    fn test_mask_segments_match_exact_far_from_walls() {
        let map = walled_room();
        let mask = ClearanceMask::new(&map, 0.2);
        let a = WorldPoint::new(2.0, 3.0);
        assert!(!mask.is_segment_free(a, WorldPoint::new(8.0, 3.0)));
        assert!(mask.is_segment_free(WorldPoint::new(2.0, 8.0), WorldPoint::new(8.0, 8.0)));
        assert!(mask.is_segment_free(a, WorldPoint::new(2.0, 7.0)));
    }
}
