//! Grid-rasterized path synthesis.
//!
//! A square lattice of spacing `raster_size` (shifted by the raster offset)
//! is laid over the whole map. Lattice points that fail
//! `is_free(point, robot_diameter / 2)` are dropped; the rest are the
//! feasible points every path is built from.
//!
//! ## Single goal
//!
//! Every ordered pair `(a, b)` of distinct feasible points is a candidate
//! straight path. Pairs whose length is within tolerance and whose segment
//! keeps clearance are kept, giving exhaustive coverage of the map.
//!
//! ## Multiple goals
//!
//! ```text
//! search_radius = (path_length / raster_size) / (num_goal_poses + 1)   [lattice steps]
//! ```
//!
//! From each start the next waypoint is chosen greedily among unused
//! feasible points within `search_radius` of the previous one, picking the
//! point whose cumulative length lands closest to `path_length * j / n` for
//! step `j`. The final step gets a bonus reach of whatever budget is left,
//! so the total can be pulled onto the target. A start yields at most one
//! path, accepted iff its total length is within tolerance.
//!
//! The search is deterministic; no seed is involved.

use std::cmp::Ordering;

use log::debug;
use serde::{Deserialize, Serialize};
use serde_json::json;

use super::cache::{CacheKey, CachedValue, GenerationCache};
use crate::core::{Path, Pose2D, WorldPoint};
use crate::error::{Result, VariationError};
use crate::map::{ClearanceMask, OccupancyMap};

/// Cache kind label.
const CACHE_KIND: &str = "PathVariationRasterized";

/// Inputs that shape rasterized paths.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RasterPathParams {
    /// Lattice spacing in meters.
    pub raster_size: f32,
    /// Lattice shift along X.
    pub raster_offset_x: f32,
    /// Lattice shift along Y.
    pub raster_offset_y: f32,
    /// Target total length in meters.
    pub path_length: f32,
    /// Accepted deviation from `path_length`.
    pub path_length_tolerance: f32,
    /// Waypoints after the start.
    pub num_goal_poses: usize,
    /// Robot diameter; clearance is half of it.
    pub robot_diameter: f32,
}

impl RasterPathParams {
    /// Reject values the lattice search cannot work with.
    pub fn validate(&self) -> Result<()> {
        if !(self.raster_size.is_finite() && self.raster_size > 0.0) {
            return Err(VariationError::Config(format!(
                "raster_size must be positive, got {}",
                self.raster_size
            )));
        }
        if !(self.raster_offset_x.is_finite() && self.raster_offset_y.is_finite()) {
            return Err(VariationError::Config("raster offsets must be finite".to_string()));
        }
        if !(self.path_length.is_finite() && self.path_length > 0.0) {
            return Err(VariationError::Config(format!(
                "path_length must be positive, got {}",
                self.path_length
            )));
        }
        if !(self.path_length_tolerance >= 0.0) {
            return Err(VariationError::Config(format!(
                "path_length_tolerance must be non-negative, got {}",
                self.path_length_tolerance
            )));
        }
        if !(self.robot_diameter >= 0.0) {
            return Err(VariationError::Config(format!(
                "robot_diameter must be non-negative, got {}",
                self.robot_diameter
            )));
        }
        if self.num_goal_poses == 0 {
            return Err(VariationError::Config(
                "num_goal_poses must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// Clearance radius.
    #[inline]
    pub fn clearance(&self) -> f32 {
        self.robot_diameter * 0.5
    }

    /// Multi-goal search radius in lattice steps.
    #[inline]
    pub fn search_radius(&self) -> f32 {
        (self.path_length / self.raster_size) / (self.num_goal_poses as f32 + 1.0)
    }
}

/// A lattice point tagged with its feasibility.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct RasterPoint {
    pub pose: Pose2D,
    pub feasible: bool,
}

/// Result of one rasterized synthesis run.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RasterOutcome {
    /// Accepted paths, in start-major lattice order.
    pub paths: Vec<Path>,
    /// Feasible lattice points.
    pub feasible_points: usize,
    /// Candidate pairs (single goal) or starts (multi goal) examined.
    pub candidates_considered: usize,
}

/// Rasterized path synthesizer bound to one map and one parameter set.
pub struct RasterPathSynthesizer<'a> {
    map: &'a OccupancyMap,
    params: RasterPathParams,
    mask: ClearanceMask<'a>,
}

impl<'a> RasterPathSynthesizer<'a> {
    /// Create a synthesizer, validating the parameters.
    pub fn new(map: &'a OccupancyMap, params: RasterPathParams) -> Result<Self> {
        params.validate()?;
        let mask = ClearanceMask::new(map, params.clearance());
        Ok(Self { map, params, mask })
    }

    /// Parameters in use.
    #[inline]
    pub fn params(&self) -> &RasterPathParams {
        &self.params
    }

    // ========================================================================
    // Lattice
    // ========================================================================

    /// Every lattice point inside the map, bottom row first, tagged with feasibility.
    pub fn raster_points(&self) -> Vec<RasterPoint> {
        let (min, max) = self.map.bounds();
        let size = self.params.raster_size;
        let x0 = min.x + self.params.raster_offset_x.rem_euclid(size);
        let y0 = min.y + self.params.raster_offset_y.rem_euclid(size);
        let clearance = self.params.clearance();

        let mut points = Vec::new();
        let mut j = 0usize;
        loop {
            let y = y0 + j as f32 * size;
            if y >= max.y {
                break;
            }
            let mut i = 0usize;
            loop {
                let x = x0 + i as f32 * size;
                if x >= max.x {
                    break;
                }
                let p = WorldPoint::new(x, y);
                points.push(RasterPoint {
                    pose: Pose2D::from_position(p, 0.0),
                    feasible: self.map.is_free(p, clearance),
                });
                i += 1;
            }
            j += 1;
        }
        points
    }

    /// Feasible lattice positions. Fails if there are none.
    pub fn feasible_points(&self) -> Result<Vec<WorldPoint>> {
        let points: Vec<WorldPoint> = self
            .raster_points()
            .into_iter()
            .filter(|p| p.feasible)
            .map(|p| p.pose.position())
            .collect();

        if points.is_empty() {
            return Err(VariationError::Generation(format!(
                "all raster points occupied (raster_size {}, clearance {:.3})",
                self.params.raster_size,
                self.params.clearance()
            )));
        }
        Ok(points)
    }

    // ========================================================================
    // Synthesis
    // ========================================================================

    /// Synthesize all paths, bypassing any cache.
    ///
    /// With `start` given, only paths from that pose are built; it must be
    /// free but need not lie on the lattice.
    pub fn synthesize(&self, start: Option<Pose2D>) -> Result<RasterOutcome> {
        let points = self.feasible_points()?;

        let starts = match start {
            Some(pose) => {
                if !self.map.is_free(pose.position(), self.params.clearance()) {
                    return Err(VariationError::Generation(format!(
                        "start pose {} is not free at clearance {:.3}",
                        pose,
                        self.params.clearance()
                    )));
                }
                vec![pose.position()]
            }
            None => points.clone(),
        };

        let outcome = if self.params.num_goal_poses == 1 {
            self.single_goal(&starts, &points)
        } else {
            self.multi_goal(&starts, &points)
        };

        debug!(
            "[RasterPath] {} paths from {} feasible points ({} candidates)",
            outcome.paths.len(),
            outcome.feasible_points,
            outcome.candidates_considered
        );

        if outcome.paths.is_empty() {
            return Err(VariationError::Generation(format!(
                "no raster path of length {}±{} found among {} feasible points",
                self.params.path_length, self.params.path_length_tolerance, outcome.feasible_points
            )));
        }
        Ok(outcome)
    }

    /// Synthesize through the cache. Failures are cached too.
    pub fn synthesize_cached(
        &self,
        start: Option<Pose2D>,
        cache: &GenerationCache,
    ) -> Result<Vec<Path>> {
        let key = CacheKey::new(
            CACHE_KIND,
            &self.params,
            0,
            json!({
                "start": start,
                "map": self.map.fingerprint(),
            }),
        )?;

        let value = cache.get_or_insert_with(&key, || match self.synthesize(start) {
            Ok(outcome) => CachedValue::Paths {
                paths: outcome.paths,
            },
            Err(e) => CachedValue::failure(e),
        });

        match value.into_result()? {
            CachedValue::Paths { paths } => Ok(paths),
            other => Err(VariationError::Generation(format!(
                "cache entry has unexpected shape: {:?}",
                other
            ))),
        }
    }

    /// Exhaustive ordered pairs.
    fn single_goal(&self, starts: &[WorldPoint], points: &[WorldPoint]) -> RasterOutcome {
        let target = self.params.path_length;
        let tolerance = self.params.path_length_tolerance;
        let mut outcome = RasterOutcome {
            feasible_points: points.len(),
            ..RasterOutcome::default()
        };

        for a in starts {
            for b in points {
                if a == b {
                    continue;
                }
                outcome.candidates_considered += 1;

                if (a.distance(b) - target).abs() > tolerance {
                    continue;
                }
                if !self.mask.is_segment_free(*a, *b) {
                    continue;
                }
                let heading = a.angle_to(b);
                let path = Path::new(vec![
                    Pose2D::from_position(*a, heading),
                    Pose2D::from_position(*b, heading),
                ]);
                if path.length_within(target, tolerance) {
                    outcome.paths.push(path.with_validity(true));
                }
            }
        }

        outcome
    }

    /// Greedy search-radius walk from each start.
    fn multi_goal(&self, starts: &[WorldPoint], points: &[WorldPoint]) -> RasterOutcome {
        let target = self.params.path_length;
        let tolerance = self.params.path_length_tolerance;
        let n = self.params.num_goal_poses;
        let reach = self.params.search_radius() * self.params.raster_size;

        let mut outcome = RasterOutcome {
            feasible_points: points.len(),
            ..RasterOutcome::default()
        };

        for start in starts {
            outcome.candidates_considered += 1;

            let mut used = vec![false; points.len()];
            if let Some(idx) = points.iter().position(|p| p == start) {
                used[idx] = true;
            }

            let mut waypoints = vec![*start];
            let mut travelled = 0.0f32;

            for step in 1..=n {
                let step_target = target * step as f32 / n as f32;
                let step_reach = if step == n {
                    // Bonus: the last step may spend the whole remaining budget
                    reach.max(target - travelled + tolerance)
                } else {
                    reach
                };

                let prev = waypoints[waypoints.len() - 1];
                let Some((idx, d)) = self.pick_next(prev, points, &used, travelled, step_target, step_reach)
                else {
                    break;
                };
                used[idx] = true;
                travelled += d;
                waypoints.push(points[idx]);
            }

            if waypoints.len() != n + 1 {
                continue;
            }

            let path = Path::new(orient(&waypoints));
            if path.length_within(target, tolerance) {
                outcome.paths.push(path.with_validity(true));
            }
        }

        outcome
    }

    /// Closest-to-target unused point within reach that has a clear segment.
    fn pick_next(
        &self,
        prev: WorldPoint,
        points: &[WorldPoint],
        used: &[bool],
        travelled: f32,
        step_target: f32,
        reach: f32,
    ) -> Option<(usize, f32)> {
        let mut candidates: Vec<(f32, usize, f32)> = points
            .iter()
            .enumerate()
            .filter(|(idx, _)| !used[*idx])
            .filter_map(|(idx, p)| {
                let d = prev.distance(p);
                (d > 0.0 && d <= reach).then(|| ((travelled + d - step_target).abs(), idx, d))
            })
            .collect();

        candidates.sort_by(|a, b| {
            a.0.partial_cmp(&b.0)
                .unwrap_or(Ordering::Equal)
                .then(a.1.cmp(&b.1))
        });

        candidates
            .into_iter()
            .find(|&(_, idx, _)| self.mask.is_segment_free(prev, points[idx]))
            .map(|(_, idx, d)| (idx, d))
    }
}

/// Give every waypoint the heading of its incoming segment; the start faces the first goal.
fn orient(points: &[WorldPoint]) -> Vec<Pose2D> {
    points
        .iter()
        .enumerate()
        .map(|(i, p)| {
            let heading = if i == 0 {
                points.get(1).map(|next| p.angle_to(next)).unwrap_or(0.0)
            } else {
                points[i - 1].angle_to(p)
            };
            Pose2D::from_position(*p, heading)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    /// 5m x 5m open room.
    fn room() -> OccupancyMap {
        OccupancyMap::empty(50, 50, 0.1, Pose2D::default()).unwrap()
    }

    fn params() -> RasterPathParams {
        RasterPathParams {
            raster_size: 1.0,
            raster_offset_x: 0.5,
            raster_offset_y: 0.5,
            path_length: 2.0,
            path_length_tolerance: 0.01,
            num_goal_poses: 1,
            robot_diameter: 0.4,
        }
    }

    #[test]
    fn test_lattice_covers_map() {
        let map = room();
        let synth = RasterPathSynthesizer::new(&map, params()).unwrap();
        let points = synth.raster_points();
        assert_eq!(points.len(), 25);
        assert!(points.iter().all(|p| p.feasible));
        assert_eq!(points[0].pose.position(), WorldPoint::new(0.5, 0.5));
        assert_eq!(points[24].pose.position(), WorldPoint::new(4.5, 4.5));
    }

    #[test]
    fn test_offset_wraps_and_edges_are_infeasible() {
        let map = room();
        let mut p = params();
        p.raster_offset_x = 3.0;
        p.raster_offset_y = -1.0;
        let synth = RasterPathSynthesizer::new(&map, p).unwrap();
        let points = synth.raster_points();
        // Offsets reduce to 0, so the first column sits on the map edge
        assert_eq!(points.len(), 25);
        assert!(!points[0].feasible);
        assert_eq!(synth.feasible_points().unwrap().len(), 16);
    }

    #[test]
    fn test_all_occupied_is_generation_error() {
        let map = room().with_rect(WorldPoint::new(0.0, 0.0), WorldPoint::new(5.0, 5.0), 1.0);
        let synth = RasterPathSynthesizer::new(&map, params()).unwrap();
        assert!(matches!(synth.feasible_points(), Err(VariationError::Generation(_))));
        assert!(matches!(synth.synthesize(None), Err(VariationError::Generation(_))));
    }

    #[test]
    fn test_single_goal_exhaustive_pairs() {
        let map = room();
        let synth = RasterPathSynthesizer::new(&map, params()).unwrap();
        let outcome = synth.synthesize(None).unwrap();

        let k = outcome.feasible_points;
        assert_eq!(k, 25);
        assert_eq!(outcome.candidates_considered, k * (k - 1));
        // Pairs exactly two lattice steps apart along a row or column
        assert_eq!(outcome.paths.len(), 60);
        for path in &outcome.paths {
            assert!(path.valid);
            assert_eq!(path.len(), 2);
            assert_relative_eq!(path.length, 2.0, epsilon = 1e-5);
        }
    }

    #[test]
    fn test_start_pose_restricts_starts() {
        let map = room();
        let synth = RasterPathSynthesizer::new(&map, params()).unwrap();
        let start = Pose2D::new(2.5, 2.5, 0.0);
        let outcome = synth.synthesize(Some(start)).unwrap();

        assert_eq!(outcome.candidates_considered, 24);
        assert_eq!(outcome.paths.len(), 4);
        assert!(outcome.paths.iter().all(|p| p.waypoints[0].position() == start.position()));
    }

    #[test]
    fn test_wall_blocks_pairs() {
        // Wall along x in [2.4, 2.6] splits the room
        let map = room().with_rect(WorldPoint::new(2.4, 0.0), WorldPoint::new(2.6, 5.0), 1.0);
        let synth = RasterPathSynthesizer::new(&map, params()).unwrap();
        let outcome = synth.synthesize(None).unwrap();
        // Column x = 2.5 is gone; no path may cross the wall
        for path in &outcome.paths {
            let a = path.waypoints[0].x;
            let b = path.waypoints[1].x;
            assert!((a < 2.4) == (b < 2.4), "path crosses wall: {} -> {}", a, b);
        }
        assert!(!outcome.paths.is_empty());
    }

    #[test]
    fn test_multi_goal_tracks_target() {
        let map = OccupancyMap::empty(100, 100, 0.1, Pose2D::default()).unwrap();
        let p = RasterPathParams {
            raster_size: 0.5,
            raster_offset_x: 0.25,
            raster_offset_y: 0.25,
            path_length: 6.0,
            path_length_tolerance: 0.5,
            num_goal_poses: 2,
            robot_diameter: 0.4,
        };
        assert_relative_eq!(p.search_radius(), 4.0);
        let reach = p.search_radius() * p.raster_size;

        let synth = RasterPathSynthesizer::new(&map, p).unwrap();
        let outcome = synth.synthesize(None).unwrap();
        assert!(!outcome.paths.is_empty());
        assert_eq!(outcome.candidates_considered, outcome.feasible_points);

        for path in &outcome.paths {
            assert!(path.valid);
            assert_eq!(path.len(), 3);
            assert!(path.length_within(6.0, 0.5));
            // Only the final step may exceed the search radius
            assert!(path.waypoints[0].distance(&path.waypoints[1]) <= reach + 1e-4);
            for w in &path.waypoints {
                assert!(map.is_free(w.position(), 0.2));
            }
        }
    }

    #[test]
    fn test_multi_goal_start_pose_restricts_starts() {
        let map = OccupancyMap::empty(100, 100, 0.1, Pose2D::default()).unwrap();
        let p = RasterPathParams {
            raster_size: 0.5,
            raster_offset_x: 0.25,
            raster_offset_y: 0.25,
            path_length: 6.0,
            path_length_tolerance: 0.5,
            num_goal_poses: 2,
            robot_diameter: 0.4,
        };
        let synth = RasterPathSynthesizer::new(&map, p).unwrap();
        let start = Pose2D::new(5.0, 5.0, 0.0);
        let outcome = synth.synthesize(Some(start)).unwrap();

        assert_eq!(outcome.candidates_considered, 1);
        assert_eq!(outcome.paths.len(), 1);
        let path = &outcome.paths[0];
        assert_eq!(path.waypoints[0].position(), start.position());
        assert_eq!(path.len(), 3);
        assert!(path.length_within(6.0, 0.5));
    }

    #[test]
    fn test_cached_failure_matches_fresh() {
        let map = room().with_rect(WorldPoint::new(0.0, 0.0), WorldPoint::new(5.0, 5.0), 1.0);
        let cache = GenerationCache::new();
        let synth = RasterPathSynthesizer::new(&map, params()).unwrap();

        let fresh = synth.synthesize(None).unwrap_err();
        let stored = synth.synthesize_cached(None, &cache).unwrap_err();
        let replayed = synth.synthesize_cached(None, &cache).unwrap_err();
        assert_eq!(stored, fresh);
        assert_eq!(replayed, fresh);
        assert_eq!(cache.stats().hits, 1);
    }

    #[test]
    fn test_cache_hit_is_identical() {
        let map = room();
        let cache = GenerationCache::new();
        let synth = RasterPathSynthesizer::new(&map, params()).unwrap();
        let first = synth.synthesize_cached(None, &cache).unwrap();
        let second = synth.synthesize_cached(None, &cache).unwrap();
        assert_eq!(first, second);
        assert_eq!(first, synth.synthesize(None).unwrap().paths);
        assert_eq!(cache.stats().hits, 1);
    }

    #[test]
    fn test_invalid_params() {
        let map = room();
        let mut p = params();
        p.raster_size = 0.0;
        assert!(RasterPathSynthesizer::new(&map, p).is_err());
        let mut p = params();
        p.num_goal_poses = 0;
        assert!(RasterPathSynthesizer::new(&map, p).is_err());
    }
}
