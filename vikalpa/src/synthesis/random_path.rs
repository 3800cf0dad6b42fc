//! Random waypoint path synthesis.
//!
//! Each requested path runs a small state machine:
//!
//! ```text
//!   START ──► EXTEND ──► VALIDATE ──► ACCEPT
//!                ▲           │
//!                └─ retry ◄──┘ (until max_path_attempts) ──► REJECT
//! ```
//!
//! - **START** uses the given start pose, or draws a free cell when none is given.
//! - **EXTEND** adds `num_goal_poses` waypoints. Intermediate steps take a
//!   share of the remaining length budget at a random heading; the last
//!   step spends exactly what is left, so straight-line paths land on the
//!   target length.
//! - **VALIDATE** re-checks length tolerance and clearance of every
//!   waypoint and segment.
//!
//! Attempt `a` of path `i` draws from its own stream seeded with
//! `seed + i * max_path_attempts + a`, so a path does not depend on which
//! other paths were generated before it.

use std::f32::consts::PI;

use log::{debug, trace};
use rand::Rng;
use serde::{Deserialize, Serialize};
use serde_json::json;

use super::cache::{CacheKey, CachedValue, GenerationCache};
use crate::config::SynthesisLimits;
use crate::core::{Path, Pose2D, WorldPoint};
use crate::error::{Result, VariationError};
use crate::map::{ClearanceMask, OccupancyMap};
use crate::seed::{VariationRng, path_attempt_seed, rng_from_seed};

/// Cache kind label.
const CACHE_KIND: &str = "PathVariationRandom";

/// Slack for f32 round-off when re-measuring sampled step lengths.
const DISTANCE_EPSILON: f32 = 1e-4;

/// Inputs that shape a random path.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RandomPathParams {
    /// Target total length in meters.
    pub path_length: f32,
    /// Accepted deviation from `path_length`.
    pub path_length_tolerance: f32,
    /// Minimum distance between consecutive waypoints.
    pub min_distance: f32,
    /// Waypoints after the start.
    pub num_goal_poses: usize,
    /// Robot diameter; clearance is half of it.
    pub robot_diameter: f32,
    /// Base seed.
    pub seed: u64,
}

impl RandomPathParams {
    /// Reject values no search could satisfy.
    pub fn validate(&self) -> Result<()> {
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
        if !(self.min_distance >= 0.0) {
            return Err(VariationError::Config(format!(
                "min_distance must be non-negative, got {}",
                self.min_distance
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
        let minimum = self.min_distance * self.num_goal_poses as f32;
        if minimum > self.path_length + self.path_length_tolerance {
            return Err(VariationError::Config(format!(
                "{} goals at min_distance {} cannot fit in path_length {}",
                self.num_goal_poses, self.min_distance, self.path_length
            )));
        }
        Ok(())
    }

    /// Clearance radius.
    #[inline]
    pub fn clearance(&self) -> f32 {
        self.robot_diameter * 0.5
    }
}

/// An accepted path and the attempt that produced it.
#[derive(Clone, Debug, PartialEq)]
pub struct PathOutcome {
    pub path: Path,
    /// 1-based attempt count.
    pub attempts: u32,
}

/// Random path synthesizer bound to one map and one parameter set.
pub struct RandomPathSynthesizer<'a> {
    map: &'a OccupancyMap,
    params: RandomPathParams,
    limits: SynthesisLimits,
    mask: ClearanceMask<'a>,
}

impl<'a> RandomPathSynthesizer<'a> {
    /// Create a synthesizer, validating the parameters.
    pub fn new(
        map: &'a OccupancyMap,
        params: RandomPathParams,
        limits: SynthesisLimits,
    ) -> Result<Self> {
        params.validate()?;
        let mask = ClearanceMask::new(map, params.clearance());
        Ok(Self {
            map,
            params,
            limits,
            mask,
        })
    }

    /// Parameters in use.
    #[inline]
    pub fn params(&self) -> &RandomPathParams {
        &self.params
    }

    /// Synthesize path `path_index`, bypassing any cache.
    ///
    /// Fails with a generation error when no attempt within
    /// `max_path_attempts` produces a valid path, or immediately when a
    /// given start pose is not free.
    pub fn synthesize(&self, start: Option<Pose2D>, path_index: usize) -> Result<PathOutcome> {
        let clearance = self.params.clearance();

        if let Some(start) = start
            && !self.map.is_free(start.position(), clearance)
        {
            return Err(VariationError::Generation(format!(
                "start pose {} is not free at clearance {:.3}",
                start, clearance
            )));
        }

        let free_cells = if start.is_none() {
            let cells = self.map.free_cells();
            if cells.is_empty() {
                return Err(VariationError::Generation(
                    "map has no free cells for a start pose".to_string(),
                ));
            }
            cells
        } else {
            Vec::new()
        };

        let max_attempts = self.limits.max_path_attempts;
        for attempt in 0..max_attempts {
            let seed = path_attempt_seed(self.params.seed, path_index, attempt, max_attempts);
            let mut rng = rng_from_seed(seed);

            let Some(start) = start.or_else(|| self.sample_start(&free_cells, &mut rng)) else {
                trace!("[RandomPath] path {} attempt {}: no free start", path_index, attempt);
                continue;
            };

            let Some(waypoints) = self.extend(start, &mut rng) else {
                trace!("[RandomPath] path {} attempt {}: extend failed", path_index, attempt);
                continue;
            };

            let path = Path::new(waypoints);
            if self.validate(&path) {
                debug!(
                    "[RandomPath] path {} accepted after {} attempts (length {:.3})",
                    path_index,
                    attempt + 1,
                    path.length
                );
                return Ok(PathOutcome {
                    path: path.with_validity(true),
                    attempts: attempt + 1,
                });
            }
            trace!(
                "[RandomPath] path {} attempt {}: rejected (length {:.3})",
                path_index, attempt, path.length
            );
        }

        debug!("[RandomPath] FAILED: path {} after {} attempts", path_index, max_attempts);
        Err(VariationError::Generation(format!(
            "no valid path of length {}±{} found after {} attempts",
            self.params.path_length, self.params.path_length_tolerance, max_attempts
        )))
    }

    /// Synthesize path `path_index` through the cache.
    ///
    /// Failures are cached too, so a hit replays the same error.
    pub fn synthesize_cached(
        &self,
        start: Option<Pose2D>,
        path_index: usize,
        cache: &GenerationCache,
    ) -> Result<PathOutcome> {
        let key = CacheKey::new(
            CACHE_KIND,
            &self.params,
            self.params.seed,
            json!({
                "start": start,
                "path_index": path_index,
                "map": self.map.fingerprint(),
                "max_path_attempts": self.limits.max_path_attempts,
                "max_waypoint_samples": self.limits.max_waypoint_samples,
            }),
        )?;

        let value = cache.get_or_insert_with(&key, || match self.synthesize(start, path_index) {
            Ok(outcome) => CachedValue::Path {
                path: outcome.path,
                attempts: outcome.attempts,
            },
            Err(e) => CachedValue::failure(e),
        });

        match value.into_result()? {
            CachedValue::Path { path, attempts } => Ok(PathOutcome { path, attempts }),
            other => Err(VariationError::Generation(format!(
                "cache entry has unexpected shape: {:?}",
                other
            ))),
        }
    }

    // ========================================================================
    // State machine steps
    // ========================================================================

    /// START: draw a free cell centre with full clearance.
    fn sample_start(&self, free_cells: &[WorldPoint], rng: &mut VariationRng) -> Option<Pose2D> {
        let clearance = self.params.clearance();
        for _ in 0..self.limits.max_waypoint_samples {
            let p = free_cells[rng.random_range(0..free_cells.len())];
            if self.map.is_free(p, clearance) {
                return Some(Pose2D::from_position(p, random_yaw(rng)));
            }
        }
        None
    }

    /// EXTEND: append `num_goal_poses` waypoints, or give up.
    fn extend(&self, start: Pose2D, rng: &mut VariationRng) -> Option<Vec<Pose2D>> {
        let n = self.params.num_goal_poses;
        let min_d = self.params.min_distance;
        let mut waypoints = Vec::with_capacity(n + 1);
        waypoints.push(start);
        let mut travelled = 0.0f32;

        for i in 0..n {
            let goals_left = n - i;
            let remaining = self.params.path_length - travelled;
            let prev = waypoints[waypoints.len() - 1].position();

            let (lo, hi) = if goals_left == 1 {
                // Final goal spends the rest of the budget
                (remaining, remaining)
            } else {
                let share = remaining / goals_left as f32;
                let hi = remaining - min_d * (goals_left - 1) as f32;
                ((0.5 * share).max(min_d), (1.5 * share).min(hi))
            };
            if lo < min_d || hi < lo || hi <= 0.0 {
                return None;
            }

            let next = self.sample_waypoint(prev, lo, hi, rng)?;
            travelled += prev.distance(&next.position());
            waypoints.push(next);
        }

        Some(waypoints)
    }

    /// Draw a reachable free waypoint at distance `[lo, hi]` from `prev`.
    fn sample_waypoint(
        &self,
        prev: WorldPoint,
        lo: f32,
        hi: f32,
        rng: &mut VariationRng,
    ) -> Option<Pose2D> {
        for _ in 0..self.limits.max_waypoint_samples {
            let heading = rng.random_range(-PI..PI);
            let distance = if hi > lo {
                rng.random_range(lo..=hi)
            } else {
                lo
            };
            let candidate = prev.point_at(heading, distance);
            if self.mask.is_segment_free(prev, candidate) {
                return Some(Pose2D::from_position(candidate, random_yaw(rng)));
            }
        }
        None
    }

    /// VALIDATE: length tolerance plus exact clearance of the whole path.
    fn validate(&self, path: &Path) -> bool {
        path.length_within(self.params.path_length, self.params.path_length_tolerance)
            && path
                .waypoints
                .windows(2)
                .all(|w| w[0].distance(&w[1]) >= self.params.min_distance - DISTANCE_EPSILON)
            && self.map.is_path_clear(path, self.params.clearance())
    }
}

#[inline]
fn random_yaw(rng: &mut VariationRng) -> f32 {
    rng.random_range(-PI..PI)
}
