//! Random obstacle placement.
//!
//! Obstacles are drawn uniformly over the free cells of the map. A draw is
//! kept when it is free at the robot radius, at least
//! `1.5 * robot_diameter` away from every obstacle already placed in the
//! same call, and at least `2 * robot_diameter` away from any start or goal
//! waypoint the configuration already holds.
//!
//! `max_distance` is carried in [`ObstacleConfig`] and in the cache key but
//! does not influence placement.

use std::collections::BTreeMap;
use std::f32::consts::PI;

use log::debug;
use rand::Rng;
use serde::{Deserialize, Serialize};
use serde_json::json;

use super::cache::{CacheKey, CachedValue, GenerationCache};
use crate::config::SynthesisLimits;
use crate::core::{Obstacle, Pose2D, WorldPoint};
use crate::error::{Result, VariationError};
use crate::map::OccupancyMap;
use crate::seed::{VariationRng, rng_from_seed, variant_seed};

/// Cache kind label.
const CACHE_KIND: &str = "ObstacleVariation";

/// Obstacle spacing as a multiple of the robot diameter.
const OBSTACLE_SPACING_FACTOR: f32 = 1.5;

/// Waypoint clearance as a multiple of the robot diameter.
const WAYPOINT_CLEARANCE_FACTOR: f32 = 2.0;

/// One obstacle type and how many of it to place.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ObstacleConfig {
    /// Number of obstacles of this type.
    pub amount: usize,
    /// Distance bound from a reference path. Accepted, not applied.
    #[serde(default)]
    pub max_distance: f32,
    /// Model to instantiate.
    pub model: String,
    /// Arguments forwarded to the model.
    #[serde(default)]
    pub xacro_arguments: BTreeMap<String, String>,
}

/// Inputs that shape one obstacle set.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ObstacleParams {
    pub obstacle_configs: Vec<ObstacleConfig>,
    pub robot_diameter: f32,
    pub seed: u64,
}

impl ObstacleParams {
    /// Reject values placement cannot work with.
    pub fn validate(&self) -> Result<()> {
        if !(self.robot_diameter.is_finite() && self.robot_diameter > 0.0) {
            return Err(VariationError::Config(format!(
                "robot_diameter must be positive, got {}",
                self.robot_diameter
            )));
        }
        for config in &self.obstacle_configs {
            if config.model.trim().is_empty() {
                return Err(VariationError::Config(
                    "obstacle model must not be empty".to_string(),
                ));
            }
        }
        Ok(())
    }

    /// Total obstacles in one set.
    pub fn total_amount(&self) -> usize {
        self.obstacle_configs.iter().map(|c| c.amount).sum()
    }
}

/// Obstacle placer bound to one map and one parameter set.
pub struct ObstaclePlacer<'a> {
    map: &'a OccupancyMap,
    params: ObstacleParams,
    limits: SynthesisLimits,
    candidates: Vec<WorldPoint>,
}

impl<'a> ObstaclePlacer<'a> {
    /// Create a placer, validating the parameters and collecting candidate cells.
    pub fn new(
        map: &'a OccupancyMap,
        params: ObstacleParams,
        limits: SynthesisLimits,
    ) -> Result<Self> {
        params.validate()?;
        let radius = params.robot_diameter * 0.5;
        let candidates = map
            .free_cells()
            .into_iter()
            .filter(|p| map.is_free(*p, radius))
            .collect();
        Ok(Self {
            map,
            params,
            limits,
            candidates,
        })
    }

    /// Parameters in use.
    #[inline]
    pub fn params(&self) -> &ObstacleParams {
        &self.params
    }

    /// Place obstacle set `variant`, bypassing any cache.
    ///
    /// `waypoints` are start/goal poses the obstacles must keep clear of.
    pub fn place(&self, variant: usize, waypoints: &[Pose2D]) -> Result<Vec<Obstacle>> {
        let total = self.params.total_amount();
        if total > 0 && self.candidates.is_empty() {
            return Err(VariationError::Generation(format!(
                "no free cell can hold an obstacle at clearance {:.3}",
                self.params.robot_diameter * 0.5
            )));
        }

        let mut rng = rng_from_seed(variant_seed(self.params.seed, variant));
        let mut placed: Vec<Obstacle> = Vec::with_capacity(total);

        for config in &self.params.obstacle_configs {
            self.place_type(config, waypoints, &mut placed, &mut rng)?;
        }

        debug!(
            "[ObstaclePlacer] variant {}: placed {} obstacles",
            variant,
            placed.len()
        );
        Ok(placed)
    }

    /// Place obstacle set `variant` through the cache. Failures are cached too.
    pub fn place_cached(
        &self,
        variant: usize,
        waypoints: &[Pose2D],
        cache: &GenerationCache,
    ) -> Result<Vec<Obstacle>> {
        let key = CacheKey::new(
            CACHE_KIND,
            &self.params,
            variant_seed(self.params.seed, variant),
            json!({
                "waypoints": waypoints,
                "map": self.map.fingerprint(),
                "attempts_per_obstacle": self.limits.obstacle_attempts_per_obstacle,
            }),
        )?;

        let value = cache.get_or_insert_with(&key, || match self.place(variant, waypoints) {
            Ok(obstacles) => CachedValue::Obstacles { obstacles },
            Err(e) => CachedValue::failure(e),
        });

        match value.into_result()? {
            CachedValue::Obstacles { obstacles } => Ok(obstacles),
            other => Err(VariationError::Generation(format!(
                "cache entry has unexpected shape: {:?}",
                other
            ))),
        }
    }

    fn place_type(
        &self,
        config: &ObstacleConfig,
        waypoints: &[Pose2D],
        placed: &mut Vec<Obstacle>,
        rng: &mut VariationRng,
    ) -> Result<()> {
        let spacing = OBSTACLE_SPACING_FACTOR * self.params.robot_diameter;
        let waypoint_clearance = WAYPOINT_CLEARANCE_FACTOR * self.params.robot_diameter;
        let max_draws = config
            .amount
            .saturating_mul(self.limits.obstacle_attempts_per_obstacle as usize);

        let mut count = 0;
        let mut draws = 0;
        while count < config.amount && draws < max_draws {
            draws += 1;
            let p = self.candidates[rng.random_range(0..self.candidates.len())];

            if waypoints
                .iter()
                .any(|w| w.position().distance(&p) < waypoint_clearance)
            {
                continue;
            }
            if placed.iter().any(|o| o.pose.position().distance(&p) < spacing) {
                continue;
            }

            let yaw = rng.random_range(-PI..PI);
            placed.push(Obstacle {
                entity_name: format!("obstacle_{}", placed.len()),
                model: config.model.clone(),
                xacro_arguments: config.xacro_arguments.clone(),
                pose: Pose2D::from_position(p, yaw),
            });
            count += 1;
        }

        if count < config.amount {
            return Err(VariationError::Generation(format!(
                "placed {} of {} '{}' obstacles after {} draws",
                count, config.amount, config.model, draws
            )));
        }
        Ok(())
    }
}
