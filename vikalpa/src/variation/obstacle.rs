//! Obstacle variation kind.

use serde::{Deserialize, Serialize};

use super::value::ParameterValue;
use super::{Evaluation, EvaluationContext, Variation, parse_params, single};
use crate::config::{GeneralSettings, defaults};
use crate::core::Pose2D;
use crate::error::{Result, VariationError};
use crate::synthesis::{ObstacleConfig, ObstacleParams, ObstaclePlacer};

/// Parameters of [`ObstacleVariation`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ObstacleSpec {
    pub name: String,
    pub obstacle_configs: Vec<ObstacleConfig>,
    #[serde(default)]
    pub seed: Option<u64>,
    #[serde(default = "defaults::count")]
    pub count: usize,
    #[serde(default)]
    pub robot_diameter: Option<f32>,
}

/// `count` independent obstacle sets, one assignment each.
///
/// Obstacles keep clear of every pose already assigned to the
/// configuration, so the kind is evaluated per configuration prefix.
#[derive(Clone, Debug, PartialEq)]
pub struct ObstacleVariation {
    name: String,
    count: usize,
    params: ObstacleParams,
    seed: Option<u64>,
}

impl ObstacleVariation {
    pub const KIND: &'static str = "ObstacleVariation";

    pub fn new(spec: ObstacleSpec, general: &GeneralSettings) -> Result<Self> {
        if spec.name.trim().is_empty() {
            return Err(VariationError::Config(format!("{}: name must not be empty", Self::KIND)));
        }
        if spec.count == 0 {
            return Err(VariationError::Config(format!("{}: count must be at least 1", Self::KIND)));
        }
        let params = ObstacleParams {
            obstacle_configs: spec.obstacle_configs,
            robot_diameter: spec.robot_diameter.unwrap_or(general.robot_diameter),
            seed: 0,
        };
        params.validate().map_err(|e| e.context(Self::KIND))?;
        Ok(Self {
            name: spec.name,
            count: spec.count,
            params,
            seed: spec.seed,
        })
    }

    pub fn build(params: &serde_yaml::Value, general: &GeneralSettings) -> Result<Box<dyn Variation>> {
        Ok(Box::new(Self::new(parse_params(Self::KIND, params)?, general)?))
    }
}

impl Variation for ObstacleVariation {
    fn kind(&self) -> &'static str {
        Self::KIND
    }

    fn outputs(&self) -> Vec<String> {
        vec![self.name.clone()]
    }

    fn expected_count(&self) -> Option<usize> {
        Some(self.count)
    }

    fn requires_map(&self) -> bool {
        true
    }

    fn is_context_free(&self) -> bool {
        false
    }

    fn evaluate(&self, ctx: &EvaluationContext<'_>) -> Result<Evaluation> {
        let map = ctx.require_map(Self::KIND)?;
        let waypoints: Vec<Pose2D> = ctx
            .assigned
            .values()
            .flat_map(|v| v.poses().iter().copied())
            .collect();

        let params = ObstacleParams {
            seed: self.seed.unwrap_or_else(|| ctx.default_seed(Self::KIND)),
            ..self.params.clone()
        };
        let placer = ObstaclePlacer::new(map, params, ctx.limits.clone())?;

        let mut eval = Evaluation::default();
        for variant in 0..self.count {
            let outcome = placer
                .place_cached(variant, &waypoints, ctx.cache)
                .map(|obstacles| single(&self.name, ParameterValue::Obstacles(obstacles)))
                .map_err(|e| e.context(format!("{} variant {}", Self::KIND, variant)));
            eval.absorb(outcome)?;
        }
        Ok(eval)
    }
}
