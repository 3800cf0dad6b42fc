//! Path variation kinds.
//!
//! Both kinds share the same endpoint handling:
//!
//! - `start_pose` is a literal pose, an `@name` reference, or absent. A
//!   literal or absent start is emitted as a `start_pose` parameter; a
//!   referenced start already lives in the configuration and is not
//!   repeated.
//! - `goal_pose: "@goal_pose"` emits one pose, `goal_poses: "@goal_poses"`
//!   emits a pose list. The referenced name becomes the output name.

use serde::{Deserialize, Serialize};

use super::reference::{GoalBinding, PoseSource};
use super::value::ParameterValue;
use super::{Evaluation, EvaluationContext, ParameterAssignment, Variation, parse_params};
use crate::config::{GeneralSettings, defaults};
use crate::core::{Path, Pose2D};
use crate::error::{Result, VariationError};
use crate::synthesis::{RandomPathParams, RandomPathSynthesizer, RasterPathParams, RasterPathSynthesizer};

/// Output name of an emitted start pose.
pub const START_POSE: &str = "start_pose";

/// Start source and goal binding of a path variation.
#[derive(Clone, Debug, PartialEq)]
pub struct PathEndpoints {
    start: Option<PoseSource>,
    goal: GoalBinding,
}

impl PathEndpoints {
    fn new(
        kind: &str,
        start: Option<PoseSource>,
        goal_pose: Option<&str>,
        goal_poses: Option<&str>,
        num_goal_poses: usize,
    ) -> Result<Self> {
        let context = |e: VariationError| e.context(kind);
        if let Some(start) = &start {
            start.validate(START_POSE).map_err(context)?;
        }
        let goal = GoalBinding::from_params(goal_pose, goal_poses).map_err(context)?;
        goal.check_count(num_goal_poses).map_err(context)?;

        let endpoints = Self { start, goal };
        if endpoints.emits_start() && endpoints.goal.name() == START_POSE {
            return Err(VariationError::Config(format!(
                "{}: goal output '{}' collides with the emitted start pose",
                kind, START_POSE
            )));
        }
        Ok(endpoints)
    }

    fn emits_start(&self) -> bool {
        !self.start.as_ref().is_some_and(PoseSource::is_reference)
    }

    fn outputs(&self) -> Vec<String> {
        let mut names = Vec::with_capacity(2);
        if self.emits_start() {
            names.push(START_POSE.to_string());
        }
        names.push(self.goal.name().to_string());
        names
    }

    fn is_context_free(&self) -> bool {
        self.emits_start()
    }

    fn resolve_start(&self, ctx: &EvaluationContext<'_>) -> Result<Option<Pose2D>> {
        self.start
            .as_ref()
            .map(|source| source.resolve(ctx.assigned))
            .transpose()
    }

    /// Parameters emitted for one synthesized path.
    fn assignment(&self, path: &Path) -> Result<ParameterAssignment> {
        let mut assignment = ParameterAssignment::with_capacity(2);
        let start = match &self.start {
            Some(PoseSource::Reference(_)) => None,
            Some(PoseSource::Literal(pose)) => Some(*pose),
            None => path.start().copied(),
        };
        if let Some(start) = start {
            assignment.insert(START_POSE.to_string(), ParameterValue::Pose(start));
        }
        assignment.insert(self.goal.name().to_string(), self.goal.value(path.goals())?);
        Ok(assignment)
    }
}

// ============================================================================
// Random
// ============================================================================

/// Parameters of [`RandomPathVariation`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RandomPathSpec {
    #[serde(default)]
    pub start_pose: Option<PoseSource>,
    #[serde(default)]
    pub goal_pose: Option<String>,
    #[serde(default)]
    pub goal_poses: Option<String>,
    #[serde(default = "defaults::num_goal_poses")]
    pub num_goal_poses: usize,
    #[serde(default = "defaults::num_paths")]
    pub num_paths: usize,
    pub path_length: f32,
    #[serde(default = "defaults::path_length_tolerance")]
    pub path_length_tolerance: f32,
    #[serde(default)]
    pub min_distance: f32,
    #[serde(default)]
    pub seed: Option<u64>,
    #[serde(default)]
    pub robot_diameter: Option<f32>,
}

/// `num_paths` random paths, one assignment each.
#[derive(Clone, Debug, PartialEq)]
pub struct RandomPathVariation {
    endpoints: PathEndpoints,
    num_paths: usize,
    params: RandomPathParams,
    seed: Option<u64>,
}

impl RandomPathVariation {
    pub const KIND: &'static str = "PathVariationRandom";

    pub fn new(spec: RandomPathSpec, general: &GeneralSettings) -> Result<Self> {
        let endpoints = PathEndpoints::new(
            Self::KIND,
            spec.start_pose,
            spec.goal_pose.as_deref(),
            spec.goal_poses.as_deref(),
            spec.num_goal_poses,
        )?;
        if spec.num_paths == 0 {
            return Err(VariationError::Config(format!(
                "{}: num_paths must be at least 1",
                Self::KIND
            )));
        }
        let params = RandomPathParams {
            path_length: spec.path_length,
            path_length_tolerance: spec.path_length_tolerance,
            min_distance: spec.min_distance,
            num_goal_poses: spec.num_goal_poses,
            robot_diameter: spec.robot_diameter.unwrap_or(general.robot_diameter),
            seed: 0,
        };
        params.validate().map_err(|e| e.context(Self::KIND))?;

        Ok(Self {
            endpoints,
            num_paths: spec.num_paths,
            params,
            seed: spec.seed,
        })
    }

    pub fn build(params: &serde_yaml::Value, general: &GeneralSettings) -> Result<Box<dyn Variation>> {
        Ok(Box::new(Self::new(parse_params(Self::KIND, params)?, general)?))
    }
}

impl Variation for RandomPathVariation {
    fn kind(&self) -> &'static str {
        Self::KIND
    }

    fn outputs(&self) -> Vec<String> {
        self.endpoints.outputs()
    }

    fn expected_count(&self) -> Option<usize> {
        Some(self.num_paths)
    }

    fn requires_map(&self) -> bool {
        true
    }

    fn is_context_free(&self) -> bool {
        self.endpoints.is_context_free()
    }

    fn evaluate(&self, ctx: &EvaluationContext<'_>) -> Result<Evaluation> {
        let map = ctx.require_map(Self::KIND)?;
        let start = self.endpoints.resolve_start(ctx)?;

        let params = RandomPathParams {
            seed: self.seed.unwrap_or_else(|| ctx.default_seed(Self::KIND)),
            ..self.params.clone()
        };
        let synth = RandomPathSynthesizer::new(map, params, ctx.limits.clone())?;

        let mut eval = Evaluation::default();
        for index in 0..self.num_paths {
            let outcome = synth
                .synthesize_cached(start, index, ctx.cache)
                .and_then(|outcome| self.endpoints.assignment(&outcome.path))
                .map_err(|e| e.context(format!("{} path {}", Self::KIND, index)));
            eval.absorb(outcome)?;
        }
        Ok(eval)
    }
}

// ============================================================================
// Rasterized
// ============================================================================

/// Parameters of [`RasterPathVariation`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RasterPathSpec {
    #[serde(default)]
    pub start_pose: Option<PoseSource>,
    #[serde(default)]
    pub goal_pose: Option<String>,
    #[serde(default)]
    pub goal_poses: Option<String>,
    #[serde(default = "defaults::num_goal_poses")]
    pub num_goal_poses: usize,
    pub raster_size: f32,
    #[serde(default)]
    pub raster_offset_x: f32,
    #[serde(default)]
    pub raster_offset_y: f32,
    pub path_length: f32,
    #[serde(default = "defaults::path_length_tolerance")]
    pub path_length_tolerance: f32,
    #[serde(default)]
    pub robot_diameter: Option<f32>,
}

/// Every lattice path matching the length target, one assignment each.
#[derive(Clone, Debug, PartialEq)]
pub struct RasterPathVariation {
    endpoints: PathEndpoints,
    params: RasterPathParams,
}

impl RasterPathVariation {
    pub const KIND: &'static str = "PathVariationRasterized";

    pub fn new(spec: RasterPathSpec, general: &GeneralSettings) -> Result<Self> {
        let endpoints = PathEndpoints::new(
            Self::KIND,
            spec.start_pose,
            spec.goal_pose.as_deref(),
            spec.goal_poses.as_deref(),
            spec.num_goal_poses,
        )?;
        let params = RasterPathParams {
            raster_size: spec.raster_size,
            raster_offset_x: spec.raster_offset_x,
            raster_offset_y: spec.raster_offset_y,
            path_length: spec.path_length,
            path_length_tolerance: spec.path_length_tolerance,
            num_goal_poses: spec.num_goal_poses,
            robot_diameter: spec.robot_diameter.unwrap_or(general.robot_diameter),
        };
        params.validate().map_err(|e| e.context(Self::KIND))?;
        Ok(Self { endpoints, params })
    }

    pub fn build(params: &serde_yaml::Value, general: &GeneralSettings) -> Result<Box<dyn Variation>> {
        Ok(Box::new(Self::new(parse_params(Self::KIND, params)?, general)?))
    }
}

impl Variation for RasterPathVariation {
    fn kind(&self) -> &'static str {
        Self::KIND
    }

    fn outputs(&self) -> Vec<String> {
        self.endpoints.outputs()
    }

    /// Depends on the map, so unknown until evaluated.
    fn expected_count(&self) -> Option<usize> {
        None
    }

    fn requires_map(&self) -> bool {
        true
    }

    fn is_context_free(&self) -> bool {
        self.endpoints.is_context_free()
    }

    fn evaluate(&self, ctx: &EvaluationContext<'_>) -> Result<Evaluation> {
        let map = ctx.require_map(Self::KIND)?;
        let start = self.endpoints.resolve_start(ctx)?;
        let synth = RasterPathSynthesizer::new(map, self.params.clone())?;

        let mut eval = Evaluation::default();
        match synth.synthesize_cached(start, ctx.cache) {
            Ok(paths) => {
                for path in &paths {
                    eval.absorb(self.endpoints.assignment(path))?;
                }
            }
            Err(e) => eval.absorb(Err(e.context(Self::KIND)))?,
        }
        Ok(eval)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SynthesisLimits;
    use crate::map::OccupancyMap;
    use crate::synthesis::GenerationCache;

    fn open_map() -> OccupancyMap {
        OccupancyMap::empty(200, 200, 0.1, Pose2D::new(-10.0, -10.0, 0.0)).unwrap()
    }

    fn build_random(yaml: &str) -> Result<RandomPathVariation> {
        RandomPathVariation::new(serde_yaml::from_str(yaml).unwrap(), &GeneralSettings::default())
    }

    fn build_raster(yaml: &str) -> Result<RasterPathVariation> {
        RasterPathVariation::new(serde_yaml::from_str(yaml).unwrap(), &GeneralSettings::default())
    }

    fn run(
        variation: &dyn Variation,
        map: Option<&OccupancyMap>,
        assigned: &ParameterAssignment,
    ) -> Result<Evaluation> {
        let cache = GenerationCache::new();
        let limits = SynthesisLimits::default();
        let ctx = EvaluationContext {
            scenario: "paths",
            position: 0,
            map,
            cache: &cache,
            limits: &limits,
            assigned,
        };
        variation.evaluate(&ctx)
    }

    #[test]
    fn test_single_goal_naming() {
        let map = open_map();
        let variation = build_random(
            "{start_pose: {x: 0.0, y: 0.0, yaw: 0.0}, goal_pose: '@goal_pose', path_length: 10.0, seed: 5}",
        )
        .unwrap();
        assert_eq!(variation.outputs(), ["start_pose", "goal_pose"]);
        assert!(variation.is_context_free());

        let eval = run(&variation, Some(&map), &ParameterAssignment::new()).unwrap();
        assert_eq!(eval.assignments.len(), 1);
        let assignment = &eval.assignments[0];
        assert_eq!(assignment["start_pose"], ParameterValue::Pose(Pose2D::new(0.0, 0.0, 0.0)));
        let goal = assignment["goal_pose"].as_pose().unwrap();
        let d = goal.distance(&Pose2D::default());
        assert!((9.5..=10.5).contains(&d));
    }

    #[test]
    fn test_plural_goal_naming() {
        let map = open_map();
        let variation = build_random(
            "{goal_poses: '@goal_poses', num_goal_poses: 3, num_paths: 2, path_length: 9.0, min_distance: 1.0, seed: 5}",
        )
        .unwrap();
        let eval = run(&variation, Some(&map), &ParameterAssignment::new()).unwrap();
        assert_eq!(eval.assignments.len(), 2);
        for assignment in &eval.assignments {
            assert!(matches!(assignment["start_pose"], ParameterValue::Pose(_)));
            assert_eq!(assignment["goal_poses"].poses().len(), 3);
        }
    }

    #[test]
    fn test_singular_goal_with_many_poses_is_config_error() {
        let err = build_random("{goal_pose: '@goal_pose', num_goal_poses: 2, path_length: 5.0}").unwrap_err();
        assert!(matches!(err, VariationError::Config(_)));
    }

    #[test]
    fn test_referenced_start() {
        let map = open_map();
        let variation = build_random("{start_pose: '@origin', goal_pose: '@goal_pose', path_length: 4.0, seed: 1}").unwrap();
        assert_eq!(variation.outputs(), ["goal_pose"]);
        assert!(!variation.is_context_free());

        let mut assigned = ParameterAssignment::new();
        assigned.insert("origin".into(), ParameterValue::Pose(Pose2D::new(2.0, 2.0, 0.0)));
        let eval = run(&variation, Some(&map), &assigned).unwrap();
        assert_eq!(eval.assignments.len(), 1);
        assert!(!eval.assignments[0].contains_key("start_pose"));

        let missing = run(&variation, Some(&map), &ParameterAssignment::new()).unwrap_err();
        assert!(matches!(missing, VariationError::Reference(_)));
    }

    #[test]
    fn test_missing_map_is_map_error() {
        let variation = build_random("{goal_pose: '@goal_pose', path_length: 4.0}").unwrap();
        let err = run(&variation, None, &ParameterAssignment::new()).unwrap_err();
        assert!(matches!(err, VariationError::Map(_)));
    }

    #[test]
    fn test_blocked_start_goes_to_diagnostics() {
        let map = open_map().with_rect(
            crate::core::WorldPoint::new(-1.0, -1.0),
            crate::core::WorldPoint::new(1.0, 1.0),
            1.0,
        );
        let variation = build_random(
            "{start_pose: {x: 0.0, y: 0.0}, goal_pose: '@goal_pose', num_paths: 2, path_length: 4.0, seed: 1}",
        )
        .unwrap();
        let eval = run(&variation, Some(&map), &ParameterAssignment::new()).unwrap();
        assert!(eval.assignments.is_empty());
        assert_eq!(eval.diagnostics.len(), 2);
        assert!(eval.diagnostics[1].to_string().contains("path 1"));
    }

    #[test]
    fn test_raster_assignments() {
        let map = OccupancyMap::empty(50, 50, 0.1, Pose2D::default()).unwrap();
        let variation = build_raster(
            "{goal_pose: '@goal_pose', raster_size: 1.0, raster_offset_x: 0.5, raster_offset_y: 0.5, path_length: 2.0, path_length_tolerance: 0.01}",
        )
        .unwrap();
        assert_eq!(variation.expected_count(), None);
        let eval = run(&variation, Some(&map), &ParameterAssignment::new()).unwrap();
        assert_eq!(eval.assignments.len(), 60);
        for assignment in &eval.assignments {
            let start = assignment["start_pose"].as_pose().unwrap();
            let goal = assignment["goal_pose"].as_pose().unwrap();
            assert!((start.distance(&goal) - 2.0).abs() <= 0.01);
        }
    }

    #[test]
    fn test_raster_literal_start_is_emitted_verbatim() {
        let map = OccupancyMap::empty(50, 50, 0.1, Pose2D::default()).unwrap();
        let variation = build_raster(
            "{start_pose: {x: 2.5, y: 2.5, yaw: 0.3}, goal_pose: '@goal_pose', raster_size: 1.0, raster_offset_x: 0.5, raster_offset_y: 0.5, path_length: 2.0, path_length_tolerance: 0.01}",
        )
        .unwrap();
        let eval = run(&variation, Some(&map), &ParameterAssignment::new()).unwrap();
        assert_eq!(eval.assignments.len(), 4);
        assert!(eval
            .assignments
            .iter()
            .all(|a| a["start_pose"] == ParameterValue::Pose(Pose2D::new(2.5, 2.5, 0.3))));
    }

    #[test]
    fn test_raster_multi_goal_referenced_start() {
        let map = OccupancyMap::empty(100, 100, 0.1, Pose2D::default()).unwrap();
        let variation = build_raster(
            "{start_pose: '@dock', goal_poses: '@goal_poses', num_goal_poses: 2, raster_size: 0.5, raster_offset_x: 0.25, raster_offset_y: 0.25, path_length: 6.0}",
        )
        .unwrap();
        assert!(!variation.is_context_free());

        let dock = Pose2D::new(5.0, 5.0, 0.0);
        let mut assigned = ParameterAssignment::new();
        assigned.insert("dock".into(), ParameterValue::Pose(dock));
        let eval = run(&variation, Some(&map), &assigned).unwrap();

        assert_eq!(eval.assignments.len(), 1);
        let assignment = &eval.assignments[0];
        assert!(!assignment.contains_key("start_pose"));
        let goals = assignment["goal_poses"].poses();
        assert_eq!(goals.len(), 2);
        let length = dock.distance(&goals[0]) + goals[0].distance(&goals[1]);
        assert!((5.5..=6.5).contains(&length), "length {}", length);
    }

    #[test]
    fn test_raster_full_map_reports_diagnostic() {
        let map = OccupancyMap::empty(50, 50, 0.1, Pose2D::default()).unwrap().with_rect(
            crate::core::WorldPoint::new(0.0, 0.0),
            crate::core::WorldPoint::new(5.0, 5.0),
            1.0,
        );
        let variation = build_raster("{goal_pose: '@goal_pose', raster_size: 1.0, path_length: 2.0}").unwrap();
        let eval = run(&variation, Some(&map), &ParameterAssignment::new()).unwrap();
        assert!(eval.assignments.is_empty());
        assert!(matches!(eval.diagnostics[0], VariationError::Generation(_)));
    }
}
