//! Variation kinds and their evaluation.
//!
//! A variation turns one declarative entry of a scenario into an ordered
//! list of [`ParameterAssignment`]s. The composition engine multiplies
//! these lists together.
//!
//! | Kind | Outputs | Needs map |
//! |------|---------|-----------|
//! | `ParameterVariationList` | `name` | no |
//! | `ParameterVariationDistributionUniform` | `name` | no |
//! | `ParameterVariationDistributionGaussian` | `name` | no |
//! | `PathVariationRandom` | `start_pose`?, goal | yes |
//! | `PathVariationRasterized` | `start_pose`?, goal | yes |
//! | `ObstacleVariation` | `name` | yes |
//!
//! New kinds implement [`Variation`] and register a builder with
//! [`VariationRegistry::register`].

pub mod obstacle;
pub mod parameter;
pub mod path;
pub mod reference;
mod registry;
pub mod spec;
pub mod value;

use std::fmt;

use indexmap::IndexMap;
use serde::de::DeserializeOwned;

use crate::config::SynthesisLimits;
use crate::error::{Result, VariationError};
use crate::map::OccupancyMap;
use crate::seed;
use crate::synthesis::GenerationCache;

pub use obstacle::ObstacleVariation;
pub use parameter::{GaussianVariation, ListVariation, UniformVariation};
pub use path::{RandomPathVariation, RasterPathVariation};
pub use reference::{GoalBinding, PoseSource};
pub use registry::{VariationBuilder, VariationRegistry};
pub use spec::VariationSpec;
pub use value::{ParameterValue, ValueType};

/// Named parameter values, in insertion order.
pub type ParameterAssignment = IndexMap<String, ParameterValue>;

/// Everything a variation may read while it is evaluated.
pub struct EvaluationContext<'a> {
    /// Owning scenario name.
    pub scenario: &'a str,
    /// Position of the variation within the scenario.
    pub position: usize,
    /// Scenario map, if one was loaded.
    pub map: Option<&'a OccupancyMap>,
    /// Shared synthesis cache.
    pub cache: &'a GenerationCache,
    /// Synthesis effort bounds.
    pub limits: &'a SynthesisLimits,
    /// Parameters assigned by earlier variations of this configuration.
    pub assigned: &'a ParameterAssignment,
}

impl EvaluationContext<'_> {
    /// Seed for a variation that did not declare one.
    pub fn default_seed(&self, kind: &str) -> u64 {
        seed::default_seed(self.scenario, self.position, kind)
    }

    /// The scenario map, or a map error naming `kind`.
    pub fn require_map(&self, kind: &str) -> Result<&OccupancyMap> {
        self.map.ok_or_else(|| {
            VariationError::Map(format!(
                "{} needs a map but scenario '{}' has no map_file",
                kind, self.scenario
            ))
        })
    }
}

/// Output of one evaluation.
///
/// Isolated failures (a path index that could not be synthesized) are
/// collected in `diagnostics` while the successful assignments are kept.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Evaluation {
    pub assignments: Vec<ParameterAssignment>,
    pub diagnostics: Vec<VariationError>,
}

impl Evaluation {
    /// An evaluation with no failures.
    pub fn complete(assignments: Vec<ParameterAssignment>) -> Self {
        Self {
            assignments,
            diagnostics: Vec::new(),
        }
    }

    /// Record the outcome of one unit of work, keeping only fatal errors as `Err`.
    pub fn absorb(&mut self, outcome: Result<ParameterAssignment>) -> Result<()> {
        match outcome {
            Ok(assignment) => self.assignments.push(assignment),
            Err(e) if e.is_fatal_for_scenario() => return Err(e),
            Err(e) => self.diagnostics.push(e),
        }
        Ok(())
    }
}

/// A built variation kind.
pub trait Variation: fmt::Debug + Send + Sync {
    /// Registered kind name.
    fn kind(&self) -> &'static str;

    /// Parameter names this variation assigns.
    fn outputs(&self) -> Vec<String>;

    /// Number of assignments a fully successful evaluation yields, if known up front.
    fn expected_count(&self) -> Option<usize>;

    /// Whether evaluation needs the scenario map.
    fn requires_map(&self) -> bool {
        false
    }

    /// Whether the result is independent of earlier assignments.
    ///
    /// Context-free variations are evaluated once per scenario.
    fn is_context_free(&self) -> bool {
        true
    }

    /// Produce the assignments.
    fn evaluate(&self, ctx: &EvaluationContext<'_>) -> Result<Evaluation>;
}

/// Deserialize a kind's parameters, reporting problems as config errors.
pub(crate) fn parse_params<T: DeserializeOwned>(kind: &str, value: &serde_yaml::Value) -> Result<T> {
    serde_yaml::from_value(value.clone())
        .map_err(|e| VariationError::Config(format!("{}: {}", kind, e)))
}

/// Single-entry assignment.
pub(crate) fn single(name: &str, value: ParameterValue) -> ParameterAssignment {
    let mut assignment = ParameterAssignment::with_capacity(1);
    assignment.insert(name.to_string(), value);
    assignment
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_absorb_isolates_generation_errors() {
        let mut eval = Evaluation::default();
        eval.absorb(Ok(single("a", 1i64.into()))).unwrap();
        eval.absorb(Err(VariationError::Generation("no path".into()))).unwrap();
        assert!(eval.absorb(Err(VariationError::Map("gone".into()))).is_err());
        assert_eq!(eval.assignments.len(), 1);
        assert_eq!(eval.diagnostics.len(), 1);
    }

    #[test]
    fn test_require_map() {
        let cache = GenerationCache::new();
        let limits = SynthesisLimits::default();
        let assigned = ParameterAssignment::new();
        let ctx = EvaluationContext {
            scenario: "s",
            position: 0,
            map: None,
            cache: &cache,
            limits: &limits,
            assigned: &assigned,
        };
        assert!(matches!(ctx.require_map("PathVariationRandom"), Err(VariationError::Map(_))));
        assert_eq!(ctx.default_seed("k"), seed::default_seed("s", 0, "k"));
    }
}
