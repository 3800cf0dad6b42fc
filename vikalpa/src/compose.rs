//! Cartesian composition of variations into configurations.
//!
//! Variations are applied in declaration order. Each one extends every
//! configuration prefix built so far with each of its assignments, so the
//! last variation varies fastest:
//!
//! ```text
//! v: [1, 2, 3]   d: [5, 10]
//!   -> (1,5) (1,10) (2,5) (2,10) (3,5) (3,10)
//! ```
//!
//! Context-free variations are evaluated once per scenario and their
//! assignments reused for every prefix. Variations that read earlier
//! parameters (`@name` references, obstacle clearance) are evaluated once
//! per prefix.
//!
//! ## Failures
//!
//! | Error | Effect |
//! |-------|--------|
//! | Config / Map / Io / Parse | scenario aborted |
//! | Reference / Generation | affected prefix dropped, recorded as a [`Diagnostic`] |
//!
//! A scenario that yields fewer configurations than its theoretical product
//! is reported through [`ScenarioVariants::is_complete`], never silently.

use std::collections::HashMap;

use log::{debug, error, info, warn};
use serde::Serialize;

use crate::config::{GeneralSettings, Scenario, ScenarioPlan, VariationFile};
use crate::error::{ErrorKind, Result, VariationError};
use crate::io::load_ros_map;
use crate::map::OccupancyMap;
use crate::synthesis::GenerationCache;
use crate::variation::{
    EvaluationContext, ParameterAssignment, Variation, VariationRegistry, VariationSpec,
};

/// One fully resolved test case.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Configuration {
    /// `{scenario}-{index}`
    pub name: String,
    /// 1-based position in the scenario's output.
    pub index: usize,
    pub parameters: ParameterAssignment,
}

/// A failure that dropped part of a scenario's output.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Diagnostic {
    /// Variation that failed, e.g. `PathVariationRandom(goal_pose)`.
    pub variation: String,
    pub kind: ErrorKind,
    pub message: String,
}

impl Diagnostic {
    fn new(variation: &VariationSpec, error: &VariationError) -> Self {
        Self {
            variation: variation.to_string(),
            kind: error.kind(),
            message: error.to_string(),
        }
    }
}

/// How many assignments one variation produced.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct VariationSummary {
    pub variation: String,
    pub kind: String,
    /// Assignments produced, summed over every prefix evaluated.
    pub produced: usize,
    /// Assignments a clean evaluation yields, if known up front.
    pub expected: Option<usize>,
}

/// Generated configurations of one scenario.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ScenarioVariants {
    pub scenario: String,
    pub configurations: Vec<Configuration>,
    pub diagnostics: Vec<Diagnostic>,
    pub summaries: Vec<VariationSummary>,
    /// Product of the expected counts, when every count is known.
    pub expected_total: Option<usize>,
}

impl ScenarioVariants {
    /// No failures and, where the product is known, every configuration present.
    pub fn is_complete(&self) -> bool {
        self.diagnostics.is_empty()
            && self
                .expected_total
                .is_none_or(|expected| expected == self.configurations.len())
    }

    /// Number of configurations generated.
    #[inline]
    pub fn len(&self) -> usize {
        self.configurations.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.configurations.is_empty()
    }
}

/// A scenario that was aborted.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ScenarioFailure {
    pub scenario: String,
    pub kind: ErrorKind,
    pub message: String,
}

/// Result of generating a whole variation file.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct GenerationOutcome {
    pub scenarios: Vec<ScenarioVariants>,
    pub failed_scenarios: Vec<ScenarioFailure>,
}

impl GenerationOutcome {
    /// Configurations across all scenarios.
    pub fn total_configurations(&self) -> usize {
        self.scenarios.iter().map(ScenarioVariants::len).sum()
    }

    /// Every scenario generated and complete.
    pub fn is_complete(&self) -> bool {
        self.failed_scenarios.is_empty() && self.scenarios.iter().all(ScenarioVariants::is_complete)
    }
}

/// Turns scenarios into configurations.
pub struct CompositionEngine {
    registry: VariationRegistry,
    general: GeneralSettings,
    cache: GenerationCache,
}

impl CompositionEngine {
    /// Engine with the built-in kinds and a fresh cache.
    pub fn new(general: GeneralSettings) -> Self {
        Self::with_registry(VariationRegistry::with_defaults(), general)
    }

    /// Engine with a custom registry.
    pub fn with_registry(registry: VariationRegistry, general: GeneralSettings) -> Self {
        Self {
            registry,
            general,
            cache: GenerationCache::new(),
        }
    }

    /// Replace the cache, e.g. with one loaded from disk.
    pub fn with_cache(mut self, cache: GenerationCache) -> Self {
        self.cache = cache;
        self
    }

    #[inline]
    pub fn cache(&self) -> &GenerationCache {
        &self.cache
    }

    #[inline]
    pub fn registry(&self) -> &VariationRegistry {
        &self.registry
    }

    #[inline]
    pub fn general(&self) -> &GeneralSettings {
        &self.general
    }

    /// Generate every scenario of a file.
    ///
    /// Structural problems with the file itself fail the call; a scenario
    /// that fails is recorded and the remaining scenarios still run.
    pub fn generate_all(&self, file: &VariationFile) -> Result<GenerationOutcome> {
        let mut outcome = GenerationOutcome::default();
        for scenario in file.scenarios()? {
            match self.generate(&scenario) {
                Ok(variants) => outcome.scenarios.push(variants),
                Err(e) => {
                    error!("[Compose] scenario '{}' aborted: {}", scenario.name, e);
                    outcome.failed_scenarios.push(ScenarioFailure {
                        scenario: scenario.name.clone(),
                        kind: e.kind(),
                        message: e.to_string(),
                    });
                }
            }
        }
        info!(
            "[Compose] {} configurations from {} scenarios ({} failed)",
            outcome.total_configurations(),
            outcome.scenarios.len(),
            outcome.failed_scenarios.len()
        );
        Ok(outcome)
    }

    /// Generate one scenario, loading its map when it has one.
    pub fn generate(&self, scenario: &Scenario) -> Result<ScenarioVariants> {
        let map = match &scenario.map_file {
            Some(path) => Some(load_ros_map(path)?),
            None => None,
        };
        self.generate_with_map(scenario, map.as_ref())
    }

    /// Generate one scenario against an already loaded map.
    pub fn generate_with_map(
        &self,
        scenario: &Scenario,
        map: Option<&OccupancyMap>,
    ) -> Result<ScenarioVariants> {
        let variants = match &scenario.plan {
            ScenarioPlan::Fixed(parameters) => ScenarioVariants {
                scenario: scenario.name.clone(),
                configurations: vec![configuration(&scenario.name, 0, parameters.clone())],
                diagnostics: Vec::new(),
                summaries: Vec::new(),
                expected_total: Some(1),
            },
            ScenarioPlan::Varied(specs) => self.compose(scenario, specs, map)?,
        };

        if variants.is_complete() {
            debug!(
                "[Compose] scenario '{}': {} configurations",
                variants.scenario,
                variants.len()
            );
        } else {
            warn!(
                "[Compose] scenario '{}' incomplete: {} of {} configurations, {} failures",
                variants.scenario,
                variants.len(),
                variants
                    .expected_total
                    .map_or_else(|| "?".to_string(), |n| n.to_string()),
                variants.diagnostics.len()
            );
        }
        Ok(variants)
    }

    /// Build every variation and check the outputs do not collide.
    pub fn build_variations(&self, specs: &[VariationSpec]) -> Result<Vec<Box<dyn Variation>>> {
        if specs.is_empty() {
            return Err(VariationError::Config("variations list is empty".to_string()));
        }

        let variations = specs
            .iter()
            .map(|spec| self.registry.build(spec, &self.general))
            .collect::<Result<Vec<_>>>()?;

        let mut owners: HashMap<String, &VariationSpec> = HashMap::new();
        for (spec, variation) in specs.iter().zip(&variations) {
            for name in variation.outputs() {
                if let Some(previous) = owners.get(&name) {
                    return Err(VariationError::Config(format!(
                        "parameter '{}' is produced by both {} and {}",
                        name, previous, spec
                    )));
                }
                owners.insert(name, spec);
            }
        }

        Ok(variations)
    }

    fn context<'a>(
        &'a self,
        scenario: &'a str,
        position: usize,
        map: Option<&'a OccupancyMap>,
        assigned: &'a ParameterAssignment,
    ) -> EvaluationContext<'a> {
        EvaluationContext {
            scenario,
            position,
            map,
            cache: &self.cache,
            limits: &self.general.limits,
            assigned,
        }
    }

    fn compose(
        &self,
        scenario: &Scenario,
        specs: &[VariationSpec],
        map: Option<&OccupancyMap>,
    ) -> Result<ScenarioVariants> {
        let variations = self.build_variations(specs)?;

        if map.is_none()
            && let Some(kind) = variations.iter().find(|v| v.requires_map()).map(|v| v.kind())
        {
            return Err(VariationError::Map(format!(
                "scenario '{}' uses {} but has no map_file",
                scenario.name, kind
            )));
        }

        let empty = ParameterAssignment::new();
        let mut prefixes = vec![ParameterAssignment::new()];
        let mut diagnostics = Vec::new();
        let mut summaries = Vec::with_capacity(variations.len());

        for (position, (spec, variation)) in specs.iter().zip(&variations).enumerate() {
            let mut produced = 0;
            let mut next = Vec::new();

            if variation.is_context_free() {
                let assignments = match variation.evaluate(&self.context(&scenario.name, position, map, &empty)) {
                    Ok(eval) => {
                        diagnostics.extend(eval.diagnostics.iter().map(|e| Diagnostic::new(spec, e)));
                        eval.assignments
                    }
                    Err(e) if !e.is_fatal_for_scenario() => {
                        diagnostics.push(Diagnostic::new(spec, &e));
                        Vec::new()
                    }
                    Err(e) => return Err(e),
                };
                produced = assignments.len();
                for prefix in &prefixes {
                    for assignment in &assignments {
                        next.push(merge(prefix, assignment)?);
                    }
                }
            } else {
                for prefix in &prefixes {
                    match variation.evaluate(&self.context(&scenario.name, position, map, prefix)) {
                        Ok(eval) => {
                            diagnostics.extend(eval.diagnostics.iter().map(|e| Diagnostic::new(spec, e)));
                            produced += eval.assignments.len();
                            for assignment in &eval.assignments {
                                next.push(merge(prefix, assignment)?);
                            }
                        }
                        Err(e) if !e.is_fatal_for_scenario() => {
                            diagnostics.push(Diagnostic::new(spec, &e));
                        }
                        Err(e) => return Err(e),
                    }
                }
            }

            debug!(
                "[Compose] {} #{}: {} assignments, {} prefixes",
                spec,
                position,
                produced,
                next.len()
            );
            summaries.push(VariationSummary {
                variation: spec.to_string(),
                kind: variation.kind().to_string(),
                produced,
                expected: variation.expected_count(),
            });
            prefixes = next;
        }

        let expected_total = variations
            .iter()
            .map(|v| v.expected_count())
            .try_fold(1usize, |acc, n| n.map(|n| acc.saturating_mul(n)));

        Ok(ScenarioVariants {
            scenario: scenario.name.clone(),
            configurations: prefixes
                .into_iter()
                .enumerate()
                .map(|(i, parameters)| configuration(&scenario.name, i, parameters))
                .collect(),
            diagnostics,
            summaries,
            expected_total,
        })
    }
}

fn configuration(scenario: &str, position: usize, parameters: ParameterAssignment) -> Configuration {
    let index = position + 1;
    Configuration {
        name: format!("{}-{}", scenario, index),
        index,
        parameters,
    }
}

/// Extend a prefix with one assignment; a repeated name is a config error.
fn merge(prefix: &ParameterAssignment, assignment: &ParameterAssignment) -> Result<ParameterAssignment> {
    let mut merged = prefix.clone();
    for (name, value) in assignment {
        if merged.insert(name.clone(), value.clone()).is_some() {
            return Err(VariationError::Config(format!(
                "parameter '{}' assigned by more than one variation",
                name
            )));
        }
    }
    Ok(merged)
}
