//! Generic parameter combinators: fixed list, uniform and Gaussian draws.
//!
//! Each combinator assigns a single named parameter. Distribution draws use
//! their own stream seeded from `seed` (or a seed derived from the scenario
//! when none is given), so equal inputs reproduce equal sequences.

use rand::Rng;
use rand_distr::{Distribution, StandardNormal, Uniform};
use serde::{Deserialize, Serialize};

use super::value::{ParameterValue, ValueType};
use super::{Evaluation, EvaluationContext, Variation, parse_params, single};
use crate::config::GeneralSettings;
use crate::error::{Result, VariationError};
use crate::seed::{VariationRng, rng_from_seed};

fn validate_name(kind: &str, name: &str) -> Result<()> {
    if name.trim().is_empty() {
        return Err(VariationError::Config(format!("{}: name must not be empty", kind)));
    }
    Ok(())
}

fn validate_count(kind: &str, count: usize) -> Result<()> {
    if count == 0 {
        return Err(VariationError::Config(format!(
            "{}: num_variations must be at least 1",
            kind
        )));
    }
    Ok(())
}

// ============================================================================
// List
// ============================================================================

/// Parameters of [`ListVariation`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ListParams {
    pub name: String,
    pub values: Vec<ParameterValue>,
}

/// One assignment per listed value, in order.
#[derive(Clone, Debug, PartialEq)]
pub struct ListVariation {
    params: ListParams,
}

impl ListVariation {
    pub const KIND: &'static str = "ParameterVariationList";

    pub fn new(params: ListParams) -> Result<Self> {
        validate_name(Self::KIND, &params.name)?;
        if params.values.is_empty() {
            return Err(VariationError::Config(format!(
                "{}: values for '{}' must not be empty",
                Self::KIND,
                params.name
            )));
        }
        Ok(Self { params })
    }

    pub fn build(params: &serde_yaml::Value, _general: &GeneralSettings) -> Result<Box<dyn Variation>> {
        Ok(Box::new(Self::new(parse_params(Self::KIND, params)?)?))
    }
}

impl Variation for ListVariation {
    fn kind(&self) -> &'static str {
        Self::KIND
    }

    fn outputs(&self) -> Vec<String> {
        vec![self.params.name.clone()]
    }

    fn expected_count(&self) -> Option<usize> {
        Some(self.params.values.len())
    }

    fn evaluate(&self, _ctx: &EvaluationContext<'_>) -> Result<Evaluation> {
        Ok(Evaluation::complete(
            self.params
                .values
                .iter()
                .map(|v| single(&self.params.name, v.clone()))
                .collect(),
        ))
    }
}

// ============================================================================
// Uniform
// ============================================================================

/// Parameters of [`UniformVariation`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UniformParams {
    pub name: String,
    #[serde(alias = "count")]
    pub num_variations: usize,
    pub min: f64,
    pub max: f64,
    #[serde(rename = "type", default)]
    pub value_type: ValueType,
    #[serde(default)]
    pub seed: Option<u64>,
}

/// `num_variations` draws from `Uniform[min, max]`.
///
/// For `bool`, `max` is the probability of `true`.
#[derive(Clone, Debug, PartialEq)]
pub struct UniformVariation {
    params: UniformParams,
}

impl UniformVariation {
    pub const KIND: &'static str = "ParameterVariationDistributionUniform";

    pub fn new(params: UniformParams) -> Result<Self> {
        validate_name(Self::KIND, &params.name)?;
        validate_count(Self::KIND, params.num_variations)?;
        if !(params.min.is_finite() && params.max.is_finite()) {
            return Err(VariationError::Config(format!(
                "{}: min and max must be finite",
                Self::KIND
            )));
        }
        if params.min > params.max {
            return Err(VariationError::Config(format!(
                "{}: min {} is greater than max {}",
                Self::KIND,
                params.min,
                params.max
            )));
        }
        Ok(Self { params })
    }

    pub fn build(params: &serde_yaml::Value, _general: &GeneralSettings) -> Result<Box<dyn Variation>> {
        Ok(Box::new(Self::new(parse_params(Self::KIND, params)?)?))
    }

    fn draw(&self, rng: &mut VariationRng) -> Result<ParameterValue> {
        let p = &self.params;
        if p.value_type == ValueType::Bool {
            return Ok(ParameterValue::Bool(rng.random::<f64>() < p.max));
        }
        let uniform = Uniform::new_inclusive(p.min, p.max)
            .map_err(|e| VariationError::Config(format!("{}: {}", Self::KIND, e)))?;
        Ok(p.value_type.coerce(uniform.sample(rng)))
    }
}

impl Variation for UniformVariation {
    fn kind(&self) -> &'static str {
        Self::KIND
    }

    fn outputs(&self) -> Vec<String> {
        vec![self.params.name.clone()]
    }

    fn expected_count(&self) -> Option<usize> {
        Some(self.params.num_variations)
    }

    fn evaluate(&self, ctx: &EvaluationContext<'_>) -> Result<Evaluation> {
        let seed = self.params.seed.unwrap_or_else(|| ctx.default_seed(Self::KIND));
        let mut rng = rng_from_seed(seed);
        let assignments = (0..self.params.num_variations)
            .map(|_| Ok(single(&self.params.name, self.draw(&mut rng)?)))
            .collect::<Result<Vec<_>>>()?;
        Ok(Evaluation::complete(assignments))
    }
}

// ============================================================================
// Gaussian
// ============================================================================

/// Parameters of [`GaussianVariation`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GaussianParams {
    pub name: String,
    #[serde(alias = "count")]
    pub num_variations: usize,
    pub mean: f64,
    pub std: f64,
    #[serde(default)]
    pub min: Option<f64>,
    #[serde(default)]
    pub max: Option<f64>,
    #[serde(rename = "type", default)]
    pub value_type: ValueType,
    #[serde(default)]
    pub seed: Option<u64>,
}

/// `num_variations` draws from `Normal(mean, std)`, redrawn until inside `[min, max]`.
///
/// For `bool`, a draw at or above `mean` is `true`.
#[derive(Clone, Debug, PartialEq)]
pub struct GaussianVariation {
    params: GaussianParams,
}

impl GaussianVariation {
    pub const KIND: &'static str = "ParameterVariationDistributionGaussian";

    pub fn new(params: GaussianParams) -> Result<Self> {
        validate_name(Self::KIND, &params.name)?;
        validate_count(Self::KIND, params.num_variations)?;
        if !(params.mean.is_finite() && params.std.is_finite()) {
            return Err(VariationError::Config(format!(
                "{}: mean and std must be finite",
                Self::KIND
            )));
        }
        if params.std < 0.0 {
            return Err(VariationError::Config(format!(
                "{}: std must be non-negative, got {}",
                Self::KIND,
                params.std
            )));
        }
        if let (Some(min), Some(max)) = (params.min, params.max)
            && min >= max
        {
            return Err(VariationError::Config(format!(
                "{}: min {} must be less than max {}",
                Self::KIND,
                min,
                max
            )));
        }
        Ok(Self { params })
    }

    pub fn build(params: &serde_yaml::Value, _general: &GeneralSettings) -> Result<Box<dyn Variation>> {
        Ok(Box::new(Self::new(parse_params(Self::KIND, params)?)?))
    }

    #[inline]
    fn in_range(&self, sample: f64) -> bool {
        self.params.min.is_none_or(|min| sample >= min) && self.params.max.is_none_or(|max| sample <= max)
    }

    fn draw(&self, rng: &mut VariationRng, max_redraws: u32) -> Result<ParameterValue> {
        let p = &self.params;
        for _ in 0..=max_redraws {
            let n: f64 = rng.sample(StandardNormal);
            let sample = p.mean + p.std * n;
            if !self.in_range(sample) {
                continue;
            }
            return Ok(match p.value_type {
                ValueType::Bool => ParameterValue::Bool(sample >= p.mean),
                other => other.coerce(sample),
            });
        }
        Err(VariationError::Config(format!(
            "{}: no draw of N({}, {}) fell inside [{:?}, {:?}] after {} redraws",
            Self::KIND,
            p.mean,
            p.std,
            p.min,
            p.max,
            max_redraws
        )))
    }
}

impl Variation for GaussianVariation {
    fn kind(&self) -> &'static str {
        Self::KIND
    }

    fn outputs(&self) -> Vec<String> {
        vec![self.params.name.clone()]
    }

    fn expected_count(&self) -> Option<usize> {
        Some(self.params.num_variations)
    }

    fn evaluate(&self, ctx: &EvaluationContext<'_>) -> Result<Evaluation> {
        let seed = self.params.seed.unwrap_or_else(|| ctx.default_seed(Self::KIND));
        let mut rng = rng_from_seed(seed);
        let redraws = ctx.limits.max_distribution_redraws;
        let assignments = (0..self.params.num_variations)
            .map(|_| Ok(single(&self.params.name, self.draw(&mut rng, redraws)?)))
            .collect::<Result<Vec<_>>>()?;
        Ok(Evaluation::complete(assignments))
    }
}
