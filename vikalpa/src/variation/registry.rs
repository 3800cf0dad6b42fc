//! Kind name to builder lookup.

use std::collections::BTreeMap;

use super::obstacle::ObstacleVariation;
use super::parameter::{GaussianVariation, ListVariation, UniformVariation};
use super::path::{RandomPathVariation, RasterPathVariation};
use super::spec::VariationSpec;
use super::Variation;
use crate::config::GeneralSettings;
use crate::error::{Result, VariationError};

/// Builds a variation from its raw parameters.
pub type VariationBuilder = fn(&serde_yaml::Value, &GeneralSettings) -> Result<Box<dyn Variation>>;

/// Registered variation kinds.
#[derive(Clone, Debug, Default)]
pub struct VariationRegistry {
    builders: BTreeMap<&'static str, VariationBuilder>,
}

impl VariationRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry holding every built-in kind.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register(ListVariation::KIND, ListVariation::build);
        registry.register(UniformVariation::KIND, UniformVariation::build);
        registry.register(GaussianVariation::KIND, GaussianVariation::build);
        registry.register(RandomPathVariation::KIND, RandomPathVariation::build);
        registry.register(RasterPathVariation::KIND, RasterPathVariation::build);
        registry.register(ObstacleVariation::KIND, ObstacleVariation::build);
        registry
    }

    /// Register a kind, returning the builder it replaced.
    pub fn register(&mut self, kind: &'static str, builder: VariationBuilder) -> Option<VariationBuilder> {
        self.builders.insert(kind, builder)
    }

    /// Whether `kind` is registered.
    pub fn contains(&self, kind: &str) -> bool {
        self.builders.contains_key(kind)
    }

    /// Registered kind names, sorted.
    pub fn kinds(&self) -> Vec<&'static str> {
        self.builders.keys().copied().collect()
    }

    /// Build the variation described by `spec`.
    pub fn build(&self, spec: &VariationSpec, general: &GeneralSettings) -> Result<Box<dyn Variation>> {
        let builder = self.builders.get(spec.kind.as_str()).ok_or_else(|| {
            VariationError::Config(format!(
                "unknown variation kind '{}' (known: {})",
                spec.kind,
                self.kinds().join(", ")
            ))
        })?;
        builder(&spec.parameters, general)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spec(yaml: &str) -> VariationSpec {
        serde_yaml::from_str(yaml).unwrap()
    }

    #[test]
    fn test_default_kinds() {
        let registry = VariationRegistry::with_defaults();
        assert_eq!(
            registry.kinds(),
            [
                "ObstacleVariation",
                "ParameterVariationDistributionGaussian",
                "ParameterVariationDistributionUniform",
                "ParameterVariationList",
                "PathVariationRandom",
                "PathVariationRasterized",
            ]
        );
    }

    #[test]
    fn test_build_known_kind() {
        let registry = VariationRegistry::with_defaults();
        let variation = registry
            .build(
                &spec("ParameterVariationList: {name: v, values: [1.0, 2.0, 3.0]}"),
                &GeneralSettings::default(),
            )
            .unwrap();
        assert_eq!(variation.kind(), "ParameterVariationList");
        assert_eq!(variation.expected_count(), Some(3));
        assert_eq!(variation.outputs(), ["v"]);
    }

    #[test]
    fn test_unknown_kind_and_field() {
        let registry = VariationRegistry::with_defaults();
        let general = GeneralSettings::default();
        assert!(matches!(
            registry.build(&spec("FloorplanVariation: {name: f}"), &general),
            Err(VariationError::Config(_))
        ));
        let err = registry
            .build(&spec("ParameterVariationList: {name: v, values: [1], extra: 2}"), &general)
            .unwrap_err();
        assert!(err.to_string().contains("ParameterVariationList"));
    }

    #[test]
    fn test_register_custom_kind() {
        fn build_list(params: &serde_yaml::Value, general: &GeneralSettings) -> Result<Box<dyn Variation>> {
            ListVariation::build(params, general)
        }
        let mut registry = VariationRegistry::new();
        assert!(registry.register("Custom", build_list).is_none());
        assert!(registry.contains("Custom"));
        assert!(!registry.contains("ParameterVariationList"));
    }
}
