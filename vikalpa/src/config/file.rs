//! Variation file loading.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use super::defaults;
use super::general::GeneralSettings;
use crate::error::{Result, VariationError};
use crate::variation::{ParameterAssignment, ParameterValue, VariationSpec};

/// Root of a variation file.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct VariationFile {
    pub settings: Settings,

    /// Directory that relative map paths are resolved against.
    #[serde(skip)]
    pub base_dir: Option<PathBuf>,
}

/// The `settings` section.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Settings {
    /// File format version
    #[serde(default = "defaults::version")]
    pub version: u32,

    /// Settings shared by all scenarios
    #[serde(default)]
    pub general: GeneralSettings,

    /// Scenario declarations, in output order
    #[serde(default)]
    pub configuration: Vec<ScenarioConfig>,
}

/// One scenario as written in the file.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ScenarioConfig {
    /// Scenario name, used as the configuration name prefix
    pub name: String,

    /// Occupancy map YAML, relative to the variation file
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub map_file: Option<PathBuf>,

    /// Fixed parameters, one single-key mapping per entry
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parameters: Option<Vec<IndexMap<String, ParameterValue>>>,

    /// Variations whose outputs are multiplied together
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub variations: Option<Vec<VariationSpec>>,
}

/// What a scenario asks the engine to do.
#[derive(Clone, Debug, PartialEq)]
pub enum ScenarioPlan {
    /// Exactly one configuration, no composition.
    Fixed(ParameterAssignment),
    /// Cartesian product over the variations, in declaration order.
    Varied(Vec<VariationSpec>),
}

/// A validated scenario ready for generation.
#[derive(Clone, Debug, PartialEq)]
pub struct Scenario {
    pub name: String,
    pub map_file: Option<PathBuf>,
    pub plan: ScenarioPlan,
}

impl VariationFile {
    /// Load a variation file; relative map paths resolve against its directory.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            VariationError::Io(format!("Failed to read {}: {}", path.display(), e))
        })?;
        let mut file = Self::from_yaml(&contents)?;
        file.base_dir = path.parent().map(Path::to_path_buf);
        Ok(file)
    }

    /// Load from default path (configs/variations.yaml)
    pub fn load_default() -> Result<Self> {
        Self::load(Path::new("configs/variations.yaml"))
    }

    /// Parse from YAML string
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        serde_yaml::from_str(yaml).map_err(|e| VariationError::Config(e.to_string()))
    }

    /// Validate every scenario and convert it to a plan.
    pub fn scenarios(&self) -> Result<Vec<Scenario>> {
        let mut seen = HashSet::new();
        let mut scenarios = Vec::with_capacity(self.settings.configuration.len());

        for config in &self.settings.configuration {
            if !seen.insert(config.name.as_str()) {
                return Err(VariationError::Config(format!(
                    "duplicate scenario name '{}'",
                    config.name
                )));
            }
            let mut scenario = config.to_scenario()?;
            if let (Some(base), Some(map)) = (&self.base_dir, &scenario.map_file)
                && map.is_relative()
            {
                scenario.map_file = Some(base.join(map));
            }
            scenarios.push(scenario);
        }

        Ok(scenarios)
    }
}

impl ScenarioConfig {
    /// Validate the parameters/variations split.
    pub fn to_scenario(&self) -> Result<Scenario> {
        if self.name.trim().is_empty() {
            return Err(VariationError::Config("scenario name is empty".to_string()));
        }

        let plan = match (&self.parameters, &self.variations) {
            (Some(_), Some(_)) => {
                return Err(VariationError::Config(format!(
                    "scenario '{}' declares both parameters and variations",
                    self.name
                )));
            }
            (None, None) => {
                return Err(VariationError::Config(format!(
                    "scenario '{}' declares neither parameters nor variations",
                    self.name
                )));
            }
            (Some(entries), None) => ScenarioPlan::Fixed(self.flatten_parameters(entries)?),
            (None, Some(variations)) => ScenarioPlan::Varied(variations.clone()),
        };

        Ok(Scenario {
            name: self.name.clone(),
            map_file: self.map_file.clone(),
            plan,
        })
    }

    fn flatten_parameters(
        &self,
        entries: &[IndexMap<String, ParameterValue>],
    ) -> Result<ParameterAssignment> {
        let mut assigned = ParameterAssignment::new();
        for entry in entries {
            for (name, value) in entry {
                if assigned.insert(name.clone(), value.clone()).is_some() {
                    return Err(VariationError::Config(format!(
                        "scenario '{}' assigns parameter '{}' twice",
                        self.name, name
                    )));
                }
            }
        }
        Ok(assigned)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FILE: &str = r#"
settings:
  general:
    robot_diameter: 0.35
  configuration:
    - name: sweep
      map_file: maps/office.yaml
      variations:
        - ParameterVariationList:
            name: v
            values: [1.0, 2.0]
    - name: baseline
      parameters:
        - speed: 0.5
        - mode: cautious
"#;

    #[test]
    fn test_parse_and_plan() {
        let file = VariationFile::from_yaml(FILE).unwrap();
        assert_eq!(file.settings.version, 1);
        assert_eq!(file.settings.general.robot_diameter, 0.35);

        let scenarios = file.scenarios().unwrap();
        assert_eq!(scenarios.len(), 2);
        assert!(matches!(&scenarios[0].plan, ScenarioPlan::Varied(v) if v.len() == 1));
        match &scenarios[1].plan {
            ScenarioPlan::Fixed(params) => {
                let names: Vec<_> = params.keys().cloned().collect();
                assert_eq!(names, vec!["speed", "mode"]);
            }
            other => panic!("unexpected plan {:?}", other),
        }
    }

    #[test]
    fn test_map_path_relative_to_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("variations.yaml");
        std::fs::write(&path, FILE).unwrap();

        let file = VariationFile::load(&path).unwrap();
        let scenarios = file.scenarios().unwrap();
        assert_eq!(
            scenarios[0].map_file.as_deref(),
            Some(dir.path().join("maps/office.yaml").as_path())
        );
    }

    #[test]
    fn test_mixing_fixed_and_varied_is_config_error() {
        let yaml = r#"
settings:
  configuration:
    - name: both
      parameters: [{speed: 1.0}]
      variations:
        - ParameterVariationList: {name: v, values: [1]}
"#;
        let file = VariationFile::from_yaml(yaml).unwrap();
        assert!(matches!(file.scenarios(), Err(VariationError::Config(_))));
    }

    #[test]
    fn test_duplicate_names_rejected() {
        let yaml = r#"
settings:
  configuration:
    - name: a
      parameters: [{speed: 1.0}, {speed: 2.0}]
"#;
        let file = VariationFile::from_yaml(yaml).unwrap();
        assert!(matches!(file.scenarios(), Err(VariationError::Config(_))));

        let yaml = r#"
settings:
  configuration:
    - name: a
      parameters: [{speed: 1.0}]
    - name: a
      parameters: [{speed: 2.0}]
"#;
        let file = VariationFile::from_yaml(yaml).unwrap();
        assert!(matches!(file.scenarios(), Err(VariationError::Config(_))));
    }

    #[test]
    fn test_empty_scenario_rejected() {
        let yaml = "settings:\n  configuration:\n    - name: nothing\n";
        let file = VariationFile::from_yaml(yaml).unwrap();
        assert!(file.scenarios().is_err());
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let err = VariationFile::load(Path::new("/nonexistent/variations.yaml")).unwrap_err();
        assert!(matches!(err, VariationError::Io(_)));
    }
}
