//! Declarative variation entries as they appear in a variation file.
//!
//! Each entry is a single-key mapping from the kind name to its parameters:
//!
//! ```yaml
//! - ParameterVariationList:
//!     name: speed
//!     values: [0.2, 0.5]
//! ```

use std::collections::BTreeMap;
use std::fmt;

use serde::de::{self, Deserializer};
use serde::ser::{SerializeMap, Serializer};
use serde::{Deserialize, Serialize};

/// One variation kind plus its raw parameters.
#[derive(Clone, Debug, PartialEq)]
pub struct VariationSpec {
    /// Registered kind name.
    pub kind: String,
    /// Parameters, validated by the kind when it is built.
    pub parameters: serde_yaml::Value,
}

impl VariationSpec {
    /// Create a spec from a kind name and any serializable parameter struct.
    pub fn new(kind: impl Into<String>, parameters: serde_yaml::Value) -> Self {
        Self {
            kind: kind.into(),
            parameters,
        }
    }
}

impl fmt::Display for VariationSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.parameters.get("name").and_then(|n| n.as_str()) {
            Some(name) => write!(f, "{}({})", self.kind, name),
            None => write!(f, "{}", self.kind),
        }
    }
}

impl Serialize for VariationSpec {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(1))?;
        map.serialize_entry(&self.kind, &self.parameters)?;
        map.end()
    }
}

impl<'de> Deserialize<'de> for VariationSpec {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let entry = BTreeMap::<String, serde_yaml::Value>::deserialize(deserializer)?;
        if entry.len() != 1 {
            return Err(de::Error::custom(format!(
                "variation entry must have exactly one kind, found {}",
                entry.len()
            )));
        }
        let (kind, parameters) = entry
            .into_iter()
            .next()
            .ok_or_else(|| de::Error::custom("empty variation entry"))?;
        Ok(Self { kind, parameters })
    }
}
