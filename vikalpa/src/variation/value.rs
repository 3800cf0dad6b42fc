//! Concrete parameter values.

use std::fmt;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::core::{Obstacle, Pose2D};

/// One concrete value assigned to a scenario parameter.
///
/// Serialized untagged, so YAML scalars, poses (`{x, y, yaw}`) and lists
/// map onto the natural variant. Variant order matters for deserialization:
/// a mapping with exactly pose fields becomes a [`ParameterValue::Pose`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParameterValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
    Pose(Pose2D),
    Poses(Vec<Pose2D>),
    Obstacles(Vec<Obstacle>),
    List(Vec<ParameterValue>),
    Map(IndexMap<String, ParameterValue>),
}

impl ParameterValue {
    /// Short type name used in error messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            ParameterValue::Bool(_) => "bool",
            ParameterValue::Int(_) => "int",
            ParameterValue::Float(_) => "float",
            ParameterValue::String(_) => "string",
            ParameterValue::Pose(_) => "pose",
            ParameterValue::Poses(_) => "list[pose]",
            ParameterValue::Obstacles(_) => "list[obstacle]",
            ParameterValue::List(_) => "list",
            ParameterValue::Map(_) => "mapping",
        }
    }

    /// The pose, if this is a single pose.
    pub fn as_pose(&self) -> Option<Pose2D> {
        match self {
            ParameterValue::Pose(p) => Some(*p),
            _ => None,
        }
    }

    /// Numeric value of an int or float.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            ParameterValue::Int(v) => Some(*v as f64),
            ParameterValue::Float(v) => Some(*v),
            _ => None,
        }
    }

    /// Every pose carried by this value (single pose or pose list).
    pub fn poses(&self) -> &[Pose2D] {
        match self {
            ParameterValue::Pose(p) => std::slice::from_ref(p),
            ParameterValue::Poses(p) => p,
            _ => &[],
        }
    }
}

impl From<f64> for ParameterValue {
    fn from(v: f64) -> Self {
        ParameterValue::Float(v)
    }
}

impl From<i64> for ParameterValue {
    fn from(v: i64) -> Self {
        ParameterValue::Int(v)
    }
}

impl From<bool> for ParameterValue {
    fn from(v: bool) -> Self {
        ParameterValue::Bool(v)
    }
}

impl From<&str> for ParameterValue {
    fn from(v: &str) -> Self {
        ParameterValue::String(v.to_string())
    }
}

impl From<Pose2D> for ParameterValue {
    fn from(v: Pose2D) -> Self {
        ParameterValue::Pose(v)
    }
}

impl fmt::Display for ParameterValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParameterValue::Bool(v) => write!(f, "{}", v),
            ParameterValue::Int(v) => write!(f, "{}", v),
            ParameterValue::Float(v) => write!(f, "{}", v),
            ParameterValue::String(v) => write!(f, "{}", v),
            ParameterValue::Pose(p) => write!(f, "{}", p),
            ParameterValue::Poses(p) => write!(f, "[{} poses]", p.len()),
            ParameterValue::Obstacles(o) => write!(f, "[{} obstacles]", o.len()),
            ParameterValue::List(l) => write!(f, "[{} items]", l.len()),
            ParameterValue::Map(m) => write!(f, "{{{} keys}}", m.len()),
        }
    }
}

/// Coercion applied to sampled numbers.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValueType {
    #[serde(alias = "integer")]
    Int,
    #[default]
    #[serde(alias = "double", alias = "number")]
    Float,
    String,
    Bool,
}

impl ValueType {
    /// Coerce a numeric sample. `Bool` is handled by each distribution.
    pub fn coerce(self, sample: f64) -> ParameterValue {
        match self {
            ValueType::Int => ParameterValue::Int(sample.round() as i64),
            ValueType::Float => ParameterValue::Float(sample),
            ValueType::String => ParameterValue::String(sample.to_string()),
            ValueType::Bool => ParameterValue::Bool(sample != 0.0),
        }
    }
}
