//! `@name` parameter references.
//!
//! A reference names a parameter assigned earlier in the same composition
//! pass. Path kinds use references both to read a start pose and to name
//! the goal parameter they emit.

use serde::{Deserialize, Serialize};

use super::ParameterAssignment;
use super::value::ParameterValue;
use crate::core::Pose2D;
use crate::error::{Result, VariationError};

/// Prefix marking a string as a parameter reference.
pub const REFERENCE_SIGIL: char = '@';

/// Extract the referenced name from `@name`.
pub fn parse_reference(raw: &str) -> Option<&str> {
    raw.strip_prefix(REFERENCE_SIGIL)
        .map(str::trim)
        .filter(|name| !name.is_empty())
}

/// Look up a referenced parameter among those already assigned.
pub fn resolve<'a>(assigned: &'a ParameterAssignment, name: &str) -> Result<&'a ParameterValue> {
    assigned.get(name).ok_or_else(|| {
        VariationError::Reference(format!(
            "'{}{}' does not match any parameter assigned so far",
            REFERENCE_SIGIL, name
        ))
    })
}

/// Look up a referenced parameter that must hold a single pose.
pub fn resolve_pose(assigned: &ParameterAssignment, name: &str) -> Result<Pose2D> {
    let value = resolve(assigned, name)?;
    value.as_pose().ok_or_else(|| {
        VariationError::Reference(format!(
            "'{}{}' is a {}, expected a pose",
            REFERENCE_SIGIL,
            name,
            value.type_name()
        ))
    })
}

/// Where a path starts: a referenced parameter or a literal pose.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PoseSource {
    Reference(String),
    Literal(Pose2D),
}

impl PoseSource {
    /// Reject strings that are not well-formed references.
    pub fn validate(&self, field: &str) -> Result<()> {
        match self {
            PoseSource::Reference(raw) if parse_reference(raw).is_none() => {
                Err(VariationError::Config(format!(
                    "{} must be a pose or an '{}name' reference, got '{}'",
                    field, REFERENCE_SIGIL, raw
                )))
            }
            _ => Ok(()),
        }
    }

    /// Whether this start depends on previously assigned parameters.
    pub fn is_reference(&self) -> bool {
        matches!(self, PoseSource::Reference(_))
    }

    /// Resolve to a concrete pose.
    pub fn resolve(&self, assigned: &ParameterAssignment) -> Result<Pose2D> {
        match self {
            PoseSource::Literal(pose) => Ok(*pose),
            PoseSource::Reference(raw) => {
                let name = parse_reference(raw).ok_or_else(|| {
                    VariationError::Reference(format!("malformed reference '{}'", raw))
                })?;
                resolve_pose(assigned, name)
            }
        }
    }
}

/// Output parameter for generated goals, derived from the reference syntax.
///
/// `@goal_pose` yields one pose named `goal_pose`; `@goal_poses` yields a
/// pose list named `goal_poses`. Only the suffix of the referenced name
/// matters, so `@dock_pose` and `@patrol_poses` work the same way.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum GoalBinding {
    Single(String),
    Plural(String),
}

impl GoalBinding {
    /// Derive the binding from the `goal_pose` / `goal_poses` parameters.
    pub fn from_params(goal_pose: Option<&str>, goal_poses: Option<&str>) -> Result<Self> {
        let raw = match (goal_pose, goal_poses) {
            (Some(_), Some(_)) => {
                return Err(VariationError::Config(
                    "only one of goal_pose and goal_poses may be given".to_string(),
                ));
            }
            (Some(raw), None) | (None, Some(raw)) => raw,
            (None, None) => {
                return Err(VariationError::Config(
                    "one of goal_pose or goal_poses is required".to_string(),
                ));
            }
        };

        let name = parse_reference(raw).ok_or_else(|| {
            VariationError::Config(format!(
                "goal output must be an '{}name' reference, got '{}'",
                REFERENCE_SIGIL, raw
            ))
        })?;

        if name.ends_with("poses") {
            Ok(GoalBinding::Plural(name.to_string()))
        } else if name.ends_with("pose") {
            Ok(GoalBinding::Single(name.to_string()))
        } else {
            Err(VariationError::Config(format!(
                "goal reference '{}' must end in 'pose' or 'poses'",
                raw
            )))
        }
    }

    /// Output parameter name.
    pub fn name(&self) -> &str {
        match self {
            GoalBinding::Single(name) | GoalBinding::Plural(name) => name,
        }
    }

    /// Check the binding can carry `num_goal_poses` goals.
    pub fn check_count(&self, num_goal_poses: usize) -> Result<()> {
        if num_goal_poses == 0 {
            return Err(VariationError::Config(
                "num_goal_poses must be at least 1".to_string(),
            ));
        }
        if let GoalBinding::Single(name) = self
            && num_goal_poses != 1
        {
            return Err(VariationError::Config(format!(
                "'{}' holds a single pose but num_goal_poses is {}",
                name, num_goal_poses
            )));
        }
        Ok(())
    }

    /// Wrap generated goals in the shape this binding emits.
    pub fn value(&self, goals: &[Pose2D]) -> Result<ParameterValue> {
        match self {
            GoalBinding::Plural(_) => Ok(ParameterValue::Poses(goals.to_vec())),
            GoalBinding::Single(name) => match goals {
                [goal] => Ok(ParameterValue::Pose(*goal)),
                _ => Err(VariationError::Generation(format!(
                    "'{}' expects exactly one goal, path has {}",
                    name,
                    goals.len()
                ))),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_reference() {
        assert_eq!(parse_reference("@start_pose"), Some("start_pose"));
        assert_eq!(parse_reference("start_pose"), None);
        assert_eq!(parse_reference("@"), None);
    }

    #[test]
    fn test_resolve_pose() {
        let mut assigned = ParameterAssignment::new();
        assigned.insert("start".into(), ParameterValue::Pose(Pose2D::new(1.0, 2.0, 0.0)));
        assigned.insert("speed".into(), ParameterValue::Float(0.5));

        assert_eq!(resolve_pose(&assigned, "start").unwrap(), Pose2D::new(1.0, 2.0, 0.0));
        assert!(matches!(
            resolve_pose(&assigned, "speed"),
            Err(VariationError::Reference(_))
        ));
        assert!(matches!(
            resolve_pose(&assigned, "missing"),
            Err(VariationError::Reference(_))
        ));
    }

    #[test]
    fn test_pose_source_yaml() {
        let s: PoseSource = serde_yaml::from_str("\"@start_pose\"").unwrap();
        assert!(s.is_reference());
        assert!(s.validate("start_pose").is_ok());

        let s: PoseSource = serde_yaml::from_str("{x: 0.0, y: 0.0, yaw: 0.0}").unwrap();
        assert_eq!(s.resolve(&ParameterAssignment::new()).unwrap(), Pose2D::default());

        let s: PoseSource = serde_yaml::from_str("start_pose").unwrap();
        assert!(s.validate("start_pose").is_err());
    }

    #[test]
    fn test_goal_binding_is_syntactic() {
        let single = GoalBinding::from_params(Some("@goal_pose"), None).unwrap();
        assert_eq!(single, GoalBinding::Single("goal_pose".into()));
        assert!(single.check_count(1).is_ok());
        assert!(single.check_count(3).is_err());

        let plural = GoalBinding::from_params(None, Some("@goal_poses")).unwrap();
        assert_eq!(plural.name(), "goal_poses");
        // A plural binding with one goal still emits a list
        let value = plural.value(&[Pose2D::default()]).unwrap();
        assert_eq!(value, ParameterValue::Poses(vec![Pose2D::default()]));

        // The key used does not matter, only the reference text
        let swapped = GoalBinding::from_params(Some("@goal_poses"), None).unwrap();
        assert!(matches!(swapped, GoalBinding::Plural(_)));

        assert!(GoalBinding::from_params(Some("@a"), Some("@b")).is_err());
        assert!(GoalBinding::from_params(None, None).is_err());
        assert!(GoalBinding::from_params(Some("goal_pose"), None).is_err());
        assert!(GoalBinding::from_params(Some("@target"), None).is_err());
    }
}
