//! Placed obstacle value.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::pose::Pose2D;

/// One obstacle instance ready to be spawned by the simulator.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Obstacle {
    /// Spawn entity name, unique within one obstacle set.
    pub entity_name: String,
    /// Model (e.g. xacro file) to instantiate.
    pub model: String,
    /// Arguments forwarded to the model.
    #[serde(default)]
    pub xacro_arguments: BTreeMap<String, String>,
    /// Placement pose.
    pub pose: Pose2D,
}
