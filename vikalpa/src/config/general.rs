//! Settings shared by every scenario in a variation file.

use serde::{Deserialize, Serialize};

use super::defaults;

/// Bounds on synthesis effort.
///
/// Each bound turns a search that could loop forever into a reported
/// generation failure.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SynthesisLimits {
    /// Full START→EXTEND→VALIDATE attempts per random path.
    #[serde(default = "defaults::max_path_attempts")]
    pub max_path_attempts: u32,

    /// Candidate draws per waypoint inside one EXTEND pass.
    #[serde(default = "defaults::max_waypoint_samples")]
    pub max_waypoint_samples: u32,

    /// Placement draws per requested obstacle.
    #[serde(default = "defaults::obstacle_attempts_per_obstacle")]
    pub obstacle_attempts_per_obstacle: u32,

    /// Redraws per Gaussian sample before the range is declared unreachable.
    #[serde(default = "defaults::max_distribution_redraws")]
    pub max_distribution_redraws: u32,
}

impl Default for SynthesisLimits {
    fn default() -> Self {
        Self {
            max_path_attempts: defaults::max_path_attempts(),
            max_waypoint_samples: defaults::max_waypoint_samples(),
            obstacle_attempts_per_obstacle: defaults::obstacle_attempts_per_obstacle(),
            max_distribution_redraws: defaults::max_distribution_redraws(),
        }
    }
}

/// General section of a variation file.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GeneralSettings {
    /// Robot diameter in meters, used when a spatial variation omits it.
    #[serde(default = "defaults::robot_diameter")]
    pub robot_diameter: f32,

    /// Synthesis effort bounds.
    #[serde(default)]
    pub limits: SynthesisLimits,
}

impl Default for GeneralSettings {
    fn default() -> Self {
        Self {
            robot_diameter: defaults::robot_diameter(),
            limits: SynthesisLimits::default(),
        }
    }
}
