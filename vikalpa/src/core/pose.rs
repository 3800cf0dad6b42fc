//! 2D pose type used for start, goal and obstacle placement.
//!
//! Coordinate frame follows ROS REP-103:
//! - X-forward, Y-left, Z-up (right-handed)
//! - Counter-clockwise positive rotation

use serde::{Deserialize, Serialize};

use super::math::normalize_angle;
use super::point::WorldPoint;

/// A 2D pose: position in meters plus yaw in radians.
///
/// Equality is exact. Two poses produced from the same seed compare equal,
/// poses that merely lie close together do not.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Pose2D {
    /// X position in meters.
    pub x: f32,
    /// Y position in meters.
    pub y: f32,
    /// Heading in radians, CCW positive from X-axis.
    #[serde(default)]
    pub yaw: f32,
}

impl Pose2D {
    /// Create a new pose, normalizing `yaw` to [-π, π).
    #[inline]
    pub fn new(x: f32, y: f32, yaw: f32) -> Self {
        Self {
            x,
            y,
            yaw: normalize_angle(yaw),
        }
    }

    /// Create a pose from a position and heading.
    #[inline]
    pub fn from_position(position: WorldPoint, yaw: f32) -> Self {
        Self::new(position.x, position.y, yaw)
    }

    /// Get the position as a WorldPoint.
    #[inline]
    pub fn position(&self) -> WorldPoint {
        WorldPoint::new(self.x, self.y)
    }

    /// Euclidean distance between the positions of two poses.
    #[inline]
    pub fn distance(&self, other: &Pose2D) -> f32 {
        self.position().distance(&other.position())
    }

    /// Heading from this pose's position towards another position.
    #[inline]
    pub fn heading_to(&self, other: &Pose2D) -> f32 {
        self.position().angle_to(&other.position())
    }
}

impl std::fmt::Display for Pose2D {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({:.3}, {:.3}, {:.3})", self.x, self.y, self.yaw)
    }
}
