//! Waypoint path produced by the path synthesizers.

use serde::{Deserialize, Serialize};

use super::math::polyline_length;
use super::pose::Pose2D;

/// An ordered sequence of waypoints.
///
/// `length` is always the sum of straight segment lengths between
/// consecutive waypoints. `valid` is set by the synthesizer once the
/// path has passed its clearance and length checks.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Path {
    /// Waypoints, start first.
    pub waypoints: Vec<Pose2D>,
    /// Total length in meters.
    pub length: f32,
    /// Whether the path passed validation.
    pub valid: bool,
}

impl Path {
    /// Build an unvalidated path from waypoints.
    pub fn new(waypoints: Vec<Pose2D>) -> Self {
        let length = polyline_length(waypoints.iter().map(Pose2D::position));
        Self {
            waypoints,
            length,
            valid: false,
        }
    }

    /// Mark the validation outcome.
    #[inline]
    pub fn with_validity(mut self, valid: bool) -> Self {
        self.valid = valid;
        self
    }

    /// Whether `length` lies within `target ± tolerance`.
    #[inline]
    pub fn length_within(&self, target: f32, tolerance: f32) -> bool {
        (self.length - target).abs() <= tolerance
    }

    /// First waypoint.
    #[inline]
    pub fn start(&self) -> Option<&Pose2D> {
        self.waypoints.first()
    }

    /// All waypoints after the start.
    #[inline]
    pub fn goals(&self) -> &[Pose2D] {
        self.waypoints.get(1..).unwrap_or(&[])
    }

    /// Number of waypoints.
    #[inline]
    pub fn len(&self) -> usize {
        self.waypoints.len()
    }

    /// Whether the path has no waypoints.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.waypoints.is_empty()
    }
}
