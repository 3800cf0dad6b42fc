//! Angle and polyline helpers.

use std::f32::consts::PI;

use super::point::WorldPoint;

const TWO_PI: f32 = 2.0 * PI;

/// Normalize angle to [-π, π).
#[inline]
pub fn normalize_angle(angle: f32) -> f32 {
    let mut a = angle % TWO_PI;
    if a >= PI {
        a -= TWO_PI;
    } else if a < -PI {
        a += TWO_PI;
    }
    a
}

/// Sum of Euclidean segment lengths over consecutive points.
///
/// Accumulates in f64 so long paths built from many short segments do not
/// drift from the same path built in one piece.
pub fn polyline_length(points: impl IntoIterator<Item = WorldPoint>) -> f32 {
    let mut total = 0.0f64;
    let mut prev: Option<WorldPoint> = None;
    for p in points {
        if let Some(q) = prev {
            total += q.distance(&p) as f64;
        }
        prev = Some(p);
    }
    total as f32
}
