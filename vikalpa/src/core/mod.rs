//! Core value types shared by the map model and the synthesizers.
//!
//! - [`GridCoord`] and [`WorldPoint`]: Coordinate types
//! - [`Pose2D`]: Position + yaw, the unit of every start/goal parameter
//! - [`Path`]: Ordered waypoints with cached length and validity flag
//! - [`Obstacle`]: Model + arguments + pose of one placed obstacle

mod math;
mod obstacle;
mod path;
mod point;
mod pose;

pub use math::{normalize_angle, polyline_length};
pub use obstacle::Obstacle;
pub use path::Path;
pub use point::{GridCoord, WorldPoint};
pub use pose::Pose2D;
