//! File formats.
//!
//! - [`ros_map`]: occupancy maps as ROS YAML + PGM/PNG
//! - [`variants`]: generated configurations as YAML

pub mod ros_map;
pub mod variants;

pub use ros_map::{MapMetadata, load_ros_map, save_ros_map};
pub use variants::{variants_to_yaml, write_variants};
