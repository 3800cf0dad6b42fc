//! Test utilities for Vikalpa integration tests.
//!
//! Fixtures are written to temporary directories so every test sees a
//! fresh map and variation file.

#![allow(dead_code)]

use std::path::{Path, PathBuf};

use vikalpa::io::save_ros_map;
use vikalpa::{OccupancyMap, Pose2D, WorldPoint};

/// 10m x 10m room with 0.2m walls on every side.
pub fn walled_room() -> OccupancyMap {
    OccupancyMap::empty(100, 100, 0.1, Pose2D::default())
        .expect("valid map")
        .with_rect(WorldPoint::new(0.0, 0.0), WorldPoint::new(10.0, 0.15), 1.0)
        .with_rect(WorldPoint::new(0.0, 9.85), WorldPoint::new(10.0, 10.0), 1.0)
        .with_rect(WorldPoint::new(0.0, 0.0), WorldPoint::new(0.15, 10.0), 1.0)
        .with_rect(WorldPoint::new(9.85, 0.0), WorldPoint::new(10.0, 10.0), 1.0)
}

/// Walled room with a partition along x = 5 leaving a 2m doorway at the top.
pub fn partitioned_room() -> OccupancyMap {
    walled_room().with_rect(WorldPoint::new(4.95, 0.0), WorldPoint::new(5.05, 7.5), 1.0)
}

/// Save `map` as `<dir>/maps/<name>.yaml` and return the YAML path.
pub fn write_map(dir: &Path, name: &str, map: &OccupancyMap) -> PathBuf {
    let maps = dir.join("maps");
    std::fs::create_dir_all(&maps).expect("create maps dir");
    let path = maps.join(format!("{}.yaml", name));
    save_ros_map(map, &path).expect("save map");
    path
}

/// Write a variation file next to the maps and return its path.
pub fn write_variation_file(dir: &Path, yaml: &str) -> PathBuf {
    let path = dir.join("variations.yaml");
    std::fs::write(&path, yaml).expect("write variation file");
    path
}

/// Initialize test logging once.
pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}
