//! Map loader for PGM+YAML format (ROS standard)
//!
//! The YAML descriptor names the raster image (relative to the YAML file),
//! the resolution, the origin `[x, y, yaw]` and the classification
//! thresholds. Pixel `v` becomes occupancy probability `(255 - v) / 255`,
//! or `v / 255` when `negate` is set. The ROS "unknown" grey (205) becomes
//! [`UNKNOWN`] either way. Image row 0 is the top of the world, so rows are
//! flipped on the way in and out.
//!
//! Saving writes the same format back, with [`UNKNOWN`] cells as 205.
//! Loading a saved map reproduces its resolution, origin, dimensions and
//! every cell value exactly, provided the cells were themselves loaded from
//! an 8-bit image or are [`UNKNOWN`].

use std::path::Path;

use image::{GrayImage, Luma};
use log::{debug, info};
use serde::{Deserialize, Serialize};

use crate::core::Pose2D;
use crate::error::{Result, VariationError};
use crate::map::{DEFAULT_FREE_THRESH, DEFAULT_OCCUPIED_THRESH, OccupancyMap, Thresholds, UNKNOWN};

/// Pixel value of unknown cells.
const UNKNOWN_PIXEL: u8 = 205;

/// Map metadata from YAML file (ROS standard format)
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct MapMetadata {
    /// Raster image filename (relative to YAML file)
    pub image: String,

    /// Map resolution in meters per pixel
    pub resolution: f32,

    /// Origin of map [x, y, yaw] - world pose of the bottom-left pixel
    pub origin: [f32; 3],

    /// Non-zero inverts the pixel interpretation (white = occupied)
    #[serde(default)]
    pub negate: u8,

    /// Probabilities above this are occupied
    #[serde(default = "default_occupied_thresh")]
    pub occupied_thresh: f32,

    /// Probabilities below this are free
    #[serde(default = "default_free_thresh")]
    pub free_thresh: f32,
}

fn default_occupied_thresh() -> f32 {
    DEFAULT_OCCUPIED_THRESH
}

fn default_free_thresh() -> f32 {
    DEFAULT_FREE_THRESH
}

/// Load an occupancy map from ROS-standard YAML + image files.
///
/// Any problem with either file is reported as a map error.
pub fn load_ros_map<P: AsRef<Path>>(yaml_path: P) -> Result<OccupancyMap> {
    let yaml_path = yaml_path.as_ref();

    let yaml_content = std::fs::read_to_string(yaml_path).map_err(|e| {
        VariationError::Map(format!(
            "Failed to read map YAML {}: {}",
            yaml_path.display(),
            e
        ))
    })?;

    let metadata: MapMetadata = serde_yaml::from_str(&yaml_content)
        .map_err(|e| VariationError::Map(format!("Failed to parse map YAML: {}", e)))?;

    let yaml_dir = yaml_path.parent().unwrap_or(Path::new("."));
    let image_path = yaml_dir.join(&metadata.image);
    let img = image::open(&image_path)
        .map_err(|e| {
            VariationError::Map(format!(
                "Failed to load map image {}: {}",
                image_path.display(),
                e
            ))
        })?
        .into_luma8();

    let map = from_image(&img, &metadata)?;
    info!(
        "[MapLoader] Loaded {} ({}x{} @ {}m)",
        yaml_path.display(),
        map.width(),
        map.height(),
        map.resolution()
    );
    Ok(map)
}

/// Build a map from a greyscale raster and its metadata.
pub fn from_image(img: &GrayImage, metadata: &MapMetadata) -> Result<OccupancyMap> {
    let (width, height) = img.dimensions();
    let (width, height) = (width as usize, height as usize);
    let negate = metadata.negate != 0;

    let mut cells = Vec::with_capacity(width * height);
    // Bottom image row becomes grid row 0
    for row in (0..height).rev() {
        for col in 0..width {
            let pixel = img.get_pixel(col as u32, row as u32).0[0];
            let v = pixel as f32;
            let p = if pixel == UNKNOWN_PIXEL {
                UNKNOWN
            } else if negate {
                v / 255.0
            } else {
                (255.0 - v) / 255.0
            };
            cells.push(p);
        }
    }

    OccupancyMap::new(
        width,
        height,
        metadata.resolution,
        Pose2D {
            x: metadata.origin[0],
            y: metadata.origin[1],
            yaw: metadata.origin[2],
        },
        Thresholds {
            free: metadata.free_thresh,
            occupied: metadata.occupied_thresh,
        },
        cells,
    )
}

/// Render a map to a greyscale raster (row 0 = top of the world).
pub fn to_image(map: &OccupancyMap) -> GrayImage {
    let (width, height) = (map.width(), map.height());
    let cells = map.cells();
    GrayImage::from_fn(width as u32, height as u32, |col, row| {
        let y = height - 1 - row as usize;
        let p = cells[y * width + col as usize];
        if p == UNKNOWN {
            Luma([UNKNOWN_PIXEL])
        } else {
            Luma([(255.0 - p * 255.0).round().clamp(0.0, 255.0) as u8])
        }
    })
}

/// Save a map as `<yaml stem>.pgm` next to the given YAML path.
pub fn save_ros_map<P: AsRef<Path>>(map: &OccupancyMap, yaml_path: P) -> Result<()> {
    let yaml_path = yaml_path.as_ref();
    let stem = yaml_path
        .file_stem()
        .and_then(|s| s.to_str())
        .ok_or_else(|| VariationError::Map(format!("Invalid map path {}", yaml_path.display())))?;
    let image_name = format!("{}.pgm", stem);
    let image_path = yaml_path.with_file_name(&image_name);

    to_image(map).save(&image_path)?;

    let origin = map.origin();
    let thresholds = map.thresholds();
    let metadata = MapMetadata {
        image: image_name,
        resolution: map.resolution(),
        origin: [origin.x, origin.y, origin.yaw],
        negate: 0,
        occupied_thresh: thresholds.occupied,
        free_thresh: thresholds.free,
    };
    std::fs::write(yaml_path, serde_yaml::to_string(&metadata)?)?;

    debug!("[MapLoader] Saved {}", yaml_path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{GridCoord, WorldPoint};

    fn metadata() -> MapMetadata {
        MapMetadata {
            image: "map.pgm".to_string(),
            resolution: 0.1,
            origin: [-5.0, -5.0, 0.0],
            negate: 0,
            occupied_thresh: 0.65,
            free_thresh: 0.196,
        }
    }

    #[test]
    fn test_rows_are_flipped() {
        // Black pixel in the top-left corner of the image
        let img = GrayImage::from_fn(100, 100, |x, y| {
            if x == 0 && y == 0 {
                Luma([0u8])
            } else {
                Luma([254u8])
            }
        });
        let map = from_image(&img, &metadata()).unwrap();

        assert!(map.is_cell_occupied(GridCoord::new(0, 99)));
        assert!(map.is_cell_free(GridCoord::new(0, 0)));
        // Top-left of the world is (-5, +5)
        assert!(!map.is_free(WorldPoint::new(-4.95, 4.95), 0.0));
        assert!(map.is_free(WorldPoint::new(-4.95, -4.95), 0.0));
    }

    #[test]
    fn test_unknown_grey_is_not_free() {
        let img = GrayImage::from_fn(10, 10, |_, _| Luma([UNKNOWN_PIXEL]));
        let map = from_image(&img, &metadata()).unwrap();
        assert_eq!(map.cell(GridCoord::new(5, 5)), Some(UNKNOWN));
        assert!(!map.is_cell_free(GridCoord::new(5, 5)));
        assert!(!map.is_cell_occupied(GridCoord::new(5, 5)));
    }

    #[test]
    fn test_unknown_cells_survive_save_load() {
        let dir = tempfile::tempdir().unwrap();
        let map = OccupancyMap::empty(20, 20, 0.1, Pose2D::default())
            .unwrap()
            .with_rect(WorldPoint::new(0.0, 0.0), WorldPoint::new(1.0, 0.5), UNKNOWN)
            .with_rect(WorldPoint::new(0.0, 1.5), WorldPoint::new(2.0, 2.0), 1.0);

        let yaml = dir.path().join("partial.yaml");
        save_ros_map(&map, &yaml).unwrap();
        let loaded = load_ros_map(&yaml).unwrap();

        assert_eq!(loaded.cell(GridCoord::new(2, 2)), Some(UNKNOWN));
        assert_eq!(loaded, map);
        assert_eq!(loaded.fingerprint(), map.fingerprint());
    }

    #[test]
    fn test_negate() {
        let img = GrayImage::from_fn(2, 2, |_, _| Luma([0u8]));
        let mut meta = metadata();
        meta.negate = 1;
        let map = from_image(&img, &meta).unwrap();
        assert!(map.is_cell_free(GridCoord::new(0, 0)));
    }

    #[test]
    fn test_save_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let img = GrayImage::from_fn(37, 21, |x, y| Luma([((x * 7 + y * 13) % 256) as u8]));
        let mut meta = metadata();
        meta.origin = [1.25, -3.5, 0.1];
        meta.resolution = 0.05;
        let map = from_image(&img, &meta).unwrap();

        let yaml = dir.path().join("office.yaml");
        save_ros_map(&map, &yaml).unwrap();
        assert!(dir.path().join("office.pgm").exists());

        let loaded = load_ros_map(&yaml).unwrap();
        assert_eq!(loaded, map);
        assert_eq!(loaded.fingerprint(), map.fingerprint());
    }

    #[test]
    fn test_missing_files_are_map_errors() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_ros_map(dir.path().join("nope.yaml")).unwrap_err();
        assert!(matches!(err, VariationError::Map(_)));

        let yaml = dir.path().join("broken.yaml");
        std::fs::write(&yaml, "image: missing.pgm\nresolution: 0.05\norigin: [0, 0, 0]\n").unwrap();
        let err = load_ros_map(&yaml).unwrap_err();
        assert!(matches!(err, VariationError::Map(_)));
    }
}
