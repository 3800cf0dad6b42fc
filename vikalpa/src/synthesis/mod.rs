//! Geometric synthesis against an occupancy map.
//!
//! | Synthesizer | Output | Determinism |
//! |-------------|--------|-------------|
//! | [`RandomPathSynthesizer`] | one path per index | seeded per attempt |
//! | [`RasterPathSynthesizer`] | every path on the lattice | no randomness |
//! | [`ObstaclePlacer`] | one obstacle set per variant | seeded per variant |
//!
//! All three consult [`OccupancyMap::is_free`](crate::map::OccupancyMap::is_free)
//! at the robot radius and can be fronted by a shared [`GenerationCache`].

pub mod cache;
pub mod obstacle;
pub mod random_path;
pub mod raster_path;

pub use cache::{CacheKey, CacheStats, CachedValue, GenerationCache};
pub use obstacle::{ObstacleConfig, ObstacleParams, ObstaclePlacer};
pub use random_path::{PathOutcome, RandomPathParams, RandomPathSynthesizer};
pub use raster_path::{RasterOutcome, RasterPathParams, RasterPathSynthesizer, RasterPoint};
