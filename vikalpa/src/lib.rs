//! # Vikalpa
//!
//! Variant generation for scenario-based robot navigation testing.
//!
//! ## Overview
//!
//! A scenario declares how its parameters vary. Vikalpa expands that
//! declaration into every concrete configuration a test pipeline should
//! run:
//!
//! - **Parameter sweeps** - fixed lists, uniform and Gaussian draws
//! - **Paths** - random waypoint paths and exhaustive lattice paths that
//!   respect map clearance and a target length
//! - **Obstacles** - seeded, non-overlapping obstacle placements
//!
//! The outputs of all variations are combined as a Cartesian product with
//! the last variation varying fastest. Every random stream is seeded, so the
//! same file and seeds always produce the same configurations.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use vikalpa::{CompositionEngine, VariationFile};
//!
//! let file = VariationFile::load("scenarios/variations.yaml".as_ref())?;
//! let engine = CompositionEngine::new(file.settings.general.clone());
//! let outcome = engine.generate_all(&file)?;
//!
//! for scenario in &outcome.scenarios {
//!     println!("{}: {} configurations", scenario.scenario, scenario.len());
//! }
//! ```
//!
//! ## Coordinate System
//!
//! World coordinates are meters in the map frame, yaw in radians CCW from
//! +X. Grid cell (0, 0) is the bottom-left cell of the map.

// Pose, path and point types
pub mod core;

// Occupancy map and clearance queries
pub mod map;

// Error taxonomy
pub mod error;

// Variation file schema
pub mod config;

// Seeded random streams
pub mod seed;

// Path and obstacle synthesis
pub mod synthesis;

// Variation kinds and registry
pub mod variation;

// Cartesian composition
pub mod compose;

// Map and variants files
pub mod io;

pub use core::{Obstacle, Path, Pose2D, WorldPoint};

pub use map::OccupancyMap;

pub use error::{ErrorKind, Result, VariationError};

pub use config::{GeneralSettings, Scenario, ScenarioPlan, SynthesisLimits, VariationFile};

pub use synthesis::GenerationCache;

pub use variation::{ParameterAssignment, ParameterValue, Variation, VariationRegistry, VariationSpec};

pub use compose::{
    CompositionEngine, Configuration, Diagnostic, GenerationOutcome, ScenarioFailure,
    ScenarioVariants, VariationSummary,
};
