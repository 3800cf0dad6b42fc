//! Configuration for variation generation.
//!
//! A variation file is YAML with one `settings` root:
//!
//! ```yaml
//! settings:
//!   version: 1
//!   general:
//!     robot_diameter: 0.4
//!     limits:
//!       max_path_attempts: 1000
//!   configuration:
//!     - name: sweep
//!       map_file: maps/office.yaml
//!       variations:
//!         - ParameterVariationList: { name: speed, values: [0.2, 0.5] }
//!     - name: baseline
//!       parameters:
//!         - speed: 0.3
//! ```
//!
//! | Type | Purpose |
//! |------|---------|
//! | [`VariationFile`] | Root document, `load` / `from_yaml` |
//! | [`GeneralSettings`] | Robot diameter and [`SynthesisLimits`] |
//! | [`ScenarioConfig`] | One scenario as written |
//! | [`Scenario`] / [`ScenarioPlan`] | Validated scenario handed to the engine |

pub mod defaults;
mod file;
mod general;

pub use file::{Scenario, ScenarioConfig, ScenarioPlan, Settings, VariationFile};
pub use general::{GeneralSettings, SynthesisLimits};
