//! Variants YAML writer.
//!
//! ```yaml
//! - scenario: sweep
//!   configurations:
//!     - name: sweep-1
//!       index: 1
//!       parameters:
//!         v: 1.0
//!         d: 5.0
//!   diagnostics: []
//! ```

use std::fs;
use std::path::Path;

use log::info;
use serde::Serialize;

use crate::compose::{Configuration, Diagnostic, ScenarioVariants};
use crate::error::{Result, VariationError};

#[derive(Serialize)]
struct ScenarioDocument<'a> {
    scenario: &'a str,
    configurations: &'a [Configuration],
    diagnostics: &'a [Diagnostic],
}

/// Serialize scenarios to the variants YAML layout.
pub fn variants_to_yaml(variants: &[ScenarioVariants]) -> Result<String> {
    let documents: Vec<ScenarioDocument<'_>> = variants
        .iter()
        .map(|v| ScenarioDocument {
            scenario: &v.scenario,
            configurations: &v.configurations,
            diagnostics: &v.diagnostics,
        })
        .collect();
    Ok(serde_yaml::to_string(&documents)?)
}

/// Write scenarios to `path`, creating parent directories as needed.
pub fn write_variants<P: AsRef<Path>>(path: P, variants: &[ScenarioVariants]) -> Result<()> {
    let path = path.as_ref();
    let yaml = variants_to_yaml(variants)?;

    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent).map_err(|e| {
            VariationError::Io(format!("Failed to create {}: {}", parent.display(), e))
        })?;
    }
    fs::write(path, yaml)
        .map_err(|e| VariationError::Io(format!("Failed to write {}: {}", path.display(), e)))?;

    info!(
        "[Variants] Wrote {} configurations to {}",
        variants.iter().map(ScenarioVariants::len).sum::<usize>(),
        path.display()
    );
    Ok(())
}
