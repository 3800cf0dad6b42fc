//! Error types for Vikalpa
//!
//! Failures fall into four families with different blast radius:
//!
//! | Variant | Scope |
//! |---------|-------|
//! | `Config` | whole scenario, raised before any generation |
//! | `Map` | whole scenario |
//! | `Reference` | one configuration |
//! | `Generation` | one path / obstacle set |
//!
//! `Io` and `Parse` wrap file handling and are treated like `Config`.

use thiserror::Error;

/// Vikalpa error type
#[derive(Error, Debug, Clone, PartialEq)]
pub enum VariationError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Reference error: {0}")]
    Reference(String),

    #[error("Generation error: {0}")]
    Generation(String),

    #[error("Map error: {0}")]
    Map(String),

    #[error("IO error: {0}")]
    Io(String),

    #[error("Parse error: {0}")]
    Parse(String),
}

/// Discriminant of [`VariationError`], used in reports.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Config,
    Reference,
    Generation,
    Map,
    Io,
    Parse,
}

impl VariationError {
    /// Get the error family.
    pub fn kind(&self) -> ErrorKind {
        match self {
            VariationError::Config(_) => ErrorKind::Config,
            VariationError::Reference(_) => ErrorKind::Reference,
            VariationError::Generation(_) => ErrorKind::Generation,
            VariationError::Map(_) => ErrorKind::Map,
            VariationError::Io(_) => ErrorKind::Io,
            VariationError::Parse(_) => ErrorKind::Parse,
        }
    }

    /// Whether this error aborts generation of the owning scenario.
    ///
    /// Reference and generation failures only drop the affected configuration.
    pub fn is_fatal_for_scenario(&self) -> bool {
        !matches!(
            self,
            VariationError::Reference(_) | VariationError::Generation(_)
        )
    }

    /// Prefix the message with `context`, keeping the error family.
    pub fn context(self, context: impl std::fmt::Display) -> Self {
        match self {
            VariationError::Config(m) => VariationError::Config(format!("{}: {}", context, m)),
            VariationError::Reference(m) => VariationError::Reference(format!("{}: {}", context, m)),
            VariationError::Generation(m) => VariationError::Generation(format!("{}: {}", context, m)),
            VariationError::Map(m) => VariationError::Map(format!("{}: {}", context, m)),
            VariationError::Io(m) => VariationError::Io(format!("{}: {}", context, m)),
            VariationError::Parse(m) => VariationError::Parse(format!("{}: {}", context, m)),
        }
    }
}

impl From<std::io::Error> for VariationError {
    fn from(e: std::io::Error) -> Self {
        VariationError::Io(e.to_string())
    }
}

impl From<serde_yaml::Error> for VariationError {
    fn from(e: serde_yaml::Error) -> Self {
        VariationError::Parse(e.to_string())
    }
}

impl From<serde_json::Error> for VariationError {
    fn from(e: serde_json::Error) -> Self {
        VariationError::Parse(e.to_string())
    }
}

impl From<image::ImageError> for VariationError {
    fn from(e: image::ImageError) -> Self {
        VariationError::Map(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, VariationError>;
