//! Unified error types for lightsong
//!
//! Error strategy:
//! - Per-star errors (missing data, short segments): Recoverable, skip and continue
//! - System errors (output, configuration): Fatal for the star or the batch
//!
//! Degenerate signals and zero denominators are recovered where they occur
//! and never surface here.

use std::path::PathBuf;
use thiserror::Error;

/// Top-level error type for lightsong operations
#[derive(Debug, Error)]
pub enum LightsongError {
    // =========================================================================
    // Recoverable errors - skip star or segment, continue batch
    // =========================================================================
    #[error("Insufficient data: {reason}")]
    InsufficientData { reason: String },

    #[error("No light curve found for '{0}'\n  Tip: Check the id and the data directory (--data or LIGHTSONG_DATA_PATH)")]
    StarNotFound(String),

    #[error("Failed to load light curve '{id}': {reason}")]
    SourceError { id: String, reason: String },

    // =========================================================================
    // Rejected input - never enters the pipeline
    // =========================================================================
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Unknown scale '{name}'\n  Available scales: {}", crate::types::ScaleName::all().join(", "))]
    UnknownScale { name: String },

    // =========================================================================
    // Fatal errors
    // =========================================================================
    #[error("Cannot write output to '{path}': {reason}\n  Tip: Check write permissions for the output directory")]
    OutputError { path: PathBuf, reason: String },

    #[error("Invalid configuration: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for lightsong operations
pub type Result<T> = std::result::Result<T, LightsongError>;

impl LightsongError {
    /// Returns true if this error is recoverable (should skip star, continue batch)
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            LightsongError::InsufficientData { .. }
                | LightsongError::StarNotFound(_)
                | LightsongError::SourceError { .. }
        )
    }

    /// Create an insufficient-data error
    pub fn insufficient(reason: impl Into<String>) -> Self {
        LightsongError::InsufficientData {
            reason: reason.into(),
        }
    }

    /// Create a loader error for a given star
    pub fn source_error(id: impl Into<String>, reason: impl Into<String>) -> Self {
        LightsongError::SourceError {
            id: id.into(),
            reason: reason.into(),
        }
    }

    /// Create an output error, checking for common issues
    pub fn output_error(path: impl Into<PathBuf>, err: std::io::Error) -> Self {
        let path = path.into();
        let reason = match err.kind() {
            std::io::ErrorKind::PermissionDenied => {
                format!("Permission denied. Check that you have write access to {}", path.display())
            }
            std::io::ErrorKind::NotFound => {
                format!("Directory does not exist: {}", path.parent().map(|p| p.display().to_string()).unwrap_or_default())
            }
            _ => err.to_string(),
        };
        LightsongError::OutputError { path, reason }
    }
}
