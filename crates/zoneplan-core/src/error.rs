//! Core error types for zoneplan-core.
//!
//! Scheduling conflicts and unplaceable tasks are *not* errors: they are
//! reported as values (`SchedulingConflict`, `TaskOutcome::Deferred`).
//! The types here cover invariant violations, configuration problems and
//! failures of the external task/calendar collaborators.

use std::path::PathBuf;

use chrono::NaiveDateTime;
use thiserror::Error;

/// Core error type for zoneplan-core.
#[derive(Error, Debug)]
pub enum CoreError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Validation errors
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// Task split errors
    #[error("Split error: {0}")]
    Split(#[from] SplitError),

    /// A task or calendar collaborator failed
    #[error("Source error for '{source_name}': {message}")]
    Source {
        source_name: String,
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl CoreError {
    /// Build a collaborator error without an underlying cause.
    pub fn collaborator(source_name: impl Into<String>, message: impl Into<String>) -> Self {
        CoreError::Source {
            source_name: source_name.into(),
            message: message.into(),
            source: None,
        }
    }
}

/// Configuration-specific errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to load configuration
    #[error("Failed to load configuration from {path}: {message}")]
    LoadFailed { path: PathBuf, message: String },

    /// Failed to save configuration
    #[error("Failed to save configuration to {path}: {message}")]
    SaveFailed { path: PathBuf, message: String },

    /// Invalid configuration value
    #[error("Invalid configuration value for '{key}': {message}")]
    InvalidValue { key: String, message: String },

    /// Failed to parse configuration
    #[error("Failed to parse configuration: {0}")]
    ParseFailed(String),

    /// No usable configuration directory
    #[error("Could not determine configuration directory")]
    NoConfigDir,
}

impl From<toml::de::Error> for ConfigError {
    fn from(err: toml::de::Error) -> Self {
        ConfigError::ParseFailed(err.to_string())
    }
}

/// Validation errors raised by value constructors.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum ValidationError {
    /// Invalid time range
    #[error("Invalid time range: end ({end}) must be greater than start ({start})")]
    InvalidTimeRange {
        start: NaiveDateTime,
        end: NaiveDateTime,
    },

    /// Invalid value
    #[error("Invalid value for '{field}': {message}")]
    InvalidValue { field: String, message: String },
}

/// Errors returned by `Task::split` when the requested chunking violates the
/// task's constraints.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SplitError {
    #[error("Exceeds maximum split count of {max}")]
    TooManyChunks { max: u32, requested: usize },

    #[error("Sum of chunk sizes ({sum}) must equal task duration ({duration})")]
    SumMismatch { sum: i64, duration: i64 },

    #[error("All chunks must be at least {min} minutes")]
    ChunkBelowMinimum { min: i64 },

    #[error("Task is not splittable")]
    NotSplittable,
}

/// Result type alias for CoreError
pub type Result<T, E = CoreError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn split_error_messages() {
        assert_eq!(
            SplitError::TooManyChunks { max: 3, requested: 4 }.to_string(),
            "Exceeds maximum split count of 3"
        );
        assert_eq!(
            SplitError::SumMismatch { sum: 90, duration: 120 }.to_string(),
            "Sum of chunk sizes (90) must equal task duration (120)"
        );
    }

    #[test]
    fn source_error_display() {
        let err = CoreError::collaborator("calendar", "connection refused");
        assert_eq!(
            err.to_string(),
            "Source error for 'calendar': connection refused"
        );
    }

    #[test]
    fn config_error_converts_into_core_error() {
        let err: CoreError = ConfigError::NoConfigDir.into();
        assert!(matches!(err, CoreError::Config(ConfigError::NoConfigDir)));
    }
}
