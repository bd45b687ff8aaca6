//! Error types for slogging.
//!
//! The facade itself never fails; these errors only come out of the edges
//! that read configuration or parse levels strictly.

use thiserror::Error;

/// The error type for slogging configuration operations.
#[derive(Error, Debug)]
pub enum SloggingError {
    /// A level name that does not map to any severity
    #[error("Invalid log level: {0}")]
    InvalidLevel(String),

    /// I/O error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// YAML parsing error
    #[error("YAML parsing error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

/// A specialized Result type for slogging operations.
pub type Result<T> = std::result::Result<T, SloggingError>;
