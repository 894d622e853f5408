//! Error types for segfuse

use thiserror::Error;

use crate::fusion::FusionError;

/// Main error type for segfuse operations
#[derive(Error, Debug)]
pub enum FuseError {
    /// A source file is absent for a name that passed the intersection
    #[error("Missing input: {0}")]
    MissingInput(String),

    /// An existing output artifact failed validation
    #[error("Corrupt output: {0}")]
    CorruptOutput(String),

    /// The external fusion collaborator failed
    #[error("Fusion failed: {0}")]
    Fusion(#[from] FusionError),

    /// A (method, group) configuration cannot run
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// The image collaborator could not decode an artifact
    #[error("Decode error: {0}")]
    Decode(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// YAML configuration error
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

/// Result type alias for segfuse operations
pub type Result<T> = std::result::Result<T, FuseError>;
