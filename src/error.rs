//! Error types for the preflight configuration engine

use thiserror::Error;

/// Main error type for configuration derivation
#[derive(Error, Debug)]
pub enum Error {
    /// Missing required field or unsupported dataset
    #[error("Configuration error: {0}")]
    ConfigValidation(String),

    /// Train path missing or not a directory
    #[error("Dataset path error: {0}")]
    DatasetPath(String),

    /// Crop partition inconsistency
    #[error("Invariant violation: {0}")]
    InvariantViolation(String),

    /// Unrecognized learning rate scaling method
    #[error("Unsupported lr method: {0}")]
    UnsupportedLrMethod(String),

    /// Unregistered augmentation op name
    #[error("Unknown transform op: {0}")]
    UnknownTransformOp(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// YAML parsing error
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

/// Result type alias for configuration derivation
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Create a configuration validation error
    pub fn config_validation(msg: impl Into<String>) -> Self {
        Self::ConfigValidation(msg.into())
    }

    /// Create a dataset path error
    pub fn dataset_path(msg: impl Into<String>) -> Self {
        Self::DatasetPath(msg.into())
    }

    /// Create an invariant violation error
    pub fn invariant_violation(msg: impl Into<String>) -> Self {
        Self::InvariantViolation(msg.into())
    }

    /// Create an unsupported lr method error
    pub fn unsupported_lr_method(msg: impl Into<String>) -> Self {
        Self::UnsupportedLrMethod(msg.into())
    }

    /// Create an unknown transform op error
    pub fn unknown_transform_op(msg: impl Into<String>) -> Self {
        Self::UnknownTransformOp(msg.into())
    }
}
