//! # Error Types
//!
//! Errors shared by every gateway crate. All use `thiserror`.
//!
//! - Validation errors name the offending field and the rejected value.
//! - Configuration errors carry the file path when one is involved.

use std::path::PathBuf;

use thiserror::Error;

/// A form input or identifier failed validation.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// A required text field was empty after trimming.
    #[error("{field} must not be empty")]
    Empty {
        /// Field name as shown to the operator.
        field: &'static str,
    },

    /// A text field exceeded its maximum length.
    #[error("{field} must not exceed {max} characters")]
    TooLong {
        /// Field name.
        field: &'static str,
        /// Maximum permitted length.
        max: usize,
    },

    /// A text field contained a character outside its permitted set.
    #[error("{field} contains invalid character {ch:?}")]
    InvalidCharacter {
        /// Field name.
        field: &'static str,
        /// The first offending character.
        ch: char,
    },

    /// An unknown region identifier.
    #[error("unknown region {0:?} (expected one of: eu, uk, us, apac)")]
    UnknownRegion(String),

    /// An unknown deployment type.
    #[error("unknown deployment type {0:?} (expected production, staging or development)")]
    UnknownDeploymentType(String),

    /// An unknown risk tier.
    #[error("unknown risk tier {0:?} (expected low, medium or high)")]
    UnknownRiskTier(String),

    /// A malformed check identifier.
    #[error("invalid check id {0:?}: must be lowercase kebab-case")]
    InvalidCheckId(String),

    /// A timestamp that is not RFC 3339 with a `Z` suffix.
    #[error("invalid timestamp {0:?}: expected YYYY-MM-DDTHH:MM:SSZ")]
    InvalidTimestamp(String),

    /// A malformed approval identifier.
    #[error("invalid approval id {0:?}: expected APP-NNNNNN")]
    InvalidApprovalId(String),
}

/// Error during canonical serialization.
#[derive(Error, Debug)]
pub enum CanonicalizationError {
    /// Float values are not permitted in canonical representations.
    #[error("float values are not permitted in canonical representations: {0}")]
    FloatRejected(f64),

    /// JSON serialization failed.
    #[error("serialization failed: {0}")]
    SerializationFailed(#[from] serde_json::Error),
}

/// Loading or validating a [`GatewayConfig`](crate::GatewayConfig) failed.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// The config file could not be read.
    #[error("failed to read config {path}: {source}")]
    Io {
        /// Path that was being read.
        path: PathBuf,
        /// Underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// The config document is not valid YAML for the expected shape.
    #[error("failed to parse config: {0}")]
    Parse(#[from] serde_yaml::Error),

    /// A value is out of its permitted range.
    #[error("invalid config value for {field}: {reason}")]
    Invalid {
        /// Dotted path of the offending field.
        field: &'static str,
        /// What is wrong with it.
        reason: String,
    },

    /// An environment override could not be parsed.
    #[error("invalid environment override {var}={value:?}")]
    Env {
        /// Variable name.
        var: &'static str,
        /// Raw value.
        value: String,
    },
}
