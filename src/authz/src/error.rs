//! Error types for the authorization engine
//!
//! These are construction-time failures: loading or validating the policy,
//! declaring operations, reading configuration. Per-request outcomes are
//! never errors; they are [`Denial`](crate::engine::Denial)s.

use thiserror::Error;

/// Authorization engine errors
#[derive(Debug, Error)]
pub enum AuthzError {
    /// Role is not present in the policy table, or a role name did not parse
    #[error("Unknown role: {0}")]
    UnknownRole(String),

    /// Permission string did not parse as a known `module:action` pair
    #[error("Unknown permission: {0}")]
    UnknownPermission(String),

    /// Constraint key did not parse
    #[error("Unknown constraint key: {0}")]
    UnknownConstraintKey(String),

    /// Inheritance table contains a cycle
    #[error("Circular inheritance detected: {0}")]
    CircularInheritance(String),

    /// Elevated-access TTL outside the accepted range
    #[error("Invalid elevated-access TTL: {0}")]
    InvalidTtl(String),

    /// Configuration failed validation
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Operation name registered twice
    #[error("Duplicate operation: {0}")]
    DuplicateOperation(String),

    /// Operation name not registered
    #[error("Unknown operation: {0}")]
    UnknownOperation(String),

    /// Configuration file could not be parsed
    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for authorization operations
pub type Result<T> = std::result::Result<T, AuthzError>;
