//! Error types for the protocol crate.

use thiserror::Error;

/// Validation failures of usernames and tenant identifiers.
#[derive(Debug, Error)]
pub enum ProtocolError {
    /// The username does not follow the `<user>_<tenant-key>` shape.
    #[error("invalid username format: {0}")]
    InvalidUsernameFormat(String),

    /// The tenant identifier is empty or contains characters outside `[A-Za-z0-9_-]`.
    #[error("invalid tenant identifier: {0}")]
    InvalidTenantId(String),
}

/// Result type alias for protocol operations.
pub type Result<T> = std::result::Result<T, ProtocolError>;
