//! Credential management module.
//!
//! This module provides the keyed credential store consulted at login and
//! the rotation logic behind the password change endpoint.

pub mod rotation;
pub mod store;

pub use rotation::{rotate_password, RotationError};
pub use store::{
    is_valid_identity, secrets_match, CredentialError, CredentialStore, FileCredentialStore,
    MemoryCredentialStore,
};
