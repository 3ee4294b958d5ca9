//! Credential rotation.
//!
//! Sets or replaces the FTP password of an identity. When a record already
//! exists and the caller supplies a current password, it must match. A
//! caller that omits the current password may replace an existing record.

use ftpgate_protocol::{ChangePasswordRequest, MIN_PASSWORD_LENGTH};
use thiserror::Error;

use super::store::{is_valid_identity, secrets_match, CredentialError, CredentialStore};

/// Rotation failures.
#[derive(Debug, Error)]
pub enum RotationError {
    #[error("New password cannot be empty")]
    EmptyPassword,

    #[error("New password must be at least {min} characters long", min = MIN_PASSWORD_LENGTH)]
    PasswordTooShort,

    #[error("Invalid username: {0}")]
    InvalidIdentity(String),

    #[error("Current password is incorrect")]
    IncorrectCurrentPassword,

    #[error("Failed to change password: {0}")]
    Store(#[from] CredentialError),
}

/// Validate `request` and write the new secret.
pub fn rotate_password<S>(store: &S, request: &ChangePasswordRequest) -> Result<(), RotationError>
where
    S: CredentialStore + ?Sized,
{
    let identity = request.username.as_str();

    if request.new_password.is_empty() {
        return Err(RotationError::EmptyPassword);
    }
    if request.new_password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(RotationError::PasswordTooShort);
    }
    if !is_valid_identity(identity) {
        return Err(RotationError::InvalidIdentity(identity.to_string()));
    }

    match (store.get(identity)?, request.current_password()) {
        (Some(stored), Some(current)) => {
            if !secrets_match(&stored, current) {
                tracing::warn!(identity, "Password change rejected: current password mismatch");
                return Err(RotationError::IncorrectCurrentPassword);
            }
        }
        (Some(_), None) => {
            tracing::info!(identity, "Replacing credential without current password");
        }
        (None, _) => {
            tracing::info!(identity, "Creating credential record");
        }
    }

    store.put(identity, &request.new_password)?;
    tracing::info!(identity, "Password changed");
    Ok(())
}
