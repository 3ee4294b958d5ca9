//! Wire messages for the credential rotation API.
//!
//! All messages are JSON encoded.

use serde::{Deserialize, Serialize};

/// Minimum accepted length (in characters) of a new FTP password.
pub const MIN_PASSWORD_LENGTH: usize = 6;

/// Request to set or change the FTP password of an identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangePasswordRequest {
    /// Identity whose credential record is written, e.g. `admin_abcd1234`.
    pub username: String,
    /// Current password. When omitted an existing record is replaced unchecked.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_password: Option<String>,
    /// The new password.
    pub new_password: String,
}

impl ChangePasswordRequest {
    /// The supplied current password, treating an empty string as absent.
    pub fn current_password(&self) -> Option<&str> {
        self.current_password.as_deref().filter(|p| !p.is_empty())
    }
}

/// Successful rotation response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangePasswordResponse {
    /// Always `true` for this message.
    pub success: bool,
    /// Human-readable confirmation.
    pub message: String,
}

impl ChangePasswordResponse {
    /// The standard success response.
    pub fn changed() -> Self {
        Self {
            success: true,
            message: "Password changed successfully".to_string(),
        }
    }
}

/// Error body returned by every failing API call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Description of what went wrong.
    pub error: String,
}

impl ErrorResponse {
    /// Create an error body.
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_without_current_password() {
        let json = r#"{"username":"admin_abcd1234","new_password":"hunter22"}"#;
        let req: ChangePasswordRequest = serde_json::from_str(json).unwrap();
        assert_eq!(req.username, "admin_abcd1234");
        assert_eq!(req.current_password, None);
        assert_eq!(req.current_password(), None);
        assert_eq!(req.new_password, "hunter22");
    }

    #[test]
    fn test_request_empty_current_password_is_absent() {
        let json = r#"{"username":"u_abcd1234","current_password":"","new_password":"secret1"}"#;
        let req: ChangePasswordRequest = serde_json::from_str(json).unwrap();
        assert_eq!(req.current_password(), None);
    }

    #[test]
    fn test_request_missing_required_field() {
        let json = r#"{"username":"admin_abcd1234"}"#;
        assert!(serde_json::from_str::<ChangePasswordRequest>(json).is_err());

        let json = r#"{"new_password":"secret1"}"#;
        assert!(serde_json::from_str::<ChangePasswordRequest>(json).is_err());
    }

    #[test]
    fn test_request_skips_absent_current_password_when_serialized() {
        let req = ChangePasswordRequest {
            username: "admin_abcd1234".to_string(),
            current_password: None,
            new_password: "secret1".to_string(),
        };
        let json = serde_json::to_string(&req).unwrap();
        assert!(!json.contains("current_password"));
    }

    #[test]
    fn test_changed_response() {
        let json = serde_json::to_value(ChangePasswordResponse::changed()).unwrap();
        assert_eq!(json["success"], true);
        assert_eq!(json["message"], "Password changed successfully");
    }

    #[test]
    fn test_error_response() {
        let json = serde_json::to_string(&ErrorResponse::new("nope")).unwrap();
        assert_eq!(json, r#"{"error":"nope"}"#);
    }
}
