//! Rotation API handlers.

use axum::{
    body::Bytes,
    extract::{Path, State},
    http::{header, HeaderMap, StatusCode},
    response::IntoResponse,
    Json,
};
use ftpgate_protocol::{ChangePasswordRequest, ChangePasswordResponse};
use serde_json::json;

use super::error::{ApiError, ApiResult};
use super::state::AppState;
use crate::credentials::rotate_password;

/// Handler for the health check endpoint.
///
/// `GET /health`
pub async fn health_handler() -> impl IntoResponse {
    (StatusCode::OK, Json(json!({ "status": "healthy" })))
}

/// Set or change the FTP password of an identity.
///
/// # HTTP Request
///
/// `POST /api/tenants/{tenant}/ftp/change-password`
///
/// Body: `{"username": "...", "current_password": "...", "new_password": "..."}`
/// with `current_password` optional.
///
/// # Response
///
/// - `200 OK` - Password changed
/// - `400 Bad Request` - Malformed body or unacceptable new password
/// - `401 Unauthorized` - Missing API token or wrong current password
/// - `404 Not Found` - Unknown tenant
/// - `500 Internal Server Error` - The record could not be written
pub async fn change_password_handler(
    State(state): State<AppState>,
    Path(tenant_key): Path<String>,
    headers: HeaderMap,
    body: Bytes,
) -> ApiResult<Json<ChangePasswordResponse>> {
    authorize(&state, &headers)?;

    let (tenant, _) = state
        .registry()
        .find(&tenant_key)
        .ok_or_else(|| ApiError::NotFound(format!("Tenant not found: {}", tenant_key)))?;

    let request: ChangePasswordRequest =
        serde_json::from_slice(&body).map_err(|_| ApiError::invalid_body())?;
    if request.username.is_empty() {
        return Err(ApiError::invalid_body());
    }

    let username = request.username.clone();
    tracing::debug!(
        tenant = %tenant.id(),
        username = %username,
        "Processing FTP password change"
    );

    let rotation_state = state.clone();
    tokio::task::spawn_blocking(move || rotate_password(rotation_state.credentials(), &request))
        .await
        .map_err(|e| ApiError::Internal(format!("Failed to change password: {}", e)))??;

    tracing::info!(
        tenant = %tenant.id(),
        username = %username,
        "FTP password changed successfully"
    );
    Ok(Json(ChangePasswordResponse::changed()))
}

/// Check the bearer token when one is configured.
fn authorize(state: &AppState, headers: &HeaderMap) -> ApiResult<()> {
    let Some(expected) = state.token() else {
        return Ok(());
    };

    let supplied = headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "));

    match supplied {
        Some(token) if crate::credentials::secrets_match(expected, token) => Ok(()),
        _ => Err(ApiError::Unauthorized(
            "Missing or invalid API token".to_string(),
        )),
    }
}
