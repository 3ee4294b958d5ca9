//! HTTP API for credential rotation.
//!
//! # Routes
//!
//! - `GET /health` - Health check
//! - `POST /api/tenants/{tenant}/ftp/change-password` - Set or change an FTP password

pub mod error;
pub mod handlers;
pub mod state;

use axum::{
    routing::{get, post},
    Router,
};

pub use error::{ApiError, ApiResult};
pub use state::AppState;

/// Creates the API router.
pub fn create_routes(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health_handler))
        .route(
            "/api/tenants/{tenant}/ftp/change-password",
            post(handlers::change_password_handler),
        )
        .with_state(state)
}
