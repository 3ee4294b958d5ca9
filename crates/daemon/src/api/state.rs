//! Shared state of the rotation API.

use std::sync::Arc;

use crate::credentials::CredentialStore;
use crate::tenants::TenantRegistry;

/// State available to every API handler.
pub struct AppState {
    registry: Arc<dyn TenantRegistry>,
    credentials: Arc<dyn CredentialStore>,
    token: Option<Arc<str>>,
}

// Manual impl: the trait objects are shared, not cloned.
impl Clone for AppState {
    fn clone(&self) -> Self {
        Self {
            registry: Arc::clone(&self.registry),
            credentials: Arc::clone(&self.credentials),
            token: self.token.clone(),
        }
    }
}

impl AppState {
    /// Creates the state. When `token` is set every request must carry it
    /// as a bearer token.
    pub fn new(
        registry: Arc<dyn TenantRegistry>,
        credentials: Arc<dyn CredentialStore>,
        token: Option<String>,
    ) -> Self {
        Self {
            registry,
            credentials,
            token: token.filter(|t| !t.is_empty()).map(Arc::from),
        }
    }

    pub fn registry(&self) -> &dyn TenantRegistry {
        self.registry.as_ref()
    }

    pub fn credentials(&self) -> &dyn CredentialStore {
        self.credentials.as_ref()
    }

    /// The required bearer token, if any.
    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }
}
