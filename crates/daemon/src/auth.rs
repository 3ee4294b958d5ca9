//! Login-time identity resolution.
//!
//! Turns a composite username and password into a [`TenantSession`]:
//!
//! 1. the username must have the `<actual-user>_<tenant-key>` shape;
//! 2. the tenant-key must resolve in the registry;
//! 3. the password must match the record keyed by the full username;
//! 4. a record must exist for `<actual-user>_<first 8 chars of tenant id>`.
//!
//! Checks 3 and 4 are independent: when the client used the short prefix
//! form they read the same record, otherwise they may not.

use std::net::SocketAddr;
use std::sync::Arc;

use ftpgate_protocol::CompositeUsername;
use thiserror::Error;

use crate::credentials::{CredentialError, CredentialStore};
use crate::files::TenantSession;
use crate::tenants::TenantRegistry;

/// Authentication failures.
///
/// The FTP engine reports all of them to the client as one generic failure.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("invalid username format")]
    InvalidUsernameFormat,

    #[error("tenant not found")]
    TenantNotFound,

    #[error("invalid password")]
    InvalidPassword,

    #[error("access denied")]
    AccessDenied,

    #[error("credential lookup failed: {0}")]
    Credentials(#[from] CredentialError),
}

/// Resolves logins to tenant sessions.
#[derive(Clone)]
pub struct IdentityResolver {
    registry: Arc<dyn TenantRegistry>,
    credentials: Arc<dyn CredentialStore>,
    read_only: bool,
}

impl IdentityResolver {
    pub fn new(
        registry: Arc<dyn TenantRegistry>,
        credentials: Arc<dyn CredentialStore>,
        read_only: bool,
    ) -> Self {
        Self {
            registry,
            credentials,
            read_only,
        }
    }

    /// Whether sessions created by this resolver are read-only.
    pub fn read_only(&self) -> bool {
        self.read_only
    }

    pub fn registry(&self) -> &Arc<dyn TenantRegistry> {
        &self.registry
    }

    pub fn credentials(&self) -> &Arc<dyn CredentialStore> {
        &self.credentials
    }

    /// Authenticate a login and bind a session to the resolved tenant.
    pub fn authenticate(
        &self,
        username: &str,
        password: &str,
        remote_addr: SocketAddr,
    ) -> Result<TenantSession, AuthError> {
        let result = self.try_authenticate(username, password, remote_addr);
        match &result {
            Ok(session) => tracing::info!(
                username,
                %remote_addr,
                tenant = %session.tenant().id(),
                read_only = session.is_read_only(),
                "FTP login succeeded"
            ),
            Err(e) => tracing::warn!(
                username,
                %remote_addr,
                reason = %e,
                "FTP login failed"
            ),
        }
        result
    }

    fn try_authenticate(
        &self,
        username: &str,
        password: &str,
        remote_addr: SocketAddr,
    ) -> Result<TenantSession, AuthError> {
        let name =
            CompositeUsername::parse(username).map_err(|_| AuthError::InvalidUsernameFormat)?;

        let (tenant, rule) = self
            .registry
            .find(name.tenant_key())
            .ok_or(AuthError::TenantNotFound)?;
        tracing::debug!(
            username,
            %remote_addr,
            tenant = %tenant.id(),
            rule = ?rule,
            "Resolved tenant key"
        );

        if !self.credentials.verify(name.as_str(), password)? {
            return Err(AuthError::InvalidPassword);
        }

        let grant = name.access_identity(tenant.id());
        if !self.credentials.contains(&grant)? {
            tracing::debug!(username, %remote_addr, grant = %grant, "No access record for tenant");
            return Err(AuthError::AccessDenied);
        }

        Ok(TenantSession::new(
            name.as_str(),
            remote_addr,
            tenant,
            self.read_only,
        ))
    }
}
