//! Wiring of the daemon components from configuration.

use std::sync::Arc;

use anyhow::{Context, Result};

use crate::api::AppState;
use crate::auth::IdentityResolver;
use crate::config::Config;
use crate::credentials::{CredentialStore, FileCredentialStore};
use crate::tenants::{StaticRegistry, TenantRegistry, VolumeRegistry};
use crate::transport::{FtpGateway, FtpSettings};

/// The shared components every entry point is built from.
#[derive(Clone)]
pub struct Services {
    pub registry: Arc<dyn TenantRegistry>,
    pub credentials: Arc<dyn CredentialStore>,
}

impl Services {
    pub fn new(registry: Arc<dyn TenantRegistry>, credentials: Arc<dyn CredentialStore>) -> Self {
        Self {
            registry,
            credentials,
        }
    }

    /// Build the registry and credential store described by `config`.
    ///
    /// With `daemon.tenants_file` set the registry is loaded from that file;
    /// otherwise every directory under `storage.base_path` is a tenant.
    pub fn from_config(config: &Config) -> Result<Self> {
        let base_path = &config.storage.base_path;
        let registry: Arc<dyn TenantRegistry> = match &config.daemon.tenants_file {
            Some(file) => Arc::new(
                StaticRegistry::load(base_path, file).context("Failed to load tenant registry")?,
            ),
            None => {
                tracing::debug!("Discovering tenants under {:?}", base_path);
                Arc::new(VolumeRegistry::new(base_path))
            }
        };

        let credentials = Arc::new(FileCredentialStore::new(&config.credentials.root));

        Ok(Self::new(registry, credentials))
    }

    /// Identity resolver for FTP logins.
    pub fn resolver(&self, read_only: bool) -> IdentityResolver {
        IdentityResolver::new(
            Arc::clone(&self.registry),
            Arc::clone(&self.credentials),
            read_only,
        )
    }

    /// Gateway handed to the FTP engine.
    pub fn gateway(&self, config: &Config) -> Result<FtpGateway> {
        let settings = FtpSettings::from_config(config).context("Invalid FTP settings")?;
        Ok(FtpGateway::new(settings, self.resolver(config.ftp.read_only)))
    }

    /// State of the rotation API.
    pub fn api_state(&self, config: &Config) -> AppState {
        AppState::new(
            Arc::clone(&self.registry),
            Arc::clone(&self.credentials),
            config.api.token.clone(),
        )
    }
}
