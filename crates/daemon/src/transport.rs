//! Hand-off surface for the FTP wire engine.
//!
//! The engine owns sockets, command parsing and data channels. It drives an
//! [`FtpGateway`] for its settings, connection lifecycle and logins, then
//! performs file operations through the returned [`TenantSession`].

use std::fmt;
use std::net::SocketAddr;

use thiserror::Error;

use crate::auth::IdentityResolver;
use crate::config::{Config, ConfigError, PortRange};
use crate::files::TenantSession;

/// Listener settings handed to the engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FtpSettings {
    /// Control channel listen address.
    pub listen_addr: SocketAddr,
    /// Port range for passive data connections.
    pub passive_ports: PortRange,
    /// Banner shown before login.
    pub banner: String,
}

impl FtpSettings {
    /// Settings from the `[ftp]` config section.
    pub fn from_config(config: &Config) -> Result<Self, ConfigError> {
        Ok(Self {
            listen_addr: config.ftp.listen_addr()?,
            passive_ports: config.ftp.passive_ports,
            banner: config.ftp.banner.clone(),
        })
    }
}

/// Login failure as reported to the client.
///
/// Carries no detail; the cause is logged by the resolver.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("authentication failed")]
pub struct AuthFailure;

/// Entry point the FTP engine calls into.
#[derive(Clone)]
pub struct FtpGateway {
    settings: FtpSettings,
    resolver: IdentityResolver,
}

impl fmt::Debug for FtpGateway {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FtpGateway")
            .field("settings", &self.settings)
            .field("read_only", &self.resolver.read_only())
            .finish()
    }
}

impl FtpGateway {
    pub fn new(settings: FtpSettings, resolver: IdentityResolver) -> Self {
        Self { settings, resolver }
    }

    pub fn settings(&self) -> &FtpSettings {
        &self.settings
    }

    /// Greeting sent once a client connects.
    pub fn client_connected(&self, remote_addr: SocketAddr) -> String {
        tracing::debug!(%remote_addr, "FTP client connected");
        format!("Welcome to {}", self.settings.banner)
    }

    pub fn client_disconnected(&self, remote_addr: SocketAddr) {
        tracing::debug!(%remote_addr, "FTP client disconnected");
    }

    /// Authenticate a login and return the session the engine should use.
    pub fn auth_user(
        &self,
        remote_addr: SocketAddr,
        username: &str,
        password: &str,
    ) -> Result<TenantSession, AuthFailure> {
        self.resolver
            .authenticate(username, password, remote_addr)
            .map_err(|_| AuthFailure)
    }
}

/// Log a command received on a control connection. `PASS` arguments are redacted.
pub fn log_command(session_id: &str, command: &str, params: &str) {
    let params = if command.eq_ignore_ascii_case("PASS") {
        "****"
    } else {
        params
    };
    tracing::debug!(session = session_id, command, params, "ftp command");
}

/// Log a reply sent on a control connection.
pub fn log_response(session_id: &str, code: u16, message: &str) {
    tracing::debug!(session = session_id, code, message, "ftp response");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::credentials::{CredentialStore, MemoryCredentialStore};
    use crate::tenants::StaticRegistry;
    use ftpgate_protocol::TenantId;
    use std::sync::Arc;

    fn gateway() -> FtpGateway {
        let registry = Arc::new(StaticRegistry::with_tenants(
            "/srv",
            [TenantId::parse("abcd1234-ef01-1122-2233-334444555566").unwrap()],
        ));
        let store = Arc::new(MemoryCredentialStore::new());
        store.put("admin_abcd1234", "secret1").unwrap();
        let resolver = IdentityResolver::new(registry, store, false);
        let settings = FtpSettings::from_config(&Config::default()).unwrap();
        FtpGateway::new(settings, resolver)
    }

    fn addr() -> SocketAddr {
        "198.51.100.7:51000".parse().unwrap()
    }

    #[test]
    fn test_settings_from_default_config() {
        let gateway = gateway();
        let settings = gateway.settings();
        assert_eq!(settings.listen_addr, "0.0.0.0:2022".parse::<SocketAddr>().unwrap());
        assert_eq!(settings.passive_ports, PortRange { start: 40000, end: 50000 });
        assert_eq!(settings.banner, "ftpgate FTP server");
    }

    #[test]
    fn test_client_connected_welcome() {
        let gateway = gateway();
        assert_eq!(
            gateway.client_connected(addr()),
            "Welcome to ftpgate FTP server"
        );
        gateway.client_disconnected(addr());
    }

    #[test]
    fn test_auth_user_success() {
        let session = gateway()
            .auth_user(addr(), "admin_abcd1234", "secret1")
            .unwrap();
        assert_eq!(session.remote_addr(), addr());
    }

    #[test]
    fn test_auth_user_failures_are_opaque() {
        let gateway = gateway();
        let failures = [
            gateway.auth_user(addr(), "malformed", "secret1"),
            gateway.auth_user(addr(), "admin_99999999", "secret1"),
            gateway.auth_user(addr(), "admin_abcd1234", "wrong"),
            gateway.auth_user(addr(), "guest_abcd1234", "secret1"),
        ];
        for failure in failures {
            let err = failure.unwrap_err();
            assert_eq!(err, AuthFailure);
            assert_eq!(err.to_string(), "authentication failed");
        }
    }

    #[test]
    fn test_log_helpers() {
        log_command("1", "USER", "admin_abcd1234");
        log_command("1", "pass", "secret1");
        log_response("1", 230, "Logged in");
    }
}
