//! # ftpgate Daemon Library
//!
//! Multi-tenant FTP access layer. Each tenant owns a directory tree under a
//! common base path; FTP logins name the tenant in the username and every
//! file operation is confined to that tenant's tree.
//!
//! ## Overview
//!
//! - **Identity resolution**: `<user>_<tenant-key>` usernames are resolved to
//!   a tenant, checked against the credential store, and bound to a session
//! - **Path confinement**: client paths are normalized and mapped into the
//!   tenant root, lexically and through symlinks
//! - **Session driver**: list, read, write (offset aware), rename, delete and
//!   directory operations, with an optional read-only mode
//! - **Credential rotation**: HTTP endpoint to set or change FTP passwords
//!
//! ## Architecture
//!
//! ```text
//! ┌───────────────────┐        ┌───────────────────────────────┐
//! │  FTP wire engine  │───────▶│          FtpGateway           │
//! └───────────────────┘        │  settings / connect / login   │
//!                              └──────────────┬────────────────┘
//!                                             │
//!                              ┌──────────────▼────────────────┐
//!                              │       IdentityResolver        │
//!                              │  TenantRegistry  Credentials  │
//!                              └──────────────┬────────────────┘
//!                                             │ TenantSession
//!                              ┌──────────────▼────────────────┐
//!                              │  PathConfiner ──▶ filesystem  │
//!                              └───────────────────────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use ftpgate::{Config, Services};
//!
//! fn main() -> anyhow::Result<()> {
//!     let config = Config::load_default()?;
//!     let services = Services::from_config(&config)?;
//!     let gateway = services.gateway(&config)?;
//!
//!     let session = gateway
//!         .auth_user("127.0.0.1:50000".parse()?, "admin_abcd1234", "secret")
//!         .map_err(anyhow::Error::from)?;
//!     for entry in session.list("/")? {
//!         println!("{}", entry.name);
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Modules
//!
//! - [`config`]: Configuration loading and defaults
//! - [`auth`]: Login-time identity resolution
//! - [`credentials`]: Credential store and rotation
//! - [`tenants`]: Tenant registry
//! - [`files`]: Path confinement and per-session file operations
//! - [`transport`]: FTP engine hand-off
//! - [`api`]: Rotation HTTP API
//! - [`services`]: Component wiring

pub mod api;
pub mod auth;
pub mod config;
pub mod credentials;
pub mod files;
pub mod services;
pub mod tenants;
pub mod transport;

// Re-export protocol for convenience
pub use ftpgate_protocol as protocol;

pub use auth::{AuthError, IdentityResolver};
pub use config::Config;
pub use credentials::{
    rotate_password, CredentialError, CredentialStore, FileCredentialStore,
    MemoryCredentialStore, RotationError,
};
pub use files::{
    DirectoryEntry, DriverError, EntryType, OpenFlags, PathConfiner, ResolvedPath, TenantSession,
};
pub use services::Services;
pub use tenants::{StaticRegistry, Tenant, TenantRegistry, VolumeRegistry};
pub use transport::{FtpGateway, FtpSettings};
