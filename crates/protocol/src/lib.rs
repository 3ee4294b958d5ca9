//! # ftpgate Protocol Library
//!
//! Shared types for the ftpgate access layer.
//!
//! ## Overview
//!
//! - **Composite usernames**: `<actual-user>_<tenant-key>` parsing, split on
//!   the last separator
//! - **Tenant identifiers**: validated identifiers and the exact / prefix /
//!   suffix key-matching rules
//! - **API messages**: JSON bodies of the credential rotation endpoint
//!
//! ## Example Usage
//!
//! ```rust
//! use ftpgate_protocol::{CompositeUsername, KeyMatch, TenantId};
//!
//! let name = CompositeUsername::parse("admin_abcd1234").unwrap();
//! let tenant = TenantId::parse("abcd1234-ef01-1122-2233-334444555566").unwrap();
//!
//! assert_eq!(name.actual_user(), "admin");
//! assert_eq!(tenant.match_key(name.tenant_key()), Some(KeyMatch::Prefix));
//! ```
//!
//! ## Modules
//!
//! - [`username`]: composite username parsing
//! - [`tenant`]: tenant identifiers and key matching
//! - [`messages`]: rotation API messages
//! - [`error`]: error types

pub mod error;
pub mod messages;
pub mod tenant;
pub mod username;

pub use error::{ProtocolError, Result};
pub use messages::{
    ChangePasswordRequest, ChangePasswordResponse, ErrorResponse, MIN_PASSWORD_LENGTH,
};
pub use tenant::{KeyMatch, TenantId, FULL_KEY_LENGTH, SHORT_KEY_LENGTH};
pub use username::{CompositeUsername, USERNAME_SEPARATOR};
