//! Composite FTP usernames.
//!
//! Transport-level usernames encode both the real user and the target tenant
//! as `<actual-user>_<tenant-key>`. The tenant-key is the suffix after the
//! *last* `_`, so the actual-user part may itself contain underscores.

use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use regex::Regex;

use crate::error::{ProtocolError, Result};
use crate::tenant::TenantId;

/// Separator between the actual-user and the tenant-key.
pub const USERNAME_SEPARATOR: char = '_';

static USERNAME_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?i)(.+)_([a-z0-9]{8}|[a-z0-9-]{36})$").expect("username pattern is valid")
});

/// A parsed `<actual-user>_<tenant-key>` username.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CompositeUsername {
    raw: String,
    /// Byte index of the last separator in `raw`.
    split: usize,
}

impl CompositeUsername {
    /// Validate the shape of `username` and split it on the last separator.
    pub fn parse(username: &str) -> Result<Self> {
        if !USERNAME_PATTERN.is_match(username) {
            return Err(ProtocolError::InvalidUsernameFormat(username.to_string()));
        }

        let split = username
            .rfind(USERNAME_SEPARATOR)
            .ok_or_else(|| ProtocolError::InvalidUsernameFormat(username.to_string()))?;

        Ok(Self {
            raw: username.to_string(),
            split,
        })
    }

    /// The full username exactly as supplied by the client.
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Everything before the last separator.
    pub fn actual_user(&self) -> &str {
        &self.raw[..self.split]
    }

    /// The 8- or 36-character suffix used to look up the tenant.
    pub fn tenant_key(&self) -> &str {
        &self.raw[self.split + USERNAME_SEPARATOR.len_utf8()..]
    }

    /// Identity whose credential record grants this user access to `tenant`:
    /// `<actual-user>_<first 8 chars of the tenant identifier>`.
    pub fn access_identity(&self, tenant: &TenantId) -> String {
        format!("{}{}{}", self.actual_user(), USERNAME_SEPARATOR, tenant.short())
    }
}

impl fmt::Display for CompositeUsername {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

impl FromStr for CompositeUsername {
    type Err = ProtocolError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}
