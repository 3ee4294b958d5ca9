//! Tenant identifiers and the tenant-key matching rules.
//!
//! A tenant is addressed by a stable identifier (typically a hyphenated UUID).
//! Clients may refer to it by the full identifier or by an 8-character short
//! form taken from either end of it.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{ProtocolError, Result};

/// Length of the short tenant-key form.
pub const SHORT_KEY_LENGTH: usize = 8;

/// Length of the full, hyphenated tenant-key form.
pub const FULL_KEY_LENGTH: usize = 36;

/// Which rule matched a tenant-key against an identifier.
///
/// Variants are declared in priority order: when several tenants match
/// under different rules, the lowest variant wins.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum KeyMatch {
    /// The key equals the whole identifier.
    Exact,
    /// The key equals the first 8 characters of the identifier.
    Prefix,
    /// The key equals the last 8 characters of the identifier.
    Suffix,
}

impl KeyMatch {
    /// All rules, highest priority first.
    pub const PRIORITY: [KeyMatch; 3] = [KeyMatch::Exact, KeyMatch::Prefix, KeyMatch::Suffix];
}

/// Stable identifier of a tenant.
///
/// Only ASCII alphanumerics, `-` and `_` are accepted, so the identifier is
/// always safe to use as a single path component.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TenantId(String);

impl TenantId {
    /// Parse and validate a tenant identifier.
    pub fn parse(id: impl Into<String>) -> Result<Self> {
        let id = id.into();
        let valid = !id.is_empty()
            && id
                .bytes()
                .all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_');
        if !valid {
            return Err(ProtocolError::InvalidTenantId(id));
        }
        Ok(Self(id))
    }

    /// The identifier as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// First 8 characters of the identifier (or the whole identifier if shorter).
    pub fn short(&self) -> &str {
        &self.0[..self.0.len().min(SHORT_KEY_LENGTH)]
    }

    /// Last 8 characters of the identifier (or the whole identifier if shorter).
    pub fn suffix(&self) -> &str {
        &self.0[self.0.len().saturating_sub(SHORT_KEY_LENGTH)..]
    }

    /// Check a single matching rule. Comparison is ASCII case-insensitive.
    pub fn matches(&self, key: &str, rule: KeyMatch) -> bool {
        match rule {
            KeyMatch::Exact => self.0.eq_ignore_ascii_case(key),
            KeyMatch::Prefix => {
                self.0.len() >= SHORT_KEY_LENGTH && self.short().eq_ignore_ascii_case(key)
            }
            KeyMatch::Suffix => {
                self.0.len() >= SHORT_KEY_LENGTH && self.suffix().eq_ignore_ascii_case(key)
            }
        }
    }

    /// The highest-priority rule under which `key` matches this identifier.
    pub fn match_key(&self, key: &str) -> Option<KeyMatch> {
        KeyMatch::PRIORITY
            .into_iter()
            .find(|rule| self.matches(key, *rule))
    }
}

impl fmt::Display for TenantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for TenantId {
    type Err = ProtocolError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl TryFrom<String> for TenantId {
    type Error = ProtocolError;

    fn try_from(value: String) -> Result<Self> {
        Self::parse(value)
    }
}

impl From<TenantId> for String {
    fn from(id: TenantId) -> Self {
        id.0
    }
}

impl AsRef<str> for TenantId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
