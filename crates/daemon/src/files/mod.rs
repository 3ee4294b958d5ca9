//! Tenant file access.
//!
//! This module provides the per-connection file operations and the path
//! confinement they all go through:
//! - Lexical and symlink-aware confinement to the tenant root
//! - Offset-aware reads and writes for resumed transfers
//! - Read-only enforcement
//!
//! # Security
//!
//! Every operation resolves its client path afresh. A path that escapes the
//! tenant root, lexically or through a symlink, is replaced by a sentinel
//! and the operation fails as if the path did not exist.

pub mod confine;
pub mod driver;

pub use confine::{lexical_normalize, PathConfiner, ResolvedPath, BLOCKED_SENTINEL};
pub use driver::{DirectoryEntry, DriverError, EntryType, OpenFlags, TenantSession};
