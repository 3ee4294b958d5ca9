//! Keyed credential records.
//!
//! One record per identity. The production store keeps each secret in
//! `<root>/<identity>.txt`; the in-memory store backs embedding and tests.
//! Surrounding whitespace of a stored secret is not significant.

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use dashmap::DashMap;
use sha2::{Digest, Sha256};
use thiserror::Error;

/// File extension of a credential record.
const RECORD_EXTENSION: &str = "txt";

/// Credential store errors.
#[derive(Debug, Error)]
pub enum CredentialError {
    /// The identity cannot be used as a record key.
    #[error("invalid credential identity: {0:?}")]
    InvalidIdentity(String),

    /// Reading or writing the record failed.
    #[error("credential I/O error for {identity}: {source}")]
    Io {
        identity: String,
        #[source]
        source: io::Error,
    },
}

/// Result type alias for credential operations.
pub type Result<T> = std::result::Result<T, CredentialError>;

/// Keyed secret storage.
///
/// Reads are point lookups; writes replace a single record. Invalid
/// identities are treated as missing on read and rejected on write.
pub trait CredentialStore: Send + Sync {
    /// The stored secret for `identity`, trimmed of surrounding whitespace.
    fn get(&self, identity: &str) -> Result<Option<String>>;

    /// Create or replace the record for `identity`.
    fn put(&self, identity: &str, secret: &str) -> Result<()>;

    /// Whether a record exists for `identity`.
    fn contains(&self, identity: &str) -> Result<bool>;

    /// Whether `password` equals the stored secret for `identity`.
    ///
    /// A missing record never verifies.
    fn verify(&self, identity: &str, password: &str) -> Result<bool> {
        Ok(self
            .get(identity)?
            .is_some_and(|stored| secrets_match(&stored, password)))
    }
}

/// Whether `identity` is usable as a record key.
///
/// Keys must be non-empty single path components without NUL bytes.
pub fn is_valid_identity(identity: &str) -> bool {
    !identity.is_empty()
        && identity != "."
        && identity != ".."
        && !identity.contains(['/', '\\', '\0'])
}

/// Compare two secrets by their SHA-256 digests.
pub fn secrets_match(stored: &str, supplied: &str) -> bool {
    Sha256::digest(stored.as_bytes()) == Sha256::digest(supplied.as_bytes())
}

/// Credential records stored as one file per identity.
#[derive(Debug, Clone)]
pub struct FileCredentialStore {
    root: PathBuf,
}

impl FileCredentialStore {
    /// Create a store rooted at `root`. The directory is created on first write.
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    /// The directory holding the records.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path of the record for `identity`.
    pub fn record_path(&self, identity: &str) -> PathBuf {
        self.root.join(format!("{}.{}", identity, RECORD_EXTENSION))
    }

    fn io_error(identity: &str, source: io::Error) -> CredentialError {
        CredentialError::Io {
            identity: identity.to_string(),
            source,
        }
    }

    fn create_root(&self) -> io::Result<()> {
        let mut builder = fs::DirBuilder::new();
        builder.recursive(true);
        #[cfg(unix)]
        {
            use std::os::unix::fs::DirBuilderExt;
            builder.mode(0o700);
        }
        builder.create(&self.root)
    }
}

impl CredentialStore for FileCredentialStore {
    fn get(&self, identity: &str) -> Result<Option<String>> {
        if !is_valid_identity(identity) {
            return Ok(None);
        }

        match fs::read_to_string(self.record_path(identity)) {
            Ok(contents) => Ok(Some(contents.trim().to_string())),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(Self::io_error(identity, e)),
        }
    }

    fn put(&self, identity: &str, secret: &str) -> Result<()> {
        if !is_valid_identity(identity) {
            return Err(CredentialError::InvalidIdentity(identity.to_string()));
        }

        self.create_root()
            .map_err(|e| Self::io_error(identity, e))?;

        let path = self.record_path(identity);
        if !path.exists() {
            tracing::info!(identity, "Credential record does not exist, creating new one");
        }

        // Each writer gets its own temp file; the last rename wins.
        let write = || -> io::Result<()> {
            let mut temp = tempfile::Builder::new()
                .prefix(&format!(".{}.", identity))
                .suffix(".tmp")
                .tempfile_in(&self.root)?;
            temp.write_all(secret.as_bytes())?;
            temp.as_file().sync_all()?;
            temp.persist(&path).map_err(|e| e.error)?;
            Ok(())
        };
        write().map_err(|e| Self::io_error(identity, e))?;

        tracing::debug!(identity, path = %path.display(), "Credential record written");
        Ok(())
    }

    fn contains(&self, identity: &str) -> Result<bool> {
        if !is_valid_identity(identity) {
            return Ok(false);
        }

        match fs::metadata(self.record_path(identity)) {
            Ok(meta) => Ok(meta.is_file()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(Self::io_error(identity, e)),
        }
    }
}

/// Credential records kept in memory.
#[derive(Debug, Default)]
pub struct MemoryCredentialStore {
    records: DashMap<String, String>,
}

impl MemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of records.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl CredentialStore for MemoryCredentialStore {
    fn get(&self, identity: &str) -> Result<Option<String>> {
        if !is_valid_identity(identity) {
            return Ok(None);
        }
        Ok(self
            .records
            .get(identity)
            .map(|secret| secret.trim().to_string()))
    }

    fn put(&self, identity: &str, secret: &str) -> Result<()> {
        if !is_valid_identity(identity) {
            return Err(CredentialError::InvalidIdentity(identity.to_string()));
        }
        self.records.insert(identity.to_string(), secret.to_string());
        Ok(())
    }

    fn contains(&self, identity: &str) -> Result<bool> {
        Ok(is_valid_identity(identity) && self.records.contains_key(identity))
    }
}
