//! Per-connection file operations.
//!
//! A [`TenantSession`] is created once a connection authenticates and is
//! bound to a snapshot of its tenant for the connection lifetime. Every
//! operation confines its path(s) afresh and performs one filesystem call.

use std::fs::{self, File, OpenOptions};
use std::io::{self, Read, Seek, SeekFrom};
use std::net::SocketAddr;
use std::os::unix::fs::{DirBuilderExt, MetadataExt, OpenOptionsExt};
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use thiserror::Error;

use super::confine::PathConfiner;
use crate::tenants::Tenant;

/// Mode of directories created by the driver.
const DIR_MODE: u32 = 0o755;

/// Mode of files created by the driver, before the umask.
const FILE_MODE: u32 = 0o666;

/// Errors returned by session operations.
#[derive(Debug, Error)]
pub enum DriverError {
    /// The session is read-only and the operation would modify the tree.
    #[error("read-only server: {0} not permitted")]
    ReadOnly(&'static str),

    /// The path exists but is not a directory.
    #[error("not a directory: {0}")]
    NotADirectory(String),

    /// The operation would modify the tenant root itself.
    #[error("operation not permitted on the root directory")]
    RootProtected,

    /// Filesystem error.
    #[error(transparent)]
    Io(#[from] io::Error),
}

impl DriverError {
    /// Whether the error means the path does not exist (or is blocked).
    pub fn is_not_found(&self) -> bool {
        matches!(self, DriverError::Io(e) if e.kind() == io::ErrorKind::NotFound)
    }
}

/// Result type alias for driver operations.
pub type Result<T> = std::result::Result<T, DriverError>;

/// Kind of a directory entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryType {
    File,
    Directory,
    Symlink,
    Other,
}

/// A file or directory as seen by a client.
#[derive(Debug, Clone)]
pub struct DirectoryEntry {
    /// Entry name (not full path).
    pub name: String,
    /// Entry type.
    pub entry_type: EntryType,
    /// Size in bytes (0 for directories).
    pub size: u64,
    /// Unix permissions mode.
    pub mode: u32,
    /// Last modified timestamp.
    pub modified: SystemTime,
    /// Whether this is a symbolic link.
    pub is_symlink: bool,
    /// Target path if this is a symlink.
    pub symlink_target: Option<PathBuf>,
}

impl DirectoryEntry {
    fn from_metadata(name: String, path: &Path, metadata: &fs::Metadata) -> Self {
        let is_symlink = metadata.file_type().is_symlink();
        let entry_type = if is_symlink {
            EntryType::Symlink
        } else if metadata.is_dir() {
            EntryType::Directory
        } else if metadata.is_file() {
            EntryType::File
        } else {
            EntryType::Other
        };

        Self {
            name,
            entry_type,
            size: if metadata.is_file() { metadata.len() } else { 0 },
            mode: metadata.mode(),
            modified: metadata.modified().unwrap_or(SystemTime::UNIX_EPOCH),
            is_symlink,
            symlink_target: if is_symlink {
                fs::read_link(path).ok()
            } else {
                None
            },
        }
    }

    pub fn is_dir(&self) -> bool {
        self.entry_type == EntryType::Directory
    }
}

/// Flags for [`TenantSession::open_with_flags`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OpenFlags {
    pub read: bool,
    pub write: bool,
    pub append: bool,
    pub create: bool,
    pub truncate: bool,
}

impl OpenFlags {
    /// Open for reading only.
    pub fn read_only() -> Self {
        Self {
            read: true,
            ..Self::default()
        }
    }

    /// Open for writing, creating and truncating the file.
    pub fn write_truncate() -> Self {
        Self {
            write: true,
            create: true,
            truncate: true,
            ..Self::default()
        }
    }

    /// Whether opening with these flags can modify the tree.
    pub fn is_mutating(&self) -> bool {
        self.write || self.append || self.create || self.truncate
    }

    fn to_options(self, mode: u32) -> OpenOptions {
        let mut options = OpenOptions::new();
        options
            .read(self.read)
            .write(self.write)
            .append(self.append)
            .create(self.create)
            .truncate(self.truncate)
            .mode(mode);
        options
    }
}

/// File operations of one authenticated connection.
#[derive(Debug, Clone)]
pub struct TenantSession {
    username: String,
    remote_addr: SocketAddr,
    tenant: Tenant,
    read_only: bool,
    confiner: PathConfiner,
}

impl TenantSession {
    /// Bind a session to `tenant`.
    pub fn new(
        username: impl Into<String>,
        remote_addr: SocketAddr,
        tenant: Tenant,
        read_only: bool,
    ) -> Self {
        let confiner = PathConfiner::for_tenant(&tenant);
        Self {
            username: username.into(),
            remote_addr,
            tenant,
            read_only,
            confiner,
        }
    }

    /// The composite username the session authenticated with.
    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn remote_addr(&self) -> SocketAddr {
        self.remote_addr
    }

    /// The tenant bound at login.
    pub fn tenant(&self) -> &Tenant {
        &self.tenant
    }

    pub fn is_read_only(&self) -> bool {
        self.read_only
    }

    /// Resolve `client_path` to a real path. Blocked paths surface as not-found.
    pub fn real_path(&self, client_path: &str) -> Result<PathBuf> {
        let resolved = self.confiner.resolve(client_path);
        if resolved.is_blocked() {
            return Err(io::Error::new(io::ErrorKind::NotFound, "no such file or directory").into());
        }
        Ok(resolved.into_path())
    }

    fn check_writable(&self, operation: &'static str) -> Result<()> {
        if self.read_only {
            tracing::debug!(
                username = %self.username,
                tenant = %self.tenant.id(),
                operation,
                "Rejected write on read-only session"
            );
            return Err(DriverError::ReadOnly(operation));
        }
        Ok(())
    }

    /// Resolve a path that is about to be modified. The root itself is refused.
    fn mutable_path(&self, client_path: &str) -> Result<PathBuf> {
        let path = self.real_path(client_path)?;
        if path == self.confiner.root() {
            return Err(DriverError::RootProtected);
        }
        Ok(path)
    }

    /// Metadata of a file or directory, following symlinks.
    pub fn stat(&self, client_path: &str) -> Result<DirectoryEntry> {
        let path = self.real_path(client_path)?;
        let metadata = fs::metadata(&path)?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "/".to_string());
        Ok(DirectoryEntry::from_metadata(name, &path, &metadata))
    }

    /// Check that `client_path` names a directory the client may enter.
    pub fn change_dir(&self, client_path: &str) -> Result<()> {
        let path = self.real_path(client_path)?;
        if !fs::metadata(&path)?.is_dir() {
            return Err(DriverError::NotADirectory(client_path.to_string()));
        }
        Ok(())
    }

    /// Entries of a directory, directories first.
    ///
    /// Entries whose metadata cannot be read are skipped.
    pub fn list(&self, client_path: &str) -> Result<Vec<DirectoryEntry>> {
        let path = self.real_path(client_path)?;
        let mut entries: Vec<DirectoryEntry> = fs::read_dir(&path)?
            .filter_map(|entry| entry.ok())
            .filter_map(|entry| {
                let metadata = entry.metadata().ok()?;
                let name = entry.file_name().to_string_lossy().into_owned();
                Some(DirectoryEntry::from_metadata(name, &entry.path(), &metadata))
            })
            .collect();

        entries.sort_by(|a, b| match (a.is_dir(), b.is_dir()) {
            (true, false) => std::cmp::Ordering::Less,
            (false, true) => std::cmp::Ordering::Greater,
            _ => a.name.to_lowercase().cmp(&b.name.to_lowercase()),
        });

        Ok(entries)
    }

    /// Create a directory and any missing parents.
    pub fn make_dir(&self, client_path: &str) -> Result<()> {
        self.check_writable("make directory")?;
        let path = self.real_path(client_path)?;
        create_dirs(&path)?;
        Ok(())
    }

    /// Remove a directory and everything under it.
    pub fn remove_dir(&self, client_path: &str) -> Result<()> {
        self.check_writable("remove directory")?;
        let path = self.mutable_path(client_path)?;
        fs::remove_dir_all(&path)?;
        Ok(())
    }

    /// Delete a file.
    pub fn delete(&self, client_path: &str) -> Result<()> {
        self.check_writable("delete")?;
        let path = self.mutable_path(client_path)?;
        fs::remove_file(&path)?;
        Ok(())
    }

    /// Remove a file or an empty directory.
    pub fn remove(&self, client_path: &str) -> Result<()> {
        self.check_writable("remove")?;
        let path = self.mutable_path(client_path)?;
        if fs::symlink_metadata(&path)?.is_dir() {
            fs::remove_dir(&path)?;
        } else {
            fs::remove_file(&path)?;
        }
        Ok(())
    }

    /// Remove a file, or a directory recursively. A missing path is not an error.
    pub fn remove_all(&self, client_path: &str) -> Result<()> {
        self.check_writable("remove")?;
        let path = self.mutable_path(client_path)?;
        let result = match fs::symlink_metadata(&path) {
            Ok(meta) if meta.is_dir() => fs::remove_dir_all(&path),
            Ok(_) => fs::remove_file(&path),
            Err(e) => Err(e),
        };
        match result {
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            other => Ok(other?),
        }
    }

    /// Rename a file or directory. Both paths are confined independently.
    pub fn rename(&self, from: &str, to: &str) -> Result<()> {
        self.check_writable("rename")?;
        let from_path = self.mutable_path(from)?;
        let to_path = self.mutable_path(to)?;
        fs::rename(&from_path, &to_path)?;
        Ok(())
    }

    /// Open a file for reading at `offset`.
    ///
    /// Returns the total file size and the positioned reader.
    pub fn read(&self, client_path: &str, offset: u64) -> Result<(u64, File)> {
        let path = self.real_path(client_path)?;
        let mut file = File::open(&path)?;
        let size = file.metadata()?.len();
        if offset > 0 {
            file.seek(SeekFrom::Start(offset))?;
        }
        Ok((size, file))
    }

    /// Write `data` to a file starting at `offset`.
    ///
    /// Parent directories are created. With a zero offset the file is
    /// truncated; otherwise existing content is kept and overwritten from
    /// `offset` on. Returns the number of bytes written.
    pub fn write<R: Read + ?Sized>(
        &self,
        client_path: &str,
        data: &mut R,
        offset: u64,
    ) -> Result<u64> {
        self.check_writable("write")?;
        let path = self.mutable_path(client_path)?;
        create_parent_dirs(&path)?;

        let mut file = if offset > 0 {
            let mut file = OpenOptions::new()
                .write(true)
                .create(true)
                .mode(FILE_MODE)
                .open(&path)?;
            file.seek(SeekFrom::Start(offset))?;
            file
        } else {
            File::create(&path)?
        };

        let written = io::copy(data, &mut file)?;
        tracing::debug!(
            username = %self.username,
            tenant = %self.tenant.id(),
            path = %path.display(),
            offset,
            written,
            "File written"
        );
        Ok(written)
    }

    /// Create or truncate a file for writing, creating parent directories.
    pub fn create(&self, client_path: &str) -> Result<File> {
        self.check_writable("create")?;
        let path = self.mutable_path(client_path)?;
        create_parent_dirs(&path)?;
        Ok(File::create(&path)?)
    }

    /// Open a file for reading.
    pub fn open(&self, client_path: &str) -> Result<File> {
        let path = self.real_path(client_path)?;
        Ok(File::open(&path)?)
    }

    /// Open a file with explicit flags. Mutating flags require a writable session.
    pub fn open_with_flags(&self, client_path: &str, flags: OpenFlags, mode: u32) -> Result<File> {
        let path = if flags.is_mutating() {
            self.check_writable("open for writing")?;
            self.mutable_path(client_path)?
        } else {
            self.real_path(client_path)?
        };
        Ok(flags.to_options(mode).open(&path)?)
    }

    /// Permission changes are accepted and ignored.
    pub fn chmod(&self, _client_path: &str, _mode: u32) -> Result<()> {
        Ok(())
    }

    /// Ownership changes are accepted and ignored.
    pub fn chown(&self, _client_path: &str, _uid: u32, _gid: u32) -> Result<()> {
        Ok(())
    }

    /// Timestamp changes are accepted and ignored.
    pub fn chtimes(
        &self,
        _client_path: &str,
        _accessed: SystemTime,
        _modified: SystemTime,
    ) -> Result<()> {
        Ok(())
    }
}

fn create_dirs(path: &Path) -> io::Result<()> {
    fs::DirBuilder::new()
        .recursive(true)
        .mode(DIR_MODE)
        .create(path)
}

fn create_parent_dirs(path: &Path) -> io::Result<()> {
    match path.parent() {
        Some(parent) => create_dirs(parent),
        None => Ok(()),
    }
}
