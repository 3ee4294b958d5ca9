//! Path confinement.
//!
//! Maps a client-supplied path onto a real path inside a tenant root. The
//! result is checked twice: lexically, after normalizing `.` and `..`
//! components, and physically, after resolving symlinks along the path.
//! A path failing either check is replaced by the sentinel `<root>/.blocked`.

use std::collections::VecDeque;
use std::ffi::OsString;
use std::fs;
use std::io;
use std::path::{Component, Path, PathBuf};

use crate::tenants::Tenant;

/// Name of the sentinel returned for blocked paths.
pub const BLOCKED_SENTINEL: &str = ".blocked";

/// Maximum number of symlinks expanded while resolving one path.
const MAX_LINK_HOPS: usize = 40;

/// A confined path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedPath {
    path: PathBuf,
    blocked: bool,
}

impl ResolvedPath {
    /// The absolute path. For a blocked request this is the sentinel.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Whether the request was rejected.
    pub fn is_blocked(&self) -> bool {
        self.blocked
    }

    pub fn into_path(self) -> PathBuf {
        self.path
    }
}

/// Confines client paths to one root directory.
#[derive(Debug, Clone)]
pub struct PathConfiner {
    root: PathBuf,
    sentinel: PathBuf,
    label: String,
}

impl PathConfiner {
    /// Create a confiner for `root`.
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        let root = lexical_normalize(root.as_ref());
        let label = root.display().to_string();
        Self::with_label(root, label)
    }

    /// Create a confiner for the storage root of `tenant`.
    pub fn for_tenant(tenant: &Tenant) -> Self {
        Self::with_label(lexical_normalize(tenant.root()), tenant.id().to_string())
    }

    fn with_label(root: PathBuf, label: String) -> Self {
        let sentinel = root.join(BLOCKED_SENTINEL);
        Self {
            root,
            sentinel,
            label,
        }
    }

    /// The root every resolved path stays under.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// The sentinel path returned for blocked requests.
    pub fn sentinel(&self) -> &Path {
        &self.sentinel
    }

    /// Map `client_path` to a path inside the root.
    ///
    /// Never fails: a violation yields the blocked sentinel.
    pub fn resolve(&self, client_path: &str) -> ResolvedPath {
        let cleaned = lexical_normalize(Path::new(client_path));
        let relative = cleaned.strip_prefix("/").unwrap_or(cleaned.as_path());
        let candidate = lexical_normalize(&self.root.join(relative));

        if !candidate.starts_with(&self.root) {
            tracing::warn!(
                tenant = %self.label,
                request_path = client_path,
                resolved = %candidate.display(),
                "FTP path traversal attempt blocked"
            );
            return self.blocked();
        }

        if candidate.starts_with(&self.sentinel) {
            tracing::debug!(
                tenant = %self.label,
                request_path = client_path,
                "Request names the blocked sentinel"
            );
            return self.blocked();
        }

        let physical_root = resolve_physical(&self.root).unwrap_or_else(|| self.root.clone());
        let escapes = match resolve_physical(&candidate) {
            Some(physical) => !physical.starts_with(&physical_root),
            None => true,
        };
        if escapes {
            tracing::warn!(
                tenant = %self.label,
                request_path = client_path,
                resolved = %candidate.display(),
                "FTP symlink attack attempt blocked"
            );
            return self.blocked();
        }

        tracing::debug!(
            tenant = %self.label,
            request_path = client_path,
            resolved = %candidate.display(),
            "FTP path mapping"
        );
        ResolvedPath {
            path: candidate,
            blocked: false,
        }
    }

    fn blocked(&self) -> ResolvedPath {
        ResolvedPath {
            path: self.sentinel.clone(),
            blocked: true,
        }
    }
}

/// Normalize `.`, `..` and repeated separators without touching the
/// filesystem.
///
/// `..` at the start of an absolute path is dropped; at the start of a
/// relative path it is kept.
pub fn lexical_normalize(path: &Path) -> PathBuf {
    let mut absolute = false;
    let mut parts: Vec<&std::ffi::OsStr> = Vec::new();

    for component in path.components() {
        match component {
            Component::Prefix(_) => {}
            Component::RootDir => absolute = true,
            Component::CurDir => {}
            Component::ParentDir => {
                if parts.last().is_some_and(|last| *last != "..") {
                    parts.pop();
                } else if !absolute {
                    parts.push(component.as_os_str());
                }
            }
            Component::Normal(name) => parts.push(name),
        }
    }

    let mut normalized = if absolute {
        PathBuf::from("/")
    } else {
        PathBuf::new()
    };
    normalized.extend(parts);
    normalized
}

/// Resolve symlinks along `path`, one component at a time.
///
/// Each existing component is looked up on the filesystem and symlinks are
/// expanded in place, so `..` always steps out of the physical directory.
/// Once a component does not exist the rest is appended unchanged. Returns
/// `None` for link loops, lookup errors, and `..` below a missing component.
fn resolve_physical(path: &Path) -> Option<PathBuf> {
    let path = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir().ok()?.join(path)
    };

    let mut pending: VecDeque<OsString> = VecDeque::new();
    push_components(&mut pending, &path);

    let mut resolved = PathBuf::from("/");
    let mut missing = false;
    let mut hops = 0;

    while let Some(name) = pending.pop_front() {
        if name == ".." {
            if missing {
                return None;
            }
            resolved.pop();
            continue;
        }

        let next = resolved.join(&name);
        if missing {
            resolved = next;
            continue;
        }

        match fs::symlink_metadata(&next) {
            Ok(meta) if meta.file_type().is_symlink() => {
                hops += 1;
                if hops > MAX_LINK_HOPS {
                    return None;
                }
                let link = fs::read_link(&next).ok()?;
                if link.is_absolute() {
                    resolved = PathBuf::from("/");
                }
                push_components(&mut pending, &link);
            }
            Ok(_) => resolved = next,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                missing = true;
                resolved = next;
            }
            Err(_) => return None,
        }
    }

    Some(resolved)
}

/// Queue the components of `path` ahead of `pending`, keeping `..` verbatim.
fn push_components(pending: &mut VecDeque<OsString>, path: &Path) {
    let names: Vec<OsString> = path
        .components()
        .filter_map(|component| match component {
            Component::Normal(name) => Some(name.to_os_string()),
            Component::ParentDir => Some(OsString::from("..")),
            _ => None,
        })
        .collect();
    for name in names.into_iter().rev() {
        pending.push_front(name);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::os::unix::fs::symlink;
    use tempfile::TempDir;

    fn setup() -> (TempDir, PathConfiner) {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path().join("tenant");
        fs::create_dir(&root).unwrap();
        let confiner = PathConfiner::new(&root);
        (temp_dir, confiner)
    }

    #[test]
    fn test_lexical_normalize() {
        let cases = [
            ("a/b/../c", "a/c"),
            ("/a/./b//c/", "/a/b/c"),
            ("/../../etc/passwd", "/etc/passwd"),
            ("../../etc/passwd", "../../etc/passwd"),
            ("a/../..", ".."),
            ("/", "/"),
            ("", ""),
            (".", ""),
        ];
        for (input, expected) in cases {
            assert_eq!(
                lexical_normalize(Path::new(input)),
                PathBuf::from(expected),
                "normalizing {:?}",
                input
            );
        }
    }

    #[test]
    fn test_root_paths() {
        let (_temp, confiner) = setup();
        for path in ["/", "", ".", "/.", "//", "/a/.."] {
            let resolved = confiner.resolve(path);
            assert!(!resolved.is_blocked(), "{:?} should not be blocked", path);
            assert_eq!(resolved.path(), confiner.root());
        }
    }

    #[test]
    fn test_nested_path() {
        let (_temp, confiner) = setup();
        let resolved = confiner.resolve("a/b/../c");
        assert!(!resolved.is_blocked());
        assert_eq!(resolved.path(), confiner.root().join("a/c"));

        let resolved = confiner.resolve("/docs/report.txt");
        assert_eq!(resolved.path(), confiner.root().join("docs/report.txt"));
    }

    #[test]
    fn test_relative_traversal_blocked() {
        let (_temp, confiner) = setup();
        let resolved = confiner.resolve("../../etc/passwd");
        assert!(resolved.is_blocked());
        assert_eq!(resolved.path(), confiner.root().join(BLOCKED_SENTINEL));
        assert_eq!(resolved.path(), confiner.sentinel());
    }

    #[test]
    fn test_absolute_traversal_is_clamped() {
        let (_temp, confiner) = setup();
        let resolved = confiner.resolve("/../../etc/passwd");
        assert!(!resolved.is_blocked());
        assert_eq!(resolved.path(), confiner.root().join("etc/passwd"));
    }

    #[test]
    fn test_sibling_with_shared_prefix_blocked() {
        let (temp, confiner) = setup();
        fs::create_dir(temp.path().join("tenant-other")).unwrap();
        let resolved = confiner.resolve("../tenant-other/secret");
        assert!(resolved.is_blocked());
    }

    #[test]
    fn test_sentinel_name_blocked() {
        let (_temp, confiner) = setup();
        assert!(confiner.resolve("/.blocked").is_blocked());
        assert!(confiner.resolve("/.blocked/inner").is_blocked());
        assert!(confiner.resolve("x/../.blocked").is_blocked());
        assert!(!confiner.resolve("/sub/.blocked").is_blocked());
    }

    #[test]
    fn test_symlink_outside_root_blocked() {
        let (_temp, confiner) = setup();
        symlink("/etc", confiner.root().join("etc_link")).unwrap();

        assert!(confiner.resolve("/etc_link").is_blocked());
        assert!(confiner.resolve("/etc_link/passwd").is_blocked());
        assert!(confiner.resolve("/etc_link/does-not-exist").is_blocked());
    }

    #[test]
    fn test_symlink_inside_root_allowed() {
        let (_temp, confiner) = setup();
        fs::create_dir(confiner.root().join("real")).unwrap();
        symlink("real", confiner.root().join("alias")).unwrap();

        let resolved = confiner.resolve("/alias/file.txt");
        assert!(!resolved.is_blocked());
        assert_eq!(resolved.path(), confiner.root().join("alias/file.txt"));
    }

    #[test]
    fn test_dangling_symlink_outside_root_blocked() {
        let (temp, confiner) = setup();
        let outside = temp.path().join("outside").join("new.txt");
        symlink(&outside, confiner.root().join("drop")).unwrap();

        assert!(confiner.resolve("/drop").is_blocked());
    }

    #[test]
    fn test_dangling_symlink_through_escaping_dir_blocked() {
        let (temp, confiner) = setup();
        let outside = temp.path().join("outside");
        fs::create_dir_all(outside.join("dir")).unwrap();
        symlink(outside.join("dir"), confiner.root().join("sub")).unwrap();
        // `..` is taken from the physical target of `sub`, not the link name.
        symlink("sub/../planted.txt", confiner.root().join("drop")).unwrap();

        assert!(confiner.resolve("/drop").is_blocked());
        // A client-side `..` is still normalized before the lookup.
        assert!(!confiner.resolve("/sub/../planted.txt").is_blocked());
        assert!(resolve_physical(&confiner.root().join("drop"))
            .unwrap()
            .starts_with(fs::canonicalize(&outside).unwrap()));
    }

    #[test]
    fn test_parent_of_missing_component_blocked() {
        let (_temp, confiner) = setup();
        symlink("missing/../..", confiner.root().join("up")).unwrap();

        assert!(confiner.resolve("/up").is_blocked());
        assert!(confiner.resolve("/up/etc/passwd").is_blocked());
    }

    #[test]
    fn test_symlink_loop_blocked() {
        let (_temp, confiner) = setup();
        symlink("loop_b", confiner.root().join("loop_a")).unwrap();
        symlink("loop_a", confiner.root().join("loop_b")).unwrap();

        assert!(confiner.resolve("/loop_a").is_blocked());
    }

    #[test]
    fn test_symlinked_root() {
        let temp = TempDir::new().unwrap();
        let real_root = temp.path().join("real-root");
        fs::create_dir(&real_root).unwrap();
        fs::create_dir(real_root.join("data")).unwrap();
        let link_root = temp.path().join("link-root");
        symlink(&real_root, &link_root).unwrap();

        let confiner = PathConfiner::new(&link_root);
        let resolved = confiner.resolve("/data");
        assert!(!resolved.is_blocked());
        assert_eq!(resolved.path(), link_root.join("data"));
    }

    #[test]
    fn test_nonexistent_paths_allowed() {
        let (_temp, confiner) = setup();
        let resolved = confiner.resolve("/new/dir/file.bin");
        assert!(!resolved.is_blocked());
        assert_eq!(resolved.path(), confiner.root().join("new/dir/file.bin"));
    }

    #[test]
    fn test_resolution_is_fresh_each_call() {
        let (_temp, confiner) = setup();
        assert!(!confiner.resolve("/later").is_blocked());

        symlink("/etc", confiner.root().join("later")).unwrap();
        assert!(confiner.resolve("/later").is_blocked());
    }

    #[test]
    fn test_resolved_paths_stay_under_root() {
        let (_temp, confiner) = setup();
        let inputs = [
            "..", "../", "/..", "a/../../b", "./../x", "a/b/c/../../../../d", "....", "..a/b",
            "a/..b", "//..//..//x", "\\..\\x",
        ];
        for input in inputs {
            let resolved = confiner.resolve(input);
            assert!(
                resolved.path().starts_with(confiner.root()),
                "{:?} escaped to {:?}",
                input,
                resolved.path()
            );
        }
    }

    #[test]
    fn test_for_tenant() {
        let tenant = Tenant::new(
            ftpgate_protocol::TenantId::parse("abcd1234").unwrap(),
            Path::new("/srv/volumes"),
        );
        let confiner = PathConfiner::for_tenant(&tenant);
        assert_eq!(confiner.root(), Path::new("/srv/volumes/abcd1234"));
        assert_eq!(
            confiner.resolve("../x").path(),
            Path::new("/srv/volumes/abcd1234/.blocked")
        );
    }
}
