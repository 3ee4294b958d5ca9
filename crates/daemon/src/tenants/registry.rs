//! Tenant registry.
//!
//! The registry is the externally-owned set of active tenants. The access
//! layer only reads it: at login to resolve a tenant-key, and in the rotation
//! API to resolve the tenant named in the route.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::RwLock;

use anyhow::{Context, Result};
use ftpgate_protocol::{KeyMatch, TenantId};
use serde::{Deserialize, Serialize};

/// An active tenant and its storage root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tenant {
    id: TenantId,
    root: PathBuf,
}

impl Tenant {
    /// A tenant whose storage root is `<base_path>/<id>`.
    pub fn new(id: TenantId, base_path: &Path) -> Self {
        let root = base_path.join(id.as_str());
        Self { id, root }
    }

    pub fn id(&self) -> &TenantId {
        &self.id
    }

    /// Root of the tenant's directory tree.
    pub fn root(&self) -> &Path {
        &self.root
    }
}

/// Read access to the set of active tenants.
pub trait TenantRegistry: Send + Sync {
    /// Snapshot of the active tenants, in registry order.
    fn tenants(&self) -> Vec<Tenant>;

    /// Resolve a tenant-key.
    ///
    /// Rules are tried in priority order (exact, prefix, suffix); within a
    /// rule the first tenant in registry order wins.
    fn find(&self, key: &str) -> Option<(Tenant, KeyMatch)> {
        let tenants = self.tenants();
        find_tenant(&tenants, key).map(|(tenant, rule)| (tenant.clone(), rule))
    }
}

/// Short-circuiting scan of `tenants` for `key`.
pub fn find_tenant<'a>(tenants: &'a [Tenant], key: &str) -> Option<(&'a Tenant, KeyMatch)> {
    KeyMatch::PRIORITY.into_iter().find_map(|rule| {
        tenants
            .iter()
            .find(|tenant| tenant.id.matches(key, rule))
            .map(|tenant| (tenant, rule))
    })
}

/// On-disk format of a tenants file.
#[derive(Debug, Serialize, Deserialize)]
struct TenantsFile {
    /// Version of the file format.
    version: u32,
    /// Tenant identifiers in registry order.
    tenants: Vec<TenantId>,
}

/// Registry backed by an explicit list of tenants.
///
/// The list can be loaded from a JSON file and edited at runtime.
#[derive(Debug)]
pub struct StaticRegistry {
    base_path: PathBuf,
    tenants: RwLock<Vec<Tenant>>,
}

impl StaticRegistry {
    /// Create an empty registry whose tenants live under `base_path`.
    pub fn new<P: AsRef<Path>>(base_path: P) -> Self {
        Self {
            base_path: base_path.as_ref().to_path_buf(),
            tenants: RwLock::new(Vec::new()),
        }
    }

    /// Create a registry holding `ids` in the given order.
    pub fn with_tenants<P, I>(base_path: P, ids: I) -> Self
    where
        P: AsRef<Path>,
        I: IntoIterator<Item = TenantId>,
    {
        let registry = Self::new(base_path);
        let tenants = ids
            .into_iter()
            .map(|id| Tenant::new(id, &registry.base_path))
            .collect();
        registry.replace(tenants);
        registry
    }

    /// Load the tenant list from a JSON file.
    ///
    /// Expected shape: `{"version": 1, "tenants": ["<id>", ...]}`.
    pub fn load<P: AsRef<Path>, F: AsRef<Path>>(base_path: P, file: F) -> Result<Self> {
        let file = file.as_ref();
        let contents = fs::read_to_string(file)
            .with_context(|| format!("Failed to read tenants file: {}", file.display()))?;
        let data: TenantsFile = serde_json::from_str(&contents)
            .with_context(|| format!("Failed to parse tenants file: {}", file.display()))?;

        let registry = Self::with_tenants(base_path, data.tenants);
        tracing::info!(
            "Loaded {} tenants from {:?}",
            registry.len(),
            file
        );
        Ok(registry)
    }

    /// Append a tenant. An already registered identifier is left in place.
    pub fn add(&self, id: TenantId) {
        let mut tenants = self.write();
        if tenants.iter().any(|t| t.id == id) {
            return;
        }
        tracing::info!(tenant = %id, "Registering tenant");
        tenants.push(Tenant::new(id, &self.base_path));
    }

    /// Remove a tenant. Sessions already bound to it keep their snapshot.
    pub fn remove(&self, id: &TenantId) -> Option<Tenant> {
        let mut tenants = self.write();
        let index = tenants.iter().position(|t| &t.id == id)?;
        tracing::info!(tenant = %id, "Unregistering tenant");
        Some(tenants.remove(index))
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    fn replace(&self, tenants: Vec<Tenant>) {
        *self.write() = tenants;
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, Vec<Tenant>> {
        self.tenants.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, Vec<Tenant>> {
        self.tenants.write().unwrap_or_else(|e| e.into_inner())
    }
}

impl TenantRegistry for StaticRegistry {
    fn tenants(&self) -> Vec<Tenant> {
        self.read().clone()
    }

    fn find(&self, key: &str) -> Option<(Tenant, KeyMatch)> {
        let tenants = self.read();
        find_tenant(&tenants, key).map(|(tenant, rule)| (tenant.clone(), rule))
    }
}

/// Registry that treats every directory under the base path as a tenant.
///
/// Directories whose names are not valid tenant identifiers are ignored.
/// Registry order is the lexical order of the directory names.
#[derive(Debug, Clone)]
pub struct VolumeRegistry {
    base_path: PathBuf,
}

impl VolumeRegistry {
    pub fn new<P: AsRef<Path>>(base_path: P) -> Self {
        Self {
            base_path: base_path.as_ref().to_path_buf(),
        }
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }
}

impl TenantRegistry for VolumeRegistry {
    fn tenants(&self) -> Vec<Tenant> {
        let entries = match fs::read_dir(&self.base_path) {
            Ok(entries) => entries,
            Err(e) => {
                tracing::warn!(
                    "Failed to read tenant base path {:?}: {}",
                    self.base_path,
                    e
                );
                return Vec::new();
            }
        };

        let mut ids: Vec<TenantId> = entries
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.file_type().map(|t| t.is_dir()).unwrap_or(false))
            .filter_map(|entry| entry.file_name().into_string().ok())
            .filter_map(|name| TenantId::parse(name).ok())
            .collect();
        ids.sort();

        ids.into_iter()
            .map(|id| Tenant::new(id, &self.base_path))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn id(s: &str) -> TenantId {
        TenantId::parse(s).unwrap()
    }

    #[test]
    fn test_tenant_root() {
        let tenant = Tenant::new(id("abcd1234"), Path::new("/srv/volumes"));
        assert_eq!(tenant.root(), Path::new("/srv/volumes/abcd1234"));
    }

    #[test]
    fn test_find_by_prefix() {
        let registry = StaticRegistry::with_tenants(
            "/srv",
            [
                id("abcd1234ef011122223333444455556666"),
                id("11112222333344445555666677778888"),
            ],
        );

        let (tenant, rule) = registry.find("abcd1234").unwrap();
        assert_eq!(tenant.id().as_str(), "abcd1234ef011122223333444455556666");
        assert_eq!(rule, KeyMatch::Prefix);
    }

    #[test]
    fn test_find_priority_exact_over_prefix_over_suffix() {
        // "aaaaaaaa" is the suffix of the first, the prefix of the second and
        // the whole of the third.
        let registry = StaticRegistry::with_tenants(
            "/srv",
            [
                id("zzzzzzzz-aaaaaaaa"),
                id("aaaaaaaa-zzzzzzzz"),
                id("aaaaaaaa"),
            ],
        );

        let (tenant, rule) = registry.find("aaaaaaaa").unwrap();
        assert_eq!(tenant.id().as_str(), "aaaaaaaa");
        assert_eq!(rule, KeyMatch::Exact);

        registry.remove(&id("aaaaaaaa")).unwrap();
        let (tenant, rule) = registry.find("aaaaaaaa").unwrap();
        assert_eq!(tenant.id().as_str(), "aaaaaaaa-zzzzzzzz");
        assert_eq!(rule, KeyMatch::Prefix);

        registry.remove(&id("aaaaaaaa-zzzzzzzz")).unwrap();
        let (tenant, rule) = registry.find("aaaaaaaa").unwrap();
        assert_eq!(tenant.id().as_str(), "zzzzzzzz-aaaaaaaa");
        assert_eq!(rule, KeyMatch::Suffix);
    }

    #[test]
    fn test_find_registry_order_within_rule() {
        let registry = StaticRegistry::with_tenants(
            "/srv",
            [id("abcd1234-first"), id("abcd1234-second")],
        );
        let (tenant, _) = registry.find("abcd1234").unwrap();
        assert_eq!(tenant.id().as_str(), "abcd1234-first");
    }

    #[test]
    fn test_find_case_insensitive() {
        let registry = StaticRegistry::with_tenants("/srv", [id("abcd1234-ef01")]);
        assert!(registry.find("ABCD1234").is_some());
    }

    #[test]
    fn test_find_no_match() {
        let registry = StaticRegistry::with_tenants("/srv", [id("abcd1234-ef01")]);
        assert!(registry.find("99999999").is_none());
        assert!(StaticRegistry::new("/srv").find("abcd1234").is_none());
    }

    #[test]
    fn test_add_and_remove() {
        let registry = StaticRegistry::new("/srv");
        registry.add(id("abcd1234"));
        registry.add(id("abcd1234"));
        assert_eq!(registry.len(), 1);

        let removed = registry.remove(&id("abcd1234")).unwrap();
        assert_eq!(removed.root(), Path::new("/srv/abcd1234"));
        assert!(registry.is_empty());
        assert!(registry.remove(&id("abcd1234")).is_none());
    }

    #[test]
    fn test_load_from_file() {
        let temp_dir = TempDir::new().unwrap();
        let file = temp_dir.path().join("tenants.json");
        fs::write(
            &file,
            r#"{"version": 1, "tenants": ["abcd1234-ef01", "11112222-3333"]}"#,
        )
        .unwrap();

        let registry = StaticRegistry::load("/srv", &file).unwrap();
        let ids: Vec<_> = registry
            .tenants()
            .into_iter()
            .map(|t| t.id().to_string())
            .collect();
        assert_eq!(ids, vec!["abcd1234-ef01", "11112222-3333"]);
    }

    #[test]
    fn test_load_rejects_invalid_identifier() {
        let temp_dir = TempDir::new().unwrap();
        let file = temp_dir.path().join("tenants.json");
        fs::write(&file, r#"{"version": 1, "tenants": ["../etc"]}"#).unwrap();

        let err = StaticRegistry::load("/srv", &file).unwrap_err().to_string();
        assert!(err.contains("Failed to parse tenants file"));
    }

    #[test]
    fn test_load_missing_file() {
        assert!(StaticRegistry::load("/srv", "/nonexistent/tenants.json").is_err());
    }

    #[test]
    fn test_volume_registry_lists_directories() {
        let temp_dir = TempDir::new().unwrap();
        let base = temp_dir.path();
        fs::create_dir(base.join("bbbb2222")).unwrap();
        fs::create_dir(base.join("aaaa1111")).unwrap();
        fs::create_dir(base.join(".hidden")).unwrap();
        fs::create_dir(base.join("has space")).unwrap();
        fs::write(base.join("cccc3333"), "not a directory").unwrap();

        let registry = VolumeRegistry::new(base);
        let tenants = registry.tenants();
        let ids: Vec<_> = tenants.iter().map(|t| t.id().as_str()).collect();
        assert_eq!(ids, vec!["aaaa1111", "bbbb2222"]);
        assert_eq!(tenants[0].root(), base.join("aaaa1111"));

        let (tenant, _) = registry.find("bbbb2222").unwrap();
        assert_eq!(tenant.root(), base.join("bbbb2222"));
    }

    #[test]
    fn test_volume_registry_missing_base_path() {
        let registry = VolumeRegistry::new("/nonexistent/volumes");
        assert!(registry.tenants().is_empty());
        assert!(registry.find("abcd1234").is_none());
    }
}
