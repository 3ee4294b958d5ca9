//! Tenant registry module.

pub mod registry;

pub use registry::{find_tenant, StaticRegistry, Tenant, TenantRegistry, VolumeRegistry};
