//! Database schema definitions and column families.
//!
//! This module defines the column families used in `RocksDB` storage.

/// Column family names for the `RocksDB` database.
pub mod cf {
    /// Registered clusters, keyed by `cluster_id`.
    pub const CLUSTERS: &str = "clusters";

    /// Index: clusters by name, keyed by `name || 0x00 || cluster_id`.
    ///
    /// Names are meant to be unique, but the index tolerates duplicates so
    /// that lookups can report them instead of hiding them.
    pub const CLUSTERS_BY_NAME: &str = "clusters_by_name";

    /// Approval modules, keyed by `module_id`.
    pub const MODULES: &str = "approve_modules";

    /// Role-specific authority rows, keyed by `role_id`.
    pub const ROLES: &str = "approve_roles";

    /// Operations with their default authority, keyed by `operate_id`.
    pub const OPERATES: &str = "approve_operates";

    /// Approval workflow records, keyed by `record_id`.
    pub const APPROVAL_RECORDS: &str = "approval_records";
}

/// Returns all column family names for database initialization.
#[must_use]
pub fn all_column_families() -> Vec<&'static str> {
    vec![
        cf::CLUSTERS,
        cf::CLUSTERS_BY_NAME,
        cf::MODULES,
        cf::ROLES,
        cf::OPERATES,
        cf::APPROVAL_RECORDS,
    ]
}
