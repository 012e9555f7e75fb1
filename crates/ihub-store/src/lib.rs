//! `RocksDB` storage layer for ihub.
//!
//! This crate is the policy store client: the cluster registry, the approval
//! policy tables and the approval records, stored in `RocksDB` column
//! families and exposed through the [`PolicyStore`] trait.
//!
//! # Architecture
//!
//! The storage uses the following column families:
//!
//! - `clusters`: Registered clusters, keyed by `cluster_id`
//! - `clusters_by_name`: Index for looking clusters up by name
//! - `approve_modules`: Approval modules, keyed by `module_id`
//! - `approve_roles`: Role/group authority overrides, keyed by `role_id`
//! - `approve_operates`: Operations and their default authority
//! - `approval_records`: Approval workflow entries, keyed by `record_id`
//!
//! Lookups return every matching row. Deciding what zero or several rows
//! mean is left to the caller.
//!
//! # Example
//!
//! ```no_run
//! use ihub_store::{PolicyStore, RocksStore};
//!
//! let store = RocksStore::open("/tmp/ihub-db").unwrap();
//! let clusters = store.clusters_by_name("prod").unwrap();
//! assert!(clusters.len() <= 1);
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod error;
pub mod keys;
pub mod rocks;
pub mod schema;
pub mod types;

pub use error::{Result, StoreError};
pub use rocks::RocksStore;
pub use types::{
    ApprovalRecord, ApprovalStatus, ApproveModule, ApproveOperate, ApproveRole, Cluster,
    DefaultAuthority, Operator, RoleAuthority, ALL_CLUSTER_TYPES,
};

use ihub_core::{ClusterId, ClusterStatus, ModuleId, RoleSelector};
use uuid::Uuid;

/// The storage trait defining all policy store operations.
///
/// This trait abstracts the storage layer, allowing for different implementations
/// (e.g., `RocksDB`, in-memory for testing).
pub trait PolicyStore: Send + Sync {
    // =========================================================================
    // Registry Writes
    // =========================================================================

    /// Insert or update a cluster record.
    ///
    /// This also maintains the name index.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn put_cluster(&self, cluster: &Cluster) -> Result<()>;

    /// Delete a cluster by ID.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::NotFound` if the cluster doesn't exist.
    fn delete_cluster(&self, cluster_id: ClusterId) -> Result<()>;

    /// Insert or update an approval module.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn put_module(&self, module: &ApproveModule) -> Result<()>;

    /// Insert or update a role authority row.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn put_role(&self, role: &ApproveRole) -> Result<()>;

    /// Insert or update an operation row.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn put_operate(&self, operate: &ApproveOperate) -> Result<()>;

    // =========================================================================
    // Cluster Lookups
    // =========================================================================

    /// All clusters registered under `name`.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn clusters_by_name(&self, name: &str) -> Result<Vec<Cluster>>;

    /// All clusters registered under `cluster_id` (zero or one).
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn clusters_by_id(&self, cluster_id: ClusterId) -> Result<Vec<Cluster>>;

    /// Status of the cluster registered under `name`.
    ///
    /// If several clusters share the name, any non-normal status wins.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::NotFound` if no cluster has that name.
    fn cluster_status(&self, name: &str) -> Result<ClusterStatus>;

    // =========================================================================
    // Authority Lookups
    // =========================================================================

    /// Role-specific authority rows for `module_name` in `cluster_id`,
    /// selected by cluster-admin role or by group.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn role_authority(
        &self,
        cluster_id: ClusterId,
        module_name: &str,
        selector: &RoleSelector,
    ) -> Result<Vec<RoleAuthority>>;

    /// Operation rows named `operate_name` within `module_id`.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn operator_index(&self, module_id: ModuleId, operate_name: &str) -> Result<Vec<Operator>>;

    /// Default authority rows for an operation, matching modules whose
    /// cluster type is the cluster's source division or `"All"`.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn default_authority(
        &self,
        cluster_id: ClusterId,
        module_name: &str,
        operate_name: &str,
    ) -> Result<Vec<DefaultAuthority>>;

    // =========================================================================
    // Approval Records
    // =========================================================================

    /// Persist a new approval record.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn insert_approval_record(&self, record: &ApprovalRecord) -> Result<Uuid>;

    /// Get an approval record by ID.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn get_approval_record(&self, record_id: &Uuid) -> Result<Option<ApprovalRecord>>;

    /// List all approval records.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn list_approval_records(&self) -> Result<Vec<ApprovalRecord>>;
}
