//! `RocksDB` storage implementation.
//!
//! This module provides the `RocksStore` implementation of the `PolicyStore` trait.
//! The policy tables are small and read-mostly, so joins are evaluated by
//! scanning the module, role and operate column families.

use std::path::Path;
use std::sync::Arc;

use ihub_core::{ApproverRole, ClusterId, ClusterStatus, ModuleId, RoleSelector};
use rocksdb::{
    BoundColumnFamily, ColumnFamilyDescriptor, DBWithThreadMode, IteratorMode, MultiThreaded,
    Options, WriteBatch,
};
use uuid::Uuid;

use crate::error::{Result, StoreError};
use crate::keys;
use crate::schema::{all_column_families, cf};
use crate::types::{
    ApprovalRecord, ApproveModule, ApproveOperate, ApproveRole, Cluster, DefaultAuthority,
    Operator, RoleAuthority,
};
use crate::PolicyStore;

/// RocksDB-backed storage implementation.
pub struct RocksStore {
    db: Arc<DBWithThreadMode<MultiThreaded>>,
}

impl RocksStore {
    /// Open or create a `RocksDB` database at the given path.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened or created.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.create_missing_column_families(true);

        let cf_descriptors: Vec<_> = all_column_families()
            .into_iter()
            .map(|name| ColumnFamilyDescriptor::new(name, Options::default()))
            .collect();

        let db = DBWithThreadMode::open_cf_descriptors(&opts, path, cf_descriptors)
            .map_err(|e| StoreError::Database(e.to_string()))?;

        Ok(Self { db: Arc::new(db) })
    }

    /// Get a column family handle.
    fn cf(&self, name: &str) -> Result<Arc<BoundColumnFamily<'_>>> {
        self.db
            .cf_handle(name)
            .ok_or_else(|| StoreError::Database(format!("column family not found: {name}")))
    }

    /// Serialize a value using CBOR.
    fn serialize<T: serde::Serialize>(value: &T) -> Result<Vec<u8>> {
        let mut buf = Vec::new();
        ciborium::into_writer(value, &mut buf)
            .map_err(|e| StoreError::Serialization(e.to_string()))?;
        Ok(buf)
    }

    /// Deserialize a value from CBOR.
    fn deserialize<T: serde::de::DeserializeOwned>(data: &[u8]) -> Result<T> {
        ciborium::from_reader(data).map_err(|e| StoreError::Serialization(e.to_string()))
    }

    /// Write a single value into a column family.
    fn put_value<T: serde::Serialize>(&self, cf_name: &str, key: &[u8], value: &T) -> Result<()> {
        let cf = self.cf(cf_name)?;
        let value = Self::serialize(value)?;

        self.db
            .put_cf(&cf, key, value)
            .map_err(|e| StoreError::Database(e.to_string()))
    }

    /// Read a single value from a column family.
    fn get_value<T: serde::de::DeserializeOwned>(
        &self,
        cf_name: &str,
        key: &[u8],
    ) -> Result<Option<T>> {
        let cf = self.cf(cf_name)?;

        self.db
            .get_cf(&cf, key)
            .map_err(|e| StoreError::Database(e.to_string()))?
            .map(|data| Self::deserialize(&data))
            .transpose()
    }

    /// Read every value of a column family.
    fn scan<T: serde::de::DeserializeOwned>(&self, cf_name: &str) -> Result<Vec<T>> {
        let cf = self.cf(cf_name)?;

        let mut values = Vec::new();
        let iter = self.db.iterator_cf(&cf, IteratorMode::Start);

        for item in iter {
            let (_, value) = item.map_err(|e| StoreError::Database(e.to_string()))?;
            values.push(Self::deserialize(&value)?);
        }

        Ok(values)
    }

    fn get_cluster(&self, cluster_id: ClusterId) -> Result<Option<Cluster>> {
        self.get_value(cf::CLUSTERS, &keys::cluster_key(cluster_id))
    }

    /// Modules named `module_name`.
    fn modules_named(&self, module_name: &str) -> Result<Vec<ApproveModule>> {
        Ok(self
            .scan::<ApproveModule>(cf::MODULES)?
            .into_iter()
            .filter(|m| m.module_name == module_name)
            .collect())
    }
}

impl PolicyStore for RocksStore {
    // =========================================================================
    // Registry Writes
    // =========================================================================

    fn put_cluster(&self, cluster: &Cluster) -> Result<()> {
        let cf_clusters = self.cf(cf::CLUSTERS)?;
        let cf_by_name = self.cf(cf::CLUSTERS_BY_NAME)?;

        let cluster_key = keys::cluster_key(cluster.cluster_id);
        let name_key = keys::name_cluster_key(&cluster.name, cluster.cluster_id);
        let value = Self::serialize(cluster)?;

        // A rename must drop the old index entry
        let old_name = self.get_cluster(cluster.cluster_id)?.map(|c| c.name);

        let mut batch = WriteBatch::default();
        batch.put_cf(&cf_clusters, &cluster_key, &value);

        if let Some(old) = old_name {
            if old != cluster.name {
                batch.delete_cf(&cf_by_name, keys::name_cluster_key(&old, cluster.cluster_id));
            }
        }
        batch.put_cf(&cf_by_name, &name_key, []);

        self.db
            .write(batch)
            .map_err(|e| StoreError::Database(e.to_string()))?;

        tracing::debug!(cluster_id = %cluster.cluster_id, name = %cluster.name, "Cluster stored");
        Ok(())
    }

    fn delete_cluster(&self, cluster_id: ClusterId) -> Result<()> {
        let cf_clusters = self.cf(cf::CLUSTERS)?;
        let cf_by_name = self.cf(cf::CLUSTERS_BY_NAME)?;

        let cluster = self.get_cluster(cluster_id)?.ok_or(StoreError::NotFound)?;

        let mut batch = WriteBatch::default();
        batch.delete_cf(&cf_clusters, keys::cluster_key(cluster_id));
        batch.delete_cf(&cf_by_name, keys::name_cluster_key(&cluster.name, cluster_id));

        self.db
            .write(batch)
            .map_err(|e| StoreError::Database(e.to_string()))?;

        Ok(())
    }

    fn put_module(&self, module: &ApproveModule) -> Result<()> {
        self.put_value(cf::MODULES, &keys::module_key(module.module_id), module)
    }

    fn put_role(&self, role: &ApproveRole) -> Result<()> {
        self.put_value(cf::ROLES, &keys::row_key(role.role_id), role)
    }

    fn put_operate(&self, operate: &ApproveOperate) -> Result<()> {
        self.put_value(cf::OPERATES, &keys::row_key(operate.operate_id), operate)
    }

    // =========================================================================
    // Cluster Lookups
    // =========================================================================

    fn clusters_by_name(&self, name: &str) -> Result<Vec<Cluster>> {
        let cf_by_name = self.cf(cf::CLUSTERS_BY_NAME)?;
        let prefix = keys::name_prefix(name);

        let mut clusters = Vec::new();
        let iter = self.db.iterator_cf(
            &cf_by_name,
            IteratorMode::From(&prefix, rocksdb::Direction::Forward),
        );

        for item in iter {
            let (key, _) = item.map_err(|e| StoreError::Database(e.to_string()))?;

            // Stop if we're past the prefix
            if !key.starts_with(&prefix) {
                break;
            }

            let Some(cluster_id) = keys::extract_cluster_id_from_name_key(&key) else {
                continue;
            };
            if let Some(cluster) = self.get_cluster(cluster_id)? {
                clusters.push(cluster);
            }
        }

        Ok(clusters)
    }

    fn clusters_by_id(&self, cluster_id: ClusterId) -> Result<Vec<Cluster>> {
        Ok(self.get_cluster(cluster_id)?.into_iter().collect())
    }

    fn cluster_status(&self, name: &str) -> Result<ClusterStatus> {
        let clusters = self.clusters_by_name(name)?;
        if clusters.is_empty() {
            return Err(StoreError::NotFound);
        }

        Ok(clusters
            .iter()
            .map(|c| c.status)
            .find(|s| !s.accepts_traffic())
            .unwrap_or_default())
    }

    // =========================================================================
    // Authority Lookups
    // =========================================================================

    fn role_authority(
        &self,
        cluster_id: ClusterId,
        module_name: &str,
        selector: &RoleSelector,
    ) -> Result<Vec<RoleAuthority>> {
        let modules = self.modules_named(module_name)?;
        if modules.is_empty() {
            return Ok(Vec::new());
        }

        let rows = self
            .scan::<ApproveRole>(cf::ROLES)?
            .into_iter()
            .filter(|role| role.cluster_id == cluster_id)
            .filter(|role| match selector {
                RoleSelector::ClusterAdmin => role.user_role == ApproverRole::ClusterAdmin,
                RoleSelector::Group(group_id) => role.group_id == Some(*group_id),
            })
            .flat_map(|role| {
                modules
                    .iter()
                    .filter(move |m| m.module_id == role.module_id)
                    .map(move |m| RoleAuthority {
                        module_id: m.module_id,
                        authority: role.authority.clone(),
                    })
            })
            .collect();

        Ok(rows)
    }

    fn operator_index(&self, module_id: ModuleId, operate_name: &str) -> Result<Vec<Operator>> {
        Ok(self
            .scan::<ApproveOperate>(cf::OPERATES)?
            .into_iter()
            .filter(|op| op.module_id == module_id && op.operate_name == operate_name)
            .map(|op| Operator {
                operate_id: op.operate_id,
                operator_index: op.operator_index,
            })
            .collect())
    }

    fn default_authority(
        &self,
        cluster_id: ClusterId,
        module_name: &str,
        operate_name: &str,
    ) -> Result<Vec<DefaultAuthority>> {
        let Some(cluster) = self.get_cluster(cluster_id)? else {
            return Ok(Vec::new());
        };

        let module_ids: Vec<ModuleId> = self
            .modules_named(module_name)?
            .into_iter()
            .filter(|m| m.applies_to(cluster.source_division.as_deref()))
            .map(|m| m.module_id)
            .collect();
        if module_ids.is_empty() {
            return Ok(Vec::new());
        }

        Ok(self
            .scan::<ApproveOperate>(cf::OPERATES)?
            .into_iter()
            .filter(|op| op.operate_name == operate_name && module_ids.contains(&op.module_id))
            .map(|op| DefaultAuthority {
                operate_id: op.operate_id,
                operate_authority: op.operate_authority,
            })
            .collect())
    }

    // =========================================================================
    // Approval Records
    // =========================================================================

    fn insert_approval_record(&self, record: &ApprovalRecord) -> Result<Uuid> {
        self.put_value(
            cf::APPROVAL_RECORDS,
            &keys::record_key(&record.record_id),
            record,
        )?;

        tracing::debug!(record_id = %record.record_id, "Approval record stored");
        Ok(record.record_id)
    }

    fn get_approval_record(&self, record_id: &Uuid) -> Result<Option<ApprovalRecord>> {
        self.get_value(cf::APPROVAL_RECORDS, &keys::record_key(record_id))
    }

    fn list_approval_records(&self) -> Result<Vec<ApprovalRecord>> {
        self.scan(cf::APPROVAL_RECORDS)
    }
}
