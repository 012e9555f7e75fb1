//! Policy store seeding.
//!
//! The registry is normally written by cluster registration and policy
//! management workflows. For the embedded store a YAML seed file can be
//! applied at startup:
//!
//! ```yaml
//! clusters:
//!   - { cluster_id: 7, name: prod, domain: prod.local, cluster_type: k8s }
//! modules:
//!   - { module_id: 1, module_name: billing, module_cluster_type: All, module_approve: true }
//! roles:
//!   - { role_id: 1, module_id: 1, cluster_id: 7, user_role: cluster_admin, authority: "01" }
//! operates:
//!   - { operate_id: 1, operate_name: charge, module_id: 1, operator_index: 1,
//!       operate_authority: false, module_cluster_type: All }
//! ```
//!
//! Rows are upserted, so applying the same file twice is harmless.

use std::path::Path;

use ihub_store::{ApproveModule, ApproveOperate, ApproveRole, Cluster, PolicyStore};
use serde::Deserialize;

use crate::config::ConfigError;

/// Registry rows to write at startup.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SeedFile {
    /// Cluster registrations.
    #[serde(default)]
    pub clusters: Vec<Cluster>,
    /// Approval modules.
    #[serde(default)]
    pub modules: Vec<ApproveModule>,
    /// Role authority overrides.
    #[serde(default)]
    pub roles: Vec<ApproveRole>,
    /// Operations and their defaults.
    #[serde(default)]
    pub operates: Vec<ApproveOperate>,
}

impl SeedFile {
    /// Load a seed file.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Read` or `ConfigError::Parse`.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let yaml = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(serde_yaml::from_str(&yaml)?)
    }

    /// Write every row to `store`.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Store` on the first failed write.
    pub fn apply<S: PolicyStore + ?Sized>(&self, store: &S) -> Result<(), ConfigError> {
        for cluster in &self.clusters {
            store.put_cluster(cluster)?;
        }
        for module in &self.modules {
            store.put_module(module)?;
        }
        for role in &self.roles {
            store.put_role(role)?;
        }
        for operate in &self.operates {
            store.put_operate(operate)?;
        }

        tracing::info!(
            clusters = self.clusters.len(),
            modules = self.modules.len(),
            roles = self.roles.len(),
            operates = self.operates.len(),
            "Policy store seeded"
        );
        Ok(())
    }
}
