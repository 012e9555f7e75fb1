//! Authority resolution.
//!
//! This module provides the `AuthorityResolver` trait and the store-backed
//! `PolicyResolver` that decides whether an operation needs approval.
//!
//! Resolution is two-tiered. A role-specific authority row for the
//! (cluster, module, role-or-group) triple overrides everything: its
//! authority string is indexed at the operation's position. Without such a
//! row the operation's default authority applies. Every lookup must match
//! exactly one row; anything else is a policy data fault.

use std::sync::Arc;

use async_trait::async_trait;
use ihub_core::{ClusterId, RoleSelector};
use ihub_store::PolicyStore;

use crate::error::{PolicyError, Result};
use crate::tables::PolicyTables;

/// The inputs of one approval decision.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApprovalQuery {
    /// Cluster the request targets.
    pub cluster_id: ClusterId,
    /// Module path segment.
    pub module: String,
    /// Endpoint, after the app-store transform.
    pub endpoint: String,
    /// Role or group whose policy applies.
    pub selector: RoleSelector,
}

/// Trait deciding whether an operation requires approval.
#[async_trait]
pub trait AuthorityResolver: Send + Sync {
    /// Decide whether the operation described by `query` needs approval.
    ///
    /// # Errors
    ///
    /// Returns `PolicyError::AmbiguousPolicy` or `PolicyError::AmbiguousOperator`
    /// when the registry does not hold exactly one matching row, and
    /// `PolicyError::Store` if the registry cannot be read.
    async fn needs_approval(&self, tables: &PolicyTables, query: &ApprovalQuery) -> Result<bool>;
}

/// `AuthorityResolver` backed by a `PolicyStore`.
pub struct PolicyResolver<S: PolicyStore> {
    store: Arc<S>,
}

impl<S: PolicyStore> PolicyResolver<S> {
    /// Create a new resolver over `store`.
    #[must_use]
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// Get a reference to the store.
    #[must_use]
    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    /// Fallback tier: the operation's default authority.
    fn default_authority(
        &self,
        cluster_id: ClusterId,
        module_name: &str,
        operate_name: &str,
    ) -> Result<bool> {
        let rows = self
            .store
            .default_authority(cluster_id, module_name, operate_name)?;

        match rows.as_slice() {
            [row] => Ok(row.operate_authority),
            _ => Err(PolicyError::AmbiguousPolicy {
                lookup: "default",
                module: module_name.to_string(),
                operate: operate_name.to_string(),
                rows: rows.len(),
            }),
        }
    }
}

impl<S: PolicyStore> Clone for PolicyResolver<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
        }
    }
}

#[async_trait]
impl<S: PolicyStore + 'static> AuthorityResolver for PolicyResolver<S> {
    async fn needs_approval(&self, tables: &PolicyTables, query: &ApprovalQuery) -> Result<bool> {
        if query.cluster_id.is_default() {
            tracing::debug!(module = %query.module, "Default cluster never requires approval");
            return Ok(false);
        }

        let module_name = tables.module_name(&query.module);
        let operate_name = tables.operate_name(&query.endpoint);

        let roles = self
            .store
            .role_authority(query.cluster_id, module_name, &query.selector)?;

        let decision = match roles.as_slice() {
            [] => self.default_authority(query.cluster_id, module_name, operate_name)?,
            [role] => {
                let operators = self.store.operator_index(role.module_id, operate_name)?;
                let [operator] = operators.as_slice() else {
                    return Err(PolicyError::AmbiguousOperator {
                        module_id: role.module_id,
                        operate: operate_name.to_string(),
                        rows: operators.len(),
                    });
                };

                role.authority
                    .requires_approval(operator.operator_index)
                    .map_err(|source| PolicyError::OperatorOutOfRange {
                        operate: operate_name.to_string(),
                        source,
                    })?
            }
            _ => {
                return Err(PolicyError::AmbiguousPolicy {
                    lookup: "role",
                    module: module_name.to_string(),
                    operate: operate_name.to_string(),
                    rows: roles.len(),
                })
            }
        };

        tracing::debug!(
            cluster_id = %query.cluster_id,
            module = %module_name,
            operate = %operate_name,
            role_override = !roles.is_empty(),
            needs_approval = decision,
            "Resolved authority"
        );

        Ok(decision)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ihub_core::{ApproverRole, AuthorityBits, ClusterStatus, GroupId, ModuleId};
    use ihub_store::{ApproveModule, ApproveOperate, ApproveRole, Cluster, RocksStore};
    use tempfile::TempDir;

    const CLUSTER: ClusterId = ClusterId::new(7);
    const BILLING: ModuleId = ModuleId::new(10);

    fn setup() -> (PolicyResolver<RocksStore>, TempDir) {
        let dir = TempDir::new().unwrap();
        let store = Arc::new(RocksStore::open(dir.path()).unwrap());

        store
            .put_cluster(&Cluster {
                cluster_id: CLUSTER,
                name: "prod".to_string(),
                domain: "prod.local".to_string(),
                cluster_type: "k8s".to_string(),
                source_division: Some("edge".to_string()),
                status: ClusterStatus::Normal,
            })
            .unwrap();
        store
            .put_module(&ApproveModule {
                module_id: BILLING,
                module_name: "billing".to_string(),
                module_cluster_type: "All".to_string(),
                module_approve: true,
            })
            .unwrap();
        for (id, name, index, authority) in [
            (1, "refund", 0, false),
            (2, "invoice", 1, false),
            (3, "charge", 2, false),
            (4, "close", 3, true),
        ] {
            store
                .put_operate(&ApproveOperate {
                    operate_id: id,
                    operate_name: name.to_string(),
                    operate_interface: String::new(),
                    module_id: BILLING,
                    operator_index: index,
                    operate_authority: authority,
                    module_cluster_type: "All".to_string(),
                })
                .unwrap();
        }

        (PolicyResolver::new(store), dir)
    }

    fn put_admin_role(resolver: &PolicyResolver<RocksStore>, role_id: i64, authority: &str) {
        resolver
            .store()
            .put_role(&ApproveRole {
                role_id,
                user_id: None,
                group_id: None,
                module_id: BILLING,
                cluster_id: CLUSTER,
                user_role: ApproverRole::ClusterAdmin,
                authority: AuthorityBits::new(authority),
            })
            .unwrap();
    }

    fn query(endpoint: &str, selector: RoleSelector) -> ApprovalQuery {
        ApprovalQuery {
            cluster_id: CLUSTER,
            module: "billing".to_string(),
            endpoint: endpoint.to_string(),
            selector,
        }
    }

    async fn decide(resolver: &PolicyResolver<RocksStore>, endpoint: &str) -> Result<bool> {
        resolver
            .needs_approval(
                &PolicyTables::default(),
                &query(endpoint, RoleSelector::ClusterAdmin),
            )
            .await
    }

    #[tokio::test]
    async fn role_override_indexes_authority_bits() {
        let (resolver, _dir) = setup();
        put_admin_role(&resolver, 1, "0010");

        assert!(!decide(&resolver, "refund").await.unwrap());
        assert!(!decide(&resolver, "invoice").await.unwrap());
        assert!(decide(&resolver, "charge").await.unwrap());
        // The default for "close" says yes, but the override wins
        assert!(!decide(&resolver, "close").await.unwrap());
    }

    #[tokio::test]
    async fn no_role_row_falls_back_to_default() {
        let (resolver, _dir) = setup();

        assert!(!decide(&resolver, "charge").await.unwrap());
        assert!(decide(&resolver, "close").await.unwrap());
    }

    #[tokio::test]
    async fn duplicate_role_rows_are_ambiguous() {
        let (resolver, _dir) = setup();
        put_admin_role(&resolver, 1, "0010");
        put_admin_role(&resolver, 2, "0010");

        let err = decide(&resolver, "charge").await.unwrap_err();
        assert!(matches!(
            err,
            PolicyError::AmbiguousPolicy {
                lookup: "role",
                rows: 2,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn missing_default_is_ambiguous() {
        let (resolver, _dir) = setup();

        let err = decide(&resolver, "transfer").await.unwrap_err();
        assert!(matches!(
            err,
            PolicyError::AmbiguousPolicy {
                lookup: "default",
                rows: 0,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn missing_or_duplicate_operator_is_ambiguous() {
        let (resolver, _dir) = setup();
        put_admin_role(&resolver, 1, "0010");

        let err = decide(&resolver, "transfer").await.unwrap_err();
        assert!(matches!(
            err,
            PolicyError::AmbiguousOperator { rows: 0, .. }
        ));

        resolver
            .store()
            .put_operate(&ApproveOperate {
                operate_id: 9,
                operate_name: "charge".to_string(),
                operate_interface: String::new(),
                module_id: BILLING,
                operator_index: 0,
                operate_authority: false,
                module_cluster_type: "All".to_string(),
            })
            .unwrap();
        let err = decide(&resolver, "charge").await.unwrap_err();
        assert!(matches!(
            err,
            PolicyError::AmbiguousOperator { rows: 2, .. }
        ));
    }

    #[tokio::test]
    async fn short_authority_string_is_a_fault() {
        let (resolver, _dir) = setup();
        put_admin_role(&resolver, 1, "01");

        let err = decide(&resolver, "close").await.unwrap_err();
        assert!(matches!(err, PolicyError::OperatorOutOfRange { .. }));
    }

    #[tokio::test]
    async fn group_selector_uses_group_rows() {
        let (resolver, _dir) = setup();
        put_admin_role(&resolver, 1, "0000");
        resolver
            .store()
            .put_role(&ApproveRole {
                role_id: 2,
                user_id: None,
                group_id: Some(GroupId::new(5)),
                module_id: BILLING,
                cluster_id: CLUSTER,
                user_role: ApproverRole::GroupAdmin,
                authority: AuthorityBits::new("0100"),
            })
            .unwrap();

        let tables = PolicyTables::default();
        let group = query("invoice", RoleSelector::Group(GroupId::new(5)));
        assert!(resolver.needs_approval(&tables, &group).await.unwrap());

        // Another group has no override and gets the default
        let other = query("invoice", RoleSelector::Group(GroupId::new(6)));
        assert!(!resolver.needs_approval(&tables, &other).await.unwrap());
    }

    #[tokio::test]
    async fn names_are_translated_before_lookup() {
        let (resolver, _dir) = setup();
        put_admin_role(&resolver, 1, "0010");

        let mut tables = PolicyTables::default();
        tables
            .module_names
            .insert("billing-svc".to_string(), "billing".to_string());
        tables
            .operator_names
            .insert("pay".to_string(), "charge".to_string());

        let q = ApprovalQuery {
            cluster_id: CLUSTER,
            module: "billing-svc".to_string(),
            endpoint: "pay".to_string(),
            selector: RoleSelector::ClusterAdmin,
        };
        assert!(resolver.needs_approval(&tables, &q).await.unwrap());
    }

    #[tokio::test]
    async fn default_cluster_skips_lookups() {
        let (resolver, _dir) = setup();
        put_admin_role(&resolver, 1, "1111");

        let mut q = query("charge", RoleSelector::ClusterAdmin);
        q.cluster_id = ClusterId::DEFAULT;
        assert!(!resolver
            .needs_approval(&PolicyTables::default(), &q)
            .await
            .unwrap());
    }
}
