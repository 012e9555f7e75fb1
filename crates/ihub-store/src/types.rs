//! Domain types stored in the database.
//!
//! These types represent the cluster registry, the approval policy tables and
//! the approval records written when a request is diverted for approval.

use chrono::{DateTime, Utc};
use ihub_core::{ApproverRole, AuthorityBits, ClusterId, ClusterStatus, GroupId, ModuleId};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Wildcard module cluster type that matches every cluster.
pub const ALL_CLUSTER_TYPES: &str = "All";

/// A registered cluster.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cluster {
    /// Unique identifier.
    pub cluster_id: ClusterId,
    /// Unique human key, sent by callers in `X-Cluster-Name`.
    pub name: String,
    /// DNS suffix used to address the cluster's modules.
    pub domain: String,
    /// Free-form cluster type.
    #[serde(default)]
    pub cluster_type: String,
    /// Classification matched against a module's cluster type when looking
    /// up default authorities.
    #[serde(default)]
    pub source_division: Option<String>,
    /// Lifecycle status.
    #[serde(default)]
    pub status: ClusterStatus,
}

/// An approval module: the policy engine's view of a backend module.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApproveModule {
    /// Unique identifier.
    pub module_id: ModuleId,
    /// Logical module key, distinct from the DNS-addressable segment.
    pub module_name: String,
    /// Cluster source division this module applies to, or `"All"`.
    pub module_cluster_type: String,
    /// Module-level approval toggle.
    #[serde(default)]
    pub module_approve: bool,
}

impl ApproveModule {
    /// Whether this module's policies apply to a cluster with the given
    /// source division.
    #[must_use]
    pub fn applies_to(&self, source_division: Option<&str>) -> bool {
        self.module_cluster_type == ALL_CLUSTER_TYPES
            || source_division.is_some_and(|d| d == self.module_cluster_type)
    }
}

/// A role- or group-specific authority override for one module in one cluster.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApproveRole {
    /// Unique row identifier.
    pub role_id: i64,
    /// User the grant was made for, if any.
    #[serde(default)]
    pub user_id: Option<i64>,
    /// Group the grant applies to (group-admin overrides).
    #[serde(default)]
    pub group_id: Option<GroupId>,
    /// Module the grant applies to.
    pub module_id: ModuleId,
    /// Cluster the grant applies to.
    pub cluster_id: ClusterId,
    /// Role discriminator.
    pub user_role: ApproverRole,
    /// One approval flag per operation of the module.
    pub authority: AuthorityBits,
}

/// An operation of a module together with its default authority.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApproveOperate {
    /// Unique row identifier.
    pub operate_id: i64,
    /// Logical operation name.
    pub operate_name: String,
    /// Interface the operation is exposed on.
    #[serde(default)]
    pub operate_interface: String,
    /// Module the operation belongs to.
    pub module_id: ModuleId,
    /// Position of this operation's flag in role authority strings.
    pub operator_index: usize,
    /// Whether the operation requires approval when no override exists.
    pub operate_authority: bool,
    /// Cluster type the module row was defined for.
    #[serde(default)]
    pub module_cluster_type: String,
}

/// A row of the role-authority lookup (`ApproveRole` joined to `ApproveModule`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoleAuthority {
    /// Module the authority applies to.
    pub module_id: ModuleId,
    /// Approval flags.
    pub authority: AuthorityBits,
}

/// A row of the operator-index lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Operator {
    /// Operation row identifier.
    pub operate_id: i64,
    /// Flag position in the authority string.
    pub operator_index: usize,
}

/// A row of the default-authority lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DefaultAuthority {
    /// Operation row identifier.
    pub operate_id: i64,
    /// Whether approval is required by default.
    pub operate_authority: bool,
}

/// Workflow status of an approval record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ApprovalStatus {
    /// Waiting for a human decision.
    Approving,
    /// Approved downstream.
    Approved,
    /// Rejected downstream.
    Rejected,
}

impl ApprovalStatus {
    /// The status name as persisted.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Approving => "APPROVING",
            Self::Approved => "APPROVED",
            Self::Rejected => "REJECTED",
        }
    }
}

/// An approval workflow entry, written once per diverted request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApprovalRecord {
    /// Unique identifier.
    pub record_id: Uuid,
    /// Resource description returned by the validation service (JSON).
    pub resource_info: String,
    /// Full validation service response (JSON).
    pub resource_detail: String,
    /// Caller identity forwarded with the eventual replay (JSON).
    pub headers: String,
    /// Raw body of the intercepted request.
    pub request_body: String,
    /// Requesting user.
    pub user_id: i64,
    /// Requesting user's role as reported by the validation service.
    pub user_role: i64,
    /// Requesting user's group.
    pub group_id: i64,
    /// Approval type reported by the validation service.
    pub approve_type: String,
    /// Policy module name.
    pub module_name: String,
    /// Policy operation name.
    pub operate_name: String,
    /// Backend URL the request was aimed at.
    pub url: String,
    /// HTTP method of the intercepted request.
    pub method: String,
    /// Cluster the request targeted.
    pub cluster_id: ClusterId,
    /// Role whose policy required the approval.
    pub approve_role: ApproverRole,
    /// Workflow status.
    pub status: ApprovalStatus,
    /// Creation timestamp.
    pub create_time: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn module(cluster_type: &str) -> ApproveModule {
        ApproveModule {
            module_id: ModuleId::new(1),
            module_name: "billing".to_string(),
            module_cluster_type: cluster_type.to_string(),
            module_approve: true,
        }
    }

    #[test]
    fn module_cluster_type_matching() {
        assert!(module("All").applies_to(None));
        assert!(module("All").applies_to(Some("edge")));
        assert!(module("edge").applies_to(Some("edge")));
        assert!(!module("edge").applies_to(Some("core")));
        assert!(!module("edge").applies_to(None));
    }

    #[test]
    fn approval_status_names() {
        assert_eq!(ApprovalStatus::Approving.as_str(), "APPROVING");
        assert_eq!(ApprovalStatus::Approved.as_str(), "APPROVED");
        assert_eq!(ApprovalStatus::Rejected.as_str(), "REJECTED");
    }
}
