//! Routing and policy enums shared across the pipeline.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::CoreError;
use crate::ids::GroupId;

/// Whether a request's traffic is bound for a module inside a managed
/// cluster (`In`) or for a service hosted outside any cluster (`Out`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Destination {
    /// Traffic addressed to a module inside a cluster.
    In,
    /// Traffic addressed to an outer service.
    Out,
}

/// Where this gateway instance is deployed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Runmode {
    /// Deployed inside a cluster, in front of the cluster's modules.
    In,
    /// Deployed at the cluster-external edge.
    Out,
}

impl Runmode {
    /// Returns `true` if traffic with `destination` is local to this gateway,
    /// i.e. this instance is the one that decides on approvals for it.
    #[must_use]
    pub const fn is_local(self, destination: Destination) -> bool {
        matches!(
            (self, destination),
            (Self::In, Destination::In) | (Self::Out, Destination::Out)
        )
    }

    /// Lowercase name as used in configuration.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::In => "in",
            Self::Out => "out",
        }
    }
}

impl FromStr for Runmode {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "in" => Ok(Self::In),
            "out" => Ok(Self::Out),
            _ => Err(CoreError::UnknownVariant {
                kind: "runmode",
                value: s.to_string(),
            }),
        }
    }
}

impl fmt::Display for Destination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::In => "in",
            Self::Out => "out",
        })
    }
}

impl fmt::Display for Runmode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Role discriminator stored on role records and approval records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApproverRole {
    /// Administrator of a whole cluster.
    ClusterAdmin,
    /// Administrator of a user group within a cluster.
    GroupAdmin,
}

/// How role-specific authority rows are selected: by the cluster-admin role,
/// or by the caller's group for group-admin operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RoleSelector {
    /// Rows whose `user_role` is `ClusterAdmin`.
    ClusterAdmin,
    /// Rows granted to the given group.
    Group(GroupId),
}

impl RoleSelector {
    /// The role an approval decided through this selector is recorded under.
    #[must_use]
    pub const fn approver_role(self) -> ApproverRole {
        match self {
            Self::ClusterAdmin => ApproverRole::ClusterAdmin,
            Self::Group(_) => ApproverRole::GroupAdmin,
        }
    }
}

/// Lifecycle status of a registered cluster.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClusterStatus {
    /// Serving traffic.
    #[default]
    Normal,
    /// A reset is in progress.
    Resetting,
    /// A reset finished but the cluster has not been returned to service.
    ResetSucceeded,
    /// The last reset failed.
    ResetFailed,
}

impl ClusterStatus {
    /// Returns `true` if live traffic may be routed to the cluster.
    #[must_use]
    pub const fn accepts_traffic(self) -> bool {
        matches!(self, Self::Normal)
    }
}
