//! Static policy tables.
//!
//! `PolicyTables` is the read-only configuration consulted on every request:
//! which modules are outer services, how path segments translate to policy
//! names, and which endpoints are approval-eligible. A request works against
//! one snapshot from start to finish; see [`crate::TablesHandle`].

use std::collections::HashMap;

use ihub_core::ApproverRole;
use serde::{Deserialize, Serialize};

/// Immutable snapshot of the gateway's static tables.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicyTables {
    /// Modules served outside any cluster, with their local port.
    #[serde(default)]
    pub outer_service_ports: HashMap<String, u16>,
    /// Module path segment to policy module name.
    #[serde(default)]
    pub module_names: HashMap<String, String>,
    /// Endpoint path to policy operation name.
    #[serde(default)]
    pub operator_names: HashMap<String, String>,
    /// App-store endpoint spellings and their canonical form.
    #[serde(default)]
    pub appstore_endpoints: HashMap<String, String>,
    /// Module to endpoints evaluated for the cluster-admin role.
    #[serde(default)]
    pub admin_endpoints: HashMap<String, Vec<String>>,
    /// Module to endpoints evaluated for the group-admin role.
    #[serde(default)]
    pub group_endpoints: HashMap<String, Vec<String>>,
}

impl PolicyTables {
    /// Local port of an outer service, if `module` is one.
    #[must_use]
    pub fn outer_port(&self, module: &str) -> Option<u16> {
        self.outer_service_ports.get(module).copied()
    }

    /// Returns `true` if `module` is served outside any cluster.
    #[must_use]
    pub fn is_outer_service(&self, module: &str) -> bool {
        self.outer_service_ports.contains_key(module)
    }

    /// Rewrite an app-store endpoint to its canonical spelling.
    ///
    /// Endpoints without an entry are returned unchanged.
    #[must_use]
    pub fn transform_endpoint<'a>(&'a self, endpoint: &'a str) -> &'a str {
        self.appstore_endpoints
            .get(endpoint)
            .map_or(endpoint, String::as_str)
    }

    /// Role under which `endpoint` of `module` is approval-eligible.
    ///
    /// The admin list is consulted first. `None` means the endpoint is not
    /// approvable at all and no policy lookup is needed.
    #[must_use]
    pub fn approver_for(&self, module: &str, endpoint: &str) -> Option<ApproverRole> {
        let listed = |table: &HashMap<String, Vec<String>>| {
            table
                .get(module)
                .is_some_and(|endpoints| endpoints.iter().any(|e| e == endpoint))
        };

        if listed(&self.admin_endpoints) {
            Some(ApproverRole::ClusterAdmin)
        } else if listed(&self.group_endpoints) {
            Some(ApproverRole::GroupAdmin)
        } else {
            None
        }
    }

    /// Policy module name for a module path segment.
    ///
    /// Untranslated segments are used as-is.
    #[must_use]
    pub fn module_name<'a>(&'a self, module: &'a str) -> &'a str {
        self.module_names.get(module).map_or(module, String::as_str)
    }

    /// Policy operation name for an endpoint.
    ///
    /// Untranslated endpoints are used as-is.
    #[must_use]
    pub fn operate_name<'a>(&'a self, endpoint: &'a str) -> &'a str {
        self.operator_names
            .get(endpoint)
            .map_or(endpoint, String::as_str)
    }
}
