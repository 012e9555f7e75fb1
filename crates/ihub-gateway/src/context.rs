//! Per-request pipeline context.
//!
//! A `RequestContext` is created when a request enters the pipeline and is
//! threaded by reference through each stage. Nothing in it outlives the
//! request.

use ihub_core::{ApproverRole, ClusterId, Destination, Runmode, TraceId};
use ihub_store::Cluster;

/// The cluster a request was routed to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClusterTarget {
    /// Cluster id.
    pub id: ClusterId,
    /// Cluster name.
    pub name: String,
    /// DNS suffix of the cluster's modules.
    pub domain: String,
}

impl From<Cluster> for ClusterTarget {
    fn from(cluster: Cluster) -> Self {
        Self {
            id: cluster.cluster_id,
            name: cluster.name,
            domain: cluster.domain,
        }
    }
}

/// Outcome of the routing classifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classification {
    /// Where the traffic is bound.
    pub destination: Destination,
    /// The resolved cluster, for inbound traffic.
    pub cluster: Option<ClusterTarget>,
}

impl Classification {
    /// Traffic for an outer service.
    #[must_use]
    pub const fn outer() -> Self {
        Self {
            destination: Destination::Out,
            cluster: None,
        }
    }

    /// Traffic for a module of `cluster`.
    #[must_use]
    pub const fn inbound(cluster: ClusterTarget) -> Self {
        Self {
            destination: Destination::In,
            cluster: Some(cluster),
        }
    }
}

/// State carried across the pipeline stages of one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestContext {
    /// Trace id, echoed to the backend in `X-Trace-ID`.
    pub trace_id: TraceId,
    /// Deployment locus of this gateway.
    pub runmode: Runmode,
    /// Where the traffic is bound.
    pub destination: Destination,
    /// Resolved cluster, for inbound traffic.
    pub cluster: Option<ClusterTarget>,
    /// Module path segment.
    pub module: String,
    /// Endpoint, after the app-store transform.
    pub endpoint: String,
    /// Whether the request is diverted for approval.
    pub need_approve: bool,
    /// Role the approval decision was made for.
    pub approve_role: Option<ApproverRole>,
}

impl RequestContext {
    /// Start a context from the classifier's outcome.
    #[must_use]
    pub fn new(
        trace_id: TraceId,
        runmode: Runmode,
        classification: Classification,
        module: impl Into<String>,
        endpoint: impl Into<String>,
    ) -> Self {
        Self {
            trace_id,
            runmode,
            destination: classification.destination,
            cluster: classification.cluster,
            module: module.into(),
            endpoint: endpoint.into(),
            need_approve: false,
            approve_role: None,
        }
    }

    /// Id of the resolved cluster, if any.
    #[must_use]
    pub fn cluster_id(&self) -> Option<ClusterId> {
        self.cluster.as_ref().map(|c| c.id)
    }

    /// Domain of the resolved cluster, if any.
    #[must_use]
    pub fn cluster_domain(&self) -> Option<&str> {
        self.cluster.as_ref().map(|c| c.domain.as_str())
    }
}
