//! Routing classifier.
//!
//! Decides whether a request is bound for an outer service or for a module
//! inside a registered cluster, and resolves that cluster. Rules are tried
//! in order and the first match wins:
//!
//! 1. the module is an outer service
//! 2. a cluster name is given (`X-Cluster-Name`, else the `clustername` query parameter)
//! 3. a cluster id is given (`X-Cluster-ID`)
//!
//! A resolved cluster must be unique and in service.

use axum::http::HeaderMap;
use ihub_core::{ClusterId, ClusterStatus};
use ihub_policy::PolicyTables;
use ihub_store::{Cluster, PolicyStore, StoreError};

use crate::context::Classification;
use crate::error::{GatewayError, Result};

/// Header naming the target cluster.
pub const CLUSTER_NAME_HEADER: &str = "x-cluster-name";

/// Header carrying the target cluster's id.
pub const CLUSTER_ID_HEADER: &str = "x-cluster-id";

/// Query parameter naming the target cluster.
pub const CLUSTER_NAME_QUERY: &str = "clustername";

/// The parts of a request the classifier looks at.
#[derive(Debug, Clone, Copy)]
pub struct RouteRequest<'a> {
    /// Module path segment.
    pub module: &'a str,
    /// Request headers.
    pub headers: &'a HeaderMap,
    /// Value of the `clustername` query parameter.
    pub cluster_name_query: Option<&'a str>,
}

/// Classify a request.
///
/// # Errors
///
/// Returns `RouteNotFound` when no rule applies, `ClusterNotFound` or
/// `AmbiguousCluster` unless exactly one cluster matches, `InvalidClusterId`
/// for a malformed `X-Cluster-ID`, `ClusterResetting`/`ClusterResetFailed`
/// for a cluster out of service, and `PolicyStoreUnavailable` if the
/// registry cannot be read.
pub fn classify<S: PolicyStore>(
    store: &S,
    tables: &PolicyTables,
    request: &RouteRequest<'_>,
) -> Result<Classification> {
    if tables.is_outer_service(request.module) {
        return Ok(Classification::outer());
    }

    if let Some(name) = cluster_name(request) {
        let clusters = store.clusters_by_name(name)?;
        let cluster = single_cluster(clusters, name)?;
        ensure_in_service(store, &cluster)?;
        return Ok(Classification::inbound(cluster.into()));
    }

    if let Some(raw) = header(request.headers, CLUSTER_ID_HEADER) {
        let id: ClusterId = raw
            .parse()
            .map_err(|_| GatewayError::InvalidClusterId(raw.to_string()))?;
        let clusters = store.clusters_by_id(id)?;
        let cluster = single_cluster(clusters, raw)?;
        ensure_in_service(store, &cluster)?;
        return Ok(Classification::inbound(cluster.into()));
    }

    Err(GatewayError::RouteNotFound)
}

fn cluster_name<'a>(request: &RouteRequest<'a>) -> Option<&'a str> {
    header(request.headers, CLUSTER_NAME_HEADER)
        .or_else(|| request.cluster_name_query.filter(|name| !name.is_empty()))
}

fn header<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
}

fn single_cluster(mut clusters: Vec<Cluster>, key: &str) -> Result<Cluster> {
    match clusters.len() {
        0 => Err(GatewayError::ClusterNotFound(key.to_string())),
        1 => Ok(clusters.remove(0)),
        rows => Err(GatewayError::AmbiguousCluster {
            name: key.to_string(),
            rows,
        }),
    }
}

fn ensure_in_service<S: PolicyStore>(store: &S, cluster: &Cluster) -> Result<()> {
    let status = match store.cluster_status(&cluster.name) {
        Ok(status) => status,
        Err(StoreError::NotFound) => return Err(GatewayError::ClusterNotFound(cluster.name.clone())),
        Err(e) => return Err(e.into()),
    };

    match status {
        ClusterStatus::Normal => Ok(()),
        ClusterStatus::Resetting | ClusterStatus::ResetSucceeded => {
            tracing::warn!(cluster = %cluster.name, ?status, "Cluster is resetting");
            Err(GatewayError::ClusterResetting(cluster.name.clone()))
        }
        ClusterStatus::ResetFailed => {
            tracing::warn!(cluster = %cluster.name, "Cluster reset failed");
            Err(GatewayError::ClusterResetFailed(cluster.name.clone()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;
    use ihub_core::Destination;
    use ihub_store::RocksStore;
    use tempfile::TempDir;

    fn create_test_store() -> (RocksStore, TempDir) {
        let dir = TempDir::new().unwrap();
        let store = RocksStore::open(dir.path()).unwrap();
        (store, dir)
    }

    fn cluster(id: i64, name: &str, status: ClusterStatus) -> Cluster {
        Cluster {
            cluster_id: ClusterId::new(id),
            name: name.to_string(),
            domain: format!("{name}.local"),
            cluster_type: "k8s".to_string(),
            source_division: None,
            status,
        }
    }

    fn tables() -> PolicyTables {
        let mut tables = PolicyTables::default();
        tables.outer_service_ports.insert("store".to_string(), 9001);
        tables
    }

    fn headers(pairs: &[(&'static str, &'static str)]) -> HeaderMap {
        let mut headers = HeaderMap::new();
        for (name, value) in pairs {
            headers.insert(*name, HeaderValue::from_static(value));
        }
        headers
    }

    fn route<'a>(module: &'a str, headers: &'a HeaderMap, query: Option<&'a str>) -> RouteRequest<'a> {
        RouteRequest {
            module,
            headers,
            cluster_name_query: query,
        }
    }

    #[test]
    fn outer_service_wins_over_cluster_name() {
        let (store, _dir) = create_test_store();
        store.put_cluster(&cluster(7, "prod", ClusterStatus::Normal)).unwrap();
        let headers = headers(&[("x-cluster-name", "prod")]);

        let result = classify(&store, &tables(), &route("store", &headers, None)).unwrap();

        assert_eq!(result.destination, Destination::Out);
        assert!(result.cluster.is_none());
    }

    #[test]
    fn header_name_wins_over_query() {
        let (store, _dir) = create_test_store();
        store.put_cluster(&cluster(7, "prod", ClusterStatus::Normal)).unwrap();
        store.put_cluster(&cluster(8, "stage", ClusterStatus::Normal)).unwrap();
        let headers = headers(&[("x-cluster-name", "prod")]);

        let result = classify(&store, &tables(), &route("billing", &headers, Some("stage"))).unwrap();

        assert_eq!(result.destination, Destination::In);
        let target = result.cluster.unwrap();
        assert_eq!(target.id, ClusterId::new(7));
        assert_eq!(target.domain, "prod.local");
    }

    #[test]
    fn query_name_resolves_cluster() {
        let (store, _dir) = create_test_store();
        store.put_cluster(&cluster(8, "stage", ClusterStatus::Normal)).unwrap();
        let headers = HeaderMap::new();

        let result = classify(&store, &tables(), &route("billing", &headers, Some("stage"))).unwrap();
        assert_eq!(result.cluster.unwrap().name, "stage");
    }

    #[test]
    fn name_wins_over_id() {
        let (store, _dir) = create_test_store();
        store.put_cluster(&cluster(7, "prod", ClusterStatus::Normal)).unwrap();
        store.put_cluster(&cluster(8, "stage", ClusterStatus::Normal)).unwrap();
        let headers = headers(&[("x-cluster-name", "prod"), ("x-cluster-id", "8")]);

        let result = classify(&store, &tables(), &route("billing", &headers, None)).unwrap();
        assert_eq!(result.cluster.unwrap().id, ClusterId::new(7));
    }

    #[test]
    fn id_header_resolves_cluster() {
        let (store, _dir) = create_test_store();
        store.put_cluster(&cluster(8, "stage", ClusterStatus::Normal)).unwrap();
        let headers = headers(&[("x-cluster-id", " 8 ")]);

        let result = classify(&store, &tables(), &route("billing", &headers, None)).unwrap();
        assert_eq!(result.cluster.unwrap().name, "stage");
    }

    #[test]
    fn malformed_id_is_rejected() {
        let (store, _dir) = create_test_store();
        let headers = headers(&[("x-cluster-id", "eight")]);

        let err = classify(&store, &tables(), &route("billing", &headers, None)).unwrap_err();
        assert!(matches!(err, GatewayError::InvalidClusterId(ref raw) if raw == "eight"));
    }

    #[test]
    fn no_rule_is_route_not_found() {
        let (store, _dir) = create_test_store();
        let headers = HeaderMap::new();

        let err = classify(&store, &tables(), &route("billing", &headers, None)).unwrap_err();
        assert!(matches!(err, GatewayError::RouteNotFound));
    }

    #[test]
    fn unknown_cluster_is_not_found() {
        let (store, _dir) = create_test_store();
        let by_name = headers(&[("x-cluster-name", "prod")]);
        let by_id = headers(&[("x-cluster-id", "42")]);

        let err = classify(&store, &tables(), &route("billing", &by_name, None)).unwrap_err();
        assert!(matches!(err, GatewayError::ClusterNotFound(_)));

        let err = classify(&store, &tables(), &route("billing", &by_id, None)).unwrap_err();
        assert!(matches!(err, GatewayError::ClusterNotFound(_)));
    }

    #[test]
    fn duplicate_names_are_ambiguous() {
        let (store, _dir) = create_test_store();
        store.put_cluster(&cluster(7, "prod", ClusterStatus::Normal)).unwrap();
        store.put_cluster(&cluster(9, "prod", ClusterStatus::Normal)).unwrap();
        let headers = headers(&[("x-cluster-name", "prod")]);

        let err = classify(&store, &tables(), &route("billing", &headers, None)).unwrap_err();
        assert!(matches!(err, GatewayError::AmbiguousCluster { rows: 2, .. }));
    }

    #[test]
    fn clusters_out_of_service_are_refused() {
        let (store, _dir) = create_test_store();
        store.put_cluster(&cluster(1, "a", ClusterStatus::Resetting)).unwrap();
        store.put_cluster(&cluster(2, "b", ClusterStatus::ResetSucceeded)).unwrap();
        store.put_cluster(&cluster(3, "c", ClusterStatus::ResetFailed)).unwrap();

        let a = headers(&[("x-cluster-name", "a")]);
        let b = headers(&[("x-cluster-id", "2")]);
        let c = headers(&[("x-cluster-name", "c")]);

        assert!(matches!(
            classify(&store, &tables(), &route("billing", &a, None)),
            Err(GatewayError::ClusterResetting(_))
        ));
        assert!(matches!(
            classify(&store, &tables(), &route("billing", &b, None)),
            Err(GatewayError::ClusterResetting(_))
        ));
        assert!(matches!(
            classify(&store, &tables(), &route("billing", &c, None)),
            Err(GatewayError::ClusterResetFailed(_))
        ));
    }

    #[test]
    fn classification_is_repeatable() {
        let (store, _dir) = create_test_store();
        store.put_cluster(&cluster(7, "prod", ClusterStatus::Normal)).unwrap();
        let headers = headers(&[("x-cluster-name", "prod")]);
        let request = route("billing", &headers, None);

        let first = classify(&store, &tables(), &request).unwrap();
        let second = classify(&store, &tables(), &request).unwrap();
        assert_eq!(first, second);
    }
}
