//! Backend URL construction.
//!
//! | destination | runmode | target                                          |
//! |-------------|---------|-------------------------------------------------|
//! | out         | any     | `http://localhost:<port>/<endpoint>`            |
//! | in          | in      | `http://<module>.default.<domain>/<endpoint>`   |
//! | in          | out     | `http://ihub.default.<domain>/<module>/<endpoint>` |
//!
//! In the last case the request goes to the gateway inside the cluster,
//! which resolves the module itself.

use ihub_core::{Destination, Runmode};
use ihub_policy::PolicyTables;

use crate::error::{GatewayError, Result};

/// Namespace segment of in-cluster hostnames.
const NAMESPACE: &str = "default";

/// Module name of the in-cluster gateway.
const IN_CLUSTER_GATEWAY: &str = "ihub";

/// Where a request is sent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Target {
    origin: String,
    forward_path: String,
    parent_path: String,
}

impl Target {
    /// Scheme, host and port of the backend.
    #[must_use]
    pub fn origin(&self) -> &str {
        &self.origin
    }

    /// Path the request is forwarded to.
    #[must_use]
    pub fn forward_path(&self) -> &str {
        &self.forward_path
    }

    /// Full target URL, without query string.
    #[must_use]
    pub fn url(&self) -> String {
        format!("{}{}", self.origin, self.forward_path)
    }

    /// Full target URL with `query` appended.
    #[must_use]
    pub fn url_with_query(&self, query: Option<&str>) -> String {
        match query.filter(|q| !q.is_empty()) {
            Some(query) => format!("{}{}?{query}", self.origin, self.forward_path),
            None => self.url(),
        }
    }

    /// URL of the validation resource for `module`/`endpoint`.
    ///
    /// The resource `vali_<module>_<endpoint>` sits next to the target
    /// path; slashes inside the endpoint become underscores.
    #[must_use]
    pub fn validation_url(&self, module: &str, endpoint: &str) -> String {
        format!(
            "{}{}/vali_{module}_{}",
            self.origin,
            self.parent_path,
            endpoint.replace('/', "_")
        )
    }
}

/// Builds backend targets against one snapshot of the static tables.
#[derive(Debug, Clone, Copy)]
pub struct UrlBuilder<'a> {
    tables: &'a PolicyTables,
    cluster_port: Option<u16>,
}

impl<'a> UrlBuilder<'a> {
    /// Create a builder. `cluster_port` is appended to in-cluster hostnames.
    #[must_use]
    pub const fn new(tables: &'a PolicyTables, cluster_port: Option<u16>) -> Self {
        Self {
            tables,
            cluster_port,
        }
    }

    /// Build the target of a request.
    ///
    /// # Errors
    ///
    /// Returns `MissingContext` if an outer service has no port or inbound
    /// traffic has no cluster domain.
    pub fn build(
        &self,
        destination: Destination,
        cluster_domain: Option<&str>,
        module: &str,
        endpoint: &str,
        runmode: Runmode,
    ) -> Result<Target> {
        let endpoint = endpoint.trim_start_matches('/');

        match (destination, runmode) {
            (Destination::Out, _) => {
                let port = self
                    .tables
                    .outer_port(module)
                    .ok_or(GatewayError::MissingContext("outer service port"))?;
                Ok(Target {
                    origin: format!("http://localhost:{port}"),
                    forward_path: format!("/{endpoint}"),
                    parent_path: String::new(),
                })
            }
            (Destination::In, Runmode::In) => {
                let domain = cluster_domain.ok_or(GatewayError::MissingContext("cluster domain"))?;
                Ok(Target {
                    origin: self.origin(module, domain),
                    forward_path: format!("/{endpoint}"),
                    parent_path: String::new(),
                })
            }
            (Destination::In, Runmode::Out) => {
                let domain = cluster_domain.ok_or(GatewayError::MissingContext("cluster domain"))?;
                Ok(Target {
                    origin: self.origin(IN_CLUSTER_GATEWAY, domain),
                    forward_path: format!("/{module}/{endpoint}"),
                    parent_path: format!("/{module}"),
                })
            }
        }
    }

    fn origin(&self, host: &str, domain: &str) -> String {
        match self.cluster_port {
            Some(port) => format!("http://{host}.{NAMESPACE}.{domain}:{port}"),
            None => format!("http://{host}.{NAMESPACE}.{domain}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tables() -> PolicyTables {
        let mut tables = PolicyTables::default();
        tables.outer_service_ports.insert("store".to_string(), 9001);
        tables
    }

    #[test]
    fn inbound_at_inner_gateway() {
        let tables = tables();
        let target = UrlBuilder::new(&tables, None)
            .build(Destination::In, Some("example.com"), "infer", "predict", Runmode::In)
            .unwrap();

        assert_eq!(target.url(), "http://infer.default.example.com/predict");
        assert_eq!(target.forward_path(), "/predict");
    }

    #[test]
    fn outer_service() {
        let tables = tables();
        let target = UrlBuilder::new(&tables, None)
            .build(Destination::Out, None, "store", "list", Runmode::Out)
            .unwrap();

        assert_eq!(target.url(), "http://localhost:9001/list");
        assert_eq!(target.forward_path(), "/list");
    }

    #[test]
    fn inbound_at_edge_gateway() {
        let tables = tables();
        let target = UrlBuilder::new(&tables, None)
            .build(Destination::In, Some("prod.local"), "billing", "charge", Runmode::Out)
            .unwrap();

        assert_eq!(target.url(), "http://ihub.default.prod.local/billing/charge");
        assert_eq!(target.forward_path(), "/billing/charge");
    }

    #[test]
    fn cluster_port_is_appended() {
        let tables = tables();
        let target = UrlBuilder::new(&tables, Some(8080))
            .build(Destination::In, Some("prod.local"), "billing", "charge", Runmode::In)
            .unwrap();

        assert_eq!(target.origin(), "http://billing.default.prod.local:8080");
    }

    #[test]
    fn nested_endpoint_keeps_its_path() {
        let tables = tables();
        let target = UrlBuilder::new(&tables, None)
            .build(Destination::In, Some("prod.local"), "apps", "v1/install", Runmode::In)
            .unwrap();

        assert_eq!(target.url(), "http://apps.default.prod.local/v1/install");
        assert_eq!(
            target.url_with_query(Some("name=redis&force=1")),
            "http://apps.default.prod.local/v1/install?name=redis&force=1"
        );
        assert_eq!(target.url_with_query(Some("")), target.url());
    }

    #[test]
    fn validation_url_is_a_sibling() {
        let tables = tables();
        let builder = UrlBuilder::new(&tables, None);

        let inner = builder
            .build(Destination::In, Some("prod.local"), "billing", "charge", Runmode::In)
            .unwrap();
        assert_eq!(
            inner.validation_url("billing", "charge"),
            "http://billing.default.prod.local/vali_billing_charge"
        );

        let edge = builder
            .build(Destination::In, Some("prod.local"), "apps", "v1/install", Runmode::Out)
            .unwrap();
        assert_eq!(
            edge.validation_url("apps", "v1/install"),
            "http://ihub.default.prod.local/apps/vali_apps_v1_install"
        );
    }

    #[test]
    fn missing_inputs() {
        let tables = tables();
        let builder = UrlBuilder::new(&tables, None);

        assert!(matches!(
            builder.build(Destination::Out, None, "billing", "charge", Runmode::Out),
            Err(GatewayError::MissingContext(_))
        ));
        assert!(matches!(
            builder.build(Destination::In, None, "billing", "charge", Runmode::In),
            Err(GatewayError::MissingContext(_))
        ));
    }
}
