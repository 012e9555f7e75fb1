//! Gateway application state.
//!
//! This module defines the shared state that is available to all request handlers.

use std::sync::Arc;
use std::time::Duration;

use ihub_auth::{IdentityClient, ValidationClient};
use ihub_policy::{PolicyResolver, TablesHandle};
use ihub_store::PolicyStore;

use crate::config::GatewayConfig;

/// Shared application state for the gateway.
///
/// This struct holds references to all services needed by the HTTP handlers.
pub struct GatewayState<S, V>
where
    S: PolicyStore,
    V: ValidationClient,
{
    /// The policy store.
    pub store: Arc<S>,
    /// Authority resolver over `store`.
    pub resolver: PolicyResolver<S>,
    /// The validation service client.
    pub validator: Arc<V>,
    /// The identity service client, if configured.
    pub identity: Option<IdentityClient>,
    /// Client used to forward requests upstream.
    pub http: reqwest::Client,
    /// Current static tables.
    pub tables: Arc<TablesHandle>,
    /// Gateway configuration.
    pub config: GatewayConfig,
}

impl<S, V> GatewayState<S, V>
where
    S: PolicyStore,
    V: ValidationClient,
{
    /// Create a new gateway state.
    ///
    /// The identity client is created from `config.identity` when present.
    ///
    /// # Panics
    ///
    /// Panics if the HTTP client cannot be created.
    #[must_use]
    pub fn new(
        store: Arc<S>,
        validator: Arc<V>,
        tables: Arc<TablesHandle>,
        config: GatewayConfig,
    ) -> Self {
        let http = proxy_client(config.request_timeout());
        let identity = config.identity.as_ref().map(IdentityClient::new);

        Self {
            resolver: PolicyResolver::new(Arc::clone(&store)),
            store,
            validator,
            identity,
            http,
            tables,
            config,
        }
    }

    /// Replace the client used to forward requests upstream.
    #[must_use]
    pub fn with_http_client(mut self, client: reqwest::Client) -> Self {
        self.http = client;
        self
    }

    /// Replace the identity client.
    #[must_use]
    pub fn with_identity(mut self, identity: Option<IdentityClient>) -> Self {
        self.identity = identity;
        self
    }
}

impl<S, V> Clone for GatewayState<S, V>
where
    S: PolicyStore,
    V: ValidationClient,
{
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            resolver: self.resolver.clone(),
            validator: Arc::clone(&self.validator),
            identity: self.identity.clone(),
            http: self.http.clone(),
            tables: Arc::clone(&self.tables),
            config: self.config.clone(),
        }
    }
}

/// Build the client that forwards requests upstream.
///
/// Redirects are returned to the caller rather than followed.
///
/// # Panics
///
/// Panics if the HTTP client cannot be created.
#[must_use]
pub fn proxy_client(timeout: Duration) -> reqwest::Client {
    reqwest::Client::builder()
        .timeout(timeout)
        .connect_timeout(Duration::from_secs(5))
        .redirect(reqwest::redirect::Policy::none())
        .build()
        .expect("Failed to create HTTP client")
}
