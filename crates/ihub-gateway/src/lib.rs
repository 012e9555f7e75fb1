//! Inter-cluster API gateway.
//!
//! Requests addressed to `/{module}/{endpoint}` are classified as bound for
//! an outer service or for a module inside a registered cluster, checked
//! against the approval policy, and then either diverted into the approval
//! workflow or reverse-proxied to their backend.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                        Callers                               │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │                       ihub-gateway                           │
//! │  ┌────────────┐ ┌────────────┐ ┌──────────┐ ┌────────────┐  │
//! │  │ Classifier │▶│  Approval  │▶│  Target  │▶│ Forwarder  │  │
//! │  │            │ │  decision  │ │  builder │ │ / Submit   │  │
//! │  └────────────┘ └────────────┘ └──────────┘ └────────────┘  │
//! └─────────────────────────────────────────────────────────────┘
//!          │               │                         │
//!          ▼               ▼                         ▼
//!    ┌──────────┐   ┌─────────────┐         ┌──────────────────┐
//!    │  Policy  │   │  Authority  │         │ Module backends  │
//!    │  store   │   │  resolver   │         │ Validation svc   │
//!    └──────────┘   └─────────────┘         └──────────────────┘
//! ```
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use std::time::Duration;
//! use ihub_auth::HttpValidationClient;
//! use ihub_gateway::{create_router, GatewayConfig, GatewayState};
//! use ihub_policy::TablesHandle;
//! use ihub_store::RocksStore;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = GatewayConfig::load("ihub-config.yaml")?;
//! let store = Arc::new(RocksStore::open(&config.data_dir)?);
//! let validator = Arc::new(HttpValidationClient::new(config.request_timeout()));
//! let tables = Arc::new(TablesHandle::new(config.tables.clone()));
//!
//! let listen_addr = config.listen_addr.clone();
//! let state = GatewayState::new(store, validator, tables, config);
//! let app = create_router(state);
//!
//! let listener = tokio::net::TcpListener::bind(&listen_addr).await?;
//! axum::serve(listener, app).await?;
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod approval;
pub mod classify;
pub mod config;
pub mod context;
pub mod error;
pub mod forward;
pub mod handlers;
pub mod reload;
pub mod routes;
pub mod seed;
pub mod state;
pub mod target;

pub use config::{ConfigError, GatewayConfig};
pub use context::{Classification, ClusterTarget, RequestContext};
pub use error::{Envelope, GatewayError, Result};
pub use reload::TablesWatcher;
pub use routes::create_router;
pub use seed::SeedFile;
pub use state::GatewayState;
pub use target::{Target, UrlBuilder};
