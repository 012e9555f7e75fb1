//! Approval policy for ihub.
//!
//! This crate decides whether an operation needs approval. It holds the
//! static tables the gateway is configured with and resolves authorities
//! against the policy store.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      Gateway pipeline                       │
//! └─────────────────────────────────────────────────────────────┘
//!                │                             │
//!                ▼                             ▼
//!        ┌──────────────┐   tables     ┌────────────────┐
//!        │ TablesHandle │─────────────▶│ PolicyResolver │
//!        │  (snapshot)  │              │  role tier     │
//!        └──────────────┘              │  default tier  │
//!                                      └────────────────┘
//!                                              │
//!                                              ▼
//!                                      ┌────────────────┐
//!                                      │  PolicyStore   │
//!                                      └────────────────┘
//! ```
//!
//! # Usage
//!
//! ```no_run
//! use std::sync::Arc;
//! use ihub_core::{ClusterId, RoleSelector};
//! use ihub_policy::{ApprovalQuery, AuthorityResolver, PolicyResolver, TablesHandle};
//! use ihub_store::RocksStore;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let store = Arc::new(RocksStore::open("/tmp/ihub")?);
//! let resolver = PolicyResolver::new(store);
//! let tables = TablesHandle::default();
//!
//! let query = ApprovalQuery {
//!     cluster_id: ClusterId::new(7),
//!     module: "billing".to_string(),
//!     endpoint: "charge".to_string(),
//!     selector: RoleSelector::ClusterAdmin,
//! };
//! let needed = resolver.needs_approval(&tables.snapshot(), &query).await?;
//! println!("approval needed: {needed}");
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod error;
pub mod handle;
pub mod resolver;
pub mod tables;

pub use error::{PolicyError, Result};
pub use handle::TablesHandle;
pub use resolver::{ApprovalQuery, AuthorityResolver, PolicyResolver};
pub use tables::PolicyTables;
