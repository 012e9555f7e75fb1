//! Core types and utilities for ihub.
//!
//! This crate provides the vocabulary shared by every ihub crate:
//!
//! - **Identifiers**: strongly-typed ids for clusters, groups, modules and traces
//! - **Routing**: where traffic comes from (`Destination`), where this gateway
//!   runs (`Runmode`) and who an approval is evaluated for (`ApproverRole`)
//! - **Authority**: the per-operation approval bitset stored on role records
//!
//! # Example
//!
//! ```
//! use ihub_core::{AuthorityBits, ClusterId, TraceId};
//!
//! let cluster_id: ClusterId = "7".parse().unwrap();
//! assert_eq!(cluster_id.get(), 7);
//!
//! let bits = AuthorityBits::new("0010");
//! assert_eq!(bits.requires_approval(2), Ok(true));
//!
//! let trace_id = TraceId::generate();
//! assert!(!trace_id.as_str().is_empty());
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod authority;
pub mod error;
pub mod ids;
pub mod routing;

pub use authority::{AuthorityBits, AuthorityError};
pub use error::{CoreError, Result};
pub use ids::{ClusterId, GroupId, IdError, ModuleId, TraceId};
pub use routing::{ApproverRole, ClusterStatus, Destination, RoleSelector, Runmode};
