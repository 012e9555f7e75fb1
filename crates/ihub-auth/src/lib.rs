//! External service clients for ihub.
//!
//! This crate talks to the two HTTP services the gateway depends on:
//!
//! - the validation service, which describes a request about to be diverted
//!   for approval and identifies its caller
//! - the optional identity service, which authenticates callers before
//!   routing
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────┐     ┌──────────────────────┐
//! │   Gateway        │────▶│  ValidationClient    │
//! │   pipeline       │     │  (trait)             │
//! └────────┬─────────┘     └──────────┬───────────┘
//!          │                          │
//!          │               ┌──────────▼───────────┐
//!          │               │ HttpValidationClient │
//!          │               └──────────┬───────────┘
//!          │                          │ HTTP
//!          │               ┌──────────▼───────────┐
//!          │               │  vali_<module>_<op>  │
//!          │               └──────────────────────┘
//!          │
//!          │  HTTP         ┌──────────────────────┐
//!          └──────────────▶│  IdentityClient      │
//!                          └──────────────────────┘
//! ```
//!
//! # Example
//!
//! ```no_run
//! use std::time::Duration;
//! use ihub_auth::{HttpValidationClient, ValidationClient, ValidationRequest};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = HttpValidationClient::new(Duration::from_secs(30));
//! let grant = client
//!     .validate(ValidationRequest {
//!         url: "http://billing.default.prod.local/vali_billing_charge".to_string(),
//!         method: reqwest::Method::POST,
//!         headers: reqwest::header::HeaderMap::new(),
//!         body: Vec::new(),
//!     })
//!     .await?;
//!
//! println!("user {} in group {}", grant.user_id, grant.group_id);
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod error;
mod fields;
pub mod identity;
pub mod validation;

pub use error::{AuthError, Result};
pub use identity::{CallerIdentity, IdentityClient, AUTH_INFO_HEADER};
pub use validation::{HttpValidationClient, ValidationClient, ValidationGrant, ValidationRequest};

use serde::{Deserialize, Serialize};

/// Configuration for the identity service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentityConfig {
    /// Identity endpoint (e.g., `http://ibase:8080/api/v1/whoami`).
    pub url: String,
    /// Request timeout in seconds.
    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: u64,
}

fn default_timeout_seconds() -> u64 {
    10
}
