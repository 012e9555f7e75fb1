//! Client for the identity service.
//!
//! The identity service authenticates the caller from its request headers.
//! Its answer is condensed into the `X-Auth-Info` header that backends read
//! the caller identity from.

use std::time::Duration;

use base64::Engine as _;
use ihub_core::GroupId;
use reqwest::header::{self, HeaderMap};
use serde_json::Value;

use crate::error::{AuthError, Result};
use crate::fields;
use crate::IdentityConfig;

/// Header carrying the encoded caller identity to backends.
pub const AUTH_INFO_HEADER: &str = "x-auth-info";

/// The caller identity returned by the identity service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallerIdentity {
    /// Account name.
    pub account: String,
    /// Group the caller belongs to.
    pub group_id: String,
    /// Name of the caller's group.
    pub group_name: String,
    /// Role type.
    pub role_type: i64,
    /// User identifier.
    pub user_id: String,
    /// User type.
    pub user_type: i64,
}

impl CallerIdentity {
    /// Interpret an identity service response body.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidResponse` if a field is missing.
    pub fn from_response(body: &Value) -> Result<Self> {
        let obj = body
            .as_object()
            .ok_or_else(|| AuthError::InvalidResponse("expected a JSON object".to_string()))?;
        let missing = |field: &str| AuthError::InvalidResponse(format!("identity missing {field}"));

        Ok(Self {
            account: fields::text(obj, "account").ok_or_else(|| missing("account"))?,
            group_id: fields::text(obj, "groupId").ok_or_else(|| missing("groupId"))?,
            group_name: fields::text(obj, "groupName").ok_or_else(|| missing("groupName"))?,
            role_type: fields::int(obj, "roleType").ok_or_else(|| missing("roleType"))?,
            user_id: fields::text(obj, "userId").ok_or_else(|| missing("userId"))?,
            user_type: fields::int(obj, "userType").ok_or_else(|| missing("userType"))?,
        })
    }

    /// Plain-text identity summary.
    #[must_use]
    pub fn auth_info(&self) -> String {
        format!(
            "account:{},groupId:{},groupName:{},roleType:{},userId:{},userType:{}",
            self.account,
            self.group_id,
            self.group_name,
            self.role_type,
            self.user_id,
            self.user_type
        )
    }

    /// Value of the `X-Auth-Info` header: the summary, base64 encoded.
    #[must_use]
    pub fn encoded(&self) -> String {
        base64::engine::general_purpose::STANDARD.encode(self.auth_info())
    }

    /// The caller's group as a group id, if it is numeric.
    #[must_use]
    pub fn group(&self) -> Option<GroupId> {
        self.group_id.parse().ok()
    }
}

/// HTTP client for the identity service.
#[derive(Debug, Clone)]
pub struct IdentityClient {
    client: reqwest::Client,
    url: String,
}

impl IdentityClient {
    /// Create a new identity client from its configuration.
    ///
    /// # Panics
    ///
    /// Panics if the HTTP client cannot be created.
    #[must_use]
    pub fn new(config: &IdentityConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .connect_timeout(Duration::from_secs(5))
            .build()
            .expect("Failed to create HTTP client");

        Self {
            client,
            url: config.url.clone(),
        }
    }

    /// Create a new identity client with a custom reqwest client.
    #[must_use]
    pub fn with_client(client: reqwest::Client, url: impl Into<String>) -> Self {
        Self {
            client,
            url: url.into(),
        }
    }

    /// Get the identity endpoint URL.
    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Authenticate the caller from its request headers.
    ///
    /// The lookup is a bodiless `GET`, so headers describing the caller's
    /// body or addressing the gateway are not sent.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::IdentityRejected` on a non-success status,
    /// `AuthError::Unavailable` if the service cannot be reached and
    /// `AuthError::InvalidResponse` if the answer cannot be read.
    pub async fn identify(&self, mut headers: HeaderMap) -> Result<CallerIdentity> {
        for name in [
            header::HOST,
            header::CONTENT_LENGTH,
            header::CONTENT_TYPE,
            header::TRANSFER_ENCODING,
        ] {
            headers.remove(name);
        }

        let response = self
            .client
            .get(&self.url)
            .headers(headers)
            .send()
            .await
            .map_err(|e| AuthError::Unavailable(format!("identity request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            tracing::warn!(status = %status, "Identity service rejected caller");
            return Err(AuthError::IdentityRejected(status.as_u16()));
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| AuthError::InvalidResponse(format!("identity response: {e}")))?;

        CallerIdentity::from_response(&body)
    }
}
