//! Gateway error types and responses.
//!
//! Every aborted request is answered with the standard envelope
//!
//! ```json
//! {"code": 1001, "message": "cluster not found: prod", "data": ""}
//! ```
//!
//! where `code` is zero on success and one of the numeric codes below
//! otherwise.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use thiserror::Error;

use ihub_auth::AuthError;
use ihub_policy::PolicyError;
use ihub_store::StoreError;

/// A result type using `GatewayError`.
pub type Result<T> = std::result::Result<T, GatewayError>;

/// Gateway error type that implements `IntoResponse`.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// No cluster is registered under the requested name or id.
    #[error("cluster not found: {0}")]
    ClusterNotFound(String),

    /// Several clusters are registered under the requested name or id.
    #[error("ambiguous cluster: {name} matched {rows} clusters")]
    AmbiguousCluster {
        /// Requested cluster name or id.
        name: String,
        /// Number of clusters found.
        rows: usize,
    },

    /// The `X-Cluster-ID` header is not an integer.
    #[error("invalid cluster id: {0}")]
    InvalidClusterId(String),

    /// The cluster is being reset.
    #[error("cluster {0} is resetting")]
    ClusterResetting(String),

    /// The cluster's last reset failed.
    #[error("cluster {0} reset failed")]
    ClusterResetFailed(String),

    /// The request names neither an outer service nor a cluster.
    #[error("route not found")]
    RouteNotFound,

    /// The request path or query string cannot be decoded.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// The request body is larger than `max_body_bytes`.
    #[error("request body too large")]
    PayloadTooLarge,

    /// Outer-service traffic reached a gateway deployed inside a cluster.
    #[error("outer service {0} cannot be reached from inside a cluster")]
    TopologyViolation(String),

    /// The policy registry holds zero or several rows where one is required.
    #[error("ambiguous policy: {0}")]
    AmbiguousPolicy(String),

    /// The operator lookup did not resolve to a usable index.
    #[error("ambiguous operator: {0}")]
    AmbiguousOperator(String),

    /// A value a later stage depends on was not provided.
    #[error("missing context: {0}")]
    MissingContext(&'static str),

    /// The identity service refused the caller.
    #[error("identity rejected with status {0}")]
    IdentityRejected(u16),

    /// The validation service answered without a required field.
    #[error("incomplete approval response: {0}")]
    IncompleteApprovalResponse(String),

    /// The validation service refused the request.
    #[error("approval rejected: {0}")]
    ApprovalRejected(String),

    /// The validation service, identity service or backend is unreachable.
    #[error("upstream unavailable: {0}")]
    UpstreamUnavailable(String),

    /// The pipeline did not finish within the request deadline.
    #[error("request timed out after {0}s")]
    RequestTimeout(u64),

    /// The policy store cannot be read or written.
    #[error("policy store unavailable: {0}")]
    PolicyStoreUnavailable(String),

    /// Internal server error.
    #[error("internal error: {0}")]
    Internal(String),
}

/// The response envelope shared by every synthesized response.
#[derive(Debug, Serialize)]
pub struct Envelope<T: Serialize> {
    /// Zero on success, an error code otherwise.
    pub code: u32,
    /// Human-readable message.
    pub message: String,
    /// Payload.
    pub data: T,
}

impl<T: Serialize> Envelope<T> {
    /// A success envelope carrying `data`.
    #[must_use]
    pub fn ok(message: impl Into<String>, data: T) -> Self {
        Self {
            code: 0,
            message: message.into(),
            data,
        }
    }
}

impl GatewayError {
    /// Get the HTTP status code for this error.
    #[must_use]
    pub const fn status_code(&self) -> StatusCode {
        match self {
            Self::ClusterNotFound(_) | Self::RouteNotFound => StatusCode::NOT_FOUND,
            Self::AmbiguousCluster { .. } => StatusCode::CONFLICT,
            Self::InvalidClusterId(_) | Self::InvalidRequest(_) | Self::MissingContext(_) => {
                StatusCode::BAD_REQUEST
            }
            Self::PayloadTooLarge => StatusCode::PAYLOAD_TOO_LARGE,
            Self::ClusterResetting(_)
            | Self::ClusterResetFailed(_)
            | Self::PolicyStoreUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            Self::TopologyViolation(_) => StatusCode::MISDIRECTED_REQUEST,
            Self::AmbiguousPolicy(_) | Self::AmbiguousOperator(_) | Self::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            Self::IdentityRejected(_) => StatusCode::UNAUTHORIZED,
            Self::ApprovalRejected(_) => StatusCode::FORBIDDEN,
            Self::IncompleteApprovalResponse(_) | Self::UpstreamUnavailable(_) => {
                StatusCode::BAD_GATEWAY
            }
            Self::RequestTimeout(_) => StatusCode::GATEWAY_TIMEOUT,
        }
    }

    /// Get the envelope code for this error.
    #[must_use]
    pub const fn code(&self) -> u32 {
        match self {
            Self::ClusterNotFound(_) => 1001,
            Self::AmbiguousCluster { .. } => 1002,
            Self::InvalidClusterId(_) => 1003,
            Self::ClusterResetting(_) => 1004,
            Self::ClusterResetFailed(_) => 1005,
            Self::RouteNotFound => 1006,
            Self::TopologyViolation(_) => 1007,
            Self::InvalidRequest(_) => 1008,
            Self::PayloadTooLarge => 1009,
            Self::AmbiguousPolicy(_) => 2001,
            Self::AmbiguousOperator(_) => 2002,
            Self::MissingContext(_) => 2003,
            Self::IdentityRejected(_) => 2004,
            Self::IncompleteApprovalResponse(_) => 3001,
            Self::ApprovalRejected(_) => 3002,
            Self::UpstreamUnavailable(_) => 3003,
            Self::RequestTimeout(_) => 3004,
            Self::PolicyStoreUnavailable(_) => 4001,
            Self::Internal(_) => 5000,
        }
    }

    /// Returns `true` if the caller may retry the request unchanged.
    #[must_use]
    pub const fn is_retriable(&self) -> bool {
        matches!(
            self,
            Self::UpstreamUnavailable(_) | Self::PolicyStoreUnavailable(_)
        )
    }
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        tracing::debug!(
            code = self.code(),
            retriable = self.is_retriable(),
            error = %self,
            "Request aborted"
        );
        let body = Envelope {
            code: self.code(),
            message: self.to_string(),
            data: "",
        };

        (status, Json(body)).into_response()
    }
}

impl From<PolicyError> for GatewayError {
    fn from(err: PolicyError) -> Self {
        match err {
            PolicyError::AmbiguousPolicy { .. } => {
                tracing::error!(error = %err, "Policy data fault");
                Self::AmbiguousPolicy(err.to_string())
            }
            PolicyError::AmbiguousOperator { .. } => {
                tracing::error!(error = %err, "Policy data fault");
                Self::AmbiguousOperator(err.to_string())
            }
            PolicyError::OperatorOutOfRange { .. } => {
                tracing::error!(error = %err, "Operator index out of range");
                Self::AmbiguousOperator(format!("operator index out of range: {err}"))
            }
            PolicyError::Store(store_err) => Self::from(store_err),
        }
    }
}

impl From<StoreError> for GatewayError {
    fn from(err: StoreError) -> Self {
        tracing::error!(error = %err, "Policy store error");
        Self::PolicyStoreUnavailable(err.to_string())
    }
}

impl From<AuthError> for GatewayError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::Rejected { code, message } => {
                Self::ApprovalRejected(format!("code {code}: {message}"))
            }
            AuthError::MissingField(field) => {
                Self::IncompleteApprovalResponse(format!("missing {field}"))
            }
            AuthError::InvalidResponse(msg) => Self::IncompleteApprovalResponse(msg),
            AuthError::IdentityRejected(status) => Self::IdentityRejected(status),
            AuthError::Unavailable(msg) => Self::UpstreamUnavailable(msg),
        }
    }
}
