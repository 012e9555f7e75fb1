//! Error types for the external service clients.

use thiserror::Error;

/// A result type using `AuthError`.
pub type Result<T> = std::result::Result<T, AuthError>;

/// Errors that can occur when calling the validation or identity service.
#[derive(Debug, Error)]
pub enum AuthError {
    /// The validation service answered with a non-zero code.
    #[error("validation rejected with code {code}: {message}")]
    Rejected {
        /// Code returned by the service.
        code: i64,
        /// Message returned by the service, if any.
        message: String,
    },

    /// The validation response lacks a required field.
    #[error("validation response missing field: {0}")]
    MissingField(&'static str),

    /// The identity service refused the caller.
    #[error("identity service returned status {0}")]
    IdentityRejected(u16),

    /// The service answered with something that is not the expected JSON.
    #[error("invalid response: {0}")]
    InvalidResponse(String),

    /// The service could not be reached.
    #[error("service unavailable: {0}")]
    Unavailable(String),
}

impl AuthError {
    /// Returns `true` if retrying the request might succeed.
    #[must_use]
    pub const fn is_retriable(&self) -> bool {
        matches!(self, Self::Unavailable(_))
    }
}
