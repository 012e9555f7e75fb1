//! Common error types for ihub.
//!
//! This module provides shared error types that are used across multiple crates.

use thiserror::Error;

/// A result type using `CoreError`.
pub type Result<T> = std::result::Result<T, CoreError>;

/// Core errors that can occur throughout the ihub system.
#[derive(Debug, Error)]
pub enum CoreError {
    /// An invalid identifier was provided.
    #[error("invalid identifier: {0}")]
    InvalidId(#[from] crate::ids::IdError),

    /// An authority bitset could not be indexed.
    #[error("authority error: {0}")]
    Authority(#[from] crate::authority::AuthorityError),

    /// An unknown enum discriminant was encountered.
    #[error("unknown {kind}: {value}")]
    UnknownVariant {
        /// The enum being decoded.
        kind: &'static str,
        /// The raw value that did not match.
        value: String,
    },
}
