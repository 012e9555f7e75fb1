//! Error types for authority resolution.
//!
//! Every variant except `Store` is a policy data-integrity fault: the
//! registry holds zero or several rows where exactly one is required, or an
//! authority string that does not cover the operation.

use ihub_core::{AuthorityError, ModuleId};
use ihub_store::StoreError;
use thiserror::Error;

/// A result type using `PolicyError`.
pub type Result<T> = std::result::Result<T, PolicyError>;

/// Errors that can occur while deciding whether an operation needs approval.
#[derive(Debug, Error)]
pub enum PolicyError {
    /// A role or default authority lookup did not yield exactly one row.
    #[error("{lookup} authority for {module}/{operate} matched {rows} rows, expected exactly one")]
    AmbiguousPolicy {
        /// Which tier of the lookup failed (`role` or `default`).
        lookup: &'static str,
        /// Policy module name.
        module: String,
        /// Policy operation name.
        operate: String,
        /// Number of rows found.
        rows: usize,
    },

    /// The operator index lookup did not yield exactly one row.
    #[error("operator {operate} of module {module_id} matched {rows} rows, expected exactly one")]
    AmbiguousOperator {
        /// Module the operation was looked up in.
        module_id: ModuleId,
        /// Policy operation name.
        operate: String,
        /// Number of rows found.
        rows: usize,
    },

    /// The operator index points past the end of the role's authority string.
    #[error("authority string does not cover operator {operate}: {source}")]
    OperatorOutOfRange {
        /// Policy operation name.
        operate: String,
        /// The bounds failure.
        #[source]
        source: AuthorityError,
    },

    /// Storage layer error.
    #[error("storage error: {0}")]
    Store(#[from] StoreError),
}
