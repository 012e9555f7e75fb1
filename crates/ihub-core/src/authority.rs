//! Per-operation approval flags.
//!
//! A role record carries an authority string in which every character is an
//! independent flag for one operation of the module: `'1'` at position `n`
//! means operation `n` requires approval, any other character means it does
//! not. Indexing is bounds-checked; an index past the end is a policy-data
//! fault rather than a silent "no".

use serde::{Deserialize, Serialize};
use std::fmt;

/// Errors raised when reading an authority bitset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum AuthorityError {
    /// The operator index does not fit the authority string.
    #[error("operator index {index} out of range for authority of length {len}")]
    OutOfRange {
        /// Requested position.
        index: usize,
        /// Number of flags in the authority string.
        len: usize,
    },
}

/// A string-encoded bitset of approval flags, one character per operation.
#[derive(Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AuthorityBits(String);

impl AuthorityBits {
    /// Wrap an authority string as stored in the policy registry.
    #[must_use]
    pub fn new(flags: impl Into<String>) -> Self {
        Self(flags.into())
    }

    /// Number of operation flags.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns `true` if no flags are stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Whether the operation at `index` requires approval.
    ///
    /// # Errors
    ///
    /// Returns `AuthorityError::OutOfRange` if `index` is past the last flag.
    pub fn requires_approval(&self, index: usize) -> Result<bool, AuthorityError> {
        self.0
            .as_bytes()
            .get(index)
            .map(|flag| *flag == b'1')
            .ok_or(AuthorityError::OutOfRange {
                index,
                len: self.len(),
            })
    }

    /// Return the raw authority string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for AuthorityBits {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "AuthorityBits({})", self.0)
    }
}

impl From<&str> for AuthorityBits {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}
