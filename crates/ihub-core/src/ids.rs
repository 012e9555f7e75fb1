//! Core identifier types for ihub.
//!
//! Numeric ids mirror the primary keys of the policy registry. Trace ids are
//! opaque strings: callers may supply their own via `X-Trace-ID`, otherwise a
//! UUIDv4 is generated.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Errors that can occur when parsing identifiers.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum IdError {
    /// The string is not a valid integer identifier.
    #[error("invalid {kind} id: {value:?}")]
    InvalidInteger {
        /// Which identifier was being parsed.
        kind: &'static str,
        /// The rejected input.
        value: String,
    },

    /// The trace id is empty or contains characters not allowed in a header.
    #[error("invalid trace id")]
    InvalidTraceId,
}

macro_rules! integer_id {
    ($(#[$meta:meta])* $name:ident, $kind:literal) => {
        $(#[$meta])*
        #[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(i64);

        impl $name {
            /// Create an id from its raw value.
            #[must_use]
            pub const fn new(value: i64) -> Self {
                Self(value)
            }

            /// Return the raw value.
            #[must_use]
            pub const fn get(self) -> i64 {
                self.0
            }

            /// Big-endian bytes, used as an order-preserving storage key.
            #[must_use]
            pub const fn to_be_bytes(self) -> [u8; 8] {
                self.0.to_be_bytes()
            }
        }

        impl FromStr for $name {
            type Err = IdError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                s.trim()
                    .parse::<i64>()
                    .map(Self)
                    .map_err(|_| IdError::InvalidInteger {
                        kind: $kind,
                        value: s.to_string(),
                    })
            }
        }

        impl From<i64> for $name {
            fn from(value: i64) -> Self {
                Self(value)
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}({})", stringify!($name), self.0)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

integer_id!(
    /// Primary key of a registered cluster.
    ///
    /// The id `-1` is reserved for the default cluster, which is never
    /// subject to approval.
    ClusterId,
    "cluster"
);

integer_id!(
    /// Identifier of a user group (group-admin approvals are scoped by it).
    GroupId,
    "group"
);

integer_id!(
    /// Primary key of an approval module in the policy registry.
    ModuleId,
    "module"
);

impl ClusterId {
    /// The reserved id of the default cluster.
    pub const DEFAULT: Self = Self(-1);

    /// Returns `true` for the default cluster.
    #[must_use]
    pub const fn is_default(self) -> bool {
        self.0 == Self::DEFAULT.0
    }
}

/// A request trace identifier carried in the `X-Trace-ID` header.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TraceId(String);

impl TraceId {
    /// Generate a new random `TraceId`.
    #[must_use]
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    /// Return the trace id as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for TraceId {
    type Err = IdError;

    /// Accept any non-empty, visible-ASCII value so it can be echoed in headers.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() || !s.bytes().all(|b| b.is_ascii_graphic()) {
            return Err(IdError::InvalidTraceId);
        }
        Ok(Self(s.to_string()))
    }
}

impl fmt::Debug for TraceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TraceId({})", self.0)
    }
}

impl fmt::Display for TraceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for TraceId {
    type Error = IdError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<TraceId> for String {
    fn from(id: TraceId) -> Self {
        id.0
    }
}

impl AsRef<str> for TraceId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cluster_id_parses_integers() {
        let id: ClusterId = "42".parse().unwrap();
        assert_eq!(id.get(), 42);
        assert_eq!(id.to_string(), "42");

        let padded: ClusterId = " 7 ".parse().unwrap();
        assert_eq!(padded, ClusterId::new(7));
    }

    #[test]
    fn cluster_id_rejects_garbage() {
        let err = "prod".parse::<ClusterId>().unwrap_err();
        assert_eq!(
            err,
            IdError::InvalidInteger {
                kind: "cluster",
                value: "prod".to_string()
            }
        );
        assert!("".parse::<ClusterId>().is_err());
        assert!("1.5".parse::<ClusterId>().is_err());
    }

    #[test]
    fn default_cluster() {
        assert!(ClusterId::DEFAULT.is_default());
        assert!(ClusterId::new(-1).is_default());
        assert!(!ClusterId::new(7).is_default());
    }

    #[test]
    fn key_bytes_preserve_order_for_positive_ids() {
        let a = ModuleId::new(3).to_be_bytes();
        let b = ModuleId::new(300).to_be_bytes();
        assert!(a < b);
    }

    #[test]
    fn integer_ids_serialize_transparently() {
        let json = serde_json::to_string(&GroupId::new(12)).unwrap();
        assert_eq!(json, "12");
        let back: GroupId = serde_json::from_str(&json).unwrap();
        assert_eq!(back, GroupId::new(12));
    }

    #[test]
    fn trace_id_generate_is_unique() {
        let a = TraceId::generate();
        let b = TraceId::generate();
        assert_ne!(a, b);
        assert!(uuid::Uuid::parse_str(a.as_str()).is_ok());
    }

    #[test]
    fn trace_id_accepts_caller_values() {
        let id: TraceId = "req-123/abc".parse().unwrap();
        assert_eq!(id.as_str(), "req-123/abc");
    }

    #[test]
    fn trace_id_rejects_unprintable() {
        assert_eq!("".parse::<TraceId>(), Err(IdError::InvalidTraceId));
        assert_eq!("has space".parse::<TraceId>(), Err(IdError::InvalidTraceId));
        assert_eq!("tab\there".parse::<TraceId>(), Err(IdError::InvalidTraceId));
    }
}
