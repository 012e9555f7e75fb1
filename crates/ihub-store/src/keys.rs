//! Key encoding utilities for `RocksDB`.
//!
//! Integer ids are stored big-endian so keys sort by id. The name index
//! separates the name from the id with a NUL byte so that a prefix scan on
//! `name || 0x00` never matches a longer name.

use ihub_core::{ClusterId, ModuleId};
use uuid::Uuid;

const NAME_SEPARATOR: u8 = 0x00;

/// Encode a cluster key.
#[must_use]
pub fn cluster_key(cluster_id: ClusterId) -> Vec<u8> {
    cluster_id.to_be_bytes().to_vec()
}

/// Encode a name-cluster index key: `name || 0x00 || cluster_id`.
#[must_use]
pub fn name_cluster_key(name: &str, cluster_id: ClusterId) -> Vec<u8> {
    let mut key = name_prefix(name);
    key.extend_from_slice(&cluster_id.to_be_bytes());
    key
}

/// Encode a name prefix for scanning all clusters registered under `name`.
#[must_use]
pub fn name_prefix(name: &str) -> Vec<u8> {
    let mut key = Vec::with_capacity(name.len() + 9);
    key.extend_from_slice(name.as_bytes());
    key.push(NAME_SEPARATOR);
    key
}

/// Extract the cluster ID from a name-cluster key.
///
/// Returns `None` if the key is too short to carry an id.
#[must_use]
pub fn extract_cluster_id_from_name_key(key: &[u8]) -> Option<ClusterId> {
    let start = key.len().checked_sub(8)?;
    let bytes: [u8; 8] = key[start..].try_into().ok()?;
    Some(ClusterId::new(i64::from_be_bytes(bytes)))
}

/// Encode a module key.
#[must_use]
pub fn module_key(module_id: ModuleId) -> Vec<u8> {
    module_id.to_be_bytes().to_vec()
}

/// Encode a role or operate key from its numeric row id.
#[must_use]
pub fn row_key(row_id: i64) -> Vec<u8> {
    row_id.to_be_bytes().to_vec()
}

/// Encode an approval record key.
#[must_use]
pub fn record_key(record_id: &Uuid) -> Vec<u8> {
    record_id.as_bytes().to_vec()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn name_key_roundtrip() {
        let key = name_cluster_key("prod", ClusterId::new(7));
        assert!(key.starts_with(&name_prefix("prod")));
        assert_eq!(
            extract_cluster_id_from_name_key(&key),
            Some(ClusterId::new(7))
        );
    }

    #[test]
    fn name_prefix_does_not_match_longer_names() {
        let key = name_cluster_key("prod-eu", ClusterId::new(1));
        assert!(!key.starts_with(&name_prefix("prod")));
    }

    #[test]
    fn short_key_has_no_id() {
        assert_eq!(extract_cluster_id_from_name_key(&[1, 2, 3]), None);
    }
}
