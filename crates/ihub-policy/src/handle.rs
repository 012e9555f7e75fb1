//! Atomically swappable holder for the current `PolicyTables`.

use std::sync::Arc;

use parking_lot::RwLock;

use crate::tables::PolicyTables;

/// Shared handle to the current tables snapshot.
///
/// Readers take a cheap `Arc` clone and keep using it for the rest of the
/// request, so a reload never changes tables under an in-flight request.
#[derive(Debug, Default)]
pub struct TablesHandle {
    current: RwLock<Arc<PolicyTables>>,
}

impl TablesHandle {
    /// Create a handle holding `tables`.
    #[must_use]
    pub fn new(tables: PolicyTables) -> Self {
        Self {
            current: RwLock::new(Arc::new(tables)),
        }
    }

    /// The current snapshot.
    #[must_use]
    pub fn snapshot(&self) -> Arc<PolicyTables> {
        Arc::clone(&self.current.read())
    }

    /// Replace the snapshot, returning the previous one.
    pub fn swap(&self, tables: PolicyTables) -> Arc<PolicyTables> {
        let next = Arc::new(tables);
        std::mem::replace(&mut *self.current.write(), next)
    }
}
