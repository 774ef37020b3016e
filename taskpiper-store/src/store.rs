//! The store: a set of named collections.
//!
//! Models the single logical database handle the server works against.
//! Collections are created on first use and shared via [`Arc`], so
//! components holding different collection handles see the same data.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;

use crate::collection::Collection;

/// A named set of [`Collection`]s, created on demand.
pub struct Store {
    collections: RwLock<HashMap<String, Arc<Collection>>>,
}

impl Default for Store {
    fn default() -> Self {
        Self::new()
    }
}

impl Store {
    /// Creates a new, empty store.
    #[must_use]
    pub fn new() -> Self {
        Self {
            collections: RwLock::new(HashMap::new()),
        }
    }

    /// Returns the collection with the given name, creating it if needed.
    pub async fn collection(&self, name: &str) -> Arc<Collection> {
        {
            let collections = self.collections.read().await;
            if let Some(col) = collections.get(name) {
                return Arc::clone(col);
            }
        }
        let mut collections = self.collections.write().await;
        Arc::clone(
            collections
                .entry(name.to_string())
                .or_insert_with(|| Arc::new(Collection::new(name))),
        )
    }
}
