use std::future::Future;
use std::hash::Hash;
use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::OnceCell;

use crate::error::LoadError;

/// Deduplicating resolution cache, keyed by (entity identity, derivation
/// kind). The first caller for a key runs the generator and stores the
/// in-flight operation; every concurrent and later caller awaits the same
/// cell and receives a clone of the stored result. Single-assignment: once a
/// generator succeeded, it never runs again for that key.
pub struct Resolver<K, T> {
    cells: DashMap<K, Arc<OnceCell<T>>>,
}

impl<K: Eq + Hash + Clone, T: Clone> Resolver<K, T> {
    pub fn new() -> Self {
        Self {
            cells: DashMap::with_capacity(16),
        }
    }

    pub async fn resolve<F, Fut>(&self, key: K, generate: F) -> Result<T, LoadError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, LoadError>>,
    {
        // This is one of the hottest paths when loading documents, due to the
        // locking on the hashmap. DashMap only locks the shard, and the guard
        // is dropped before awaiting, so waiters synchronize on the cell, not
        // on the map.
        let cell = {
            let entry = self.cells.entry(key).or_default();
            Arc::clone(&entry)
        };

        cell.get_or_try_init(generate).await.cloned()
    }

    /// The already-settled result, if any. Never triggers a resolution.
    pub fn get(&self, key: &K) -> Option<T> {
        self.cells.get(key).and_then(|cell| cell.get().cloned())
    }

    pub fn resolved_count(&self) -> usize {
        self.cells.iter().filter(|cell| cell.initialized()).count()
    }
}

impl<K: Eq + Hash + Clone, T: Clone> Default for Resolver<K, T> {
    fn default() -> Self {
        Self::new()
    }
}
