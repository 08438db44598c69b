//! Durable key-value backends for the credentials record. The session core only
//! needs string values under a handful of fixed keys, so the contract is kept
//! to `get`/`set`/`remove`; every call may fail with an I/O error and callers
//! decide whether that is fatal.

mod file;

pub use file::FileStore;

use std::{collections::HashMap, future::Future, io, sync::Arc};
use tokio::sync::RwLock;

/// Async string key-value storage.
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> impl Future<Output = io::Result<Option<String>>> + Send;

    fn set(&self, key: &str, value: &str) -> impl Future<Output = io::Result<()>> + Send;

    /// Removing a missing key is not an error.
    fn remove(&self, key: &str) -> impl Future<Output = io::Result<()>> + Send;

    /// Removes every key, attempting all of them even if one fails. The first
    /// error is returned.
    fn remove_many(&self, keys: &[&str]) -> impl Future<Output = io::Result<()>> + Send {
        async move {
            let mut first_error = None;
            for key in keys {
                if let Err(err) = self.remove(key).await {
                    first_error.get_or_insert(err);
                }
            }
            first_error.map_or(Ok(()), Err)
        }
    }
}

/// In-process store. Clones share the same map, which lets tests simulate a
/// process restart by handing the same backing map to a fresh session store.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    entries: Arc<RwLock<HashMap<String, String>>>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

impl KeyValueStore for MemoryStore {
    async fn get(&self, key: &str) -> io::Result<Option<String>> {
        Ok(self.entries.read().await.get(key).cloned())
    }

    async fn set(&self, key: &str, value: &str) -> io::Result<()> {
        self.entries
            .write()
            .await
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn remove(&self, key: &str) -> io::Result<()> {
        self.entries.write().await.remove(key);
        Ok(())
    }

    async fn remove_many(&self, keys: &[&str]) -> io::Result<()> {
        let mut entries = self.entries.write().await;
        for key in keys {
            entries.remove(*key);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn memory_store_set_get_remove() -> io::Result<()> {
        let store = MemoryStore::new();
        assert_eq!(store.get("a").await?, None);

        store.set("a", "1").await?;
        store.set("b", "2").await?;
        assert_eq!(store.get("a").await?.as_deref(), Some("1"));
        assert_eq!(store.len().await, 2);

        store.remove("a").await?;
        store.remove("a").await?;
        assert_eq!(store.get("a").await?, None);

        store.remove_many(&["b", "missing"]).await?;
        assert!(store.is_empty().await);
        Ok(())
    }

    #[tokio::test]
    async fn memory_store_clones_share_entries() -> io::Result<()> {
        let store = MemoryStore::new();
        let other = store.clone();
        store.set("token", "abc").await?;
        assert_eq!(other.get("token").await?.as_deref(), Some("abc"));
        Ok(())
    }
}
