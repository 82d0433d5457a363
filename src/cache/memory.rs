//! In-process [`CodeStore`], used by tests and single-node deployments.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tokio::time::Instant;

use super::{CacheError, CacheResult, CodeStore, matches_fragments};

struct Entry {
    value: String,
    expires_at: Instant,
}

/// Process-local store with lazy expiry.
#[derive(Clone, Default)]
pub struct MemoryStore {
    entries: Arc<RwLock<HashMap<String, Entry>>>,
}

impl MemoryStore {
    /// Create an empty [`MemoryStore`].
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CodeStore for MemoryStore {
    async fn set(
        &self,
        ttl: Duration,
        key: &str,
        value: &str,
    ) -> CacheResult<()> {
        let mut entries = self.entries.write().await;
        entries.insert(
            key.to_owned(),
            Entry {
                value: value.to_owned(),
                expires_at: Instant::now() + ttl,
            },
        );
        Ok(())
    }

    async fn get(&self, key: &str) -> CacheResult<String> {
        let live = {
            let entries = self.entries.read().await;
            match entries.get(key) {
                Some(entry) if entry.expires_at > Instant::now() => {
                    Some(entry.value.clone())
                }
                Some(_) => None, // elapsed, reap below.
                None => return Err(CacheError::NotFound),
            }
        };

        match live {
            Some(value) => Ok(value),
            None => {
                self.entries.write().await.remove(key);
                Err(CacheError::NotFound)
            }
        }
    }

    async fn delete(&self, key: &str) -> CacheResult<()> {
        self.entries.write().await.remove(key);
        Ok(())
    }

    async fn get_keys(&self, fragments: &[&str]) -> CacheResult<Vec<String>> {
        let now = Instant::now();
        let entries = self.entries.read().await;
        let keys: Vec<String> = entries
            .iter()
            .filter(|(key, entry)| {
                entry.expires_at > now && matches_fragments(key, fragments)
            })
            .map(|(key, _)| key.clone())
            .collect();

        if keys.is_empty() {
            return Err(CacheError::NotFound);
        }

        Ok(keys)
    }

    async fn get_including_key(
        &self,
        fragments: &[&str],
    ) -> CacheResult<String> {
        let keys = self.get_keys(fragments).await?;

        let entries = self.entries.read().await;
        let values: Vec<String> = keys
            .iter()
            .filter_map(|key| entries.get(key).map(|e| e.value.clone()))
            .collect();

        Ok(format!("[{}]", values.join(",")))
    }
}
