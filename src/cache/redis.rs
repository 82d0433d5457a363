//! Redis-backed [`CodeStore`] adapter.

use std::time::Duration;

use async_trait::async_trait;
use redis::AsyncCommands;
use redis::aio::ConnectionManager;

use super::{CacheError, CacheResult, CodeStore};

impl From<redis::RedisError> for CacheError {
    fn from(err: redis::RedisError) -> Self {
        CacheError::Backend(err.to_string())
    }
}

/// Redis adapter over a multiplexed connection.
#[derive(Clone)]
pub struct RedisStore {
    conn: ConnectionManager,
}

impl RedisStore {
    /// Connect to a Redis instance.
    pub async fn new(url: &str) -> CacheResult<Self> {
        let client = redis::Client::open(url)?;
        let conn = ConnectionManager::new(client).await?;

        tracing::info!(%url, "redis connected");

        Ok(Self { conn })
    }

    fn pattern(fragments: &[&str]) -> String {
        format!("*{}*", fragments.join("*"))
    }
}

#[async_trait]
impl CodeStore for RedisStore {
    async fn set(
        &self,
        ttl: Duration,
        key: &str,
        value: &str,
    ) -> CacheResult<()> {
        let mut conn = self.conn.clone();
        conn.set_ex::<_, _, ()>(key, value, ttl.as_secs()).await?;
        Ok(())
    }

    async fn get(&self, key: &str) -> CacheResult<String> {
        let mut conn = self.conn.clone();
        let value: Option<String> = conn.get(key).await?;
        value.ok_or(CacheError::NotFound)
    }

    async fn delete(&self, key: &str) -> CacheResult<()> {
        let mut conn = self.conn.clone();
        conn.del::<_, ()>(key).await?;
        Ok(())
    }

    async fn get_keys(&self, fragments: &[&str]) -> CacheResult<Vec<String>> {
        let mut conn = self.conn.clone();
        let keys: Vec<String> = conn.keys(Self::pattern(fragments)).await?;

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

        let mut conn = self.conn.clone();
        let mut values = Vec::with_capacity(keys.len());
        for key in &keys {
            let value: Option<String> = conn.get(key).await?;
            // A key can expire between KEYS and GET.
            if let Some(value) = value {
                values.push(value);
            }
        }

        Ok(format!("[{}]", values.join(",")))
    }
}
