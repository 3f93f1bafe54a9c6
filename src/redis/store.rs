//! Redis implementation of the backing store contract

use super::connection::{RedisConfig, RedisPool};
use super::scripts::LuaScripts;
use crate::error::StoreError;
use crate::store::EventStore;
use async_trait::async_trait;
use redis::AsyncCommands;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::info;

/// [`EventStore`] backed by Redis
///
/// Values, sets, and the sorted time index map directly onto Redis types;
/// `check_and_set` runs as a Lua script so it is atomic server-side.
pub struct RedisStore {
    pool: Arc<RedisPool>,
    scripts: LuaScripts,
}

impl RedisStore {
    /// Connect to Redis and return a ready store
    pub async fn new(config: RedisConfig) -> Result<Self, StoreError> {
        let pool = Arc::new(RedisPool::new(config).await?);
        info!("Redis event store initialized");
        Ok(Self {
            pool,
            scripts: LuaScripts::new(),
        })
    }

    /// Build a store over an existing pool
    pub fn with_pool(pool: Arc<RedisPool>) -> Self {
        Self {
            pool,
            scripts: LuaScripts::new(),
        }
    }

    /// PING the server
    pub async fn health_check(&self) -> Result<(), StoreError> {
        self.pool.health_check().await
    }
}

#[async_trait]
impl EventStore for RedisStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        self.pool
            .execute(|mut conn| {
                let key = key.to_string();
                async move { conn.get::<_, Option<String>>(&key).await }
            })
            .await
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        self.pool
            .execute(|mut conn| {
                let key = key.to_string();
                let value = value.to_string();
                async move { conn.set::<_, _, ()>(&key, &value).await }
            })
            .await
    }

    async fn set_add(&self, key: &str, member: &str) -> Result<(), StoreError> {
        self.pool
            .execute(|mut conn| {
                let key = key.to_string();
                let member = member.to_string();
                async move { conn.sadd::<_, _, ()>(&key, &member).await }
            })
            .await
    }

    async fn set_members(&self, key: &str) -> Result<HashSet<String>, StoreError> {
        self.pool
            .execute(|mut conn| {
                let key = key.to_string();
                async move { conn.smembers::<_, HashSet<String>>(&key).await }
            })
            .await
    }

    async fn set_union(&self, keys: &[String]) -> Result<HashSet<String>, StoreError> {
        // SUNION with no keys is a protocol error
        if keys.is_empty() {
            return Ok(HashSet::new());
        }
        self.pool
            .execute(|mut conn| {
                let keys = keys.to_vec();
                async move { conn.sunion::<_, HashSet<String>>(&keys).await }
            })
            .await
    }

    async fn sorted_add(&self, key: &str, score: i64, member: &str) -> Result<(), StoreError> {
        self.pool
            .execute(|mut conn| {
                let key = key.to_string();
                let member = member.to_string();
                async move { conn.zadd::<_, _, _, ()>(&key, &member, score).await }
            })
            .await
    }

    async fn sorted_range_by_score(
        &self,
        key: &str,
        min: i64,
        max: i64,
    ) -> Result<Vec<String>, StoreError> {
        self.pool
            .execute(|mut conn| {
                let key = key.to_string();
                async move {
                    conn.zrangebyscore::<_, _, _, Vec<String>>(&key, min, max)
                        .await
                }
            })
            .await
    }

    async fn check_and_set(
        &self,
        key: &str,
        expected: Option<&str>,
        new: &str,
    ) -> Result<bool, StoreError> {
        let script = self.scripts.check_and_set();

        let applied: i32 = self
            .pool
            .execute(|mut conn| {
                let script = Arc::clone(&script);
                let key = key.to_string();
                let expected = expected.map(str::to_string);
                let new = new.to_string();
                async move {
                    script
                        .key(&key)
                        .arg(expected.as_deref().unwrap_or(""))
                        .arg(if expected.is_some() { "1" } else { "0" })
                        .arg(&new)
                        .invoke_async(&mut conn)
                        .await
                }
            })
            .await?;

        Ok(applied == 1)
    }
}
