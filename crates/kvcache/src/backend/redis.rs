//! Redis backend implementation
//!
//! Uses deadpool-redis for async connection pooling. The pool is built
//! without connecting; the first command opens the first connection.

use async_trait::async_trait;
use deadpool_redis::{Config as PoolConfig, Connection, Pool, Runtime};
use redis::AsyncCommands;
use std::collections::HashMap;
use std::time::Duration;
use tracing::debug;

use super::{ttl_millis, use_precise, Backend};
use crate::{ttl, CacheError, Context, RedisConfig, RedisOptions, Result};

/// Redis-backed command execution
#[derive(Clone)]
pub struct RedisBackend {
    config: RedisConfig,
    pool: Pool,
}

impl RedisBackend {
    /// Create a new Redis backend.
    ///
    /// Fails only when the configuration cannot describe a pool; connectivity
    /// is not checked here (use [`Backend::ping`]).
    pub fn new(config: RedisConfig) -> Result<Self> {
        debug!(
            "Creating Redis backend: addr={}, pool_size={}",
            config.addr(),
            config.pool_size
        );

        let pool = PoolConfig::from_url(config.url())
            .builder()
            .map_err(|e| CacheError::Backend(format!("Failed to create pool builder: {}", e)))?
            .max_size(config.pool_size)
            .runtime(Runtime::Tokio1)
            .build()
            .map_err(|e| CacheError::Backend(format!("Failed to create pool: {}", e)))?;

        Ok(Self { config, pool })
    }

    pub fn config(&self) -> &RedisConfig {
        &self.config
    }

    /// Get a connection from the pool
    async fn conn(&self) -> Result<Connection> {
        Ok(self.pool.get().await?)
    }
}

#[async_trait]
impl Backend for RedisBackend {
    async fn get(&self, ctx: &Context, key: &str) -> Result<Option<Vec<u8>>> {
        debug!(key = %key, "Redis GET");
        ctx.run(async {
            let mut conn = self.conn().await?;
            let value: Option<Vec<u8>> = conn.get(key).await?;
            Ok(value)
        })
        .await
    }

    async fn set(
        &self,
        ctx: &Context,
        key: &str,
        value: Vec<u8>,
        ttl: Option<Duration>,
    ) -> Result<()> {
        debug!(key = %key, ttl = ?ttl, "Redis SET");
        ctx.run(async {
            let mut conn = self.conn().await?;
            match ttl {
                Some(ttl) if ttl.is_zero() => conn.set::<_, _, ()>(key, value).await?,
                Some(ttl) if use_precise(ttl) => {
                    conn.pset_ex::<_, _, ()>(key, value, ttl_millis(ttl))
                        .await?
                }
                Some(ttl) => conn.set_ex::<_, _, ()>(key, value, ttl.as_secs()).await?,
                None => conn.set::<_, _, ()>(key, value).await?,
            }
            Ok(())
        })
        .await
    }

    async fn hgetall(&self, ctx: &Context, key: &str) -> Result<HashMap<String, String>> {
        debug!(key = %key, "Redis HGETALL");
        ctx.run(async {
            let mut conn = self.conn().await?;
            let fields: HashMap<String, String> = conn.hgetall(key).await?;
            Ok(fields)
        })
        .await
    }

    async fn hset(&self, ctx: &Context, key: &str, fields: Vec<(String, String)>) -> Result<u64> {
        debug!(key = %key, fields = fields.len(), "Redis HSET");
        ctx.run(async {
            let mut conn = self.conn().await?;
            let added: u64 = redis::cmd("HSET")
                .arg(key)
                .arg(&fields)
                .query_async(&mut conn)
                .await?;
            Ok(added)
        })
        .await
    }

    async fn expire(&self, ctx: &Context, key: &str, ttl: Duration) -> Result<bool> {
        debug!(key = %key, ttl = ?ttl, "Redis EXPIRE");
        ctx.run(async {
            let mut conn = self.conn().await?;
            let updated: bool = if use_precise(ttl) {
                conn.pexpire(key, ttl_millis(ttl) as i64).await?
            } else {
                conn.expire(key, ttl.as_secs() as i64).await?
            };
            Ok(updated)
        })
        .await
    }

    async fn del(&self, ctx: &Context, keys: &[String]) -> Result<u64> {
        debug!(keys = ?keys, "Redis DEL");
        ctx.run(async {
            let mut conn = self.conn().await?;
            let removed: u64 = conn.del(keys.to_vec()).await?;
            Ok(removed)
        })
        .await
    }

    async fn exists(&self, ctx: &Context, keys: &[String]) -> Result<u64> {
        debug!(keys = ?keys, "Redis EXISTS");
        ctx.run(async {
            let mut conn = self.conn().await?;
            let count: u64 = conn.exists(keys.to_vec()).await?;
            Ok(count)
        })
        .await
    }

    async fn incr_by(&self, ctx: &Context, key: &str, delta: i64) -> Result<i64> {
        debug!(key = %key, delta, "Redis INCRBY");
        ctx.run(async {
            let mut conn = self.conn().await?;
            let value: i64 = conn.incr(key, delta).await?;
            Ok(value)
        })
        .await
    }

    async fn decr_by(&self, ctx: &Context, key: &str, delta: i64) -> Result<i64> {
        debug!(key = %key, delta, "Redis DECRBY");
        ctx.run(async {
            let mut conn = self.conn().await?;
            let value: i64 = conn.decr(key, delta).await?;
            Ok(value)
        })
        .await
    }

    async fn keys(&self, ctx: &Context, pattern: &str) -> Result<Vec<String>> {
        debug!(pattern = %pattern, "Redis KEYS");
        ctx.run(async {
            let mut conn = self.conn().await?;
            let keys: Vec<String> = conn.keys(pattern).await?;
            Ok(keys)
        })
        .await
    }

    async fn ttl(&self, ctx: &Context, key: &str) -> Result<chrono::Duration> {
        debug!(key = %key, "Redis TTL");
        ctx.run(async {
            let mut conn = self.conn().await?;
            let secs: i64 = conn.ttl(key).await?;
            Ok(ttl::from_secs(secs))
        })
        .await
    }

    async fn ping(&self, ctx: &Context) -> Result<String> {
        debug!("Redis PING");
        ctx.run(async {
            let mut conn = self.conn().await?;
            let pong: String = redis::cmd("PING").query_async(&mut conn).await?;
            Ok(pong)
        })
        .await
    }

    fn options(&self) -> Option<RedisOptions> {
        Some(self.config.options())
    }
}
