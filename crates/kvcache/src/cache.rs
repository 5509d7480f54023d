//! Cache adapter
//!
//! [`KvCache`] turns typed calls into backend commands and normalizes the
//! replies: scalar values are JSON-encoded on the way in and decoded on the
//! way out, absence becomes [`CacheError::NotFound`], and everything the
//! backend reports is passed through as [`CacheError::Backend`].
//!
//! The adapter keeps no state besides the backend handle. Cloning it is
//! cheap and clones share the same connection pool.

use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

use crate::backend::Backend;
use crate::{CacheError, Context, RedisOptions, Result};

#[cfg(feature = "redis")]
use crate::{backend::RedisBackend, RedisConfig};

/// Typed key-value cache over a [`Backend`]
#[derive(Clone)]
pub struct KvCache {
    backend: Arc<dyn Backend>,
}

impl KvCache {
    /// Build a cache over Redis from address, port and password.
    ///
    /// Connectivity is not verified; call [`KvCache::ping`] for that.
    #[cfg(feature = "redis")]
    pub fn new(config: RedisConfig) -> Result<Self> {
        let backend = RedisBackend::new(config)?;
        Ok(Self::with_backend(Arc::new(backend)))
    }

    /// Build a cache over any backend
    pub fn with_backend(backend: Arc<dyn Backend>) -> Self {
        Self { backend }
    }

    /// Backend this cache forwards to
    pub fn backend(&self) -> &Arc<dyn Backend> {
        &self.backend
    }

    /// Connection options of the underlying backend, if it has any
    pub fn options(&self) -> Option<RedisOptions> {
        self.backend.options()
    }

    /// Fetch `key` and decode its JSON payload into `T`
    pub async fn get<T: DeserializeOwned>(&self, ctx: &Context, key: &str) -> Result<T> {
        debug!(key = %key, "Getting value");

        let payload = self
            .backend
            .get(ctx, key)
            .await?
            .ok_or_else(|| CacheError::NotFound(key.to_string()))?;

        serde_json::from_slice(&payload).map_err(|e| {
            warn!(key = %key, error = %e, "Stored value is not valid JSON for the requested type");
            CacheError::Decode(format!("Failed to decode value for {}: {}", key, e))
        })
    }

    /// JSON-encode `value` and store it under `key`.
    ///
    /// A zero or absent `ttl` stores without expiry. Encoding happens before
    /// any backend call, so an unencodable value never reaches the store.
    pub async fn put<T: Serialize + ?Sized>(
        &self,
        ctx: &Context,
        key: &str,
        value: &T,
        ttl: Option<Duration>,
    ) -> Result<()> {
        let payload = serde_json::to_vec(value).map_err(|e| {
            warn!(key = %key, error = %e, "Refusing to store unencodable value");
            CacheError::Encode(format!("Failed to encode value for {}: {}", key, e))
        })?;

        let ttl = ttl.filter(|ttl| !ttl.is_zero());
        debug!(key = %key, ttl = ?ttl, bytes = payload.len(), "Putting value");

        self.backend.set(ctx, key, payload, ttl).await
    }

    /// Fetch every field of the hash at `key`.
    ///
    /// An empty reply is reported as [`CacheError::NotFound`]: the store
    /// cannot tell an absent hash from one without fields.
    pub async fn hgetall(&self, ctx: &Context, key: &str) -> Result<HashMap<String, String>> {
        debug!(key = %key, "Getting hash");

        let fields = self.backend.hgetall(ctx, key).await?;
        if fields.is_empty() {
            return Err(CacheError::NotFound(key.to_string()));
        }
        Ok(fields)
    }

    /// Write several hash fields in a single command.
    ///
    /// Values are stored as their plain string form. A field given twice
    /// keeps its last value.
    pub async fn hset<I, F, V>(&self, ctx: &Context, key: &str, fields: I) -> Result<()>
    where
        I: IntoIterator<Item = (F, V)>,
        F: Into<String>,
        V: ToString,
    {
        let fields: Vec<(String, String)> = fields
            .into_iter()
            .map(|(field, value)| (field.into(), value.to_string()))
            .collect::<BTreeMap<_, _>>()
            .into_iter()
            .collect();

        debug!(key = %key, fields = fields.len(), "Setting hash fields");
        self.backend.hset(ctx, key, fields).await?;
        Ok(())
    }

    /// Set a time-to-live on `key`. A missing key is not an error.
    pub async fn expire(&self, ctx: &Context, key: &str, ttl: Duration) -> Result<()> {
        let updated = self.backend.expire(ctx, key, ttl).await?;
        if !updated {
            debug!(key = %key, "Expire on missing key ignored");
        }
        Ok(())
    }

    /// Remove `keys`, returning how many existed
    pub async fn delete<K: AsRef<str>>(&self, ctx: &Context, keys: &[K]) -> Result<u64> {
        if keys.is_empty() {
            return Ok(0);
        }
        let keys = owned_keys(keys);
        debug!(keys = ?keys, "Deleting keys");
        self.backend.del(ctx, &keys).await
    }

    /// True if at least one of `keys` exists
    pub async fn exists<K: AsRef<str>>(&self, ctx: &Context, keys: &[K]) -> Result<bool> {
        if keys.is_empty() {
            return Ok(false);
        }
        let keys = owned_keys(keys);
        let count = self.backend.exists(ctx, &keys).await?;
        debug!(keys = ?keys, count, "Checked existence");
        Ok(count > 0)
    }

    /// Atomically add `delta` to the counter at `key`
    pub async fn increment(&self, ctx: &Context, key: &str, delta: i64) -> Result<i64> {
        self.backend.incr_by(ctx, key, delta).await
    }

    /// Atomically subtract `delta` from the counter at `key`
    pub async fn decrement(&self, ctx: &Context, key: &str, delta: i64) -> Result<i64> {
        self.backend.decr_by(ctx, key, delta).await
    }

    /// Keys matching a glob-style pattern; empty when nothing matches
    pub async fn keys(&self, ctx: &Context, pattern: &str) -> Result<Vec<String>> {
        self.backend.keys(ctx, pattern).await
    }

    /// Remaining time-to-live.
    ///
    /// Sentinels are returned as-is: -2s for an absent key, -1s for a key
    /// without expiry (see [`crate::ttl`]).
    pub async fn ttl(&self, ctx: &Context, key: &str) -> Result<chrono::Duration> {
        self.backend.ttl(ctx, key).await
    }

    /// Liveness check
    pub async fn ping(&self, ctx: &Context) -> Result<()> {
        let reply = self.backend.ping(ctx).await?;
        debug!(reply = %reply, "Ping");
        Ok(())
    }
}

fn owned_keys<K: AsRef<str>>(keys: &[K]) -> Vec<String> {
    keys.iter().map(|k| k.as_ref().to_string()).collect()
}
