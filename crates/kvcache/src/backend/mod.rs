//! Backend implementations
//!
//! [`Backend`] is the command-execution capability the cache adapter talks
//! to. The Redis backend is the production implementation; the memory and
//! mock backends are substitutable doubles for tests and local use.

use async_trait::async_trait;
use std::collections::HashMap;
use std::time::Duration;

use crate::{Context, RedisOptions, Result};

/// Minimal command set required by [`crate::KvCache`].
///
/// Every command receives the caller's [`Context`] and must fail with
/// [`crate::CacheError::Backend`] once it is cancelled or past its deadline.
/// Implementations must be safe to call concurrently.
#[async_trait]
pub trait Backend: Send + Sync + 'static {
    /// GET: raw payload, `None` when the key is absent
    async fn get(&self, ctx: &Context, key: &str) -> Result<Option<Vec<u8>>>;

    /// SET with an optional expiry (`None` = no expiry)
    async fn set(
        &self,
        ctx: &Context,
        key: &str,
        value: Vec<u8>,
        ttl: Option<Duration>,
    ) -> Result<()>;

    /// HGETALL: every field of a hash, empty when the key is absent
    async fn hgetall(&self, ctx: &Context, key: &str) -> Result<HashMap<String, String>>;

    /// HSET with several fields in one command, returns the number of new fields
    async fn hset(&self, ctx: &Context, key: &str, fields: Vec<(String, String)>) -> Result<u64>;

    /// EXPIRE, returns false when the key does not exist
    async fn expire(&self, ctx: &Context, key: &str, ttl: Duration) -> Result<bool>;

    /// DEL, returns the number of keys removed
    async fn del(&self, ctx: &Context, keys: &[String]) -> Result<u64>;

    /// EXISTS, returns how many of the given keys exist
    async fn exists(&self, ctx: &Context, keys: &[String]) -> Result<u64>;

    /// INCRBY, returns the new value
    async fn incr_by(&self, ctx: &Context, key: &str, delta: i64) -> Result<i64>;

    /// DECRBY, returns the new value
    async fn decr_by(&self, ctx: &Context, key: &str, delta: i64) -> Result<i64>;

    /// KEYS with a glob-style pattern
    async fn keys(&self, ctx: &Context, pattern: &str) -> Result<Vec<String>>;

    /// TTL, including the -2s (absent) and -1s (no expiry) sentinels
    async fn ttl(&self, ctx: &Context, key: &str) -> Result<chrono::Duration>;

    /// PING, returns the server's reply (normally "PONG")
    async fn ping(&self, ctx: &Context) -> Result<String>;

    /// Connection options, for backends that talk to a server
    fn options(&self) -> Option<RedisOptions> {
        None
    }
}

/// True when a TTL must be sent with millisecond precision
#[cfg_attr(not(feature = "redis"), allow(dead_code))]
pub(crate) fn use_precise(ttl: Duration) -> bool {
    ttl < Duration::from_secs(1) || ttl.subsec_nanos() != 0
}

/// TTL in whole milliseconds; a non-zero TTL never rounds down to 0
#[cfg_attr(not(feature = "redis"), allow(dead_code))]
pub(crate) fn ttl_millis(ttl: Duration) -> u64 {
    let ms = u64::try_from(ttl.as_millis()).unwrap_or(u64::MAX);
    if ms == 0 && !ttl.is_zero() {
        1
    } else {
        ms
    }
}

pub mod memory;
pub mod mock;

pub use memory::MemoryBackend;
pub use mock::{Command, Expect, MockBackend, Reply};

// Redis backend implementation
#[cfg(feature = "redis")]
pub mod redis;

#[cfg(feature = "redis")]
pub use self::redis::RedisBackend;
