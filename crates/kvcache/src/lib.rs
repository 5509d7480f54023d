//! kvcache: typed JSON cache adapter
//!
//! Wraps a Redis-compatible key-value store behind a small typed interface.
//! Scalar values travel as JSON text, hash fields as plain strings, and every
//! call takes a [`Context`] carrying cancellation and an optional deadline.
//!
//! ```no_run
//! use kvcache::{Context, KvCache, RedisConfig};
//! use std::time::Duration;
//!
//! # async fn demo() -> kvcache::Result<()> {
//! let cache = KvCache::new(RedisConfig::default())?;
//! let ctx = Context::background().with_timeout(Duration::from_secs(1));
//!
//! cache.put(&ctx, "greeting", &"hello", None).await?;
//! let greeting: String = cache.get(&ctx, "greeting").await?;
//! assert_eq!(greeting, "hello");
//! # Ok(())
//! # }
//! ```

pub mod backend;
pub mod cache;
pub mod config;
pub mod context;
pub mod error;
pub mod ttl;

// Re-exports
pub use backend::{Backend, MemoryBackend, MockBackend, Reply};
pub use cache::KvCache;
pub use config::{RedisConfig, RedisOptions};
pub use context::Context;
pub use error::{CacheError, Result};

#[cfg(feature = "redis")]
pub use backend::RedisBackend;
