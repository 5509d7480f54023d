//! Basic usage example for the cache adapter
//!
//! Run this example with:
//! ```
//! # Terminal 1: Start Redis
//! redis-server
//!
//! # Terminal 2: Run the example
//! cargo run -p kvcache --example basic_usage
//! ```

use kvcache::{ttl, Context, KvCache, RedisConfig};
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Serialize, Deserialize)]
struct User {
    id: u64,
    name: String,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt::init();
    println!("=== kvcache Example ===\n");

    let config = RedisConfig::new("localhost", 6379, "");
    let cache = KvCache::new(config)?;
    let ctx = Context::background().with_timeout(Duration::from_secs(5));

    println!("1. Pinging server...");
    cache.ping(&ctx).await?;
    println!("   OK\n");

    println!("2. Storing a JSON value with 60 second TTL...");
    let user = User { id: 1, name: "Alice".to_string() };
    cache.put(&ctx, "user:1", &user, Some(Duration::from_secs(60))).await?;
    let back: User = cache.get(&ctx, "user:1").await?;
    println!("   Got user:1 = {:?}", back);
    println!("   TTL = {}s\n", cache.ttl(&ctx, "user:1").await?.num_seconds());

    println!("3. Working with hashes...");
    cache
        .hset(&ctx, "user:1:profile", [("city", "Taipei"), ("lang", "en")])
        .await?;
    println!("   {:?}\n", cache.hgetall(&ctx, "user:1:profile").await?);

    println!("4. Working with counters...");
    println!("   After INCR 5: {}", cache.increment(&ctx, "visits", 5).await?);
    println!("   After DECR 3: {}\n", cache.decrement(&ctx, "visits", 3).await?);

    println!("5. Listing keys...");
    println!("   user:* = {:?}\n", cache.keys(&ctx, "user:*").await?);

    println!("6. Cleaning up...");
    let removed = cache
        .delete(&ctx, &["user:1", "user:1:profile", "visits"])
        .await?;
    println!("   Removed {} keys", removed);
    let gone = ttl::is_key_missing(&cache.ttl(&ctx, "user:1").await?);
    println!("   user:1 gone: {}\n", gone);

    println!("=== Example Complete ===");
    Ok(())
}
