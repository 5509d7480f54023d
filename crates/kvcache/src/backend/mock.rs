//! Expectation-driven backend double
//!
//! Commands are matched in the order they were expected. Each expectation
//! carries a scripted [`Reply`]; an unexpected command, a mismatched argument
//! or a reply of the wrong shape fails the call with a backend error.
//!
//! ```
//! use kvcache::{Context, KvCache, MockBackend};
//! use std::sync::Arc;
//!
//! # tokio_test::block_on(async {
//! let mock = MockBackend::new();
//! mock.expect_get("key1").returns_bytes("\"value1\"");
//!
//! let cache = KvCache::with_backend(Arc::new(mock.clone()));
//! let value: String = cache.get(&Context::background(), "key1").await.unwrap();
//! assert_eq!(value, "value1");
//! mock.expectations_were_met().unwrap();
//! # });
//! ```

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::Duration;

use super::Backend;
use crate::{CacheError, Context, Result};

/// A command as seen by the backend
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Get { key: String },
    Set { key: String, value: Vec<u8>, ttl: Option<Duration> },
    HGetAll { key: String },
    HSet { key: String, fields: Vec<(String, String)> },
    Expire { key: String, ttl: Duration },
    Del { keys: Vec<String> },
    Exists { keys: Vec<String> },
    IncrBy { key: String, delta: i64 },
    DecrBy { key: String, delta: i64 },
    Keys { pattern: String },
    Ttl { key: String },
    Ping,
}

/// Scripted reply for an expected command
#[derive(Debug, Clone, PartialEq)]
pub enum Reply {
    /// Key absent (GET)
    Nil,
    /// Acknowledgement with no payload (SET)
    Ok,
    Bytes(Vec<u8>),
    Int(i64),
    Bool(bool),
    Hash(HashMap<String, String>),
    Keys(Vec<String>),
    Ttl(chrono::Duration),
    Status(String),
    Err(CacheError),
}

#[derive(Debug)]
struct Expectation {
    command: Command,
    reply: Reply,
}

/// Backend double that replays scripted replies
#[derive(Clone, Default)]
pub struct MockBackend {
    expected: Arc<Mutex<VecDeque<Expectation>>>,
    calls: Arc<Mutex<Vec<Command>>>,
}

/// Pending expectation, registered once a reply is attached
#[must_use = "an expectation is only registered once a reply is attached"]
pub struct Expect<'a> {
    mock: &'a MockBackend,
    command: Command,
}

impl Expect<'_> {
    pub fn returns(self, reply: Reply) {
        self.mock.expected.lock().push_back(Expectation {
            command: self.command,
            reply,
        });
    }

    pub fn returns_nil(self) {
        self.returns(Reply::Nil)
    }

    pub fn returns_ok(self) {
        self.returns(Reply::Ok)
    }

    pub fn returns_bytes(self, bytes: impl Into<Vec<u8>>) {
        self.returns(Reply::Bytes(bytes.into()))
    }

    pub fn returns_int(self, value: i64) {
        self.returns(Reply::Int(value))
    }

    pub fn returns_bool(self, value: bool) {
        self.returns(Reply::Bool(value))
    }

    pub fn returns_err(self, err: CacheError) {
        self.returns(Reply::Err(err))
    }
}

impl MockBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Expect an arbitrary command
    pub fn expect(&self, command: Command) -> Expect<'_> {
        Expect { mock: self, command }
    }

    pub fn expect_get(&self, key: impl Into<String>) -> Expect<'_> {
        self.expect(Command::Get { key: key.into() })
    }

    pub fn expect_set(
        &self,
        key: impl Into<String>,
        value: impl Into<Vec<u8>>,
        ttl: Option<Duration>,
    ) -> Expect<'_> {
        self.expect(Command::Set {
            key: key.into(),
            value: value.into(),
            ttl,
        })
    }

    pub fn expect_hgetall(&self, key: impl Into<String>) -> Expect<'_> {
        self.expect(Command::HGetAll { key: key.into() })
    }

    /// Fields are compared in field-name order
    pub fn expect_hset<F, V>(&self, key: impl Into<String>, fields: &[(F, V)]) -> Expect<'_>
    where
        F: AsRef<str>,
        V: AsRef<str>,
    {
        let mut fields: Vec<(String, String)> = fields
            .iter()
            .map(|(f, v)| (f.as_ref().to_string(), v.as_ref().to_string()))
            .collect();
        fields.sort();
        self.expect(Command::HSet {
            key: key.into(),
            fields,
        })
    }

    pub fn expect_expire(&self, key: impl Into<String>, ttl: Duration) -> Expect<'_> {
        self.expect(Command::Expire {
            key: key.into(),
            ttl,
        })
    }

    pub fn expect_del(&self, keys: &[&str]) -> Expect<'_> {
        self.expect(Command::Del {
            keys: keys.iter().map(|k| k.to_string()).collect(),
        })
    }

    pub fn expect_exists(&self, keys: &[&str]) -> Expect<'_> {
        self.expect(Command::Exists {
            keys: keys.iter().map(|k| k.to_string()).collect(),
        })
    }

    pub fn expect_incr_by(&self, key: impl Into<String>, delta: i64) -> Expect<'_> {
        self.expect(Command::IncrBy {
            key: key.into(),
            delta,
        })
    }

    pub fn expect_decr_by(&self, key: impl Into<String>, delta: i64) -> Expect<'_> {
        self.expect(Command::DecrBy {
            key: key.into(),
            delta,
        })
    }

    pub fn expect_keys(&self, pattern: impl Into<String>) -> Expect<'_> {
        self.expect(Command::Keys {
            pattern: pattern.into(),
        })
    }

    pub fn expect_ttl(&self, key: impl Into<String>) -> Expect<'_> {
        self.expect(Command::Ttl { key: key.into() })
    }

    pub fn expect_ping(&self) -> Expect<'_> {
        self.expect(Command::Ping)
    }

    /// Fails if any expectation was never consumed
    pub fn expectations_were_met(&self) -> Result<()> {
        let expected = self.expected.lock();
        if expected.is_empty() {
            return Ok(());
        }
        Err(CacheError::Backend(format!(
            "there are {} expectations left, next: {:?}",
            expected.len(),
            expected.front().map(|e| &e.command)
        )))
    }

    /// Every command received so far, in order
    pub fn calls(&self) -> Vec<Command> {
        self.calls.lock().clone()
    }

    fn call(&self, ctx: &Context, command: Command) -> Result<Reply> {
        if let Some(err) = ctx.err() {
            return Err(err);
        }
        self.calls.lock().push(command.clone());

        let expectation = self.expected.lock().pop_front().ok_or_else(|| {
            CacheError::Backend(format!(
                "all expectations were already fulfilled, call to {:?} was not expected",
                command
            ))
        })?;
        if expectation.command != command {
            return Err(CacheError::Backend(format!(
                "call to {:?} was not expected, expected {:?}",
                command, expectation.command
            )));
        }

        match expectation.reply {
            Reply::Err(err) => Err(err),
            reply => Ok(reply),
        }
    }
}

fn unexpected(reply: Reply, command: &str) -> CacheError {
    CacheError::Backend(format!("unexpected reply {:?} for {}", reply, command))
}

#[async_trait]
impl Backend for MockBackend {
    async fn get(&self, ctx: &Context, key: &str) -> Result<Option<Vec<u8>>> {
        match self.call(ctx, Command::Get { key: key.to_string() })? {
            Reply::Nil => Ok(None),
            Reply::Bytes(bytes) => Ok(Some(bytes)),
            Reply::Status(text) => Ok(Some(text.into_bytes())),
            other => Err(unexpected(other, "GET")),
        }
    }

    async fn set(
        &self,
        ctx: &Context,
        key: &str,
        value: Vec<u8>,
        ttl: Option<Duration>,
    ) -> Result<()> {
        let command = Command::Set {
            key: key.to_string(),
            value,
            ttl,
        };
        match self.call(ctx, command)? {
            Reply::Ok | Reply::Status(_) => Ok(()),
            other => Err(unexpected(other, "SET")),
        }
    }

    async fn hgetall(&self, ctx: &Context, key: &str) -> Result<HashMap<String, String>> {
        match self.call(ctx, Command::HGetAll { key: key.to_string() })? {
            Reply::Hash(fields) => Ok(fields),
            Reply::Nil => Ok(HashMap::new()),
            other => Err(unexpected(other, "HGETALL")),
        }
    }

    async fn hset(&self, ctx: &Context, key: &str, mut fields: Vec<(String, String)>) -> Result<u64> {
        fields.sort();
        let command = Command::HSet {
            key: key.to_string(),
            fields,
        };
        match self.call(ctx, command)? {
            Reply::Int(added) if added >= 0 => Ok(added as u64),
            other => Err(unexpected(other, "HSET")),
        }
    }

    async fn expire(&self, ctx: &Context, key: &str, ttl: Duration) -> Result<bool> {
        let command = Command::Expire {
            key: key.to_string(),
            ttl,
        };
        match self.call(ctx, command)? {
            Reply::Bool(updated) => Ok(updated),
            other => Err(unexpected(other, "EXPIRE")),
        }
    }

    async fn del(&self, ctx: &Context, keys: &[String]) -> Result<u64> {
        match self.call(ctx, Command::Del { keys: keys.to_vec() })? {
            Reply::Int(removed) if removed >= 0 => Ok(removed as u64),
            other => Err(unexpected(other, "DEL")),
        }
    }

    async fn exists(&self, ctx: &Context, keys: &[String]) -> Result<u64> {
        match self.call(ctx, Command::Exists { keys: keys.to_vec() })? {
            Reply::Int(count) if count >= 0 => Ok(count as u64),
            other => Err(unexpected(other, "EXISTS")),
        }
    }

    async fn incr_by(&self, ctx: &Context, key: &str, delta: i64) -> Result<i64> {
        let command = Command::IncrBy {
            key: key.to_string(),
            delta,
        };
        match self.call(ctx, command)? {
            Reply::Int(value) => Ok(value),
            other => Err(unexpected(other, "INCRBY")),
        }
    }

    async fn decr_by(&self, ctx: &Context, key: &str, delta: i64) -> Result<i64> {
        let command = Command::DecrBy {
            key: key.to_string(),
            delta,
        };
        match self.call(ctx, command)? {
            Reply::Int(value) => Ok(value),
            other => Err(unexpected(other, "DECRBY")),
        }
    }

    async fn keys(&self, ctx: &Context, pattern: &str) -> Result<Vec<String>> {
        let command = Command::Keys {
            pattern: pattern.to_string(),
        };
        match self.call(ctx, command)? {
            Reply::Keys(keys) => Ok(keys),
            other => Err(unexpected(other, "KEYS")),
        }
    }

    async fn ttl(&self, ctx: &Context, key: &str) -> Result<chrono::Duration> {
        match self.call(ctx, Command::Ttl { key: key.to_string() })? {
            Reply::Ttl(ttl) => Ok(ttl),
            Reply::Int(secs) => Ok(crate::ttl::from_secs(secs)),
            other => Err(unexpected(other, "TTL")),
        }
    }

    async fn ping(&self, ctx: &Context) -> Result<String> {
        match self.call(ctx, Command::Ping)? {
            Reply::Status(text) => Ok(text),
            Reply::Ok => Ok("PONG".to_string()),
            other => Err(unexpected(other, "PING")),
        }
    }
}
