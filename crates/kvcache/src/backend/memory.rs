//! In-memory backend
//!
//! Thread-safe, process-local store that follows Redis command semantics
//! closely enough to stand in for a server in tests: lazy expiry, WRONGTYPE
//! errors, integer-only counters, glob key listing and the TTL sentinels.

use async_trait::async_trait;
use dashmap::mapref::entry::Entry as MapEntry;
use dashmap::DashMap;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::debug;

use super::Backend;
use crate::{ttl, CacheError, Context, Result};

const WRONG_TYPE: &str =
    "WRONGTYPE Operation against a key holding the wrong kind of value";
const NOT_AN_INTEGER: &str = "ERR value is not an integer or out of range";

#[derive(Debug, Clone)]
enum Value {
    Bytes(Vec<u8>),
    Hash(HashMap<String, String>),
}

#[derive(Debug, Clone)]
struct Entry {
    value: Value,
    expires_at: Option<Instant>,
}

impl Entry {
    fn is_expired(&self, now: Instant) -> bool {
        matches!(self.expires_at, Some(at) if at <= now)
    }
}

/// In-memory backend (thread-safe, non-distributed)
#[derive(Clone, Default)]
pub struct MemoryBackend {
    entries: Arc<DashMap<String, Entry>>,
    closed: Arc<AtomicBool>,
}

impl MemoryBackend {
    /// Create an empty in-memory backend
    pub fn new() -> Self {
        Self::default()
    }

    /// Close the backend; every later command fails with a backend error
    pub fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    /// Number of stored keys (including expired ones not yet evicted)
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn guard(&self, ctx: &Context) -> Result<()> {
        if self.is_closed() {
            return Err(CacheError::closed());
        }
        match ctx.err() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    /// Live entry for `key`, evicting it first if it has expired
    fn live(&self, key: &str) -> Option<Entry> {
        let now = Instant::now();
        self.entries.remove_if(key, |_, entry| entry.is_expired(now));
        self.entries.get(key).map(|entry| entry.clone())
    }

    fn adjust(&self, key: &str, delta: i64) -> Result<i64> {
        let now = Instant::now();
        match self.entries.entry(key.to_string()) {
            MapEntry::Occupied(mut occupied) => {
                if occupied.get().is_expired(now) {
                    occupied.insert(Entry {
                        value: Value::Bytes(delta.to_string().into_bytes()),
                        expires_at: None,
                    });
                    return Ok(delta);
                }
                let entry = occupied.get_mut();
                let current = match &entry.value {
                    Value::Bytes(bytes) => parse_integer(bytes)?,
                    Value::Hash(_) => return Err(CacheError::Backend(WRONG_TYPE.to_string())),
                };
                let next = current
                    .checked_add(delta)
                    .ok_or_else(|| {
                        CacheError::Backend("ERR increment or decrement would overflow".to_string())
                    })?;
                entry.value = Value::Bytes(next.to_string().into_bytes());
                Ok(next)
            }
            MapEntry::Vacant(vacant) => {
                vacant.insert(Entry {
                    value: Value::Bytes(delta.to_string().into_bytes()),
                    expires_at: None,
                });
                Ok(delta)
            }
        }
    }
}

fn parse_integer(bytes: &[u8]) -> Result<i64> {
    std::str::from_utf8(bytes)
        .ok()
        .and_then(|s| s.parse::<i64>().ok())
        .ok_or_else(|| CacheError::Backend(NOT_AN_INTEGER.to_string()))
}

/// Translate a Redis glob (`*`, `?`, `[...]`, `\x`) into an anchored regex.
///
/// `None` means no key can match, as with an empty or unterminated `[` class.
pub(crate) fn glob_to_regex(pattern: &str) -> Result<Option<regex::Regex>> {
    let mut out = String::with_capacity(pattern.len() * 2 + 6);
    out.push_str("(?s)^");

    let mut chars = pattern.chars();
    while let Some(c) = chars.next() {
        match c {
            '*' => out.push_str(".*"),
            '?' => out.push('.'),
            '\\' => {
                if let Some(escaped) = chars.next() {
                    out.push_str(&regex::escape(&escaped.to_string()));
                }
            }
            '[' => {
                let mut negated = false;
                let mut body = String::new();
                let mut closed = false;
                let mut first = true;
                while let Some(inner) = chars.next() {
                    match inner {
                        '^' if first => negated = true,
                        ']' => {
                            closed = true;
                            break;
                        }
                        '\\' => {
                            if let Some(escaped) = chars.next() {
                                body.push_str(&class_char(escaped));
                            }
                        }
                        other => body.push_str(&class_char(other)),
                    }
                    first = false;
                }
                match (closed, negated, body.is_empty()) {
                    (false, _, _) | (true, false, true) => return Ok(None),
                    (true, true, true) => out.push('.'),
                    (true, true, false) => out.push_str(&format!("[^{}]", body)),
                    (true, false, false) => out.push_str(&format!("[{}]", body)),
                }
            }
            other => out.push_str(&regex::escape(&other.to_string())),
        }
    }
    out.push('$');

    regex::Regex::new(&out)
        .map(Some)
        .map_err(|e| CacheError::Backend(format!("ERR invalid pattern {}: {}", pattern, e)))
}

fn class_char(c: char) -> String {
    match c {
        '-' => "-".to_string(),
        '\\' | '[' | ']' | '^' | '&' | '~' => format!("\\{}", c),
        other => other.to_string(),
    }
}

#[async_trait]
impl Backend for MemoryBackend {
    async fn get(&self, ctx: &Context, key: &str) -> Result<Option<Vec<u8>>> {
        self.guard(ctx)?;
        debug!(key = %key, "Memory GET");
        match self.live(key) {
            Some(Entry { value: Value::Bytes(bytes), .. }) => Ok(Some(bytes)),
            Some(_) => Err(CacheError::Backend(WRONG_TYPE.to_string())),
            None => Ok(None),
        }
    }

    async fn set(
        &self,
        ctx: &Context,
        key: &str,
        value: Vec<u8>,
        ttl: Option<Duration>,
    ) -> Result<()> {
        self.guard(ctx)?;
        debug!(key = %key, ttl = ?ttl, "Memory SET");
        let expires_at = ttl
            .filter(|ttl| !ttl.is_zero())
            .map(|ttl| Instant::now() + ttl);
        self.entries.insert(
            key.to_string(),
            Entry {
                value: Value::Bytes(value),
                expires_at,
            },
        );
        Ok(())
    }

    async fn hgetall(&self, ctx: &Context, key: &str) -> Result<HashMap<String, String>> {
        self.guard(ctx)?;
        debug!(key = %key, "Memory HGETALL");
        match self.live(key) {
            Some(Entry { value: Value::Hash(fields), .. }) => Ok(fields),
            Some(_) => Err(CacheError::Backend(WRONG_TYPE.to_string())),
            None => Ok(HashMap::new()),
        }
    }

    async fn hset(&self, ctx: &Context, key: &str, fields: Vec<(String, String)>) -> Result<u64> {
        self.guard(ctx)?;
        debug!(key = %key, fields = fields.len(), "Memory HSET");
        if fields.is_empty() {
            return Err(CacheError::Backend(
                "ERR wrong number of arguments for 'hset' command".to_string(),
            ));
        }

        let now = Instant::now();
        let mut entry = self.entries.entry(key.to_string()).or_insert_with(|| Entry {
            value: Value::Hash(HashMap::new()),
            expires_at: None,
        });
        if entry.is_expired(now) {
            *entry = Entry {
                value: Value::Hash(HashMap::new()),
                expires_at: None,
            };
        }
        match &mut entry.value {
            Value::Hash(hash) => {
                let mut added = 0;
                for (field, value) in fields {
                    if hash.insert(field, value).is_none() {
                        added += 1;
                    }
                }
                Ok(added)
            }
            Value::Bytes(_) => Err(CacheError::Backend(WRONG_TYPE.to_string())),
        }
    }

    async fn expire(&self, ctx: &Context, key: &str, ttl: Duration) -> Result<bool> {
        self.guard(ctx)?;
        debug!(key = %key, ttl = ?ttl, "Memory EXPIRE");
        if self.live(key).is_none() {
            return Ok(false);
        }
        if ttl.is_zero() {
            self.entries.remove(key);
            return Ok(true);
        }
        match self.entries.get_mut(key) {
            Some(mut entry) => {
                entry.expires_at = Some(Instant::now() + ttl);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn del(&self, ctx: &Context, keys: &[String]) -> Result<u64> {
        self.guard(ctx)?;
        debug!(keys = ?keys, "Memory DEL");
        let now = Instant::now();
        let mut removed = 0;
        for key in keys {
            if let Some((_, entry)) = self.entries.remove(key) {
                if !entry.is_expired(now) {
                    removed += 1;
                }
            }
        }
        Ok(removed)
    }

    async fn exists(&self, ctx: &Context, keys: &[String]) -> Result<u64> {
        self.guard(ctx)?;
        debug!(keys = ?keys, "Memory EXISTS");
        Ok(keys.iter().filter(|key| self.live(key).is_some()).count() as u64)
    }

    async fn incr_by(&self, ctx: &Context, key: &str, delta: i64) -> Result<i64> {
        self.guard(ctx)?;
        debug!(key = %key, delta, "Memory INCRBY");
        self.adjust(key, delta)
    }

    async fn decr_by(&self, ctx: &Context, key: &str, delta: i64) -> Result<i64> {
        self.guard(ctx)?;
        debug!(key = %key, delta, "Memory DECRBY");
        let delta = delta.checked_neg().ok_or_else(|| {
            CacheError::Backend("ERR decrement would overflow".to_string())
        })?;
        self.adjust(key, delta)
    }

    async fn keys(&self, ctx: &Context, pattern: &str) -> Result<Vec<String>> {
        self.guard(ctx)?;
        debug!(pattern = %pattern, "Memory KEYS");
        let Some(matcher) = glob_to_regex(pattern)? else {
            return Ok(Vec::new());
        };
        let now = Instant::now();
        let mut keys: Vec<String> = self
            .entries
            .iter()
            .filter(|entry| !entry.value().is_expired(now) && matcher.is_match(entry.key()))
            .map(|entry| entry.key().clone())
            .collect();
        keys.sort();
        Ok(keys)
    }

    async fn ttl(&self, ctx: &Context, key: &str) -> Result<chrono::Duration> {
        self.guard(ctx)?;
        debug!(key = %key, "Memory TTL");
        let secs = match self.live(key) {
            None => ttl::KEY_MISSING_SECS,
            Some(Entry { expires_at: None, .. }) => ttl::NO_EXPIRY_SECS,
            Some(Entry { expires_at: Some(at), .. }) => {
                // Rounded to the nearest second, like the server does
                let remaining = at.saturating_duration_since(Instant::now()).as_millis() as i64;
                (remaining + 500) / 1000
            }
        };
        Ok(ttl::from_secs(secs))
    }

    async fn ping(&self, ctx: &Context) -> Result<String> {
        self.guard(ctx)?;
        Ok("PONG".to_string())
    }
}
