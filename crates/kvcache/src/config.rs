//! Connection configuration

use serde::{Deserialize, Serialize};

/// Redis connection configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RedisConfig {
    /// Host name or IP address (e.g., "localhost")
    pub address: String,
    /// TCP port
    pub port: u16,
    /// Password (empty = no authentication)
    pub password: String,
    /// Connection pool size
    pub pool_size: usize,
}

impl Default for RedisConfig {
    fn default() -> Self {
        Self {
            address: "localhost".to_string(),
            port: 6379,
            password: String::new(),
            pool_size: 10,
        }
    }
}

impl RedisConfig {
    /// Create a configuration from address, port and credential
    pub fn new(address: impl Into<String>, port: u16, password: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            port,
            password: password.into(),
            ..Self::default()
        }
    }

    /// Set the connection pool size
    pub fn with_pool_size(mut self, pool_size: usize) -> Self {
        self.pool_size = pool_size;
        self
    }

    /// Connection target as `host:port`
    pub fn addr(&self) -> String {
        format!("{}:{}", self.address, self.port)
    }

    /// Redis URL for this configuration (e.g., "redis://:secret@localhost:6379")
    pub fn url(&self) -> String {
        if self.password.is_empty() {
            format!("redis://{}", self.addr())
        } else {
            format!(
                "redis://:{}@{}",
                urlencoding::encode(&self.password),
                self.addr()
            )
        }
    }

    /// Effective connection options
    pub fn options(&self) -> RedisOptions {
        RedisOptions {
            addr: self.addr(),
            password: self.password.clone(),
        }
    }
}

/// Connection descriptor derived from [`RedisConfig`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RedisOptions {
    /// Connection target as `host:port`
    pub addr: String,
    /// Password (empty = no authentication)
    pub password: String,
}
