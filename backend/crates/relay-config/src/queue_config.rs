use crate::{ConfigError, ConfigErrorResult};

use std::str::FromStr;

use serde::Deserialize;

// Poll interval constraints (milliseconds)
pub const MIN_POLL_INTERVAL_MS: u64 = 10;
pub const MAX_POLL_INTERVAL_MS: u64 = 60000;
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 1000;

pub const DEFAULT_REDIS_URL: &str = "redis://127.0.0.1:6379";
pub const DEFAULT_QUEUE_KEY: &str = "relay:notifications";

/// Where queued notifications are read from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum QueueBackend {
    /// Redis list (producer RPUSH, relay LPOP)
    #[default]
    Redis,
    /// In-process queue, for local development without Redis
    Memory,
}

impl QueueBackend {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Redis => "redis",
            Self::Memory => "memory",
        }
    }
}

impl FromStr for QueueBackend {
    type Err = ConfigError;

    #[track_caller]
    fn from_str(s: &str) -> ConfigErrorResult<Self> {
        match s.to_lowercase().as_str() {
            "redis" => Ok(Self::Redis),
            "memory" => Ok(Self::Memory),
            other => Err(ConfigError::queue(format!(
                "queue.backend must be 'redis' or 'memory', got '{other}'"
            ))),
        }
    }
}

/// Source queue settings for the dispatch loop
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct QueueConfig {
    pub backend: QueueBackend,
    pub redis_url: String,
    /// Redis list key holding pending items
    pub key: String,
    /// Sleep between polls when the queue is empty
    pub poll_interval_ms: u64,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            backend: QueueBackend::default(),
            redis_url: String::from(DEFAULT_REDIS_URL),
            key: String::from(DEFAULT_QUEUE_KEY),
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
        }
    }
}

impl QueueConfig {
    pub fn validate(&self) -> ConfigErrorResult<()> {
        if self.poll_interval_ms < MIN_POLL_INTERVAL_MS
            || self.poll_interval_ms > MAX_POLL_INTERVAL_MS
        {
            return Err(ConfigError::queue(format!(
                "queue.poll_interval_ms must be {}-{}, got {}",
                MIN_POLL_INTERVAL_MS, MAX_POLL_INTERVAL_MS, self.poll_interval_ms
            )));
        }

        if self.key.trim().is_empty() {
            return Err(ConfigError::queue("queue.key cannot be empty"));
        }

        if self.backend == QueueBackend::Redis
            && !(self.redis_url.starts_with("redis://") || self.redis_url.starts_with("rediss://"))
        {
            return Err(ConfigError::queue(format!(
                "queue.redis_url must start with redis:// or rediss://, got '{}'",
                self.redis_url
            )));
        }

        Ok(())
    }

    /// Redis URL with any password masked, for logging
    pub fn redacted_url(&self) -> String {
        match (self.redis_url.find("://"), self.redis_url.rfind('@')) {
            (Some(scheme_end), Some(at)) if at > scheme_end => format!(
                "{}://***{}",
                &self.redis_url[..scheme_end],
                &self.redis_url[at..]
            ),
            _ => self.redis_url.clone(),
        }
    }
}
