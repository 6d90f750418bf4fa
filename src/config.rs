use reqwest::Url;
use std::env;
use std::time::Duration;
use thiserror::Error;

fn env_usize(key: &str, default: usize) -> usize {
    env::var(key)
        .ok()
        .and_then(|value| value.parse::<usize>().ok())
        .unwrap_or(default)
}

fn env_duration_millis(key: &str, default_millis: u64) -> Duration {
    env::var(key)
        .ok()
        .and_then(|value| value.parse::<u64>().ok())
        .map(Duration::from_millis)
        .unwrap_or_else(|| Duration::from_millis(default_millis))
}

fn env_string(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

/// Reasons a [`GatewayConfig`] cannot be used to start the gateway.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("backend URL '{url}' is invalid: {reason}")]
    BackendUrl { url: String, reason: String },
    #[error("flush interval must be greater than zero")]
    ZeroInterval,
    #[error("flush threshold must be greater than zero")]
    ZeroThreshold,
    #[error("accumulator capacity must be greater than zero")]
    ZeroCapacity,
    #[error("flush threshold {threshold} exceeds accumulator capacity {capacity}")]
    ThresholdAboveCapacity { threshold: usize, capacity: usize },
}

/// Runtime configuration for write buffering and backend delivery.
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    pub backend_url: String,
    pub flush_interval: Duration,
    pub flush_threshold: usize,
    pub capacity: usize,
    pub backend_timeout: Duration,
    pub max_body_bytes: usize,
}

impl GatewayConfig {
    pub fn from_env() -> Self {
        Self {
            backend_url: env_string("BACKEND_URL", "http://localhost:9200"),
            flush_interval: env_duration_millis("FLUSH_INTERVAL_MS", 1_000),
            flush_threshold: env_usize("FLUSH_THRESHOLD", 1_000),
            capacity: env_usize("ACCUMULATOR_CAPACITY", 10_000),
            backend_timeout: env_duration_millis("BACKEND_TIMEOUT_MS", 30_000),
            max_body_bytes: env_usize("MAX_BODY_BYTES", 10 * 1024 * 1024),
        }
    }

    /// Check the invariants the scheduler and accumulator rely on.
    pub fn validate(&self) -> Result<(), ConfigError> {
        parse_backend_url(&self.backend_url)?;

        if self.flush_interval.is_zero() {
            return Err(ConfigError::ZeroInterval);
        }
        if self.flush_threshold == 0 {
            return Err(ConfigError::ZeroThreshold);
        }
        if self.capacity == 0 {
            return Err(ConfigError::ZeroCapacity);
        }
        if self.flush_threshold > self.capacity {
            return Err(ConfigError::ThresholdAboveCapacity {
                threshold: self.flush_threshold,
                capacity: self.capacity,
            });
        }

        Ok(())
    }
}

/// Parse a backend base URL, accepting only `http` and `https`.
pub fn parse_backend_url(raw: &str) -> Result<Url, ConfigError> {
    let url = Url::parse(raw).map_err(|err| ConfigError::BackendUrl {
        url: raw.to_string(),
        reason: err.to_string(),
    })?;

    match url.scheme() {
        "http" | "https" => Ok(url),
        other => Err(ConfigError::BackendUrl {
            url: raw.to_string(),
            reason: format!("unsupported scheme '{other}'"),
        }),
    }
}

/// Join a path (with optional query) onto the backend base URL, keeping any
/// path prefix the base already carries.
pub fn backend_endpoint(base: &Url, path_and_query: &str) -> Result<Url, ConfigError> {
    let mut joined = base.as_str().trim_end_matches('/').to_string();
    if !path_and_query.starts_with('/') {
        joined.push('/');
    }
    joined.push_str(path_and_query);
    Url::parse(&joined).map_err(|err| ConfigError::BackendUrl {
        url: joined,
        reason: err.to_string(),
    })
}
