//! Server configuration.

use crate::error::{ServerError, ServerResult};
use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;
use syncport_engine::EngineConfig;

/// Environment variable for the listen address.
pub const BIND_ENV: &str = "SYNCPORT_BIND";
/// Environment variable for the shared secret.
pub const SHARED_SECRET_ENV: &str = "SYNCPORT_SHARED_SECRET";
/// Environment variable for the per-batch write concurrency.
pub const MAX_CONCURRENCY_ENV: &str = "SYNCPORT_MAX_CONCURRENCY";
/// Environment variable for the per-record timeout, in seconds; `0` disables it.
pub const RECORD_TIMEOUT_ENV: &str = "SYNCPORT_RECORD_TIMEOUT_SECS";

/// Configuration for the connector server.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address to bind to.
    pub bind_addr: SocketAddr,
    /// Maximum request body size.
    pub max_body_bytes: usize,
    /// Secret required in the `secret` query parameter, if any.
    pub shared_secret: Option<String>,
    /// Batch engine settings.
    pub engine: EngineConfig,
}

impl ServerConfig {
    /// Creates a new server configuration.
    pub fn new(bind_addr: SocketAddr) -> Self {
        Self {
            bind_addr,
            max_body_bytes: 16 * 1024 * 1024,
            shared_secret: None,
            engine: EngineConfig::default(),
        }
    }

    /// Reads the configuration from the environment, falling back to defaults
    /// for unset variables.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError::Config`] if a variable is set but malformed.
    pub fn from_env() -> ServerResult<Self> {
        let mut config = Self::default();

        if let Some(bind_addr) = parse_env::<SocketAddr>(BIND_ENV)? {
            config.bind_addr = bind_addr;
        }
        if let Some(secret) = std::env::var(SHARED_SECRET_ENV).ok().filter(|s| !s.is_empty()) {
            config.shared_secret = Some(secret);
        }
        if let Some(max) = parse_env::<usize>(MAX_CONCURRENCY_ENV)? {
            config.engine = config.engine.with_max_concurrency(max);
        }
        match parse_env::<u64>(RECORD_TIMEOUT_ENV)? {
            Some(0) => config.engine = config.engine.without_record_timeout(),
            Some(secs) => {
                config.engine = config.engine.with_record_timeout(Duration::from_secs(secs))
            }
            None => {}
        }

        Ok(config)
    }

    /// Sets the bind address.
    pub fn with_bind_addr(mut self, bind_addr: SocketAddr) -> Self {
        self.bind_addr = bind_addr;
        self
    }

    /// Sets the maximum request body size.
    pub fn with_max_body_bytes(mut self, max: usize) -> Self {
        self.max_body_bytes = max;
        self
    }

    /// Requires `secret` on every RPC call.
    pub fn with_shared_secret(mut self, secret: impl Into<String>) -> Self {
        self.shared_secret = Some(secret.into());
        self
    }

    /// Sets the batch engine settings.
    pub fn with_engine(mut self, engine: EngineConfig) -> Self {
        self.engine = engine;
        self
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self::new(SocketAddr::from(([127, 0, 0, 1], 6161)))
    }
}

fn parse_env<T>(var: &str) -> ServerResult<Option<T>>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match std::env::var(var) {
        Ok(raw) if !raw.trim().is_empty() => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|e| ServerError::Config(format!("{var}={raw}: {e}"))),
        _ => Ok(None),
    }
}
