//! Server configuration

use crate::ServerError;
use std::path::PathBuf;

/// Server settings, usually read from the environment
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    /// Interface to bind
    pub host: String,
    pub port: u16,
    /// Root of the counter directories
    pub stats_dir: PathBuf,
    /// Directory served for everything that is not an endpoint
    pub static_root: PathBuf,
    /// Time a client gets to send its request
    pub read_timeout_ms: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
            stats_dir: PathBuf::from("stats"),
            static_root: PathBuf::from("."),
            read_timeout_ms: 10_000,
        }
    }
}

impl ServerConfig {
    /// Read `PORT`, `STATS_DIR`, `STATIC_ROOT` and `READ_TIMEOUT_MS`
    pub fn from_env() -> Result<Self, ServerError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as `from_env` with an explicit variable source
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ServerError> {
        let mut config = Self::default();
        if let Some(port) = lookup("PORT") {
            config.port = port
                .trim()
                .parse()
                .map_err(|_| ServerError::InvalidPort(port.clone()))?;
        }
        if let Some(dir) = lookup("STATS_DIR") {
            config.stats_dir = PathBuf::from(dir);
        }
        if let Some(root) = lookup("STATIC_ROOT") {
            config.static_root = PathBuf::from(root);
        }
        if let Some(ms) = lookup("READ_TIMEOUT_MS") {
            config.read_timeout_ms = ms
                .trim()
                .parse()
                .map_err(|_| ServerError::InvalidTimeout(ms.clone()))?;
        }
        Ok(config)
    }

    /// `host:port` to bind
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
