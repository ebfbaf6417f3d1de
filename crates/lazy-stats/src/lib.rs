//! Lazy Stats
//!
//! Per-day visit and download counters over HTTP/1.1, plus static file
//! serving for the page itself. Counters live in plain-text files:
//! `<stats_dir>/visits/2024-01-01.txt` holds a single integer.

mod config;
mod http;
mod server;
mod service;
mod store;

pub use config::ServerConfig;
pub use http::{MAX_LINE, Request, Response, read_request};
pub use server::{DEFAULT_READ_TIMEOUT, StatServer};
pub use service::StatService;
pub use store::{DailyStats, StatDate, StatError, StatKind, StatStore};

/// Server error
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error("Invalid PORT value: {0}")]
    InvalidPort(String),

    #[error("Invalid READ_TIMEOUT_MS value: {0}")]
    InvalidTimeout(String),

    #[error("Malformed request: {0}")]
    BadRequest(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Stat(#[from] StatError),
}
