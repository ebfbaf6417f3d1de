//! Counter storage
//!
//! One file per (kind, date). Increments are serialized through an async
//! mutex so concurrent requests never lose a count.

use serde::Serialize;
use smol::lock::Mutex;
use std::io;
use std::path::{Path, PathBuf};

/// Store error
#[derive(Debug, thiserror::Error)]
pub enum StatError {
    #[error("Invalid stat type: {0:?}")]
    InvalidType(String),

    #[error("Invalid date: {0:?} (expected YYYY-MM-DD)")]
    InvalidDate(String),

    #[error("Storage error: {0}")]
    Io(#[from] io::Error),

    #[error("Corrupt counter file {}: {content:?}", path.display())]
    Corrupt { path: PathBuf, content: String },
}

impl StatError {
    /// HTTP status for this error
    pub fn status(&self) -> u16 {
        match self {
            StatError::InvalidType(_) | StatError::InvalidDate(_) => 400,
            StatError::Io(_) | StatError::Corrupt { .. } => 500,
        }
    }
}

/// Counter kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StatKind {
    Visit,
    Download,
}

impl StatKind {
    pub const ALL: [StatKind; 2] = [StatKind::Visit, StatKind::Download];

    pub fn parse(s: &str) -> Result<Self, StatError> {
        match s {
            "visit" => Ok(StatKind::Visit),
            "download" => Ok(StatKind::Download),
            other => Err(StatError::InvalidType(other.to_string())),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            StatKind::Visit => "visit",
            StatKind::Download => "download",
        }
    }

    /// Directory holding this kind's counters
    pub fn dir_name(self) -> &'static str {
        match self {
            StatKind::Visit => "visits",
            StatKind::Download => "downloads",
        }
    }
}

/// A `YYYY-MM-DD` date; only the shape is checked
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct StatDate(String);

impl StatDate {
    pub fn parse(s: &str) -> Result<Self, StatError> {
        let b = s.as_bytes();
        let shaped = b.len() == 10
            && b[4] == b'-'
            && b[7] == b'-'
            && b.iter()
                .enumerate()
                .all(|(i, c)| i == 4 || i == 7 || c.is_ascii_digit());
        if shaped {
            Ok(Self(s.to_string()))
        } else {
            Err(StatError::InvalidDate(s.to_string()))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Both counters for one day
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DailyStats {
    pub date: String,
    pub visits: u64,
    pub downloads: u64,
}

/// File-backed counters
#[derive(Debug)]
pub struct StatStore {
    root: PathBuf,
    write_lock: Mutex<()>,
}

impl StatStore {
    /// Open the store, creating the per-kind directories
    pub async fn bootstrap(root: impl Into<PathBuf>) -> Result<Self, StatError> {
        let root = root.into();
        for kind in StatKind::ALL {
            smol::fs::create_dir_all(root.join(kind.dir_name())).await?;
        }
        tracing::info!("stat store ready at {}", root.display());
        Ok(Self {
            root,
            write_lock: Mutex::new(()),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path(&self, kind: StatKind, date: &StatDate) -> PathBuf {
        self.root
            .join(kind.dir_name())
            .join(format!("{}.txt", date.as_str()))
    }

    async fn read(&self, path: &Path) -> Result<u64, StatError> {
        match smol::fs::read_to_string(path).await {
            Ok(content) => content.trim().parse().map_err(|_| StatError::Corrupt {
                path: path.to_path_buf(),
                content,
            }),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(0),
            Err(e) => Err(e.into()),
        }
    }

    /// Add one to a counter, returning the new value
    pub async fn increment(&self, kind: StatKind, date: &StatDate) -> Result<u64, StatError> {
        let path = self.path(kind, date);
        let _guard = self.write_lock.lock().await;
        let count = self.read(&path).await? + 1;
        smol::fs::write(&path, count.to_string()).await?;
        tracing::debug!("{} {} -> {}", kind.as_str(), date.as_str(), count);
        Ok(count)
    }

    /// Current value; a missing file counts as zero
    pub async fn get(&self, kind: StatKind, date: &StatDate) -> Result<u64, StatError> {
        self.read(&self.path(kind, date)).await
    }

    pub async fn snapshot(&self, date: &StatDate) -> Result<DailyStats, StatError> {
        Ok(DailyStats {
            date: date.as_str().to_string(),
            visits: self.get(StatKind::Visit, date).await?,
            downloads: self.get(StatKind::Download, date).await?,
        })
    }
}
