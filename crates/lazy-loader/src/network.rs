//! Network seam
//!
//! The loader never performs I/O itself. It submits `FetchRequest`s to a
//! `Network` and later polls for their completions, which keeps every
//! callback on the loader's own timeline.

use std::collections::{HashMap, HashSet, VecDeque};

/// Identifies one submitted fetch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RequestId(pub u64);

/// Why a fetch was issued
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FetchKind {
    /// Detached image probe of the load state machine
    Probe,
    /// The visible `<img>` fetching its own `src`
    Display,
    /// Background warm-up of an upcoming section
    Prefetch,
    /// `<link rel=preload>` hint
    Preload,
}

/// Fetch request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchRequest {
    pub id: RequestId,
    pub url: String,
    pub kind: FetchKind,
}

/// Where a successful response came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchSource {
    Network,
    Cache,
}

/// Fetch failure
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FetchError {
    #[error("HTTP error: {status}")]
    HttpError { status: u16 },

    #[error("Network error: {0}")]
    Network(String),

    #[error("Image could not be decoded: {0}")]
    Decode(String),
}

/// Completion of a previously submitted request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchCompletion {
    pub id: RequestId,
    pub result: Result<FetchSource, FetchError>,
}

/// Transport used by the loader
pub trait Network {
    /// Start a fetch; its completion is reported by a later `poll`
    fn submit(&mut self, request: FetchRequest);

    /// Completions that arrived since the last poll, in arrival order
    fn poll(&mut self) -> Vec<FetchCompletion>;
}

/// Image cache keyed by URL, evicting the oldest entry when full
#[derive(Debug)]
pub struct ImageCache {
    entries: HashMap<String, u32>,
    order: VecDeque<String>,
    max_entries: usize,
}

impl ImageCache {
    pub fn new(max_entries: usize) -> Self {
        Self {
            entries: HashMap::new(),
            order: VecDeque::new(),
            max_entries: max_entries.max(1),
        }
    }

    /// Look up and count a hit
    pub fn hit(&mut self, url: &str) -> bool {
        match self.entries.get_mut(url) {
            Some(hits) => {
                *hits += 1;
                true
            }
            None => false,
        }
    }

    pub fn contains(&self, url: &str) -> bool {
        self.entries.contains_key(url)
    }

    pub fn insert(&mut self, url: &str) {
        if self.entries.contains_key(url) {
            return;
        }
        while self.entries.len() >= self.max_entries {
            let Some(oldest) = self.order.pop_front() else { break };
            self.entries.remove(&oldest);
        }
        self.entries.insert(url.to_string(), 0);
        self.order.push_back(url.to_string());
    }

    /// Hits recorded for `url`
    pub fn hits(&self, url: &str) -> u32 {
        self.entries.get(url).copied().unwrap_or(0)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for ImageCache {
    fn default() -> Self {
        Self::new(256)
    }
}

/// In-memory network with scripted failures and an image cache.
///
/// Requests succeed unless a failure was scripted for their URL. While
/// paused, submissions are held until `resume`.
#[derive(Debug, Default)]
pub struct ScriptedNetwork {
    completed: VecDeque<FetchCompletion>,
    held: Vec<FetchRequest>,
    paused: bool,
    failures: HashMap<String, u32>,
    unreachable: HashSet<String>,
    cache: ImageCache,
    log: Vec<FetchRequest>,
}

impl ScriptedNetwork {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail the next `times` fetches of `url`
    pub fn fail_times(mut self, url: &str, times: u32) -> Self {
        self.failures.insert(url.to_string(), times);
        self
    }

    /// Fail every fetch of `url`
    pub fn unreachable(mut self, url: &str) -> Self {
        self.unreachable.insert(url.to_string());
        self
    }

    /// Make `url` reachable again
    pub fn restore(&mut self, url: &str) {
        self.unreachable.remove(url);
        self.failures.remove(url);
    }

    /// Hold submissions in flight
    pub fn pause(&mut self) {
        self.paused = true;
    }

    /// Complete everything held while paused
    pub fn resume(&mut self) {
        self.paused = false;
        for request in std::mem::take(&mut self.held) {
            self.complete(&request);
        }
    }

    /// Requests currently held in flight
    pub fn in_flight(&self) -> &[FetchRequest] {
        &self.held
    }

    /// Every request ever submitted
    pub fn requests(&self) -> &[FetchRequest] {
        &self.log
    }

    /// Submitted URLs of one kind, in order
    pub fn urls(&self, kind: FetchKind) -> Vec<&str> {
        self.log
            .iter()
            .filter(|r| r.kind == kind)
            .map(|r| r.url.as_str())
            .collect()
    }

    pub fn cache(&self) -> &ImageCache {
        &self.cache
    }

    fn complete(&mut self, request: &FetchRequest) {
        let result = if self.cache.hit(&request.url) {
            Ok(FetchSource::Cache)
        } else if self.unreachable.contains(&request.url) {
            Err(FetchError::Network(format!("{} unreachable", request.url)))
        } else if let Some(left) = self.failures.get_mut(&request.url).filter(|n| **n > 0) {
            *left -= 1;
            Err(FetchError::HttpError { status: 503 })
        } else {
            self.cache.insert(&request.url);
            Ok(FetchSource::Network)
        };
        self.completed.push_back(FetchCompletion {
            id: request.id,
            result,
        });
    }
}

impl Network for ScriptedNetwork {
    fn submit(&mut self, request: FetchRequest) {
        tracing::trace!("fetch {:?} {}", request.kind, request.url);
        self.log.push(request.clone());
        if self.paused {
            self.held.push(request);
        } else {
            self.complete(&request);
        }
    }

    fn poll(&mut self) -> Vec<FetchCompletion> {
        self.completed.drain(..).collect()
    }
}
