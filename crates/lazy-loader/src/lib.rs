//! Lazy Loader
//!
//! Decides when deferred page resources load, drives each image through
//! its load lifecycle, retries failures with exponential backoff and warms
//! the cache for the section below the one being viewed.
//!
//! # Example
//! ```rust,ignore
//! use lazy_loader::{LazyLoader, ScriptedNetwork};
//!
//! let doc = lazy_html::parse(html)?;
//! let mut loader = LazyLoader::builder(doc, ScriptedNetwork::new())
//!     .viewport(1280.0, 800.0)
//!     .build()?;
//! loader.start()?;
//! loader.set_element_rect(hero, DOMRect::new(0.0, 900.0, 600.0, 400.0));
//! loader.scroll_to(0.0, 400.0);
//! ```

mod config;
mod content;
mod controller;
mod hints;
mod image;
mod network;
mod observer;
mod placeholder;
mod prefetch;
mod progress;
mod promise;
mod resource;
mod responsive;
mod retry;
mod strategy;
mod timers;

pub use config::{Capabilities, HintConfig, LoaderConfig, ObserverProfile, PlaceholderText};
pub use controller::{LazyLoader, LazyLoaderBuilder, ScheduledTask};
pub use hints::apply_resource_hints;
pub use network::{
    FetchCompletion, FetchError, FetchKind, FetchRequest, FetchSource, ImageCache, Network,
    RequestId, ScriptedNetwork,
};
pub use observer::{
    IntersectionObserver, IntersectionObserverEntry, Layout, ObserverPool, ObserverPurpose,
    RootMargin,
};
pub use placeholder::{build_placeholder, error_placeholder, loading_placeholder};
pub use prefetch::PrefetchScheduler;
pub use progress::{ProgressDetail, ProgressMonitor, PROGRESS_EVENT};
pub use promise::LoadPromise;
pub use resource::{CancellationToken, LoadEvent, LoadState, ResourceRecord, ResourceTracker};
pub use responsive::{apply_responsive_sources, ResponsiveSizeTable};
pub use retry::{RetryController, RetryDecision, RetryPath, RetryPolicy};
pub use strategy::{select_strategy, ImmediateLoader, LoadStrategy, StagedLoader, StartContext, StartReport};
pub use timers::{TimerId, TimerQueue};

use lazy_dom::NodeId;

/// Attribute holding the deferred source URL
pub const PENDING_SRC_ATTR: &str = "data-src";
/// Attribute holding the deferred responsive variant
pub const PENDING_SRCSET_ATTR: &str = "data-srcset";
/// Attribute holding the JSON breakpoint table
pub const SIZES_ATTR: &str = "data-sizes";

/// Loader error
#[derive(Debug, thiserror::Error)]
pub enum LoaderError {
    #[error("Invalid root margin: {0}")]
    InvalidRootMargin(String),

    #[error("Invalid responsive size table: {0}")]
    InvalidSizeTable(String),

    #[error("Element {0:?} carries no pending source")]
    NotDeferred(NodeId),

    #[error("Element {0:?} already has a load in flight")]
    AlreadyLoading(NodeId),

    #[error("Illegal transition from {from:?} on {event:?}")]
    IllegalTransition { from: LoadState, event: LoadEvent },

    #[error("Loader already started")]
    AlreadyStarted,

    #[error("DOM error: {0}")]
    Dom(#[from] lazy_dom::DomError),
}

/// Rejection payload of a `LoadPromise`
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ImageLoadError {
    #[error("Image loading failed: {url}")]
    Failed { element: NodeId, url: String },

    #[error("Image load for {0:?} was cancelled")]
    Cancelled(NodeId),
}
