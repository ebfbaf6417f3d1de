//! Lazy loading controller
//!
//! Owns the document, the host-supplied layout, the observer pool, the
//! per-element records and a virtual clock. Everything runs on one
//! timeline: intersection checks, network completions, timers and
//! animation frames are processed in the order the host drives them.

use crate::config::{Capabilities, LoaderConfig};
use crate::content;
use crate::hints::apply_resource_hints;
use crate::image;
use crate::network::{FetchCompletion, FetchKind, FetchRequest, Network, RequestId};
use crate::observer::{IntersectionObserverEntry, Layout, ObserverPool, ObserverPurpose};
use crate::placeholder::is_inline;
use crate::prefetch::PrefetchScheduler;
use crate::progress::{ProgressDetail, ProgressMonitor};
use crate::promise::{LoadPromise, Settle};
use crate::resource::{CancellationToken, LoadState, ResourceRecord, ResourceTracker};
use crate::responsive::apply_responsive_sources;
use crate::retry::{RetryController, RetryDecision, RetryPath};
use crate::strategy::{LoadStrategy, StartContext, select_strategy};
use crate::timers::{Debouncer, TimerId, TimerQueue};
use crate::{ImageLoadError, LoaderError, PENDING_SRC_ATTR, PENDING_SRCSET_ATTR};
use lazy_dom::{DOMRect, Document, NodeId};
use std::collections::HashMap;

/// Work scheduled on the virtual clock
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScheduledTask {
    /// Re-attempt a failed image
    Retry { element: NodeId, path: RetryPath },
    /// Second half of a content reveal
    RevealContent(NodeId),
    /// Resize burst went quiet
    ResizeSettled,
}

/// Work deferred to the next animation frame
#[derive(Debug, Clone, Copy)]
enum FrameTask {
    Opaque(NodeId),
}

/// Bookkeeping for a submitted fetch
#[derive(Debug)]
enum PendingFetch {
    Probe {
        element: NodeId,
        url: String,
        token: CancellationToken,
        reply: Option<Settle>,
    },
    Display {
        element: NodeId,
        url: String,
    },
    Prefetch,
    Preload,
}

/// Builder for `LazyLoader`
pub struct LazyLoaderBuilder<N: Network> {
    document: Document,
    network: N,
    config: LoaderConfig,
    capabilities: Capabilities,
    viewport: (f32, f32),
    strategy: Option<Box<dyn LoadStrategy>>,
}

impl<N: Network> LazyLoaderBuilder<N> {
    pub fn config(mut self, config: LoaderConfig) -> Self {
        self.config = config;
        self
    }

    pub fn capabilities(mut self, capabilities: Capabilities) -> Self {
        self.capabilities = capabilities;
        self
    }

    /// Initial viewport size in CSS pixels
    pub fn viewport(mut self, width: f32, height: f32) -> Self {
        self.viewport = (width, height);
        self
    }

    /// Override the strategy picked from the capabilities
    pub fn strategy(mut self, strategy: Box<dyn LoadStrategy>) -> Self {
        self.strategy = Some(strategy);
        self
    }

    pub fn build(self) -> Result<LazyLoader<N>, LoaderError> {
        let observers = ObserverPool::new(&self.config, self.capabilities.intersection_observer)?;
        let strategy = self
            .strategy
            .unwrap_or_else(|| select_strategy(self.capabilities));
        Ok(LazyLoader {
            document: self.document,
            network: self.network,
            retry: RetryController::new(self.config.retry.clone()),
            config: self.config,
            capabilities: self.capabilities,
            strategy,
            layout: Layout::new(self.viewport.0, self.viewport.1),
            observers,
            tracker: ResourceTracker::new(),
            prefetch: PrefetchScheduler::new(),
            progress: None,
            timers: TimerQueue::new(),
            resize: Debouncer::default(),
            frame: Vec::new(),
            in_flight: HashMap::new(),
            next_request: 1,
            started: false,
        })
    }
}

/// Page-level lazy loading controller
pub struct LazyLoader<N: Network> {
    document: Document,
    network: N,
    config: LoaderConfig,
    capabilities: Capabilities,
    strategy: Box<dyn LoadStrategy>,
    layout: Layout,
    observers: ObserverPool,
    tracker: ResourceTracker,
    retry: RetryController,
    prefetch: PrefetchScheduler,
    progress: Option<ProgressMonitor>,
    timers: TimerQueue<ScheduledTask>,
    resize: Debouncer,
    frame: Vec<FrameTask>,
    in_flight: HashMap<RequestId, PendingFetch>,
    next_request: u64,
    started: bool,
}

impl<N: Network> LazyLoader<N> {
    pub fn builder(document: Document, network: N) -> LazyLoaderBuilder<N> {
        LazyLoaderBuilder {
            document,
            network,
            config: LoaderConfig::default(),
            capabilities: Capabilities::default(),
            viewport: (1280.0, 800.0),
            strategy: None,
        }
    }

    /// Loader with default configuration and capabilities
    pub fn new(document: Document, network: N) -> Result<Self, LoaderError> {
        Self::builder(document, network).build()
    }

    /// Run the page-load sequence: hints, responsive pass, strategy start
    pub fn start(&mut self) -> Result<(), LoaderError> {
        if self.started {
            return Err(LoaderError::AlreadyStarted);
        }
        self.started = true;

        for url in apply_resource_hints(&mut self.document, &self.config.hints) {
            self.submit(FetchKind::Preload, url, PendingFetch::Preload);
        }
        if self.capabilities.native_lazy_loading {
            let hinted = content::hint_native_lazy(&mut self.document);
            tracing::debug!("added loading=lazy to {} images", hinted);
        }

        let width = self.layout.viewport.width;
        apply_responsive_sources(&mut self.document, &mut self.tracker, width);

        let total = self.document.query_selector_all("img")?.len();
        self.progress = Some(ProgressMonitor::new(total, self.timers.now()));

        let report = self.strategy.start(&mut StartContext {
            document: &mut self.document,
            observers: &mut self.observers,
            tracker: &mut self.tracker,
            config: &self.config,
        })?;
        tracing::info!(
            "lazy loading started ({}): {} deferred, {} loaded, {} content blocks",
            self.strategy.name(),
            report.deferred,
            report.loaded,
            report.content_blocks
        );

        for element in report.displayed {
            self.display(element);
        }
        self.refresh();
        Ok(())
    }

    /// Load a deferred image now.
    ///
    /// Fails when the element carries no `data-src` or already has a
    /// load in flight.
    pub fn load(&mut self, element: NodeId) -> Result<LoadPromise, LoaderError> {
        let (promise, reply) = LoadPromise::new(element);
        self.begin_load(element, Some(reply))?;
        self.pump();
        Ok(promise)
    }

    fn begin_load(&mut self, element: NodeId, reply: Option<Settle>) -> Result<(), LoaderError> {
        if self.tracker.get(element).is_some_and(ResourceRecord::is_loading) {
            return Err(LoaderError::AlreadyLoading(element));
        }
        let img = self
            .document
            .tree
            .element(element)
            .ok_or(LoaderError::NotDeferred(element))?;
        let Some(url) = img.get_attr(PENDING_SRC_ATTR).filter(|s| !s.trim().is_empty()) else {
            tracing::warn!("load() on {:?} without {}", element, PENDING_SRC_ATTR);
            return Err(LoaderError::NotDeferred(element));
        };
        let url = url.to_string();
        let srcset = img.get_attr(PENDING_SRCSET_ATTR).map(str::to_string);

        let record = self.tracker.register(ResourceRecord::deferred(element, img));
        record.pending_source = Some(url.clone());
        record.pending_source_set = srcset;
        let token = record.begin()?;

        image::mark_loading(&mut self.document, element)?;
        self.submit(
            FetchKind::Probe,
            url.clone(),
            PendingFetch::Probe {
                element,
                url,
                token,
                reply,
            },
        );
        Ok(())
    }

    /// Update an element's bounding rect; checks run on the next
    /// `refresh`, scroll or resize
    pub fn set_element_rect(&mut self, element: NodeId, rect: DOMRect) {
        self.layout.set_rect(element, rect);
    }

    pub fn scroll_to(&mut self, x: f32, y: f32) {
        self.layout.scroll_to(x, y);
        self.refresh();
    }

    /// Resize the viewport; the responsive pass runs once the resize
    /// burst has been quiet for the debounce period
    pub fn resize(&mut self, width: f32, height: f32) {
        self.layout.resize(width, height);
        self.resize.trigger(
            &mut self.timers,
            self.config.resize_debounce_ms,
            ScheduledTask::ResizeSettled,
        );
        self.refresh();
    }

    /// Run intersection checks against the current layout
    pub fn refresh(&mut self) {
        let entries = self.observers.process(&self.layout, self.timers.now());
        for (purpose, entry) in entries {
            self.on_enter(purpose, &entry);
        }
        self.pump();
    }

    /// Let `ms` of virtual time pass, firing due timers in order
    pub fn advance(&mut self, ms: u64) {
        let until = self.timers.now().saturating_add(ms);
        if ms > 0 {
            self.tick_frame();
        }
        while let Some((id, task)) = self.timers.pop_due(until) {
            self.run_task(id, task);
            self.pump();
        }
        self.timers.advance_to(until);
    }

    /// Run work queued for the next animation frame
    pub fn tick_frame(&mut self) {
        for task in std::mem::take(&mut self.frame) {
            match task {
                FrameTask::Opaque(element) => {
                    if let Err(e) = image::set_opacity(&mut self.document, element, "1") {
                        tracing::debug!("frame task for {:?} skipped: {}", element, e);
                    }
                }
            }
        }
    }

    /// Drain completions, frames and timers until nothing is pending.
    /// Returns the virtual time reached.
    pub fn run_until_idle(&mut self) -> u64 {
        loop {
            self.pump();
            self.tick_frame();
            match self.timers.next_due() {
                Some(due) => self.advance(due.saturating_sub(self.timers.now())),
                None if self.frame.is_empty() => return self.timers.now(),
                None => {}
            }
        }
    }

    /// Remove an element (and its subtree) from the document, cancelling
    /// its probes and pending retries
    pub fn remove_element(&mut self, element: NodeId) {
        let mut gone = self.document.tree.descendants(element);
        gone.push(element);
        self.document.tree.detach(element);

        for id in gone {
            if let Some(timer) = self.tracker.forget(id) {
                self.timers.clear(timer);
            }
            self.observers.forget(id);
            self.layout.remove_rect(id);
            for pending in self.in_flight.values_mut() {
                if let PendingFetch::Probe { element, reply, .. } = pending {
                    if *element == id {
                        reply.take();
                    }
                }
            }
        }
    }

    pub fn state(&self, element: NodeId) -> Option<LoadState> {
        self.tracker.state(element)
    }

    /// Pending timers in firing order as (due time, task)
    pub fn pending_timers(&self) -> Vec<(u64, ScheduledTask)> {
        self.timers.pending().map(|(due, task)| (due, *task)).collect()
    }

    /// Current virtual time (ms)
    pub fn now(&self) -> u64 {
        self.timers.now()
    }

    pub fn progress(&self) -> Option<ProgressDetail> {
        self.progress.as_ref().map(ProgressMonitor::detail)
    }

    pub fn document(&self) -> &Document {
        &self.document
    }

    pub fn document_mut(&mut self) -> &mut Document {
        &mut self.document
    }

    pub fn network(&self) -> &N {
        &self.network
    }

    pub fn network_mut(&mut self) -> &mut N {
        &mut self.network
    }

    pub fn tracker(&self) -> &ResourceTracker {
        &self.tracker
    }

    pub fn observers(&self) -> &ObserverPool {
        &self.observers
    }

    pub fn layout(&self) -> &Layout {
        &self.layout
    }

    pub fn prefetch(&self) -> &PrefetchScheduler {
        &self.prefetch
    }

    pub fn strategy_name(&self) -> &'static str {
        self.strategy.name()
    }

    fn submit(&mut self, kind: FetchKind, url: String, pending: PendingFetch) {
        let id = RequestId(self.next_request);
        self.next_request += 1;
        self.in_flight.insert(id, pending);
        self.network.submit(FetchRequest { id, url, kind });
    }

    /// The visible `<img>` fetches its current `src`
    fn display(&mut self, element: NodeId) {
        let Some(src) = self
            .document
            .tree
            .element(element)
            .and_then(|img| img.get_attr("src"))
            .filter(|src| !is_inline(src) && !src.trim().is_empty())
            .map(str::to_string)
        else {
            return;
        };
        self.submit(
            FetchKind::Display,
            src.clone(),
            PendingFetch::Display { element, url: src },
        );
    }

    fn pump(&mut self) {
        loop {
            let completions = self.network.poll();
            if completions.is_empty() {
                break;
            }
            for completion in completions {
                self.on_completion(completion);
            }
        }
    }

    fn on_enter(&mut self, purpose: ObserverPurpose, entry: &IntersectionObserverEntry) {
        let target = entry.target;
        if !self.document.tree.is_connected(target) {
            return;
        }
        let result = match purpose {
            ObserverPurpose::ImageReveal => {
                if self.tracker.state(target).is_some_and(|s| s != LoadState::Pending) {
                    return;
                }
                self.begin_load(target, None)
            }
            ObserverPurpose::ContentReveal => content::begin_reveal(&mut self.document, target).map(|()| {
                self.timers.set_timeout(
                    self.config.content_reveal_delay_ms,
                    ScheduledTask::RevealContent(target),
                );
            }),
            ObserverPurpose::Prefetch => {
                for url in self.prefetch.targets_after(&self.document, target) {
                    self.submit(FetchKind::Prefetch, url, PendingFetch::Prefetch);
                }
                Ok(())
            }
            ObserverPurpose::FadeIn => content::fade_in(&mut self.document, target).map(|()| {
                if self.tracker.get(target).is_none() {
                    self.display(target);
                }
            }),
        };
        if let Err(e) = result {
            tracing::debug!("{:?} reveal of {:?} skipped: {}", purpose, target, e);
        }
    }

    fn on_completion(&mut self, completion: FetchCompletion) {
        let Some(pending) = self.in_flight.remove(&completion.id) else {
            tracing::debug!("completion for unknown request {:?}", completion.id);
            return;
        };
        let ok = completion.result.is_ok();
        match pending {
            PendingFetch::Probe {
                element,
                url,
                token,
                reply,
            } => {
                if token.is_cancelled() {
                    tracing::debug!("dropping cancelled probe for {:?}", element);
                    return;
                }
                let result = if ok {
                    self.probe_succeeded(element)
                } else {
                    self.probe_failed(element, &url)
                };
                if let Err(e) = &result {
                    tracing::warn!("probe completion for {:?}: {}", element, e);
                }
                if let Some(reply) = reply {
                    let outcome = match result {
                        Ok(true) => Ok(element),
                        _ => Err(ImageLoadError::Failed { element, url }),
                    };
                    let _ = reply.try_send(outcome);
                }
            }
            PendingFetch::Display { element, url } => {
                if !self.document.tree.is_connected(element) {
                    return;
                }
                if ok {
                    self.display_loaded();
                } else if let Err(e) = self.display_failed(element) {
                    tracing::warn!("display failure of {} on {:?}: {}", url, element, e);
                }
            }
            PendingFetch::Prefetch | PendingFetch::Preload => {
                if let Err(e) = completion.result {
                    tracing::debug!("background fetch failed: {}", e);
                }
            }
        }
    }

    /// Returns `Ok(true)` once the element shows its source
    fn probe_succeeded(&mut self, element: NodeId) -> Result<bool, LoaderError> {
        let Some(record) = self.tracker.get_mut(element) else {
            return Ok(false);
        };
        record.succeed()?;
        image::apply_success(&mut self.document, record)?;
        self.frame.push(FrameTask::Opaque(element));
        self.display(element);
        Ok(true)
    }

    fn probe_failed(&mut self, element: NodeId, url: &str) -> Result<bool, LoaderError> {
        let Some(record) = self.tracker.get_mut(element) else {
            return Ok(false);
        };
        record.fail()?;
        image::apply_failure(&mut self.document, element, &self.config.placeholder)?;
        tracing::debug!("probe for {} failed", url);
        self.schedule_retry(element, RetryPath::Probe)?;
        Ok(false)
    }

    fn display_loaded(&mut self) {
        let now = self.timers.now();
        if let Some(progress) = self.progress.as_mut() {
            let event = progress.record_load(now).to_event();
            self.document.dispatch_event(&event);
        }
    }

    fn display_failed(&mut self, element: NodeId) -> Result<(), LoaderError> {
        let Some(img) = self.document.tree.element(element) else {
            return Ok(());
        };
        let record = self.tracker.register(ResourceRecord::displayed(element, img));
        if record.state() != LoadState::Loaded {
            return Ok(());
        }
        self.schedule_retry(element, RetryPath::Display)
    }

    fn schedule_retry(&mut self, element: NodeId, path: RetryPath) -> Result<(), LoaderError> {
        let Some(record) = self.tracker.get_mut(element) else {
            return Ok(());
        };
        if record.retry_timer.is_some() {
            return Ok(());
        }
        match self.retry.on_error(record) {
            RetryDecision::Retry { delay_ms, attempt } => {
                tracing::debug!(
                    "retry {} for {:?} in {} ms ({:?})",
                    attempt,
                    element,
                    delay_ms,
                    path
                );
                record.retry_timer = Some(
                    self.timers
                        .set_timeout(delay_ms, ScheduledTask::Retry { element, path }),
                );
            }
            RetryDecision::GiveUp => {
                record.exhaust()?;
                tracing::warn!(
                    "giving up on {:?} after {} retries",
                    element,
                    record.retry_count()
                );
                image::apply_failure(&mut self.document, element, &self.config.placeholder)?;
            }
        }
        Ok(())
    }

    fn run_task(&mut self, id: TimerId, task: ScheduledTask) {
        let result = match task {
            ScheduledTask::Retry { element, path } => self.fire_retry(element, path),
            ScheduledTask::RevealContent(element) => content::finish_reveal(&mut self.document, element),
            ScheduledTask::ResizeSettled => {
                self.resize.fired(id);
                let width = self.layout.viewport.width;
                apply_responsive_sources(&mut self.document, &mut self.tracker, width);
                Ok(())
            }
        };
        if let Err(e) = result {
            tracing::debug!("{:?} skipped: {}", task, e);
        }
    }

    fn fire_retry(&mut self, element: NodeId, path: RetryPath) -> Result<(), LoaderError> {
        let Some(record) = self.tracker.get_mut(element) else {
            return Ok(());
        };
        record.retry_timer = None;
        match path {
            RetryPath::Probe => {
                let url = record
                    .pending_source
                    .clone()
                    .ok_or(LoaderError::NotDeferred(element))?;
                let token = record.retry()?;
                image::mark_loading(&mut self.document, element)?;
                self.submit(
                    FetchKind::Probe,
                    url.clone(),
                    PendingFetch::Probe {
                        element,
                        url,
                        token,
                        reply: None,
                    },
                );
            }
            RetryPath::Display => {
                let pending = record.pending_source.clone().filter(|src| !is_inline(src));
                let img = image::element_mut(&mut self.document, element)?;
                if let Some(src) = pending.or_else(|| img.get_attr("src").map(str::to_string)) {
                    img.set_attr("src", &src);
                }
                self.display(element);
            }
        }
        Ok(())
    }
}
