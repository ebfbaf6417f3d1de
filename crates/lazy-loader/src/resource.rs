//! Per-resource load state
//!
//! Each deferred image owns a `ResourceRecord` in the `ResourceTracker`.
//! The record is authoritative; CSS classes on the element mirror it.

use crate::timers::TimerId;
use crate::{LoaderError, PENDING_SRC_ATTR, PENDING_SRCSET_ATTR};
use lazy_dom::{ElementData, NodeId};
use std::cell::Cell;
use std::collections::HashMap;
use std::rc::Rc;

/// Image lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LoadState {
    /// Deferred, waiting to be revealed
    Pending,
    /// Probe in flight
    Loading,
    /// Source applied to the element
    Loaded,
    /// Last attempt failed; a retry may follow
    Error,
    /// Retries used up; terminal
    Exhausted,
}

/// Inputs of the lifecycle state machine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadEvent {
    Begin,
    ProbeSucceeded,
    ProbeFailed,
    RetryFired,
    GiveUp,
}

impl LoadState {
    /// Apply `event`, rejecting anything outside
    /// pending→loading→{loaded, error}, error→loading and {error, loaded}→exhausted
    pub fn on(self, event: LoadEvent) -> Result<LoadState, LoaderError> {
        use LoadEvent::*;
        use LoadState::*;
        match (self, event) {
            (Pending, Begin) => Ok(Loading),
            (Loading, ProbeSucceeded) => Ok(Loaded),
            (Loading, ProbeFailed) => Ok(Error),
            (Error, RetryFired) => Ok(Loading),
            (Error | Loaded, GiveUp) => Ok(Exhausted),
            (from, event) => Err(LoaderError::IllegalTransition { from, event }),
        }
    }

    /// State class mirrored on the element
    pub fn css_class(self) -> Option<&'static str> {
        match self {
            LoadState::Pending => None,
            LoadState::Loading => Some("loading"),
            LoadState::Loaded => Some("loaded"),
            LoadState::Error | LoadState::Exhausted => Some("error"),
        }
    }

    pub fn is_terminal(self) -> bool {
        self == LoadState::Exhausted
    }
}

/// Cancellation flag shared between a record and its in-flight probe
#[derive(Debug, Clone, Default)]
pub struct CancellationToken(Rc<Cell<bool>>);

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.set(true);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.get()
    }
}

/// Load bookkeeping for one element
#[derive(Debug, Clone)]
pub struct ResourceRecord {
    pub element: NodeId,
    /// URL to load (`data-src`, or the current `src` of an eager image)
    pub pending_source: Option<String>,
    /// Responsive variant (`data-srcset`)
    pub pending_source_set: Option<String>,
    pub declared_width: Option<u32>,
    pub declared_height: Option<u32>,
    state: LoadState,
    retry_count: u32,
    probe: Option<CancellationToken>,
    pub(crate) retry_timer: Option<TimerId>,
}

impl ResourceRecord {
    /// Record for a deferred element, read from its marker attributes
    pub fn deferred(element: NodeId, data: &ElementData) -> Self {
        Self {
            element,
            pending_source: data.get_attr(PENDING_SRC_ATTR).map(str::to_string),
            pending_source_set: data.get_attr(PENDING_SRCSET_ATTR).map(str::to_string),
            declared_width: data.numeric_attr("width"),
            declared_height: data.numeric_attr("height"),
            state: LoadState::Pending,
            retry_count: 0,
            probe: None,
            retry_timer: None,
        }
    }

    /// Record for an image that was never deferred and already shows its `src`
    pub fn displayed(element: NodeId, data: &ElementData) -> Self {
        Self {
            pending_source: data.get_attr("src").map(str::to_string),
            pending_source_set: None,
            state: LoadState::Loaded,
            ..Self::deferred(element, data)
        }
    }

    pub fn state(&self) -> LoadState {
        self.state
    }

    pub fn retry_count(&self) -> u32 {
        self.retry_count
    }

    pub(crate) fn bump_retry_count(&mut self) -> u32 {
        self.retry_count += 1;
        self.retry_count
    }

    /// Whether a probe is in flight
    pub fn is_loading(&self) -> bool {
        self.state == LoadState::Loading
    }

    fn transition(&mut self, event: LoadEvent) -> Result<(), LoaderError> {
        let next = self.state.on(event)?;
        tracing::debug!("{:?}: {:?} --{:?}--> {:?}", self.element, self.state, event, next);
        self.state = next;
        Ok(())
    }

    fn new_probe(&mut self) -> CancellationToken {
        let token = CancellationToken::new();
        self.probe = Some(token.clone());
        token
    }

    /// pending → loading; returns the token for the new probe
    pub fn begin(&mut self) -> Result<CancellationToken, LoaderError> {
        if self.state == LoadState::Loading {
            return Err(LoaderError::AlreadyLoading(self.element));
        }
        self.transition(LoadEvent::Begin)?;
        Ok(self.new_probe())
    }

    /// loading → loaded
    pub fn succeed(&mut self) -> Result<(), LoaderError> {
        self.transition(LoadEvent::ProbeSucceeded)?;
        self.probe = None;
        Ok(())
    }

    /// loading → error
    pub fn fail(&mut self) -> Result<(), LoaderError> {
        self.transition(LoadEvent::ProbeFailed)?;
        self.probe = None;
        Ok(())
    }

    /// error → loading with a fresh probe
    pub fn retry(&mut self) -> Result<CancellationToken, LoaderError> {
        self.transition(LoadEvent::RetryFired)?;
        Ok(self.new_probe())
    }

    /// {error, loaded} → exhausted
    pub fn exhaust(&mut self) -> Result<(), LoaderError> {
        self.transition(LoadEvent::GiveUp)
    }

    /// Cancel the in-flight probe, if any
    pub fn cancel(&mut self) {
        if let Some(token) = self.probe.take() {
            token.cancel();
        }
    }
}

/// Element → record map
#[derive(Debug, Default)]
pub struct ResourceTracker {
    records: HashMap<NodeId, ResourceRecord>,
}

impl ResourceTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert unless a record already exists; returns the stored record
    pub fn register(&mut self, record: ResourceRecord) -> &mut ResourceRecord {
        self.records.entry(record.element).or_insert(record)
    }

    pub fn get(&self, element: NodeId) -> Option<&ResourceRecord> {
        self.records.get(&element)
    }

    pub fn get_mut(&mut self, element: NodeId) -> Option<&mut ResourceRecord> {
        self.records.get_mut(&element)
    }

    pub fn state(&self, element: NodeId) -> Option<LoadState> {
        self.get(element).map(|r| r.state)
    }

    /// Drop the record, cancelling its probe; returns its pending retry timer
    pub fn forget(&mut self, element: NodeId) -> Option<TimerId> {
        let mut record = self.records.remove(&element)?;
        record.cancel();
        record.retry_timer.take()
    }

    /// Elements currently in `state`
    pub fn in_state(&self, state: LoadState) -> Vec<NodeId> {
        let mut ids: Vec<_> = self
            .records
            .values()
            .filter(|r| r.state == state)
            .map(|r| r.element)
            .collect();
        ids.sort();
        ids
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
