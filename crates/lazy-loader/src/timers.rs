//! Timer queue
//!
//! setTimeout-style one-shot timers against a virtual millisecond clock.
//! Timers due at the same instant fire in the order they were scheduled.

use std::collections::{BTreeMap, HashMap};

/// Timer handle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimerId(u64);

/// One-shot timers keyed by due time
#[derive(Debug)]
pub struct TimerQueue<T> {
    now: u64,
    next_id: u64,
    timers: BTreeMap<(u64, TimerId), T>,
    due_by_id: HashMap<TimerId, u64>,
}

impl<T> TimerQueue<T> {
    pub fn new() -> Self {
        Self {
            now: 0,
            next_id: 1,
            timers: BTreeMap::new(),
            due_by_id: HashMap::new(),
        }
    }

    /// Current virtual time (ms)
    pub fn now(&self) -> u64 {
        self.now
    }

    /// Schedule `task` to fire `delay_ms` from now
    pub fn set_timeout(&mut self, delay_ms: u64, task: T) -> TimerId {
        let id = TimerId(self.next_id);
        self.next_id += 1;
        let due = self.now.saturating_add(delay_ms);
        self.timers.insert((due, id), task);
        self.due_by_id.insert(id, due);
        id
    }

    /// Cancel a timer, returning its task if it was still pending
    pub fn clear(&mut self, id: TimerId) -> Option<T> {
        let due = self.due_by_id.remove(&id)?;
        self.timers.remove(&(due, id))
    }

    /// Pop the earliest timer due at or before `until`, moving the clock to it
    pub fn pop_due(&mut self, until: u64) -> Option<(TimerId, T)> {
        let (&(due, id), _) = self.timers.iter().next()?;
        if due > until {
            return None;
        }
        let task = self.timers.remove(&(due, id))?;
        self.due_by_id.remove(&id);
        self.now = self.now.max(due);
        Some((id, task))
    }

    /// Move the clock forward without firing anything
    pub fn advance_to(&mut self, time: u64) {
        self.now = self.now.max(time);
    }

    /// Due time of the next timer
    pub fn next_due(&self) -> Option<u64> {
        self.timers.keys().next().map(|&(due, _)| due)
    }

    /// Pending timers in firing order as (due time, task)
    pub fn pending(&self) -> impl Iterator<Item = (u64, &T)> {
        self.timers.iter().map(|(&(due, _), task)| (due, task))
    }

    pub fn len(&self) -> usize {
        self.timers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.timers.is_empty()
    }
}

impl<T> Default for TimerQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// Trailing-edge debounce on top of a `TimerQueue`
#[derive(Debug, Default)]
pub(crate) struct Debouncer {
    pending: Option<TimerId>,
}

impl Debouncer {
    /// Restart the quiet period; only the last call in a burst fires
    pub(crate) fn trigger<T>(&mut self, timers: &mut TimerQueue<T>, wait_ms: u64, task: T) {
        if let Some(id) = self.pending.take() {
            timers.clear(id);
        }
        self.pending = Some(timers.set_timeout(wait_ms, task));
    }

    /// Forget the pending timer once it fired
    pub(crate) fn fired(&mut self, id: TimerId) {
        if self.pending == Some(id) {
            self.pending = None;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fires_in_due_order() {
        let mut q = TimerQueue::new();
        q.set_timeout(200, "b");
        q.set_timeout(100, "a");
        q.set_timeout(200, "c");

        assert_eq!(q.pop_due(150).map(|(_, t)| t), Some("a"));
        assert_eq!(q.now(), 100);
        assert!(q.pop_due(150).is_none());
        assert_eq!(q.pop_due(1000).map(|(_, t)| t), Some("b"));
        assert_eq!(q.pop_due(1000).map(|(_, t)| t), Some("c"));
        assert!(q.is_empty());
    }

    #[test]
    fn test_clear() {
        let mut q = TimerQueue::new();
        let id = q.set_timeout(10, 1);
        assert_eq!(q.clear(id), Some(1));
        assert_eq!(q.clear(id), None);
        assert!(q.pop_due(100).is_none());
    }

    #[test]
    fn test_delay_is_relative_to_now() {
        let mut q = TimerQueue::new();
        q.advance_to(1000);
        q.set_timeout(250, ());
        assert_eq!(q.next_due(), Some(1250));
    }

    #[test]
    fn test_debounce_coalesces_burst() {
        let mut q = TimerQueue::new();
        let mut d = Debouncer::default();
        d.trigger(&mut q, 250, "resize");
        q.advance_to(100);
        d.trigger(&mut q, 250, "resize");
        q.advance_to(200);
        d.trigger(&mut q, 250, "resize");

        assert_eq!(q.len(), 1);
        assert_eq!(q.next_due(), Some(450));
    }
}
