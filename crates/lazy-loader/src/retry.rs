//! Retry with exponential backoff
//!
//! Probe failures and failures of the displayed image share one counter
//! per element. Attempt `n` (0-based) waits `base_delay_ms × 2^n`.

use crate::resource::ResourceRecord;
use serde::Deserialize;

/// Backoff parameters
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub base_delay_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay_ms: 1000,
        }
    }
}

impl RetryPolicy {
    /// Delay before attempt `attempt` (0-based)
    pub fn delay_for(&self, attempt: u32) -> u64 {
        self.base_delay_ms
            .saturating_mul(1u64.checked_shl(attempt).unwrap_or(u64::MAX))
    }
}

/// Outcome of a failure
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    /// Re-attempt after `delay_ms`; `attempt` is the new retry count
    Retry { delay_ms: u64, attempt: u32 },
    /// Budget spent
    GiveUp,
}

/// Which signal reported the failure
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryPath {
    /// Detached probe of the load state machine
    Probe,
    /// The visible `<img>` failing on its own `src`
    Display,
}

/// Applies a `RetryPolicy` to resource records
#[derive(Debug, Clone, Default)]
pub struct RetryController {
    policy: RetryPolicy,
}

impl RetryController {
    pub fn new(policy: RetryPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Decide what happens after a failure, consuming one retry if granted
    pub fn on_error(&self, record: &mut ResourceRecord) -> RetryDecision {
        let count = record.retry_count();
        if count >= self.policy.max_retries {
            return RetryDecision::GiveUp;
        }
        let delay_ms = self.policy.delay_for(count);
        let attempt = record.bump_retry_count();
        RetryDecision::Retry { delay_ms, attempt }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lazy_dom::{ElementData, NodeId};

    #[test]
    fn test_backoff_sequence() {
        let controller = RetryController::default();
        let mut record = ResourceRecord::deferred(NodeId::from_raw(1), &ElementData::new("img"));

        let mut delays = Vec::new();
        while let RetryDecision::Retry { delay_ms, .. } = controller.on_error(&mut record) {
            delays.push(delay_ms);
        }
        assert_eq!(delays, vec![1000, 2000, 4000]);
        assert_eq!(record.retry_count(), 3);
        assert_eq!(controller.on_error(&mut record), RetryDecision::GiveUp);
        assert_eq!(record.retry_count(), 3);
    }

    #[test]
    fn test_custom_policy() {
        let controller = RetryController::new(RetryPolicy {
            max_retries: 1,
            base_delay_ms: 50,
        });
        let mut record = ResourceRecord::deferred(NodeId::from_raw(1), &ElementData::new("img"));
        assert_eq!(
            controller.on_error(&mut record),
            RetryDecision::Retry { delay_ms: 50, attempt: 1 }
        );
        assert_eq!(controller.on_error(&mut record), RetryDecision::GiveUp);
    }

    #[test]
    fn test_delay_saturates() {
        assert_eq!(RetryPolicy::default().delay_for(80), u64::MAX);
    }
}
