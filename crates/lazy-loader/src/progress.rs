//! Image load progress

use lazy_dom::CustomEvent;
use serde::Serialize;

/// Custom event dispatched on the document after each image load
pub const PROGRESS_EVENT: &str = "lazyLoadProgress";

/// Event payload
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressDetail {
    /// Percent in `0..=100`
    pub progress: f64,
    pub images_loaded: usize,
    pub total_images: usize,
}

impl ProgressDetail {
    pub fn to_event(&self) -> CustomEvent {
        let detail = serde_json::to_value(self).unwrap_or_default();
        CustomEvent::new(PROGRESS_EVENT, detail)
    }
}

/// Counts image loads against the number of images seen at start-up
#[derive(Debug, Clone)]
pub struct ProgressMonitor {
    total: usize,
    loaded: usize,
    started_at: u64,
    completed_at: Option<u64>,
}

impl ProgressMonitor {
    pub fn new(total: usize, started_at: u64) -> Self {
        Self {
            total,
            loaded: 0,
            started_at,
            completed_at: None,
        }
    }

    /// Count one load at virtual time `now`
    pub fn record_load(&mut self, now: u64) -> ProgressDetail {
        self.loaded += 1;
        if self.completed_at.is_none() && self.total > 0 && self.loaded >= self.total {
            self.completed_at = Some(now);
            tracing::info!(
                "all {} images loaded in {} ms",
                self.total,
                now.saturating_sub(self.started_at)
            );
        }
        self.detail()
    }

    pub fn detail(&self) -> ProgressDetail {
        let progress = if self.total == 0 {
            0.0
        } else {
            (self.loaded as f64 / self.total as f64 * 100.0).min(100.0)
        };
        ProgressDetail {
            progress,
            images_loaded: self.loaded,
            total_images: self.total,
        }
    }

    /// Elapsed virtual time at which every image had loaded
    pub fn completed_in(&self) -> Option<u64> {
        self.completed_at.map(|t| t.saturating_sub(self.started_at))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_progress() {
        let mut monitor = ProgressMonitor::new(4, 100);
        assert_eq!(monitor.record_load(150).progress, 25.0);
        monitor.record_load(200);
        monitor.record_load(300);
        assert_eq!(monitor.completed_in(), None);

        let done = monitor.record_load(600);
        assert_eq!(done.progress, 100.0);
        assert_eq!(monitor.completed_in(), Some(500));

        // Loads beyond the start-up count stay capped
        assert_eq!(monitor.record_load(700).progress, 100.0);
        assert_eq!(monitor.completed_in(), Some(500));
    }

    #[test]
    fn test_empty_page() {
        let monitor = ProgressMonitor::new(0, 0);
        assert_eq!(monitor.detail().progress, 0.0);
    }

    #[test]
    fn test_event_payload() {
        let event = ProgressDetail {
            progress: 50.0,
            images_loaded: 1,
            total_images: 2,
        }
        .to_event();
        assert_eq!(event.event_type, PROGRESS_EVENT);
        assert_eq!(
            event.detail,
            serde_json::json!({"progress": 50.0, "imagesLoaded": 1, "totalImages": 2})
        );
    }
}
