//! Intersection Observer pool
//!
//! One observer per purpose, each with its own root margin and threshold.
//! Registrations are one-shot: a target is unobserved as soon as it fires.

use crate::{LoaderConfig, LoaderError, ObserverProfile};
use lazy_dom::{DOMRect, NodeId};
use std::collections::HashMap;

/// Viewport plus element boxes, supplied by the host's layout
#[derive(Debug, Clone, Default)]
pub struct Layout {
    pub viewport: DOMRect,
    rects: HashMap<NodeId, DOMRect>,
}

impl Layout {
    pub fn new(width: f32, height: f32) -> Self {
        Self {
            viewport: DOMRect::new(0.0, 0.0, width, height),
            rects: HashMap::new(),
        }
    }

    pub fn set_rect(&mut self, node: NodeId, rect: DOMRect) {
        self.rects.insert(node, rect);
    }

    pub fn remove_rect(&mut self, node: NodeId) {
        self.rects.remove(&node);
    }

    pub fn rect(&self, node: NodeId) -> Option<DOMRect> {
        self.rects.get(&node).copied()
    }

    pub fn scroll_to(&mut self, x: f32, y: f32) {
        self.viewport.x = x;
        self.viewport.y = y;
    }

    pub fn resize(&mut self, width: f32, height: f32) {
        self.viewport.width = width;
        self.viewport.height = height;
    }
}

/// A single margin length
#[derive(Debug, Clone, Copy, PartialEq)]
enum MarginLength {
    Px(f32),
    Percent(f32),
}

impl MarginLength {
    fn parse(token: &str) -> Option<Self> {
        if let Some(px) = token.strip_suffix("px") {
            px.parse().ok().map(MarginLength::Px)
        } else if let Some(pct) = token.strip_suffix('%') {
            pct.parse().ok().map(MarginLength::Percent)
        } else if token.parse::<f32>().ok() == Some(0.0) {
            Some(MarginLength::Px(0.0))
        } else {
            None
        }
    }

    fn resolve(self, basis: f32) -> f32 {
        match self {
            MarginLength::Px(v) => v,
            MarginLength::Percent(p) => basis * p / 100.0,
        }
    }
}

/// Parsed `rootMargin` (top, right, bottom, left)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RootMargin {
    top: MarginLength,
    right: MarginLength,
    bottom: MarginLength,
    left: MarginLength,
}

impl RootMargin {
    /// Parse CSS margin shorthand with 1 to 4 lengths
    pub fn parse(s: &str) -> Result<Self, LoaderError> {
        let parts = s
            .split_whitespace()
            .map(MarginLength::parse)
            .collect::<Option<Vec<_>>>()
            .ok_or_else(|| LoaderError::InvalidRootMargin(s.to_string()))?;

        let (top, right, bottom, left) = match parts.as_slice() {
            [a] => (*a, *a, *a, *a),
            [v, h] => (*v, *h, *v, *h),
            [t, h, b] => (*t, *h, *b, *h),
            [t, r, b, l] => (*t, *r, *b, *l),
            _ => return Err(LoaderError::InvalidRootMargin(s.to_string())),
        };
        Ok(Self { top, right, bottom, left })
    }

    /// Grow the root box; percentages use its width (left/right) or height (top/bottom)
    pub fn apply(&self, root: &DOMRect) -> DOMRect {
        root.expand(
            self.top.resolve(root.height),
            self.right.resolve(root.width),
            self.bottom.resolve(root.height),
            self.left.resolve(root.width),
        )
    }
}

/// Intersection observer entry
#[derive(Debug, Clone)]
pub struct IntersectionObserverEntry {
    pub target: NodeId,
    pub bounding_client_rect: DOMRect,
    pub root_bounds: DOMRect,
    pub intersection_ratio: f32,
    pub is_intersecting: bool,
    pub time: u64,
}

/// One-shot intersection observer
#[derive(Debug)]
pub struct IntersectionObserver {
    margin: RootMargin,
    threshold: f32,
    /// Kept in registration order so entries come out in document order
    observed: Vec<NodeId>,
}

impl IntersectionObserver {
    pub fn new(profile: &ObserverProfile) -> Result<Self, LoaderError> {
        Ok(Self {
            margin: RootMargin::parse(&profile.root_margin)?,
            threshold: profile.threshold.clamp(0.0, 1.0),
            observed: Vec::new(),
        })
    }

    pub fn observe(&mut self, target: NodeId) {
        if !self.observed.contains(&target) {
            self.observed.push(target);
        }
    }

    pub fn unobserve(&mut self, target: NodeId) -> bool {
        let before = self.observed.len();
        self.observed.retain(|&n| n != target);
        self.observed.len() != before
    }

    pub fn disconnect(&mut self) {
        self.observed.clear();
    }

    pub fn is_observing(&self, target: NodeId) -> bool {
        self.observed.contains(&target)
    }

    pub fn len(&self) -> usize {
        self.observed.len()
    }

    pub fn is_empty(&self) -> bool {
        self.observed.is_empty()
    }

    /// Check every target against the margin-expanded viewport.
    ///
    /// Targets that qualify are returned and unobserved; targets without a
    /// layout box stay registered.
    pub fn check_intersections(&mut self, layout: &Layout, time: u64) -> Vec<IntersectionObserverEntry> {
        let root = self.margin.apply(&layout.viewport);
        let mut fired = Vec::new();

        self.observed.retain(|&target| {
            let Some(rect) = layout.rect(target) else {
                return true;
            };
            let (is_intersecting, ratio) = if rect.area() > 0.0 {
                let ratio = rect
                    .intersect(&root)
                    .map(|i| i.area() / rect.area())
                    .unwrap_or(0.0);
                (ratio > 0.0, ratio)
            } else if rect.touches(&root) {
                (true, 1.0)
            } else {
                (false, 0.0)
            };

            if is_intersecting && ratio >= self.threshold {
                fired.push(IntersectionObserverEntry {
                    target,
                    bounding_client_rect: rect,
                    root_bounds: root,
                    intersection_ratio: ratio,
                    is_intersecting,
                    time,
                });
                false
            } else {
                true
            }
        });

        fired
    }
}

/// What an observation is for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ObserverPurpose {
    /// Deferred image: start its load
    ImageReveal,
    /// `.lazy-content` block: run the reveal sequence
    ContentReveal,
    /// Section: prefetch the following section's images
    Prefetch,
    /// Natively lazy image: add `fade-in`
    FadeIn,
}

impl ObserverPurpose {
    pub const ALL: [ObserverPurpose; 4] = [
        ObserverPurpose::ImageReveal,
        ObserverPurpose::ContentReveal,
        ObserverPurpose::Prefetch,
        ObserverPurpose::FadeIn,
    ];

    fn profile(self, config: &LoaderConfig) -> &ObserverProfile {
        match self {
            ObserverPurpose::ImageReveal => &config.image_reveal,
            ObserverPurpose::ContentReveal => &config.content_reveal,
            ObserverPurpose::Prefetch => &config.prefetch,
            ObserverPurpose::FadeIn => &config.fade_in,
        }
    }
}

/// Shared observers, one per purpose.
///
/// Without a proximity primitive every registration fires on the next
/// `process` call, as if already visible.
#[derive(Debug)]
pub struct ObserverPool {
    supported: bool,
    observers: HashMap<ObserverPurpose, IntersectionObserver>,
    ready: Vec<(ObserverPurpose, NodeId)>,
}

impl ObserverPool {
    pub fn new(config: &LoaderConfig, supported: bool) -> Result<Self, LoaderError> {
        let mut observers = HashMap::new();
        for purpose in ObserverPurpose::ALL {
            observers.insert(purpose, IntersectionObserver::new(purpose.profile(config))?);
        }
        Ok(Self {
            supported,
            observers,
            ready: Vec::new(),
        })
    }

    /// Whether a real proximity primitive backs the pool
    pub fn is_supported(&self) -> bool {
        self.supported
    }

    /// Register targets for `purpose`
    pub fn observe(&mut self, purpose: ObserverPurpose, targets: impl IntoIterator<Item = NodeId>) {
        if !self.supported {
            for target in targets {
                if !self.ready.contains(&(purpose, target)) {
                    self.ready.push((purpose, target));
                }
            }
            return;
        }
        if let Some(observer) = self.observers.get_mut(&purpose) {
            for target in targets {
                observer.observe(target);
            }
        }
    }

    /// Drop every registration of `target`
    pub fn forget(&mut self, target: NodeId) {
        for observer in self.observers.values_mut() {
            observer.unobserve(target);
        }
        self.ready.retain(|&(_, n)| n != target);
    }

    /// Number of live registrations for `purpose`
    pub fn observed_count(&self, purpose: ObserverPurpose) -> usize {
        let waiting = self.ready.iter().filter(|(p, _)| *p == purpose).count();
        waiting + self.observers.get(&purpose).map_or(0, |o| o.len())
    }

    pub fn is_observing(&self, purpose: ObserverPurpose, target: NodeId) -> bool {
        self.ready.contains(&(purpose, target))
            || self.observers.get(&purpose).is_some_and(|o| o.is_observing(target))
    }

    /// Collect entries that fired since the last call
    pub fn process(&mut self, layout: &Layout, time: u64) -> Vec<(ObserverPurpose, IntersectionObserverEntry)> {
        let mut out: Vec<_> = self
            .ready
            .drain(..)
            .map(|(purpose, target)| {
                let rect = layout.rect(target).unwrap_or_default();
                (
                    purpose,
                    IntersectionObserverEntry {
                        target,
                        bounding_client_rect: rect,
                        root_bounds: layout.viewport,
                        intersection_ratio: 1.0,
                        is_intersecting: true,
                        time,
                    },
                )
            })
            .collect();

        for purpose in ObserverPurpose::ALL {
            if let Some(observer) = self.observers.get_mut(&purpose) {
                out.extend(
                    observer
                        .check_intersections(layout, time)
                        .into_iter()
                        .map(|entry| (purpose, entry)),
                );
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node(n: u32) -> NodeId {
        NodeId::from_raw(n)
    }

    #[test]
    fn test_root_margin_shorthand() {
        let root = DOMRect::new(0.0, 0.0, 800.0, 600.0);
        assert_eq!(
            RootMargin::parse("50px").unwrap().apply(&root),
            DOMRect::new(-50.0, -50.0, 900.0, 700.0)
        );
        assert_eq!(
            RootMargin::parse("10px 0").unwrap().apply(&root),
            DOMRect::new(0.0, -10.0, 800.0, 620.0)
        );
        assert_eq!(
            RootMargin::parse("0px 0px 50%").unwrap().apply(&root),
            DOMRect::new(0.0, 0.0, 800.0, 900.0)
        );
    }

    #[test]
    fn test_root_margin_rejects_garbage() {
        assert!(RootMargin::parse("50em").is_err());
        assert!(RootMargin::parse("").is_err());
        assert!(RootMargin::parse("1px 2px 3px 4px 5px").is_err());
        assert!(RootMargin::parse("12").is_err());
    }

    #[test]
    fn test_margin_fires_before_visible() {
        let mut observer = IntersectionObserver::new(&ObserverProfile::new("50px", 0.01)).unwrap();
        let mut layout = Layout::new(800.0, 600.0);
        layout.set_rect(node(1), DOMRect::new(0.0, 630.0, 200.0, 200.0));
        layout.set_rect(node(2), DOMRect::new(0.0, 700.0, 200.0, 200.0));
        observer.observe(node(1));
        observer.observe(node(2));

        let entries = observer.check_intersections(&layout, 0);
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].target, node(1));
        assert!(entries[0].is_intersecting);
        assert!(!observer.is_observing(node(1)));
        assert!(observer.is_observing(node(2)));
    }

    #[test]
    fn test_fires_once() {
        let mut observer = IntersectionObserver::new(&ObserverProfile::new("0px", 0.0)).unwrap();
        let mut layout = Layout::new(800.0, 600.0);
        layout.set_rect(node(1), DOMRect::new(0.0, 0.0, 10.0, 10.0));
        observer.observe(node(1));

        assert_eq!(observer.check_intersections(&layout, 0).len(), 1);
        assert!(observer.check_intersections(&layout, 1).is_empty());
    }

    #[test]
    fn test_threshold() {
        let mut observer = IntersectionObserver::new(&ObserverProfile::new("0px", 0.5)).unwrap();
        let mut layout = Layout::new(800.0, 600.0);
        // 25% visible
        layout.set_rect(node(1), DOMRect::new(0.0, 550.0, 100.0, 200.0));
        observer.observe(node(1));
        assert!(observer.check_intersections(&layout, 0).is_empty());

        layout.scroll_to(0.0, 200.0);
        assert_eq!(observer.check_intersections(&layout, 0).len(), 1);
    }

    #[test]
    fn test_unlaid_out_targets_wait() {
        let mut observer = IntersectionObserver::new(&ObserverProfile::new("0px", 0.0)).unwrap();
        observer.observe(node(3));
        assert!(observer.check_intersections(&Layout::new(800.0, 600.0), 0).is_empty());
        assert_eq!(observer.len(), 1);
    }

    #[test]
    fn test_pool_routes_by_purpose() {
        let config = LoaderConfig::default();
        let mut pool = ObserverPool::new(&config, true).unwrap();
        let mut layout = Layout::new(800.0, 600.0);
        // 150px below the fold: inside prefetch (200px) but outside image (50px)
        layout.set_rect(node(1), DOMRect::new(0.0, 750.0, 800.0, 400.0));
        pool.observe(ObserverPurpose::ImageReveal, [node(1)]);
        pool.observe(ObserverPurpose::Prefetch, [node(1)]);

        let fired = pool.process(&layout, 0);
        assert_eq!(fired.len(), 1);
        assert_eq!(fired[0].0, ObserverPurpose::Prefetch);
        assert!(pool.is_observing(ObserverPurpose::ImageReveal, node(1)));
    }

    #[test]
    fn test_pool_without_support_fires_immediately() {
        let config = LoaderConfig::default();
        let mut pool = ObserverPool::new(&config, false).unwrap();
        pool.observe(ObserverPurpose::ImageReveal, [node(1), node(2)]);
        assert_eq!(pool.observed_count(ObserverPurpose::ImageReveal), 2);

        // No layout at all: still fires
        let fired = pool.process(&Layout::default(), 0);
        assert_eq!(fired.len(), 2);
        assert!(fired.iter().all(|(_, e)| e.is_intersecting));
        assert!(pool.process(&Layout::default(), 0).is_empty());
    }

    #[test]
    fn test_invalid_profile_rejected() {
        let mut config = LoaderConfig::default();
        config.prefetch.root_margin = "lots".to_string();
        assert!(matches!(
            ObserverPool::new(&config, true),
            Err(LoaderError::InvalidRootMargin(_))
        ));
    }
}
