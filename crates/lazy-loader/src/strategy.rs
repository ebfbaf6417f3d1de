//! Loading strategies
//!
//! Picked once at start-up from the environment's capabilities:
//! `StagedLoader` waits for proximity, `ImmediateLoader` loads everything
//! up front when there is no proximity primitive to wait on.

use crate::config::{Capabilities, LoaderConfig};
use crate::content::{self, CONTENT_SELECTOR, NATIVE_LAZY_SELECTOR};
use crate::image;
use crate::observer::{ObserverPool, ObserverPurpose};
use crate::placeholder::is_inline;
use crate::prefetch::PrefetchScheduler;
use crate::resource::{ResourceRecord, ResourceTracker};
use crate::{LoaderError, PENDING_SRC_ATTR};
use lazy_dom::{Document, NodeId};

/// Everything a strategy may touch while starting
pub struct StartContext<'a> {
    pub document: &'a mut Document,
    pub observers: &'a mut ObserverPool,
    pub tracker: &'a mut ResourceTracker,
    pub config: &'a LoaderConfig,
}

/// What a strategy did at start-up
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StartReport {
    /// Images whose current `src` the page fetches right away
    pub displayed: Vec<NodeId>,
    /// Deferred images waiting for reveal
    pub deferred: usize,
    /// Images loaded without waiting
    pub loaded: usize,
    /// `.lazy-content` blocks registered or revealed
    pub content_blocks: usize,
}

/// Start-up behavior of the loader
pub trait LoadStrategy {
    fn name(&self) -> &'static str;

    /// Register or load the page's resources
    fn start(&self, ctx: &mut StartContext<'_>) -> Result<StartReport, LoaderError>;
}

/// Pick the strategy for the environment
pub fn select_strategy(capabilities: Capabilities) -> Box<dyn LoadStrategy> {
    if capabilities.intersection_observer {
        Box::new(StagedLoader)
    } else {
        Box::new(ImmediateLoader)
    }
}

/// Images with a real, fetchable `src`
fn fetchable_images(doc: &Document, skip: impl Fn(&lazy_dom::ElementData) -> bool) -> Vec<NodeId> {
    doc.query_selector_all("img")
        .unwrap_or_default()
        .into_iter()
        .filter(|&id| {
            doc.tree.element(id).is_some_and(|img| {
                !skip(img)
                    && img
                        .get_attr("src")
                        .is_some_and(|src| !src.trim().is_empty() && !is_inline(src) && src != doc.url())
            })
        })
        .collect()
}

/// Proximity-driven loading
#[derive(Debug, Clone, Copy, Default)]
pub struct StagedLoader;

impl LoadStrategy for StagedLoader {
    fn name(&self) -> &'static str {
        "staged"
    }

    fn start(&self, ctx: &mut StartContext<'_>) -> Result<StartReport, LoaderError> {
        let doc = &mut *ctx.document;

        let deferred = doc.query_selector_all("img[data-src]")?;
        for &id in &deferred {
            image::prepare_placeholder(doc, id, &ctx.config.placeholder)?;
            if let Some(img) = doc.tree.element(id) {
                ctx.tracker.register(ResourceRecord::deferred(id, img));
            }
        }
        ctx.observers.observe(ObserverPurpose::ImageReveal, deferred.iter().copied());

        let blocks = doc.query_selector_all(CONTENT_SELECTOR)?;
        ctx.observers.observe(ObserverPurpose::ContentReveal, blocks.iter().copied());

        ctx.observers
            .observe(ObserverPurpose::Prefetch, PrefetchScheduler::sections(doc));

        let native_lazy = doc.query_selector_all(NATIVE_LAZY_SELECTOR)?;
        ctx.observers.observe(ObserverPurpose::FadeIn, native_lazy);

        // Natively lazy images wait for their fade-in reveal
        let displayed = fetchable_images(doc, |img| {
            img.has_attr(PENDING_SRC_ATTR) || img.get_attr("loading") == Some("lazy")
        });

        Ok(StartReport {
            displayed,
            deferred: deferred.len(),
            loaded: 0,
            content_blocks: blocks.len(),
        })
    }
}

/// Load everything now, in document order
#[derive(Debug, Clone, Copy, Default)]
pub struct ImmediateLoader;

impl LoadStrategy for ImmediateLoader {
    fn name(&self) -> &'static str {
        "immediate"
    }

    fn start(&self, ctx: &mut StartContext<'_>) -> Result<StartReport, LoaderError> {
        let doc = &mut *ctx.document;

        let targets = doc.query_selector_all("img[data-src], img[data-srcset]")?;
        for &id in &targets {
            let Some(img) = doc.tree.element(id) else {
                continue;
            };
            let record = ctx.tracker.register(ResourceRecord::deferred(id, img));
            record.begin()?;
            image::mark_loading(doc, id)?;
            image::apply_success(doc, record)?;
            record.succeed()?;
        }

        let blocks = doc.query_selector_all(CONTENT_SELECTOR)?;
        for &block in &blocks {
            content::reveal_now(doc, block)?;
        }
        for img in doc.query_selector_all(NATIVE_LAZY_SELECTOR)? {
            content::fade_in(doc, img)?;
        }

        tracing::debug!("loaded {} images without staging", targets.len());
        Ok(StartReport {
            displayed: fetchable_images(doc, |_| false),
            deferred: 0,
            loaded: targets.len(),
            content_blocks: blocks.len(),
        })
    }
}
