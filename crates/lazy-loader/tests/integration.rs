//! Integration tests - full page lifecycle
//!
//! HTML → document → loader start → scroll/resize/timers, with a scripted
//! network standing in for the browser's fetches.

use lazy_dom::{CustomEvent, DOMRect, Document, NodeId};
use lazy_loader::{
    Capabilities, FetchKind, ImageLoadError, LazyLoader, LoadState, LoaderError, PROGRESS_EVENT,
    ScheduledTask, ScriptedNetwork, StagedLoader, error_placeholder,
};
use std::cell::RefCell;
use std::rc::Rc;

const PAGE: &str = r#"<!DOCTYPE html>
<html>
<head><title>lovetap</title></head>
<body>
    <section id="hero">
        <img id="a" data-src="a.png" width="640" height="480" alt="hero">
    </section>
    <section id="features">
        <div id="intro" class="lazy-content"><p>Tap to share</p></div>
        <img id="b" data-src="b.png" data-srcset="b-2x.png 2x">
    </section>
    <section id="gallery">
        <img id="c" data-src="c.png">
        <img id="d" data-src="d.png">
    </section>
    <img id="logo" src="logo.png" loading="eager">
</body>
</html>"#;

fn id(doc: &Document, name: &str) -> NodeId {
    doc.get_element_by_id(name).unwrap()
}

fn attr(loader: &LazyLoader<ScriptedNetwork>, node: NodeId, name: &str) -> Option<String> {
    loader
        .document()
        .tree
        .element(node)
        .and_then(|e| e.get_attr(name))
        .map(str::to_string)
}

fn classes(loader: &LazyLoader<ScriptedNetwork>, node: NodeId) -> String {
    loader.document().tree.element(node).unwrap().class_list.value()
}

/// Page laid out top to bottom in a 1280×800 viewport
fn layout(loader: &mut LazyLoader<ScriptedNetwork>) {
    let rects = [
        ("hero", 0.0, 800.0),
        ("a", 100.0, 480.0),
        ("features", 800.0, 800.0),
        ("intro", 850.0, 300.0),
        ("b", 1200.0, 400.0),
        ("gallery", 1600.0, 800.0),
        ("c", 1700.0, 400.0),
        ("d", 2200.0, 400.0),
        ("logo", 2500.0, 100.0),
    ];
    for (name, y, height) in rects {
        let node = id(loader.document(), name);
        loader.set_element_rect(node, DOMRect::new(0.0, y, 640.0, height));
    }
}

fn started(net: ScriptedNetwork, capabilities: Capabilities) -> LazyLoader<ScriptedNetwork> {
    let doc = lazy_html::parse(PAGE).unwrap();
    let mut loader = LazyLoader::builder(doc, net)
        .capabilities(capabilities)
        .viewport(1280.0, 800.0)
        .build()
        .unwrap();
    layout(&mut loader);
    loader.start().unwrap();
    loader
}

fn retry_timers(loader: &LazyLoader<ScriptedNetwork>) -> Vec<u64> {
    loader
        .pending_timers()
        .into_iter()
        .filter(|(_, task)| matches!(task, ScheduledTask::Retry { .. }))
        .map(|(due, _)| due)
        .collect()
}

// ============================================================================
// LOAD LIFECYCLE
// ============================================================================

#[test]
fn test_visible_image_loads_on_start() {
    let mut loader = started(ScriptedNetwork::new(), Capabilities::modern());
    let a = id(loader.document(), "a");

    assert_eq!(attr(&loader, a, "src").as_deref(), Some("a.png"));
    assert_eq!(attr(&loader, a, "data-src"), None);
    assert_eq!(loader.state(a), Some(LoadState::Loaded));
    let class = classes(&loader, a);
    assert!(class.contains("loaded"));
    assert!(!class.contains("loading"));

    // Opacity follows one frame later
    let opacity = |l: &LazyLoader<ScriptedNetwork>| {
        l.document().tree.element(a).unwrap().style.get_property("opacity").map(str::to_string)
    };
    assert_eq!(opacity(&loader).as_deref(), Some("0.7"));
    loader.tick_frame();
    assert_eq!(opacity(&loader).as_deref(), Some("1"));
}

#[test]
fn test_offscreen_images_wait_with_placeholder() {
    let loader = started(ScriptedNetwork::new(), Capabilities::modern());
    let c = id(loader.document(), "c");

    assert_eq!(loader.state(c), Some(LoadState::Pending));
    assert_eq!(attr(&loader, c, "data-src").as_deref(), Some("c.png"));
    assert!(attr(&loader, c, "src").unwrap().starts_with("data:image/svg+xml;base64,"));
    assert!(!loader.network().urls(FetchKind::Probe).contains(&"c.png"));
}

#[test]
fn test_scroll_reveals_with_margin() {
    let mut loader = started(ScriptedNetwork::new(), Capabilities::modern());
    let b = id(loader.document(), "b");
    let c = id(loader.document(), "c");

    // b starts at 1200; the 50px margin reaches it once the viewport bottom passes 1150
    loader.scroll_to(0.0, 340.0);
    assert_eq!(loader.state(b), Some(LoadState::Pending));
    loader.scroll_to(0.0, 360.0);
    assert_eq!(loader.state(b), Some(LoadState::Loaded));
    assert_eq!(attr(&loader, b, "srcset").as_deref(), Some("b-2x.png 2x"));
    assert_eq!(attr(&loader, b, "data-srcset"), None);
    assert_eq!(loader.state(c), Some(LoadState::Pending));
}

#[test]
fn test_manual_load_resolves() {
    let mut loader = started(ScriptedNetwork::new(), Capabilities::modern());
    let d = id(loader.document(), "d");

    let promise = loader.load(d).unwrap();
    assert_eq!(smol::block_on(promise.settled()), Ok(d));
    assert_eq!(attr(&loader, d, "src").as_deref(), Some("d.png"));

    // Reveal afterwards is a no-op
    loader.scroll_to(0.0, 2000.0);
    assert_eq!(loader.network().urls(FetchKind::Probe).iter().filter(|u| **u == "d.png").count(), 1);
}

#[test]
fn test_second_load_while_loading_is_rejected() {
    let mut loader = started(ScriptedNetwork::new(), Capabilities::modern());
    let c = id(loader.document(), "c");

    loader.network_mut().pause();
    let mut promise = loader.load(c).unwrap();
    assert!(promise.try_result().is_none());
    assert!(matches!(loader.load(c), Err(LoaderError::AlreadyLoading(n)) if n == c));
    assert_eq!(loader.network().in_flight().len(), 1);

    loader.network_mut().resume();
    loader.refresh();
    assert_eq!(promise.try_result(), Some(Ok(c)));
}

#[test]
fn test_load_requires_pending_source() {
    let mut loader = started(ScriptedNetwork::new(), Capabilities::modern());
    let logo = id(loader.document(), "logo");
    let a = id(loader.document(), "a");

    assert!(matches!(loader.load(logo), Err(LoaderError::NotDeferred(_))));
    // Loaded images no longer carry a marker
    assert!(matches!(loader.load(a), Err(LoaderError::NotDeferred(_))));
}

#[test]
fn test_failed_load_rejects_with_url() {
    let mut loader = started(ScriptedNetwork::new().unreachable("c.png"), Capabilities::modern());
    let c = id(loader.document(), "c");

    let err = smol::block_on(loader.load(c).unwrap().settled()).unwrap_err();
    assert_eq!(
        err,
        ImageLoadError::Failed {
            element: c,
            url: "c.png".to_string()
        }
    );
    assert_eq!(err.to_string(), "Image loading failed: c.png");
    assert_eq!(loader.state(c), Some(LoadState::Error));
    assert_eq!(classes(&loader, c), "error");
    assert_eq!(attr(&loader, c, "alt").as_deref(), Some("Image failed to load"));
}

#[test]
fn test_removed_element_cancels_probe() {
    let mut loader = started(ScriptedNetwork::new(), Capabilities::modern());
    let c = id(loader.document(), "c");

    loader.network_mut().pause();
    let promise = loader.load(c).unwrap();
    loader.remove_element(c);
    loader.network_mut().resume();
    loader.refresh();

    assert_eq!(smol::block_on(promise.settled()), Err(ImageLoadError::Cancelled(c)));
    assert_eq!(loader.state(c), None);
    assert!(!loader.document().tree.is_connected(c));
}

// ============================================================================
// RETRY
// ============================================================================

#[test]
fn test_probe_retries_then_gives_up() {
    let mut loader = started(ScriptedNetwork::new().unreachable("a.png"), Capabilities::modern());
    let a = id(loader.document(), "a");
    assert_eq!(loader.state(a), Some(LoadState::Error));

    let mut delays = Vec::new();
    while let Some(&due) = retry_timers(&loader).first() {
        delays.push(due - loader.now());
        loader.advance(due - loader.now());
    }

    assert_eq!(delays, vec![1000, 2000, 4000]);
    assert_eq!(loader.state(a), Some(LoadState::Exhausted));
    assert_eq!(loader.tracker().get(a).unwrap().retry_count(), 3);
    assert_eq!(attr(&loader, a, "src"), Some(error_placeholder("Image unavailable")));
    assert_eq!(attr(&loader, a, "alt").as_deref(), Some("Image failed to load"));
    assert_eq!(
        loader.network().urls(FetchKind::Probe).iter().filter(|u| **u == "a.png").count(),
        4
    );

    // Terminal: nothing further fires
    loader.advance(60_000);
    assert!(retry_timers(&loader).is_empty());
    assert_eq!(loader.network().urls(FetchKind::Probe).len(), 4);
}

#[test]
fn test_probe_recovers_after_transient_failure() {
    let mut loader = started(ScriptedNetwork::new().fail_times("a.png", 2), Capabilities::modern());
    let a = id(loader.document(), "a");

    loader.advance(1000);
    assert_eq!(loader.state(a), Some(LoadState::Error));
    assert_eq!(retry_timers(&loader), vec![3000]);

    loader.advance(2000);
    assert_eq!(loader.state(a), Some(LoadState::Loaded));
    assert_eq!(attr(&loader, a, "src").as_deref(), Some("a.png"));
    assert_eq!(classes(&loader, a).split(' ').filter(|c| *c == "error").count(), 0);
    assert!(retry_timers(&loader).is_empty());
}

#[test]
fn test_displayed_image_retries_its_src() {
    let mut loader = started(ScriptedNetwork::new().fail_times("logo.png", 2), Capabilities::modern());
    let logo = id(loader.document(), "logo");

    assert_eq!(loader.state(logo), Some(LoadState::Loaded));
    assert_eq!(retry_timers(&loader), vec![1000]);

    loader.run_until_idle();
    assert_eq!(loader.tracker().get(logo).unwrap().retry_count(), 2);
    assert_eq!(attr(&loader, logo, "src").as_deref(), Some("logo.png"));
    assert_eq!(loader.network().urls(FetchKind::Display).iter().filter(|u| **u == "logo.png").count(), 3);
}

#[test]
fn test_displayed_image_exhausts() {
    let mut loader = started(ScriptedNetwork::new().unreachable("logo.png"), Capabilities::modern());
    let logo = id(loader.document(), "logo");

    loader.run_until_idle();
    assert_eq!(loader.state(logo), Some(LoadState::Exhausted));
    assert_eq!(attr(&loader, logo, "src"), Some(error_placeholder("Image unavailable")));
    assert_eq!(loader.tracker().get(logo).unwrap().retry_count(), 3);
}

// ============================================================================
// PREFETCH, CONTENT, PROGRESS
// ============================================================================

#[test]
fn test_prefetch_warms_next_section() {
    let mut loader = started(ScriptedNetwork::new(), Capabilities::modern());
    let b = id(loader.document(), "b");

    assert_eq!(loader.network().urls(FetchKind::Prefetch), vec!["b.png", "c.png", "d.png"]);
    // Official state is untouched
    assert_eq!(loader.state(b), Some(LoadState::Pending));
    assert_eq!(attr(&loader, b, "data-src").as_deref(), Some("b.png"));

    loader.scroll_to(0.0, 800.0);
    assert_eq!(loader.state(b), Some(LoadState::Loaded));
    assert!(loader.network().cache().hits("b.png") >= 1);
}

#[test]
fn test_content_reveal_sequence() {
    let mut loader = started(ScriptedNetwork::new(), Capabilities::modern());
    let intro = id(loader.document(), "intro");

    assert!(classes(&loader, intro).contains("content-loading"));
    loader.advance(299);
    assert!(!classes(&loader, intro).contains("content-loaded"));
    loader.advance(1);
    assert_eq!(classes(&loader, intro), "lazy-content content-loaded");
    let style = &loader.document().tree.element(intro).unwrap().style;
    assert_eq!(style.get_property("opacity"), Some("1"));
    assert_eq!(style.get_property("transform"), Some("translateY(0)"));
}

#[test]
fn test_progress_events() {
    let doc = lazy_html::parse(PAGE).unwrap();
    let mut loader = LazyLoader::builder(doc, ScriptedNetwork::new())
        .viewport(1280.0, 800.0)
        .build()
        .unwrap();
    let seen = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&seen);
    loader.document_mut().add_event_listener(
        PROGRESS_EVENT,
        Box::new(move |event: &CustomEvent| sink.borrow_mut().push(event.detail.clone())),
    );
    layout(&mut loader);
    loader.start().unwrap();

    {
        let seen = seen.borrow();
        assert_eq!(seen.len(), 2);
        assert_eq!(seen[0]["imagesLoaded"].as_u64(), Some(1));
        assert_eq!(seen[1]["totalImages"].as_u64(), Some(5));
        assert_eq!(seen[1]["progress"].as_f64(), Some(40.0));
    }

    loader.scroll_to(0.0, 800.0);
    loader.scroll_to(0.0, 2000.0);
    let last = loader.progress().unwrap();
    assert_eq!(last.images_loaded, 5);
    assert_eq!(last.progress, 100.0);
}

// ============================================================================
// ENVIRONMENT FALLBACK
// ============================================================================

#[test]
fn test_legacy_environment_loads_everything() {
    let loader = started(ScriptedNetwork::new(), Capabilities::legacy());
    assert_eq!(loader.strategy_name(), "immediate");

    let doc = loader.document();
    assert!(doc.query_selector_all("[data-src]").unwrap().is_empty());
    assert!(doc.query_selector_all("[data-srcset]").unwrap().is_empty());
    for name in ["a", "b", "c", "d"] {
        let node = id(doc, name);
        assert_eq!(loader.state(node), Some(LoadState::Loaded));
        assert_eq!(attr(&loader, node, "src"), Some(format!("{}.png", name)));
    }
    assert!(classes(&loader, id(doc, "intro")).contains("content-loaded"));
    assert!(loader.network().urls(FetchKind::Probe).is_empty());
}

#[test]
fn test_staged_without_observer_fires_immediately() {
    let doc = lazy_html::parse(PAGE).unwrap();
    let mut loader = LazyLoader::builder(doc, ScriptedNetwork::new())
        .capabilities(Capabilities::legacy())
        .strategy(Box::new(StagedLoader))
        .build()
        .unwrap();
    // No layout at all
    loader.start().unwrap();

    assert!(loader.document().query_selector_all("img[data-src]").unwrap().is_empty());
    assert_eq!(loader.tracker().in_state(LoadState::Loaded).len(), 4);
}

#[test]
fn test_start_twice() {
    let mut loader = started(ScriptedNetwork::new(), Capabilities::modern());
    assert!(matches!(loader.start(), Err(LoaderError::AlreadyStarted)));
}

#[test]
fn test_resource_hints_in_head() {
    let loader = started(ScriptedNetwork::new(), Capabilities::modern());
    let doc = loader.document();
    assert_eq!(doc.query_selector_all(r#"link[rel="preload"]"#).unwrap().len(), 4);
    assert_eq!(doc.query_selector_all(r#"link[rel="preconnect"]"#).unwrap().len(), 2);
    assert_eq!(loader.network().urls(FetchKind::Preload).len(), 4);
}

// ============================================================================
// RESPONSIVE IMAGES
// ============================================================================

const RESPONSIVE: &str = r#"<html><body>
    <img id="r" data-sizes='{"default": "s.png", "768": "m.png", "1200": "l.png"}'>
    <img id="broken" data-sizes="{oops">
</body></html>"#;

#[test]
fn test_resize_is_debounced() {
    let doc = lazy_html::parse(RESPONSIVE).unwrap();
    let mut loader = LazyLoader::builder(doc, ScriptedNetwork::new())
        .viewport(1280.0, 800.0)
        .build()
        .unwrap();
    loader.start().unwrap();
    let r = id(loader.document(), "r");
    let broken = id(loader.document(), "broken");
    assert_eq!(attr(&loader, r, "data-src").as_deref(), Some("l.png"));
    assert_eq!(attr(&loader, broken, "data-src"), None);

    loader.resize(800.0, 800.0);
    loader.advance(100);
    loader.resize(700.0, 800.0);
    loader.advance(100);
    loader.resize(1000.0, 800.0);
    let settles = loader
        .pending_timers()
        .into_iter()
        .filter(|(_, t)| *t == ScheduledTask::ResizeSettled)
        .count();
    assert_eq!(settles, 1);

    loader.advance(249);
    assert_eq!(attr(&loader, r, "data-src").as_deref(), Some("l.png"));
    loader.advance(1);
    assert_eq!(attr(&loader, r, "data-src").as_deref(), Some("m.png"));

    // The record follows the marker
    loader.set_element_rect(r, DOMRect::new(0.0, 0.0, 100.0, 100.0));
    loader.refresh();
    assert_eq!(attr(&loader, r, "src").as_deref(), Some("m.png"));

    // Loaded images never get a marker back
    loader.resize(400.0, 800.0);
    loader.advance(250);
    assert_eq!(attr(&loader, r, "data-src"), None);
    assert_eq!(loader.state(r), Some(LoadState::Loaded));
}

// ============================================================================
// INVARIANTS
// ============================================================================

#[test]
fn test_never_loading_and_loaded_together() {
    let mut loader = started(ScriptedNetwork::new().fail_times("c.png", 1), Capabilities::modern());
    for y in [0.0, 400.0, 800.0, 1200.0, 1600.0, 2000.0] {
        loader.scroll_to(0.0, y);
        loader.advance(500);
    }
    loader.run_until_idle();

    let doc = loader.document();
    for img in doc.query_selector_all("img").unwrap() {
        let class = &doc.tree.element(img).unwrap().class_list;
        assert!(!(class.contains("loading") && class.contains("loaded")));
        if loader.state(img) == Some(LoadState::Loaded) {
            assert!(!doc.tree.element(img).unwrap().has_attr("data-src"));
        }
        if let Some(record) = loader.tracker().get(img) {
            assert!(record.retry_count() <= 3);
        }
    }
    assert_eq!(loader.tracker().in_state(LoadState::Loaded).len(), 4);
}
