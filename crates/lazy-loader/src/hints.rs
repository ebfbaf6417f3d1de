//! Page-load resource hints (`<link rel=preload|preconnect>`)

use crate::config::HintConfig;
use lazy_dom::{Document, NodeId};

/// Append preload/preconnect links to `<head>`.
///
/// Returns the preloaded URLs (images then fonts). Without a `<head>`
/// nothing is added.
pub fn apply_resource_hints(doc: &mut Document, hints: &HintConfig) -> Vec<String> {
    let Some(head) = doc.head() else {
        tracing::debug!("no <head>, skipping resource hints");
        return Vec::new();
    };

    let mut preloaded = Vec::new();
    for src in &hints.critical_images {
        if append_link(doc, head, &[("rel", "preload"), ("href", src.as_str()), ("as", "image")]) {
            preloaded.push(src.clone());
        }
    }
    for font in &hints.fonts {
        let attrs = [
            ("rel", "preload"),
            ("href", font.as_str()),
            ("as", "font"),
            ("type", "font/woff2"),
            ("crossorigin", "anonymous"),
        ];
        if append_link(doc, head, &attrs) {
            preloaded.push(font.clone());
        }
    }
    for origin in &hints.preconnect_origins {
        append_link(
            doc,
            head,
            &[("rel", "preconnect"), ("href", origin.as_str()), ("crossorigin", "anonymous")],
        );
    }
    tracing::debug!(
        "resource hints: {} preload, {} preconnect",
        preloaded.len(),
        hints.preconnect_origins.len()
    );
    preloaded
}

fn append_link(doc: &mut Document, head: NodeId, attrs: &[(&str, &str)]) -> bool {
    let Ok(link) = doc.append_element(head, "link") else {
        return false;
    };
    if let Some(data) = doc.tree.element_mut(link) {
        for (name, value) in attrs {
            data.set_attr(name, value);
        }
    }
    true
}
