//! Content reveal effects for `.lazy-content` blocks and natively lazy
//! images.

use crate::LoaderError;
use crate::image::element_mut;
use lazy_dom::{Document, NodeId};

pub(crate) const CONTENT_SELECTOR: &str = ".lazy-content";
pub(crate) const NATIVE_LAZY_SELECTOR: &str = r#"img[loading="lazy"]"#;

/// First half of the reveal: mark the block as loading
pub(crate) fn begin_reveal(doc: &mut Document, id: NodeId) -> Result<(), LoaderError> {
    element_mut(doc, id)?.class_list.add("content-loading");
    Ok(())
}

/// Second half, after the settle delay
pub(crate) fn finish_reveal(doc: &mut Document, id: NodeId) -> Result<(), LoaderError> {
    let block = element_mut(doc, id)?;
    block.class_list.swap("content-loading", "content-loaded");
    block.style.set_property("opacity", "1");
    block.style.set_property("transform", "translateY(0)");
    Ok(())
}

/// Both halves at once, for the immediate strategy
pub(crate) fn reveal_now(doc: &mut Document, id: NodeId) -> Result<(), LoaderError> {
    begin_reveal(doc, id)?;
    finish_reveal(doc, id)
}

pub(crate) fn fade_in(doc: &mut Document, id: NodeId) -> Result<(), LoaderError> {
    element_mut(doc, id)?.class_list.add("fade-in");
    Ok(())
}

/// Add `loading="lazy"` to every image lacking a `loading` attribute
pub(crate) fn hint_native_lazy(doc: &mut Document) -> usize {
    let images = doc.query_selector_all("img").unwrap_or_default();
    let mut hinted = 0;
    for id in images {
        if let Some(img) = doc.tree.element_mut(id) {
            if !img.has_attr("loading") {
                img.set_attr("loading", "lazy");
                hinted += 1;
            }
        }
    }
    hinted
}
