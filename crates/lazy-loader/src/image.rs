//! DOM side of the image lifecycle: attribute swaps, state classes and
//! opacity.

use crate::config::PlaceholderText;
use crate::placeholder::{error_placeholder, loading_placeholder};
use crate::resource::ResourceRecord;
use crate::{LoaderError, PENDING_SRC_ATTR, PENDING_SRCSET_ATTR};
use lazy_dom::{Document, DomError, ElementData, NodeId};

pub(crate) const FADE_TRANSITION: &str = "opacity 0.3s ease";
pub(crate) const DIMMED_OPACITY: &str = "0.7";

pub(crate) fn element_mut(doc: &mut Document, id: NodeId) -> Result<&mut ElementData, LoaderError> {
    doc.tree
        .element_mut(id)
        .ok_or(LoaderError::Dom(DomError::NotAnElement(id)))
}

/// Show the loading placeholder on a deferred image with no real `src`
pub(crate) fn prepare_placeholder(
    doc: &mut Document,
    id: NodeId,
    text: &PlaceholderText,
) -> Result<bool, LoaderError> {
    let url = doc.url().to_string();
    let img = element_mut(doc, id)?;
    let needs_placeholder = match img.get_attr("src") {
        None => true,
        Some(src) => src.trim().is_empty() || src == url,
    };
    if !needs_placeholder {
        return Ok(false);
    }
    let src = loading_placeholder(
        img.numeric_attr("width"),
        img.numeric_attr("height"),
        &text.loading_label,
    );
    img.set_attr("src", &src);
    img.style.set_property("opacity", DIMMED_OPACITY);
    img.style.set_property("transition", FADE_TRANSITION);
    Ok(true)
}

/// Enter `loading`, leaving any previous `error` class behind
pub(crate) fn mark_loading(doc: &mut Document, id: NodeId) -> Result<(), LoaderError> {
    let img = element_mut(doc, id)?;
    img.class_list.remove("loaded");
    img.class_list.swap("error", "loading");
    Ok(())
}

/// Copy the pending sources onto the element and drop the markers
pub(crate) fn apply_success(doc: &mut Document, record: &ResourceRecord) -> Result<(), LoaderError> {
    let img = element_mut(doc, record.element)?;
    if let Some(src) = &record.pending_source {
        img.set_attr("src", src);
    }
    if let Some(srcset) = &record.pending_source_set {
        img.set_attr("srcset", srcset);
    }
    img.remove_attr(PENDING_SRC_ATTR);
    img.remove_attr(PENDING_SRCSET_ATTR);
    img.class_list.remove("error");
    img.class_list.swap("loading", "loaded");
    Ok(())
}

/// Swap in the error placeholder and alt text
pub(crate) fn apply_failure(doc: &mut Document, id: NodeId, text: &PlaceholderText) -> Result<(), LoaderError> {
    let img = element_mut(doc, id)?;
    img.class_list.remove("loaded");
    img.class_list.swap("loading", "error");
    img.set_attr("src", &error_placeholder(&text.error_label));
    img.set_attr("alt", &text.error_alt);
    Ok(())
}

pub(crate) fn set_opacity(doc: &mut Document, id: NodeId, value: &str) -> Result<(), LoaderError> {
    element_mut(doc, id)?.style.set_property("opacity", value);
    Ok(())
}
