//! Forward prefetch
//!
//! When a section nears the viewport, the deferred images of the section
//! after it are fetched in the background. Results are discarded; the
//! network's image cache makes the later real load cheap.

use crate::PENDING_SRC_ATTR;
use lazy_dom::{Document, NodeId};

/// Elements whose pending source is warmed ahead of time
const PREFETCH_SELECTOR: &str = "img[data-src]";

/// Collects prefetch targets for revealed sections
#[derive(Debug, Default)]
pub struct PrefetchScheduler {
    issued: usize,
}

impl PrefetchScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sections to observe
    pub fn sections(doc: &Document) -> Vec<NodeId> {
        doc.query_selector_all("section").unwrap_or_default()
    }

    /// Pending sources in the element following `section`, in document order
    pub fn targets_after(&mut self, doc: &Document, section: NodeId) -> Vec<String> {
        let Some(next) = doc.tree.next_element_sibling(section) else {
            return Vec::new();
        };
        let urls: Vec<String> = doc
            .query_selector_all_within(next, PREFETCH_SELECTOR)
            .unwrap_or_default()
            .into_iter()
            .filter_map(|id| doc.tree.element(id))
            .filter_map(|e| e.get_attr(PENDING_SRC_ATTR))
            .filter(|src| !src.trim().is_empty())
            .map(str::to_string)
            .collect();
        self.issued += urls.len();
        urls
    }

    /// Total prefetches handed out
    pub fn issued(&self) -> usize {
        self.issued
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_targets_come_from_next_section_only() {
        let mut doc = Document::new("about:blank");
        let body = doc.body().unwrap();
        let first = doc.append_element(body, "section").unwrap();
        let own = doc.append_element(first, "img").unwrap();
        doc.tree.element_mut(own).unwrap().set_attr("data-src", "own.png");

        let second = doc.append_element(body, "section").unwrap();
        let wrapper = doc.append_element(second, "div").unwrap();
        for src in ["b.png", "c.png"] {
            let img = doc.append_element(wrapper, "img").unwrap();
            doc.tree.element_mut(img).unwrap().set_attr("data-src", src);
        }
        doc.append_element(second, "img").unwrap();
        let banner = doc.append_element(second, "div").unwrap();
        doc.tree.element_mut(banner).unwrap().set_attr("data-src", "banner.png");

        let mut scheduler = PrefetchScheduler::new();
        assert_eq!(PrefetchScheduler::sections(&doc), vec![first, second]);
        assert_eq!(scheduler.targets_after(&doc, first), vec!["b.png", "c.png"]);
        assert!(scheduler.targets_after(&doc, second).is_empty());
        assert_eq!(scheduler.issued(), 2);
    }
}
