//! Responsive image pass
//!
//! `data-sizes` holds a JSON object mapping breakpoints to URLs, e.g.
//! `{"default": "s.png", "768": "m.png", "1200px": "l.png"}`. The widest
//! breakpoint not exceeding the viewport width wins.

use crate::resource::{LoadState, ResourceTracker};
use crate::{LoaderError, PENDING_SRC_ATTR, SIZES_ATTR};
use lazy_dom::Document;
use std::collections::BTreeMap;

/// Parsed breakpoint table
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ResponsiveSizeTable {
    default: Option<String>,
    breakpoints: BTreeMap<u32, String>,
}

impl ResponsiveSizeTable {
    pub fn parse(json: &str) -> Result<Self, LoaderError> {
        let raw: BTreeMap<String, String> =
            serde_json::from_str(json).map_err(|e| LoaderError::InvalidSizeTable(e.to_string()))?;

        let mut table = Self::default();
        for (key, url) in raw {
            if key == "default" {
                table.default = Some(url);
                continue;
            }
            let digits: String = key.chars().take_while(char::is_ascii_digit).collect();
            match digits.parse::<u32>() {
                Ok(width) => {
                    table.breakpoints.insert(width, url);
                }
                Err(_) => tracing::debug!("ignoring breakpoint key {:?}", key),
            }
        }
        Ok(table)
    }

    /// URL for a viewport `width`, if any entry applies
    pub fn select(&self, width: f32) -> Option<&str> {
        self.breakpoints
            .iter()
            .take_while(|&(&bp, _)| bp as f32 <= width)
            .last()
            .map(|(_, url)| url.as_str())
            .or(self.default.as_deref())
    }

    pub fn is_empty(&self) -> bool {
        self.default.is_none() && self.breakpoints.is_empty()
    }
}

/// Rewrite `data-src` of every `img[data-sizes]` for `width`.
///
/// Images already loading or loaded are left alone. Returns how many
/// elements changed.
pub fn apply_responsive_sources(doc: &mut Document, tracker: &mut ResourceTracker, width: f32) -> usize {
    let candidates = doc.query_selector_all("img[data-sizes]").unwrap_or_default();
    let mut changed = 0;

    for id in candidates {
        if let Some(state) = tracker.state(id) {
            if !matches!(state, LoadState::Pending | LoadState::Error) {
                continue;
            }
        }
        let Some(img) = doc.tree.element_mut(id) else {
            continue;
        };
        let table = match img.get_attr(SIZES_ATTR).map(ResponsiveSizeTable::parse) {
            Some(Ok(table)) => table,
            Some(Err(e)) => {
                tracing::warn!("skipping {:?}: {}", id, e);
                continue;
            }
            None => continue,
        };
        let Some(url) = table.select(width) else {
            continue;
        };
        if img.get_attr(PENDING_SRC_ATTR) == Some(url) {
            continue;
        }
        img.set_attr(PENDING_SRC_ATTR, url);
        if let Some(record) = tracker.get_mut(id) {
            record.pending_source = Some(url.to_string());
        }
        changed += 1;
    }

    if changed > 0 {
        tracing::debug!("responsive pass at {}px updated {} images", width, changed);
    }
    changed
}
