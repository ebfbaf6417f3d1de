//! Simple selectors
//!
//! Supports compound selectors (`img[data-src]`, `.lazy-content`,
//! `img[loading="lazy"]`, `#hero`) joined into comma lists. Combinators are
//! rejected.

use crate::{DomError, ElementData};

/// `[name]` or `[name="value"]`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttrSelector {
    pub name: String,
    pub value: Option<String>,
}

/// Tag, id, classes and attribute tests that must all match
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CompoundSelector {
    pub tag: Option<String>,
    pub id: Option<String>,
    pub classes: Vec<String>,
    pub attrs: Vec<AttrSelector>,
}

impl CompoundSelector {
    pub fn matches(&self, elem: &ElementData) -> bool {
        if let Some(tag) = &self.tag {
            if !elem.is(tag) {
                return false;
            }
        }
        if let Some(id) = &self.id {
            if elem.id() != Some(id.as_str()) {
                return false;
            }
        }
        if !self.classes.iter().all(|c| elem.class_list.contains(c)) {
            return false;
        }
        self.attrs.iter().all(|a| match &a.value {
            Some(v) => elem.get_attr(&a.name) == Some(v.as_str()),
            None => elem.has_attr(&a.name),
        })
    }

    fn parse(input: &str) -> Result<Self, DomError> {
        let invalid = || DomError::InvalidSelector(input.to_string());
        let s = input.trim();
        if s.is_empty() {
            return Err(invalid());
        }

        let mut sel = CompoundSelector::default();
        let tag_end = s.find(['.', '#', '[']).unwrap_or(s.len());
        let tag = &s[..tag_end];
        if !tag.is_empty() && tag != "*" {
            if !is_ident(tag) {
                return Err(invalid());
            }
            sel.tag = Some(tag.to_ascii_lowercase());
        }

        let mut rest = &s[tag_end..];
        while let Some(c) = rest.chars().next() {
            match c {
                '.' | '#' => {
                    let body = &rest[1..];
                    let end = body.find(['.', '#', '[']).unwrap_or(body.len());
                    let name = &body[..end];
                    if !is_ident(name) {
                        return Err(invalid());
                    }
                    if c == '.' {
                        sel.classes.push(name.to_string());
                    } else {
                        sel.id = Some(name.to_string());
                    }
                    rest = &body[end..];
                }
                '[' => {
                    let close = rest.find(']').ok_or_else(invalid)?;
                    let inner = &rest[1..close];
                    let attr = match inner.split_once('=') {
                        Some((name, value)) => AttrSelector {
                            name: name.trim().to_ascii_lowercase(),
                            value: Some(unquote(value.trim()).to_string()),
                        },
                        None => AttrSelector {
                            name: inner.trim().to_ascii_lowercase(),
                            value: None,
                        },
                    };
                    if !is_ident(&attr.name) {
                        return Err(invalid());
                    }
                    sel.attrs.push(attr);
                    rest = &rest[close + 1..];
                }
                _ => return Err(invalid()),
            }
        }
        Ok(sel)
    }
}

/// Comma-separated selector list
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectorList(pub Vec<CompoundSelector>);

impl SelectorList {
    pub fn parse(input: &str) -> Result<Self, DomError> {
        input
            .split(',')
            .map(CompoundSelector::parse)
            .collect::<Result<Vec<_>, _>>()
            .map(SelectorList)
    }

    pub fn matches(&self, elem: &ElementData) -> bool {
        self.0.iter().any(|s| s.matches(elem))
    }
}

fn is_ident(s: &str) -> bool {
    !s.is_empty() && s.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

fn unquote(s: &str) -> &str {
    s.strip_prefix('"')
        .and_then(|v| v.strip_suffix('"'))
        .or_else(|| s.strip_prefix('\'').and_then(|v| v.strip_suffix('\'')))
        .unwrap_or(s)
}
