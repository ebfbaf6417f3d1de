//! DOM Node
//!
//! Nodes link to each other through `NodeId`s into the arena rather than
//! pointers, so the tree can be mutated freely from a single owner.

use crate::{DOMTokenList, InlineStyle, NodeId};

/// DOM Node - Core structure
#[derive(Debug)]
pub struct Node {
    /// Parent node (NONE if root or detached)
    pub parent: NodeId,
    /// First child
    pub first_child: NodeId,
    /// Last child (for O(1) append)
    pub last_child: NodeId,
    /// Previous sibling
    pub prev_sibling: NodeId,
    /// Next sibling
    pub next_sibling: NodeId,
    /// Node-specific data
    pub data: NodeData,
}

impl Node {
    fn with_data(data: NodeData) -> Self {
        Self {
            parent: NodeId::NONE,
            first_child: NodeId::NONE,
            last_child: NodeId::NONE,
            prev_sibling: NodeId::NONE,
            next_sibling: NodeId::NONE,
            data,
        }
    }

    /// Create a new element node
    pub fn element(tag: &str) -> Self {
        Self::with_data(NodeData::Element(ElementData::new(tag)))
    }

    /// Create a new text node
    pub fn text(content: String) -> Self {
        Self::with_data(NodeData::Text(content))
    }

    /// Create a new comment node
    pub fn comment(content: String) -> Self {
        Self::with_data(NodeData::Comment(content))
    }

    /// Create a document node
    pub fn document() -> Self {
        Self::with_data(NodeData::Document)
    }

    /// Check if this is an element
    #[inline]
    pub fn is_element(&self) -> bool {
        matches!(self.data, NodeData::Element(_))
    }

    /// Get element data if this is an element
    #[inline]
    pub fn as_element(&self) -> Option<&ElementData> {
        match &self.data {
            NodeData::Element(e) => Some(e),
            _ => None,
        }
    }

    /// Get mutable element data
    #[inline]
    pub fn as_element_mut(&mut self) -> Option<&mut ElementData> {
        match &mut self.data {
            NodeData::Element(e) => Some(e),
            _ => None,
        }
    }

    /// Get text content if this is a text node
    #[inline]
    pub(crate) fn as_text(&self) -> Option<&str> {
        match &self.data {
            NodeData::Text(t) => Some(t),
            _ => None,
        }
    }
}

/// Node-specific data
#[derive(Debug)]
pub enum NodeData {
    /// Document root
    Document,
    /// DOCTYPE
    Doctype { name: String },
    /// Element
    Element(ElementData),
    /// Text content
    Text(String),
    /// Comment
    Comment(String),
}

/// Attribute
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute {
    pub name: String,
    pub value: String,
}

/// Element-specific data
///
/// `class` and `style` never appear in `attrs`: they are reflected into
/// `class_list` and `style` on write and serialized back on read.
#[derive(Debug)]
pub struct ElementData {
    /// Lowercase tag name
    pub tag: String,
    attrs: Vec<Attribute>,
    /// Parsed class attribute
    pub class_list: DOMTokenList,
    /// Parsed style attribute
    pub style: InlineStyle,
}

impl ElementData {
    pub fn new(tag: &str) -> Self {
        Self {
            tag: tag.to_ascii_lowercase(),
            attrs: Vec::new(),
            class_list: DOMTokenList::new(),
            style: InlineStyle::new(),
        }
    }

    /// Check the tag name (case-insensitive)
    pub fn is(&self, tag: &str) -> bool {
        self.tag.eq_ignore_ascii_case(tag)
    }

    /// Get an attribute value
    pub fn get_attr(&self, name: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|a| a.name.eq_ignore_ascii_case(name))
            .map(|a| a.value.as_str())
    }

    /// Check if an attribute is present
    pub fn has_attr(&self, name: &str) -> bool {
        match name {
            "class" => self.class_list.length() > 0,
            "style" => !self.style.is_empty(),
            _ => self.get_attr(name).is_some(),
        }
    }

    /// Set an attribute
    pub fn set_attr(&mut self, name: &str, value: &str) {
        let name = name.to_ascii_lowercase();
        match name.as_str() {
            "class" => self.class_list.set_value(value),
            "style" => self.style = InlineStyle::parse(value),
            _ => {
                if let Some(attr) = self.attrs.iter_mut().find(|a| a.name == name) {
                    attr.value = value.to_string();
                } else {
                    self.attrs.push(Attribute {
                        name,
                        value: value.to_string(),
                    });
                }
            }
        }
    }

    /// Remove an attribute, returns whether it existed
    pub fn remove_attr(&mut self, name: &str) -> bool {
        match name {
            "class" => {
                let had = self.class_list.length() > 0;
                self.class_list = DOMTokenList::new();
                had
            }
            "style" => {
                let had = !self.style.is_empty();
                self.style = InlineStyle::new();
                had
            }
            _ => {
                let before = self.attrs.len();
                self.attrs.retain(|a| !a.name.eq_ignore_ascii_case(name));
                self.attrs.len() != before
            }
        }
    }

    /// Plain attributes (without `class`/`style`)
    pub fn attrs(&self) -> &[Attribute] {
        &self.attrs
    }

    /// `id` attribute
    pub fn id(&self) -> Option<&str> {
        self.get_attr("id")
    }

    /// Parse a numeric attribute such as `width`
    pub fn numeric_attr(&self, name: &str) -> Option<u32> {
        self.get_attr(name)?.trim().parse().ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_get_attr() {
        let mut elem = ElementData::new("IMG");
        assert_eq!(elem.tag, "img");

        elem.set_attr("data-src", "a.png");
        elem.set_attr("DATA-SRC", "b.png");
        assert_eq!(elem.get_attr("data-src"), Some("b.png"));
        assert_eq!(elem.attrs().len(), 1);

        assert!(elem.remove_attr("data-src"));
        assert!(!elem.has_attr("data-src"));
    }

    #[test]
    fn test_class_and_style_reflect() {
        let mut elem = ElementData::new("div");
        elem.set_attr("class", "lazy-content hero");
        elem.set_attr("style", "opacity: 0.5");

        assert!(elem.class_list.contains("hero"));
        assert_eq!(elem.style.get_property("opacity"), Some("0.5"));
        assert!(elem.attrs().is_empty());
    }

    #[test]
    fn test_numeric_attr() {
        let mut elem = ElementData::new("img");
        elem.set_attr("width", "640");
        elem.set_attr("height", "auto");

        assert_eq!(elem.numeric_attr("width"), Some(640));
        assert_eq!(elem.numeric_attr("height"), None);
    }
}
