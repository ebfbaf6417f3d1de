//! Lazy DOM - Document Object Model
//!
//! Arena-backed DOM tree with just enough of the web platform surface
//! (attributes, classList, inline style, selectors, custom events)
//! for the lazy-loading controller to drive.

mod classlist;
mod document;
mod events;
mod geometry;
mod node;
mod selector;
mod style;
mod tree;

pub use classlist::DOMTokenList;
pub use document::Document;
pub use events::{CustomEvent, EventListener};
pub use geometry::DOMRect;
pub use node::{Attribute, ElementData, Node, NodeData};
pub use selector::{AttrSelector, CompoundSelector, SelectorList};
pub use style::InlineStyle;
pub use tree::DomTree;

/// Node identifier (index into arena)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub(crate) u32);

impl NodeId {
    /// Root (document) node ID
    pub const ROOT: NodeId = NodeId(0);
    /// Sentinel for "no node"
    pub const NONE: NodeId = NodeId(u32::MAX);

    /// Build an id from its raw arena index
    pub fn from_raw(raw: u32) -> Self {
        NodeId(raw)
    }

    /// Raw arena index
    pub fn raw(self) -> u32 {
        self.0
    }

    /// Check that this is not the NONE sentinel
    #[inline]
    pub fn is_valid(self) -> bool {
        self.0 != u32::MAX
    }

    #[inline]
    pub(crate) fn index(self) -> usize {
        self.0 as usize
    }
}

/// DOM error
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum DomError {
    #[error("Invalid selector: {0}")]
    InvalidSelector(String),

    #[error("Node not found: {0:?}")]
    NodeNotFound(NodeId),

    #[error("Node {0:?} is not an element")]
    NotAnElement(NodeId),

    #[error("Cannot insert {child:?} into {parent:?}")]
    HierarchyRequest { parent: NodeId, child: NodeId },
}
