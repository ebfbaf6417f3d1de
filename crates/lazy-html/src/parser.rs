//! HTML5 Parser implementation
//!
//! Parses into html5ever's RcDom, then copies the tree into the arena.

use crate::HtmlError;
use html5ever::parse_document;
use html5ever::tendril::TendrilSink;
use lazy_dom::{Document, DomTree, NodeId};
use markup5ever_rcdom::{Handle, NodeData as RcNodeData, RcDom};

/// HTML5 parser
#[derive(Debug, Default)]
pub struct HtmlParser {
    keep_comments: bool,
}

impl HtmlParser {
    pub fn new() -> Self {
        Self::default()
    }

    /// Keep comment nodes in the output tree (dropped by default)
    pub fn with_comments(mut self, keep: bool) -> Self {
        self.keep_comments = keep;
        self
    }

    /// Parse HTML string into a Document
    pub fn parse(&self, html: &str) -> Result<Document, HtmlError> {
        self.parse_with_url(html, "about:blank")
    }

    /// Parse HTML with a document URL
    pub fn parse_with_url(&self, html: &str, url: &str) -> Result<Document, HtmlError> {
        tracing::debug!("Parsing HTML document: {}", url);

        let dom = parse_document(RcDom::default(), Default::default())
            .from_utf8()
            .read_from(&mut html.as_bytes())?;

        let mut document = Document::empty(url);
        let root = document.tree().root();
        self.convert_node(&dom.document, document.tree_mut(), root)?;
        document.finalize();

        tracing::debug!("Parsed {} nodes", document.tree().len());
        Ok(document)
    }

    fn convert_node(&self, handle: &Handle, tree: &mut DomTree, parent: NodeId) -> Result<(), HtmlError> {
        match &handle.data {
            RcNodeData::Document => {
                for child in handle.children.borrow().iter() {
                    self.convert_node(child, tree, parent)?;
                }
            }
            RcNodeData::Doctype { name, .. } => {
                let id = tree.create_doctype(name);
                tree.append_child(parent, id)?;
            }
            RcNodeData::Text { contents } => {
                let text = contents.borrow();
                // Inter-element whitespace carries nothing the loader needs
                if !text.trim().is_empty() {
                    let id = tree.create_text(&text);
                    tree.append_child(parent, id)?;
                }
            }
            RcNodeData::Comment { contents } => {
                if self.keep_comments {
                    let id = tree.create_comment(contents);
                    tree.append_child(parent, id)?;
                }
            }
            RcNodeData::Element { name, attrs, .. } => {
                let id = tree.create_element(&name.local);
                if let Some(elem) = tree.element_mut(id) {
                    for attr in attrs.borrow().iter() {
                        elem.set_attr(&attr.name.local, &attr.value);
                    }
                }
                tree.append_child(parent, id)?;

                for child in handle.children.borrow().iter() {
                    self.convert_node(child, tree, id)?;
                }
            }
            RcNodeData::ProcessingInstruction { .. } => {}
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_structure() {
        let html = "<html><head><title>Lovetap</title></head><body><p>Hello</p></body></html>";
        let doc = HtmlParser::new().parse(html).unwrap();

        assert!(doc.head().is_some());
        assert!(doc.body().is_some());
        assert_eq!(doc.title(), "Lovetap");
    }

    #[test]
    fn test_fragment_gets_wrapped() {
        let doc = HtmlParser::new().parse("<img data-src=\"a.png\">").unwrap();
        let imgs = doc.query_selector_all("img[data-src]").unwrap();
        assert_eq!(imgs.len(), 1);

        let img = doc.tree().element(imgs[0]).unwrap();
        assert_eq!(img.get_attr("data-src"), Some("a.png"));
    }

    #[test]
    fn test_class_and_style_attributes() {
        let html = r#"<section class="lazy-content feature" style="opacity: 0"></section>"#;
        let doc = HtmlParser::new().parse(html).unwrap();
        let section = doc.query_selector_all(".lazy-content").unwrap()[0];
        let elem = doc.tree().element(section).unwrap();

        assert!(elem.class_list.contains("feature"));
        assert_eq!(elem.style.get_property("opacity"), Some("0"));
    }

    #[test]
    fn test_comments_dropped_by_default() {
        let html = "<body><!-- note --><p>x</p></body>";
        let plain = HtmlParser::new().parse(html).unwrap();
        let with = HtmlParser::new().with_comments(true).parse(html).unwrap();
        assert_eq!(with.tree().len(), plain.tree().len() + 1);
    }
}
