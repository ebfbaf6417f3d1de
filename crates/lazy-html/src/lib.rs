//! Lazy HTML Parser
//!
//! HTML5 parsing built on html5ever, producing a `lazy_dom::Document`.

mod parser;

pub use parser::HtmlParser;

use lazy_dom::Document;

/// Parse an HTML string into a document
pub fn parse(html: &str) -> Result<Document, HtmlError> {
    HtmlParser::new().parse(html)
}

/// Parse error
#[derive(Debug, thiserror::Error)]
pub enum HtmlError {
    #[error("Failed to read HTML input: {0}")]
    Io(#[from] std::io::Error),

    #[error("DOM construction failed: {0}")]
    Dom(#[from] lazy_dom::DomError),
}
