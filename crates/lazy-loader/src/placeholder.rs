//! Placeholder images
//!
//! Inline SVG shown while an image is deferred and after it failed,
//! delivered as a base64 `data:` URI so it never touches the network.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;

pub(crate) const DEFAULT_WIDTH: u32 = 300;
pub(crate) const DEFAULT_HEIGHT: u32 = 200;

const DATA_URI_PREFIX: &str = "data:image/svg+xml;base64,";

/// Colors for one placeholder variant
#[derive(Debug, Clone, Copy)]
struct Palette {
    background: &'static str,
    text: &'static str,
}

const LOADING: Palette = Palette {
    background: "#f0f0f0",
    text: "#999",
};

const ERROR: Palette = Palette {
    background: "#f8f9fa",
    text: "#6c757d",
};

/// Build a neutral placeholder with centered `label`.
///
/// `None` dimensions fall back to 300×200.
pub fn build_placeholder(width: Option<u32>, height: Option<u32>, label: &str) -> String {
    render(
        width.unwrap_or(DEFAULT_WIDTH),
        height.unwrap_or(DEFAULT_HEIGHT),
        label,
        LOADING,
    )
}

/// Placeholder shown while a deferred image waits to load
pub fn loading_placeholder(width: Option<u32>, height: Option<u32>, label: &str) -> String {
    build_placeholder(width, height, label)
}

/// Placeholder shown once an image failed; always 300×200
pub fn error_placeholder(label: &str) -> String {
    render(DEFAULT_WIDTH, DEFAULT_HEIGHT, label, ERROR)
}

fn render(width: u32, height: u32, label: &str, palette: Palette) -> String {
    let svg = format!(
        concat!(
            r#"<svg width="{w}" height="{h}" xmlns="http://www.w3.org/2000/svg" viewBox="0 0 {w} {h}">"#,
            r#"<rect width="100%" height="100%" fill="{bg}"/>"#,
            r#"<text x="50%" y="50%" font-family="Arial, sans-serif" font-size="14" fill="{fg}" "#,
            r#"text-anchor="middle" dominant-baseline="middle">{label}</text>"#,
            "</svg>"
        ),
        w = width,
        h = height,
        bg = palette.background,
        fg = palette.text,
        label = escape_xml(label),
    );
    format!("{}{}", DATA_URI_PREFIX, STANDARD.encode(svg.as_bytes()))
}

fn escape_xml(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            _ => out.push(c),
        }
    }
    out
}

/// True for inline `data:` sources, which never hit the network
pub(crate) fn is_inline(src: &str) -> bool {
    src.trim_start().starts_with("data:")
}
