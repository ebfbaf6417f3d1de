//! Loader Configuration

use crate::retry::RetryPolicy;
use serde::Deserialize;

/// Margin/threshold pair for one observer profile
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ObserverProfile {
    /// CSS-style margin around the viewport, e.g. `"50px"`
    pub root_margin: String,
    /// Minimum visible ratio before the entry fires
    pub threshold: f32,
}

impl ObserverProfile {
    pub fn new(root_margin: &str, threshold: f32) -> Self {
        Self {
            root_margin: root_margin.to_string(),
            threshold,
        }
    }
}

/// Texts used by the placeholders and failure alt text
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct PlaceholderText {
    pub loading_label: String,
    pub error_label: String,
    /// Alt text set on images that failed to load
    pub error_alt: String,
}

impl Default for PlaceholderText {
    fn default() -> Self {
        Self {
            loading_label: "Loading...".to_string(),
            error_label: "Image unavailable".to_string(),
            error_alt: "Image failed to load".to_string(),
        }
    }
}

/// Page-load hints issued once at start-up
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct HintConfig {
    pub critical_images: Vec<String>,
    pub fonts: Vec<String>,
    pub preconnect_origins: Vec<String>,
}

impl Default for HintConfig {
    fn default() -> Self {
        Self {
            critical_images: vec![
                "assets/images/logo/lovetap-icon.png".to_string(),
                "assets/images/logo/lovetap-logo.png".to_string(),
            ],
            fonts: vec![
                "assets/fonts/NotoSansCJK/NotoSansCJK-Regular.woff2".to_string(),
                "assets/fonts/NotoSansCJK/NotoSansCJK-Bold.woff2".to_string(),
            ],
            preconnect_origins: vec![
                "https://fonts.googleapis.com".to_string(),
                "https://fonts.gstatic.com".to_string(),
            ],
        }
    }
}

/// Loader configuration options
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct LoaderConfig {
    /// Deferred images
    pub image_reveal: ObserverProfile,
    /// `.lazy-content` blocks
    pub content_reveal: ObserverProfile,
    /// Sections whose next sibling gets prefetched
    pub prefetch: ObserverProfile,
    /// Natively lazy images that fade in on reveal
    pub fade_in: ObserverProfile,

    pub retry: RetryPolicy,

    /// Quiet period before a resize triggers the responsive pass
    pub resize_debounce_ms: u64,
    /// Delay between `content-loading` and `content-loaded`
    pub content_reveal_delay_ms: u64,

    pub placeholder: PlaceholderText,
    pub hints: HintConfig,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            image_reveal: ObserverProfile::new("50px", 0.01),
            content_reveal: ObserverProfile::new("100px", 0.0),
            prefetch: ObserverProfile::new("200px", 0.0),
            fade_in: ObserverProfile::new("0px", 0.0),
            retry: RetryPolicy::default(),
            resize_debounce_ms: 250,
            content_reveal_delay_ms: 300,
            placeholder: PlaceholderText::default(),
            hints: HintConfig::default(),
        }
    }
}

impl LoaderConfig {
    /// Load from JSON; missing fields keep their defaults
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

/// Feature detection results for the host environment
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Capabilities {
    /// A proximity (intersection) primitive is available
    pub intersection_observer: bool,
    /// `<img loading="lazy">` is understood natively
    pub native_lazy_loading: bool,
}

impl Capabilities {
    /// Everything available
    pub fn modern() -> Self {
        Self {
            intersection_observer: true,
            native_lazy_loading: true,
        }
    }

    /// Nothing available
    pub fn legacy() -> Self {
        Self {
            intersection_observer: false,
            native_lazy_loading: false,
        }
    }
}

impl Default for Capabilities {
    fn default() -> Self {
        Self::modern()
    }
}
