//! Image optimization
//!
//! Adds responsive `sizes` hints to images and detects next-gen format
//! support. Detection only: no image is re-encoded.

use crate::dom::{Document, NodeId, Selector};
use crate::host::Page;
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use std::sync::LazyLock;
use tokio::task::JoinHandle;
use url::Url;

/// Marker set on images that have been processed
pub const OPTIMIZED_MARKER: &str = "data-eco-optimized";
/// Three-breakpoint sizing hint
pub const RESPONSIVE_SIZES: &str = "(max-width: 768px) 100vw, (max-width: 1200px) 50vw, 33vw";
/// Width assumed when neither layout nor markup gives one
pub const FALLBACK_WIDTH: u32 = 300;

static WITHOUT_SRCSET: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("img:not([srcset])").expect("static selector"));

/// Formats whose decoder support can be detected
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecodableFormat {
    WebP,
}

impl DecodableFormat {
    /// Base64 payload of a minimal 2x2 sample image
    fn sample(&self) -> &'static str {
        match self {
            DecodableFormat::WebP => {
                "UklGRjoAAABXRUJQVlA4IC4AAACyAgCdASoCAAIALmk0mk0iIiIiIgBoSygABc6WWgAA/veff/0PP8bA//LwYAAA"
            }
        }
    }

    fn image_format(&self) -> image::ImageFormat {
        match self {
            DecodableFormat::WebP => image::ImageFormat::WebP,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            DecodableFormat::WebP => "WebP",
        }
    }
}

/// Decode the format's sample on `page`; supported iff the sample comes back 2px tall
pub async fn detect_format_support(page: &Page, format: DecodableFormat) -> bool {
    let Ok(bytes) = STANDARD.decode(format.sample()) else {
        return false;
    };
    matches!(
        page.decode_image(bytes, format.image_format()).await,
        Some((_, 2))
    )
}

fn is_data_uri(src: &str) -> bool {
    match Url::parse(src) {
        Ok(url) => url.scheme() == "data",
        Err(_) => src.trim_start().to_ascii_lowercase().starts_with("data:"),
    }
}

fn rendered_width(document: &Document, node: NodeId) -> u32 {
    let client = document.client_width(node);
    if client > 0 {
        return client;
    }
    document
        .element(node)
        .and_then(|e| e.get_attribute("width"))
        .and_then(|w| w.trim().parse::<u32>().ok())
        .filter(|w| *w > 0)
        .unwrap_or(FALLBACK_WIDTH)
}

/// Image optimization module
#[derive(Debug, Default)]
pub struct ImageOptimizer {
    support_check: Option<JoinHandle<bool>>,
}

impl ImageOptimizer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add sizing hints and start the WebP detection
    pub fn init(&mut self, page: &Page) {
        let optimized = Self::optimize_responsive_images(page);
        log::debug!("marked {} image(s) as optimized", optimized);
        self.support_check = Self::spawn_support_check(page);
    }

    /// Mark eligible images and give them a `sizes` hint. Returns how many
    /// images were newly marked.
    pub fn optimize_responsive_images(page: &Page) -> usize {
        page.with_document_mut(|doc| {
            let mut marked = 0;
            for node in doc.select(&WITHOUT_SRCSET) {
                let Some(element) = doc.element(node) else {
                    continue;
                };
                if element.has_attribute(OPTIMIZED_MARKER) {
                    continue;
                }
                if rendered_width(doc, node) == 0 {
                    continue;
                }
                let eligible = element
                    .get_attribute("src")
                    .is_some_and(|src| !src.is_empty() && !is_data_uri(src));
                if !eligible {
                    continue;
                }

                if let Some(element) = doc.element_mut(node) {
                    element.set_attribute(OPTIMIZED_MARKER, "true");
                    if !element.has_attribute("sizes") {
                        element.set_attribute("sizes", RESPONSIVE_SIZES);
                    }
                    marked += 1;
                }
            }
            marked
        })
    }

    fn spawn_support_check(page: &Page) -> Option<JoinHandle<bool>> {
        let Ok(handle) = tokio::runtime::Handle::try_current() else {
            log::debug!("no async runtime, skipping WebP detection");
            return None;
        };
        let page = page.clone();
        Some(handle.spawn(async move {
            let supported = detect_format_support(&page, DecodableFormat::WebP).await;
            if supported {
                log::info!("WebP supported - optimize by converting images to WebP format");
            }
            supported
        }))
    }

    /// Wait for the support check started by `init`. `None` if no check ran.
    pub async fn format_support(&mut self) -> Option<bool> {
        let handle = self.support_check.take()?;
        handle.await.ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::Rect;
    use crate::host::Capabilities;

    const IMAGES: &str = r#"<html><body>
        <img id="plain" src="photo.jpg">
        <img id="sized" src="banner.jpg" sizes="100vw">
        <img id="inline" src="data:image/png;base64,iVBORw0KGgo=">
        <img id="responsive" src="a.jpg" srcset="a-480.jpg 480w, a-960.jpg 960w">
        <img id="empty">
    </body></html>"#;

    fn attrs(page: &Page, selector: &str) -> Vec<(String, String)> {
        page.with_document(|doc| {
            let node = doc.query_selector_all(selector).unwrap()[0];
            doc.element(node).unwrap().attributes().to_vec()
        })
    }

    fn attr(page: &Page, selector: &str, name: &str) -> Option<String> {
        attrs(page, selector)
            .into_iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v)
    }

    #[test]
    fn test_marks_plain_images() {
        let page = Page::from_html(IMAGES, Capabilities::modern()).unwrap();
        assert_eq!(ImageOptimizer::optimize_responsive_images(&page), 2);

        assert_eq!(attr(&page, "#plain", OPTIMIZED_MARKER).as_deref(), Some("true"));
        assert_eq!(attr(&page, "#plain", "sizes").as_deref(), Some(RESPONSIVE_SIZES));
        // Existing sizes hint is kept
        assert_eq!(attr(&page, "#sized", "sizes").as_deref(), Some("100vw"));
        assert_eq!(attr(&page, "#sized", OPTIMIZED_MARKER).as_deref(), Some("true"));
    }

    #[test]
    fn test_skips_ineligible_images() {
        let page = Page::from_html(IMAGES, Capabilities::modern()).unwrap();
        ImageOptimizer::optimize_responsive_images(&page);

        for id in ["#inline", "#responsive", "#empty"] {
            assert_eq!(attr(&page, id, OPTIMIZED_MARKER), None, "{id}");
            assert_eq!(attr(&page, id, "sizes"), None, "{id}");
        }
    }

    #[test]
    fn test_second_pass_changes_nothing() {
        let page = Page::from_html(IMAGES, Capabilities::modern()).unwrap();
        ImageOptimizer::optimize_responsive_images(&page);
        let first = page.with_document(|doc| doc.outer_html(doc.root()));

        assert_eq!(ImageOptimizer::optimize_responsive_images(&page), 0);
        let second = page.with_document(|doc| doc.outer_html(doc.root()));
        assert_eq!(first, second);
    }

    #[test]
    fn test_rendered_width_sources() {
        let page = Page::from_html(
            r#"<img id="a" src="a.jpg" width="640"><img id="b" src="b.jpg">"#,
            Capabilities::modern(),
        )
        .unwrap();
        page.with_document_mut(|doc| {
            let a = doc.query_selector_all("#a").unwrap()[0];
            let b = doc.query_selector_all("#b").unwrap()[0];
            assert_eq!(rendered_width(doc, a), 640);
            assert_eq!(rendered_width(doc, b), FALLBACK_WIDTH);
            doc.set_layout_rect(b, Rect::new(0.0, 0.0, 412.0, 300.0));
            assert_eq!(rendered_width(doc, b), 412);
        });
    }

    #[test]
    fn test_data_uri_detection() {
        assert!(is_data_uri("data:image/gif;base64,R0lGOD"));
        assert!(is_data_uri("DATA:image/gif;base64,R0lGOD"));
        assert!(!is_data_uri("https://cdn.example/a.png"));
        assert!(!is_data_uri("images/data.png"));
    }

    #[tokio::test]
    async fn test_webp_detection_supported() {
        let page = Page::from_html("<p>x</p>", Capabilities::modern()).unwrap();
        assert!(detect_format_support(&page, DecodableFormat::WebP).await);
    }

    #[tokio::test]
    async fn test_webp_detection_unsupported() {
        let page = Page::from_html("<p>x</p>", Capabilities::legacy()).unwrap();
        assert!(!detect_format_support(&page, DecodableFormat::WebP).await);
    }

    #[tokio::test]
    async fn test_init_spawns_support_check() {
        let page = Page::from_html(IMAGES, Capabilities::modern()).unwrap();
        let mut optimizer = ImageOptimizer::new();
        optimizer.init(&page);
        assert_eq!(optimizer.format_support().await, Some(true));
        // The result is consumed once
        assert_eq!(optimizer.format_support().await, None);
    }

    #[test]
    fn test_init_without_runtime_skips_support_check() {
        let page = Page::from_html(IMAGES, Capabilities::modern()).unwrap();
        let mut optimizer = ImageOptimizer::new();
        optimizer.init(&page);
        assert!(tokio_test::block_on(optimizer.format_support()).is_none());
        assert_eq!(attr(&page, "#plain", OPTIMIZED_MARKER).as_deref(), Some("true"));
    }
}
