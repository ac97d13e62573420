//! Animation optimization
//!
//! Animations are expected to be gated in CSS on [`ACTIVE_CLASS`], so
//! elements out of view spend no animation frames.

use crate::dom::Selector;
use crate::host::{IntersectionObserver, ObserverInit, PREFERS_REDUCED_MOTION, Page};
use std::sync::{Arc, LazyLock, Mutex, PoisonError};

pub const REDUCED_MOTION_CLASS: &str = "eco-reduced-motion";
pub const OPTIMIZE_ANIMATIONS_CLASS: &str = "eco-optimize-animations";
pub const ACTIVE_CLASS: &str = "animate-active";
/// Fraction of an animated element that must be visible
pub const VISIBILITY_THRESHOLD: f64 = 0.1;

static ANIMATED: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse(".animate, [data-animate], [data-animation]").expect("static selector")
});

/// Animation optimization module
///
/// Cheap to clone; clones share the visibility observer.
#[derive(Debug, Clone, Default)]
pub struct AnimationOptimizer {
    observer: Arc<Mutex<Option<IntersectionObserver>>>,
}

impl AnimationOptimizer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn init(&self, page: &Page) {
        Self::detect_reduced_motion(page);
        self.limit_animations(page);
    }

    /// Flag the document when the user asked for less motion. Read once.
    fn detect_reduced_motion(page: &Page) -> bool {
        let reduced = page
            .match_media(PREFERS_REDUCED_MOTION)
            .is_some_and(|mql| mql.matches());
        if reduced {
            page.with_document_mut(|doc| {
                if let Some(html) = doc.document_element().and_then(|n| doc.element_mut(n)) {
                    html.add_class(REDUCED_MOTION_CLASS);
                }
            });
        }
        reduced
    }

    fn limit_animations(&self, page: &Page) {
        let animated = page.with_document_mut(|doc| {
            if let Some(html) = doc.document_element().and_then(|n| doc.element_mut(n)) {
                html.add_class(OPTIMIZE_ANIMATIONS_CLASS);
            }
            doc.select(&ANIMATED)
        });
        if animated.is_empty() {
            return;
        }

        let Some(observer) = page.create_intersection_observer(
            ObserverInit::with_threshold(VISIBILITY_THRESHOLD),
            |entries, _, page| {
                page.with_document_mut(|doc| {
                    for entry in entries {
                        if let Some(element) = doc.element_mut(entry.target) {
                            if entry.is_intersecting {
                                element.add_class(ACTIVE_CLASS);
                            } else {
                                element.remove_class(ACTIVE_CLASS);
                            }
                        }
                    }
                });
            },
        ) else {
            log::debug!("no IntersectionObserver, animations left ungated");
            return;
        };

        for node in &animated {
            observer.observe(*node);
        }
        log::debug!("gating {} animated element(s) on visibility", animated.len());

        let previous = self
            .observer
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .replace(observer);
        if let Some(previous) = previous {
            previous.disconnect();
        }
    }

    /// Number of elements currently gated
    pub fn observed_count(&self) -> usize {
        self.observer
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .map_or(0, |o| o.observed().len())
    }
}
