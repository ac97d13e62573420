//! Lazy loading for images and iframes
//!
//! Three strategies, picked once from the page capabilities:
//! - **Native**: tag untagged `img`/`iframe` elements with `loading="lazy"`
//! - **Observed**: promote `data-src` to `src` when an element comes within
//!   200px of the viewport
//! - **Polled**: debounced scroll/resize/orientation polling for browsers
//!   without Intersection Observer

use crate::dom::{Document, NodeId, Selector};
use crate::host::{
    Capabilities, EventKind, IntersectionObserver, ListenerId, ListenerOptions, ObserverInit, Page,
    Target,
};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, LazyLock, Mutex, PoisonError};
use std::time::Duration;

/// Marker attribute holding a deferred source
pub const DEFERRED_SOURCE_ATTR: &str = "data-src";
/// Margin around the viewport at which deferred sources are promoted
pub const LAZY_ROOT_MARGIN_PX: f64 = 200.0;
/// Settle delay of the polling fallback
pub const POLL_SETTLE_DELAY: Duration = Duration::from_millis(200);

static UNTAGGED: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse("img:not([loading]), iframe:not([loading])").expect("static selector")
});
static DEFERRED: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("[data-src]").expect("static selector"));

/// How deferred loading is implemented on a page
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LazyStrategy {
    Native,
    Observed,
    Polled,
}

impl LazyStrategy {
    pub fn detect(capabilities: &Capabilities) -> Self {
        if capabilities.native_lazy_loading {
            LazyStrategy::Native
        } else if capabilities.intersection_observer {
            LazyStrategy::Observed
        } else {
            LazyStrategy::Polled
        }
    }
}

/// Move `data-src` into `src`. Returns false if the element had no marker.
fn promote(document: &mut Document, node: NodeId) -> bool {
    let Some(element) = document.element_mut(node) else {
        return false;
    };
    match element.remove_attribute(DEFERRED_SOURCE_ATTR) {
        Some(src) => {
            element.set_attribute("src", src);
            true
        }
        None => false,
    }
}

/// Lazy loading module
#[derive(Debug, Default)]
pub struct LazyLoad {
    strategy: Option<LazyStrategy>,
    observer: Option<IntersectionObserver>,
    poller: Option<Arc<LegacyPoller>>,
}

impl LazyLoad {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pick a strategy for `page` and apply it
    pub fn init(&mut self, page: &Page) {
        let strategy = LazyStrategy::detect(&page.capabilities());
        self.strategy = Some(strategy);
        log::debug!("lazy loading strategy: {:?}", strategy);

        match strategy {
            LazyStrategy::Native => {
                let tagged = Self::apply_native(page);
                log::debug!("tagged {} element(s) with loading=lazy", tagged);
            }
            LazyStrategy::Observed => {
                self.observer = Self::observe_deferred(page);
            }
            LazyStrategy::Polled => {
                let poller = LegacyPoller::start(page);
                self.poller = Some(poller);
            }
        }
    }

    /// Strategy chosen by the last `init`
    pub fn strategy(&self) -> Option<LazyStrategy> {
        self.strategy
    }

    pub fn observer(&self) -> Option<&IntersectionObserver> {
        self.observer.as_ref()
    }

    /// Whether the polling fallback still has listeners attached
    pub fn is_polling(&self) -> bool {
        self.poller.as_ref().is_some_and(|p| p.is_attached())
    }

    fn apply_native(page: &Page) -> usize {
        page.with_document_mut(|doc| {
            let untagged = doc.select(&UNTAGGED);
            for node in &untagged {
                if let Some(element) = doc.element_mut(*node) {
                    element.set_attribute("loading", "lazy");
                }
            }
            untagged.len()
        })
    }

    fn observe_deferred(page: &Page) -> Option<IntersectionObserver> {
        let deferred = page.with_document(|doc| doc.select(&DEFERRED));
        if deferred.is_empty() {
            return None;
        }

        let observer = page.create_intersection_observer(
            ObserverInit::with_root_margin(LAZY_ROOT_MARGIN_PX),
            |entries, observer, page| {
                for entry in entries.iter().filter(|e| e.is_intersecting) {
                    page.with_document_mut(|doc| promote(doc, entry.target));
                    observer.unobserve(entry.target);
                }
                if observer.observed().is_empty() {
                    observer.disconnect();
                    log::debug!("all deferred elements loaded, observer disconnected");
                }
            },
        )?;

        for node in deferred {
            observer.observe(node);
        }
        Some(observer)
    }
}

/// Debounced scroll/resize/orientation polling
///
/// Listeners hold the poller and receive the page on dispatch; the pending
/// sweep only keeps a weak page handle.
pub struct LegacyPoller {
    active: AtomicBool,
    listeners: Mutex<Vec<(Target, ListenerId)>>,
}

impl std::fmt::Debug for LegacyPoller {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LegacyPoller")
            .field("active", &self.active.load(Ordering::SeqCst))
            .field("attached", &self.is_attached())
            .finish()
    }
}

impl LegacyPoller {
    /// Attach the three listeners and run the initial check
    pub fn start(page: &Page) -> Arc<Self> {
        let poller = Arc::new(Self {
            active: AtomicBool::new(false),
            listeners: Mutex::new(Vec::new()),
        });

        let triggers = [
            (Target::Document, EventKind::Scroll),
            (Target::Window, EventKind::Resize),
            (Target::Window, EventKind::OrientationChange),
        ];
        let ids: Vec<(Target, ListenerId)> = triggers
            .into_iter()
            .map(|(target, kind)| {
                let poller = Arc::clone(&poller);
                let id = page.add_event_listener(target, kind, ListenerOptions::passive(), move |_, page| {
                    poller.trigger(page);
                });
                (target, id)
            })
            .collect();
        *poller.listeners.lock().unwrap_or_else(PoisonError::into_inner) = ids;

        poller.trigger(page);
        poller
    }

    pub fn is_attached(&self) -> bool {
        !self
            .listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_empty()
    }

    /// Schedule a sweep after the settle delay unless one is pending
    pub fn trigger(self: &Arc<Self>, page: &Page) {
        if self.active.swap(true, Ordering::SeqCst) {
            return;
        }

        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                let poller = Arc::clone(self);
                let weak = page.downgrade();
                handle.spawn(async move {
                    tokio::time::sleep(POLL_SETTLE_DELAY).await;
                    if let Some(page) = weak.upgrade() {
                        poller.sweep(&page);
                    }
                    poller.active.store(false, Ordering::SeqCst);
                });
            }
            Err(_) => {
                log::warn!("no async runtime, lazy-load poll runs without settle delay");
                self.sweep(page);
                self.active.store(false, Ordering::SeqCst);
            }
        }
    }

    /// Promote every visible deferred element; detach once none remain
    pub fn sweep(&self, page: &Page) {
        let viewport = page.viewport();
        let promoted = page.with_document_mut(|doc| {
            let mut promoted = 0;
            for node in doc.select(&DEFERRED) {
                let rect = doc
                    .layout_rect(node)
                    .translate(-viewport.scroll_x, -viewport.scroll_y);
                let in_view = rect.top() <= viewport.height && rect.bottom() >= 0.0;
                if in_view && doc.computed_display(node) != "none" && promote(doc, node) {
                    promoted += 1;
                }
            }
            promoted
        });
        if promoted > 0 {
            log::debug!("promoted {} deferred element(s)", promoted);
        }

        let remaining = page.with_document(|doc| doc.select(&DEFERRED).len());
        if remaining == 0 {
            self.detach(page);
        }
    }

    fn detach(&self, page: &Page) {
        let listeners = std::mem::take(&mut *self.listeners.lock().unwrap_or_else(PoisonError::into_inner));
        if listeners.is_empty() {
            return;
        }
        for (target, id) in listeners {
            page.remove_event_listener(target, id);
        }
        log::debug!("all deferred elements loaded, polling detached");
    }
}
