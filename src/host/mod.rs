//! Host page: the browser surface the optimizers run against
//!
//! A [`Page`] bundles a parsed document with the browser capabilities the
//! optimizers consume:
//! - Event targets for the document and window
//! - Intersection Observers evaluated against the viewport
//! - Media feature queries with change subscriptions
//! - The resource timing buffer
//! - Image decoding for format detection
//!
//! Which of these exist is described by [`Capabilities`], so older browsers
//! can be modelled by switching features off.

mod events;
mod media;
mod observer;
mod performance;

pub use events::{Event, EventKind, EventTarget, Listener, ListenerId, ListenerOptions, Target};
pub use media::{MediaListener, MediaQueryList, PREFERS_DARK_SCHEME, PREFERS_REDUCED_MOTION, Subscription};
pub use observer::{IntersectionEntry, IntersectionObserver, ObserverCallback, ObserverInit};
pub use performance::{PerformanceTimeline, RESOURCE_ENTRY_TYPE, ResourceEntry, parse_entries};

use crate::dom::{Document, HtmlParser, NodeId, Rect};
use crate::utils::Result;
use media::MediaFeatures;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

/// Browser features available to the page
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Capabilities {
    /// `loading="lazy"` is honoured natively
    pub native_lazy_loading: bool,
    /// `IntersectionObserver` exists
    pub intersection_observer: bool,
    /// `window.matchMedia` exists
    pub match_media: bool,
    /// `performance.getEntriesByType` exists
    pub performance_timeline: bool,
    /// WebP images can be decoded
    pub webp_decoding: bool,
}

impl Capabilities {
    /// Evergreen browser
    pub fn modern() -> Self {
        Self {
            native_lazy_loading: true,
            intersection_observer: true,
            match_media: true,
            performance_timeline: true,
            webp_decoding: true,
        }
    }

    /// Browser predating every optional feature
    pub fn legacy() -> Self {
        Self {
            native_lazy_loading: false,
            intersection_observer: false,
            match_media: false,
            performance_timeline: false,
            webp_decoding: false,
        }
    }
}

impl Default for Capabilities {
    fn default() -> Self {
        Self::modern()
    }
}

/// Visible area of the page
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    pub width: f64,
    pub height: f64,
    pub scroll_x: f64,
    pub scroll_y: f64,
}

impl Viewport {
    pub fn new(width: f64, height: f64) -> Self {
        Self {
            width,
            height,
            scroll_x: 0.0,
            scroll_y: 0.0,
        }
    }

    /// Visible region in document coordinates
    pub fn rect(&self) -> Rect {
        Rect::new(self.scroll_x, self.scroll_y, self.width, self.height)
    }
}

impl Default for Viewport {
    fn default() -> Self {
        Self::new(1280.0, 800.0)
    }
}

struct PageInner {
    document: Mutex<Document>,
    viewport: Mutex<Viewport>,
    capabilities: Capabilities,
    document_events: EventTarget,
    window_events: EventTarget,
    observers: Mutex<Vec<IntersectionObserver>>,
    media: Mutex<MediaFeatures>,
    performance: Option<Mutex<PerformanceTimeline>>,
    ready: AtomicBool,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Shared handle to a host page
///
/// Cloning is cheap; all clones refer to the same page. Callbacks registered
/// on the page receive it by reference, and no page lock is held while they
/// run.
#[derive(Clone)]
pub struct Page {
    inner: Arc<PageInner>,
}

impl std::fmt::Debug for Page {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Page")
            .field("capabilities", &self.inner.capabilities)
            .field("viewport", &self.viewport())
            .field("ready", &self.is_ready())
            .finish_non_exhaustive()
    }
}

/// Non-owning page handle
#[derive(Clone)]
pub struct WeakPage {
    inner: Weak<PageInner>,
}

impl WeakPage {
    pub fn upgrade(&self) -> Option<Page> {
        self.inner.upgrade().map(|inner| Page { inner })
    }
}

impl Page {
    /// Create a page around an existing document
    pub fn new(document: Document, capabilities: Capabilities) -> Self {
        let performance = capabilities
            .performance_timeline
            .then(|| Mutex::new(PerformanceTimeline::new()));

        Self {
            inner: Arc::new(PageInner {
                document: Mutex::new(document),
                viewport: Mutex::new(Viewport::default()),
                capabilities,
                document_events: EventTarget::new(),
                window_events: EventTarget::new(),
                observers: Mutex::new(Vec::new()),
                media: Mutex::new(MediaFeatures::default()),
                performance,
                ready: AtomicBool::new(false),
            }),
        }
    }

    /// Parse `html` and wrap it in a page
    pub fn from_html(html: &str, capabilities: Capabilities) -> Result<Self> {
        let document = HtmlParser::new().parse(html)?;
        Ok(Self::new(document, capabilities))
    }

    pub fn capabilities(&self) -> Capabilities {
        self.inner.capabilities
    }

    pub fn downgrade(&self) -> WeakPage {
        WeakPage {
            inner: Arc::downgrade(&self.inner),
        }
    }

    /// Run `f` with shared access to the document
    pub fn with_document<R>(&self, f: impl FnOnce(&Document) -> R) -> R {
        f(&lock(&self.inner.document))
    }

    /// Run `f` with exclusive access to the document
    pub fn with_document_mut<R>(&self, f: impl FnOnce(&mut Document) -> R) -> R {
        f(&mut lock(&self.inner.document))
    }

    // Viewport

    pub fn viewport(&self) -> Viewport {
        *lock(&self.inner.viewport)
    }

    /// Equivalent of `getBoundingClientRect()`: layout box relative to the viewport
    pub fn bounding_client_rect(&self, node: NodeId) -> Rect {
        let viewport = self.viewport();
        self.with_document(|doc| doc.layout_rect(node))
            .translate(-viewport.scroll_x, -viewport.scroll_y)
    }

    /// Scroll the viewport and fire `scroll` on the document
    pub fn scroll_to(&self, x: f64, y: f64) {
        {
            let mut viewport = lock(&self.inner.viewport);
            viewport.scroll_x = x.max(0.0);
            viewport.scroll_y = y.max(0.0);
        }
        self.update_rendering();
        self.dispatch_event(Target::Document, EventKind::Scroll);
    }

    /// Resize the viewport and fire `resize` on the window
    pub fn resize(&self, width: f64, height: f64) {
        {
            let mut viewport = lock(&self.inner.viewport);
            viewport.width = width.max(0.0);
            viewport.height = height.max(0.0);
        }
        self.update_rendering();
        self.dispatch_event(Target::Window, EventKind::Resize);
    }

    /// Swap the viewport axes and fire `orientationchange` on the window
    pub fn change_orientation(&self) {
        {
            let mut guard = lock(&self.inner.viewport);
            let viewport = &mut *guard;
            std::mem::swap(&mut viewport.width, &mut viewport.height);
        }
        self.update_rendering();
        self.dispatch_event(Target::Window, EventKind::OrientationChange);
    }

    // Events

    fn event_target(&self, target: Target) -> &EventTarget {
        match target {
            Target::Document => &self.inner.document_events,
            Target::Window => &self.inner.window_events,
        }
    }

    pub fn add_event_listener<F>(&self, target: Target, kind: EventKind, options: ListenerOptions, listener: F) -> ListenerId
    where
        F: Fn(&Event, &Page) + Send + Sync + 'static,
    {
        self.event_target(target).add(kind, options, Arc::new(listener))
    }

    pub fn remove_event_listener(&self, target: Target, id: ListenerId) -> bool {
        self.event_target(target).remove(id)
    }

    pub fn listener_count(&self, target: Target, kind: EventKind) -> usize {
        self.event_target(target).count(kind)
    }

    /// Invoke every listener registered for `kind` on `target`
    pub fn dispatch_event(&self, target: Target, kind: EventKind) {
        let listeners = self.event_target(target).take_listeners(kind);
        log::trace!("dispatching {} to {} listener(s)", kind.as_str(), listeners.len());
        let event = Event { kind, target };
        for listener in listeners {
            listener(&event, self);
        }
    }

    /// Signal that the document has been parsed. Fires at most once.
    pub fn dispatch_dom_content_loaded(&self) {
        if self.inner.ready.swap(true, Ordering::SeqCst) {
            return;
        }
        self.dispatch_event(Target::Document, EventKind::DomContentLoaded);
    }

    pub fn is_ready(&self) -> bool {
        self.inner.ready.load(Ordering::SeqCst)
    }

    // Intersection observers

    /// Create and register an observer, or `None` when unsupported
    pub fn create_intersection_observer<F>(&self, init: ObserverInit, callback: F) -> Option<IntersectionObserver>
    where
        F: Fn(&[IntersectionEntry], &IntersectionObserver, &Page) + Send + Sync + 'static,
    {
        if !self.inner.capabilities.intersection_observer {
            return None;
        }
        let observer = IntersectionObserver::new(init, Arc::new(callback));
        lock(&self.inner.observers).push(observer.clone());
        Some(observer)
    }

    /// Observers still connected to the page
    pub fn intersection_observer_count(&self) -> usize {
        lock(&self.inner.observers)
            .iter()
            .filter(|o| !o.is_disconnected())
            .count()
    }

    /// Evaluate every observer and deliver the changed entries
    pub fn update_rendering(&self) {
        let observers: Vec<IntersectionObserver> = {
            let mut observers = lock(&self.inner.observers);
            observers.retain(|o| !o.is_disconnected());
            observers.clone()
        };
        let viewport = self.viewport().rect();

        for observer in observers {
            let root = viewport.inflate(observer.init().root_margin);
            let entries = self.with_document(|doc| observer.collect_entries(doc, &root));
            if !entries.is_empty() {
                observer.deliver(&entries, self);
            }
        }
    }

    // Media queries

    /// Equivalent of `window.matchMedia(query)`; `None` when unsupported
    pub fn match_media(&self, query: &str) -> Option<MediaQueryList> {
        self.inner
            .capabilities
            .match_media
            .then(|| MediaQueryList::new(self.clone(), query))
    }

    /// Change an OS-level media feature, notifying subscribers on change
    pub fn set_media_feature(&self, query: &str, matches: bool) {
        let listeners = lock(&self.inner.media).set(query, matches);
        for listener in listeners.unwrap_or_default() {
            listener(matches, self);
        }
    }

    pub fn media_listener_count(&self, query: &str) -> usize {
        lock(&self.inner.media).listener_count(query)
    }

    pub(crate) fn media_matches(&self, query: &str) -> bool {
        lock(&self.inner.media).matches(query)
    }

    pub(crate) fn add_media_listener(&self, query: &str, listener: MediaListener) -> u64 {
        lock(&self.inner.media).subscribe(query, listener)
    }

    pub(crate) fn remove_media_listener(&self, query: &str, id: u64) -> bool {
        lock(&self.inner.media).unsubscribe(query, id)
    }

    // Performance timeline

    /// Record a finished resource load. Ignored without a timeline.
    pub fn record_resource(&self, entry: ResourceEntry) {
        if let Some(timeline) = &self.inner.performance {
            lock(timeline).record(entry);
        }
    }

    /// Resource entries, or `None` when the timeline is unavailable
    pub fn resource_entries(&self) -> Option<Vec<ResourceEntry>> {
        self.inner
            .performance
            .as_ref()
            .map(|timeline| lock(timeline).entries_by_type(RESOURCE_ENTRY_TYPE))
    }

    // Image decoding

    /// Decode an image, yielding its dimensions; `None` if it cannot be decoded
    pub async fn decode_image(&self, bytes: Vec<u8>, format: image::ImageFormat) -> Option<(u32, u32)> {
        if format == image::ImageFormat::WebP && !self.inner.capabilities.webp_decoding {
            return None;
        }

        let decode = move || {
            image::load_from_memory_with_format(&bytes, format)
                .map(|img| (img.width(), img.height()))
                .map_err(|e| log::debug!("image decode failed: {}", e))
                .ok()
        };

        match tokio::runtime::Handle::try_current() {
            Ok(handle) => handle.spawn_blocking(decode).await.ok().flatten(),
            Err(_) => decode(),
        }
    }
}
