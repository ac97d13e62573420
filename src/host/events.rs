//! Event targets for the document and window

use super::Page;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

/// Events the host dispatches
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    DomContentLoaded,
    Scroll,
    Resize,
    OrientationChange,
}

impl EventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::DomContentLoaded => "DOMContentLoaded",
            EventKind::Scroll => "scroll",
            EventKind::Resize => "resize",
            EventKind::OrientationChange => "orientationchange",
        }
    }
}

/// Which event target a listener is attached to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Target {
    Document,
    Window,
}

/// A dispatched event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Event {
    pub kind: EventKind,
    pub target: Target,
}

/// Options accepted by `addEventListener`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ListenerOptions {
    /// Listener promises not to cancel the event
    pub passive: bool,
    /// Remove the listener after its first invocation
    pub once: bool,
}

impl ListenerOptions {
    pub fn passive() -> Self {
        Self {
            passive: true,
            once: false,
        }
    }
}

/// Handle returned by [`Page::add_event_listener`], used for removal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

/// Event callback; receives the page that dispatched the event
pub type Listener = Arc<dyn Fn(&Event, &Page) + Send + Sync>;

static NEXT_LISTENER_ID: AtomicU64 = AtomicU64::new(1);

struct Registration {
    id: ListenerId,
    kind: EventKind,
    options: ListenerOptions,
    listener: Listener,
}

/// Listener registry for one event target
pub struct EventTarget {
    registrations: Mutex<Vec<Registration>>,
}

impl EventTarget {
    pub(crate) fn new() -> Self {
        Self {
            registrations: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn add(&self, kind: EventKind, options: ListenerOptions, listener: Listener) -> ListenerId {
        let id = ListenerId(NEXT_LISTENER_ID.fetch_add(1, Ordering::SeqCst));
        self.registrations
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(Registration {
                id,
                kind,
                options,
                listener,
            });
        id
    }

    pub(crate) fn remove(&self, id: ListenerId) -> bool {
        let mut registrations = self.registrations.lock().unwrap_or_else(PoisonError::into_inner);
        let before = registrations.len();
        registrations.retain(|r| r.id != id);
        registrations.len() != before
    }

    pub(crate) fn count(&self, kind: EventKind) -> usize {
        self.registrations
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter(|r| r.kind == kind)
            .count()
    }

    /// Snapshot the listeners for `kind`, dropping `once` registrations.
    ///
    /// Listeners run after the registry lock is released so they may add or
    /// remove listeners themselves.
    pub(crate) fn take_listeners(&self, kind: EventKind) -> Vec<Listener> {
        let mut registrations = self.registrations.lock().unwrap_or_else(PoisonError::into_inner);
        let listeners = registrations
            .iter()
            .filter(|r| r.kind == kind)
            .map(|r| Arc::clone(&r.listener))
            .collect();
        registrations.retain(|r| !(r.kind == kind && r.options.once));
        listeners
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::Document;
    use crate::host::Capabilities;
    use std::sync::atomic::AtomicUsize;

    #[test]
    fn test_add_and_remove_listener() {
        let page = Page::new(Document::new(), Capabilities::modern());
        let id = page.add_event_listener(Target::Window, EventKind::Resize, ListenerOptions::passive(), |_, _| {});
        assert_eq!(page.listener_count(Target::Window, EventKind::Resize), 1);
        assert!(page.remove_event_listener(Target::Window, id));
        assert!(!page.remove_event_listener(Target::Window, id));
        assert_eq!(page.listener_count(Target::Window, EventKind::Resize), 0);
    }

    #[test]
    fn test_once_listener_runs_once() {
        let page = Page::new(Document::new(), Capabilities::modern());
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        page.add_event_listener(
            Target::Document,
            EventKind::Scroll,
            ListenerOptions { passive: true, once: true },
            move |event, _| {
                assert_eq!(event.kind, EventKind::Scroll);
                counter.fetch_add(1, Ordering::SeqCst);
            },
        );

        page.dispatch_event(Target::Document, EventKind::Scroll);
        page.dispatch_event(Target::Document, EventKind::Scroll);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_listener_may_remove_itself() {
        let page = Page::new(Document::new(), Capabilities::modern());
        let slot: Arc<Mutex<Option<ListenerId>>> = Arc::new(Mutex::new(None));
        let inner = Arc::clone(&slot);
        let id = page.add_event_listener(Target::Window, EventKind::Resize, ListenerOptions::default(), move |event, page| {
            if let Some(id) = *inner.lock().unwrap() {
                page.remove_event_listener(event.target, id);
            }
        });
        *slot.lock().unwrap() = Some(id);

        page.dispatch_event(Target::Window, EventKind::Resize);
        assert_eq!(page.listener_count(Target::Window, EventKind::Resize), 0);
    }

    #[test]
    fn test_event_kind_names() {
        assert_eq!(EventKind::DomContentLoaded.as_str(), "DOMContentLoaded");
        assert_eq!(EventKind::OrientationChange.as_str(), "orientationchange");
    }
}
