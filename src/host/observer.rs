//! Intersection Observer model
//!
//! Observers are evaluated by [`Page::update_rendering`]. An entry is
//! delivered the first time a target is evaluated and afterwards whenever its
//! visibility flips.

use super::Page;
use crate::dom::{Document, NodeId, Rect};
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Observer configuration
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ObserverInit {
    /// Pixels added around the viewport on every side
    pub root_margin: f64,
    /// Fraction of the target that must be visible
    pub threshold: f64,
}

impl ObserverInit {
    pub fn with_root_margin(root_margin: f64) -> Self {
        Self {
            root_margin,
            ..Self::default()
        }
    }

    pub fn with_threshold(threshold: f64) -> Self {
        Self {
            threshold,
            ..Self::default()
        }
    }
}

impl Default for ObserverInit {
    fn default() -> Self {
        Self {
            root_margin: 0.0,
            threshold: 0.0,
        }
    }
}

/// Visibility report for one target
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IntersectionEntry {
    pub target: NodeId,
    pub is_intersecting: bool,
    pub intersection_ratio: f64,
}

/// Observer callback; receives the changed entries, the observer and the page
pub type ObserverCallback = Arc<dyn Fn(&[IntersectionEntry], &IntersectionObserver, &Page) + Send + Sync>;

#[derive(Default)]
struct ObserverState {
    targets: Vec<NodeId>,
    last_visible: HashMap<NodeId, bool>,
    disconnected: bool,
}

struct ObserverInner {
    init: ObserverInit,
    callback: ObserverCallback,
    state: Mutex<ObserverState>,
}

/// Handle to a registered observer
#[derive(Clone)]
pub struct IntersectionObserver {
    inner: Arc<ObserverInner>,
}

impl IntersectionObserver {
    pub(crate) fn new(init: ObserverInit, callback: ObserverCallback) -> Self {
        Self {
            inner: Arc::new(ObserverInner {
                init,
                callback,
                state: Mutex::new(ObserverState::default()),
            }),
        }
    }

    fn state(&self) -> MutexGuard<'_, ObserverState> {
        self.inner.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn init(&self) -> ObserverInit {
        self.inner.init
    }

    /// Start watching a target
    pub fn observe(&self, target: NodeId) {
        let mut state = self.state();
        state.disconnected = false;
        if !state.targets.contains(&target) {
            state.targets.push(target);
        }
    }

    /// Stop watching a target
    pub fn unobserve(&self, target: NodeId) {
        let mut state = self.state();
        state.targets.retain(|t| *t != target);
        state.last_visible.remove(&target);
    }

    /// Stop watching every target
    pub fn disconnect(&self) {
        let mut state = self.state();
        state.targets.clear();
        state.last_visible.clear();
        state.disconnected = true;
    }

    /// Targets currently observed
    pub fn observed(&self) -> Vec<NodeId> {
        self.state().targets.clone()
    }

    pub(crate) fn is_disconnected(&self) -> bool {
        self.state().disconnected
    }

    /// Evaluate every target against `root` and keep the changed entries
    pub(crate) fn collect_entries(&self, document: &Document, root: &Rect) -> Vec<IntersectionEntry> {
        let threshold = self.inner.init.threshold;
        let mut state = self.state();
        let targets = state.targets.clone();

        let mut entries = Vec::new();
        for target in targets {
            let entry = compute_entry(document, target, root, threshold);
            let previous = state.last_visible.insert(target, entry.is_intersecting);
            if previous != Some(entry.is_intersecting) {
                entries.push(entry);
            }
        }
        entries
    }

    pub(crate) fn deliver(&self, entries: &[IntersectionEntry], page: &Page) {
        (self.inner.callback)(entries, self, page);
    }

    pub fn ptr_eq(&self, other: &IntersectionObserver) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl fmt::Debug for IntersectionObserver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IntersectionObserver")
            .field("init", &self.inner.init)
            .field("targets", &self.observed())
            .finish()
    }
}

fn compute_entry(document: &Document, target: NodeId, root: &Rect, threshold: f64) -> IntersectionEntry {
    let rect = document.layout_rect(target);
    let (is_intersecting, intersection_ratio) = match rect.intersection(root) {
        None => (false, 0.0),
        Some(hit) => {
            let ratio = if rect.area() > 0.0 {
                hit.area() / rect.area()
            } else {
                1.0
            };
            (ratio >= threshold, ratio)
        }
    };

    IntersectionEntry {
        target,
        is_intersecting,
        intersection_ratio,
    }
}
