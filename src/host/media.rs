//! Media feature queries (`matchMedia`)

use super::{Page, WeakPage};
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

/// OS-level reduced motion preference
pub const PREFERS_REDUCED_MOTION: &str = "(prefers-reduced-motion: reduce)";
/// OS-level dark color scheme preference
pub const PREFERS_DARK_SCHEME: &str = "(prefers-color-scheme: dark)";

/// Change callback; receives the new match state
pub type MediaListener = Arc<dyn Fn(bool, &Page) + Send + Sync>;

static NEXT_SUBSCRIPTION_ID: AtomicU64 = AtomicU64::new(1);

/// Canonical form of a media query: lowercase, no whitespace
pub(crate) fn normalize(query: &str) -> String {
    query
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect::<String>()
        .to_ascii_lowercase()
}

#[derive(Default)]
struct FeatureState {
    matches: bool,
    listeners: Vec<(u64, MediaListener)>,
}

/// Media feature table owned by the page
#[derive(Default)]
pub(crate) struct MediaFeatures {
    features: HashMap<String, FeatureState>,
}

impl MediaFeatures {
    pub(crate) fn matches(&self, query: &str) -> bool {
        self.features
            .get(&normalize(query))
            .is_some_and(|f| f.matches)
    }

    /// Update a feature, returning the listeners to notify when it changed
    pub(crate) fn set(&mut self, query: &str, matches: bool) -> Option<Vec<MediaListener>> {
        let state = self.features.entry(normalize(query)).or_default();
        if state.matches == matches {
            return None;
        }
        state.matches = matches;
        Some(state.listeners.iter().map(|(_, l)| Arc::clone(l)).collect())
    }

    pub(crate) fn subscribe(&mut self, query: &str, listener: MediaListener) -> u64 {
        let id = NEXT_SUBSCRIPTION_ID.fetch_add(1, Ordering::SeqCst);
        self.features
            .entry(normalize(query))
            .or_default()
            .listeners
            .push((id, listener));
        id
    }

    pub(crate) fn unsubscribe(&mut self, query: &str, id: u64) -> bool {
        match self.features.get_mut(&normalize(query)) {
            Some(state) => {
                let before = state.listeners.len();
                state.listeners.retain(|(lid, _)| *lid != id);
                state.listeners.len() != before
            }
            None => false,
        }
    }

    pub(crate) fn listener_count(&self, query: &str) -> usize {
        self.features
            .get(&normalize(query))
            .map_or(0, |f| f.listeners.len())
    }
}

/// Result of [`Page::match_media`]
pub struct MediaQueryList {
    page: Page,
    query: String,
}

impl MediaQueryList {
    pub(crate) fn new(page: Page, query: &str) -> Self {
        Self {
            page,
            query: query.to_string(),
        }
    }

    pub fn media(&self) -> &str {
        &self.query
    }

    /// Current match state
    pub fn matches(&self) -> bool {
        self.page.media_matches(&self.query)
    }

    /// Receive every later change of this query until the returned
    /// [`Subscription`] is dropped or unsubscribed.
    pub fn subscribe<F>(&self, listener: F) -> Subscription
    where
        F: Fn(bool, &Page) + Send + Sync + 'static,
    {
        let id = self.page.add_media_listener(&self.query, Arc::new(listener));
        Subscription {
            page: self.page.downgrade(),
            query: self.query.clone(),
            id,
        }
    }
}

/// Live change subscription on a media query
pub struct Subscription {
    page: WeakPage,
    query: String,
    id: u64,
}

impl Subscription {
    /// Detach the listener now
    pub fn unsubscribe(self) {}

    pub fn query(&self) -> &str {
        &self.query
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(page) = self.page.upgrade() {
            page.remove_media_listener(&self.query, self.id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::Document;
    use crate::host::Capabilities;
    use std::sync::atomic::AtomicBool;

    #[test]
    fn test_normalize_query() {
        assert_eq!(normalize("( Prefers-Color-Scheme : dark )"), "(prefers-color-scheme:dark)");
    }

    #[test]
    fn test_matches_ignores_formatting() {
        let page = Page::new(Document::new(), Capabilities::modern());
        page.set_media_feature("(prefers-color-scheme:dark)", true);
        let mql = page.match_media(PREFERS_DARK_SCHEME).unwrap();
        assert!(mql.matches());
    }

    #[test]
    fn test_subscription_receives_changes_until_dropped() {
        let page = Page::new(Document::new(), Capabilities::modern());
        let seen = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&seen);

        let mql = page.match_media(PREFERS_DARK_SCHEME).unwrap();
        let sub = mql.subscribe(move |matches, _| flag.store(matches, Ordering::SeqCst));
        assert_eq!(page.media_listener_count(PREFERS_DARK_SCHEME), 1);

        page.set_media_feature(PREFERS_DARK_SCHEME, true);
        assert!(seen.load(Ordering::SeqCst));

        sub.unsubscribe();
        assert_eq!(page.media_listener_count(PREFERS_DARK_SCHEME), 0);

        page.set_media_feature(PREFERS_DARK_SCHEME, false);
        assert!(seen.load(Ordering::SeqCst));
    }

    #[test]
    fn test_unchanged_value_does_not_notify() {
        let mut features = MediaFeatures::default();
        assert!(features.set(PREFERS_REDUCED_MOTION, false).is_none());
        assert!(features.set(PREFERS_REDUCED_MOTION, true).is_some());
        assert!(features.set(PREFERS_REDUCED_MOTION, true).is_none());
    }

    #[test]
    fn test_match_media_unavailable() {
        let page = Page::new(Document::new(), Capabilities::legacy());
        assert!(page.match_media(PREFERS_DARK_SCHEME).is_none());
    }
}
