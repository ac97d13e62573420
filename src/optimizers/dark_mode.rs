//! Dark mode (reduces energy use on OLED screens)

use crate::host::{PREFERS_DARK_SCHEME, Page, Subscription};

pub const DARK_MODE_CLASS: &str = "eco-dark-mode";

fn set_dark(page: &Page, dark: bool) {
    page.with_document_mut(|doc| {
        if let Some(html) = doc.document_element().and_then(|n| doc.element_mut(n)) {
            if dark {
                html.add_class(DARK_MODE_CLASS);
            } else {
                html.remove_class(DARK_MODE_CLASS);
            }
        }
    });
}

/// Dark mode module
#[derive(Default)]
pub struct DarkMode {
    subscription: Option<Subscription>,
}

impl DarkMode {
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply the OS color scheme and follow its changes for the session
    pub fn init(&mut self, page: &Page) {
        self.teardown();

        let Some(query) = page.match_media(PREFERS_DARK_SCHEME) else {
            log::debug!("matchMedia unavailable, dark mode left manual");
            return;
        };
        if query.matches() {
            set_dark(page, true);
        }
        self.subscription = Some(query.subscribe(|dark, page| set_dark(page, dark)));
    }

    /// Flip dark mode by hand, returning the new state. A later OS change
    /// still wins.
    pub fn toggle(&self, page: &Page) -> bool {
        page.with_document_mut(|doc| {
            doc.document_element()
                .and_then(|n| doc.element_mut(n))
                .is_some_and(|html| html.toggle_class(DARK_MODE_CLASS))
        })
    }

    pub fn is_active(&self, page: &Page) -> bool {
        page.with_document(|doc| {
            doc.document_element()
                .and_then(|n| doc.element(n))
                .is_some_and(|html| html.has_class(DARK_MODE_CLASS))
        })
    }

    /// Whether OS changes are being followed
    pub fn is_following_system(&self) -> bool {
        self.subscription.is_some()
    }

    /// Stop following OS changes
    pub fn teardown(&mut self) {
        if let Some(subscription) = self.subscription.take() {
            subscription.unsubscribe();
        }
    }
}

impl std::fmt::Debug for DarkMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DarkMode")
            .field("following_system", &self.is_following_system())
            .finish()
    }
}
