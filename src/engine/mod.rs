//! Bootstrap wiring the optimizers onto a page
//!
//! [`EcoCore::init`] activates the modules selected by the configuration:
//! 1. Register a `DOMContentLoaded` listener for the deferred work
//! 2. Lazy loading and image hints run immediately
//! 3. Dark mode runs only when explicitly enabled
//! 4. On document ready: animation gating and the first metrics sample

mod report;

pub use report::PageReport;

use crate::config::EcoConfig;
use crate::host::{EventKind, ListenerId, ListenerOptions, Page, Target};
use crate::metrics::{Footprint, Metrics};
use crate::optimizers::{AnimationOptimizer, DarkMode, ImageOptimizer, LazyLoad};
use crate::utils::Result;

/// One instrumented page
///
/// Owns the configuration, the metrics and every optimizer; the page handle
/// is passed into each module operation.
#[derive(Debug)]
pub struct EcoCore {
    page: Page,
    config: EcoConfig,
    lazy_load: LazyLoad,
    image_optimizer: ImageOptimizer,
    animation_optimizer: AnimationOptimizer,
    dark_mode: DarkMode,
    metrics: Metrics,
    ready_listener: Option<ListenerId>,
}

impl EcoCore {
    /// Instrument `page` according to `config`
    pub fn init(page: Page, config: EcoConfig) -> Self {
        let mut core = Self {
            page,
            config,
            lazy_load: LazyLoad::new(),
            image_optimizer: ImageOptimizer::new(),
            animation_optimizer: AnimationOptimizer::new(),
            dark_mode: DarkMode::new(),
            metrics: Metrics::new(),
            ready_listener: None,
        };
        log::info!("initializing EcoCore v{} with {:?}", crate::VERSION, core.config);

        core.setup_listeners();

        if core.config.lazy_load {
            core.lazy_load.init(&core.page);
        }
        if core.config.optimize_images {
            core.image_optimizer.init(&core.page);
        }
        if core.config.dark_mode {
            core.dark_mode.init(&core.page);
        }

        core
    }

    /// Instrument `page` with JSON options merged over the defaults
    pub fn init_with_options(page: Page, options: serde_json::Value) -> Result<Self> {
        Ok(Self::init(page, EcoConfig::from_options(options)?))
    }

    fn setup_listeners(&mut self) {
        let animation = self
            .config
            .minimal_animation
            .then(|| self.animation_optimizer.clone());
        let metrics = self.metrics.clone();
        let on_ready = move |page: &Page| {
            if let Some(animation) = &animation {
                animation.init(page);
            }
            metrics.measure(page);
        };

        if self.page.is_ready() {
            log::debug!("document already loaded, running ready work now");
            on_ready(&self.page);
            return;
        }

        let id = self.page.add_event_listener(
            Target::Document,
            EventKind::DomContentLoaded,
            ListenerOptions::passive(),
            move |_, page| on_ready(page),
        );
        self.ready_listener = Some(id);
    }

    pub fn page(&self) -> &Page {
        &self.page
    }

    pub fn config(&self) -> &EcoConfig {
        &self.config
    }

    pub fn metrics(&self) -> &Metrics {
        &self.metrics
    }

    pub fn lazy_load(&self) -> &LazyLoad {
        &self.lazy_load
    }

    pub fn image_optimizer(&mut self) -> &mut ImageOptimizer {
        &mut self.image_optimizer
    }

    pub fn animation_optimizer(&self) -> &AnimationOptimizer {
        &self.animation_optimizer
    }

    pub fn dark_mode(&mut self) -> &mut DarkMode {
        &mut self.dark_mode
    }

    /// Flip dark mode on the page, returning the new state
    pub fn toggle_dark_mode(&self) -> bool {
        self.dark_mode.toggle(&self.page)
    }

    /// Footprint of the latest metrics sample
    pub fn calculate_footprint(&self) -> Footprint {
        self.metrics.calculate_footprint()
    }

    pub fn sustainability_score(&self) -> u8 {
        self.metrics.sustainability_score()
    }

    /// Footprint, score, breakdown and tips of the latest sample
    pub fn report(&self) -> PageReport {
        let footprint = self.metrics.calculate_footprint();
        PageReport::new(
            self.metrics.snapshot(),
            footprint,
            self.metrics.score_breakdown(),
            self.metrics.performance_tips(),
        )
    }
}

impl Drop for EcoCore {
    fn drop(&mut self) {
        if let Some(id) = self.ready_listener.take() {
            self.page.remove_event_listener(Target::Document, id);
        }
    }
}
