//! Page optimizers
//!
//! Independent modules, each activated by the bootstrap:
//! - Lazy loading: native, observer-based or polled deferral of media
//! - Images: responsive sizing hints and WebP detection
//! - Animation: visibility gating and reduced-motion flag
//! - Dark mode: OS color scheme mirror with manual toggle

pub mod animation;
pub mod dark_mode;
pub mod images;
pub mod lazy_load;

pub use animation::AnimationOptimizer;
pub use dark_mode::DarkMode;
pub use images::{ImageOptimizer, DecodableFormat, detect_format_support};
pub use lazy_load::{LazyLoad, LazyStrategy, LegacyPoller};
