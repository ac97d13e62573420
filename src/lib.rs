//! # EcoCore - Page sustainability toolkit
//!
//! Instruments a web page to lower its energy cost and reports its
//! estimated footprint.
//!
//! ## Architecture
//!
//! The crate is organized into the following modules:
//!
//! - **engine**: Bootstrap that activates the optimizers from configuration
//! - **optimizers**: Lazy loading, responsive images, animation gating, dark mode
//! - **metrics**: Page weight, request and DOM sampling with a carbon estimate
//! - **host**: The page a module runs against (events, observers, media queries)
//! - **dom**: Arena document parsed with html5ever, plus a small selector engine
//! - **config**: Options with defaults and extension keys
//! - **utils**: Shared error types

pub mod config;
pub mod dom;
pub mod engine;
pub mod host;
pub mod metrics;
pub mod optimizers;
pub mod utils;

// Re-export main types for convenience
pub use config::EcoConfig;
pub use engine::{EcoCore, PageReport};
pub use host::{Capabilities, Page};
pub use utils::error::{EcoError, Result};

/// Library version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const NAME: &str = "EcoCore";
