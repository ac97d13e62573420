//! Document model for instrumented pages
//!
//! - **document**: arena DOM with attribute, class list and layout helpers
//! - **html**: html5ever front end producing documents
//! - **selector**: the small selector subset the optimizers query with
//! - **geometry**: layout rectangles

mod document;
mod geometry;
pub mod html;
pub mod selector;

pub use document::{Document, ElementData, NodeId, NodeType};
pub use geometry::Rect;
pub use html::HtmlParser;
pub use selector::Selector;
