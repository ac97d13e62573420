//! Initialization options

use crate::utils::{EcoError, Result};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

fn enabled() -> bool {
    true
}

/// Options accepted by [`EcoCore::init`](crate::EcoCore::init)
///
/// Keys are camelCase on the wire (`lazyLoad`, `minimalAnimation`, ...).
/// Unknown keys are kept in `extensions` untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EcoConfig {
    /// Defer offscreen images and iframes
    #[serde(default = "enabled")]
    pub lazy_load: bool,
    /// Gate animations on visibility and reduced-motion
    #[serde(default = "enabled")]
    pub minimal_animation: bool,
    /// Add responsive sizing hints to images
    #[serde(default = "enabled")]
    pub optimize_images: bool,
    /// Mirror the OS dark color scheme onto the document
    #[serde(default)]
    pub dark_mode: bool,
    /// Caller-defined fields passed through unchanged
    #[serde(flatten)]
    pub extensions: Map<String, Value>,
}

impl EcoConfig {
    /// Merge a JSON options object over the defaults
    pub fn from_options(options: Value) -> Result<Self> {
        match options {
            Value::Null => Ok(Self::default()),
            Value::Object(_) => {
                serde_json::from_value(options).map_err(|e| EcoError::Config(e.to_string()))
            }
            other => Err(EcoError::Config(format!("options must be an object, got {}", other))),
        }
    }

    /// Parse options from JSON text
    pub fn from_json(json: &str) -> Result<Self> {
        Self::from_options(serde_json::from_str(json)?)
    }

    /// Look up a pass-through field
    pub fn extension(&self, key: &str) -> Option<&Value> {
        self.extensions.get(key)
    }
}

impl Default for EcoConfig {
    fn default() -> Self {
        Self {
            lazy_load: true,
            minimal_animation: true,
            optimize_images: true,
            dark_mode: false,
            extensions: Map::new(),
        }
    }
}
