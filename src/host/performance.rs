//! Resource timing buffer

use crate::utils::Result;
use serde::{Deserialize, Serialize};

/// Entry type of resource loads in the timeline
pub const RESOURCE_ENTRY_TYPE: &str = "resource";

/// One `PerformanceResourceTiming` record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceEntry {
    /// Resource URL
    pub name: String,
    /// What started the load ("img", "script", "link", ...)
    #[serde(default = "default_initiator")]
    pub initiator_type: String,
    /// Compressed body size; absent for opaque cross-origin loads
    #[serde(default)]
    pub encoded_body_size: Option<u64>,
}

fn default_initiator() -> String {
    "other".to_string()
}

impl ResourceEntry {
    pub fn new(name: impl Into<String>, initiator_type: impl Into<String>, encoded_body_size: Option<u64>) -> Self {
        Self {
            name: name.into(),
            initiator_type: initiator_type.into(),
            encoded_body_size,
        }
    }

    /// Body size with unknown sizes counted as zero
    pub fn encoded_body_size_or_zero(&self) -> u64 {
        self.encoded_body_size.unwrap_or(0)
    }
}

/// Parse a JSON array of resource entries
pub fn parse_entries(json: &str) -> Result<Vec<ResourceEntry>> {
    Ok(serde_json::from_str(json)?)
}

/// Recorded resource loads for one page
#[derive(Debug, Clone, Default)]
pub struct PerformanceTimeline {
    entries: Vec<ResourceEntry>,
}

impl PerformanceTimeline {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, entry: ResourceEntry) {
        self.entries.push(entry);
    }

    /// Equivalent of `performance.getEntriesByType(kind)`
    pub fn entries_by_type(&self, kind: &str) -> Vec<ResourceEntry> {
        if kind == RESOURCE_ENTRY_TYPE {
            self.entries.clone()
        } else {
            Vec::new()
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}
