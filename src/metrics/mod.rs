//! Page metrics and carbon estimate
//!
//! [`Metrics`] holds the latest [`MetricsSnapshot`] for one page. Every
//! [`Metrics::measure`] overwrites it; nothing is accumulated.

mod score;

pub use score::{
    MAX_SCORE, ScoreBreakdown, TIP_ALREADY_OPTIMIZED, TIP_REDUCE_REQUESTS, TIP_REDUCE_WEIGHT,
    TIP_SIMPLIFY_DOM, performance_tips, sustainability_score,
};

use crate::host::Page;
use serde::Serialize;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Grams of CO2e per MB transferred
pub const GRAMS_CO2_PER_MB: f64 = 0.2;

/// Latest measurements for a page
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricsSnapshot {
    /// Transferred bytes plus document markup, in KB
    pub page_weight_kb: u64,
    /// Number of resource loads
    pub request_count: u64,
    /// Number of elements in the document
    pub dom_node_count: u64,
    /// Derived from `page_weight_kb` by [`Metrics::calculate_footprint`]
    pub estimated_co2_grams: f64,
}

/// Display-formatted footprint
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Footprint {
    /// e.g. "1024 KB"
    pub page_weight: String,
    pub requests: u64,
    pub dom_nodes: u64,
    /// e.g. "0.20 g CO2e"
    #[serde(rename = "estimatedCO2")]
    pub estimated_co2: String,
}

/// grams = KB / 1024 * 0.2, rounded to two decimals
pub fn estimate_co2_grams(page_weight_kb: u64) -> f64 {
    let page_weight_mb = page_weight_kb as f64 / 1024.0;
    (page_weight_mb * GRAMS_CO2_PER_MB * 100.0).round() / 100.0
}

/// Metrics sampler for one page
#[derive(Debug, Clone, Default)]
pub struct Metrics {
    snapshot: Arc<Mutex<MetricsSnapshot>>,
}

impl Metrics {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, MetricsSnapshot> {
        self.snapshot.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Sample page weight, request count and DOM size
    pub fn measure(&self, page: &Page) -> MetricsSnapshot {
        let entries = page.resource_entries();
        if entries.is_none() {
            log::debug!("performance timeline unavailable, counting document only");
        }
        let entries = entries.unwrap_or_default();

        let resource_bytes: u64 = entries.iter().map(|e| e.encoded_body_size_or_zero()).sum();
        let (document_bytes, dom_nodes) = page.with_document(|doc| {
            let markup = doc
                .document_element()
                .map(|html| doc.outer_html(html).len() as u64)
                .unwrap_or(0);
            (markup, doc.element_count() as u64)
        });

        let total_bytes = resource_bytes + document_bytes;
        let mut snapshot = self.lock();
        snapshot.page_weight_kb = (total_bytes as f64 / 1024.0).round() as u64;
        snapshot.request_count = entries.len() as u64;
        snapshot.dom_node_count = dom_nodes;

        log::debug!(
            "measured {} KB over {} requests, {} DOM nodes",
            snapshot.page_weight_kb,
            snapshot.request_count,
            snapshot.dom_node_count
        );
        *snapshot
    }

    /// Latest snapshot without re-measuring
    pub fn snapshot(&self) -> MetricsSnapshot {
        *self.lock()
    }

    /// Estimate CO2 from the latest snapshot and format the footprint
    pub fn calculate_footprint(&self) -> Footprint {
        let mut snapshot = self.lock();
        snapshot.estimated_co2_grams = estimate_co2_grams(snapshot.page_weight_kb);

        Footprint {
            page_weight: format!("{} KB", snapshot.page_weight_kb),
            requests: snapshot.request_count,
            dom_nodes: snapshot.dom_node_count,
            estimated_co2: format!("{:.2} g CO2e", snapshot.estimated_co2_grams),
        }
    }

    pub fn sustainability_score(&self) -> u8 {
        sustainability_score(&self.snapshot())
    }

    pub fn score_breakdown(&self) -> ScoreBreakdown {
        ScoreBreakdown::for_snapshot(&self.snapshot())
    }

    pub fn performance_tips(&self) -> Vec<String> {
        performance_tips(&self.snapshot())
    }

    #[cfg(test)]
    pub(crate) fn set_snapshot(&self, snapshot: MetricsSnapshot) {
        *self.lock() = snapshot;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::Document;
    use crate::host::{Capabilities, ResourceEntry};
    use pretty_assertions::assert_eq;

    fn page_with_markup(len: usize) -> Page {
        // "<html></html>" is 13 bytes
        let mut doc = Document::new();
        let html = doc.create_element("html");
        doc.append_child(doc.root(), html);
        if len > 13 {
            let text = doc.create_text("x".repeat(len - 13));
            doc.append_child(html, text);
        }
        Page::new(doc, Capabilities::modern())
    }

    #[test]
    fn test_zeroed_before_measure() {
        let metrics = Metrics::new();
        assert_eq!(metrics.snapshot(), MetricsSnapshot::default());
        let footprint = metrics.calculate_footprint();
        assert_eq!(footprint.page_weight, "0 KB");
        assert_eq!(footprint.estimated_co2, "0.00 g CO2e");
        assert_eq!(metrics.sustainability_score(), 100);
    }

    #[test]
    fn test_measure_sums_resources_and_markup() {
        let page = page_with_markup(1024);
        page.record_resource(ResourceEntry::new("hero.jpg", "img", Some(200 * 1024)));
        page.record_resource(ResourceEntry::new("opaque.js", "script", None));
        page.record_resource(ResourceEntry::new("app.css", "link", Some(1536)));

        let metrics = Metrics::new();
        let snapshot = metrics.measure(&page);
        // 204800 + 1536 + 1024 bytes = 202.5 KB, rounds up
        assert_eq!(snapshot.page_weight_kb, 203);
        assert_eq!(snapshot.request_count, 3);
        assert_eq!(snapshot.dom_node_count, 1);
    }

    #[test]
    fn test_measure_overwrites_previous_snapshot() {
        let page = page_with_markup(13);
        let metrics = Metrics::new();
        metrics.set_snapshot(MetricsSnapshot {
            page_weight_kb: 9000,
            request_count: 400,
            dom_node_count: 9000,
            estimated_co2_grams: 1.76,
        });

        let snapshot = metrics.measure(&page);
        assert_eq!(snapshot.page_weight_kb, 0);
        assert_eq!(snapshot.request_count, 0);
        assert_eq!(snapshot.dom_node_count, 1);
    }

    #[test]
    fn test_measure_without_timeline() {
        let mut doc = Document::new();
        let html = doc.create_element("html");
        doc.append_child(doc.root(), html);
        let page = Page::new(doc, Capabilities::legacy());

        let snapshot = Metrics::new().measure(&page);
        assert_eq!(snapshot.request_count, 0);
        assert_eq!(snapshot.dom_node_count, 1);
    }

    #[test]
    fn test_footprint_for_one_megabyte() {
        let metrics = Metrics::new();
        metrics.set_snapshot(MetricsSnapshot {
            page_weight_kb: 1024,
            request_count: 12,
            dom_node_count: 300,
            estimated_co2_grams: 0.0,
        });

        let footprint = metrics.calculate_footprint();
        assert_eq!(
            footprint,
            Footprint {
                page_weight: "1024 KB".to_string(),
                requests: 12,
                dom_nodes: 300,
                estimated_co2: "0.20 g CO2e".to_string(),
            }
        );
        assert_eq!(metrics.snapshot().estimated_co2_grams, 0.2);
    }

    #[test]
    fn test_co2_is_recomputed_not_accumulated() {
        let metrics = Metrics::new();
        metrics.set_snapshot(MetricsSnapshot {
            page_weight_kb: 5120,
            ..MetricsSnapshot::default()
        });
        metrics.calculate_footprint();
        metrics.calculate_footprint();
        assert_eq!(metrics.snapshot().estimated_co2_grams, 1.0);
    }

    #[test]
    fn test_footprint_json_keys() {
        let metrics = Metrics::new();
        let json = serde_json::to_value(metrics.calculate_footprint()).unwrap();
        assert!(json.get("pageWeight").is_some());
        assert!(json.get("domNodes").is_some());
        assert!(json.get("estimatedCO2").is_some());
    }

    #[test]
    fn test_estimate_rounding() {
        assert_eq!(estimate_co2_grams(0), 0.0);
        assert_eq!(estimate_co2_grams(1024), 0.2);
        // 3000 / 1024 * 0.2 = 0.5859...
        assert_eq!(estimate_co2_grams(3000), 0.59);
    }
}
