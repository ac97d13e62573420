//! Sustainability score and recommendations
//!
//! Each dimension is penalised by its single worst matching tier; tiers
//! within a dimension do not add up.

use super::MetricsSnapshot;
use serde::Serialize;

/// Best possible score
pub const MAX_SCORE: u8 = 100;

/// `(exclusive lower bound, penalty)` ordered from worst to mildest
type Tiers = [(u64, u8); 3];

const PAGE_WEIGHT_TIERS: Tiers = [(5000, 30), (2000, 20), (1000, 10)];
const REQUEST_TIERS: Tiers = [(100, 30), (50, 20), (25, 10)];
const DOM_NODE_TIERS: Tiers = [(2000, 30), (1000, 20), (500, 10)];

const TIP_PAGE_WEIGHT_KB: u64 = 1500;
const TIP_REQUESTS: u64 = 50;
const TIP_DOM_NODES: u64 = 1000;

pub const TIP_REDUCE_WEIGHT: &str = "Reduce page weight by optimizing images and minifying assets.";
pub const TIP_REDUCE_REQUESTS: &str = "Reduce the number of HTTP requests by bundling resources.";
pub const TIP_SIMPLIFY_DOM: &str = "Simplify DOM structure by removing unnecessary elements.";
pub const TIP_ALREADY_OPTIMIZED: &str = "Your page is already well optimized!";

fn tier_penalty(value: u64, tiers: &Tiers) -> u8 {
    tiers
        .iter()
        .find(|(bound, _)| value > *bound)
        .map_or(0, |(_, penalty)| *penalty)
}

/// Per-dimension penalties behind a score
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoreBreakdown {
    pub page_weight_penalty: u8,
    pub request_penalty: u8,
    pub dom_penalty: u8,
}

impl ScoreBreakdown {
    pub fn for_snapshot(snapshot: &MetricsSnapshot) -> Self {
        Self {
            page_weight_penalty: tier_penalty(snapshot.page_weight_kb, &PAGE_WEIGHT_TIERS),
            request_penalty: tier_penalty(snapshot.request_count, &REQUEST_TIERS),
            dom_penalty: tier_penalty(snapshot.dom_node_count, &DOM_NODE_TIERS),
        }
    }

    pub fn total_penalty(&self) -> u8 {
        self.page_weight_penalty + self.request_penalty + self.dom_penalty
    }

    /// Score after penalties, clamped to `0..=100`
    pub fn score(&self) -> u8 {
        MAX_SCORE.saturating_sub(self.total_penalty()).min(MAX_SCORE)
    }
}

/// 0-100 sustainability score for a snapshot
pub fn sustainability_score(snapshot: &MetricsSnapshot) -> u8 {
    ScoreBreakdown::for_snapshot(snapshot).score()
}

/// One recommendation per exceeded threshold, in weight/requests/DOM order
pub fn performance_tips(snapshot: &MetricsSnapshot) -> Vec<String> {
    let mut tips = Vec::new();

    if snapshot.page_weight_kb > TIP_PAGE_WEIGHT_KB {
        tips.push(TIP_REDUCE_WEIGHT.to_string());
    }
    if snapshot.request_count > TIP_REQUESTS {
        tips.push(TIP_REDUCE_REQUESTS.to_string());
    }
    if snapshot.dom_node_count > TIP_DOM_NODES {
        tips.push(TIP_SIMPLIFY_DOM.to_string());
    }

    if tips.is_empty() {
        tips.push(TIP_ALREADY_OPTIMIZED.to_string());
    }
    tips
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;

    fn snapshot(weight: u64, requests: u64, nodes: u64) -> MetricsSnapshot {
        MetricsSnapshot {
            page_weight_kb: weight,
            request_count: requests,
            dom_node_count: nodes,
            estimated_co2_grams: 0.0,
        }
    }

    #[test]
    fn test_empty_page_scores_full() {
        let s = snapshot(0, 0, 0);
        assert_eq!(sustainability_score(&s), 100);
        assert_eq!(performance_tips(&s), vec![TIP_ALREADY_OPTIMIZED.to_string()]);
    }

    #[test]
    fn test_worst_tier_in_every_dimension() {
        let s = snapshot(6000, 150, 2500);
        let breakdown = ScoreBreakdown::for_snapshot(&s);
        assert_eq!(
            breakdown,
            ScoreBreakdown {
                page_weight_penalty: 30,
                request_penalty: 30,
                dom_penalty: 30
            }
        );
        assert_eq!(sustainability_score(&s), 10);
    }

    #[test]
    fn test_single_mild_tier() {
        let s = snapshot(1200, 10, 10);
        assert_eq!(sustainability_score(&s), 90);
        // The weight tip only starts above 1500 KB
        assert_eq!(performance_tips(&s), vec![TIP_ALREADY_OPTIMIZED.to_string()]);
        assert_eq!(
            performance_tips(&snapshot(1600, 10, 10)),
            vec![TIP_REDUCE_WEIGHT.to_string()]
        );
    }

    #[test]
    fn test_tiers_are_exclusive_bounds() {
        assert_eq!(sustainability_score(&snapshot(1000, 25, 500)), 100);
        assert_eq!(sustainability_score(&snapshot(1001, 26, 501)), 70);
        assert_eq!(sustainability_score(&snapshot(2001, 51, 1001)), 40);
    }

    #[test]
    fn test_tips_order() {
        let s = snapshot(1600, 60, 1200);
        assert_eq!(
            performance_tips(&s),
            vec![
                TIP_REDUCE_WEIGHT.to_string(),
                TIP_REDUCE_REQUESTS.to_string(),
                TIP_SIMPLIFY_DOM.to_string(),
            ]
        );
    }

    proptest! {
        #[test]
        fn prop_score_in_range(weight in any::<u64>(), requests in any::<u64>(), nodes in any::<u64>()) {
            let score = sustainability_score(&snapshot(weight, requests, nodes));
            prop_assert!(score <= 100);
            prop_assert!(score >= 10);
        }

        #[test]
        fn prop_heavier_page_never_scores_higher(weight in 0u64..10_000, extra in 0u64..10_000) {
            let light = sustainability_score(&snapshot(weight, 0, 0));
            let heavy = sustainability_score(&snapshot(weight + extra, 0, 0));
            prop_assert!(heavy <= light);
        }
    }
}
