//! Page report

use crate::metrics::{Footprint, MetricsSnapshot, ScoreBreakdown};
use serde::Serialize;

/// Everything known about a page after measurement
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PageReport {
    /// Raw measurements
    snapshot: MetricsSnapshot,
    /// Display-formatted footprint
    footprint: Footprint,
    /// 0-100 sustainability score
    score: u8,
    /// Penalties behind the score
    breakdown: ScoreBreakdown,
    /// Recommendations
    tips: Vec<String>,
}

impl PageReport {
    /// Create a new report
    pub fn new(
        snapshot: MetricsSnapshot,
        footprint: Footprint,
        breakdown: ScoreBreakdown,
        tips: Vec<String>,
    ) -> Self {
        Self {
            snapshot,
            footprint,
            score: breakdown.score(),
            breakdown,
            tips,
        }
    }

    pub fn snapshot(&self) -> &MetricsSnapshot {
        &self.snapshot
    }

    pub fn footprint(&self) -> &Footprint {
        &self.footprint
    }

    pub fn score(&self) -> u8 {
        self.score
    }

    pub fn breakdown(&self) -> &ScoreBreakdown {
        &self.breakdown
    }

    pub fn tips(&self) -> &[String] {
        &self.tips
    }

    /// Letter grade for display
    pub fn grade(&self) -> char {
        match self.score {
            90..=100 => 'A',
            75..=89 => 'B',
            60..=74 => 'C',
            40..=59 => 'D',
            _ => 'F',
        }
    }
}
