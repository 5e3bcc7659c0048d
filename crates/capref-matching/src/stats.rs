use std::collections::BTreeSet;

use capref_core::{CaptionContextPair, CaptionType};
use serde::Serialize;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TypeDistribution {
    pub figure: usize,
    pub table: usize,
    pub chart: usize,
}

impl TypeDistribution {
    fn record(&mut self, caption_type: CaptionType) {
        match caption_type {
            CaptionType::Figure => self.figure += 1,
            CaptionType::Table => self.table += 1,
            CaptionType::Chart => self.chart += 1,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ConfidenceSummary {
    pub min: f64,
    pub max: f64,
    pub avg: f64,
}

/// Summary of a pair list for reporting.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PairingStats {
    pub total_pairs: usize,
    pub type_distribution: TypeDistribution,
    pub pages_covered: BTreeSet<u32>,
    /// `None` when there are no pairs.
    pub confidence: Option<ConfidenceSummary>,
    pub total_contexts: usize,
}

impl PairingStats {
    pub fn from_pairs<'a>(pairs: impl IntoIterator<Item = &'a CaptionContextPair>) -> Self {
        let mut stats = PairingStats::default();
        let mut sum = 0.0;
        let mut min = f64::INFINITY;
        let mut max = f64::NEG_INFINITY;

        for pair in pairs {
            stats.total_pairs += 1;
            stats.type_distribution.record(pair.caption.caption_type);
            stats.pages_covered.insert(pair.caption.page);
            stats.total_contexts += pair.contexts.len();
            sum += pair.pairing_confidence;
            min = min.min(pair.pairing_confidence);
            max = max.max(pair.pairing_confidence);
        }

        if stats.total_pairs > 0 {
            stats.confidence = Some(ConfidenceSummary {
                min,
                max,
                avg: sum / stats.total_pairs as f64,
            });
        }
        stats
    }
}
