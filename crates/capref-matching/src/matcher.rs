use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use capref_core::{
    CaptionCandidate, CaptionContextPair, FragmentSource, ReferenceMatch, TextFragment,
};
use rayon::prelude::*;

use crate::config::MatchingConfig;
use crate::patterns::PatternLibrary;
use crate::stats::PairingStats;
use crate::{MatchError, detector, pairing, references};

/// Result of matching one document.
#[derive(Debug, Clone, PartialEq)]
pub struct MatchOutcome {
    /// Pairs that passed the confidence threshold and type filters, in caption order.
    pub pairs: Vec<CaptionContextPair>,
    /// Pairs removed by the output filter. Only populated when the
    /// configuration retains filtered pairs.
    pub filtered_out: Vec<CaptionContextPair>,
    /// Number of pairs removed by the output filter, retained or not.
    pub filtered_count: usize,
    pub total_captions: usize,
    pub total_references: usize,
    pub elapsed: Duration,
}

impl MatchOutcome {
    /// Statistics over the visible pairs.
    pub fn stats(&self) -> PairingStats {
        PairingStats::from_pairs(&self.pairs)
    }

    /// Statistics over visible and retained filtered pairs.
    pub fn stats_with_filtered(&self) -> PairingStats {
        PairingStats::from_pairs(self.pairs.iter().chain(&self.filtered_out))
    }
}

/// A configurable caption-reference matching pipeline.
///
/// Holds a validated [`MatchingConfig`] and its compiled [`PatternLibrary`]
/// and exposes each pipeline step as a method. Immutable after construction,
/// so one matcher can serve many documents concurrently.
#[derive(Debug, Clone)]
pub struct CaptionMatcher {
    config: MatchingConfig,
    patterns: PatternLibrary,
}

impl Default for CaptionMatcher {
    fn default() -> Self {
        Self::new()
    }
}

impl CaptionMatcher {
    /// Create a matcher with default configuration.
    pub fn new() -> Self {
        Self::with_config(MatchingConfig::default())
    }

    /// Create a matcher with a custom configuration.
    pub fn with_config(config: MatchingConfig) -> Self {
        let patterns = PatternLibrary::for_config(&config);
        Self { config, patterns }
    }

    /// Get a reference to the current config.
    pub fn config(&self) -> &MatchingConfig {
        &self.config
    }

    pub fn patterns(&self) -> &PatternLibrary {
        &self.patterns
    }

    /// Detect, deduplicate and sort captions (steps 2 and 3).
    pub fn detect_captions(&self, fragments: &[TextFragment]) -> Vec<CaptionCandidate> {
        detector::detect_captions(fragments, &self.patterns, self.config.min_caption_length)
    }

    /// Find references to known captions (step 4).
    pub fn find_references(
        &self,
        fragments: &[TextFragment],
        captions: &[CaptionCandidate],
    ) -> Vec<ReferenceMatch> {
        references::find_references(
            fragments,
            captions,
            &self.patterns,
            self.config.context_window,
        )
    }

    /// Pair every caption with its references (step 5).
    pub fn pair(
        &self,
        captions: &[CaptionCandidate],
        references: &[ReferenceMatch],
    ) -> Vec<CaptionContextPair> {
        pairing::pair_captions(captions, references)
    }

    /// Whether a pair survives the output filter.
    pub fn passes_filter(&self, pair: &CaptionContextPair) -> bool {
        pair.pairing_confidence >= self.config.confidence_threshold
            && self.config.includes(pair.caption.caption_type)
    }

    /// Run the full pipeline on already-extracted fragments.
    pub fn match_fragments(&self, fragments: &[TextFragment]) -> MatchOutcome {
        let start = Instant::now();

        let captions = self.detect_captions(fragments);
        let references = self.find_references(fragments, &captions);
        let all_pairs = self.pair(&captions, &references);

        let (pairs, rejected): (Vec<_>, Vec<_>) =
            all_pairs.into_iter().partition(|p| self.passes_filter(p));
        let filtered_count = rejected.len();
        let filtered_out = if self.config.retain_filtered {
            rejected
        } else {
            Vec::new()
        };

        let outcome = MatchOutcome {
            pairs,
            filtered_out,
            filtered_count,
            total_captions: captions.len(),
            total_references: references.len(),
            elapsed: start.elapsed(),
        };
        tracing::debug!(
            fragments = fragments.len(),
            captions = outcome.total_captions,
            references = outcome.total_references,
            kept = outcome.pairs.len(),
            filtered = outcome.filtered_count,
            "matching complete"
        );
        outcome
    }

    /// Extract fragments through `source` and run the full pipeline.
    ///
    /// An extraction failure is returned as is; no partial pairs are produced.
    pub fn match_document(
        &self,
        path: &Path,
        source: &dyn FragmentSource,
    ) -> Result<MatchOutcome, MatchError> {
        let fragments = source.extract_fragments(path)?;
        let outcome = self.match_fragments(&fragments);
        tracing::info!(
            path = %path.display(),
            pairs = outcome.pairs.len(),
            captions = outcome.total_captions,
            elapsed_ms = outcome.elapsed.as_millis() as u64,
            "matched document"
        );
        Ok(outcome)
    }

    /// Match several documents in parallel, one independent pipeline each.
    ///
    /// Results are returned in input order.
    pub fn match_batch(
        &self,
        paths: &[PathBuf],
        source: &dyn FragmentSource,
    ) -> Vec<(PathBuf, Result<MatchOutcome, MatchError>)> {
        paths
            .par_iter()
            .map(|path| (path.clone(), self.match_document(path, source)))
            .collect()
    }
}
