use std::path::Path;

use thiserror::Error;

pub mod config;
pub mod dedup;
pub mod detector;
pub mod matcher;
pub mod pairing;
pub mod patterns;
pub mod references;
pub mod scoring;
pub mod stats;

pub use config::{ConfigError, ListOverride, MatchingConfig, MatchingConfigBuilder};
pub use matcher::{CaptionMatcher, MatchOutcome};
pub use patterns::PatternLibrary;
pub use stats::{ConfidenceSummary, PairingStats, TypeDistribution};
// Re-export domain types from core (canonical definitions live there)
pub use capref_core::{
    CaptionCandidate, CaptionContextPair, CaptionId, CaptionType, FragmentSource, ReferenceMatch,
    ReferenceType, SourceError, TextFragment,
};

#[derive(Error, Debug)]
pub enum MatchError {
    #[error(transparent)]
    Source(#[from] SourceError),
}

/// Match captions and references in a document using the given fragment source.
///
/// Pipeline:
/// 1. Extract positioned text fragments via `source`
/// 2. Detect captions with every caption pattern
/// 3. Deduplicate and sort the captions by page and number
/// 4. Find references whose number names a detected caption
/// 5. Pair each caption with its references and score the pair
/// 6. Drop pairs below the default confidence threshold
pub fn match_document(
    path: &Path,
    source: &dyn FragmentSource,
) -> Result<MatchOutcome, MatchError> {
    CaptionMatcher::new().match_document(path, source)
}
