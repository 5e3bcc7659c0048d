use std::path::Path;

use thiserror::Error;

use crate::{FragmentError, TextFragment};

#[derive(Error, Debug)]
pub enum SourceError {
    #[error("failed to open document: {0}")]
    Open(String),
    #[error("failed to decode fragments: {0}")]
    Decode(String),
    #[error("invalid fragment at {location}: {source}")]
    InvalidFragment {
        location: String,
        #[source]
        source: FragmentError,
    },
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Trait for fragment producers.
///
/// Implementors turn a document on disk into positioned text fragments; the
/// matching pipeline (caption detection, reference finding, pairing) lives in
/// `capref_matching::CaptionMatcher`.
pub trait FragmentSource: Send + Sync {
    /// Extract every text fragment of a document, in reading order.
    fn extract_fragments(&self, path: &Path) -> Result<Vec<TextFragment>, SourceError>;
}
