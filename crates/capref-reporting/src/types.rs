use std::fmt;
use std::str::FromStr;

use capref_core::CaptionContextPair;
use capref_matching::PairingStats;
use serde::Serialize;

/// Output format for exported reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExportFormat {
    #[default]
    Text,
    Json,
    Markdown,
}

impl ExportFormat {
    pub fn all() -> &'static [ExportFormat] {
        &[ExportFormat::Text, ExportFormat::Json, ExportFormat::Markdown]
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Json => "json",
            Self::Markdown => "markdown",
        }
    }

    pub fn extension(self) -> &'static str {
        match self {
            Self::Text => "txt",
            Self::Json => "json",
            Self::Markdown => "md",
        }
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ExportFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "text" | "txt" => Ok(Self::Text),
            "json" => Ok(Self::Json),
            "markdown" | "md" => Ok(Self::Markdown),
            other => Err(format!(
                "unknown format '{other}' (expected text, json or markdown)"
            )),
        }
    }
}

/// Matched pairs of one document, ready for export.
#[derive(Debug, Clone, Serialize)]
pub struct DocumentReport<'a> {
    pub source: &'a str,
    pub pairs: &'a [CaptionContextPair],
    /// Pairs removed by the output filter, when the run retained them.
    #[serde(skip_serializing_if = "<[_]>::is_empty")]
    pub filtered_out: &'a [CaptionContextPair],
    pub stats: PairingStats,
}

impl<'a> DocumentReport<'a> {
    pub fn new(source: &'a str, pairs: &'a [CaptionContextPair]) -> Self {
        Self {
            source,
            pairs,
            filtered_out: &[],
            stats: PairingStats::from_pairs(pairs),
        }
    }

    pub fn with_filtered(mut self, filtered_out: &'a [CaptionContextPair]) -> Self {
        self.filtered_out = filtered_out;
        self
    }
}
