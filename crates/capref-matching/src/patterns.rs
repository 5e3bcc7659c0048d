//! Ordered caption and reference pattern lists.
//!
//! Every caption pattern captures `(number, sub-number?, title)`; every
//! reference pattern captures `(number, sub-number?)`. Patterns are compiled
//! case-insensitive and multi-line, and are applied independently of each
//! other, so the same text may be matched by several of them.

use once_cell::sync::Lazy;
use regex::{Regex, RegexBuilder};

use crate::config::{ListOverride, MatchingConfig};

/// Chinese caption forms: `圖 3：…`, `表 2.1:…`, `Figure 4 …`, `圖片 1：…`.
pub const CHINESE_CAPTION_PATTERNS: &[&str] = &[
    r"(?:圖|表|圖表)\s*(\d+)(?:\.(\d+))?\s*[：:]\s*(.+)",
    r"(?:圖|表|圖表)\s*(\d+)(?:[.-](\d+))?\s*[：:]\s*(.+)",
    r"(?:Figure|Table|Fig\.|Tab\.)\s*(\d+)(?:\.(\d+))?\s*[：:]?\s*(.+)",
    r"(?:圖片|表格|圖像)\s*(\d+)(?:[.-](\d+))?\s*[：:]\s*(.+)",
];

pub const ENGLISH_CAPTION_PATTERNS: &[&str] = &[
    r"(?:Figure|Table|Fig\.|Tab\.)\s*(\d+)(?:\.(\d+))?\s*[：:.]?\s*(.+)",
    r"(?:FIGURE|TABLE|FIG\.|TAB\.)\s*(\d+)(?:\.(\d+))?\s*[：:.]?\s*(.+)",
];

/// `圖 3 標題` without a colon. The title runs until a newline, another
/// marker, or a digit.
pub const LOOSE_CAPTION_PATTERNS: &[&str] = &[r"(?:圖|表)\s*(\d+)(?:[.-](\d+))?\s+(.[^\n圖表\d]*)"];

pub const CHINESE_REFERENCE_PATTERNS: &[&str] = &[
    r"(?:如|見|參見|參考|詳見)\s*(?:圖|表|圖表)\s*(\d+)(?:[.-](\d+))?",
    r"(?:圖|表|圖表)\s*(\d+)(?:[.-](\d+))?\s*(?:所示|顯示|中|內)",
    r"(?:上|下)\s*(?:圖|表)\s*(\d+)(?:[.-](\d+))?",
];

pub const ENGLISH_REFERENCE_PATTERNS: &[&str] = &[
    r"(?:see|refer to|as shown in|in)\s*(?:Figure|Table|Fig\.|Tab\.)\s*(\d+)(?:\.(\d+))?",
    r"(?:Figure|Table|Fig\.|Tab\.)\s*(\d+)(?:\.(\d+))?\s*(?:shows|displays|illustrates)",
];

const CAPTION_GROUPS: usize = 3;
const REFERENCE_GROUPS: usize = 1;

/// Built-in caption pattern sources in application order.
pub fn default_caption_patterns() -> Vec<String> {
    CHINESE_CAPTION_PATTERNS
        .iter()
        .chain(ENGLISH_CAPTION_PATTERNS)
        .chain(LOOSE_CAPTION_PATTERNS)
        .map(|s| s.to_string())
        .collect()
}

/// Built-in reference pattern sources in application order.
pub fn default_reference_patterns() -> Vec<String> {
    CHINESE_REFERENCE_PATTERNS
        .iter()
        .chain(ENGLISH_REFERENCE_PATTERNS)
        .map(|s| s.to_string())
        .collect()
}

static BUILTIN: Lazy<PatternLibrary> =
    Lazy::new(|| PatternLibrary::compile(&ListOverride::Default, &ListOverride::Default));

/// Compiled, immutable pattern lists shared by every fragment of a run.
#[derive(Debug, Clone)]
pub struct PatternLibrary {
    caption_patterns: Vec<Regex>,
    reference_patterns: Vec<Regex>,
}

impl PatternLibrary {
    /// The process-wide built-in library.
    pub fn builtin() -> &'static PatternLibrary {
        &BUILTIN
    }

    /// Library for a configuration. Reuses the built-in compilation when no
    /// overrides are set.
    pub fn for_config(config: &MatchingConfig) -> PatternLibrary {
        match (config.caption_patterns(), config.reference_patterns()) {
            (ListOverride::Default, ListOverride::Default) => BUILTIN.clone(),
            (captions, references) => Self::compile(captions, references),
        }
    }

    /// Resolve overrides against the built-in lists and compile them.
    ///
    /// Patterns that fail to compile, or that expose too few capture groups,
    /// are skipped with a warning.
    pub fn compile(captions: &ListOverride<String>, references: &ListOverride<String>) -> Self {
        let caption_patterns = compile_list(
            &captions.resolve(&default_caption_patterns()),
            CAPTION_GROUPS,
            "caption",
        );
        let reference_patterns = compile_list(
            &references.resolve(&default_reference_patterns()),
            REFERENCE_GROUPS,
            "reference",
        );
        tracing::debug!(
            captions = caption_patterns.len(),
            references = reference_patterns.len(),
            "compiled pattern library"
        );
        Self {
            caption_patterns,
            reference_patterns,
        }
    }

    pub fn caption_patterns(&self) -> &[Regex] {
        &self.caption_patterns
    }

    pub fn reference_patterns(&self) -> &[Regex] {
        &self.reference_patterns
    }
}

fn compile_list(sources: &[String], min_groups: usize, kind: &str) -> Vec<Regex> {
    sources
        .iter()
        .filter_map(|src| {
            let re = match RegexBuilder::new(src)
                .case_insensitive(true)
                .multi_line(true)
                .build()
            {
                Ok(re) => re,
                Err(e) => {
                    tracing::warn!(kind, pattern = %src, error = %e, "skipping pattern that failed to compile");
                    return None;
                }
            };
            // captures_len counts the implicit whole-match group
            let groups = re.captures_len() - 1;
            if groups < min_groups {
                tracing::warn!(kind, pattern = %src, groups, "skipping pattern with too few capture groups");
                return None;
            }
            Some(re)
        })
        .collect()
}
