use capref_core::{CaptionCandidate, CaptionType, TextFragment};
use regex::Captures;

use crate::dedup::deduplicate;
use crate::patterns::PatternLibrary;
use crate::scoring::caption_confidence;

const FIGURE_KEYWORDS: &[&str] = &["圖", "figure", "fig.", "圖片", "圖像"];
const TABLE_KEYWORDS: &[&str] = &["表", "table", "tab.", "表格"];
const CHART_KEYWORDS: &[&str] = &["chart", "圖表"];

/// Classify a caption by the first keyword family found in its matched text.
pub fn caption_type_of(matched_text: &str) -> CaptionType {
    let lower = matched_text.to_lowercase();
    let has = |words: &[&str]| words.iter().any(|w| lower.contains(w));
    if has(FIGURE_KEYWORDS) {
        CaptionType::Figure
    } else if has(TABLE_KEYWORDS) {
        CaptionType::Table
    } else if has(CHART_KEYWORDS) {
        CaptionType::Chart
    } else {
        CaptionType::Figure
    }
}

/// `"{primary}.{sub}"` when a sub-number was captured, else `primary`.
/// `None` when the pattern matched without a primary number.
pub(crate) fn compose_number(caps: &Captures<'_>) -> Option<String> {
    let primary = caps.get(1).map(|m| m.as_str()).filter(|s| !s.is_empty())?;
    match caps.get(2).map(|m| m.as_str()).filter(|s| !s.is_empty()) {
        Some(sub) => Some(format!("{primary}.{sub}")),
        None => Some(primary.to_string()),
    }
}

/// Apply every caption pattern to every fragment, without deduplication.
pub fn scan_captions(
    fragments: &[TextFragment],
    patterns: &PatternLibrary,
    min_caption_length: usize,
) -> Vec<CaptionCandidate> {
    let mut candidates = Vec::new();

    for fragment in fragments {
        for re in patterns.caption_patterns() {
            for caps in re.captures_iter(&fragment.text) {
                let Some(number) = compose_number(&caps) else {
                    continue;
                };
                let title = caps.get(3).map(|m| m.as_str().trim()).unwrap_or("");
                if title.chars().count() < min_caption_length {
                    continue;
                }
                let matched = caps.get(0).map(|m| m.as_str()).unwrap_or("");

                candidates.push(CaptionCandidate {
                    title: title.to_string(),
                    page: fragment.page,
                    bbox: fragment.bbox,
                    caption_type: caption_type_of(matched),
                    number,
                    confidence: caption_confidence(&fragment.font, matched),
                    font: fragment.font.clone(),
                });
            }
        }
    }

    candidates
}

/// Detect captions: scan, deduplicate, then stably sort by `(page, number)`.
///
/// `number` is compared as a string, so `"10"` sorts before `"2"`.
pub fn detect_captions(
    fragments: &[TextFragment],
    patterns: &PatternLibrary,
    min_caption_length: usize,
) -> Vec<CaptionCandidate> {
    let raw = scan_captions(fragments, patterns, min_caption_length);
    let raw_count = raw.len();
    let mut captions = deduplicate(raw);
    captions.sort_by(|a, b| (a.page, &a.number).cmp(&(b.page, &b.number)));
    tracing::debug!(raw = raw_count, kept = captions.len(), "caption detection complete");
    captions
}
