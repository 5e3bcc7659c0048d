use std::collections::HashSet;

use capref_core::{CaptionCandidate, ReferenceMatch, ReferenceType, TextFragment};

use crate::detector::compose_number;
use crate::patterns::PatternLibrary;
use crate::scoring::reference_confidence;

const FIGURE_KEYWORDS: &[&str] = &["圖", "figure", "fig."];
const TABLE_KEYWORDS: &[&str] = &["表", "table", "tab."];

/// Classify a reference by the first keyword family found in its phrase.
pub fn reference_type_of(phrase: &str) -> ReferenceType {
    let lower = phrase.to_lowercase();
    let has = |words: &[&str]| words.iter().any(|w| lower.contains(w));
    if has(FIGURE_KEYWORDS) {
        ReferenceType::Figure
    } else if has(TABLE_KEYWORDS) {
        ReferenceType::Table
    } else {
        ReferenceType::General
    }
}

/// Identifiers a reference may name: `"{type}_{number}"` and the bare number
/// of every caption.
pub fn known_identifiers(captions: &[CaptionCandidate]) -> HashSet<String> {
    let mut known = HashSet::with_capacity(captions.len() * 2);
    for caption in captions {
        known.insert(format!("{}_{}", caption.caption_type, caption.number));
        known.insert(caption.number.clone());
    }
    known
}

/// Loose acceptance: exact membership, or containment in either direction
/// against any known identifier.
pub fn is_known(reference_number: &str, known: &HashSet<String>) -> bool {
    known.contains(reference_number)
        || known
            .iter()
            .any(|k| k.contains(reference_number) || reference_number.contains(k.as_str()))
}

/// Text around `start..end`: up to `half` characters on each side, trimmed.
pub fn extract_context(text: &str, start: usize, end: usize, half: usize) -> &str {
    let from = text[..start]
        .char_indices()
        .rev()
        .take(half)
        .last()
        .map_or(start, |(i, _)| i);
    let to = text[end..]
        .char_indices()
        .nth(half)
        .map_or(text.len(), |(i, _)| end + i);
    text[from..to].trim()
}

/// Scan fragments for references to the given captions.
///
/// Matches naming an unknown number are dropped. Within one fragment, a match
/// overlapping an already accepted match with the same number is dropped, so
/// the earlier pattern wins that span.
pub fn find_references(
    fragments: &[TextFragment],
    captions: &[CaptionCandidate],
    patterns: &PatternLibrary,
    context_window: usize,
) -> Vec<ReferenceMatch> {
    let known = known_identifiers(captions);
    let half = context_window / 2;
    let mut references = Vec::new();

    for fragment in fragments {
        let mut spans: Vec<(usize, usize, String)> = Vec::new();

        for re in patterns.reference_patterns() {
            for caps in re.captures_iter(&fragment.text) {
                let Some(number) = compose_number(&caps) else {
                    continue;
                };
                let Some(whole) = caps.get(0) else {
                    continue;
                };
                if !is_known(&number, &known) {
                    continue;
                }
                let (start, end) = (whole.start(), whole.end());
                if spans
                    .iter()
                    .any(|(s, e, n)| *n == number && start < *e && *s < end)
                {
                    continue;
                }

                let phrase = whole.as_str();
                let context = extract_context(&fragment.text, start, end, half);
                references.push(ReferenceMatch {
                    text: phrase.to_string(),
                    page: fragment.page,
                    reference_type: reference_type_of(phrase),
                    reference_number: number.clone(),
                    context_window: context.to_string(),
                    bbox: fragment.bbox,
                    confidence: reference_confidence(phrase, context),
                });
                spans.push((start, end, number));
            }
        }
    }

    tracing::debug!(
        known = known.len(),
        found = references.len(),
        "reference scan complete"
    );
    references
}

#[cfg(test)]
mod tests {
    use capref_core::{BBox, CaptionType, FontInfo};

    use super::*;

    fn frag(text: &str, page: u32) -> TextFragment {
        TextFragment::new(text, page, BBox::new(0.0, 0.0, 100.0, 10.0), FontInfo::new("Arial", 10.0, false))
            .unwrap()
    }

    fn cap(caption_type: CaptionType, number: &str) -> CaptionCandidate {
        CaptionCandidate {
            title: "測試圖片說明".into(),
            page: 1,
            bbox: BBox::default(),
            caption_type,
            number: number.into(),
            confidence: 0.8,
            font: FontInfo::default(),
        }
    }

    fn find(texts: &[&str], captions: &[CaptionCandidate], window: usize) -> Vec<ReferenceMatch> {
        let fragments: Vec<TextFragment> = texts.iter().map(|t| frag(t, 1)).collect();
        find_references(&fragments, captions, PatternLibrary::builtin(), window)
    }

    #[test]
    fn test_chinese_reference_single_match() {
        let refs = find(&["如圖 1 所示，結果很明顯"], &[cap(CaptionType::Figure, "1")], 200);
        assert_eq!(refs.len(), 1);
        let r = &refs[0];
        assert_eq!(r.reference_number, "1");
        assert_eq!(r.reference_type, ReferenceType::Figure);
        assert_eq!(r.text, "如圖 1");
        assert_eq!(r.context_window, "如圖 1 所示，結果很明顯");
        // short context, explicit cue
        assert!((r.confidence - 0.7).abs() < 1e-9);
    }

    #[test]
    fn test_unknown_number_rejected() {
        let refs = find(&["如表 7 所示"], &[cap(CaptionType::Table, "2")], 200);
        assert!(refs.is_empty());
        assert!(find(&["see Figure 1"], &[], 200).is_empty());
    }

    #[test]
    fn test_containment_both_directions() {
        let known = known_identifiers(&[cap(CaptionType::Figure, "2.1")]);
        assert!(known.contains("figure_2.1"));
        assert!(is_known("2.1", &known));
        // "2" is contained in "2.1"
        assert!(is_known("2", &known));
        // "figure_2.1" is contained in a longer reference number
        assert!(is_known("xfigure_2.1", &known));
        assert!(!is_known("3", &known));
    }

    #[test]
    fn test_english_references() {
        let refs = find(
            &["As shown in Figure 2, latency drops. Table 3 shows the totals."],
            &[cap(CaptionType::Figure, "2"), cap(CaptionType::Table, "3")],
            200,
        );
        let found: Vec<(&str, ReferenceType)> = refs
            .iter()
            .map(|r| (r.reference_number.as_str(), r.reference_type))
            .collect();
        assert_eq!(
            found,
            vec![("2", ReferenceType::Figure), ("3", ReferenceType::Table)]
        );
    }

    #[test]
    fn test_sub_number_reference() {
        let refs = find(&["詳見表 2-1 的統計"], &[cap(CaptionType::Table, "2.1")], 200);
        assert_eq!(refs.len(), 1);
        assert_eq!(refs[0].reference_number, "2.1");
        assert_eq!(refs[0].reference_type, ReferenceType::Table);
    }

    #[test]
    fn test_context_window_clamped_in_chars() {
        let text = format!("{}如圖 1{}", "前".repeat(40), "後".repeat(40));
        let refs = find(&[text.as_str()], &[cap(CaptionType::Figure, "1")], 50);
        assert_eq!(refs.len(), 1);
        let ctx = &refs[0].context_window;
        assert_eq!(ctx.chars().count(), 25 + "如圖 1".chars().count() + 25);
        assert!(ctx.starts_with('前') && ctx.ends_with('後'));
    }

    #[test]
    fn test_extract_context_bounds() {
        let text = "abcdefghij";
        assert_eq!(extract_context(text, 4, 6, 2), "cdefgh");
        assert_eq!(extract_context(text, 0, 2, 5), "abcdefg");
        assert_eq!(extract_context(text, 8, 10, 5), "defghij");
        assert_eq!(extract_context("  x  ", 2, 3, 10), "x");
    }

    #[test]
    fn test_long_context_gets_bonus() {
        // 30 characters each side
        let text = format!("{}見圖 1{}", "研究".repeat(30), "結果".repeat(30));
        let refs = find(&[text.as_str()], &[cap(CaptionType::Figure, "1")], 60);
        assert_eq!(refs.len(), 1);
        assert!((refs[0].confidence - 0.9).abs() < 1e-9);
    }

    #[test]
    fn test_cjk_paragraph_at_default_window_gets_bonus() {
        let text = format!("{}如圖 1 所示{}", "研究".repeat(50), "結果".repeat(50));
        let refs = find(&[text.as_str()], &[cap(CaptionType::Figure, "1")], 200);
        assert_eq!(refs.len(), 1);
        let ctx = &refs[0].context_window;
        assert_eq!(ctx.chars().count(), 100 + "如圖 1".chars().count() + 100);
        assert!(ctx.len() > 300);
        assert!((refs[0].confidence - 0.9).abs() < 1e-9);
    }

    #[test]
    fn test_reference_type_keywords() {
        assert_eq!(reference_type_of("see Fig. 3"), ReferenceType::Figure);
        assert_eq!(reference_type_of("下表 2"), ReferenceType::Table);
        assert_eq!(reference_type_of("see 3"), ReferenceType::General);
    }

    #[test]
    fn test_confidence_bounds() {
        let refs = find(
            &["如圖 1 所示", "見表 2 與圖 1 中的比較", "see figure 1 and in Table 2"],
            &[cap(CaptionType::Figure, "1"), cap(CaptionType::Table, "2")],
            60,
        );
        assert!(!refs.is_empty());
        assert!(refs.iter().all(|r| (0.0..=1.0).contains(&r.confidence)));
    }
}
