//! Heuristic confidence scores for captions, references and pairs.
//!
//! Each score starts from a base value, applies additive modifiers and is
//! clamped to `[0, 1]`. The reference context length is counted in
//! characters. The caption length modifier counts UTF-8 bytes of the trimmed
//! matched text, so a ten-character CJK caption such as `圖 1：測試圖片說明`
//! earns the length bonus and long CJK captions reach the penalty sooner.

use capref_core::{CaptionCandidate, FontInfo, ReferenceMatch};

// Caption and reference modifiers are whole tenths, summed as integers so
// that 0.5 + 0.2 + 0.1 is exactly 0.8.
const CAPTION_BASE_TENTHS: i32 = 5;
const REFERENCE_BASE_TENTHS: i32 = 5;
const UNREFERENCED_PAIRING: f64 = 0.3;

/// Phrases that make a reference explicit. Compared against the lowercased
/// matched phrase.
pub const CUE_PHRASES: &[&str] = &["如圖", "見圖", "see figure"];

/// Clamp a score to `[0, 1]`.
pub fn clamp01(score: f64) -> f64 {
    score.clamp(0.0, 1.0)
}

fn from_tenths(tenths: i32) -> f64 {
    clamp01(f64::from(tenths) / 10.0)
}

/// Confidence that `matched_text`, set in `font`, is a real caption.
pub fn caption_confidence(font: &FontInfo, matched_text: &str) -> f64 {
    let mut tenths = CAPTION_BASE_TENTHS;

    if font.font_size > 12.0 {
        tenths += 1;
    } else if font.font_size < 8.0 {
        tenths -= 1;
    }

    if font.is_bold {
        tenths += 2;
    }

    let len = matched_text.trim().len();
    if len > 10 && len < 100 {
        tenths += 1;
    } else if len > 200 {
        tenths -= 1;
    }

    from_tenths(tenths)
}

/// Confidence that `phrase` is a genuine reference given its surrounding text.
pub fn reference_confidence(phrase: &str, context_window: &str) -> f64 {
    let mut tenths = REFERENCE_BASE_TENTHS;

    let len = context_window.trim().chars().count();
    if len > 50 && len < 300 {
        tenths += 2;
    }

    if has_cue_phrase(phrase) {
        tenths += 2;
    }

    from_tenths(tenths)
}

pub fn has_cue_phrase(phrase: &str) -> bool {
    let lower = phrase.to_lowercase();
    CUE_PHRASES.iter().any(|cue| lower.contains(cue))
}

/// Confidence of a caption together with the references grouped under it.
pub fn pairing_confidence(caption: &CaptionCandidate, references: &[&ReferenceMatch]) -> f64 {
    if references.is_empty() {
        return UNREFERENCED_PAIRING;
    }

    let base = (4 + references.len()).min(8) as f64 / 10.0;
    let avg_ref = references.iter().map(|r| r.confidence).sum::<f64>() / references.len() as f64;

    clamp01((base + avg_ref + caption.confidence) / 3.0)
}

#[cfg(test)]
mod tests {
    use capref_core::{BBox, CaptionType, ReferenceType};

    use super::*;

    fn font(size: f64, bold: bool) -> FontInfo {
        FontInfo::new("Noto Sans CJK", size, bold)
    }

    fn caption(confidence: f64) -> CaptionCandidate {
        CaptionCandidate {
            title: "測試圖片說明".into(),
            page: 1,
            bbox: BBox::default(),
            caption_type: CaptionType::Figure,
            number: "1".into(),
            confidence,
            font: font(12.0, true),
        }
    }

    fn reference(confidence: f64) -> ReferenceMatch {
        ReferenceMatch {
            text: "如圖 1".into(),
            page: 1,
            reference_type: ReferenceType::Figure,
            reference_number: "1".into(),
            context_window: "如圖 1 所示".into(),
            bbox: BBox::default(),
            confidence,
        }
    }

    #[test]
    fn test_caption_base() {
        // 12pt is neither large nor small; "Fig 1" is too short for the length bonus
        assert!((caption_confidence(&font(12.0, false), "Fig 1") - 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_caption_font_modifiers() {
        let text = "Fig 1";
        assert!((caption_confidence(&font(14.0, false), text) - 0.6).abs() < 1e-9);
        assert!((caption_confidence(&font(6.0, false), text) - 0.4).abs() < 1e-9);
        assert!((caption_confidence(&font(12.0, true), text) - 0.7).abs() < 1e-9);
    }

    #[test]
    fn test_caption_length_modifiers() {
        let f = font(12.0, false);
        assert!((caption_confidence(&f, "Figure 1: overview") - 0.6).abs() < 1e-9);
        assert!((caption_confidence(&f, &"x".repeat(150)) - 0.5).abs() < 1e-9);
        assert!((caption_confidence(&f, &"x".repeat(250)) - 0.4).abs() < 1e-9);
    }

    #[test]
    fn test_caption_cjk_length_in_bytes() {
        // 10 characters, 26 bytes
        let c = caption_confidence(&font(12.0, true), "圖 1：測試圖片說明");
        assert!(c >= 0.8, "got {c}");
    }

    #[test]
    fn test_caption_long_cjk_measured_in_bytes() {
        let f = font(12.0, false);
        // 46 characters, 134 bytes: past the bonus range
        let title = "基於多層次注意力機制的深度學習模型在大規模中文文件理解任務上的整體架構與資料流程示意";
        let text = format!("圖 1：{title}");
        assert!((caption_confidence(&f, &text) - 0.5).abs() < 1e-9);
        // 74 characters, 218 bytes: penalized
        let text = format!("表 3：{}", "各".repeat(70));
        assert!((caption_confidence(&f, &text) - 0.4).abs() < 1e-9);
    }

    #[test]
    fn test_reference_context_counted_in_chars() {
        // 120 characters, 360 bytes
        let ctx = "研".repeat(120);
        assert!((reference_confidence("如圖 1", &ctx) - 0.9).abs() < 1e-9);
        // 40 characters, 120 bytes
        let ctx = "研".repeat(40);
        assert!((reference_confidence("如圖 1", &ctx) - 0.7).abs() < 1e-9);
        assert!((reference_confidence("如圖 1", &"研".repeat(300)) - 0.7).abs() < 1e-9);
    }

    #[test]
    fn test_caption_clamped() {
        assert!(caption_confidence(&font(20.0, true), "Figure 1: a clear title") <= 1.0);
        assert!(caption_confidence(&font(2.0, false), &"x".repeat(300)) >= 0.0);
    }

    #[test]
    fn test_reference_modifiers() {
        assert!((reference_confidence("Figure 1 shows", "short") - 0.5).abs() < 1e-9);
        assert!((reference_confidence("see Figure 1", "short") - 0.7).abs() < 1e-9);
        let long = "a".repeat(120);
        assert!((reference_confidence("Figure 1 shows", &long) - 0.7).abs() < 1e-9);
        assert!((reference_confidence("如圖 1", &long) - 0.9).abs() < 1e-9);
        assert!((reference_confidence("如圖 1", &"a".repeat(400)) - 0.7).abs() < 1e-9);
    }

    #[test]
    fn test_cue_phrase_case_insensitive() {
        assert!(has_cue_phrase("SEE FIGURE 3"));
        assert!(has_cue_phrase("見圖 2"));
        assert!(!has_cue_phrase("參見表 2"));
    }

    #[test]
    fn test_pairing_without_references() {
        assert!((pairing_confidence(&caption(0.9), &[]) - 0.3).abs() < 1e-9);
    }

    #[test]
    fn test_pairing_formula() {
        let r = reference(0.7);
        let c = pairing_confidence(&caption(0.8), &[&r]);
        assert!((c - (0.5 + 0.7 + 0.8) / 3.0).abs() < 1e-9, "got {c}");
    }

    #[test]
    fn test_pairing_base_caps_at_point_eight() {
        let refs: Vec<ReferenceMatch> = (0..6).map(|_| reference(1.0)).collect();
        let refs: Vec<&ReferenceMatch> = refs.iter().collect();
        let c = pairing_confidence(&caption(1.0), &refs);
        assert!((c - (0.8 + 1.0 + 1.0) / 3.0).abs() < 1e-9, "got {c}");
    }

    #[test]
    fn test_clamp01() {
        assert_eq!(clamp01(-0.2), 0.0);
        assert_eq!(clamp01(1.3), 1.0);
        assert_eq!(clamp01(0.42), 0.42);
    }
}
