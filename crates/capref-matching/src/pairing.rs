use std::collections::HashMap;

use capref_core::{CaptionCandidate, CaptionContextPair, CaptionId, ReferenceMatch};

use crate::scoring::pairing_confidence;

pub const CAPTION_HEADER: &str = "圖表說明：";
pub const CONTEXT_HEADER: &str = "相關內文：";

/// Whether `reference` plausibly names `caption`: the same number, or the
/// same type with one number containing the other.
pub fn matches_caption(caption: &CaptionCandidate, reference: &ReferenceMatch) -> bool {
    if caption.number == reference.reference_number {
        return true;
    }
    caption.caption_type.agrees_with(reference.reference_type)
        && (reference.reference_number.contains(caption.number.as_str())
            || caption.number.contains(reference.reference_number.as_str()))
}

/// Prompt material for one caption: the title line, then the numbered
/// context windows under a header when there are any.
pub fn combined_text(title: &str, contexts: &[&ReferenceMatch]) -> String {
    let mut parts = vec![format!("{CAPTION_HEADER}{title}")];
    if !contexts.is_empty() {
        parts.push(CONTEXT_HEADER.to_string());
        parts.extend(
            contexts
                .iter()
                .enumerate()
                .map(|(i, r)| format!("{}. {}", i + 1, r.context_window)),
        );
    }
    parts.join("\n\n")
}

/// Build exactly one pair per caption, in caption order.
///
/// A reference may attach to several captions when their numbers contain
/// one another.
pub fn pair_captions(
    captions: &[CaptionCandidate],
    references: &[ReferenceMatch],
) -> Vec<CaptionContextPair> {
    let mut groups: HashMap<CaptionId, Vec<&ReferenceMatch>> = HashMap::new();
    for reference in references {
        for (idx, caption) in captions.iter().enumerate() {
            if matches_caption(caption, reference) {
                groups.entry(CaptionId(idx)).or_default().push(reference);
            }
        }
    }

    let pairs: Vec<CaptionContextPair> = captions
        .iter()
        .enumerate()
        .map(|(idx, caption)| {
            let id = CaptionId(idx);
            let contexts = groups.remove(&id).unwrap_or_default();
            CaptionContextPair {
                caption_id: id,
                caption: caption.clone(),
                combined_text: combined_text(&caption.title, &contexts),
                pairing_confidence: pairing_confidence(caption, &contexts),
                contexts: contexts.into_iter().cloned().collect(),
            }
        })
        .collect();

    tracing::debug!(
        pairs = pairs.len(),
        with_contexts = pairs.iter().filter(|p| !p.contexts.is_empty()).count(),
        "pairing complete"
    );
    pairs
}
