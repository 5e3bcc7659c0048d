use std::path::Path;

use capref_core::{FragmentRecord, FragmentSource, SourceError, TextFragment};
use serde::Deserialize;

// Re-export domain types for convenience
pub use capref_core::{BBox, FontInfo};

/// Reads fragment sequences that an upstream extractor serialized as JSON.
///
/// Dispatches on file extension:
/// - `.jsonl` / `.ndjson` → one fragment object per non-empty line
/// - anything else → a JSON array of fragments, or `{"fragments": [...]}`
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonFragmentSource;

impl FragmentSource for JsonFragmentSource {
    fn extract_fragments(&self, path: &Path) -> Result<Vec<TextFragment>, SourceError> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| SourceError::Open(format!("{}: {}", path.display(), e)))?;

        let fragments = if is_jsonl_path(path) {
            parse_jsonl(&content)?
        } else {
            parse_json(&content)?
        };

        tracing::debug!(path = %path.display(), fragments = fragments.len(), "loaded fragments");
        Ok(fragments)
    }
}

/// Extract fragments from a `.json` / `.jsonl` file.
pub fn extract_fragments(path: &Path) -> Result<Vec<TextFragment>, SourceError> {
    JsonFragmentSource.extract_fragments(path)
}

/// Check if a path looks like a JSON Lines file.
pub fn is_jsonl_path(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| e.eq_ignore_ascii_case("jsonl") || e.eq_ignore_ascii_case("ndjson"))
        .unwrap_or(false)
}

#[derive(Deserialize)]
#[serde(untagged)]
enum JsonDocument {
    List(Vec<serde_json::Value>),
    Wrapped { fragments: Vec<serde_json::Value> },
}

/// Parse a JSON array of fragments, or an object with a `fragments` array.
pub fn parse_json(content: &str) -> Result<Vec<TextFragment>, SourceError> {
    let doc: JsonDocument = serde_json::from_str(content).map_err(|e| {
        SourceError::Decode(format!(
            "expected an array of fragments or an object with a \"fragments\" array: {e}"
        ))
    })?;
    let values = match doc {
        JsonDocument::List(v) | JsonDocument::Wrapped { fragments: v } => v,
    };

    values
        .into_iter()
        .enumerate()
        .map(|(i, value)| {
            let location = format!("fragment {i}");
            let record: FragmentRecord = serde_json::from_value(value)
                .map_err(|e| SourceError::Decode(format!("{location}: {e}")))?;
            validate(record, location)
        })
        .collect()
}

/// Parse JSON Lines: one fragment object per non-empty line.
pub fn parse_jsonl(content: &str) -> Result<Vec<TextFragment>, SourceError> {
    content
        .lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(i, line)| {
            let location = format!("line {}", i + 1);
            let record: FragmentRecord = serde_json::from_str(line)
                .map_err(|e| SourceError::Decode(format!("{location}: {e}")))?;
            validate(record, location)
        })
        .collect()
}

fn validate(record: FragmentRecord, location: String) -> Result<TextFragment, SourceError> {
    TextFragment::try_from(record).map_err(|source| SourceError::InvalidFragment { location, source })
}

#[cfg(test)]
mod tests {
    use capref_core::FragmentError;

    use super::*;

    #[test]
    fn test_is_jsonl_path() {
        assert!(is_jsonl_path(Path::new("paper.jsonl")));
        assert!(is_jsonl_path(Path::new("paper.NDJSON")));
        assert!(!is_jsonl_path(Path::new("paper.json")));
        assert!(!is_jsonl_path(Path::new("paper")));
    }

    #[test]
    fn test_parse_json_array() {
        let json = r#"[
            {"text": "圖 1：系統架構", "page": 1, "bbox": [0, 0, 10, 10], "font_size": 12, "font_name": "Arial", "is_bold": true},
            {"text": "如圖 1 所示", "page": 1}
        ]"#;
        let frags = parse_json(json).unwrap();
        assert_eq!(frags.len(), 2);
        assert!(frags[0].font.is_bold);
        assert_eq!(frags[1].font.font_size, 0.0);
    }

    #[test]
    fn test_parse_json_wrapped() {
        let json = r#"{"source": "paper.pdf", "fragments": [{"text": "x", "page": 3}]}"#;
        let frags = parse_json(json).unwrap();
        assert_eq!(frags.len(), 1);
        assert_eq!(frags[0].page, 3);
    }

    #[test]
    fn test_parse_json_not_a_list() {
        let err = parse_json(r#"{"text": "x"}"#).unwrap_err();
        assert!(matches!(err, SourceError::Decode(_)));
    }

    #[test]
    fn test_parse_json_reports_index() {
        let json = r#"[{"text": "ok", "page": 1}, {"text": "bad", "page": 0}]"#;
        match parse_json(json).unwrap_err() {
            SourceError::InvalidFragment { location, source } => {
                assert_eq!(location, "fragment 1");
                assert_eq!(source, FragmentError::InvalidPage(0));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_parse_jsonl_skips_blank_lines_and_reports_line() {
        let content = "{\"text\": \"a\", \"page\": 1}\n\n{\"text\": \"b\", \"page\": 2}\n";
        assert_eq!(parse_jsonl(content).unwrap().len(), 2);

        let content = "{\"text\": \"a\", \"page\": 1}\n{\"text\": \"b\"}\n";
        match parse_jsonl(content).unwrap_err() {
            SourceError::Decode(msg) => assert!(msg.starts_with("line 2:"), "{msg}"),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_negative_font_size_rejected() {
        let content = r#"{"text": "a", "page": 1, "font_size": -3.0}"#;
        assert!(matches!(
            parse_jsonl(content),
            Err(SourceError::InvalidFragment { .. })
        ));
    }
}
