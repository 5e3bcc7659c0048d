use std::io::Write;
use std::path::Path;

use capref_core::{CaptionContextPair, ReferenceMatch};
use capref_matching::PairingStats;

use crate::types::{DocumentReport, ExportFormat};

/// Render a single document. JSON output is one object.
pub fn export_document(
    report: &DocumentReport<'_>,
    format: ExportFormat,
) -> Result<String, serde_json::Error> {
    match format {
        ExportFormat::Json => serde_json::to_string_pretty(report).map(|mut s| {
            s.push('\n');
            s
        }),
        _ => export_documents(std::slice::from_ref(report), format),
    }
}

/// Render several documents. JSON output is an array of document objects.
pub fn export_documents(
    reports: &[DocumentReport<'_>],
    format: ExportFormat,
) -> Result<String, serde_json::Error> {
    Ok(match format {
        ExportFormat::Json => {
            let mut s = serde_json::to_string_pretty(reports)?;
            s.push('\n');
            s
        }
        ExportFormat::Markdown => export_markdown(reports),
        ExportFormat::Text => export_text(reports),
    })
}

/// Export the given documents to `path`.
pub fn export_to_path(
    reports: &[DocumentReport<'_>],
    format: ExportFormat,
    path: &Path,
) -> std::io::Result<()> {
    let content = match reports {
        [single] => export_document(single, format)?,
        _ => export_documents(reports, format)?,
    };
    let mut file = std::fs::File::create(path)?;
    file.write_all(content.as_bytes())?;
    Ok(())
}

fn one_line(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn avg_confidence(stats: &PairingStats) -> String {
    stats
        .confidence
        .map(|c| format!("{:.2}", c.avg))
        .unwrap_or_else(|| "-".to_string())
}

fn heading(pair: &CaptionContextPair) -> String {
    format!("{} {}", pair.caption.caption_type, pair.caption.number)
}

fn reference_summary(r: &ReferenceMatch) -> String {
    format!("\"{}\" (page {}, confidence {:.2})", r.text, r.page, r.confidence)
}

fn export_markdown(reports: &[DocumentReport<'_>]) -> String {
    let mut out = String::from("# Caption Matching Results\n\n");

    for report in reports {
        let s = &report.stats;
        out.push_str(&format!("## {}\n\n", report.source));
        out.push_str(&format!(
            "**{}** pairs | **{}** figures | **{}** tables | **{}** charts | **{}** pages | **{}** contexts | **{}** avg confidence\n\n",
            s.total_pairs,
            s.type_distribution.figure,
            s.type_distribution.table,
            s.type_distribution.chart,
            s.pages_covered.len(),
            s.total_contexts,
            avg_confidence(s),
        ));

        if report.pairs.is_empty() {
            out.push_str("_No captions matched._\n\n");
        }

        for pair in report.pairs {
            out.push_str(&format!(
                "### {}: {}\n\n",
                heading(pair),
                one_line(&pair.caption.title)
            ));
            out.push_str(&format!("- **Page:** {}\n", pair.caption.page));
            out.push_str(&format!(
                "- **Caption confidence:** {:.2}\n",
                pair.caption.confidence
            ));
            out.push_str(&format!(
                "- **Pairing confidence:** {:.2}\n\n",
                pair.pairing_confidence
            ));

            if pair.contexts.is_empty() {
                out.push_str("No references found in the body text.\n\n");
                continue;
            }
            for (i, r) in pair.contexts.iter().enumerate() {
                out.push_str(&format!("{}. {}\n\n", i + 1, reference_summary(r)));
                out.push_str(&format!("   > {}\n\n", one_line(&r.context_window)));
            }
        }

        if !report.filtered_out.is_empty() {
            out.push_str("### Filtered Out\n\n");
            for pair in report.filtered_out {
                out.push_str(&format!(
                    "- {}: {} (page {}, confidence {:.2})\n",
                    heading(pair),
                    one_line(&pair.caption.title),
                    pair.caption.page,
                    pair.pairing_confidence
                ));
            }
            out.push('\n');
        }
    }

    out
}

fn export_text(reports: &[DocumentReport<'_>]) -> String {
    let mut out = String::from("Caption Matching Results\n");
    out.push_str(&"=".repeat(60));
    out.push('\n');

    for report in reports {
        let s = &report.stats;
        out.push_str(&format!("\n{}\n", report.source));
        out.push_str(&"-".repeat(report.source.chars().count()));
        out.push('\n');
        out.push_str(&format!(
            "  {} pairs | {} figures | {} tables | {} charts | {} pages | {} contexts | avg confidence {}\n\n",
            s.total_pairs,
            s.type_distribution.figure,
            s.type_distribution.table,
            s.type_distribution.chart,
            s.pages_covered.len(),
            s.total_contexts,
            avg_confidence(s),
        ));

        for (i, pair) in report.pairs.iter().enumerate() {
            out.push_str(&format!(
                "  [{}] {} (page {}, confidence {:.2}) {}\n",
                i + 1,
                heading(pair),
                pair.caption.page,
                pair.pairing_confidence,
                one_line(&pair.caption.title),
            ));
            for r in &pair.contexts {
                out.push_str(&format!("       -> {}\n", reference_summary(r)));
                out.push_str(&format!("          {}\n", one_line(&r.context_window)));
            }
        }

        if !report.filtered_out.is_empty() {
            out.push_str(&format!("\n  Filtered out ({}):\n", report.filtered_out.len()));
            for pair in report.filtered_out {
                out.push_str(&format!(
                    "  [-] {} (page {}, confidence {:.2}) {}\n",
                    heading(pair),
                    pair.caption.page,
                    pair.pairing_confidence,
                    one_line(&pair.caption.title),
                ));
            }
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use capref_core::{BBox, CaptionCandidate, CaptionId, CaptionType, FontInfo, ReferenceType};

    use super::*;

    fn make_pair(number: &str, caption_type: CaptionType, contexts: usize) -> CaptionContextPair {
        let caption = CaptionCandidate {
            title: format!("系統架構 {number}"),
            page: 2,
            bbox: BBox::new(0.0, 0.0, 10.0, 10.0),
            caption_type,
            number: number.into(),
            confidence: 0.8,
            font: FontInfo::new("Arial", 12.0, true),
        };
        let contexts: Vec<ReferenceMatch> = (0..contexts)
            .map(|_| ReferenceMatch {
                text: format!("如圖 {number}"),
                page: 2,
                reference_type: ReferenceType::Figure,
                reference_number: number.into(),
                context_window: format!("整體流程\n如圖 {number} 所示"),
                bbox: BBox::default(),
                confidence: 0.7,
            })
            .collect();
        CaptionContextPair {
            caption_id: CaptionId(0),
            caption,
            contexts,
            combined_text: String::new(),
            pairing_confidence: 0.5,
        }
    }

    #[test]
    fn test_format_from_str() {
        assert_eq!("json".parse::<ExportFormat>(), Ok(ExportFormat::Json));
        assert_eq!("MD".parse::<ExportFormat>(), Ok(ExportFormat::Markdown));
        assert_eq!("txt".parse::<ExportFormat>(), Ok(ExportFormat::Text));
        assert!("html".parse::<ExportFormat>().is_err());
        for f in ExportFormat::all() {
            assert_eq!(f.as_str().parse::<ExportFormat>(), Ok(*f));
        }
    }

    #[test]
    fn test_json_single_document_shape() {
        let pairs = vec![make_pair("1", CaptionType::Figure, 1)];
        let report = DocumentReport::new("paper.json", &pairs);
        let json = export_document(&report, ExportFormat::Json).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();

        assert_eq!(value["source"], "paper.json");
        assert_eq!(value["stats"]["total_pairs"], 1);
        assert_eq!(value["stats"]["pages_covered"], serde_json::json!([2]));
        let pair = &value["pairs"][0];
        assert_eq!(pair["caption"]["caption_type"], "figure");
        assert_eq!(pair["caption"]["bbox"], serde_json::json!([0.0, 0.0, 10.0, 10.0]));
        assert_eq!(pair["contexts"][0]["text"], "如圖 1");
    }

    #[test]
    fn test_json_multiple_documents_is_array() {
        let a = vec![make_pair("1", CaptionType::Figure, 0)];
        let b: Vec<CaptionContextPair> = vec![];
        let reports = [DocumentReport::new("a.json", &a), DocumentReport::new("b.json", &b)];
        let json = export_documents(&reports, ExportFormat::Json).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value.as_array().map(|v| v.len()), Some(2));
        assert!(value[1]["stats"]["confidence"].is_null());
    }

    #[test]
    fn test_markdown_output() {
        let pairs = vec![
            make_pair("1", CaptionType::Figure, 1),
            make_pair("2", CaptionType::Table, 0),
        ];
        let md = export_document(&DocumentReport::new("paper.json", &pairs), ExportFormat::Markdown)
            .unwrap();
        assert!(md.starts_with("# Caption Matching Results\n\n## paper.json\n\n"));
        assert!(md.contains("**2** pairs | **1** figures | **1** tables | **0** charts"));
        assert!(md.contains("### figure 1: 系統架構 1\n"));
        assert!(md.contains("1. \"如圖 1\" (page 2, confidence 0.70)"));
        assert!(md.contains("   > 整體流程 如圖 1 所示\n"));
        assert!(md.contains("### table 2: 系統架構 2\n"));
        assert!(md.contains("No references found in the body text."));
    }

    #[test]
    fn test_markdown_empty_document() {
        let pairs: Vec<CaptionContextPair> = vec![];
        let md = export_document(&DocumentReport::new("empty.json", &pairs), ExportFormat::Markdown)
            .unwrap();
        assert!(md.contains("**-** avg confidence"));
        assert!(md.contains("_No captions matched._"));
    }

    #[test]
    fn test_filtered_pairs_listed_when_retained() {
        let pairs = vec![make_pair("1", CaptionType::Figure, 1)];
        let filtered = vec![make_pair("9", CaptionType::Table, 0)];
        let report = DocumentReport::new("paper.json", &pairs).with_filtered(&filtered);

        let md = export_document(&report, ExportFormat::Markdown).unwrap();
        assert!(md.contains("### Filtered Out\n\n- table 9: 系統架構 9 (page 2, confidence 0.50)\n"));
        let text = export_document(&report, ExportFormat::Text).unwrap();
        assert!(text.contains("  Filtered out (1):\n  [-] table 9"));
        let json: serde_json::Value =
            serde_json::from_str(&export_document(&report, ExportFormat::Json).unwrap()).unwrap();
        assert_eq!(json["filtered_out"][0]["caption"]["number"], "9");

        let plain = export_document(&DocumentReport::new("paper.json", &pairs), ExportFormat::Json).unwrap();
        assert!(!plain.contains("filtered_out"));
    }

    #[test]
    fn test_text_output() {
        let pairs = vec![make_pair("3.1", CaptionType::Chart, 2)];
        let text =
            export_document(&DocumentReport::new("報告.json", &pairs), ExportFormat::Text).unwrap();
        assert!(text.starts_with("Caption Matching Results\n"));
        assert!(text.contains("\n報告.json\n-------\n"));
        assert!(text.contains("  [1] chart 3.1 (page 2, confidence 0.50) 系統架構 3.1\n"));
        assert_eq!(text.matches("       -> \"如圖 3.1\"").count(), 2);
        assert!(text.contains("avg confidence 0.50"));
    }
}
