use std::io::Write;
use std::path::Path;

use capref_describe::{DescriptionRequest, DescriptionResult, UsageTotals};
use capref_matching::{CaptionContextPair, MatchError, MatchOutcome, PatternLibrary};
use capref_reporting::DocumentReport;
use owo_colors::OwoColorize;

/// Whether to use colored output.
#[derive(Debug, Clone, Copy)]
pub struct ColorMode(pub bool);

impl ColorMode {
    pub fn enabled(&self) -> bool {
        self.0
    }
}

const SNIPPET_CHARS: usize = 60;

fn snippet(text: &str) -> String {
    let flat: String = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if flat.chars().count() > SNIPPET_CHARS {
        let cut: String = flat.chars().take(SNIPPET_CHARS).collect();
        format!("{}...", cut)
    } else {
        flat
    }
}

fn pair_label(pair: &CaptionContextPair) -> String {
    format!("{} {}", pair.caption.caption_type, pair.caption.number)
}

/// Print a document that failed to load.
pub fn print_failure(
    w: &mut dyn Write,
    path: &Path,
    error: &MatchError,
    color: ColorMode,
) -> std::io::Result<()> {
    if color.enabled() {
        writeln!(w, "{} {}: {}", "ERROR:".red().bold(), path.display(), error)
    } else {
        writeln!(w, "ERROR: {}: {}", path.display(), error)
    }
}

/// Print the pairs of one document.
pub fn print_document(
    w: &mut dyn Write,
    report: &DocumentReport<'_>,
    outcome: &MatchOutcome,
    color: ColorMode,
) -> std::io::Result<()> {
    let header = format!(
        "{} captions, {} references, {} pairs ({} filtered) in {:.0?}",
        outcome.total_captions,
        outcome.total_references,
        outcome.pairs.len(),
        outcome.filtered_count,
        outcome.elapsed,
    );
    if color.enabled() {
        writeln!(w, "{}: {}", report.source.bold(), header)?;
    } else {
        writeln!(w, "{}: {}", report.source, header)?;
    }

    for (i, pair) in report.pairs.iter().enumerate() {
        let confidence = format!("{:.2}", pair.pairing_confidence);
        if color.enabled() {
            writeln!(
                w,
                "  {} {}  page {}  {}  {}",
                format!("[{}]", i + 1).bold().yellow(),
                pair_label(pair).cyan(),
                pair.caption.page,
                confidence.green(),
                snippet(&pair.caption.title),
            )?;
        } else {
            writeln!(
                w,
                "  [{}] {}  page {}  {}  {}",
                i + 1,
                pair_label(pair),
                pair.caption.page,
                confidence,
                snippet(&pair.caption.title),
            )?;
        }

        if pair.contexts.is_empty() {
            if color.enabled() {
                writeln!(w, "        {}", "(no references)".dimmed())?;
            } else {
                writeln!(w, "        (no references)")?;
            }
        }
        for r in &pair.contexts {
            let cite = format!("{} (page {}, {:.2})", r.text, r.page, r.confidence);
            if color.enabled() {
                writeln!(w, "        {}  {}", cite, snippet(&r.context_window).dimmed())?;
            } else {
                writeln!(w, "        {}  {}", cite, snippet(&r.context_window))?;
            }
        }
    }

    if !report.filtered_out.is_empty() {
        writeln!(w, "  Filtered out:")?;
        for pair in report.filtered_out {
            let line = format!(
                "  [-] {}  page {}  {:.2}  {}",
                pair_label(pair),
                pair.caption.page,
                pair.pairing_confidence,
                snippet(&pair.caption.title),
            );
            if color.enabled() {
                writeln!(w, "{}", line.dimmed())?;
            } else {
                writeln!(w, "{}", line)?;
            }
        }
    }
    writeln!(w)?;
    Ok(())
}

/// Print the totals of a batch run.
pub fn print_batch_summary(
    w: &mut dyn Write,
    outcomes: &[MatchOutcome],
    failures: usize,
    color: ColorMode,
) -> std::io::Result<()> {
    let pairs: usize = outcomes.iter().map(|o| o.pairs.len()).sum();
    let with_context: usize = outcomes
        .iter()
        .flat_map(|o| &o.pairs)
        .filter(|p| !p.contexts.is_empty())
        .count();
    let filtered: usize = outcomes.iter().map(|o| o.filtered_count).sum();

    writeln!(w, "{}", "=".repeat(60))?;
    if color.enabled() {
        writeln!(
            w,
            "{} {} documents | {} pairs | {} with references | {} filtered",
            "SUMMARY:".bold(),
            outcomes.len(),
            pairs.to_string().green(),
            with_context,
            filtered,
        )?;
        if failures > 0 {
            writeln!(w, "{}", format!("{} document(s) failed", failures).red())?;
        }
    } else {
        writeln!(
            w,
            "SUMMARY: {} documents | {} pairs | {} with references | {} filtered",
            outcomes.len(),
            pairs,
            with_context,
            filtered,
        )?;
        if failures > 0 {
            writeln!(w, "{} document(s) failed", failures)?;
        }
    }
    Ok(())
}

/// Print the compiled pattern library in application order.
pub fn print_patterns(
    w: &mut dyn Write,
    patterns: &PatternLibrary,
    color: ColorMode,
) -> std::io::Result<()> {
    let sections = [
        ("Caption patterns", patterns.caption_patterns()),
        ("Reference patterns", patterns.reference_patterns()),
    ];
    for (title, list) in sections {
        if color.enabled() {
            writeln!(w, "{} ({})", title.bold(), list.len())?;
        } else {
            writeln!(w, "{} ({})", title, list.len())?;
        }
        for (i, re) in list.iter().enumerate() {
            writeln!(w, "  {:>2}. {}", i + 1, re.as_str())?;
        }
        writeln!(w)?;
    }
    Ok(())
}

pub fn print_dry_run_header(
    w: &mut dyn Write,
    file_name: &str,
    pairs: usize,
    color: ColorMode,
) -> std::io::Result<()> {
    if color.enabled() {
        writeln!(
            w,
            "{} {} ({} pairs, offline provider)\n",
            "DRY RUN:".bold().cyan(),
            file_name.bold(),
            pairs
        )
    } else {
        writeln!(w, "DRY RUN: {} ({} pairs, offline provider)\n", file_name, pairs)
    }
}

/// Print one prompt and the provider's answer.
pub fn print_description(
    w: &mut dyn Write,
    index: usize,
    total: usize,
    request: &DescriptionRequest,
    prompt: &str,
    result: &DescriptionResult,
    color: ColorMode,
) -> std::io::Result<()> {
    let title = format!(
        "[{}/{}] {} {} (page {})",
        index + 1,
        total,
        request.type_label,
        request.caption_number,
        request.page
    );
    if color.enabled() {
        writeln!(w, "{}", title.bold().yellow())?;
    } else {
        writeln!(w, "{}", title)?;
    }

    writeln!(w, "  Prompt:")?;
    for line in prompt.lines() {
        if color.enabled() {
            writeln!(w, "    {}", line.dimmed())?;
        } else {
            writeln!(w, "    {}", line)?;
        }
    }

    if result.success {
        writeln!(w, "  Description: {}", result.description)?;
        if color.enabled() {
            writeln!(
                w,
                "  Confidence:  {}",
                format!("{:.1}", result.confidence).green()
            )?;
        } else {
            writeln!(w, "  Confidence:  {:.1}", result.confidence)?;
        }
    } else {
        let err = result.error.as_deref().unwrap_or("unknown error");
        if color.enabled() {
            writeln!(w, "  {}", format!("FAILED: {}", err).red())?;
        } else {
            writeln!(w, "  FAILED: {}", err)?;
        }
    }
    writeln!(w)?;
    Ok(())
}

pub fn print_usage(
    w: &mut dyn Write,
    provider: &str,
    totals: UsageTotals,
    color: ColorMode,
) -> std::io::Result<()> {
    let line = format!(
        "{}: {} requests, {} tokens ({:.1} per request)",
        provider,
        totals.requests,
        totals.total_tokens,
        totals.average()
    );
    if color.enabled() {
        writeln!(w, "{}", line.dimmed())
    } else {
        writeln!(w, "{}", line)
    }
}
