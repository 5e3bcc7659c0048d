use std::io::Write;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use anyhow::Context;
use capref_core::config_file::{self, ConfigFile, MatchingSection, OutputSection};
use capref_describe::{DescriptionGenerator, DescriptionProvider, DescriptionRequest, OfflineProvider};
use capref_ingest::JsonFragmentSource;
use capref_matching::config::{
    DEFAULT_CONFIDENCE_THRESHOLD, DEFAULT_CONTEXT_WINDOW, DEFAULT_MIN_CAPTION_LENGTH,
};
use capref_matching::{CaptionMatcher, MatchingConfigBuilder};
use capref_reporting::{DocumentReport, ExportFormat};
use clap::{Args, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod output;

use output::ColorMode;

/// Caption-Reference Matcher - Pair figure and table captions with the body text that cites them
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

/// Options shared by every command that builds a matcher.
#[derive(Args, Debug, Default)]
struct MatchingArgs {
    /// TOML config file (default: platform config overlaid by ./.capref.toml)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Characters of body text kept on each side of a reference
    #[arg(long)]
    context_window: Option<usize>,

    /// Minimum caption title length, in characters
    #[arg(long)]
    min_caption_length: Option<usize>,

    /// Minimum pairing confidence for a pair to be reported
    #[arg(long)]
    threshold: Option<f64>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Match captions and references in one or more fragment files (.json / .jsonl)
    Match {
        /// Fragment files to process
        #[arg(required = true)]
        files: Vec<PathBuf>,

        #[command(flatten)]
        matching: MatchingArgs,

        /// Keep pairs removed by the threshold or type filters in the output
        #[arg(long)]
        keep_filtered: bool,

        /// Output format: text, json or markdown
        #[arg(long)]
        format: Option<ExportFormat>,

        /// Write the report to a file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Disable colored output
        #[arg(long)]
        no_color: bool,
    },

    /// List the compiled caption and reference patterns
    Patterns {
        #[command(flatten)]
        matching: MatchingArgs,

        /// Disable colored output
        #[arg(long)]
        no_color: bool,
    },

    /// Dry run: build description prompts for every pair and answer them offline
    Prompts {
        /// Fragment file to process
        file_path: PathBuf,

        #[command(flatten)]
        matching: MatchingArgs,

        /// Path to output log file
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Disable colored output
        #[arg(long)]
        no_color: bool,
    },

    /// Show the effective configuration, or write a default config file
    Config {
        /// Write a default config to the platform config directory
        #[arg(long)]
        init: bool,
    },
}

fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Command::Match {
            files,
            matching,
            keep_filtered,
            format,
            output,
            no_color,
        } => run_match(files, matching, keep_filtered, format, output, no_color),
        Command::Patterns { matching, no_color } => list_patterns(matching, no_color),
        Command::Prompts {
            file_path,
            matching,
            output,
            no_color,
        } => dry_run_prompts(file_path, matching, output, no_color),
        Command::Config { init } => show_config(init),
    }
}

fn load_file_config(path: Option<&Path>) -> anyhow::Result<ConfigFile> {
    match path {
        Some(p) => config_file::load_from_path(p)
            .with_context(|| format!("Could not read config file {}", p.display())),
        None => Ok(config_file::load_config()),
    }
}

fn env_value<T: FromStr>(name: &str) -> Option<T> {
    std::env::var(name).ok().and_then(|v| v.trim().parse().ok())
}

/// Resolve configuration: CLI flags > env vars > config file > defaults.
fn build_matcher(
    args: &MatchingArgs,
    file: &ConfigFile,
    keep_filtered: bool,
) -> anyhow::Result<CaptionMatcher> {
    let mut builder = MatchingConfigBuilder::from_config_file(file);

    if let Some(n) = args
        .context_window
        .or_else(|| env_value("CAPREF_CONTEXT_WINDOW"))
    {
        builder = builder.context_window(n);
    }
    if let Some(n) = args
        .min_caption_length
        .or_else(|| env_value("CAPREF_MIN_CAPTION_LENGTH"))
    {
        builder = builder.min_caption_length(n);
    }
    if let Some(t) = args
        .threshold
        .or_else(|| env_value("CAPREF_CONFIDENCE_THRESHOLD"))
    {
        builder = builder.confidence_threshold(t);
    }
    if keep_filtered {
        builder = builder.retain_filtered(true);
    }

    let config = builder.build().context("Invalid matching configuration")?;
    Ok(CaptionMatcher::with_config(config))
}

fn open_writer(output: Option<&Path>) -> anyhow::Result<Box<dyn Write>> {
    Ok(match output {
        Some(path) => Box::new(
            std::fs::File::create(path)
                .with_context(|| format!("Could not create {}", path.display()))?,
        ),
        None => Box::new(std::io::stdout()),
    })
}

fn run_match(
    files: Vec<PathBuf>,
    args: MatchingArgs,
    keep_filtered: bool,
    format: Option<ExportFormat>,
    output: Option<PathBuf>,
    no_color: bool,
) -> anyhow::Result<()> {
    let file_config = load_file_config(args.config.as_deref())?;
    let matcher = build_matcher(&args, &file_config, keep_filtered)?;

    let format = match format {
        Some(f) => f,
        None => file_config
            .output
            .as_ref()
            .and_then(|o| o.format.as_deref())
            .map(ExportFormat::from_str)
            .transpose()
            .map_err(|e| anyhow::anyhow!("Invalid [output] format in config: {}", e))?
            .unwrap_or_default(),
    };

    for file in &files {
        if !file.exists() {
            anyhow::bail!("File not found: {}", file.display());
        }
    }

    let spinner = indicatif::ProgressBar::new_spinner();
    spinner.set_style(
        indicatif::ProgressStyle::with_template("{spinner:.cyan} {msg} [{elapsed}]")
            .unwrap_or_else(|_| indicatif::ProgressStyle::default_spinner()),
    );
    spinner.set_message(format!("Matching {} document(s)...", files.len()));
    spinner.enable_steady_tick(Duration::from_millis(120));
    let results = matcher.match_batch(&files, &JsonFragmentSource);
    spinner.finish_and_clear();

    let color = ColorMode(!no_color && output.is_none());
    let mut stderr = std::io::stderr();

    let mut names = Vec::new();
    let mut outcomes = Vec::new();
    let mut failures = 0usize;
    for (path, result) in results {
        match result {
            Ok(outcome) => {
                names.push(path.display().to_string());
                outcomes.push(outcome);
            }
            Err(e) => {
                failures += 1;
                output::print_failure(&mut stderr, &path, &e, color)?;
            }
        }
    }

    let reports: Vec<DocumentReport<'_>> = names
        .iter()
        .zip(&outcomes)
        .map(|(name, outcome)| DocumentReport {
            source: name,
            pairs: &outcome.pairs,
            filtered_out: &outcome.filtered_out,
            stats: outcome.stats(),
        })
        .collect();

    match (&output, format) {
        (Some(path), _) => {
            capref_reporting::export_to_path(&reports, format, path)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            eprintln!("Wrote {} report to {}", format, path.display());
        }
        (None, ExportFormat::Text) => {
            let mut stdout = std::io::stdout();
            for (report, outcome) in reports.iter().zip(&outcomes) {
                output::print_document(&mut stdout, report, outcome, color)?;
            }
            output::print_batch_summary(&mut stdout, &outcomes, failures, color)?;
        }
        (None, _) => {
            let content = match reports.as_slice() {
                [single] => capref_reporting::export_document(single, format)?,
                _ => capref_reporting::export_documents(&reports, format)?,
            };
            std::io::stdout().write_all(content.as_bytes())?;
        }
    }

    if failures > 0 {
        anyhow::bail!("{} of {} document(s) could not be matched", failures, files.len());
    }
    Ok(())
}

fn list_patterns(args: MatchingArgs, no_color: bool) -> anyhow::Result<()> {
    let file_config = load_file_config(args.config.as_deref())?;
    let matcher = build_matcher(&args, &file_config, false)?;
    let mut stdout = std::io::stdout();
    output::print_patterns(&mut stdout, matcher.patterns(), ColorMode(!no_color))?;
    Ok(())
}

fn dry_run_prompts(
    file_path: PathBuf,
    args: MatchingArgs,
    output: Option<PathBuf>,
    no_color: bool,
) -> anyhow::Result<()> {
    if !file_path.exists() {
        anyhow::bail!("File not found: {}", file_path.display());
    }

    let file_config = load_file_config(args.config.as_deref())?;
    let matcher = build_matcher(&args, &file_config, false)?;
    let color = ColorMode(!no_color && output.is_none());
    let mut writer = open_writer(output.as_deref())?;

    let outcome = matcher.match_document(&file_path, &JsonFragmentSource)?;
    let file_name = file_path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| file_path.display().to_string());

    output::print_dry_run_header(&mut writer, &file_name, outcome.pairs.len(), color)?;
    if outcome.pairs.is_empty() {
        writeln!(writer, "No captions to describe.")?;
        return Ok(());
    }

    let mut generator = DescriptionGenerator::new(OfflineProvider);
    let total = outcome.pairs.len();
    for (i, pair) in outcome.pairs.iter().enumerate() {
        let request = DescriptionRequest::from_pair(pair);
        let prompt = capref_describe::build_prompt(&request);
        let result = generator.describe(&request);
        output::print_description(&mut writer, i, total, &request, &prompt, &result, color)?;
    }

    output::print_usage(
        &mut writer,
        generator.provider().name(),
        generator.totals(),
        color,
    )?;
    Ok(())
}

fn default_config_file() -> ConfigFile {
    ConfigFile {
        matching: Some(MatchingSection {
            context_window: Some(DEFAULT_CONTEXT_WINDOW),
            min_caption_length: Some(DEFAULT_MIN_CAPTION_LENGTH),
            confidence_threshold: Some(DEFAULT_CONFIDENCE_THRESHOLD),
            include_figures: Some(true),
            include_tables: Some(true),
            include_charts: Some(true),
            retain_filtered: Some(false),
        }),
        patterns: None,
        output: Some(OutputSection {
            format: Some(ExportFormat::default().to_string()),
        }),
    }
}

fn show_config(init: bool) -> anyhow::Result<()> {
    let path = config_file::config_path();

    if init {
        if let Some(ref p) = path
            && p.exists()
        {
            anyhow::bail!("Config file already exists at {}", p.display());
        }
        let written = config_file::save_config(&default_config_file()).map_err(anyhow::Error::msg)?;
        println!("Wrote default config to {}", written.display());
        return Ok(());
    }

    match path {
        Some(p) if p.exists() => println!("# platform config: {}", p.display()),
        Some(p) => println!("# platform config: {} (not found)", p.display()),
        None => println!("# platform config: unavailable"),
    }
    if Path::new(".capref.toml").exists() {
        println!("# local override: .capref.toml");
    }
    let effective = config_file::load_config();
    print!("{}", toml::to_string_pretty(&effective)?);
    Ok(())
}
