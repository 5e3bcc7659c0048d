use capref_core::CaptionType;
use capref_core::config_file::ConfigFile;
use thiserror::Error;

pub const DEFAULT_CONTEXT_WINDOW: usize = 200;
pub const MIN_CONTEXT_WINDOW: usize = 50;
pub const DEFAULT_MIN_CAPTION_LENGTH: usize = 5;
pub const DEFAULT_CONFIDENCE_THRESHOLD: f64 = 0.3;

/// Controls how a list of patterns/values is overridden from its defaults.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum ListOverride<T> {
    /// Use the built-in defaults.
    #[default]
    Default,
    /// Completely replace the defaults with these values.
    Replace(Vec<T>),
    /// Append these values to the defaults.
    Extend(Vec<T>),
}

impl<T: Clone> ListOverride<T> {
    /// Resolve this override against the given defaults.
    pub fn resolve(&self, defaults: &[T]) -> Vec<T> {
        match self {
            ListOverride::Default => defaults.to_vec(),
            ListOverride::Replace(v) => v.clone(),
            ListOverride::Extend(v) => {
                let mut result = defaults.to_vec();
                result.extend(v.iter().cloned());
                result
            }
        }
    }

    fn push(&mut self, value: T) {
        match self {
            ListOverride::Extend(v) | ListOverride::Replace(v) => v.push(value),
            ListOverride::Default => *self = ListOverride::Extend(vec![value]),
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    #[error("confidence threshold must be a finite number in [0, 1], got {0}")]
    ThresholdOutOfRange(f64),
    #[error("context window must be at least 50 characters, got {0}")]
    ContextWindowTooSmall(usize),
    #[error("minimum caption length must be at least 1, got {0}")]
    MinCaptionLengthTooSmall(usize),
}

/// Validated configuration for the caption-reference matching pipeline.
///
/// Construct with [`MatchingConfigBuilder`]; `Default` yields the built-in
/// values, which are always valid.
#[derive(Debug, Clone, PartialEq)]
pub struct MatchingConfig {
    /// Characters of surrounding text kept around a reference (half on each side).
    pub(crate) context_window: usize,
    /// Minimum trimmed caption title length, in characters.
    pub(crate) min_caption_length: usize,
    /// Pairs scoring below this are filtered from the visible result.
    pub(crate) confidence_threshold: f64,
    pub(crate) include_figures: bool,
    pub(crate) include_tables: bool,
    pub(crate) include_charts: bool,
    /// Keep filtered pairs on the outcome instead of only counting them.
    pub(crate) retain_filtered: bool,
    /// Caption pattern sources, compiled by the pattern library.
    pub(crate) caption_patterns: ListOverride<String>,
    /// Reference pattern sources, compiled by the pattern library.
    pub(crate) reference_patterns: ListOverride<String>,
}

impl Default for MatchingConfig {
    fn default() -> Self {
        Self {
            context_window: DEFAULT_CONTEXT_WINDOW,
            min_caption_length: DEFAULT_MIN_CAPTION_LENGTH,
            confidence_threshold: DEFAULT_CONFIDENCE_THRESHOLD,
            include_figures: true,
            include_tables: true,
            include_charts: true,
            retain_filtered: false,
            caption_patterns: ListOverride::Default,
            reference_patterns: ListOverride::Default,
        }
    }
}

impl MatchingConfig {
    pub fn context_window(&self) -> usize {
        self.context_window
    }

    pub fn min_caption_length(&self) -> usize {
        self.min_caption_length
    }

    pub fn confidence_threshold(&self) -> f64 {
        self.confidence_threshold
    }

    pub fn retain_filtered(&self) -> bool {
        self.retain_filtered
    }

    pub fn caption_patterns(&self) -> &ListOverride<String> {
        &self.caption_patterns
    }

    pub fn reference_patterns(&self) -> &ListOverride<String> {
        &self.reference_patterns
    }

    /// Whether pairs whose caption has this type survive the output filter.
    pub fn includes(&self, caption_type: CaptionType) -> bool {
        match caption_type {
            CaptionType::Figure => self.include_figures,
            CaptionType::Table => self.include_tables,
            CaptionType::Chart => self.include_charts,
        }
    }
}

/// Builder for [`MatchingConfig`].
///
/// Scalars are validated in [`build()`](Self::build). Pattern strings are not
/// compiled here: a pattern that fails to compile is skipped by the pattern
/// library rather than rejecting the whole configuration.
#[derive(Debug, Clone, Default)]
pub struct MatchingConfigBuilder {
    context_window: Option<usize>,
    min_caption_length: Option<usize>,
    confidence_threshold: Option<f64>,
    include_figures: Option<bool>,
    include_tables: Option<bool>,
    include_charts: Option<bool>,
    retain_filtered: Option<bool>,
    caption_patterns: ListOverride<String>,
    reference_patterns: ListOverride<String>,
}

impl MatchingConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed the builder from a loaded config file. Later builder calls win.
    pub fn from_config_file(file: &ConfigFile) -> Self {
        let mut builder = Self::new();
        if let Some(m) = &file.matching {
            builder.context_window = m.context_window;
            builder.min_caption_length = m.min_caption_length;
            builder.confidence_threshold = m.confidence_threshold;
            builder.include_figures = m.include_figures;
            builder.include_tables = m.include_tables;
            builder.include_charts = m.include_charts;
            builder.retain_filtered = m.retain_filtered;
        }
        if let Some(p) = &file.patterns {
            let replace = p.replace_builtin.unwrap_or(false);
            let wrap = |v: &Vec<String>| {
                if replace {
                    ListOverride::Replace(v.clone())
                } else {
                    ListOverride::Extend(v.clone())
                }
            };
            if let Some(v) = &p.caption_extra {
                builder.caption_patterns = wrap(v);
            }
            if let Some(v) = &p.reference_extra {
                builder.reference_patterns = wrap(v);
            }
        }
        builder
    }

    // ── Scalars ──

    pub fn context_window(mut self, chars: usize) -> Self {
        self.context_window = Some(chars);
        self
    }

    pub fn min_caption_length(mut self, chars: usize) -> Self {
        self.min_caption_length = Some(chars);
        self
    }

    pub fn confidence_threshold(mut self, threshold: f64) -> Self {
        self.confidence_threshold = Some(threshold);
        self
    }

    pub fn retain_filtered(mut self, retain: bool) -> Self {
        self.retain_filtered = Some(retain);
        self
    }

    // ── Type filters ──

    pub fn include_figures(mut self, include: bool) -> Self {
        self.include_figures = Some(include);
        self
    }

    pub fn include_tables(mut self, include: bool) -> Self {
        self.include_tables = Some(include);
        self
    }

    pub fn include_charts(mut self, include: bool) -> Self {
        self.include_charts = Some(include);
        self
    }

    // ── Caption patterns ──

    pub fn set_caption_patterns(mut self, patterns: Vec<String>) -> Self {
        self.caption_patterns = ListOverride::Replace(patterns);
        self
    }

    pub fn add_caption_pattern(mut self, pattern: impl Into<String>) -> Self {
        self.caption_patterns.push(pattern.into());
        self
    }

    // ── Reference patterns ──

    pub fn set_reference_patterns(mut self, patterns: Vec<String>) -> Self {
        self.reference_patterns = ListOverride::Replace(patterns);
        self
    }

    pub fn add_reference_pattern(mut self, pattern: impl Into<String>) -> Self {
        self.reference_patterns.push(pattern.into());
        self
    }

    /// Validate scalars and produce a [`MatchingConfig`].
    pub fn build(self) -> Result<MatchingConfig, ConfigError> {
        let context_window = self.context_window.unwrap_or(DEFAULT_CONTEXT_WINDOW);
        if context_window < MIN_CONTEXT_WINDOW {
            return Err(ConfigError::ContextWindowTooSmall(context_window));
        }

        let min_caption_length = self
            .min_caption_length
            .unwrap_or(DEFAULT_MIN_CAPTION_LENGTH);
        if min_caption_length < 1 {
            return Err(ConfigError::MinCaptionLengthTooSmall(min_caption_length));
        }

        let confidence_threshold = self
            .confidence_threshold
            .unwrap_or(DEFAULT_CONFIDENCE_THRESHOLD);
        if !confidence_threshold.is_finite() || !(0.0..=1.0).contains(&confidence_threshold) {
            return Err(ConfigError::ThresholdOutOfRange(confidence_threshold));
        }

        Ok(MatchingConfig {
            context_window,
            min_caption_length,
            confidence_threshold,
            include_figures: self.include_figures.unwrap_or(true),
            include_tables: self.include_tables.unwrap_or(true),
            include_charts: self.include_charts.unwrap_or(true),
            retain_filtered: self.retain_filtered.unwrap_or(false),
            caption_patterns: self.caption_patterns,
            reference_patterns: self.reference_patterns,
        })
    }
}
