use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// On-disk TOML configuration structure.
/// All fields are optional so partial configs work (merge with defaults).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConfigFile {
    pub matching: Option<MatchingSection>,
    pub patterns: Option<PatternsSection>,
    pub output: Option<OutputSection>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MatchingSection {
    pub context_window: Option<usize>,
    pub min_caption_length: Option<usize>,
    pub confidence_threshold: Option<f64>,
    pub include_figures: Option<bool>,
    pub include_tables: Option<bool>,
    pub include_charts: Option<bool>,
    pub retain_filtered: Option<bool>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PatternsSection {
    pub caption_extra: Option<Vec<String>>,
    pub reference_extra: Option<Vec<String>>,
    /// When true, the extra patterns replace the built-in lists instead of
    /// extending them.
    pub replace_builtin: Option<bool>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OutputSection {
    pub format: Option<String>,
}

/// Platform config directory path: `<config_dir>/capref/config.toml`.
pub fn config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("capref").join("config.toml"))
}

/// Load config by cascading CWD `.capref.toml` over platform config.
/// CWD values override platform values.
pub fn load_config() -> ConfigFile {
    let platform = config_path().and_then(|p| load_from_path(&p));
    let cwd = load_from_path(Path::new(".capref.toml"));

    match (platform, cwd) {
        (None, None) => ConfigFile::default(),
        (Some(p), None) => p,
        (None, Some(c)) => c,
        (Some(p), Some(c)) => merge(p, c),
    }
}

/// Load a config from a specific path. Returns `None` if the file doesn't
/// exist or can't be parsed.
pub fn load_from_path(path: &Path) -> Option<ConfigFile> {
    let content = std::fs::read_to_string(path).ok()?;
    toml::from_str(&content).ok()
}

fn pick<S, T>(base: &Option<S>, overlay: &Option<S>, get: impl Fn(&S) -> Option<T>) -> Option<T> {
    overlay
        .as_ref()
        .and_then(&get)
        .or_else(|| base.as_ref().and_then(&get))
}

/// Merge two configs: `overlay` values take precedence over `base`.
pub fn merge(base: ConfigFile, overlay: ConfigFile) -> ConfigFile {
    let (bm, om) = (&base.matching, &overlay.matching);
    let (bp, op) = (&base.patterns, &overlay.patterns);
    let (bo, oo) = (&base.output, &overlay.output);
    ConfigFile {
        matching: Some(MatchingSection {
            context_window: pick(bm, om, |m| m.context_window),
            min_caption_length: pick(bm, om, |m| m.min_caption_length),
            confidence_threshold: pick(bm, om, |m| m.confidence_threshold),
            include_figures: pick(bm, om, |m| m.include_figures),
            include_tables: pick(bm, om, |m| m.include_tables),
            include_charts: pick(bm, om, |m| m.include_charts),
            retain_filtered: pick(bm, om, |m| m.retain_filtered),
        }),
        patterns: Some(PatternsSection {
            caption_extra: pick(bp, op, |p| p.caption_extra.clone()),
            reference_extra: pick(bp, op, |p| p.reference_extra.clone()),
            replace_builtin: pick(bp, op, |p| p.replace_builtin),
        }),
        output: Some(OutputSection {
            format: pick(bo, oo, |o| o.format.clone()),
        }),
    }
}

/// Save the current config to the platform config directory.
pub fn save_config(config: &ConfigFile) -> Result<PathBuf, String> {
    let path = config_path().ok_or_else(|| "Could not determine config directory".to_string())?;
    save_to_path(config, &path)?;
    Ok(path)
}

/// Write a config to an explicit path, creating parent directories.
pub fn save_to_path(config: &ConfigFile, path: &Path) -> Result<(), String> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .map_err(|e| format!("Failed to create config directory: {}", e))?;
    }
    let content =
        toml::to_string_pretty(config).map_err(|e| format!("Failed to serialize config: {}", e))?;
    std::fs::write(path, content).map_err(|e| format!("Failed to write config: {}", e))
}
