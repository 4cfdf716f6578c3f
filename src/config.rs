//! Application configuration.
//!
//! Configuration is loaded from a TOML file at:
//! 1. `$INBOXSWEEP_CONFIG` (environment variable)
//! 2. `~/.config/inboxsweep/config.toml` (Linux)
//!    `~/Library/Application Support/inboxsweep/config.toml` (macOS)
//!    `%APPDATA%\inboxsweep\config.toml` (Windows)
//! 3. Built-in defaults

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::analysis::clusters::DEFAULT_MIN_CLUSTER_SIZE;
use crate::analysis::decay::DecayThresholds;
use crate::classify::{Categorizer, KeywordSets};
use crate::error::{Result, SweepError};
use crate::ingest::mbox::DEFAULT_PAGE_SIZE;
use crate::ingest::pipeline::{
    ScanOptions, DEFAULT_BATCH_SIZE, DEFAULT_MAX_RESULTS, DEFAULT_PROGRESS_EVERY,
};

/// Environment variable that overrides the config file location.
pub const CONFIG_ENV: &str = "INBOXSWEEP_CONFIG";

/// Top-level configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// General behavior settings.
    pub general: GeneralConfig,
    /// Ingestion tuning.
    pub scan: ScanConfig,
    /// Analyzer thresholds.
    pub analysis: AnalysisConfig,
    /// Extra categorizer phrases, added to the built-in lists.
    pub keywords: KeywordsConfig,
}

/// General behavior settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Log level: "error", "warn", "info", "debug", "trace".
    pub log_level: String,
    /// Override the directory holding the record snapshot and the log file.
    pub data_dir: Option<PathBuf>,
}

/// Ingestion tuning.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanConfig {
    /// Maximum number of messages listed per scan.
    pub max_results: usize,
    /// Records per store flush.
    pub batch_size: usize,
    /// Messages between progress updates.
    pub progress_every: usize,
    /// References per listing page.
    pub page_size: usize,
}

/// Analyzer thresholds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    pub decay: DecayThresholds,
    /// Smallest subject cluster that is reported.
    pub min_cluster_size: usize,
}

/// Extra keyword phrases (case-insensitive).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct KeywordsConfig {
    pub promotional: Vec<String>,
    pub social: Vec<String>,
    pub newsletter: Vec<String>,
}

// ── Default implementations ─────────────────────────────────────

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: "warn".to_string(),
            data_dir: None,
        }
    }
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            max_results: DEFAULT_MAX_RESULTS,
            batch_size: DEFAULT_BATCH_SIZE,
            progress_every: DEFAULT_PROGRESS_EVERY,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            decay: DecayThresholds::default(),
            min_cluster_size: DEFAULT_MIN_CLUSTER_SIZE,
        }
    }
}

// ── Derived components ──────────────────────────────────────────

impl Config {
    /// Reject values the pipeline and analyzers cannot work with.
    pub fn validate(&self) -> Result<()> {
        let scan = &self.scan;
        if scan.batch_size == 0 || scan.page_size == 0 || scan.progress_every == 0 {
            return Err(SweepError::Config(
                "scan.batch_size, scan.page_size and scan.progress_every must be positive".into(),
            ));
        }
        let decay = &self.analysis.decay;
        for (name, rate) in [
            ("spammer_open_rate", decay.spammer_open_rate),
            ("cold_open_rate", decay.cold_open_rate),
        ] {
            if !(0.0..=1.0).contains(&rate) {
                return Err(SweepError::Config(format!(
                    "analysis.decay.{name} must be between 0 and 1, got {rate}"
                )));
            }
        }
        if self.analysis.min_cluster_size == 0 {
            return Err(SweepError::Config(
                "analysis.min_cluster_size must be positive".into(),
            ));
        }
        Ok(())
    }

    /// Scan options, with `max_results` optionally overridden.
    pub fn scan_options(&self, max_results: Option<usize>) -> ScanOptions {
        ScanOptions {
            max_results: max_results.unwrap_or(self.scan.max_results),
            batch_size: self.scan.batch_size,
            progress_every: self.scan.progress_every,
        }
    }

    /// Built-in keyword lists plus the configured extras.
    pub fn keyword_sets(&self) -> KeywordSets {
        KeywordSets::default().extended(
            &self.keywords.promotional,
            &self.keywords.social,
            &self.keywords.newsletter,
        )
    }

    pub fn categorizer(&self) -> Categorizer {
        Categorizer::new(self.keyword_sets())
    }
}

// ── Load / save ─────────────────────────────────────────────────

/// Load configuration, searching standard locations.
///
/// Returns the default configuration if no file is found or on parse error.
pub fn load_config() -> Config {
    match config_file_path() {
        Some(path) if path.exists() => load_config_from(&path),
        _ => Config::default(),
    }
}

/// Load configuration from a specific file, falling back to defaults.
pub fn load_config_from(path: &Path) -> Config {
    match std::fs::read_to_string(path) {
        Ok(contents) => match toml::from_str::<Config>(&contents) {
            Ok(cfg) => {
                tracing::info!(path = %path.display(), "Loaded config");
                cfg
            }
            Err(e) => {
                tracing::warn!(
                    path = %path.display(),
                    error = %e,
                    "Failed to parse config, using defaults"
                );
                Config::default()
            }
        },
        Err(e) => {
            tracing::warn!(
                path = %path.display(),
                error = %e,
                "Failed to read config file, using defaults"
            );
            Config::default()
        }
    }
}

/// Save configuration to the standard location.
pub fn save_config(config: &Config) -> anyhow::Result<PathBuf> {
    let path = config_file_path()
        .ok_or_else(|| anyhow::anyhow!("Could not determine config file path"))?;
    save_config_to(config, &path)?;
    Ok(path)
}

/// Save configuration as pretty TOML to `path`.
pub fn save_config_to(config: &Config, path: &Path) -> anyhow::Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let contents = toml::to_string_pretty(config)?;
    std::fs::write(path, contents)?;
    tracing::info!(path = %path.display(), "Saved config");
    Ok(())
}

/// Determine the config file path (checking env var first, then standard dirs).
pub fn config_file_path() -> Option<PathBuf> {
    // 1. Environment variable override
    if let Ok(env_path) = std::env::var(CONFIG_ENV) {
        return Some(PathBuf::from(env_path));
    }

    // 2. Standard config directory
    dirs::config_dir().map(|d| d.join("inboxsweep").join("config.toml"))
}

/// Return the data directory for the snapshot and logs.
pub fn data_dir(config: &Config) -> PathBuf {
    if let Some(ref dir) = config.general.data_dir {
        return dir.clone();
    }
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("inboxsweep")
}

/// Return the default record snapshot path.
pub fn store_path(config: &Config) -> PathBuf {
    data_dir(config).join("records.snap")
}

/// Return the log file path.
pub fn log_file_path(config: &Config) -> PathBuf {
    data_dir(config).join("inboxsweep.log")
}
