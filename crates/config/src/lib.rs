//! Configuration loading, validation, and management for pacmon.
//!
//! Loads configuration from `~/.pacmon/config.toml` with environment
//! variable overrides. Validates all settings at startup.

use pacmon_core::{DetailLevel, Dimension, ProgramEntry, ProgramRegistry, YearRange};
use pacmon_core::program::OPTION_SEPARATOR;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// The root configuration structure.
///
/// Maps directly to `~/.pacmon/config.toml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Upstream data provider
    #[serde(default)]
    pub provider: ProviderConfig,

    /// Accepted fiscal years
    #[serde(default)]
    pub years: YearsConfig,

    /// Fetch cache policy
    #[serde(default)]
    pub cache: CacheConfig,

    /// Fetch and aggregation settings
    #[serde(default)]
    pub pipeline: PipelineConfig,

    /// Registered budget actions (code + description)
    #[serde(default = "default_programs")]
    pub programs: Vec<ProgramEntry>,
}

fn default_programs() -> Vec<ProgramEntry> {
    ProgramRegistry::navy_strategic().iter().cloned().collect()
}

fn default_true() -> bool {
    true
}

/// Which provider implementation to build.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderKind {
    /// The public SIOP SPARQL endpoint
    #[default]
    Siop,
    /// Rows loaded from a local JSON file
    Fixture,
}

impl std::fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Siop => f.write_str("siop"),
            Self::Fixture => f.write_str("fixture"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    #[serde(default)]
    pub kind: ProviderKind,

    #[serde(default = "default_endpoint")]
    pub endpoint: String,

    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Relax TLS certificate validation (the SIOP chain is often incomplete)
    #[serde(default = "default_true")]
    pub accept_invalid_certs: bool,

    #[serde(default = "default_true")]
    pub include_descriptions: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fixture_path: Option<PathBuf>,
}

fn default_endpoint() -> String {
    "https://www1.siop.planejamento.gov.br/sparql/".into()
}
fn default_timeout_secs() -> u64 {
    60
}

impl ProviderConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            kind: ProviderKind::default(),
            endpoint: default_endpoint(),
            timeout_secs: default_timeout_secs(),
            accept_invalid_certs: true,
            include_descriptions: true,
            fixture_path: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct YearsConfig {
    #[serde(default = "default_min_year")]
    pub min: i32,

    #[serde(default = "default_max_year")]
    pub max: i32,

    #[serde(default = "default_year")]
    pub default: i32,
}

fn default_min_year() -> i32 {
    YearRange::default().min
}
fn default_max_year() -> i32 {
    YearRange::default().max
}
fn default_year() -> i32 {
    2024
}

impl Default for YearsConfig {
    fn default() -> Self {
        Self {
            min: default_min_year(),
            max: default_max_year(),
            default: default_year(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Entry lifetime; absent means entries live for the whole session
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ttl_secs: Option<u64>,

    /// Memoize failed fetches as empty results
    #[serde(default = "default_true")]
    pub cache_failures: bool,
}

impl CacheConfig {
    pub fn ttl(&self) -> Option<Duration> {
        self.ttl_secs.map(Duration::from_secs)
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl_secs: None,
            cache_failures: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// 1 reproduces the sequential reference behaviour
    #[serde(default = "default_max_concurrent_fetches")]
    pub max_concurrent_fetches: usize,

    /// Group limit for the funding-source and executing-unit breakdowns
    #[serde(default = "default_top_n")]
    pub top_n: usize,

    /// Breakdowns requested from the provider
    #[serde(default = "default_detail")]
    pub detail: Vec<Dimension>,
}

fn default_max_concurrent_fetches() -> usize {
    1
}
fn default_top_n() -> usize {
    10
}
fn default_detail() -> Vec<Dimension> {
    Dimension::ALL.to_vec()
}

impl PipelineConfig {
    pub fn detail_level(&self) -> DetailLevel {
        self.detail.iter().copied().collect()
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            max_concurrent_fetches: default_max_concurrent_fetches(),
            top_n: default_top_n(),
            detail: default_detail(),
        }
    }
}

impl AppConfig {
    /// Load configuration from the default path (~/.pacmon/config.toml).
    ///
    /// Environment variables override the file:
    /// - `PACMON_ENDPOINT`
    /// - `PACMON_TIMEOUT_SECS`
    /// - `PACMON_YEAR`
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = Self::config_dir().join("config.toml");
        let mut config = Self::load_from(&config_path)?;
        config.apply_env_overrides(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    /// Load configuration from a specific file path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::info!("No config file found at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let config: Self = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Apply overrides from an environment lookup, then re-validate.
    pub fn apply_env_overrides<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(endpoint) = lookup("PACMON_ENDPOINT") {
            self.provider.endpoint = endpoint;
        }

        if let Some(raw) = lookup("PACMON_TIMEOUT_SECS") {
            self.provider.timeout_secs = raw.trim().parse().map_err(|_| {
                ConfigError::ValidationError(format!("PACMON_TIMEOUT_SECS is not a number: {raw}"))
            })?;
        }

        if let Some(raw) = lookup("PACMON_YEAR") {
            self.years.default = raw.trim().parse().map_err(|_| {
                ConfigError::ValidationError(format!("PACMON_YEAR is not a year: {raw}"))
            })?;
        }

        self.validate()
    }

    /// Get the configuration directory path.
    pub fn config_dir() -> PathBuf {
        dirs_home().join(".pacmon")
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.years.min > self.years.max {
            return Err(ConfigError::ValidationError(
                "years.min must not exceed years.max".into(),
            ));
        }

        if !self.year_range().contains(self.years.default) {
            return Err(ConfigError::ValidationError(format!(
                "years.default ({}) must lie within {}-{}",
                self.years.default, self.years.min, self.years.max
            )));
        }

        if self.programs.is_empty() {
            return Err(ConfigError::ValidationError(
                "at least one [[programs]] entry is required".into(),
            ));
        }

        let mut seen = HashSet::new();
        for program in &self.programs {
            let code = program.code.as_str();
            if code.is_empty() {
                return Err(ConfigError::ValidationError("program code must not be empty".into()));
            }
            if code.contains(OPTION_SEPARATOR) {
                return Err(ConfigError::ValidationError(format!(
                    "program code '{code}' must not contain the '{OPTION_SEPARATOR}' separator"
                )));
            }
            if !seen.insert(code) {
                return Err(ConfigError::ValidationError(format!(
                    "program code '{code}' is registered twice"
                )));
            }
        }

        if self.pipeline.top_n == 0 {
            return Err(ConfigError::ValidationError("pipeline.top_n must be > 0".into()));
        }

        if self.pipeline.max_concurrent_fetches == 0 {
            return Err(ConfigError::ValidationError(
                "pipeline.max_concurrent_fetches must be > 0".into(),
            ));
        }

        if self.provider.timeout_secs == 0 {
            return Err(ConfigError::ValidationError(
                "provider.timeout_secs must be > 0".into(),
            ));
        }

        if self.provider.kind == ProviderKind::Fixture && self.provider.fixture_path.is_none() {
            return Err(ConfigError::ValidationError(
                "provider.fixture_path is required when provider.kind = \"fixture\"".into(),
            ));
        }

        Ok(())
    }

    pub fn year_range(&self) -> YearRange {
        YearRange::new(self.years.min, self.years.max)
    }

    /// The program registry described by `[[programs]]`.
    pub fn registry(&self) -> ProgramRegistry {
        ProgramRegistry::new(self.programs.iter().cloned())
    }

    /// Generate a default config TOML string (for the `init` command).
    pub fn default_toml() -> String {
        let config = Self::default();
        toml::to_string_pretty(&config).unwrap_or_default()
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            provider: ProviderConfig::default(),
            years: YearsConfig::default(),
            cache: CacheConfig::default(),
            pipeline: PipelineConfig::default(),
            programs: default_programs(),
        }
    }
}

/// Get the user's home directory.
fn dirs_home() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        std::env::var("USERPROFILE")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("C:\\Users\\Default"))
    }
    #[cfg(not(target_os = "windows"))]
    {
        std::env::var("HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("/tmp"))
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file at {path}: {reason}")]
    ReadError { path: PathBuf, reason: String },

    #[error("Failed to parse config file at {path}: {reason}")]
    ParseError { path: PathBuf, reason: String },

    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}
