//! Configuration management with TOML, environment variables, and CLI overrides.

use crate::amazon::details::DetailMode;
use crate::amazon::regions::Region;
use crate::pricing::BandMultipliers;
use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use tracing::debug;

/// Application configuration with layered loading.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Amazon marketplace
    #[serde(default)]
    pub region: Region,

    /// Proxy URL (e.g., socks5://host:port)
    #[serde(default)]
    pub proxy: Option<String>,

    /// Base delay between products in milliseconds
    #[serde(default = "default_delay_ms")]
    pub delay_ms: u64,

    /// Random jitter added to delay (0 to this value)
    #[serde(default = "default_delay_jitter_ms")]
    pub delay_jitter_ms: u64,

    /// Output format
    #[serde(default)]
    pub format: OutputFormat,

    /// Lower price band multiplier
    #[serde(default = "default_lower_multiplier")]
    pub lower_multiplier: f64,

    /// Upper price band multiplier
    #[serde(default = "default_upper_multiplier")]
    pub upper_multiplier: f64,

    /// Wait for the product and panel containers
    #[serde(default = "default_container_timeout_ms")]
    pub container_timeout_ms: u64,

    /// Wait for the "New" filter to apply
    #[serde(default = "default_filter_timeout_ms")]
    pub filter_timeout_ms: u64,

    /// Pause after each filter click
    #[serde(default = "default_settle_ms")]
    pub settle_ms: u64,

    /// Page rendering backend
    #[serde(default)]
    pub backend: Backend,

    /// Run the browser without a window
    #[serde(default = "default_headless")]
    pub headless: bool,

    /// Retries of a failed product page load (details and images)
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// First retry pause, doubled on every further attempt
    #[serde(default = "default_retry_delay_ms")]
    pub retry_delay_ms: u64,

    /// Extra fields read by the details command
    #[serde(default)]
    pub detail_mode: DetailMode,
}

fn default_delay_ms() -> u64 {
    2000
}

fn default_delay_jitter_ms() -> u64 {
    1000
}

fn default_lower_multiplier() -> f64 {
    0.85
}

fn default_upper_multiplier() -> f64 {
    1.15
}

fn default_container_timeout_ms() -> u64 {
    15_000
}

fn default_filter_timeout_ms() -> u64 {
    10_000
}

fn default_settle_ms() -> u64 {
    1000
}

fn default_headless() -> bool {
    true
}

fn default_max_retries() -> u32 {
    3
}

fn default_retry_delay_ms() -> u64 {
    5000
}

impl Default for Config {
    fn default() -> Self {
        Self {
            region: Region::default(),
            proxy: None,
            delay_ms: default_delay_ms(),
            delay_jitter_ms: default_delay_jitter_ms(),
            format: OutputFormat::Table,
            lower_multiplier: default_lower_multiplier(),
            upper_multiplier: default_upper_multiplier(),
            container_timeout_ms: default_container_timeout_ms(),
            filter_timeout_ms: default_filter_timeout_ms(),
            settle_ms: default_settle_ms(),
            backend: Backend::default(),
            headless: default_headless(),
            max_retries: default_max_retries(),
            retry_delay_ms: default_retry_delay_ms(),
            detail_mode: DetailMode::default(),
        }
    }
}

impl Config {
    /// Creates a new default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads configuration from a TOML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        debug!("Loading config from: {}", path.display());

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    /// Loads configuration with fallback to default locations.
    pub fn load(explicit_path: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit_path {
            return Self::from_file(path);
        }

        let local_config = Path::new("config.toml");
        if local_config.exists() {
            debug!("Found config.toml in current directory");
            return Self::from_file(local_config);
        }

        if let Some(config_dir) = dirs::config_dir() {
            let xdg_config = config_dir.join("amz-offers").join("config.toml");
            if xdg_config.exists() {
                debug!("Found config in XDG config directory");
                return Self::from_file(xdg_config);
            }
        }

        debug!("No config file found, using defaults");
        Ok(Self::default())
    }

    /// Applies environment variable overrides. Unparsable values are ignored.
    pub fn with_env(mut self) -> Self {
        if let Some(region) = env_parsed("AMZ_REGION") {
            self.region = region;
        }
        if let Ok(proxy) = std::env::var("AMZ_PROXY") {
            self.proxy = Some(proxy);
        }
        if let Some(delay) = env_parsed("AMZ_DELAY") {
            self.delay_ms = delay;
        }
        if let Some(lower) = env_parsed("AMZ_LOWER") {
            self.lower_multiplier = lower;
        }
        if let Some(upper) = env_parsed("AMZ_UPPER") {
            self.upper_multiplier = upper;
        }
        if let Some(retries) = env_parsed("AMZ_RETRIES") {
            self.max_retries = retries;
        }

        self
    }

    /// Rejects settings the price band cannot work with.
    pub fn validate(&self) -> Result<()> {
        let (lower, upper) = (self.lower_multiplier, self.upper_multiplier);
        if !(lower.is_finite() && lower > 0.0) || !(upper.is_finite() && upper > 0.0) {
            bail!("Band multipliers must be positive, got lower={} upper={}", lower, upper);
        }
        if lower > upper {
            bail!("Lower band multiplier {} exceeds upper multiplier {}", lower, upper);
        }
        Ok(())
    }

    pub fn band(&self) -> BandMultipliers {
        BandMultipliers::new(self.lower_multiplier, self.upper_multiplier)
    }

    pub fn container_timeout(&self) -> Duration {
        Duration::from_millis(self.container_timeout_ms)
    }

    pub fn filter_timeout(&self) -> Duration {
        Duration::from_millis(self.filter_timeout_ms)
    }

    pub fn settle(&self) -> Duration {
        Duration::from_millis(self.settle_ms)
    }

    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }
}

fn env_parsed<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|v| v.parse().ok())
}

/// Output format for results.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Table,
    Json,
    Markdown,
    Csv,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "table" => Ok(OutputFormat::Table),
            "json" => Ok(OutputFormat::Json),
            "markdown" | "md" => Ok(OutputFormat::Markdown),
            "csv" => Ok(OutputFormat::Csv),
            _ => Err(format!("Unknown format: {}. Use: table, json, markdown, csv", s)),
        }
    }
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OutputFormat::Table => write!(f, "table"),
            OutputFormat::Json => write!(f, "json"),
            OutputFormat::Markdown => write!(f, "markdown"),
            OutputFormat::Csv => write!(f, "csv"),
        }
    }
}

/// How pages are loaded.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    /// Plain HTTPS fetches; no clicking
    #[default]
    Http,
    /// Headless Chromium (requires the `browser` feature)
    Chromium,
}

impl std::str::FromStr for Backend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "http" => Ok(Backend::Http),
            "chromium" | "chrome" | "browser" => Ok(Backend::Chromium),
            _ => Err(format!("Unknown backend: {}. Use: http, chromium", s)),
        }
    }
}

impl std::fmt::Display for Backend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Backend::Http => write!(f, "http"),
            Backend::Chromium => write!(f, "chromium"),
        }
    }
}
