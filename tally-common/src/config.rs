//! Bootstrap configuration for Civic Tally
//!
//! Settings are resolved in priority order:
//! 1. Command-line arguments / environment (applied by the binary on top of the result)
//! 2. TOML configuration file (explicit path, else the platform config directory)
//! 3. Built-in defaults (code constants)
//!
//! A missing default TOML file is not an error: the service logs a warning and
//! starts with built-in defaults. An explicitly requested file that is missing
//! or malformed is a configuration error.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{info, warn};

/// Application directory name under the platform config/data directories
pub const APP_DIR_NAME: &str = "civic-tally";

/// Bootstrap configuration loaded from TOML
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TomlConfig {
    pub server: ServerConfig,
    pub logging: LoggingConfig,
    pub storage: StorageConfig,
    pub abuse: AbuseConfig,
    pub reconcile: ReconcileConfig,
    pub election: ElectionConfig,
    pub moderation: ModerationConfig,
}

/// HTTP listener configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 5780,
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error); RUST_LOG overrides it
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

/// Database configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// SQLite database file; defaults to the platform data directory
    pub database_path: Option<PathBuf>,
    pub max_connections: u32,
    /// Upper bound on waiting for a pooled connection
    pub acquire_timeout_ms: u64,
    /// SQLite busy handler timeout applied to every connection
    pub busy_timeout_ms: u64,
    /// Total time budget for retrying a transaction that hit lock contention
    pub max_lock_wait_ms: u64,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_path: None,
            max_connections: 16,
            acquire_timeout_ms: 5_000,
            busy_timeout_ms: 250,
            max_lock_wait_ms: 5_000,
        }
    }
}

impl StorageConfig {
    pub fn acquire_timeout(&self) -> Duration {
        Duration::from_millis(self.acquire_timeout_ms)
    }

    pub fn busy_timeout(&self) -> Duration {
        Duration::from_millis(self.busy_timeout_ms)
    }

    /// Resolve the database path, falling back to the platform data directory
    pub fn resolved_database_path(&self) -> PathBuf {
        self.database_path
            .clone()
            .unwrap_or_else(default_database_path)
    }
}

/// What the submission path does with a submission the abuse guard flags
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum AbusePolicy {
    /// Reject the submission
    #[default]
    Block,
    /// Accept it and report it as flagged
    Warn,
    /// Accept it silently, log only
    Log,
}

/// Abuse guard thresholds
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AbuseConfig {
    pub burst_window_secs: u64,
    /// Prior submissions inside the burst window that make the next one suspicious
    pub burst_threshold: u32,
    pub duplicate_window_secs: u64,
    pub similarity_threshold: f64,
    pub policy: AbusePolicy,
}

impl Default for AbuseConfig {
    fn default() -> Self {
        Self {
            burst_window_secs: 60,
            burst_threshold: 3,
            duplicate_window_secs: 600,
            similarity_threshold: 0.8,
            policy: AbusePolicy::Block,
        }
    }
}

impl AbuseConfig {
    pub fn burst_window(&self) -> Duration {
        Duration::from_secs(self.burst_window_secs)
    }

    pub fn duplicate_window(&self) -> Duration {
        Duration::from_secs(self.duplicate_window_secs)
    }

    /// Oldest sample any guard check can still look at
    pub fn retention(&self) -> Duration {
        Duration::from_secs(self.burst_window_secs.max(self.duplicate_window_secs))
    }
}

/// Percentage reconciliation timer
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReconcileConfig {
    pub interval_secs: u64,
    /// A run still going after this long is abandoned
    pub run_timeout_secs: u64,
}

impl Default for ReconcileConfig {
    fn default() -> Self {
        Self {
            interval_secs: 60,
            run_timeout_secs: 30,
        }
    }
}

impl ReconcileConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs.max(1))
    }

    pub fn run_timeout(&self) -> Duration {
        Duration::from_secs(self.run_timeout_secs.max(1))
    }
}

/// Election statistics policy
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ElectionConfig {
    /// Total ballots at which participation reads 100%
    pub full_turnout_votes: u64,
}

impl Default for ElectionConfig {
    fn default() -> Self {
        Self {
            full_turnout_votes: 1_000,
        }
    }
}

/// Conversational content moderation
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ModerationConfig {
    /// Added to the built-in disallowed term list
    pub extra_banned_terms: Vec<String>,
    pub toxicity_threshold: f64,
    /// Toxicity scoring endpoint; scoring is skipped when unset
    pub toxicity_api_url: Option<String>,
    pub toxicity_api_key: Option<String>,
    pub toxicity_timeout_ms: u64,
    pub toxicity_requests_per_second: u32,
}

impl Default for ModerationConfig {
    fn default() -> Self {
        Self {
            extra_banned_terms: Vec::new(),
            toxicity_threshold: 0.7,
            toxicity_api_url: None,
            toxicity_api_key: None,
            toxicity_timeout_ms: 2_000,
            toxicity_requests_per_second: 1,
        }
    }
}

impl ModerationConfig {
    pub fn toxicity_timeout(&self) -> Duration {
        Duration::from_millis(self.toxicity_timeout_ms)
    }
}

/// Load configuration from an explicit path or the platform default location
pub fn load_config(explicit_path: Option<&Path>) -> Result<TomlConfig> {
    if let Some(path) = explicit_path {
        if !path.exists() {
            return Err(Error::Config(format!(
                "Config file not found: {}",
                path.display()
            )));
        }
        let config = read_toml_config(path)?;
        info!("Loaded configuration from {}", path.display());
        return Ok(config);
    }

    match default_config_path() {
        Some(path) if path.exists() => {
            let config = read_toml_config(&path)?;
            info!("Loaded configuration from {}", path.display());
            Ok(config)
        }
        Some(path) => {
            warn!(
                "No config file at {}, using built-in defaults",
                path.display()
            );
            Ok(TomlConfig::default())
        }
        None => {
            warn!("Could not determine config directory, using built-in defaults");
            Ok(TomlConfig::default())
        }
    }
}

/// Parse a TOML config file
pub fn read_toml_config(path: &Path) -> Result<TomlConfig> {
    let content = std::fs::read_to_string(path)?;
    toml::from_str(&content)
        .map_err(|e| Error::Config(format!("Failed to parse {}: {}", path.display(), e)))
}

/// Write a TOML config file, creating parent directories as needed
pub fn write_toml_config(config: &TomlConfig, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let content = toml::to_string_pretty(config)
        .map_err(|e| Error::Config(format!("Failed to serialize config: {}", e)))?;
    std::fs::write(path, content)?;
    Ok(())
}

/// `<config_dir>/civic-tally/config.toml`
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join(APP_DIR_NAME).join("config.toml"))
}

/// `<data_local_dir>/civic-tally/tally.db`, or `./tally.db` when unknown
pub fn default_database_path() -> PathBuf {
    dirs::data_local_dir()
        .map(|d| d.join(APP_DIR_NAME).join("tally.db"))
        .unwrap_or_else(|| PathBuf::from("./tally.db"))
}
