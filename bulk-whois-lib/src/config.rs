//! Configuration file parsing and management.
//!
//! This module handles loading configuration from TOML files and `BW_*`
//! environment variables and merging them with proper precedence rules.

use crate::error::WhoisError;
use crate::types::{parse_rate_limit_secs, LookupConfig, MAX_RATE_LIMIT_SECS, MAX_WORKERS};
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Configuration loaded from TOML files.
///
/// ```toml
/// [defaults]
/// rate_limit = 1.0
/// workers = 3
/// timeout = "20s"
/// detailed = true
///
/// [output]
/// export = "csv"
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct FileConfig {
    /// Default values for CLI options
    #[serde(skip_serializing_if = "Option::is_none")]
    pub defaults: Option<DefaultsConfig>,

    /// Output preferences
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output: Option<OutputConfig>,
}

/// Default configuration values that map to CLI options.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct DefaultsConfig {
    /// Seconds between lookup dispatches
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rate_limit: Option<f64>,

    /// Number of concurrent workers
    #[serde(skip_serializing_if = "Option::is_none")]
    pub workers: Option<usize>,

    /// Per-lookup timeout (as string, e.g., "5s", "2m")
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout: Option<String>,

    /// Show detailed results instead of the table
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detailed: Option<bool>,

    /// Program used for lookups instead of `whois`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub whois_command: Option<String>,
}

/// Output configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct OutputConfig {
    /// Export format written after every run ("csv" or "json")
    #[serde(skip_serializing_if = "Option::is_none")]
    pub export: Option<String>,

    /// Directory export files are written to
    #[serde(skip_serializing_if = "Option::is_none")]
    pub export_dir: Option<String>,
}

impl FileConfig {
    /// Apply the file's defaults on top of `config`.
    pub fn apply_to(&self, mut config: LookupConfig) -> Result<LookupConfig, WhoisError> {
        if let Some(defaults) = &self.defaults {
            if let Some(secs) = defaults.rate_limit {
                config.rate_limit = parse_rate_limit_secs(secs)?;
            }
            if let Some(workers) = defaults.workers {
                config = config.with_workers(workers);
            }
            if let Some(timeout) = &defaults.timeout {
                config.timeout = parse_duration(timeout).ok_or_else(|| {
                    WhoisError::config(format!("Invalid timeout '{}'", timeout))
                })?;
            }
        }
        Ok(config)
    }

    /// Export format from the `[output]` table, if any.
    pub fn export_format(&self) -> Option<&str> {
        self.output.as_ref().and_then(|o| o.export.as_deref())
    }

    /// Detailed-output default from the `[defaults]` table, if any.
    pub fn detailed(&self) -> Option<bool> {
        self.defaults.as_ref().and_then(|d| d.detailed)
    }

    /// Custom whois program from the `[defaults]` table, if any.
    pub fn whois_command(&self) -> Option<&str> {
        self.defaults.as_ref().and_then(|d| d.whois_command.as_deref())
    }
}

/// Configuration discovery and loading functionality.
#[derive(Debug, Default)]
pub struct ConfigManager {
    /// Overrides `$HOME` during discovery
    home: Option<PathBuf>,
    /// Overrides the current directory during discovery
    working_dir: Option<PathBuf>,
}

impl ConfigManager {
    /// Create a new configuration manager using the real environment.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a manager that discovers files relative to the given
    /// home and working directories.
    pub fn with_dirs<H: Into<PathBuf>, W: Into<PathBuf>>(home: H, working_dir: W) -> Self {
        Self {
            home: Some(home.into()),
            working_dir: Some(working_dir.into()),
        }
    }

    /// Load configuration from a specific file.
    pub fn load_file<P: AsRef<Path>>(&self, path: P) -> Result<FileConfig, WhoisError> {
        let path = path.as_ref();

        if !path.exists() {
            return Err(WhoisError::file_error(
                path.to_string_lossy(),
                "Configuration file not found",
            ));
        }

        let content = fs::read_to_string(path).map_err(|e| {
            WhoisError::file_error(
                path.to_string_lossy(),
                format!("Failed to read configuration file: {}", e),
            )
        })?;

        let config: FileConfig = toml::from_str(&content).map_err(|e| {
            WhoisError::config(format!("Failed to parse TOML configuration: {}", e))
        })?;

        validate_config(&config)?;
        debug!(path = %path.display(), "loaded configuration file");

        Ok(config)
    }

    /// Discover and load configuration files in precedence order.
    ///
    /// XDG config has the lowest precedence, then the global file in the home
    /// directory, then a local file in the working directory. Files that fail
    /// to parse are skipped with a warning.
    pub fn discover_and_load(&self) -> FileConfig {
        let mut merged = FileConfig::default();

        let candidates = [
            self.xdg_config_path(),
            self.global_config_path(),
            self.local_config_path(),
        ];

        for path in candidates.into_iter().flatten() {
            match self.load_file(&path) {
                Ok(config) => {
                    info!(path = %path.display(), "using configuration file");
                    merged = merge_configs(merged, config);
                }
                Err(e) => warn!(path = %path.display(), error = %e, "ignoring configuration file"),
            }
        }

        merged
    }

    fn home_dir(&self) -> Option<PathBuf> {
        self.home
            .clone()
            .or_else(|| env::var_os("HOME").map(PathBuf::from))
    }

    fn local_config_path(&self) -> Option<PathBuf> {
        let dir = self.working_dir.clone().unwrap_or_else(|| PathBuf::from("."));
        ["bulk-whois.toml", ".bulk-whois.toml"]
            .iter()
            .map(|name| dir.join(name))
            .find(|path| path.exists())
    }

    fn global_config_path(&self) -> Option<PathBuf> {
        let home = self.home_dir()?;
        [".bulk-whois.toml", "bulk-whois.toml"]
            .iter()
            .map(|name| home.join(name))
            .find(|path| path.exists())
    }

    /// Follows the XDG Base Directory Specification.
    fn xdg_config_path(&self) -> Option<PathBuf> {
        let config_dir = match (&self.home, env::var_os("XDG_CONFIG_HOME")) {
            (None, Some(xdg)) => PathBuf::from(xdg),
            _ => self.home_dir()?.join(".config"),
        };

        let path = config_dir.join("bulk-whois").join("config.toml");
        path.exists().then_some(path)
    }
}

/// Merge two configurations; values from `higher` win.
fn merge_configs(lower: FileConfig, higher: FileConfig) -> FileConfig {
    FileConfig {
        defaults: match (lower.defaults, higher.defaults) {
            (Some(lower), Some(higher)) => Some(DefaultsConfig {
                rate_limit: higher.rate_limit.or(lower.rate_limit),
                workers: higher.workers.or(lower.workers),
                timeout: higher.timeout.or(lower.timeout),
                detailed: higher.detailed.or(lower.detailed),
                whois_command: higher.whois_command.or(lower.whois_command),
            }),
            (lower, higher) => higher.or(lower),
        },
        output: match (lower.output, higher.output) {
            (Some(lower), Some(higher)) => Some(OutputConfig {
                export: higher.export.or(lower.export),
                export_dir: higher.export_dir.or(lower.export_dir),
            }),
            (lower, higher) => higher.or(lower),
        },
    }
}

/// Validate a configuration for common issues.
fn validate_config(config: &FileConfig) -> Result<(), WhoisError> {
    if let Some(defaults) = &config.defaults {
        if let Some(secs) = defaults.rate_limit {
            parse_rate_limit_secs(secs)?;
        }

        if let Some(workers) = defaults.workers {
            if workers == 0 || workers > MAX_WORKERS {
                return Err(WhoisError::config(format!(
                    "Workers must be between 1 and {}",
                    MAX_WORKERS
                )));
            }
        }

        if let Some(timeout) = &defaults.timeout {
            if parse_duration(timeout).is_none() {
                return Err(WhoisError::config(format!(
                    "Invalid timeout format '{}'. Use format like '5s', '30s', '2m'",
                    timeout
                )));
            }
        }
    }

    if let Some(format) = config.output.as_ref().and_then(|o| o.export.as_deref()) {
        if !matches!(format, "csv" | "json") {
            return Err(WhoisError::config(format!(
                "Invalid export format '{}'. Use 'csv' or 'json'",
                format
            )));
        }
    }

    Ok(())
}

/// Environment variable configuration that mirrors CLI options.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EnvConfig {
    pub rate_limit: Option<f64>,
    pub workers: Option<usize>,
    pub timeout: Option<Duration>,
    pub detailed: Option<bool>,
    pub export: Option<String>,
    pub file: Option<String>,
    pub config: Option<String>,
}

impl EnvConfig {
    /// Apply the environment values on top of `config`.
    pub fn apply_to(&self, mut config: LookupConfig) -> LookupConfig {
        if let Some(secs) = self.rate_limit {
            match parse_rate_limit_secs(secs) {
                Ok(rate_limit) => config.rate_limit = rate_limit,
                Err(e) => warn!("Ignoring environment rate limit: {}", e),
            }
        }
        if let Some(workers) = self.workers {
            config = config.with_workers(workers);
        }
        if let Some(timeout) = self.timeout {
            config.timeout = timeout;
        }
        config
    }
}

/// Load configuration from `BW_*` environment variables.
///
/// Invalid values are logged as warnings and ignored.
pub fn load_env_config() -> EnvConfig {
    load_env_config_from(|key| env::var(key).ok())
}

/// Load `BW_*` configuration through a custom variable lookup.
pub fn load_env_config_from<F>(var: F) -> EnvConfig
where
    F: Fn(&str) -> Option<String>,
{
    let mut env_config = EnvConfig::default();

    if let Some(val) = var("BW_RATE_LIMIT") {
        match val.trim().parse::<f64>() {
            Ok(secs) if parse_rate_limit_secs(secs).is_ok() => env_config.rate_limit = Some(secs),
            _ => warn!(
                "Invalid BW_RATE_LIMIT='{}', must be between 0 and {} seconds",
                val, MAX_RATE_LIMIT_SECS
            ),
        }
    }

    if let Some(val) = var("BW_WORKERS") {
        match val.trim().parse::<usize>() {
            Ok(workers) if (1..=MAX_WORKERS).contains(&workers) => {
                env_config.workers = Some(workers)
            }
            _ => warn!("Invalid BW_WORKERS='{}', must be 1-{}", val, MAX_WORKERS),
        }
    }

    if let Some(val) = var("BW_TIMEOUT") {
        match parse_duration(&val) {
            Some(timeout) => env_config.timeout = Some(timeout),
            None => warn!("Invalid BW_TIMEOUT='{}', use format like '5s', '30s', '2m'", val),
        }
    }

    if let Some(val) = var("BW_DETAILED") {
        match parse_bool(&val) {
            Some(detailed) => env_config.detailed = Some(detailed),
            None => warn!("Invalid BW_DETAILED='{}', use true/false", val),
        }
    }

    if let Some(val) = var("BW_EXPORT") {
        let format = val.trim().to_lowercase();
        if matches!(format.as_str(), "csv" | "json") {
            env_config.export = Some(format);
        } else {
            warn!("Invalid BW_EXPORT='{}', use csv or json", val);
        }
    }

    if let Some(path) = var("BW_FILE").filter(|p| !p.trim().is_empty()) {
        env_config.file = Some(path);
    }

    if let Some(path) = var("BW_CONFIG").filter(|p| !p.trim().is_empty()) {
        env_config.config = Some(path);
    }

    debug!(?env_config, "environment configuration");
    env_config
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// Parse a duration string like "500ms", "5s", "2m", or bare seconds.
pub fn parse_duration(value: &str) -> Option<Duration> {
    let value = value.trim().to_lowercase();

    let duration = if let Some(ms) = value.strip_suffix("ms") {
        Duration::from_millis(ms.trim().parse().ok()?)
    } else if let Some(secs) = value.strip_suffix('s') {
        Duration::from_secs(secs.trim().parse().ok()?)
    } else if let Some(mins) = value.strip_suffix('m') {
        Duration::from_secs(mins.trim().parse::<u64>().ok()?.checked_mul(60)?)
    } else {
        Duration::from_secs(value.parse().ok()?)
    };

    (!duration.is_zero()).then_some(duration)
}
