//! Bootstrap configuration loading and data folder resolution
//!
//! Configuration sources, highest priority first:
//! 1. Command-line argument
//! 2. Environment variable
//! 3. TOML config file
//! 4. Compiled default
//!
//! A missing TOML file is not an error: a warning is logged and the compiled
//! defaults are used. A TOML file that exists but cannot be parsed is an error.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Application directory name under the platform config/data dirs
pub const APP_DIR_NAME: &str = "finna-gen";

/// Environment variable overriding the data folder
pub const DATA_FOLDER_ENV: &str = "FINNA_GEN_DATA_FOLDER";

/// Bootstrap configuration loaded from TOML
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct TomlConfig {
    /// Folder holding the entity store files (optional)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_folder: Option<PathBuf>,

    #[serde(default)]
    pub logging: LoggingConfig,

    #[serde(default)]
    pub lookup: LookupConfig,

    #[serde(default)]
    pub fetch: FetchConfig,

    #[serde(default)]
    pub output: OutputConfig,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log file path (optional, logs to stderr if not specified)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            file: None,
        }
    }
}

/// Lookup service (Finna API) settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LookupConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Outbound request budget shared by all workers
    #[serde(default = "default_requests_per_second")]
    pub requests_per_second: u32,

    /// Whole-request HTTP timeout
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

impl Default for LookupConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            requests_per_second: default_requests_per_second(),
            request_timeout_secs: default_request_timeout_secs(),
            user_agent: default_user_agent(),
        }
    }
}

/// Batch fetch settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FetchConfig {
    /// Maximum number of concurrently running blocks
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,

    /// Bounded wait for a single identifier
    #[serde(default = "default_identifier_timeout_secs")]
    pub identifier_timeout_secs: u64,

    /// Grace period before in-flight blocks are cancelled on shutdown
    #[serde(default = "default_shutdown_grace_secs")]
    pub shutdown_grace_secs: u64,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            concurrency: default_concurrency(),
            identifier_timeout_secs: default_identifier_timeout_secs(),
            shutdown_grace_secs: default_shutdown_grace_secs(),
        }
    }
}

/// Input and rendered output files
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OutputConfig {
    /// Identifier list, one per line
    #[serde(default = "default_input_file")]
    pub input_file: PathBuf,

    /// File receiving the rendered insert statements (appended)
    #[serde(default = "default_insert_file")]
    pub insert_file: PathBuf,

    /// File receiving skipped identifiers for a retry run
    #[serde(default = "default_failed_file")]
    pub failed_file: PathBuf,

    #[serde(default = "default_first_book_id")]
    pub first_book_id: u64,

    /// Genre description used when a record carries no classification
    #[serde(default = "default_unknown_genre")]
    pub unknown_genre: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            input_file: default_input_file(),
            insert_file: default_insert_file(),
            failed_file: default_failed_file(),
            first_book_id: default_first_book_id(),
            unknown_genre: default_unknown_genre(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_base_url() -> String {
    "https://api.finna.fi/v1".to_string()
}

fn default_requests_per_second() -> u32 {
    5
}

fn default_request_timeout_secs() -> u64 {
    15
}

fn default_user_agent() -> String {
    format!("finna-gen/{}", env!("CARGO_PKG_VERSION"))
}

fn default_concurrency() -> usize {
    10
}

fn default_identifier_timeout_secs() -> u64 {
    10
}

fn default_shutdown_grace_secs() -> u64 {
    30
}

fn default_input_file() -> PathBuf {
    PathBuf::from("input.txt")
}

fn default_insert_file() -> PathBuf {
    PathBuf::from("dbOutput.txt")
}

fn default_failed_file() -> PathBuf {
    PathBuf::from("failed.txt")
}

fn default_first_book_id() -> u64 {
    1
}

fn default_unknown_genre() -> String {
    "-1".to_string()
}

/// Default TOML config location (`<config dir>/finna-gen/config.toml`)
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join(APP_DIR_NAME).join("config.toml"))
}

/// Load and parse a TOML config file
pub fn load_toml_config(path: &Path) -> Result<TomlConfig> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| Error::Config(format!("Read TOML {} failed: {}", path.display(), e)))?;

    toml::from_str(&content)
        .map_err(|e| Error::Config(format!("Parse TOML {} failed: {}", path.display(), e)))
}

/// Load the TOML config, falling back to defaults when the file is missing
///
/// `explicit` is a path given on the command line; when absent the platform
/// default location is tried.
pub fn load_or_default(explicit: Option<&Path>) -> Result<TomlConfig> {
    let path = match explicit {
        Some(p) => p.to_path_buf(),
        None => match default_config_path() {
            Some(p) => p,
            None => {
                warn!("Could not determine config directory, using defaults");
                return Ok(TomlConfig::default());
            }
        },
    };

    if !path.exists() {
        warn!(
            "Config file {} not found, using built-in defaults",
            path.display()
        );
        return Ok(TomlConfig::default());
    }

    debug!("Loading config from {}", path.display());
    load_toml_config(&path)
}

/// Write config to TOML atomically (temp file + rename)
pub fn write_toml_config(config: &TomlConfig, path: &Path) -> Result<()> {
    let content = toml::to_string_pretty(config)
        .map_err(|e| Error::Config(format!("Serialize TOML failed: {}", e)))?;

    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    let tmp_path = path.with_extension("toml.tmp");
    std::fs::write(&tmp_path, content)?;
    std::fs::rename(&tmp_path, path)?;
    Ok(())
}

/// Data folder resolution following CLI → ENV → TOML → default priority
pub struct DataFolderResolver<'a> {
    cli_arg: Option<&'a Path>,
    toml: Option<&'a TomlConfig>,
}

impl<'a> DataFolderResolver<'a> {
    pub fn new() -> Self {
        Self {
            cli_arg: None,
            toml: None,
        }
    }

    pub fn with_cli_arg(mut self, path: Option<&'a Path>) -> Self {
        self.cli_arg = path;
        self
    }

    pub fn with_toml(mut self, config: &'a TomlConfig) -> Self {
        self.toml = Some(config);
        self
    }

    /// Resolve the data folder; never fails, the compiled default is the last resort
    pub fn resolve(&self) -> PathBuf {
        if let Some(path) = self.cli_arg {
            return path.to_path_buf();
        }

        if let Ok(path) = std::env::var(DATA_FOLDER_ENV) {
            if !path.trim().is_empty() {
                return PathBuf::from(path);
            }
        }

        if let Some(path) = self.toml.and_then(|c| c.data_folder.as_ref()) {
            return path.clone();
        }

        default_data_folder()
    }
}

impl Default for DataFolderResolver<'_> {
    fn default() -> Self {
        Self::new()
    }
}

/// OS-dependent default data folder
pub fn default_data_folder() -> PathBuf {
    dirs::data_local_dir()
        .map(|d| d.join(APP_DIR_NAME))
        .unwrap_or_else(|| PathBuf::from("./finna_data"))
}

/// Create the data folder if it does not exist yet
pub fn ensure_directory_exists(path: &Path) -> Result<()> {
    if !path.exists() {
        std::fs::create_dir_all(path)?;
        debug!("Created data folder {}", path.display());
    } else if !path.is_dir() {
        return Err(Error::Config(format!(
            "Data folder {} exists but is not a directory",
            path.display()
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_toml_uses_defaults() {
        let config: TomlConfig = toml::from_str("").unwrap();
        assert_eq!(config, TomlConfig::default());
        assert_eq!(config.fetch.concurrency, 10);
        assert_eq!(config.fetch.identifier_timeout_secs, 10);
        assert_eq!(config.output.unknown_genre, "-1");
    }

    #[test]
    fn test_partial_section_keeps_other_defaults() {
        let config: TomlConfig = toml::from_str(
            r#"
            [fetch]
            concurrency = 4
            "#,
        )
        .unwrap();
        assert_eq!(config.fetch.concurrency, 4);
        assert_eq!(config.fetch.shutdown_grace_secs, 30);
        assert_eq!(config.lookup.base_url, "https://api.finna.fi/v1");
    }
}
