//! Run configuration for finna-gen
//!
//! Merges command-line overrides over the TOML configuration. Environment
//! variables reach this layer through the binary's argument parser, so the
//! effective priority is CLI → ENV → TOML → compiled default.

use crate::services::batch_fetcher::BatchSettings;
use finna_common::config::{DataFolderResolver, LookupConfig, TomlConfig};
use finna_common::{Error, Result};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::info;

/// Values given explicitly for this run (flag or environment)
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub data_folder: Option<PathBuf>,
    pub input_file: Option<PathBuf>,
    pub insert_file: Option<PathBuf>,
    pub failed_file: Option<PathBuf>,
    pub concurrency: Option<usize>,
    pub identifier_timeout_secs: Option<u64>,
    pub first_book_id: Option<u64>,
    pub offline: bool,
}

/// Fully resolved settings for one generator run
#[derive(Debug, Clone)]
pub struct GeneratorConfig {
    pub data_folder: PathBuf,
    pub input_file: PathBuf,
    pub insert_file: PathBuf,
    pub failed_file: PathBuf,
    pub batch: BatchSettings,
    pub shutdown_grace: Duration,
    pub first_book_id: u64,
    pub unknown_genre: String,
    /// Skip lookups and emit pending book rows only
    pub offline: bool,
    pub lookup: LookupConfig,
}

impl GeneratorConfig {
    pub fn resolve(toml: &TomlConfig, overrides: ConfigOverrides) -> Result<Self> {
        let data_folder = DataFolderResolver::new()
            .with_cli_arg(overrides.data_folder.as_deref())
            .with_toml(toml)
            .resolve();

        let concurrency = overrides.concurrency.unwrap_or(toml.fetch.concurrency);
        if concurrency == 0 {
            return Err(Error::Config("concurrency must be at least 1".to_string()));
        }

        let timeout_secs = overrides
            .identifier_timeout_secs
            .unwrap_or(toml.fetch.identifier_timeout_secs);
        if timeout_secs == 0 {
            return Err(Error::Config(
                "identifier timeout must be at least 1 second".to_string(),
            ));
        }

        if toml.lookup.requests_per_second == 0 {
            return Err(Error::Config(
                "lookup.requests_per_second must be at least 1".to_string(),
            ));
        }

        let config = Self {
            data_folder,
            input_file: overrides
                .input_file
                .unwrap_or_else(|| toml.output.input_file.clone()),
            insert_file: overrides
                .insert_file
                .unwrap_or_else(|| toml.output.insert_file.clone()),
            failed_file: overrides
                .failed_file
                .unwrap_or_else(|| toml.output.failed_file.clone()),
            batch: BatchSettings {
                concurrency,
                identifier_timeout: Duration::from_secs(timeout_secs),
            },
            shutdown_grace: Duration::from_secs(toml.fetch.shutdown_grace_secs),
            first_book_id: overrides
                .first_book_id
                .unwrap_or(toml.output.first_book_id),
            unknown_genre: toml.output.unknown_genre.clone(),
            offline: overrides.offline,
            lookup: toml.lookup.clone(),
        };

        config.log_summary();
        Ok(config)
    }

    pub fn data_folder(&self) -> &Path {
        &self.data_folder
    }

    fn log_summary(&self) {
        info!(
            data_folder = %self.data_folder.display(),
            input = %self.input_file.display(),
            output = %self.insert_file.display(),
            failed = %self.failed_file.display(),
            concurrency = self.batch.concurrency,
            timeout_secs = self.batch.identifier_timeout.as_secs(),
            first_book_id = self.first_book_id,
            offline = self.offline,
            "Resolved run configuration"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    #[serial]
    fn test_overrides_win_over_toml() {
        std::env::remove_var(finna_common::config::DATA_FOLDER_ENV);
        let mut toml = TomlConfig::default();
        toml.fetch.concurrency = 4;
        toml.output.first_book_id = 100;
        toml.data_folder = Some(PathBuf::from("/from/toml"));

        let config = GeneratorConfig::resolve(
            &toml,
            ConfigOverrides {
                concurrency: Some(2),
                data_folder: Some(PathBuf::from("/from/cli")),
                ..Default::default()
            },
        )
        .unwrap();

        assert_eq!(config.batch.concurrency, 2);
        assert_eq!(config.first_book_id, 100);
        assert_eq!(config.data_folder, PathBuf::from("/from/cli"));
        assert_eq!(config.input_file, PathBuf::from("input.txt"));
        assert_eq!(config.batch.identifier_timeout, Duration::from_secs(10));
    }

    #[test]
    #[serial]
    fn test_zero_concurrency_rejected() {
        let result = GeneratorConfig::resolve(
            &TomlConfig::default(),
            ConfigOverrides {
                concurrency: Some(0),
                ..Default::default()
            },
        );
        assert!(matches!(result, Err(Error::Config(_))));
    }
}
