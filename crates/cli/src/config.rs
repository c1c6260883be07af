//! Configuration management for the CLI
//!
//! Defaults come from `~/.config/preflight/config.json` when it exists,
//! overridden by `PREFLIGHT_*` environment variables. Command-line flags
//! win over both.

use anyhow::{anyhow, Context, Result};
use clap::ValueEnum;
use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::output::OutputFormat;

/// CLI configuration
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    /// Support bundle directory
    pub bundle: Option<PathBuf>,
    /// Default output format
    pub format: Option<String>,
    /// Run analyzers concurrently by default
    #[serde(default)]
    pub parallel: bool,
}

impl Config {
    /// Load configuration from the config file and environment
    pub fn load() -> Result<Self> {
        Self::load_from(Self::config_path().as_deref())
    }

    fn load_from(path: Option<&Path>) -> Result<Self> {
        let mut builder = config::Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(config::File::from(path).required(false));
        }

        builder
            .add_source(config::Environment::with_prefix("PREFLIGHT"))
            .build()
            .context("Failed to load configuration")?
            .try_deserialize()
            .context("Failed to parse configuration")
    }

    /// Bundle directory, preferring an explicit flag
    pub fn bundle(&self, flag: Option<PathBuf>) -> PathBuf {
        flag.or_else(|| self.bundle.clone())
            .unwrap_or_else(|| PathBuf::from("."))
    }

    /// Output format, preferring an explicit flag
    pub fn format(&self, flag: Option<OutputFormat>) -> Result<OutputFormat> {
        if let Some(format) = flag {
            return Ok(format);
        }
        match &self.format {
            Some(name) => OutputFormat::from_str(name, true)
                .map_err(|_| anyhow!("Unknown output format in configuration: {}", name)),
            None => Ok(OutputFormat::default()),
        }
    }

    /// Get the configuration file path
    fn config_path() -> Option<PathBuf> {
        let home = dirs_next::home_dir()?;
        Some(home.join(".config").join("preflight").join("config.json"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_missing_file_uses_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let config = Config::load_from(Some(&temp_dir.path().join("config.json"))).unwrap();

        assert_eq!(config.bundle(None), PathBuf::from("."));
        assert!(matches!(config.format(None).unwrap(), OutputFormat::Table));
    }

    #[test]
    fn test_file_values_and_flag_precedence() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.json");
        std::fs::write(&path, r#"{"bundle": "/var/bundle", "format": "json"}"#).unwrap();

        let config = Config::load_from(Some(&path)).unwrap();
        assert_eq!(config.bundle(None), PathBuf::from("/var/bundle"));
        assert_eq!(
            config.bundle(Some(PathBuf::from("/tmp/other"))),
            PathBuf::from("/tmp/other")
        );
        assert!(matches!(config.format(None).unwrap(), OutputFormat::Json));
        assert!(matches!(
            config.format(Some(OutputFormat::Table)).unwrap(),
            OutputFormat::Table
        ));
    }

    #[test]
    fn test_unknown_format_is_rejected() {
        let config = Config {
            format: Some("yaml".into()),
            ..Default::default()
        };
        assert!(config.format(None).is_err());
    }
}
