//! Configuration management for the CLI
//!
//! Settings are layered:
//! - Default values
//! - A configuration file (YAML, JSON or TOML)
//! - Environment variables (logging only)
//! - Command-line arguments

use crate::cli::OutputFormat;
use crate::error::{CliError, Result};
use crate::logging::LogFormat;
use schemagraph::LoaderConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Base name of configuration files
const CONFIG_STEM: &str = ".schemagraph";

/// Extensions probed, in order, for a configuration file
const CONFIG_EXTENSIONS: &[&str] = &["yaml", "yml", "json", "toml"];

/// Main configuration structure
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Schema loader settings
    pub loader: LoaderConfig,

    /// Output settings
    pub output: OutputConfig,

    /// Logging settings
    pub logging: LoggingSettings,
}

/// Output configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Default output format
    pub format: OutputFormat,

    /// Use colored output when writing to a terminal
    pub color: bool,
}

/// Logging configuration from the file; flags and environment win over it
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    /// Log level filter used when no `-v` flag is given
    pub level: Option<String>,

    /// Log format (compact, full, json)
    pub format: Option<LogFormat>,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            format: OutputFormat::Human,
            color: true,
        }
    }
}

impl Config {
    /// Load configuration from a file, choosing the parser by extension
    pub fn from_file(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(CliError::FileNotFound {
                path: path.to_path_buf(),
            });
        }
        let content = std::fs::read_to_string(path)?;

        let config = match path.extension().and_then(|s| s.to_str()) {
            Some("yaml") | Some("yml") => serde_yaml::from_str(&content)?,
            Some("json") => serde_json::from_str(&content)?,
            Some("toml") => toml::from_str(&content)?,
            _ => {
                return Err(CliError::InvalidFormat {
                    path: path.to_path_buf(),
                    expected: "YAML, JSON or TOML".to_string(),
                })
            }
        };

        Ok(config)
    }

    /// Load configuration from the first default location that exists
    pub fn load() -> Result<Self> {
        for path in Self::default_config_paths() {
            if path.exists() {
                match Self::from_file(&path) {
                    Ok(config) => return Ok(config),
                    Err(e) => {
                        eprintln!("Warning: Failed to load config from {:?}: {}", path, e);
                    }
                }
            }
        }

        Ok(Self::default())
    }

    /// Load configuration from a specific file or default locations
    pub fn load_with_file(file: Option<&Path>) -> Result<Self> {
        match file {
            Some(path) => Self::from_file(path),
            None => Self::load(),
        }
    }

    /// Default configuration file paths to check
    fn default_config_paths() -> Vec<PathBuf> {
        let mut paths: Vec<PathBuf> = CONFIG_EXTENSIONS
            .iter()
            .map(|ext| PathBuf::from(format!("{}.{}", CONFIG_STEM, ext)))
            .collect();

        if let Some(config_dir) = dirs::config_dir() {
            let dir = config_dir.join("schemagraph");
            paths.extend(CONFIG_EXTENSIONS.iter().map(|ext| dir.join(format!("config.{}", ext))));
        }

        paths
    }

    /// Save configuration to a file in the format its extension names
    #[cfg(test)]
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = match path.extension().and_then(|s| s.to_str()) {
            Some("yaml") | Some("yml") => serde_yaml::to_string(self)?,
            Some("toml") => toml::to_string_pretty(self).map_err(|e| CliError::config(e.to_string()))?,
            _ => serde_json::to_string_pretty(self)?,
        };

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        std::fs::write(path, content)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use schemagraph::Draft;
    use tempfile::TempDir;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.loader, LoaderConfig::default());
        assert_eq!(config.output.format, OutputFormat::Human);
        assert!(config.output.color);
        assert!(config.logging.level.is_none());
    }

    #[test]
    fn test_partial_yaml_keeps_defaults() -> Result<()> {
        let dir = TempDir::new()?;
        let path = dir.path().join(".schemagraph.yaml");
        std::fs::write(
            &path,
            "loader:\n  default_draft: draft-07\n  validate: true\noutput:\n  format: json-pretty\n",
        )?;

        let config = Config::from_file(&path)?;
        assert_eq!(config.loader.default_draft, Draft::Draft7);
        assert!(config.loader.validate);
        assert!(config.loader.auto_detect);
        assert_eq!(config.output.format, OutputFormat::JsonPretty);
        assert!(config.output.color);
        Ok(())
    }

    #[test]
    fn test_toml_config() -> Result<()> {
        let dir = TempDir::new()?;
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            "[loader]\nstrict_formats = true\n\n[logging]\nlevel = \"debug\"\nformat = \"json\"\n",
        )?;

        let config = Config::from_file(&path)?;
        assert!(config.loader.strict_formats);
        assert_eq!(config.logging.level.as_deref(), Some("debug"));
        assert_eq!(config.logging.format, Some(LogFormat::Json));
        Ok(())
    }

    #[test]
    fn test_save_and_reload() -> Result<()> {
        let dir = TempDir::new()?;
        let mut config = Config::default();
        config.loader = config.loader.with_default_draft(Draft::Draft4);
        config.output.color = false;

        for name in ["nested/config.json", "config.yaml", "config.toml"] {
            let path = dir.path().join(name);
            config.save(&path)?;
            assert_eq!(Config::from_file(&path)?, config);
        }
        Ok(())
    }

    #[test]
    fn test_rejected_files() -> Result<()> {
        let dir = TempDir::new()?;

        let missing = Config::from_file(&dir.path().join("absent.yaml")).unwrap_err();
        assert!(matches!(missing, CliError::FileNotFound { .. }));

        let ini = dir.path().join("config.ini");
        std::fs::write(&ini, "[loader]")?;
        assert!(matches!(Config::from_file(&ini).unwrap_err(), CliError::InvalidFormat { .. }));

        let broken = dir.path().join("config.json");
        std::fs::write(&broken, "{\"loader\": {\"default_draft\": \"draft-99\"}}")?;
        assert!(matches!(Config::from_file(&broken).unwrap_err(), CliError::Json(_)));
        Ok(())
    }

    #[test]
    fn test_explicit_file_wins() -> Result<()> {
        let dir = TempDir::new()?;
        let path = dir.path().join("explicit.json");
        std::fs::write(&path, r#"{"output": {"color": false}}"#)?;

        let config = Config::load_with_file(Some(&path))?;
        assert!(!config.output.color);
        Ok(())
    }
}
