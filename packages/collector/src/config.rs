//! Exporter configuration, read once per collection cycle.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Deserializer};
use thiserror::Error;

/// Overrides the config file location.
pub const CONFIG_PATH_ENV: &str = "CONFIG_PATH";
/// Region used when no config file is available.
pub const REGION_ENV: &str = "AWS_REGION";
/// Config file read when `CONFIG_PATH` is unset, relative to the working directory.
pub const DEFAULT_CONFIG_FILE: &str = "config.yaml";

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("No usable config file and AWS_REGION is not set")]
    MissingRegion,
    #[error("Failed to read config file {}: {source}", path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Invalid config file: {0}")]
    Parse(#[from] serde_yaml::Error),
    #[error("Config region must not be empty")]
    EmptyRegion,
}

/// What to poll and how to authenticate.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ExporterConfig {
    /// Region of the batch service.
    pub region: String,
    /// Queues to poll. Empty means every queue in the region.
    #[serde(default, deserialize_with = "null_as_empty")]
    pub queues: Vec<String>,
    /// Role to assume before polling; ambient credentials when absent.
    #[serde(default)]
    pub role_arn: Option<String>,
}

fn null_as_empty<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<String>, D::Error> {
    Ok(Option::<Vec<String>>::deserialize(deserializer)?.unwrap_or_default())
}

fn non_empty(s: String) -> Option<String> {
    let trimmed = s.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

impl ExporterConfig {
    /// Minimal config: one region, every queue, ambient credentials.
    pub fn new(region: impl Into<String>) -> Self {
        Self {
            region: region.into(),
            queues: Vec::new(),
            role_arn: None,
        }
    }

    pub fn with_queues<I, S>(mut self, queues: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.queues = queues.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_role_arn(mut self, role_arn: impl Into<String>) -> Self {
        self.role_arn = Some(role_arn.into());
        self
    }

    /// Parse a YAML document.
    pub fn from_yaml(yaml: &str) -> Result<Self, ConfigError> {
        let mut config: Self = serde_yaml::from_str(yaml)?;
        config.region = non_empty(config.region).ok_or(ConfigError::EmptyRegion)?;
        config.role_arn = config.role_arn.and_then(non_empty);
        Ok(config)
    }

    /// Read `path`, falling back to `{ region: region_fallback }` when the
    /// file is missing or empty.
    pub fn load_from(path: &Path, region_fallback: Option<String>) -> Result<Self, ConfigError> {
        let contents = match std::fs::read_to_string(path) {
            Ok(contents) if !contents.trim().is_empty() => contents,
            Ok(_) => {
                tracing::warn!("Config file {} is empty", path.display());
                return Self::fallback(region_fallback);
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::warn!("Cannot read config file: {}", path.display());
                return Self::fallback(region_fallback);
            }
            Err(source) => {
                return Err(ConfigError::Read {
                    path: path.to_path_buf(),
                    source,
                });
            }
        };

        tracing::debug!("Loading config from {}", path.display());
        Self::from_yaml(&contents)
    }

    fn fallback(region: Option<String>) -> Result<Self, ConfigError> {
        region
            .and_then(non_empty)
            .map(Self::new)
            .ok_or(ConfigError::MissingRegion)
    }
}

/// Where a collection cycle gets its configuration from.
pub trait ConfigSource: Send + Sync {
    fn load(&self) -> Result<ExporterConfig, ConfigError>;
}

/// A fixed configuration.
impl ConfigSource for ExporterConfig {
    fn load(&self) -> Result<ExporterConfig, ConfigError> {
        Ok(self.clone())
    }
}

/// Configuration from `CONFIG_PATH` / `config.yaml`, with `AWS_REGION` as fallback.
///
/// Re-read on every load, so edits apply to the next scrape.
#[derive(Debug, Default, Clone, Copy)]
pub struct EnvConfigSource;

impl EnvConfigSource {
    /// The config file this source reads.
    pub fn config_path() -> PathBuf {
        std::env::var(CONFIG_PATH_ENV)
            .ok()
            .and_then(non_empty)
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE))
    }
}

impl ConfigSource for EnvConfigSource {
    fn load(&self) -> Result<ExporterConfig, ConfigError> {
        let path = Self::config_path();
        ExporterConfig::load_from(&path, std::env::var(REGION_ENV).ok())
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::disallowed_methods)]

    use super::*;
    use std::error::Error;

    #[test]
    fn parses_full_config() -> Result<(), ConfigError> {
        let config = ExporterConfig::from_yaml(
            "region: eu-west-1\nqueues:\n  - etl\n  - ml-training\nrole_arn: arn:aws:iam::1:role/reader\n",
        )?;

        assert_eq!(
            config,
            ExporterConfig::new("eu-west-1")
                .with_queues(["etl", "ml-training"])
                .with_role_arn("arn:aws:iam::1:role/reader")
        );
        Ok(())
    }

    #[test]
    fn missing_or_null_queues_mean_all_queues() -> Result<(), ConfigError> {
        assert!(ExporterConfig::from_yaml("region: us-east-1")?.queues.is_empty());
        assert!(ExporterConfig::from_yaml("region: us-east-1\nqueues: ~")?.queues.is_empty());
        Ok(())
    }

    #[test]
    fn blank_role_arn_means_ambient_credentials() -> Result<(), ConfigError> {
        let config = ExporterConfig::from_yaml("region: us-east-1\nrole_arn: ''")?;
        assert_eq!(config.role_arn, None);
        Ok(())
    }

    #[test]
    fn region_and_role_are_trimmed() -> Result<(), ConfigError> {
        let config =
            ExporterConfig::from_yaml("region: ' eu-west-1 '
role_arn: ' arn:aws:iam::1:role/r '")?;
        assert_eq!(config.region, "eu-west-1");
        assert_eq!(config.role_arn.as_deref(), Some("arn:aws:iam::1:role/r"));
        Ok(())
    }

    #[test]
    fn region_is_required_in_file() {
        assert!(matches!(
            ExporterConfig::from_yaml("queues: [a]"),
            Err(ConfigError::Parse(_))
        ));
        assert!(matches!(
            ExporterConfig::from_yaml("region: '  '"),
            Err(ConfigError::EmptyRegion)
        ));
    }

    #[test]
    fn reads_file_when_present() -> Result<(), Box<dyn Error>> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("config.yaml");
        std::fs::write(&path, "region: ap-south-1\nqueues: [nightly]\n")?;

        let config = ExporterConfig::load_from(&path, Some("us-east-1".into()))?;
        assert_eq!(config.region, "ap-south-1");
        assert_eq!(config.queues, vec!["nightly".to_string()]);
        Ok(())
    }

    #[test]
    fn missing_file_falls_back_to_region() -> Result<(), Box<dyn Error>> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("absent.yaml");

        let config = ExporterConfig::load_from(&path, Some("us-west-2".into()))?;
        assert_eq!(config, ExporterConfig::new("us-west-2"));
        Ok(())
    }

    #[test]
    fn empty_file_falls_back_to_region() -> Result<(), Box<dyn Error>> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("config.yaml");
        std::fs::write(&path, "")?;

        let config = ExporterConfig::load_from(&path, Some("us-west-2".into()))?;
        assert_eq!(config, ExporterConfig::new("us-west-2"));
        Ok(())
    }

    #[test]
    fn fallback_without_region_fails() -> Result<(), Box<dyn Error>> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("absent.yaml");

        assert!(matches!(
            ExporterConfig::load_from(&path, None),
            Err(ConfigError::MissingRegion)
        ));
        assert!(matches!(
            ExporterConfig::load_from(&path, Some(" ".into())),
            Err(ConfigError::MissingRegion)
        ));
        Ok(())
    }

    #[test]
    fn fixed_config_is_a_source() -> Result<(), ConfigError> {
        let source = ExporterConfig::new("eu-central-1");
        assert_eq!(source.load()?, source);
        Ok(())
    }
}
