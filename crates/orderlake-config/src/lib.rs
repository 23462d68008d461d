// orderlake-config - Configuration for the batch pipeline
//
// Supports configuration from multiple sources:
// 1. Environment variables (ORDERLAKE_* prefix, highest priority)
// 2. Config file path from ORDERLAKE_CONFIG env var
// 3. Config file contents from ORDERLAKE_CONFIG_CONTENT env var
// 4. Default config file locations (./orderlake.toml, ./config.toml)
// 5. Built-in defaults (lowest priority)

use anyhow::Result;
use serde::Deserialize;

mod env_overrides;
mod sources;
mod validation;

pub use env_overrides::EnvSource;

/// Main pipeline configuration
#[derive(Debug, Clone, Deserialize)]
pub struct PipelineConfig {
    /// Identifying name for a pipeline run, used in logs and staging paths.
    #[serde(default = "default_run_name")]
    pub run_name: String,

    #[serde(default)]
    pub storage: StorageConfig,

    #[serde(default)]
    pub tiers: TierConfig,

    #[serde(default)]
    pub log: LogConfig,
}

fn default_run_name() -> String {
    "orderlake".to_string()
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            run_name: default_run_name(),
            storage: StorageConfig::default(),
            tiers: TierConfig::default(),
            log: LogConfig::default(),
        }
    }
}

/// Storage backend configuration
#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    pub backend: StorageBackend,

    #[serde(default)]
    pub fs: Option<FsConfig>,

    #[serde(default)]
    pub s3: Option<S3Config>,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: StorageBackend::Fs,
            fs: Some(FsConfig::default()),
            s3: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    Fs,
    S3,
}

impl std::fmt::Display for StorageBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StorageBackend::Fs => write!(f, "fs"),
            StorageBackend::S3 => write!(f, "s3"),
        }
    }
}

impl std::str::FromStr for StorageBackend {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "fs" | "filesystem" => Ok(StorageBackend::Fs),
            "s3" | "aws" => Ok(StorageBackend::S3),
            _ => anyhow::bail!("Unsupported storage backend: {}. Supported: fs, s3", s),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct FsConfig {
    pub root: String,
}

impl Default for FsConfig {
    fn default() -> Self {
        Self {
            root: "./data".to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct S3Config {
    pub bucket: String,
    pub region: String,
    #[serde(default)]
    pub endpoint: Option<String>,
    #[serde(default)]
    pub access_key_id: Option<String>,
    #[serde(default)]
    pub secret_access_key: Option<String>,
}

/// Tier prefixes under the storage root.
///
/// Bronze holds the raw CSV drops, silver the normalized Parquet
/// snapshots, gold the aggregated metrics.
#[derive(Debug, Clone, Deserialize)]
pub struct TierConfig {
    pub bronze: String,
    pub silver: String,
    pub gold: String,
}

impl Default for TierConfig {
    fn default() -> Self {
        Self {
            bronze: "bronze".to_string(),
            silver: "silver".to_string(),
            gold: "gold".to_string(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LogConfig {
    pub level: String,
    pub format: LogFormat,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Text,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Text,
    Json,
}

impl PipelineConfig {
    /// Load configuration from all sources with priority.
    pub fn load() -> Result<Self> {
        sources::load_config()
    }

    /// Load configuration from a specific file path (CLI --config flag).
    pub fn load_from_path(path: impl AsRef<std::path::Path>) -> Result<Self> {
        sources::load_from_file_path(path)
    }

    /// Load configuration with graceful fallback to defaults.
    pub fn load_or_default() -> Result<Self> {
        sources::load_or_default()
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<()> {
        validation::validate_config(self)
    }
}
