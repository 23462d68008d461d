// Configuration source loading.
//
// Priority order:
// 1. Environment variables (ORDERLAKE_* prefix)
// 2. Config file path from ORDERLAKE_CONFIG
// 3. Inline config content from ORDERLAKE_CONFIG_CONTENT
// 4. Default config files (./orderlake.toml, ./config.toml)
// 5. Built-in defaults

use crate::env_overrides::{self, EnvSource, ENV_PREFIX};
use crate::PipelineConfig;
use anyhow::{Context, Result};
use std::env;
use std::path::Path;

/// Load configuration from the standard sources.
pub fn load_config() -> Result<PipelineConfig> {
    let mut config = load_from_file()?.unwrap_or_default();

    apply_std_env(&mut config)?;
    config.validate()?;
    Ok(config)
}

/// Load configuration from a specific file path (for CLI --config flag).
/// Returns an error if the file doesn't exist or can't be parsed.
pub fn load_from_file_path(path: impl AsRef<Path>) -> Result<PipelineConfig> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;
    let mut config: PipelineConfig = toml::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

    apply_std_env(&mut config)?;
    config.validate()?;
    Ok(config)
}

/// Load configuration with graceful fallback to defaults.
pub fn load_or_default() -> Result<PipelineConfig> {
    let mut config = match load_from_file() {
        Ok(Some(file_config)) => file_config,
        _ => PipelineConfig::default(),
    };

    apply_std_env(&mut config)?;
    config.validate()?;
    Ok(config)
}

fn apply_std_env(config: &mut PipelineConfig) -> Result<()> {
    let env_source = StdEnvSource;
    env_overrides::apply_env_overrides(config, &env_source)
}

fn load_from_file() -> Result<Option<PipelineConfig>> {
    if let Ok(path) = env::var("ORDERLAKE_CONFIG") {
        let content = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read config file: {}", path))?;
        let config: PipelineConfig = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path))?;
        return Ok(Some(config));
    }

    if let Ok(content) = env::var("ORDERLAKE_CONFIG_CONTENT") {
        let config: PipelineConfig = toml::from_str(&content)
            .context("Failed to parse inline config from ORDERLAKE_CONFIG_CONTENT")?;
        return Ok(Some(config));
    }

    for path in &["./orderlake.toml", "./config.toml"] {
        if Path::new(path).exists() {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file: {}", path))?;
            let config: PipelineConfig = toml::from_str(&content)
                .with_context(|| format!("Failed to parse config file: {}", path))?;
            return Ok(Some(config));
        }
    }

    Ok(None)
}

struct StdEnvSource;

impl EnvSource for StdEnvSource {
    fn get(&self, key: &str) -> Option<String> {
        env::var(format!("{}{}", ENV_PREFIX, key)).ok()
    }

    fn get_raw(&self, key: &str) -> Option<String> {
        env::var(key).ok()
    }
}
