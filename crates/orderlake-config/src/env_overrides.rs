// Environment-variable overrides, applied on top of file configuration.

use crate::{FsConfig, LogFormat, PipelineConfig, S3Config, StorageBackend};
use anyhow::{Context, Result};

pub const ENV_PREFIX: &str = "ORDERLAKE_";

/// Abstraction over environment-variable lookups so tests can supply
/// their own source of overrides.
pub trait EnvSource {
    fn get(&self, key: &str) -> Option<String>;

    /// Get an environment variable WITHOUT the ORDERLAKE_ prefix.
    /// Used for AWS standard variables (AWS_ACCESS_KEY_ID, etc.)
    fn get_raw(&self, key: &str) -> Option<String>;
}

/// Apply environment-variable overrides (highest priority) to the config.
pub fn apply_env_overrides<E: EnvSource>(config: &mut PipelineConfig, env: &E) -> Result<()> {
    if let Some(name) = env.get("RUN_NAME") {
        config.run_name = name;
    }

    // Storage backend
    if let Some(backend) = env.get("STORAGE_BACKEND") {
        config.storage.backend = backend
            .parse::<StorageBackend>()
            .context("Invalid ORDERLAKE_STORAGE_BACKEND value")?;
    }

    // Filesystem storage
    if let Some(root) = env.get("STORAGE_ROOT") {
        config
            .storage
            .fs
            .get_or_insert_with(FsConfig::default)
            .root = root;
    }

    // S3 storage
    if let Some(bucket) = env.get("S3_BUCKET") {
        ensure_s3(config).bucket = bucket;
    }
    if let Some(region) = env.get("S3_REGION") {
        ensure_s3(config).region = region;
    }
    if let Some(endpoint) = env.get("S3_ENDPOINT") {
        ensure_s3(config).endpoint = Some(endpoint);
    }
    // AWS standard credentials (without the ORDERLAKE_ prefix)
    if let Some(access_key_id) = env.get_raw("AWS_ACCESS_KEY_ID") {
        ensure_s3(config).access_key_id = Some(access_key_id);
    }
    if let Some(secret_access_key) = env.get_raw("AWS_SECRET_ACCESS_KEY") {
        ensure_s3(config).secret_access_key = Some(secret_access_key);
    }

    // Tier prefixes
    if let Some(prefix) = env.get("BRONZE") {
        config.tiers.bronze = prefix;
    }
    if let Some(prefix) = env.get("SILVER") {
        config.tiers.silver = prefix;
    }
    if let Some(prefix) = env.get("GOLD") {
        config.tiers.gold = prefix;
    }

    // Logging
    if let Some(level) = env.get("LOG_LEVEL") {
        config.log.level = level;
    }
    if let Some(format) = env.get("LOG_FORMAT") {
        config.log.format = match format.to_lowercase().as_str() {
            "json" => LogFormat::Json,
            _ => LogFormat::Text,
        };
    }

    Ok(())
}

fn ensure_s3(config: &mut PipelineConfig) -> &mut S3Config {
    config.storage.s3.get_or_insert_with(S3Config::default)
}
