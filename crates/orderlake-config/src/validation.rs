// Configuration validation
//
// Validates that required fields are present and values are sensible.

use crate::{PipelineConfig, StorageBackend, StorageConfig, TierConfig};
use anyhow::{bail, Result};

pub fn validate_config(config: &PipelineConfig) -> Result<()> {
    if config.run_name.trim().is_empty() {
        bail!("run_name must not be empty");
    }

    validate_storage_config(&config.storage)?;
    validate_tier_config(&config.tiers)?;

    Ok(())
}

fn validate_storage_config(config: &StorageConfig) -> Result<()> {
    match config.backend {
        StorageBackend::Fs => {
            let fs = config
                .fs
                .as_ref()
                .ok_or_else(|| anyhow::anyhow!("fs storage backend requires 'fs' configuration"))?;

            if fs.root.is_empty() {
                bail!("storage.fs.root must not be empty");
            }
        }
        StorageBackend::S3 => {
            let s3 = config
                .s3
                .as_ref()
                .ok_or_else(|| anyhow::anyhow!("s3 storage backend requires 's3' configuration"))?;

            if s3.bucket.is_empty() {
                bail!("storage.s3.bucket is required for S3 backend");
            }

            if s3.region.is_empty() {
                bail!("storage.s3.region is required for S3 backend");
            }
        }
    }

    Ok(())
}

fn validate_tier_config(tiers: &TierConfig) -> Result<()> {
    let trimmed: Vec<(&str, &str)> = [
        ("tiers.bronze", tiers.bronze.as_str()),
        ("tiers.silver", tiers.silver.as_str()),
        ("tiers.gold", tiers.gold.as_str()),
    ]
    .map(|(key, value)| (key, value.trim_matches('/')))
    .to_vec();

    for (key, value) in &trimmed {
        if value.is_empty() {
            bail!("{} must not be empty", key);
        }
    }

    for i in 0..trimmed.len() {
        for j in (i + 1)..trimmed.len() {
            if trimmed[i].1 == trimmed[j].1 {
                bail!(
                    "{} and {} must not share the prefix '{}'",
                    trimmed[i].0,
                    trimmed[j].0,
                    trimmed[i].1
                );
            }
        }
    }

    Ok(())
}
