// Initialization utilities
//
// Storage backend and logging/tracing setup

use anyhow::{Context, Result};
use opendal::Operator;
use orderlake_config::{LogFormat, PipelineConfig, StorageBackend};
use tracing::info;

/// Build the storage Operator for the configured backend.
pub fn init_operator(config: &PipelineConfig) -> Result<Operator> {
    let operator = match config.storage.backend {
        StorageBackend::Fs => {
            let fs = config
                .storage
                .fs
                .as_ref()
                .context("fs config required for filesystem backend")?;
            info!("using filesystem storage at: {}", fs.root);

            let builder = opendal::services::Fs::default().root(&fs.root);
            Operator::new(builder)?.finish()
        }
        StorageBackend::S3 => {
            let s3 = config
                .storage
                .s3
                .as_ref()
                .context("s3 config required for S3 backend")?;
            info!("using S3 storage: bucket={}, region={}", s3.bucket, s3.region);

            let mut builder = opendal::services::S3::default()
                .bucket(&s3.bucket)
                .region(&s3.region);

            if let Some(endpoint) = &s3.endpoint {
                builder = builder.endpoint(endpoint);
            }
            if let Some(access_key_id) = &s3.access_key_id {
                builder = builder.access_key_id(access_key_id);
            }
            if let Some(secret_access_key) = &s3.secret_access_key {
                builder = builder.secret_access_key(secret_access_key);
            }

            Operator::new(builder)?.finish()
        }
    };

    Ok(operator)
}

/// Initialize tracing/logging from the pipeline config.
pub fn init_tracing(config: &PipelineConfig) {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let env_filter =
        EnvFilter::try_new(&config.log.level).unwrap_or_else(|_| EnvFilter::new("info"));

    let registry = tracing_subscriber::registry().with(env_filter);

    match config.log.format {
        LogFormat::Json => {
            registry.with(fmt::layer().json()).init();
        }
        LogFormat::Text => {
            registry.with(fmt::layer()).init();
        }
    }
}
