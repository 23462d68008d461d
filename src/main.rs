use anyhow::{Context, Result};
use clap::Parser;
use orderlake_config::PipelineConfig;
use std::path::PathBuf;

/// Batch order ETL: bronze CSVs to silver and gold Parquet
#[derive(Parser)]
#[command(name = "orderlake")]
#[command(version)]
#[command(about = "Batch order ETL: bronze CSVs to silver and gold Parquet", long_about = None)]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Storage root directory (filesystem backend only)
    #[arg(short, long, value_name = "DIR")]
    data_root: Option<PathBuf>,

    /// Identifying name for this run
    #[arg(long, value_name = "NAME")]
    run_name: Option<String>,

    /// Log level: trace, debug, info, warn, error
    #[arg(short = 'v', long, value_name = "LEVEL")]
    log_level: Option<String>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("Failed to build tokio runtime")?
        .block_on(async_main(cli))
}

async fn async_main(cli: Cli) -> Result<()> {
    let mut config = if let Some(config_path) = &cli.config {
        PipelineConfig::load_from_path(config_path)
            .with_context(|| format!("Failed to load config from {}", config_path.display()))?
    } else {
        PipelineConfig::load_or_default().context("Failed to load configuration")?
    };

    apply_cli_overrides(&mut config, &cli)?;
    config.validate()?;

    orderlake::init::init_tracing(&config);
    let operator = orderlake::init::init_operator(&config)?;

    let summary = orderlake::run(&config, &operator).await?;
    tracing::info!(
        "done: {} order row(s) normalized, {} coercion failure(s), {} metric row(s) published",
        summary.order_rows,
        summary.coercion_failures,
        summary.metric_rows
    );
    Ok(())
}

fn apply_cli_overrides(config: &mut PipelineConfig, cli: &Cli) -> Result<()> {
    use orderlake_config::{FsConfig, StorageBackend};

    if let Some(root) = &cli.data_root {
        if config.storage.backend != StorageBackend::Fs {
            anyhow::bail!(
                "--data-root only works with the filesystem backend, but backend is '{}'",
                config.storage.backend
            );
        }
        config.storage.fs.get_or_insert_with(FsConfig::default).root =
            root.to_string_lossy().to_string();
    }

    if let Some(name) = &cli.run_name {
        config.run_name = name.clone();
    }

    if let Some(level) = &cli.log_level {
        config.log.level = level.clone();
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use orderlake_config::StorageBackend;

    #[test]
    fn cli_overrides_win_over_config_values() {
        let cli = Cli {
            config: None,
            data_root: Some(PathBuf::from("/tmp/lake")),
            run_name: Some("adhoc".to_string()),
            log_level: Some("debug".to_string()),
        };

        let mut config = PipelineConfig::default();
        apply_cli_overrides(&mut config, &cli).unwrap();

        assert_eq!(config.storage.fs.as_ref().unwrap().root, "/tmp/lake");
        assert_eq!(config.run_name, "adhoc");
        assert_eq!(config.log.level, "debug");
    }

    #[test]
    fn data_root_requires_the_filesystem_backend() {
        let cli = Cli {
            config: None,
            data_root: Some(PathBuf::from("/tmp/lake")),
            run_name: None,
            log_level: None,
        };

        let mut config = PipelineConfig::default();
        config.storage.backend = StorageBackend::S3;
        assert!(apply_cli_overrides(&mut config, &cli).is_err());
    }
}
