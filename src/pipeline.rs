// The three pipeline stages, run strictly in order.
//
// Each stage's output is a durable artifact, not an in-memory handoff:
// enrichment reads the silver tier back from storage rather than reusing
// the batches ingest just built. That keeps every stage independently
// re-runnable against whatever the previous stage last published.

use anyhow::{Context, Result};
use arrow::array::RecordBatch;
use opendal::Operator;
use tracing::{info, warn};
use uuid::Uuid;

use orderlake_config::PipelineConfig;
use orderlake_core::aggregate::daily_restaurant_metrics;
use orderlake_core::enrich::left_join;
use orderlake_core::ingest::{ORDERS_REQUIRED_COLUMNS, RESTAURANTS_REQUIRED_COLUMNS};
use orderlake_core::parquet::split_by_date;
use orderlake_core::schema::{col, daily_metrics_schema_arc};
use orderlake_core::{CsvPlan, OrdersNormalizer, RestaurantsNormalizer};
use orderlake_storage::{list_files, read_parquet_dataset, write_partitioned, write_unpartitioned};

/// What one pipeline run did.
#[derive(Debug)]
pub struct RunSummary {
    pub run_id: String,
    pub order_rows: usize,
    pub restaurant_rows: usize,
    pub coercion_failures: usize,
    pub null_dt_rows: usize,
    pub metric_rows: usize,
}

/// Run ingest, enrich and aggregate against the given storage.
pub async fn run(config: &PipelineConfig, op: &Operator) -> Result<RunSummary> {
    let run_id = Uuid::new_v4().simple().to_string();
    info!("starting run {} ({})", run_id, config.run_name);

    let ingest = ingest_stage(config, op, &run_id).await?;
    let enriched = enrich_stage(config, op).await?;
    let metric_rows = aggregate_stage(config, op, &run_id, enriched).await?;

    info!(
        "run {} complete: {} order row(s) in, {} metric row(s) out",
        run_id, ingest.order_rows, metric_rows
    );

    Ok(RunSummary {
        run_id,
        order_rows: ingest.order_rows,
        restaurant_rows: ingest.restaurant_rows,
        coercion_failures: ingest.coercion_failures,
        null_dt_rows: ingest.null_dt_rows,
        metric_rows,
    })
}

struct IngestOutcome {
    order_rows: usize,
    restaurant_rows: usize,
    coercion_failures: usize,
    null_dt_rows: usize,
}

/// Stage 1: discover bronze CSVs, normalize, publish the silver tier.
async fn ingest_stage(
    config: &PipelineConfig,
    op: &Operator,
    run_id: &str,
) -> Result<IngestOutcome> {
    let tiers = &config.tiers;

    // Order drops can sit one or more directory levels deep; restaurant
    // drops sit directly under their prefix.
    let order_paths = list_files(op, &format!("{}/orders", tiers.bronze), ".csv", true).await?;
    let restaurant_paths =
        list_files(op, &format!("{}/restaurants", tiers.bronze), ".csv", false).await?;
    info!(
        "discovered {} order file(s), {} restaurant file(s)",
        order_paths.len(),
        restaurant_paths.len()
    );

    let order_files = read_all(op, &order_paths).await?;
    let restaurant_files = read_all(op, &restaurant_paths).await?;

    let plan = CsvPlan::from_files(ORDERS_REQUIRED_COLUMNS, &order_files)?;
    let mut normalizer = OrdersNormalizer::new(&plan);
    for (name, bytes) in &order_files {
        let file_stats = normalizer.append_csv(name, bytes)?;
        if file_stats.coercion_failures() > 0 || file_stats.null_dt_rows > 0 {
            warn!(
                "{}: {} field(s) coerced to null, {} row(s) without a partition date",
                name,
                file_stats.coercion_failures(),
                file_stats.null_dt_rows
            );
        }
    }
    let (orders, stats) = normalizer.finish()?;

    let plan = CsvPlan::from_files(RESTAURANTS_REQUIRED_COLUMNS, &restaurant_files)?;
    let mut normalizer = RestaurantsNormalizer::new(&plan);
    for (name, bytes) in &restaurant_files {
        normalizer.append_csv(name, bytes)?;
    }
    let restaurants = normalizer.finish()?;
    let restaurant_rows = restaurants.num_rows();

    let parts = split_by_date(&orders, col::DT)?;
    let summary = write_partitioned(op, &format!("{}/orders", tiers.silver), &parts, run_id)
        .await
        .context("publishing silver orders")?;
    info!(
        "silver orders: {} row(s) across {} partition file(s)",
        summary.rows, summary.files
    );

    let summary = write_unpartitioned(
        op,
        &format!("{}/restaurants", tiers.silver),
        &restaurants,
        run_id,
    )
    .await
    .context("publishing silver restaurants")?;
    info!("silver restaurants: {} row(s)", summary.rows);

    Ok(IngestOutcome {
        order_rows: stats.rows,
        restaurant_rows,
        coercion_failures: stats.coercion_failures(),
        null_dt_rows: stats.null_dt_rows,
    })
}

/// Stage 2: read the silver tier back and left-join orders to restaurants.
async fn enrich_stage(config: &PipelineConfig, op: &Operator) -> Result<Option<RecordBatch>> {
    let tiers = &config.tiers;
    let orders = read_parquet_dataset(op, &format!("{}/orders", tiers.silver))
        .await
        .context("reading silver orders")?;
    let restaurants = read_parquet_dataset(op, &format!("{}/restaurants", tiers.silver))
        .await
        .context("reading silver restaurants")?;

    match (orders, restaurants) {
        (Some(orders), Some(restaurants)) => {
            let enriched = left_join(&orders, &restaurants)?;
            info!("enriched {} order row(s)", enriched.num_rows());
            Ok(Some(enriched))
        }
        (Some(_), None) => anyhow::bail!("silver restaurants dataset is missing"),
        (None, _) => {
            info!("silver orders are empty; nothing to enrich");
            Ok(None)
        }
    }
}

/// Stage 3: aggregate delivered orders and publish the gold tier.
async fn aggregate_stage(
    config: &PipelineConfig,
    op: &Operator,
    run_id: &str,
    enriched: Option<RecordBatch>,
) -> Result<usize> {
    let metrics = match &enriched {
        Some(batch) => daily_restaurant_metrics(batch)?,
        None => RecordBatch::new_empty(daily_metrics_schema_arc()),
    };

    let parts = split_by_date(&metrics, col::DT)?;
    let dest = format!("{}/daily_restaurant_metrics", config.tiers.gold);
    let summary = write_partitioned(op, &dest, &parts, run_id)
        .await
        .context("publishing gold daily metrics")?;
    info!(
        "gold daily_restaurant_metrics: {} row(s) across {} partition file(s)",
        summary.rows, summary.files
    );

    Ok(metrics.num_rows())
}

async fn read_all(op: &Operator, paths: &[String]) -> Result<Vec<(String, Vec<u8>)>> {
    let mut files = Vec::with_capacity(paths.len());
    for path in paths {
        let bytes = op
            .read(path)
            .await
            .with_context(|| format!("reading {}", path))?
            .to_vec();
        files.push((path.clone(), bytes));
    }
    Ok(files)
}
