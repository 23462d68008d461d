// Dataset read and publish operations.
//
// Datasets are directories of Parquet files, optionally Hive-partitioned
// by date. Writes are full replacements: files are staged under a
// run-scoped prefix, the previous generation is removed, and the staged
// objects are renamed into place. On filesystem backends the renames are
// metadata operations; on object stores they narrow, but do not
// eliminate, the window in which readers can see a partial generation.

use arrow::array::RecordBatch;
use arrow::compute::concat_batches;
use chrono::NaiveDate;
use opendal::{ErrorKind, Operator};
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use tracing::debug;

use orderlake_core::parquet::{attach_date, parse_partition_dir, partition_dir, write_parquet};
use orderlake_core::schema::col;

use crate::error::{Result, StorageError};

/// What a dataset write published.
#[derive(Debug, Clone, Copy)]
pub struct DatasetSummary {
    pub files: usize,
    pub rows: usize,
}

/// List files under a prefix with the given extension, sorted.
///
/// A missing prefix is an empty dataset, not an error.
pub async fn list_files(
    op: &Operator,
    prefix: &str,
    extension: &str,
    recursive: bool,
) -> Result<Vec<String>> {
    let dir = dir_path(prefix);
    let entries = match op.list_with(&dir).recursive(recursive).await {
        Ok(entries) => entries,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(e.into()),
    };

    let mut files: Vec<String> = entries
        .into_iter()
        .map(|entry| entry.path().to_string())
        .filter(|path| path.ends_with(extension))
        .collect();
    files.sort();
    Ok(files)
}

/// Read a whole Parquet dataset back into one RecordBatch.
///
/// Files under `dt=...` directories get their partition date re-attached
/// as a `dt` column; files directly under the prefix are unpartitioned.
/// Returns `None` for an empty dataset.
pub async fn read_parquet_dataset(op: &Operator, prefix: &str) -> Result<Option<RecordBatch>> {
    let dir = dir_path(prefix);
    let files = list_files(op, prefix, ".parquet", true).await?;
    if files.is_empty() {
        return Ok(None);
    }

    let mut batches = Vec::new();
    for path in &files {
        let partition = partition_for(&dir, path)?;
        let bytes = op.read(path).await?.to_bytes();
        let builder = ParquetRecordBatchReaderBuilder::try_new(bytes)?;
        let file_schema = builder.schema().clone();

        let mut file_batches: Vec<RecordBatch> =
            builder.build()?.collect::<std::result::Result<_, _>>()?;
        if file_batches.is_empty() {
            // A zero-row file still contributes its schema.
            file_batches.push(RecordBatch::new_empty(file_schema));
        }

        for batch in file_batches {
            let batch = match partition {
                Some(date) => attach_date(&batch, col::DT, date).map_err(|source| {
                    StorageError::AttachPartition {
                        path: path.clone(),
                        source,
                    }
                })?,
                None => batch,
            };
            batches.push(batch);
        }
    }

    let schema = batches[0].schema();
    Ok(Some(concat_batches(&schema, &batches)?))
}

/// Publish a date-partitioned dataset, fully replacing any previous
/// generation. Each partition becomes `dt=<date>/part-00000.parquet`.
pub async fn write_partitioned(
    op: &Operator,
    dest: &str,
    parts: &[(Option<NaiveDate>, RecordBatch)],
    run_id: &str,
) -> Result<DatasetSummary> {
    let files: Vec<(String, &RecordBatch)> = parts
        .iter()
        .map(|(date, batch)| {
            (
                format!("{}/part-00000.parquet", partition_dir(*date)),
                batch,
            )
        })
        .collect();
    write_dataset(op, dest, &files, run_id).await
}

/// Publish an unpartitioned single-file dataset, fully replacing any
/// previous generation.
pub async fn write_unpartitioned(
    op: &Operator,
    dest: &str,
    batch: &RecordBatch,
    run_id: &str,
) -> Result<DatasetSummary> {
    write_dataset(op, dest, &[("part-00000.parquet".to_string(), batch)], run_id).await
}

async fn write_dataset(
    op: &Operator,
    dest: &str,
    files: &[(String, &RecordBatch)],
    run_id: &str,
) -> Result<DatasetSummary> {
    let dest_dir = dir_path(dest);
    let staging_dir = format!("{}.staging-{}/", dest_dir.trim_end_matches('/'), run_id);

    let mut rows = 0;
    for (rel, batch) in files {
        let path = format!("{}{}", staging_dir, rel);
        let bytes = write_parquet(batch).map_err(|source| StorageError::Encode {
            path: path.clone(),
            source,
        })?;
        op.write(&path, bytes).await?;
        rows += batch.num_rows();
    }

    // Swap the staged generation into place.
    remove_prefix(op, &dest_dir).await?;
    for (rel, _) in files {
        op.rename(
            &format!("{}{}", staging_dir, rel),
            &format!("{}{}", dest_dir, rel),
        )
        .await?;
    }
    remove_prefix(op, &staging_dir).await?;

    debug!(
        "published {} file(s), {} row(s) to {}",
        files.len(),
        rows,
        dest_dir
    );
    Ok(DatasetSummary {
        files: files.len(),
        rows,
    })
}

async fn remove_prefix(op: &Operator, dir: &str) -> Result<()> {
    match op.remove_all(dir).await {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e.into()),
    }
}

fn dir_path(prefix: &str) -> String {
    let trimmed = prefix.trim_matches('/');
    format!("{}/", trimmed)
}

/// Partition date of a file inside a dataset directory.
///
/// `None` means the file is unpartitioned (directly under the prefix);
/// `Some(None)` is the null partition.
fn partition_for(dataset_dir: &str, path: &str) -> Result<Option<Option<NaiveDate>>> {
    let relative = path.strip_prefix(dataset_dir).unwrap_or(path);

    match relative.split_once('/') {
        None => Ok(None),
        Some((dir, _)) => match parse_partition_dir(dir) {
            Some(date) => Ok(Some(date)),
            None => Err(StorageError::UnrecognizedPartition {
                dir: dir.to_string(),
                path: path.to_string(),
            }),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use arrow::array::{Array, Date32Array, Int32Array};
    use arrow::datatypes::{DataType, Field, Schema};
    use std::sync::Arc;

    fn memory_op() -> Operator {
        Operator::new(opendal::services::Memory::default())
            .unwrap()
            .finish()
    }

    fn batch(values: &[i32]) -> RecordBatch {
        let schema = Arc::new(Schema::new(vec![Field::new("v", DataType::Int32, false)]));
        RecordBatch::try_new(schema, vec![Arc::new(Int32Array::from(values.to_vec()))]).unwrap()
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[tokio::test]
    async fn missing_prefix_reads_as_empty_dataset() {
        let op = memory_op();
        assert!(list_files(&op, "nope", ".parquet", true).await.unwrap().is_empty());
        assert!(read_parquet_dataset(&op, "nope").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn partitioned_round_trip_reattaches_dates() {
        let op = memory_op();
        let parts = vec![
            (Some(date(2024, 1, 15)), batch(&[1, 2])),
            (None, batch(&[3])),
        ];

        let summary = write_partitioned(&op, "silver/orders", &parts, "run1")
            .await
            .unwrap();
        assert_eq!(summary.files, 2);
        assert_eq!(summary.rows, 3);

        let combined = read_parquet_dataset(&op, "silver/orders")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(combined.num_rows(), 3);

        let dt = combined
            .column_by_name("dt")
            .unwrap()
            .as_any()
            .downcast_ref::<Date32Array>()
            .unwrap();
        assert_eq!(dt.null_count(), 1);
    }

    #[tokio::test]
    async fn publish_replaces_the_previous_generation() {
        let op = memory_op();
        let first = vec![
            (Some(date(2024, 1, 15)), batch(&[1])),
            (Some(date(2024, 1, 16)), batch(&[2])),
        ];
        write_partitioned(&op, "gold/metrics", &first, "run1")
            .await
            .unwrap();

        let second = vec![(Some(date(2024, 1, 17)), batch(&[3]))];
        write_partitioned(&op, "gold/metrics", &second, "run2")
            .await
            .unwrap();

        let files = list_files(&op, "gold/metrics", ".parquet", true).await.unwrap();
        assert_eq!(files, vec!["gold/metrics/dt=2024-01-17/part-00000.parquet"]);

        // No staging debris anywhere under the parent prefix.
        let all = list_files(&op, "gold", ".parquet", true).await.unwrap();
        assert!(all.iter().all(|path| !path.contains(".staging-")), "{:?}", all);
    }

    #[tokio::test]
    async fn unpartitioned_round_trip() {
        let op = memory_op();
        write_unpartitioned(&op, "silver/restaurants", &batch(&[7, 8]), "run1")
            .await
            .unwrap();

        let combined = read_parquet_dataset(&op, "silver/restaurants")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(combined.num_rows(), 2);
        assert!(combined.column_by_name("dt").is_none());
    }

    #[test]
    fn partition_for_classifies_paths() {
        assert_eq!(
            partition_for("silver/orders/", "silver/orders/dt=2024-01-15/part-00000.parquet")
                .unwrap(),
            Some(Some(date(2024, 1, 15)))
        );
        assert_eq!(
            partition_for(
                "silver/orders/",
                "silver/orders/dt=__HIVE_DEFAULT_PARTITION__/part-00000.parquet"
            )
            .unwrap(),
            Some(None)
        );
        assert_eq!(
            partition_for("silver/restaurants/", "silver/restaurants/part-00000.parquet").unwrap(),
            None
        );
        assert!(partition_for("silver/orders/", "silver/orders/junk/part-00000.parquet").is_err());
    }
}
