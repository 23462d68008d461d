// Hive-style date partitioning for the silver and gold tiers.
//
// Partition directories look like `dt=2024-01-15`; rows whose partition
// key is null land under the Hive default partition name, which is what
// the upstream lakehouse layout expects. The partition value lives in the
// path, so `split_by_date` projects the date column away before writing
// and `attach_date` restores it on read-back.

use anyhow::{Context, Result};
use arrow::array::{Array, ArrayRef, BooleanArray, Date32Array, RecordBatch};
use arrow::compute::filter_record_batch;
use arrow::datatypes::{DataType, Field, Schema};
use chrono::{Datelike, NaiveDate};
use std::collections::BTreeSet;
use std::sync::Arc;

use crate::column::date32_column;

/// Directory name for rows with a null partition key.
pub const HIVE_DEFAULT_PARTITION: &str = "__HIVE_DEFAULT_PARTITION__";

/// `num_days_from_ce` of 1970-01-01.
const UNIX_EPOCH_DAYS_FROM_CE: i32 = 719_163;

/// Partition directory name for a date, e.g. `dt=2024-01-15`.
pub fn partition_dir(date: Option<NaiveDate>) -> String {
    match date {
        Some(date) => format!("dt={}", date.format("%Y-%m-%d")),
        None => format!("dt={}", HIVE_DEFAULT_PARTITION),
    }
}

/// Parse a partition directory name back to its date.
///
/// Returns `None` if the name is not a recognized partition directory;
/// `Some(None)` is the null (Hive default) partition.
pub fn parse_partition_dir(dir: &str) -> Option<Option<NaiveDate>> {
    let value = dir.strip_prefix("dt=")?;
    if value == HIVE_DEFAULT_PARTITION {
        return Some(None);
    }
    NaiveDate::parse_from_str(value, "%Y-%m-%d").ok().map(Some)
}

fn date_from_days(days: i32) -> Result<NaiveDate> {
    NaiveDate::from_num_days_from_ce_opt(days + UNIX_EPOCH_DAYS_FROM_CE)
        .with_context(|| format!("partition date out of range: {} days since epoch", days))
}

fn days_from_date(date: NaiveDate) -> i32 {
    date.num_days_from_ce() - UNIX_EPOCH_DAYS_FROM_CE
}

/// Slice a batch into one batch per distinct date, with the date column
/// projected away. Partitions come out date-ordered, null partition first.
pub fn split_by_date(
    batch: &RecordBatch,
    date_column: &str,
) -> Result<Vec<(Option<NaiveDate>, RecordBatch)>> {
    let dates = date32_column(batch, date_column)?;

    let mut distinct: BTreeSet<Option<i32>> = BTreeSet::new();
    for row in 0..dates.len() {
        distinct.insert(dates.is_valid(row).then(|| dates.value(row)));
    }

    let date_idx = batch
        .schema()
        .index_of(date_column)
        .context("locating the partition column")?;
    let keep: Vec<usize> = (0..batch.num_columns()).filter(|&i| i != date_idx).collect();

    let mut parts = Vec::with_capacity(distinct.len());
    for value in distinct {
        let mask = BooleanArray::from_iter(
            (0..dates.len()).map(|row| Some(dates.is_valid(row).then(|| dates.value(row)) == value)),
        );
        let filtered = filter_record_batch(batch, &mask)?;
        let projected = filtered.project(&keep)?;
        let date = value.map(date_from_days).transpose()?;
        parts.push((date, projected));
    }

    Ok(parts)
}

/// Append a constant date column (the partition value) to a batch read
/// back from one partition directory.
pub fn attach_date(
    batch: &RecordBatch,
    date_column: &str,
    date: Option<NaiveDate>,
) -> Result<RecordBatch> {
    let days = date.map(days_from_date);
    let column: ArrayRef = Arc::new(Date32Array::from(vec![days; batch.num_rows()]));

    let mut fields: Vec<Field> = batch
        .schema()
        .fields()
        .iter()
        .map(|f| f.as_ref().clone())
        .collect();
    fields.push(Field::new(date_column, DataType::Date32, true));

    let mut columns = batch.columns().to_vec();
    columns.push(column);

    RecordBatch::try_new(Arc::new(Schema::new(fields)), columns)
        .context("attaching partition date column")
}
