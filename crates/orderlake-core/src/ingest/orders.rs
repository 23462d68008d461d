// Convert raw order CSV records to a normalized Arrow RecordBatch.
//
// Column builders are appended row by row; each file's columns are located
// through its own header, so files may order columns differently and still
// normalize into one schema.

use anyhow::{Context, Result};
use arrow::array::{
    ArrayRef, Date32Builder, Float64Builder, Int32Builder, RecordBatch, StringBuilder,
    TimestampMicrosecondBuilder,
};
use arrow::datatypes::Schema;
use csv::StringRecord;
use std::sync::Arc;

use super::{date32_from_micros, parse_timestamp_micros, CsvPlan};
use crate::delivery::is_late;
use crate::schema::{col, normalized_orders_schema};

/// Columns every order file must carry. Anything else passes through.
pub const ORDERS_REQUIRED_COLUMNS: &[&str] = &[
    col::RESTAURANT_ID,
    col::ORDER_TS,
    col::DELIVERED_TS,
    col::ORDER_VALUE,
    col::PROMISED_MINS,
    col::STATUS,
    col::CITY,
];

/// Counts tracked while normalizing order records.
///
/// A "bad" field had non-empty text that failed to parse and was coerced
/// to null; empty fields are null without being counted.
#[derive(Debug, Clone, Copy, Default)]
pub struct IngestStats {
    pub rows: usize,
    pub bad_order_ts: usize,
    pub bad_delivered_ts: usize,
    pub bad_order_value: usize,
    pub bad_promised_mins: usize,
    /// Rows whose order timestamp never parsed; they land in the null
    /// partition rather than a calendar date.
    pub null_dt_rows: usize,
}

impl IngestStats {
    pub fn coercion_failures(&self) -> usize {
        self.bad_order_ts + self.bad_delivered_ts + self.bad_order_value + self.bad_promised_mins
    }

    fn since(&self, earlier: &IngestStats) -> IngestStats {
        IngestStats {
            rows: self.rows - earlier.rows,
            bad_order_ts: self.bad_order_ts - earlier.bad_order_ts,
            bad_delivered_ts: self.bad_delivered_ts - earlier.bad_delivered_ts,
            bad_order_value: self.bad_order_value - earlier.bad_order_value,
            bad_promised_mins: self.bad_promised_mins - earlier.bad_promised_mins,
            null_dt_rows: self.null_dt_rows - earlier.null_dt_rows,
        }
    }
}

/// Converts raw order CSV records to the normalized orders batch.
pub struct OrdersNormalizer {
    schema: Arc<Schema>,
    passthrough: Vec<String>,

    restaurant_id: StringBuilder,
    order_ts: TimestampMicrosecondBuilder,
    delivered_ts: TimestampMicrosecondBuilder,
    order_value: Float64Builder,
    promised_mins: Int32Builder,
    status: StringBuilder,
    city: StringBuilder,
    late_delivery: Int32Builder,
    dt: Date32Builder,
    extras: Vec<StringBuilder>,

    stats: IngestStats,
}

/// Per-file positions of the plan's columns in that file's header.
struct ColumnIndexes {
    restaurant_id: usize,
    order_ts: usize,
    delivered_ts: usize,
    order_value: usize,
    promised_mins: usize,
    status: usize,
    city: usize,
    extras: Vec<Option<usize>>,
}

impl OrdersNormalizer {
    pub fn new(plan: &CsvPlan) -> Self {
        let passthrough = plan.passthrough().to_vec();

        Self {
            schema: normalized_orders_schema(&passthrough),
            extras: passthrough.iter().map(|_| StringBuilder::new()).collect(),
            passthrough,
            restaurant_id: StringBuilder::new(),
            order_ts: TimestampMicrosecondBuilder::new(),
            delivered_ts: TimestampMicrosecondBuilder::new(),
            order_value: Float64Builder::new(),
            promised_mins: Int32Builder::new(),
            status: StringBuilder::new(),
            city: StringBuilder::new(),
            late_delivery: Int32Builder::new(),
            dt: Date32Builder::new(),
            stats: IngestStats::default(),
        }
    }

    pub fn schema(&self) -> Arc<Schema> {
        Arc::clone(&self.schema)
    }

    /// Append every record of one CSV file.
    ///
    /// Returns the stats delta for this file, so callers can report
    /// coercion failures per input file.
    pub fn append_csv(&mut self, name: &str, bytes: &[u8]) -> Result<IngestStats> {
        let before = self.stats;

        let mut reader = csv::ReaderBuilder::new()
            .flexible(true)
            .from_reader(bytes);
        let header = reader
            .headers()
            .with_context(|| format!("reading CSV header of {}", name))?
            .clone();
        let columns = self.resolve_columns(name, &header)?;

        for record in reader.records() {
            let record = record.with_context(|| format!("reading CSV records of {}", name))?;
            self.append_record(&record, &columns);
        }

        Ok(self.stats.since(&before))
    }

    pub fn finish(mut self) -> Result<(RecordBatch, IngestStats)> {
        let mut columns: Vec<ArrayRef> = vec![
            Arc::new(self.restaurant_id.finish()),
            Arc::new(self.order_ts.finish()),
            Arc::new(self.delivered_ts.finish()),
            Arc::new(self.order_value.finish()),
            Arc::new(self.promised_mins.finish()),
            Arc::new(self.status.finish()),
            Arc::new(self.city.finish()),
            Arc::new(self.late_delivery.finish()),
            Arc::new(self.dt.finish()),
        ];
        for mut extra in self.extras {
            columns.push(Arc::new(extra.finish()));
        }

        let batch = RecordBatch::try_new(Arc::clone(&self.schema), columns)
            .context("assembling normalized orders batch")?;
        Ok((batch, self.stats))
    }

    fn resolve_columns(&self, name: &str, header: &StringRecord) -> Result<ColumnIndexes> {
        let find = |column: &str| -> Result<usize> {
            header
                .iter()
                .position(|h| h == column)
                .with_context(|| format!("column '{}' missing from header of {}", column, name))
        };

        Ok(ColumnIndexes {
            restaurant_id: find(col::RESTAURANT_ID)?,
            order_ts: find(col::ORDER_TS)?,
            delivered_ts: find(col::DELIVERED_TS)?,
            order_value: find(col::ORDER_VALUE)?,
            promised_mins: find(col::PROMISED_MINS)?,
            status: find(col::STATUS)?,
            city: find(col::CITY)?,
            extras: self
                .passthrough
                .iter()
                .map(|column| header.iter().position(|h| h == column))
                .collect(),
        })
    }

    fn append_record(&mut self, record: &StringRecord, columns: &ColumnIndexes) {
        let text = |idx: usize| record.get(idx).map(str::trim).filter(|s| !s.is_empty());

        let status = text(columns.status);
        let order_us = coerce(
            text(columns.order_ts),
            parse_timestamp_micros,
            &mut self.stats.bad_order_ts,
        );
        let delivered_us = coerce(
            text(columns.delivered_ts),
            parse_timestamp_micros,
            &mut self.stats.bad_delivered_ts,
        );
        let order_value = coerce(
            text(columns.order_value),
            |s| s.parse::<f64>().ok(),
            &mut self.stats.bad_order_value,
        );
        let promised_mins = coerce(
            text(columns.promised_mins),
            |s| s.parse::<i32>().ok(),
            &mut self.stats.bad_promised_mins,
        );

        self.restaurant_id.append_option(text(columns.restaurant_id));
        self.order_ts.append_option(order_us);
        self.delivered_ts.append_option(delivered_us);
        self.order_value.append_option(order_value);
        self.promised_mins.append_option(promised_mins);
        self.status.append_option(status);
        self.city.append_option(text(columns.city));

        let late = is_late(status, order_us, delivered_us, promised_mins);
        self.late_delivery.append_value(i32::from(late));

        match order_us {
            Some(us) => self.dt.append_value(date32_from_micros(us)),
            None => {
                self.dt.append_null();
                self.stats.null_dt_rows += 1;
            }
        }

        // Passthrough values are carried untouched, not trimmed.
        for (builder, idx) in self.extras.iter_mut().zip(&columns.extras) {
            builder.append_option(idx.and_then(|i| record.get(i)));
        }

        self.stats.rows += 1;
    }
}

fn coerce<T>(
    raw: Option<&str>,
    parse: impl Fn(&str) -> Option<T>,
    failures: &mut usize,
) -> Option<T> {
    let raw = raw?;
    let value = parse(raw);
    if value.is_none() {
        *failures += 1;
    }
    value
}
