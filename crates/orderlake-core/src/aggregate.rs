// Daily per-restaurant metrics over enriched, delivered-only orders.
//
// Grouping runs over an ordered map so the output batch is deterministic
// for a given input, which keeps re-runs row-set identical.

use anyhow::{Context, Result};
use arrow::array::{
    ArrayRef, Date32Builder, Float64Builder, Int64Builder, RecordBatch, StringBuilder,
};
use arrow::array::Array;
use std::collections::BTreeMap;
use std::sync::Arc;

use crate::column::{date32_column, f64_column, i32_column, str_at, string_column, timestamp_column};
use crate::delivery::{delivery_seconds, STATUS_DELIVERED};
use crate::schema::{col, daily_metrics_schema_arc};

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
struct GroupKey {
    dt: Option<i32>,
    restaurant_id: Option<String>,
    name: Option<String>,
    cuisine: Option<String>,
    city: Option<String>,
}

#[derive(Debug, Default)]
struct GroupAcc {
    orders_delivered: i64,
    /// None until the group sees a non-null order value; a group of
    /// all-null values keeps a null gmv.
    gmv: Option<f64>,
    duration_mins_sum: f64,
    duration_rows: i64,
    late_count: i64,
}

/// Aggregate enriched orders into daily restaurant metrics.
///
/// Only rows with status `DELIVERED` contribute. The delivery-duration
/// mean excludes rows with a missing duration from both numerator and
/// denominator; `late_rate` is derived after aggregation and is always
/// well-defined because every emitted group counted at least one order.
pub fn daily_restaurant_metrics(enriched: &RecordBatch) -> Result<RecordBatch> {
    let dt = date32_column(enriched, col::DT)?;
    let restaurant_id = string_column(enriched, col::RESTAURANT_ID)?;
    let name = string_column(enriched, col::NAME)?;
    let cuisine = string_column(enriched, col::CUISINE)?;
    let city = string_column(enriched, col::CITY)?;
    let status = string_column(enriched, col::STATUS)?;
    let order_ts = timestamp_column(enriched, col::ORDER_TS)?;
    let delivered_ts = timestamp_column(enriched, col::DELIVERED_TS)?;
    let order_value = f64_column(enriched, col::ORDER_VALUE)?;
    let late_delivery = i32_column(enriched, col::LATE_DELIVERY)?;

    let mut groups: BTreeMap<GroupKey, GroupAcc> = BTreeMap::new();

    for row in 0..enriched.num_rows() {
        if str_at(status, row) != Some(STATUS_DELIVERED) {
            continue;
        }

        let key = GroupKey {
            dt: dt.is_valid(row).then(|| dt.value(row)),
            restaurant_id: str_at(restaurant_id, row).map(str::to_string),
            name: str_at(name, row).map(str::to_string),
            cuisine: str_at(cuisine, row).map(str::to_string),
            city: str_at(city, row).map(str::to_string),
        };
        let acc = groups.entry(key).or_default();

        acc.orders_delivered += 1;
        if order_value.is_valid(row) {
            *acc.gmv.get_or_insert(0.0) += order_value.value(row);
        }

        let order_us = order_ts.is_valid(row).then(|| order_ts.value(row));
        let delivered_us = delivered_ts.is_valid(row).then(|| delivered_ts.value(row));
        if let Some(secs) = delivery_seconds(order_us, delivered_us) {
            acc.duration_mins_sum += secs as f64 / 60.0;
            acc.duration_rows += 1;
        }

        acc.late_count += i64::from(late_delivery.value(row));
    }

    build_metrics_batch(groups)
}

fn build_metrics_batch(groups: BTreeMap<GroupKey, GroupAcc>) -> Result<RecordBatch> {
    let mut dt = Date32Builder::new();
    let mut restaurant_id = StringBuilder::new();
    let mut name = StringBuilder::new();
    let mut cuisine = StringBuilder::new();
    let mut city = StringBuilder::new();
    let mut orders_delivered = Int64Builder::new();
    let mut gmv = Float64Builder::new();
    let mut avg_delivery_mins = Float64Builder::new();
    let mut late_count = Int64Builder::new();
    let mut late_rate = Float64Builder::new();

    for (key, acc) in groups {
        dt.append_option(key.dt);
        restaurant_id.append_option(key.restaurant_id);
        name.append_option(key.name);
        cuisine.append_option(key.cuisine);
        city.append_option(key.city);
        orders_delivered.append_value(acc.orders_delivered);
        gmv.append_option(acc.gmv);
        avg_delivery_mins.append_option(
            (acc.duration_rows > 0).then(|| acc.duration_mins_sum / acc.duration_rows as f64),
        );
        late_count.append_value(acc.late_count);
        late_rate.append_value(acc.late_count as f64 / acc.orders_delivered as f64);
    }

    let columns: Vec<ArrayRef> = vec![
        Arc::new(dt.finish()),
        Arc::new(restaurant_id.finish()),
        Arc::new(name.finish()),
        Arc::new(cuisine.finish()),
        Arc::new(city.finish()),
        Arc::new(orders_delivered.finish()),
        Arc::new(gmv.finish()),
        Arc::new(avg_delivery_mins.finish()),
        Arc::new(late_count.finish()),
        Arc::new(late_rate.finish()),
    ];

    RecordBatch::try_new(daily_metrics_schema_arc(), columns)
        .context("assembling daily metrics batch")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::enrich::left_join;
    use crate::ingest::{
        CsvPlan, OrdersNormalizer, RestaurantsNormalizer, ORDERS_REQUIRED_COLUMNS,
        RESTAURANTS_REQUIRED_COLUMNS,
    };
    use arrow::array::{Float64Array, Int64Array};

    fn enriched(order_rows: &str, restaurant_rows: &str) -> RecordBatch {
        let orders_csv = format!(
            "restaurant_id,order_ts,delivered_ts,order_value,promised_mins,status,city\n{}",
            order_rows
        );
        let files = vec![("o.csv".to_string(), orders_csv.into_bytes())];
        let plan = CsvPlan::from_files(ORDERS_REQUIRED_COLUMNS, &files).unwrap();
        let mut normalizer = OrdersNormalizer::new(&plan);
        normalizer.append_csv("o.csv", &files[0].1).unwrap();
        let (orders, _) = normalizer.finish().unwrap();

        let restaurants_csv = format!("restaurant_id,name,cuisine\n{}", restaurant_rows);
        let files = vec![("r.csv".to_string(), restaurants_csv.into_bytes())];
        let plan = CsvPlan::from_files(RESTAURANTS_REQUIRED_COLUMNS, &files).unwrap();
        let mut normalizer = RestaurantsNormalizer::new(&plan);
        normalizer.append_csv("r.csv", &files[0].1).unwrap();
        let restaurants = normalizer.finish().unwrap();

        left_join(&orders, &restaurants).unwrap()
    }

    fn f64_col<'a>(batch: &'a RecordBatch, name: &str) -> &'a Float64Array {
        batch
            .column_by_name(name)
            .unwrap()
            .as_any()
            .downcast_ref()
            .unwrap()
    }

    fn i64_col<'a>(batch: &'a RecordBatch, name: &str) -> &'a Int64Array {
        batch
            .column_by_name(name)
            .unwrap()
            .as_any()
            .downcast_ref()
            .unwrap()
    }

    #[test]
    fn two_orders_one_late_produce_the_expected_group() {
        let batch = enriched(
            "r1,2024-01-15 12:00:00,2024-01-15 12:31:00,10.0,30,DELIVERED,Lisbon\n\
             r1,2024-01-15 13:00:00,2024-01-15 13:20:00,20.0,30,DELIVERED,Lisbon\n",
            "r1,Casa Alta,portuguese\n",
        );
        let metrics = daily_restaurant_metrics(&batch).unwrap();

        assert_eq!(metrics.num_rows(), 1);
        assert_eq!(i64_col(&metrics, "orders_delivered").value(0), 2);
        assert_eq!(f64_col(&metrics, "gmv").value(0), 30.0);
        assert_eq!(i64_col(&metrics, "late_count").value(0), 1);
        assert_eq!(f64_col(&metrics, "late_rate").value(0), 0.5);
        // Durations of 31 and 20 minutes average to 25.5.
        assert_eq!(f64_col(&metrics, "avg_delivery_mins").value(0), 25.5);
    }

    #[test]
    fn non_delivered_orders_do_not_contribute() {
        let batch = enriched(
            "r1,2024-01-15 12:00:00,2024-01-15 12:31:00,10.0,30,DELIVERED,Lisbon\n\
             r1,2024-01-15 12:00:00,,99.0,30,CANCELLED,Lisbon\n\
             r1,2024-01-15 12:00:00,,50.0,30,NEW,Lisbon\n",
            "r1,Casa Alta,portuguese\n",
        );
        let metrics = daily_restaurant_metrics(&batch).unwrap();

        assert_eq!(metrics.num_rows(), 1);
        assert_eq!(i64_col(&metrics, "orders_delivered").value(0), 1);
        assert_eq!(f64_col(&metrics, "gmv").value(0), 10.0);
    }

    #[test]
    fn null_durations_are_excluded_from_the_mean() {
        // Second order is delivered but its delivered_ts never parsed, so
        // it counts toward gmv and the group size but not the mean.
        let batch = enriched(
            "r1,2024-01-15 12:00:00,2024-01-15 12:30:00,10.0,30,DELIVERED,Lisbon\n\
             r1,2024-01-15 13:00:00,garbled,20.0,30,DELIVERED,Lisbon\n",
            "r1,Casa Alta,portuguese\n",
        );
        let metrics = daily_restaurant_metrics(&batch).unwrap();

        assert_eq!(metrics.num_rows(), 1);
        assert_eq!(i64_col(&metrics, "orders_delivered").value(0), 2);
        assert_eq!(f64_col(&metrics, "avg_delivery_mins").value(0), 30.0);
    }

    #[test]
    fn all_null_durations_yield_a_null_mean() {
        let batch = enriched(
            "r1,2024-01-15 12:00:00,,10.0,30,DELIVERED,Lisbon\n",
            "r1,Casa Alta,portuguese\n",
        );
        let metrics = daily_restaurant_metrics(&batch).unwrap();

        assert_eq!(metrics.num_rows(), 1);
        assert!(f64_col(&metrics, "avg_delivery_mins").is_null(0));
        assert_eq!(i64_col(&metrics, "orders_delivered").value(0), 1);
    }

    #[test]
    fn groups_split_by_date_restaurant_and_city() {
        let batch = enriched(
            "r1,2024-01-15 12:00:00,2024-01-15 12:10:00,10.0,30,DELIVERED,Lisbon\n\
             r1,2024-01-16 12:00:00,2024-01-16 12:10:00,10.0,30,DELIVERED,Lisbon\n\
             r2,2024-01-15 12:00:00,2024-01-15 12:10:00,10.0,30,DELIVERED,Porto\n",
            "r1,Casa Alta,portuguese\nr2,Noodle Bar,asian\n",
        );
        let metrics = daily_restaurant_metrics(&batch).unwrap();
        assert_eq!(metrics.num_rows(), 3);

        let late_rate = f64_col(&metrics, "late_rate");
        for row in 0..metrics.num_rows() {
            assert!((0.0..=1.0).contains(&late_rate.value(row)));
            assert!(i64_col(&metrics, "orders_delivered").value(row) > 0);
        }
    }

    #[test]
    fn orphan_delivered_orders_group_under_null_restaurant_columns() {
        let batch = enriched(
            "ghost,2024-01-15 12:00:00,2024-01-15 12:10:00,10.0,30,DELIVERED,Lisbon\n",
            "r1,Casa Alta,portuguese\n",
        );
        let metrics = daily_restaurant_metrics(&batch).unwrap();

        assert_eq!(metrics.num_rows(), 1);
        let name = metrics.column_by_name("name").unwrap();
        assert!(name.is_null(0));
        assert_eq!(i64_col(&metrics, "orders_delivered").value(0), 1);
    }
}
