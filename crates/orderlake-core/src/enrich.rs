// Left-join enrichment of normalized orders with restaurant attributes.
//
// Orders drive the join: every order row is preserved, restaurant columns
// are null when no restaurant matches, and duplicate restaurant
// identifiers fan out. The identifier is expected to be unique upstream;
// uniqueness is not enforced here.

use anyhow::{bail, Context, Result};
use arrow::array::{Array, ArrayRef, RecordBatch, UInt32Array};
use arrow::compute::take;
use arrow::datatypes::{Field, Schema};
use std::collections::HashMap;
use std::sync::Arc;

use crate::column::string_column;
use crate::schema::col;

/// Left outer join of orders to restaurants on `restaurant_id`.
///
/// The output carries the order columns followed by every restaurant
/// column except `restaurant_id`. A restaurant column whose name collides
/// with an order column is a data-contract violation and fails the join.
pub fn left_join(orders: &RecordBatch, restaurants: &RecordBatch) -> Result<RecordBatch> {
    let order_keys = string_column(orders, col::RESTAURANT_ID)?;
    let restaurant_keys = string_column(restaurants, col::RESTAURANT_ID)?;

    let mut by_id: HashMap<&str, Vec<u32>> = HashMap::new();
    for row in 0..restaurant_keys.len() {
        if restaurant_keys.is_valid(row) {
            by_id
                .entry(restaurant_keys.value(row))
                .or_default()
                .push(row as u32);
        }
    }

    let mut order_idx: Vec<u32> = Vec::with_capacity(orders.num_rows());
    let mut restaurant_idx: Vec<Option<u32>> = Vec::with_capacity(orders.num_rows());
    for row in 0..orders.num_rows() {
        let matches = order_keys
            .is_valid(row)
            .then(|| by_id.get(order_keys.value(row)))
            .flatten();
        match matches {
            Some(found) => {
                for &restaurant_row in found {
                    order_idx.push(row as u32);
                    restaurant_idx.push(Some(restaurant_row));
                }
            }
            None => {
                order_idx.push(row as u32);
                restaurant_idx.push(None);
            }
        }
    }

    let order_idx = UInt32Array::from(order_idx);
    let restaurant_idx = UInt32Array::from(restaurant_idx);

    let mut fields: Vec<Field> = orders
        .schema()
        .fields()
        .iter()
        .map(|f| f.as_ref().clone())
        .collect();
    let mut columns: Vec<ArrayRef> = Vec::with_capacity(fields.len() + restaurants.num_columns());
    for column in orders.columns() {
        columns.push(take(column.as_ref(), &order_idx, None)?);
    }

    for (field, column) in restaurants
        .schema()
        .fields()
        .iter()
        .zip(restaurants.columns())
    {
        if field.name() == col::RESTAURANT_ID {
            continue;
        }
        if orders.schema().field_with_name(field.name()).is_ok() {
            bail!(
                "restaurant column '{}' collides with an order column",
                field.name()
            );
        }
        fields.push(field.as_ref().clone().with_nullable(true));
        columns.push(take(column.as_ref(), &restaurant_idx, None)?);
    }

    RecordBatch::try_new(Arc::new(Schema::new(fields)), columns)
        .context("assembling enriched orders batch")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ingest::{
        CsvPlan, OrdersNormalizer, RestaurantsNormalizer, ORDERS_REQUIRED_COLUMNS,
        RESTAURANTS_REQUIRED_COLUMNS,
    };
    use arrow::array::StringArray;

    fn orders_batch(rows: &str) -> RecordBatch {
        let content = format!(
            "restaurant_id,order_ts,delivered_ts,order_value,promised_mins,status,city\n{}",
            rows
        );
        let files = vec![("o.csv".to_string(), content.into_bytes())];
        let plan = CsvPlan::from_files(ORDERS_REQUIRED_COLUMNS, &files).unwrap();
        let mut normalizer = OrdersNormalizer::new(&plan);
        normalizer.append_csv("o.csv", &files[0].1).unwrap();
        normalizer.finish().unwrap().0
    }

    fn restaurants_batch(rows: &str) -> RecordBatch {
        let content = format!("restaurant_id,name,cuisine\n{}", rows);
        let files = vec![("r.csv".to_string(), content.into_bytes())];
        let plan = CsvPlan::from_files(RESTAURANTS_REQUIRED_COLUMNS, &files).unwrap();
        let mut normalizer = RestaurantsNormalizer::new(&plan);
        normalizer.append_csv("r.csv", &files[0].1).unwrap();
        normalizer.finish().unwrap()
    }

    fn names(batch: &RecordBatch) -> Vec<Option<String>> {
        let name = batch
            .column_by_name("name")
            .unwrap()
            .as_any()
            .downcast_ref::<StringArray>()
            .unwrap();
        (0..name.len())
            .map(|i| name.is_valid(i).then(|| name.value(i).to_string()))
            .collect()
    }

    #[test]
    fn orphan_orders_survive_with_null_restaurant_columns() {
        let orders = orders_batch(
            "r1,2024-01-15 12:00:00,,9.0,30,NEW,Lisbon\n\
             ghost,2024-01-15 13:00:00,,4.0,20,NEW,Porto\n",
        );
        let restaurants = restaurants_batch("r1,Casa Alta,portuguese\n");

        let enriched = left_join(&orders, &restaurants).unwrap();
        assert_eq!(enriched.num_rows(), 2);
        assert_eq!(
            names(&enriched),
            vec![Some("Casa Alta".to_string()), None]
        );
    }

    #[test]
    fn duplicate_restaurant_ids_fan_out() {
        let orders = orders_batch("r1,2024-01-15 12:00:00,,9.0,30,NEW,Lisbon\n");
        let restaurants = restaurants_batch("r1,Casa Alta,portuguese\nr1,Casa Alta II,portuguese\n");

        let enriched = left_join(&orders, &restaurants).unwrap();
        assert_eq!(enriched.num_rows(), 2);
    }

    #[test]
    fn restaurant_column_colliding_with_order_column_fails() {
        let orders = orders_batch("r1,2024-01-15 12:00:00,,9.0,30,NEW,Lisbon\n");

        let content = "restaurant_id,name,cuisine,city\nr1,Casa Alta,portuguese,Lisbon\n";
        let files = vec![("r.csv".to_string(), content.as_bytes().to_vec())];
        let plan = CsvPlan::from_files(RESTAURANTS_REQUIRED_COLUMNS, &files).unwrap();
        let mut normalizer = RestaurantsNormalizer::new(&plan);
        normalizer.append_csv("r.csv", content.as_bytes()).unwrap();
        let restaurants = normalizer.finish().unwrap();

        let err = left_join(&orders, &restaurants).unwrap_err();
        assert!(err.to_string().contains("'city'"), "{}", err);
    }
}
