// Gold-tier daily restaurant metrics schema.

use arrow::datatypes::{DataType, Field, Schema};
use std::sync::{Arc, OnceLock};

use super::col;

/// Returns the Arrow schema for daily restaurant metrics.
pub fn daily_metrics_schema() -> Schema {
    daily_metrics_schema_arc().as_ref().clone()
}

/// Returns a cached `Arc<Schema>` for daily restaurant metrics.
///
/// The grouping key columns are nullable: `dt` is null for orders whose
/// timestamp never parsed, and `name`/`cuisine` are null for orders that
/// matched no restaurant. The count columns and the derived rate always
/// have values because a group only exists if at least one delivered
/// order fell into it.
pub fn daily_metrics_schema_arc() -> Arc<Schema> {
    static SCHEMA: OnceLock<Arc<Schema>> = OnceLock::new();
    Arc::clone(SCHEMA.get_or_init(|| {
        Arc::new(Schema::new(vec![
            Field::new(col::DT, DataType::Date32, true),
            Field::new(col::RESTAURANT_ID, DataType::Utf8, true),
            Field::new(col::NAME, DataType::Utf8, true),
            Field::new(col::CUISINE, DataType::Utf8, true),
            Field::new(col::CITY, DataType::Utf8, true),
            Field::new(col::ORDERS_DELIVERED, DataType::Int64, false),
            Field::new(col::GMV, DataType::Float64, true),
            Field::new(col::AVG_DELIVERY_MINS, DataType::Float64, true),
            Field::new(col::LATE_COUNT, DataType::Int64, false),
            Field::new(col::LATE_RATE, DataType::Float64, false),
        ]))
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn metrics_schema_column_order_is_stable() {
        let schema = daily_metrics_schema();
        let names: Vec<&str> = schema.fields().iter().map(|f| f.name().as_str()).collect();
        assert_eq!(
            names,
            vec![
                "dt",
                "restaurant_id",
                "name",
                "cuisine",
                "city",
                "orders_delivered",
                "gmv",
                "avg_delivery_mins",
                "late_count",
                "late_rate",
            ]
        );
    }
}
