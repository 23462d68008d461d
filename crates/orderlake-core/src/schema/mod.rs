// Arrow schemas for the pipeline tiers
//
// The normalized schemas are built per run because the passthrough column
// set depends on the discovered input headers. The gold metrics schema is
// fixed and cached.

mod metrics;
mod orders;
mod restaurants;

pub use metrics::{daily_metrics_schema, daily_metrics_schema_arc};
pub use orders::normalized_orders_schema;
pub use restaurants::restaurants_schema;

/// Column names shared across tiers.
pub mod col {
    pub const RESTAURANT_ID: &str = "restaurant_id";
    pub const ORDER_TS: &str = "order_ts";
    pub const DELIVERED_TS: &str = "delivered_ts";
    pub const ORDER_VALUE: &str = "order_value";
    pub const PROMISED_MINS: &str = "promised_mins";
    pub const STATUS: &str = "status";
    pub const CITY: &str = "city";
    pub const LATE_DELIVERY: &str = "late_delivery";
    pub const DT: &str = "dt";

    pub const NAME: &str = "name";
    pub const CUISINE: &str = "cuisine";

    pub const ORDERS_DELIVERED: &str = "orders_delivered";
    pub const GMV: &str = "gmv";
    pub const AVG_DELIVERY_MINS: &str = "avg_delivery_mins";
    pub const LATE_COUNT: &str = "late_count";
    pub const LATE_RATE: &str = "late_rate";
}
