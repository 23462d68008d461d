// Delivery-domain rules shared by ingest and aggregation.

/// Status value marking an order as delivered.
pub const STATUS_DELIVERED: &str = "DELIVERED";

/// Delivery duration in whole seconds.
///
/// Timestamps are truncated to the second before subtracting, so inputs
/// that carry fractional seconds compare the same way as second-resolution
/// data. Returns `None` unless both timestamps are present.
pub fn delivery_seconds(order_us: Option<i64>, delivered_us: Option<i64>) -> Option<i64> {
    match (order_us, delivered_us) {
        (Some(order), Some(delivered)) => {
            Some(delivered.div_euclid(1_000_000) - order.div_euclid(1_000_000))
        }
        _ => None,
    }
}

/// Late-delivery indicator.
///
/// An order is late iff it was delivered and its duration strictly
/// exceeded the promised minutes. The status check comes first: the
/// duration comparison is never evaluated for non-delivered orders, and a
/// missing timestamp or promise can never make a row late.
pub fn is_late(
    status: Option<&str>,
    order_us: Option<i64>,
    delivered_us: Option<i64>,
    promised_mins: Option<i32>,
) -> bool {
    if status != Some(STATUS_DELIVERED) {
        return false;
    }

    match (delivery_seconds(order_us, delivered_us), promised_mins) {
        (Some(secs), Some(mins)) => secs > i64::from(mins) * 60,
        _ => false,
    }
}
