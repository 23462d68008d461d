// Normalized orders schema: typed base columns, derived columns, then the
// passthrough columns in sorted order.

use arrow::datatypes::{DataType, Field, Schema, TimeUnit};
use std::sync::Arc;

use super::col;

/// Arrow schema for normalized (silver) orders.
///
/// Timestamps are microsecond instants with no timezone assumed. All raw
/// columns are nullable because unparseable text coerces to null instead
/// of rejecting the row; `late_delivery` is the one column that always has
/// a value.
pub fn normalized_orders_schema(passthrough: &[String]) -> Arc<Schema> {
    let mut fields = vec![
        Field::new(col::RESTAURANT_ID, DataType::Utf8, true),
        Field::new(
            col::ORDER_TS,
            DataType::Timestamp(TimeUnit::Microsecond, None),
            true,
        ),
        Field::new(
            col::DELIVERED_TS,
            DataType::Timestamp(TimeUnit::Microsecond, None),
            true,
        ),
        Field::new(col::ORDER_VALUE, DataType::Float64, true),
        Field::new(col::PROMISED_MINS, DataType::Int32, true),
        Field::new(col::STATUS, DataType::Utf8, true),
        Field::new(col::CITY, DataType::Utf8, true),
        Field::new(col::LATE_DELIVERY, DataType::Int32, false),
        Field::new(col::DT, DataType::Date32, true),
    ];

    for name in passthrough {
        fields.push(Field::new(name, DataType::Utf8, true));
    }

    Arc::new(Schema::new(fields))
}
