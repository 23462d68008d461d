use arrow::datatypes::{DataType, Field, Schema};
use std::sync::Arc;

use super::col;

/// Arrow schema for normalized (silver) restaurants.
///
/// Restaurant attributes are text that passes through untouched, so every
/// column is nullable Utf8.
pub fn restaurants_schema(passthrough: &[String]) -> Arc<Schema> {
    let mut fields = vec![
        Field::new(col::RESTAURANT_ID, DataType::Utf8, true),
        Field::new(col::NAME, DataType::Utf8, true),
        Field::new(col::CUISINE, DataType::Utf8, true),
    ];

    for name in passthrough {
        fields.push(Field::new(name, DataType::Utf8, true));
    }

    Arc::new(Schema::new(fields))
}
