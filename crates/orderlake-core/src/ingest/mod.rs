// CSV ingestion and normalization
//
// Raw delimited text becomes typed Arrow batches here. Field-level parse
// failures coerce to null rather than rejecting the row; the counts are
// reported through IngestStats so a run can surface them.

mod orders;
mod plan;
mod restaurants;

pub use orders::{IngestStats, OrdersNormalizer, ORDERS_REQUIRED_COLUMNS};
pub use plan::CsvPlan;
pub use restaurants::{RestaurantsNormalizer, RESTAURANTS_REQUIRED_COLUMNS};

use chrono::{NaiveDate, NaiveDateTime};

const TIMESTAMP_FORMATS: &[&str] = &["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"];

const MICROS_PER_DAY: i64 = 86_400_000_000;

/// Parse timestamp text to microseconds since the epoch, no timezone
/// assumed. Accepts ISO and space-separated date-times with an optional
/// fractional second, and bare dates (which become midnight). Returns
/// `None` for anything else.
pub(crate) fn parse_timestamp_micros(text: &str) -> Option<i64> {
    for format in TIMESTAMP_FORMATS {
        if let Ok(ts) = NaiveDateTime::parse_from_str(text, format) {
            return Some(ts.and_utc().timestamp_micros());
        }
    }

    NaiveDate::parse_from_str(text, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|ts| ts.and_utc().timestamp_micros())
}

/// Calendar date of a microsecond timestamp, as days since the epoch.
pub(crate) fn date32_from_micros(micros: i64) -> i32 {
    micros.div_euclid(MICROS_PER_DAY) as i32
}
