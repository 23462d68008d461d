// orderlake - Batch order ETL
//
// Ingests raw order and restaurant CSV drops from the bronze tier,
// normalizes them into typed, date-partitioned Parquet (silver), enriches
// orders with restaurant attributes, and publishes daily per-restaurant
// metrics (gold). The transformation logic lives in orderlake-core; this
// crate wires it to configuration, storage and logging and runs the three
// stages in order.

pub mod init;
pub mod pipeline;

pub use pipeline::{run, RunSummary};
