// orderlake-storage - Dataset access over object storage
//
// Everything durable goes through an opendal Operator: CSV discovery,
// Parquet dataset read-back with partition dates recovered from the path,
// and full-replace dataset writes staged under a run-scoped prefix before
// being swapped into place.

mod dataset;
mod error;

pub use dataset::{
    list_files, read_parquet_dataset, write_partitioned, write_unpartitioned, DatasetSummary,
};
pub use error::{Result, StorageError};
