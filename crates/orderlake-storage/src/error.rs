//! Error types for dataset storage access.

use thiserror::Error;

/// Errors that can occur while reading or publishing datasets.
#[derive(Debug, Error)]
pub enum StorageError {
    /// The storage backend rejected an operation
    #[error("storage backend error: {0}")]
    Backend(#[from] opendal::Error),

    /// Parquet encode or decode failed
    #[error("parquet error: {0}")]
    Parquet(#[from] parquet::errors::ParquetError),

    /// Arrow-level failure assembling or concatenating batches
    #[error("arrow error: {0}")]
    Arrow(#[from] arrow::error::ArrowError),

    /// A file sits under a directory that is not a partition directory
    #[error("unrecognized partition directory '{dir}' for file {path}")]
    UnrecognizedPartition { dir: String, path: String },

    /// Parquet encoding through the core writer failed
    #[error("failed to encode parquet for {path}")]
    Encode {
        path: String,
        #[source]
        source: anyhow::Error,
    },

    /// Re-attaching the partition date on read-back failed
    #[error("failed to rebuild partition column for {path}")]
    AttachPartition {
        path: String,
        #[source]
        source: anyhow::Error,
    },
}

/// Result type alias for StorageError
pub type Result<T> = std::result::Result<T, StorageError>;
