// Parquet encoding and date partitioning
//
// Writing is split from partitioning: the writer turns one RecordBatch
// into Parquet bytes, partitioning decides which batch goes under which
// Hive-style directory.

pub mod partition;
pub mod writer;

pub use partition::{
    attach_date, parse_partition_dir, partition_dir, split_by_date, HIVE_DEFAULT_PARTITION,
};
pub use writer::{write_parquet, write_parquet_into};
