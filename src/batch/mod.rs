//! Batch partitioning
//!
//! Splits a stream of wire operations into same-partition groups no larger
//! than the store's batch limit, ready for one batch call each.

mod config;
mod partitioner;

pub use config::{BatchConfig, BatchError, BatchResult, MAX_BATCH_OPERATIONS};
pub use partitioner::{partition_records, BatchOperationGroup, BatchPartitioner};
