//! aerotable - query translation, record mapping and batching for a
//! partitioned key/value table store
//!
//! - `query` compiles expression chains into filter, select and top
//!   parameters plus client-side transforms
//! - `mapping` converts typed records to and from wire entities
//! - `batch` groups wire operations into same-partition batches

pub mod batch;
pub mod config;
pub mod expr;
pub mod mapping;
pub mod observability;
pub mod query;
pub mod value;
pub mod wire;
