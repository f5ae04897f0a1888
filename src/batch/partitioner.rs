//! Partition-key batch grouping
//!
//! Operations are appended to an open group per partition key. A group is
//! emitted the moment it reaches the cap; when input runs out the remaining
//! partial groups are emitted in the order they were opened. Only one open
//! group exists per key, so memory is bounded by the number of keys in
//! flight, and per-key operation order is preserved.
//!
//! Open groups are ordered by a creation sequence number, with a key index
//! beside them, so routing an operation and flushing a group are both
//! logarithmic in the number of open keys.

use std::collections::{BTreeMap, HashMap};

use super::config::{BatchConfig, BatchResult};
use crate::mapping::{MappingResult, RecordTypeDescriptor};
use crate::observability::{log_event_with_fields, Event};
use crate::wire::{TableOperation, WireEntity};

/// Operations sharing one partition key, at most the configured cap
#[derive(Debug, Clone, PartialEq)]
pub struct BatchOperationGroup {
    partition_key: String,
    operations: Vec<TableOperation>,
}

impl BatchOperationGroup {
    fn new(partition_key: String, capacity: usize) -> Self {
        Self {
            partition_key,
            operations: Vec::with_capacity(capacity),
        }
    }

    pub fn partition_key(&self) -> &str {
        &self.partition_key
    }

    pub fn operations(&self) -> &[TableOperation] {
        &self.operations
    }

    pub fn into_operations(self) -> Vec<TableOperation> {
        self.operations
    }

    pub fn len(&self) -> usize {
        self.operations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }
}

/// Lazy iterator of batch groups
pub struct BatchPartitioner<I, F> {
    input: I,
    make_op: F,
    max_operations: usize,
    /// Open groups by creation sequence
    open: BTreeMap<u64, BatchOperationGroup>,
    /// Partition key to the sequence of its open group
    by_key: HashMap<String, u64>,
    next_sequence: u64,
    exhausted: bool,
}

impl<I, F> BatchPartitioner<I, F>
where
    I: Iterator<Item = WireEntity>,
    F: FnMut(WireEntity) -> TableOperation,
{
    /// Partitions `entities`, turning each into an operation with `make_op`
    pub fn new<E>(entities: E, make_op: F, config: &BatchConfig) -> BatchResult<Self>
    where
        E: IntoIterator<IntoIter = I>,
    {
        config.validate()?;
        Ok(Self {
            input: entities.into_iter(),
            make_op,
            max_operations: config.max_operations,
            open: BTreeMap::new(),
            by_key: HashMap::new(),
            next_sequence: 0,
            exhausted: false,
        })
    }

    /// Number of partition keys with an open group
    pub fn open_groups(&self) -> usize {
        self.open.len()
    }

    /// Sequence of the open group for `key`, allocating one for a new key
    fn sequence_for(&mut self, key: &str) -> u64 {
        if let Some(&sequence) = self.by_key.get(key) {
            return sequence;
        }
        let sequence = self.next_sequence;
        self.next_sequence += 1;
        self.by_key.insert(key.to_string(), sequence);
        sequence
    }

    fn close(&mut self, sequence: u64) -> Option<BatchOperationGroup> {
        let group = self.open.remove(&sequence)?;
        self.by_key.remove(&group.partition_key);
        Some(group)
    }

    fn emit(&self, group: BatchOperationGroup) -> BatchOperationGroup {
        let operations = group.len().to_string();
        log_event_with_fields(
            Event::BatchFlushed,
            &[
                ("operations", operations.as_str()),
                ("partition_key", group.partition_key()),
            ],
        );
        group
    }
}

impl<I, F> Iterator for BatchPartitioner<I, F>
where
    I: Iterator<Item = WireEntity>,
    F: FnMut(WireEntity) -> TableOperation,
{
    type Item = BatchOperationGroup;

    fn next(&mut self) -> Option<Self::Item> {
        while !self.exhausted {
            let Some(entity) = self.input.next() else {
                self.exhausted = true;
                break;
            };

            let operation = (self.make_op)(entity);
            let sequence = self.sequence_for(operation.partition_key());
            let max_operations = self.max_operations;
            let group = self.open.entry(sequence).or_insert_with(|| {
                BatchOperationGroup::new(operation.partition_key().to_string(), max_operations)
            });
            group.operations.push(operation);

            if group.len() >= max_operations {
                if let Some(full) = self.close(sequence) {
                    return Some(self.emit(full));
                }
            }
        }

        let (&sequence, _) = self.open.first_key_value()?;
        let partial = self.close(sequence)?;
        Some(self.emit(partial))
    }
}

/// Converts `records` through `descriptor` and partitions the result
pub fn partition_records<'a, R, F>(
    descriptor: &RecordTypeDescriptor<R>,
    records: impl IntoIterator<Item = &'a R>,
    make_op: F,
    config: &BatchConfig,
) -> BatchResult<Vec<BatchOperationGroup>>
where
    R: 'a,
    F: FnMut(WireEntity) -> TableOperation,
{
    let entities = records
        .into_iter()
        .map(|record| descriptor.to_entity(record))
        .collect::<MappingResult<Vec<_>>>()?;
    Ok(BatchPartitioner::new(entities, make_op, config)?.collect())
}
