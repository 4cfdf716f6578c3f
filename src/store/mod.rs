//! Record persistence.
//!
//! [`RecordStore`] is the seam the ingestion pipeline flushes into.
//! [`MemoryStore`] keeps records in insertion order; [`SnapshotStore`] wraps
//! one and mirrors every mutation to a single integrity-checked file.

pub mod snapshot;

use std::collections::HashMap;

use crate::error::Result;
use crate::model::record::MessageRecord;

pub use snapshot::SnapshotStore;

/// Storage for classified records, keyed by [`MessageRecord::id`].
pub trait RecordStore {
    /// Insert or replace every record of the batch. A failed batch leaves the
    /// store as it was before the call.
    fn save_batch(&mut self, records: &[MessageRecord]) -> Result<()>;

    /// Every stored record, in insertion order.
    fn query_all(&self) -> Result<Vec<MessageRecord>>;

    /// Records whose sender address equals `address` exactly.
    fn query_by_sender(&self, address: &str) -> Result<Vec<MessageRecord>>;

    /// Remove the given ids; returns how many records were actually removed.
    fn delete_by_ids(&mut self, ids: &[String]) -> Result<usize>;
}

impl<T: RecordStore + ?Sized> RecordStore for Box<T> {
    fn save_batch(&mut self, records: &[MessageRecord]) -> Result<()> {
        (**self).save_batch(records)
    }

    fn query_all(&self) -> Result<Vec<MessageRecord>> {
        (**self).query_all()
    }

    fn query_by_sender(&self, address: &str) -> Result<Vec<MessageRecord>> {
        (**self).query_by_sender(address)
    }

    fn delete_by_ids(&mut self, ids: &[String]) -> Result<usize> {
        (**self).delete_by_ids(ids)
    }
}

/// In-memory store. Re-saving an id replaces the record in its original slot.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    records: Vec<MessageRecord>,
    positions: HashMap<String, usize>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a store from existing records (later duplicates replace earlier ones).
    pub fn from_records(records: Vec<MessageRecord>) -> Self {
        let mut store = Self::new();
        store.upsert_all(&records);
        store
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Borrow the stored records without cloning.
    pub fn records(&self) -> &[MessageRecord] {
        &self.records
    }

    pub fn get(&self, id: &str) -> Option<&MessageRecord> {
        self.positions.get(id).map(|&i| &self.records[i])
    }

    fn upsert_all(&mut self, records: &[MessageRecord]) {
        for record in records {
            match self.positions.get(&record.id) {
                Some(&i) => self.records[i] = record.clone(),
                None => {
                    self.positions.insert(record.id.clone(), self.records.len());
                    self.records.push(record.clone());
                }
            }
        }
    }

    fn remove_all(&mut self, ids: &[String]) -> usize {
        let before = self.records.len();
        self.records.retain(|r| !ids.contains(&r.id));
        let removed = before - self.records.len();
        if removed > 0 {
            self.positions = self
                .records
                .iter()
                .enumerate()
                .map(|(i, r)| (r.id.clone(), i))
                .collect();
        }
        removed
    }
}

impl RecordStore for MemoryStore {
    fn save_batch(&mut self, records: &[MessageRecord]) -> Result<()> {
        self.upsert_all(records);
        Ok(())
    }

    fn query_all(&self) -> Result<Vec<MessageRecord>> {
        Ok(self.records.clone())
    }

    fn query_by_sender(&self, address: &str) -> Result<Vec<MessageRecord>> {
        Ok(self
            .records
            .iter()
            .filter(|r| r.from.address == address)
            .cloned()
            .collect())
    }

    fn delete_by_ids(&mut self, ids: &[String]) -> Result<usize> {
        Ok(self.remove_all(ids))
    }
}
