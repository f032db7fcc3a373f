//! Keyed view of the destination store.

use crate::error::{CoreError, CoreResult};
use crate::record::DestinationRecord;
use std::collections::HashMap;

/// The destination records of one run, keyed by stable identifier.
///
/// Iteration follows the order the store returned the records in.
#[derive(Debug, Clone, Default)]
pub struct Snapshot {
    records: Vec<DestinationRecord>,
    index: HashMap<String, usize>,
    unkeyed: usize,
}

impl Snapshot {
    /// Creates an empty snapshot.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a snapshot from the store's records.
    ///
    /// Records with a blank key are skipped and counted. Two records with
    /// the same key violate the one-record-per-key invariant and fail the
    /// build.
    pub fn from_records(records: impl IntoIterator<Item = DestinationRecord>) -> CoreResult<Self> {
        let mut snapshot = Self::new();
        for record in records {
            snapshot.insert(record)?;
        }
        Ok(snapshot)
    }

    fn insert(&mut self, record: DestinationRecord) -> CoreResult<()> {
        if record.key.trim().is_empty() {
            self.unkeyed += 1;
            return Ok(());
        }
        if let Some(&existing) = self.index.get(&record.key) {
            return Err(CoreError::DuplicateDestinationKey {
                key: record.key,
                first_id: self.records[existing].id.clone(),
                second_id: record.id,
            });
        }
        self.index.insert(record.key.clone(), self.records.len());
        self.records.push(record);
        Ok(())
    }

    /// Returns the record for a key.
    pub fn get(&self, key: &str) -> Option<&DestinationRecord> {
        self.index.get(key).map(|&idx| &self.records[idx])
    }

    /// Returns true if a record carries the key.
    pub fn contains(&self, key: &str) -> bool {
        self.index.contains_key(key)
    }

    /// Iterates over records in store order.
    pub fn iter(&self) -> impl Iterator<Item = &DestinationRecord> {
        self.records.iter()
    }

    /// Number of keyed records.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Returns true if there are no keyed records.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Number of records skipped for having no key.
    pub fn unkeyed(&self) -> usize {
        self.unkeyed
    }
}
