use std::collections::HashSet;
use std::sync::Mutex;

use dashmap::DashMap;

use crate::models::TransactionRecord;
use crate::storage::{Predicate, SortOrder, StoreError, TransactionStore};
use crate::types::TransactionId;

/// In-process store keyed by transaction id, used for ingestion dry runs
/// that validate a source without persisting it.
///
/// Reads go straight to the map; bulk inserts are serialized through a writer
/// lock so the check for existing keys and the insert happen as one unit.
pub struct MemoryStore {
    records: DashMap<TransactionId, TransactionRecord>,
    writer: Mutex<()>
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            records: DashMap::new(),
            writer: Mutex::new(())
        }
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl TransactionStore for MemoryStore {
    fn bulk_insert(&self, records: &[TransactionRecord]) -> Result<usize, StoreError> {
        let _guard = self.writer.lock()
            .map_err(|_| StoreError::Unavailable("Memory store writer lock is poisoned".to_string()))?;

        let mut batch = HashSet::with_capacity(records.len());

        for record in records {
            if self.records.contains_key(&record.transaction_id) || !batch.insert(record.transaction_id.as_str()) {
                return Err(StoreError::ConstraintViolation(
                    format!("Duplicate transaction_id [{}]", record.transaction_id)
                ));
            }
        }

        for record in records {
            self.records.insert(record.transaction_id.clone(), record.clone());
        }

        Ok(records.len())
    }

    fn query(&self, predicates: &[Predicate], order: SortOrder, offset: u64, limit: u64) -> Result<Vec<TransactionRecord>, StoreError> {
        let mut matching: Vec<TransactionRecord> = self.records.iter()
            .filter(|entry| Predicate::matches_all(predicates, entry.value()))
            .map(|entry| entry.value().clone())
            .collect();

        matching.sort_by(|left, right| order.compare(left, right));

        Ok(matching.into_iter()
            .skip(usize::try_from(offset).unwrap_or(usize::MAX))
            .take(usize::try_from(limit).unwrap_or(usize::MAX))
            .collect())
    }

    fn count(&self, predicates: &[Predicate]) -> Result<u64, StoreError> {
        let count = self.records.iter()
            .filter(|entry| Predicate::matches_all(predicates, entry.value()))
            .count();

        Ok(count as u64)
    }

    fn get(&self, transaction_id: &str) -> Result<Option<TransactionRecord>, StoreError> {
        Ok(self.records.get(transaction_id).map(|entry| entry.value().clone()))
    }
}
