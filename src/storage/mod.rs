mod errors;
mod memory_store;
mod predicate;
mod sqlite_store;
#[cfg(test)]
mod tests;

use crate::models::TransactionRecord;

pub use errors::StoreError;
pub use memory_store::MemoryStore;
pub use predicate::{Predicate, SortOrder};
pub use sqlite_store::SqliteStore;

/// The relational store holding the `transactions` table.
///
/// Implementations own all durable state. Callers share a store through an
/// `Arc` and every method acquires whatever connection or lock it needs for
/// the duration of that single call only.
pub trait TransactionStore: Send + Sync + 'static {
    /// Inserts `records` as one unit: either every record is stored or none is.
    fn bulk_insert(&self, records: &[TransactionRecord]) -> Result<usize, StoreError>;

    /// Returns at most `limit` records matching every predicate, after skipping `offset`.
    fn query(&self, predicates: &[Predicate], order: SortOrder, offset: u64, limit: u64) -> Result<Vec<TransactionRecord>, StoreError>;

    /// Counts records matching every predicate, ignoring pagination.
    fn count(&self, predicates: &[Predicate]) -> Result<u64, StoreError>;

    fn get(&self, transaction_id: &str) -> Result<Option<TransactionRecord>, StoreError>;
}
