use std::sync::Arc;

use tracing::debug;

use crate::models::TransactionRecord;
use crate::query::{PageRequest, QueryError, TransactionFilter, TransactionsResponse};
use crate::storage::{SortOrder, TransactionStore};

/// Read-only access to stored transactions.
///
/// Every call goes straight to the store; nothing is cached between requests,
/// so the service can be shared freely across concurrent callers.
pub struct TransactionQueryService<S: TransactionStore> {
    storage: Arc<S>
}

impl<S: TransactionStore> TransactionQueryService<S> {
    pub fn new(storage: Arc<S>) -> Self {
        Self { storage }
    }

    /// Lists a page of transactions, newest first, with the size of the whole table.
    pub fn list_transactions(&self, page: PageRequest) -> Result<TransactionsResponse, QueryError> {
        let window = page.window()?;
        debug!("Listing transactions at offset {} limit {}", window.offset, window.limit);

        let transactions = self.storage.query(&[], SortOrder::NewestFirst, window.offset, window.limit)?;
        let total_records = self.storage.count(&[])?;

        Ok(TransactionsResponse::new(transactions, total_records))
    }

    /// Lists a page of transactions matching `filter`, with the number of matches across all pages.
    pub fn search_transactions(&self, filter: &TransactionFilter, page: PageRequest) -> Result<TransactionsResponse, QueryError> {
        let window = page.window()?;
        let predicates = filter.predicates();
        debug!("Searching transactions with {predicates:?} at offset {} limit {}", window.offset, window.limit);

        let transactions = self.storage.query(&predicates, SortOrder::TransactionId, window.offset, window.limit)?;
        let total_records = self.storage.count(&predicates)?;

        Ok(TransactionsResponse::new(transactions, total_records))
    }

    /// Looks up one transaction by its exact id. `Ok(None)` means not found.
    pub fn get_transaction(&self, transaction_id: &str) -> Result<Option<TransactionRecord>, QueryError> {
        let transaction_id = transaction_id.trim();

        if transaction_id.is_empty() {
            return Err(QueryError::invalid("transaction_id", "must not be blank"));
        }

        Ok(self.storage.get(transaction_id)?)
    }
}
