use serde::Serialize;

use crate::models::TransactionRecord;

/// Envelope returned by the list and search operations.
#[derive(Debug, Clone, Serialize)]
pub struct TransactionsResponse {
    pub transactions: Vec<TransactionRecord>,
    pub metadata: ResponseMetadata
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ResponseMetadata {
    /// Matching records across all pages.
    pub total_records: u64
}

impl TransactionsResponse {
    pub fn new(transactions: Vec<TransactionRecord>, total_records: u64) -> Self {
        Self {
            transactions,
            metadata: ResponseMetadata { total_records }
        }
    }
}
