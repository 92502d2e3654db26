use thiserror::Error;

use crate::storage::StoreError;

#[derive(Debug, Error)]
pub enum QueryError {
    /// The request was malformed and never reached the store.
    #[error("Invalid query parameter [{parameter}]: {reason}")]
    InvalidQueryParameter {
        parameter: &'static str,
        reason: String
    },
    #[error("Query failed: {0}")]
    StoreUnavailable(#[from] StoreError)
}

impl QueryError {
    pub fn invalid(parameter: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidQueryParameter { parameter, reason: reason.into() }
    }

    pub fn is_client_error(&self) -> bool {
        matches!(self, Self::InvalidQueryParameter { .. })
    }
}
