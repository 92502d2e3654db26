use crate::models::RawTransaction;
use thiserror::Error;

/// Reasons a source row is dropped during normalization.
///
/// None of these are fatal to an ingestion run; the row is logged and counted
/// as skipped.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RowRejected {
    #[error("Row [{transaction_id}] rejected: missing required field [{field}]")]
    MissingField {
        transaction_id: String,
        field: &'static str
    },
    #[error("Row [{transaction_id}] rejected: unparseable timestamp [{value}]")]
    InvalidTimestamp {
        transaction_id: String,
        value: String
    },
    #[error("Row [{transaction_id}] rejected: non-numeric amount [{value}]")]
    InvalidAmount {
        transaction_id: String,
        value: String
    },
    #[error("Row [{transaction_id}] rejected: negative amount [{value}]")]
    NegativeAmount {
        transaction_id: String,
        value: String
    },
    #[error("Row [{transaction_id}] rejected: transaction hour [{value}] is not an integer in 0..=23")]
    InvalidHour {
        transaction_id: String,
        value: String
    },
    #[error("Row [{transaction_id}] rejected: [{value}] is not a boolean for field [{field}]")]
    InvalidFlag {
        transaction_id: String,
        field: &'static str,
        value: String
    }
}

impl RowRejected {
    pub fn missing_field(row: &RawTransaction, field: &'static str) -> Self {
        Self::MissingField { transaction_id: row.display_id(), field }
    }

    pub fn invalid_timestamp(row: &RawTransaction, value: &str) -> Self {
        Self::InvalidTimestamp { transaction_id: row.display_id(), value: value.to_string() }
    }

    pub fn invalid_amount(row: &RawTransaction, value: &str) -> Self {
        Self::InvalidAmount { transaction_id: row.display_id(), value: value.to_string() }
    }

    pub fn negative_amount(row: &RawTransaction, value: &str) -> Self {
        Self::NegativeAmount { transaction_id: row.display_id(), value: value.to_string() }
    }

    pub fn invalid_hour(row: &RawTransaction, value: &str) -> Self {
        Self::InvalidHour { transaction_id: row.display_id(), value: value.to_string() }
    }

    pub fn invalid_flag(row: &RawTransaction, field: &'static str, value: &str) -> Self {
        Self::InvalidFlag { transaction_id: row.display_id(), field, value: value.to_string() }
    }
}
