use std::cmp::Ordering;

use rust_decimal::Decimal;

use crate::models::TransactionRecord;

/// A single constraint on the `transactions` table. A query applies the
/// conjunction of all of its predicates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Predicate {
    /// Merchant name contains the text, ignoring case.
    MerchantContains(String),
    MinAmount(Decimal),
    MaxAmount(Decimal)
}

impl Predicate {
    pub fn matches(&self, record: &TransactionRecord) -> bool {
        match self {
            Predicate::MerchantContains(text) => record.merchant.to_lowercase().contains(&text.to_lowercase()),
            Predicate::MinAmount(minimum) => record.amount >= *minimum,
            Predicate::MaxAmount(maximum) => record.amount <= *maximum
        }
    }

    pub fn matches_all(predicates: &[Predicate], record: &TransactionRecord) -> bool {
        predicates.iter().all(|predicate| predicate.matches(record))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    /// Timestamp descending, ties broken by ascending transaction id.
    NewestFirst,
    /// Ascending transaction id, giving stable pages for unordered listings.
    TransactionId
}

impl SortOrder {
    pub fn compare(&self, left: &TransactionRecord, right: &TransactionRecord) -> Ordering {
        match self {
            SortOrder::NewestFirst => right.timestamp.cmp(&left.timestamp)
                .then_with(|| left.transaction_id.cmp(&right.transaction_id)),
            SortOrder::TransactionId => left.transaction_id.cmp(&right.transaction_id)
        }
    }
}
