use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;

use crate::types::{TransactionId, VelocityWindow};

/// The canonical, fully typed form of one fraud-labeled transaction.
///
/// Records are produced only by ingestion and are never mutated afterwards.
/// Boolean flags are always concrete values, while the descriptive fields
/// declared as `Option` may legitimately be absent.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TransactionRecord {
    /// Globally unique natural key.
    pub transaction_id: TransactionId,
    pub customer_id: String,
    pub card_number: String,
    pub timestamp: DateTime<Utc>,
    pub merchant_category: String,
    pub merchant_type: String,
    pub merchant: String,
    /// Always finite and non-negative.
    #[serde(with = "rust_decimal::serde::float")]
    pub amount: Decimal,
    pub currency: String,
    pub country: String,
    pub city: String,
    pub city_size: Option<String>,
    pub card_type: Option<String>,
    pub card_present: bool,
    pub device: Option<String>,
    pub channel: Option<String>,
    pub device_fingerprint: Option<String>,
    pub ip_address: Option<String>,
    pub distance_from_home: bool,
    pub high_risk_merchant: bool,
    /// Hour of day in `0..=23`.
    pub transaction_hour: u8,
    pub weekend_transaction: bool,
    pub velocity_last_hour: VelocityWindow,
    pub is_fraud: bool
}
