use serde::Deserialize;

/// A single row of the source CSV exactly as it was read.
///
/// Every column is optional text: type coercion and validation belong to
/// [`normalize`](crate::models::normalize), which turns a row into a
/// [`TransactionRecord`](crate::models::TransactionRecord) or a rejection.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RawTransaction {
    pub transaction_id: Option<String>,
    pub customer_id: Option<String>,
    pub card_number: Option<String>,
    pub timestamp: Option<String>,
    pub merchant_category: Option<String>,
    pub merchant_type: Option<String>,
    pub merchant: Option<String>,
    pub amount: Option<String>,
    pub currency: Option<String>,
    pub country: Option<String>,
    pub city: Option<String>,
    pub city_size: Option<String>,
    pub card_type: Option<String>,
    pub card_present: Option<String>,
    pub device: Option<String>,
    pub channel: Option<String>,
    pub device_fingerprint: Option<String>,
    pub ip_address: Option<String>,
    pub distance_from_home: Option<String>,
    pub high_risk_merchant: Option<String>,
    pub transaction_hour: Option<String>,
    pub weekend_transaction: Option<String>,
    pub velocity_last_hour: Option<String>,
    pub is_fraud: Option<String>
}

impl RawTransaction {
    /// The natural key of the row, if present and not blank.
    pub fn transaction_id(&self) -> Option<&str> {
        self.transaction_id.as_deref()
            .map(str::trim)
            .filter(|id| !id.is_empty())
    }

    pub(crate) fn display_id(&self) -> String {
        self.transaction_id().unwrap_or("<missing>").to_string()
    }
}
