use std::str::FromStr;

use chrono::{DateTime, NaiveDateTime, Utc};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use tracing::warn;

use crate::models::{RawTransaction, RowRejected, TransactionRecord};
use crate::types::VelocityWindow;

const OFFSET_FORMATS: [&str; 2] = ["%Y-%m-%d %H:%M:%S%.f%:z", "%Y-%m-%d %H:%M:%S%.f%z"];
const NAIVE_FORMATS: [&str; 2] = ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"];

/// Converts one raw source row into a canonical [`TransactionRecord`].
///
/// Required text fields must be present, `timestamp` must resolve to a UTC
/// instant, `amount` must be a non-negative number and `transaction_hour` an
/// integral hour of the day. Boolean flags are coerced through a truthy/falsy mapping,
/// with a blank value read as `false`.
///
/// A malformed `velocity_last_hour` never rejects the row: it is logged and
/// replaced with an empty window.
pub fn normalize(row: &RawTransaction) -> Result<TransactionRecord, RowRejected> {
    let transaction_id = required(row, "transaction_id", &row.transaction_id)?;
    let customer_id = required(row, "customer_id", &row.customer_id)?;
    let card_number = required(row, "card_number", &row.card_number)?;

    let timestamp_text = required(row, "timestamp", &row.timestamp)?;
    let timestamp = parse_timestamp(&timestamp_text)
        .ok_or_else(|| RowRejected::invalid_timestamp(row, &timestamp_text))?;

    let amount_text = required(row, "amount", &row.amount)?;
    let amount = parse_amount(row, &amount_text)?;

    let hour_text = required(row, "transaction_hour", &row.transaction_hour)?;
    let transaction_hour = parse_hour(&hour_text)
        .ok_or_else(|| RowRejected::invalid_hour(row, &hour_text))?;

    Ok(TransactionRecord {
        customer_id,
        card_number,
        timestamp,
        merchant_category: required(row, "merchant_category", &row.merchant_category)?,
        merchant_type: required(row, "merchant_type", &row.merchant_type)?,
        merchant: required(row, "merchant", &row.merchant)?,
        amount,
        currency: required(row, "currency", &row.currency)?,
        country: required(row, "country", &row.country)?,
        city: required(row, "city", &row.city)?,
        city_size: optional(&row.city_size),
        card_type: optional(&row.card_type),
        card_present: flag(row, "card_present", &row.card_present)?,
        device: optional(&row.device),
        channel: optional(&row.channel),
        device_fingerprint: optional(&row.device_fingerprint),
        ip_address: optional(&row.ip_address),
        distance_from_home: flag(row, "distance_from_home", &row.distance_from_home)?,
        high_risk_merchant: flag(row, "high_risk_merchant", &row.high_risk_merchant)?,
        transaction_hour,
        weekend_transaction: flag(row, "weekend_transaction", &row.weekend_transaction)?,
        velocity_last_hour: velocity(&transaction_id, &row.velocity_last_hour),
        is_fraud: flag(row, "is_fraud", &row.is_fraud)?,
        transaction_id
    })
}

/// Parses a source timestamp into a UTC instant.
///
/// Offset-aware values are converted to UTC; naive values are taken to be UTC already.
pub fn parse_timestamp(value: &str) -> Option<DateTime<Utc>> {
    if let Ok(parsed) = DateTime::parse_from_rfc3339(value) {
        return Some(parsed.with_timezone(&Utc));
    }

    for format in OFFSET_FORMATS {
        if let Ok(parsed) = DateTime::parse_from_str(value, format) {
            return Some(parsed.with_timezone(&Utc));
        }
    }

    NAIVE_FORMATS.iter()
        .find_map(|format| NaiveDateTime::parse_from_str(value, format).ok())
        .map(|parsed| parsed.and_utc())
}

fn parse_amount(row: &RawTransaction, value: &str) -> Result<Decimal, RowRejected> {
    let amount = Decimal::from_str(value)
        .or_else(|_| Decimal::from_scientific(value))
        .map_err(|_| RowRejected::invalid_amount(row, value))?;

    if amount < Decimal::ZERO {
        return Err(RowRejected::negative_amount(row, value));
    }

    Ok(amount)
}

/// Integral values written as floats (`12.0`) are accepted, fractional hours are not.
fn parse_hour(value: &str) -> Option<u8> {
    Decimal::from_str(value).ok()
        .filter(|hour| hour.fract().is_zero())
        .and_then(|hour| hour.to_u8())
        .filter(|hour| *hour <= 23)
}

fn required(row: &RawTransaction, field: &'static str, value: &Option<String>) -> Result<String, RowRejected> {
    optional(value).ok_or_else(|| RowRejected::missing_field(row, field))
}

fn optional(value: &Option<String>) -> Option<String> {
    value.as_deref()
        .map(str::trim)
        .filter(|text| !text.is_empty())
        .map(str::to_string)
}

fn flag(row: &RawTransaction, field: &'static str, value: &Option<String>) -> Result<bool, RowRejected> {
    let Some(text) = value.as_deref().map(str::trim) else {
        return Ok(false)
    };

    match text.to_ascii_lowercase().as_str() {
        "true" | "t" | "yes" | "y" | "1" | "1.0" => Ok(true),
        "false" | "f" | "no" | "n" | "0" | "0.0" | "" => Ok(false),
        _ => Err(RowRejected::invalid_flag(row, field, text))
    }
}

fn velocity(transaction_id: &str, value: &Option<String>) -> VelocityWindow {
    let Some(text) = value.as_deref().map(str::trim).filter(|text| !text.is_empty()) else {
        return VelocityWindow::default()
    };

    text.parse().unwrap_or_else(|error| {
        warn!("Velocity window for row [{transaction_id}] defaulted to empty: {error}");
        VelocityWindow::default()
    })
}
