use super::pagination::{paginate, PageWindow, DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE};
use super::{PageRequest, QueryError, TransactionFilter, TransactionQueryService};
use crate::models::TransactionRecord;
use crate::storage::{MemoryStore, Predicate, SqliteStore, TransactionStore};
use crate::types::VelocityWindow;

use std::str::FromStr;
use std::sync::Arc;

use anyhow::{anyhow, Result};
use chrono::{Duration, TimeZone, Utc};
use rust_decimal::Decimal;

fn create_record(transaction_id: &str, merchant: &str, amount: &str, minutes: i64) -> Result<TransactionRecord> {
    let base = Utc.with_ymd_and_hms(2024, 9, 30, 0, 0, 0).single()
        .ok_or_else(|| anyhow!("invalid fixture instant"))?;

    Ok(TransactionRecord {
        transaction_id: transaction_id.to_string(),
        customer_id: "CUST_001".to_string(),
        card_number: "4111111111111111".to_string(),
        timestamp: base + Duration::minutes(minutes),
        merchant_category: "Retail".to_string(),
        merchant_type: "online".to_string(),
        merchant: merchant.to_string(),
        amount: Decimal::from_str(amount)?,
        currency: "USD".to_string(),
        country: "USA".to_string(),
        city: "New York".to_string(),
        city_size: None,
        card_type: Some("Gold Credit".to_string()),
        card_present: false,
        device: None,
        channel: Some("web".to_string()),
        device_fingerprint: None,
        ip_address: None,
        distance_from_home: false,
        high_risk_merchant: true,
        transaction_hour: 3,
        weekend_transaction: true,
        velocity_last_hour: VelocityWindow::default(),
        is_fraud: true
    })
}

fn create_service(records: &[TransactionRecord]) -> Result<TransactionQueryService<MemoryStore>> {
    let storage = Arc::new(MemoryStore::new());
    storage.bulk_insert(records)?;

    Ok(TransactionQueryService::new(storage))
}

fn ids(records: &[TransactionRecord]) -> Vec<&str> {
    records.iter().map(|record| record.transaction_id.as_str()).collect()
}

#[test]
fn test_paginate_computes_offset_and_limit() -> Result<()> {
    assert_eq!(paginate(1, 10)?, PageWindow { offset: 0, limit: 10 });
    assert_eq!(paginate(3, 25)?, PageWindow { offset: 50, limit: 25 });
    assert_eq!(paginate(1, MAX_PAGE_SIZE)?, PageWindow { offset: 0, limit: 100 });
    assert_eq!(PageRequest::default().window()?, PageWindow { offset: 0, limit: DEFAULT_PAGE_SIZE });

    Ok(())
}

#[test]
fn test_paginate_rejects_out_of_range_values() {
    assert!(matches!(paginate(0, 10), Err(QueryError::InvalidQueryParameter { parameter: "page", .. })));
    assert!(matches!(paginate(1, 0), Err(QueryError::InvalidQueryParameter { parameter: "page_size", .. })));
    assert!(matches!(paginate(1, 101), Err(QueryError::InvalidQueryParameter { parameter: "page_size", .. })));
    assert!(matches!(paginate(u64::MAX, 100), Err(QueryError::InvalidQueryParameter { parameter: "page", .. })));
}

#[test]
fn test_filter_builds_only_present_predicates() -> Result<()> {
    assert!(TransactionFilter::new().predicates().is_empty());
    assert!(TransactionFilter::new().merchant("").predicates().is_empty());
    assert!(TransactionFilter::new().merchant("   ").predicates().is_empty());
    assert_eq!(
        TransactionFilter::new().merchant("  Amazon ").predicates(),
        vec![Predicate::MerchantContains("Amazon".to_string())]
    );

    let filter = TransactionFilter::new()
        .merchant("Amazon")
        .min_amount(Decimal::from(10))
        .max_amount(Decimal::from(20));

    assert_eq!(filter.predicates(), vec![
        Predicate::MerchantContains("Amazon".to_string()),
        Predicate::MinAmount(Decimal::from(10)),
        Predicate::MaxAmount(Decimal::from(20))
    ]);

    Ok(())
}

#[test]
fn test_list_single_record_reports_total() -> Result<()> {
    let service = create_service(&[create_record("TX_001", "Amazon", "100.0", 0)?])?;
    let response = service.list_transactions(PageRequest::new(1, 10))?;

    assert_eq!(response.metadata.total_records, 1);
    assert_eq!(response.transactions.len(), 1);

    Ok(())
}

#[test]
fn test_list_returns_newest_first_with_whole_table_total() -> Result<()> {
    let service = create_service(&[
        create_record("TX_001", "Amazon", "1", 0)?,
        create_record("TX_002", "Walmart", "2", 60)?,
        create_record("TX_003", "Target", "3", 30)?
    ])?;

    let first = service.list_transactions(PageRequest::new(1, 2))?;
    let second = service.list_transactions(PageRequest::new(2, 2))?;
    let past_end = service.list_transactions(PageRequest::new(5, 2))?;

    assert_eq!(ids(&first.transactions), vec!["TX_002", "TX_003"]);
    assert_eq!(ids(&second.transactions), vec!["TX_001"]);
    assert!(past_end.transactions.is_empty());
    assert_eq!(first.metadata.total_records, 3);
    assert_eq!(past_end.metadata.total_records, 3);

    Ok(())
}

#[test]
fn test_list_rejects_invalid_page_before_querying() -> Result<()> {
    let service = create_service(&[])?;
    let result = service.list_transactions(PageRequest::new(0, 10));

    assert!(matches!(&result, Err(error) if error.is_client_error()));

    Ok(())
}

#[test]
fn test_search_matches_merchant_case_insensitively() -> Result<()> {
    let service = create_service(&[
        create_record("TX_001", "Amazon", "100", 0)?,
        create_record("TX_002", "AMAZON Marketplace", "20", 0)?,
        create_record("TX_003", "Walmart", "100", 0)?
    ])?;

    let response = service.search_transactions(&TransactionFilter::new().merchant("Amazon"), PageRequest::default())?;

    assert_eq!(ids(&response.transactions), vec!["TX_001", "TX_002"]);
    assert!(response.transactions.iter().all(|record| record.merchant.to_lowercase().contains("amazon")));
    assert_eq!(response.metadata.total_records, 2);

    Ok(())
}

#[test]
fn test_search_total_honors_filters_not_pagination() -> Result<()> {
    let records = (0..7)
        .map(|index| create_record(&format!("TX_{index:03}"), "Amazon", &(index * 10).to_string(), index))
        .collect::<Result<Vec<_>>>()?;
    let service = create_service(&records)?;

    let filter = TransactionFilter::new().min_amount(Decimal::from(20)).max_amount(Decimal::from(50));
    let response = service.search_transactions(&filter, PageRequest::new(2, 3))?;

    assert_eq!(ids(&response.transactions), vec!["TX_005"]);
    assert_eq!(response.metadata.total_records, 4);

    Ok(())
}

#[test]
fn test_search_with_inverted_amount_range_is_empty_not_an_error() -> Result<()> {
    let service = create_service(&[create_record("TX_001", "Amazon", "75", 0)?])?;
    let filter = TransactionFilter::new().min_amount(Decimal::from(100)).max_amount(Decimal::from(50));
    let response = service.search_transactions(&filter, PageRequest::default())?;

    assert!(response.transactions.is_empty());
    assert_eq!(response.metadata.total_records, 0);

    Ok(())
}

#[test]
fn test_get_distinguishes_not_found_from_malformed_id() -> Result<()> {
    let service = create_service(&[create_record("TX_001", "Amazon", "100", 0)?])?;

    let found = service.get_transaction("TX_001")?.ok_or_else(|| anyhow!("TX_001 not found"))?;

    assert_eq!(found.merchant, "Amazon");
    assert!(service.get_transaction("TX_999")?.is_none());
    assert!(matches!(service.get_transaction("  "), Err(QueryError::InvalidQueryParameter { parameter: "transaction_id", .. })));

    Ok(())
}

#[test]
fn test_service_works_over_sqlite_store() -> Result<()> {
    let storage = Arc::new(SqliteStore::open(":memory:")?);
    storage.bulk_insert(&[
        create_record("TX_001", "Amazon", "100", 0)?,
        create_record("TX_002", "Walmart", "40", 10)?
    ])?;
    let service = TransactionQueryService::new(storage);

    let listed = service.list_transactions(PageRequest::default())?;
    let searched = service.search_transactions(&TransactionFilter::new().merchant("amazon"), PageRequest::default())?;

    assert_eq!(ids(&listed.transactions), vec!["TX_002", "TX_001"]);
    assert_eq!(ids(&searched.transactions), vec!["TX_001"]);
    assert_eq!(service.get_transaction("TX_002")?.map(|record| record.amount), Some(Decimal::from(40)));

    Ok(())
}

#[test]
fn test_response_envelope_serializes_expected_shape() -> Result<()> {
    let service = create_service(&[create_record("TX_001", "Amazon", "100.5", 0)?])?;
    let response = service.list_transactions(PageRequest::default())?;
    let json = serde_json::to_value(&response)?;

    assert_eq!(json["metadata"]["total_records"], 1);
    assert_eq!(json["transactions"][0]["transaction_id"], "TX_001");
    assert_eq!(json["transactions"][0]["amount"], 100.5);
    assert_eq!(json["transactions"][0]["city_size"], serde_json::Value::Null);
    assert_eq!(json["transactions"][0]["velocity_last_hour"], serde_json::json!({}));
    assert_eq!(json["transactions"][0]["timestamp"], "2024-09-30T00:00:00Z");

    Ok(())
}
