use super::{MemoryStore, Predicate, SortOrder, SqliteStore, StoreError, TransactionStore};
use crate::models::TransactionRecord;
use crate::types::VelocityWindow;

use std::str::FromStr;

use anyhow::{anyhow, Result};
use chrono::{Duration, TimeZone, Utc};
use rust_decimal::Decimal;
use tempfile::NamedTempFile;

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
        city_size: Some("large".to_string()),
        card_type: None,
        card_present: false,
        device: Some("Chrome".to_string()),
        channel: Some("web".to_string()),
        device_fingerprint: None,
        ip_address: Some("192.168.1.1".to_string()),
        distance_from_home: true,
        high_risk_merchant: false,
        transaction_hour: 12,
        weekend_transaction: false,
        velocity_last_hour: VelocityWindow {
            num_transactions: Some(5),
            total_amount: Some(500.0),
            ..VelocityWindow::default()
        },
        is_fraud: false
    })
}

fn seed<S: TransactionStore>(store: &S) -> Result<()> {
    store.bulk_insert(&[
        create_record("TX_001", "Amazon", "100.00", 10)?,
        create_record("TX_002", "amazon fresh", "25.50", 30)?,
        create_record("TX_003", "Walmart", "75.25", 20)?,
        create_record("TX_004", "Best Buy", "500", 5)?
    ])?;

    Ok(())
}

fn assert_round_trips_records<S: TransactionStore>(store: &S) -> Result<()> {
    let record = create_record("TX_001", "Amazon", "100.10", 0)?;
    store.bulk_insert(std::slice::from_ref(&record))?;

    let stored = store.get("TX_001")?.ok_or_else(|| anyhow!("TX_001 missing from store"))?;

    assert_eq!(stored, record);
    assert!(store.get("TX_999")?.is_none());

    Ok(())
}

fn assert_rejects_chunk_with_existing_key<S: TransactionStore>(store: &S) -> Result<()> {
    store.bulk_insert(&[create_record("TX_001", "Amazon", "1", 0)?])?;

    let result = store.bulk_insert(&[
        create_record("TX_002", "Walmart", "2", 0)?,
        create_record("TX_001", "Amazon", "3", 0)?
    ]);

    assert!(matches!(result, Err(StoreError::ConstraintViolation(_))));
    assert!(store.get("TX_002")?.is_none(), "failed chunk must not be partially stored");
    assert_eq!(store.count(&[])?, 1);

    Ok(())
}

fn assert_orders_newest_first_and_paginates<S: TransactionStore>(store: &S) -> Result<()> {
    seed(store)?;

    let first_page = store.query(&[], SortOrder::NewestFirst, 0, 2)?;
    let second_page = store.query(&[], SortOrder::NewestFirst, 2, 2)?;
    let beyond = store.query(&[], SortOrder::NewestFirst, 4, 2)?;

    let ids = |records: &[TransactionRecord]| records.iter().map(|r| r.transaction_id.clone()).collect::<Vec<_>>();

    assert_eq!(ids(&first_page), vec!["TX_002", "TX_003"]);
    assert_eq!(ids(&second_page), vec!["TX_001", "TX_004"]);
    assert!(beyond.is_empty());

    Ok(())
}

fn assert_filters_with_conjunction<S: TransactionStore>(store: &S) -> Result<()> {
    seed(store)?;

    let merchant = [Predicate::MerchantContains("AMAZON".to_string())];
    let amazon = store.query(&merchant, SortOrder::TransactionId, 0, 10)?;

    assert_eq!(amazon.len(), 2);
    assert_eq!(store.count(&merchant)?, 2);

    let bounded = [
        Predicate::MerchantContains("amazon".to_string()),
        Predicate::MinAmount(Decimal::from(50))
    ];
    let result = store.query(&bounded, SortOrder::TransactionId, 0, 10)?;

    assert_eq!(result.len(), 1);
    assert_eq!(result[0].transaction_id, "TX_001");

    let range = [
        Predicate::MinAmount(Decimal::from_str("75.25")?),
        Predicate::MaxAmount(Decimal::from(100))
    ];

    assert_eq!(store.count(&range)?, 2);

    let inverted = [Predicate::MinAmount(Decimal::from(100)), Predicate::MaxAmount(Decimal::from(50))];

    assert!(store.query(&inverted, SortOrder::TransactionId, 0, 10)?.is_empty());
    assert_eq!(store.count(&inverted)?, 0);

    Ok(())
}

#[test]
fn test_memory_store_round_trips_records() -> Result<()> {
    assert_round_trips_records(&MemoryStore::new())
}

fn assert_matches_merchant_ignoring_unicode_case<S: TransactionStore>(store: &S) -> Result<()> {
    store.bulk_insert(&[
        create_record("TX_001", "CAFÉ Ñandú", "1", 0)?,
        create_record("TX_002", "Cafe Nandu", "1", 0)?,
        create_record("TX_003", "Straße Market", "1", 0)?
    ])?;

    let accented = [Predicate::MerchantContains("café ñandú".to_string())];
    let upper = [Predicate::MerchantContains("STRASSE".to_string())];
    let sharp = [Predicate::MerchantContains("STRAßE".to_string())];

    assert_eq!(store.count(&accented)?, 1);
    assert_eq!(store.query(&accented, SortOrder::TransactionId, 0, 10)?[0].transaction_id, "TX_001");
    assert_eq!(store.count(&upper)?, 0);
    assert_eq!(store.count(&sharp)?, 1);

    Ok(())
}

#[test]
fn test_memory_store_matches_merchant_ignoring_unicode_case() -> Result<()> {
    assert_matches_merchant_ignoring_unicode_case(&MemoryStore::new())
}

#[test]
fn test_sqlite_store_matches_merchant_ignoring_unicode_case() -> Result<()> {
    assert_matches_merchant_ignoring_unicode_case(&SqliteStore::open(":memory:")?)
}

#[test]
fn test_memory_store_rejects_whole_chunk_on_duplicate_key() -> Result<()> {
    assert_rejects_chunk_with_existing_key(&MemoryStore::new())
}

#[test]
fn test_memory_store_rejects_duplicate_keys_within_one_chunk() -> Result<()> {
    let store = MemoryStore::new();
    let result = store.bulk_insert(&[
        create_record("TX_001", "Amazon", "1", 0)?,
        create_record("TX_001", "Amazon", "1", 0)?
    ]);

    assert!(matches!(result, Err(StoreError::ConstraintViolation(_))));
    assert_eq!(store.count(&[])?, 0);

    Ok(())
}

#[test]
fn test_memory_store_orders_newest_first_and_paginates() -> Result<()> {
    assert_orders_newest_first_and_paginates(&MemoryStore::new())
}

#[test]
fn test_memory_store_filters_with_conjunction() -> Result<()> {
    assert_filters_with_conjunction(&MemoryStore::new())
}

#[test]
fn test_sqlite_store_round_trips_records() -> Result<()> {
    assert_round_trips_records(&SqliteStore::open(":memory:")?)
}

#[test]
fn test_sqlite_store_rejects_whole_chunk_on_duplicate_key() -> Result<()> {
    assert_rejects_chunk_with_existing_key(&SqliteStore::open(":memory:")?)
}

#[test]
fn test_sqlite_store_orders_newest_first_and_paginates() -> Result<()> {
    assert_orders_newest_first_and_paginates(&SqliteStore::open(":memory:")?)
}

#[test]
fn test_sqlite_store_filters_with_conjunction() -> Result<()> {
    assert_filters_with_conjunction(&SqliteStore::open(":memory:")?)
}

#[test]
fn test_sqlite_store_treats_like_wildcards_in_merchant_literally() -> Result<()> {
    let store = SqliteStore::open(":memory:")?;
    store.bulk_insert(&[
        create_record("TX_001", "100% Organic", "1", 0)?,
        create_record("TX_002", "1000 Organic", "1", 0)?
    ])?;

    let result = store.query(&[Predicate::MerchantContains("0%".to_string())], SortOrder::TransactionId, 0, 10)?;

    assert_eq!(result.len(), 1);
    assert_eq!(result[0].transaction_id, "TX_001");

    Ok(())
}

#[test]
fn test_sqlite_store_persists_across_reopen() -> Result<()> {
    let file = NamedTempFile::new()?;

    {
        let store = SqliteStore::open(file.path())?;
        store.bulk_insert(&[create_record("TX_001", "Amazon", "1", 0)?])?;
    }

    let reopened = SqliteStore::open(file.path())?;

    assert_eq!(reopened.count(&[])?, 1);
    assert!(reopened.get("TX_001")?.is_some());

    Ok(())
}
