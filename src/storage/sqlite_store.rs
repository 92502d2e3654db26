use std::path::Path;
use std::str::FromStr;
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::functions::FunctionFlags;
use rusqlite::types::{Type, Value};
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Row};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use tracing::debug;

use crate::models::TransactionRecord;
use crate::storage::{Predicate, SortOrder, StoreError, TransactionStore};

const SCHEMA: &str = "
    CREATE TABLE IF NOT EXISTS transactions (
        transaction_id      TEXT PRIMARY KEY NOT NULL,
        customer_id         TEXT NOT NULL,
        card_number         TEXT NOT NULL,
        timestamp           TEXT NOT NULL,
        merchant_category   TEXT NOT NULL,
        merchant_type       TEXT NOT NULL,
        merchant            TEXT NOT NULL,
        amount              TEXT NOT NULL,
        currency            TEXT NOT NULL,
        country             TEXT NOT NULL,
        city                TEXT NOT NULL,
        city_size           TEXT,
        card_type           TEXT,
        card_present        INTEGER NOT NULL,
        device              TEXT,
        channel             TEXT,
        device_fingerprint  TEXT,
        ip_address          TEXT,
        distance_from_home  INTEGER NOT NULL,
        high_risk_merchant  INTEGER NOT NULL,
        transaction_hour    INTEGER NOT NULL,
        weekend_transaction INTEGER NOT NULL,
        velocity_last_hour  TEXT NOT NULL,
        is_fraud            INTEGER NOT NULL
    );
    CREATE INDEX IF NOT EXISTS idx_transactions_timestamp ON transactions (timestamp);
    CREATE INDEX IF NOT EXISTS idx_transactions_customer_id ON transactions (customer_id);
    CREATE INDEX IF NOT EXISTS idx_transactions_merchant ON transactions (merchant);
";

const COLUMNS: &str = "transaction_id, customer_id, card_number, timestamp, merchant_category, merchant_type, \
    merchant, amount, currency, country, city, city_size, card_type, card_present, device, channel, \
    device_fingerprint, ip_address, distance_from_home, high_risk_merchant, transaction_hour, \
    weekend_transaction, velocity_last_hour, is_fraud";

const INSERT: &str = "INSERT INTO transactions (transaction_id, customer_id, card_number, timestamp, \
    merchant_category, merchant_type, merchant, amount, currency, country, city, city_size, card_type, \
    card_present, device, channel, device_fingerprint, ip_address, distance_from_home, high_risk_merchant, \
    transaction_hour, weekend_transaction, velocity_last_hour, is_fraud) \
    VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17, ?18, ?19, ?20, ?21, ?22, ?23, ?24)";

/// SQLite-backed relational store.
///
/// Timestamps are stored as fixed-width RFC 3339 text so that lexical order is
/// chronological, amounts as exact decimal text, and the velocity window as a
/// JSON document. Merchant matching folds case with Unicode rules through a
/// scalar function registered on the connection.
pub struct SqliteStore {
    connection: Mutex<Connection>
}

impl SqliteStore {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        Self::initialize(Connection::open(path)?)
    }

    fn initialize(connection: Connection) -> Result<Self, StoreError> {
        //NOTE: SQLite's own lower() and LIKE only fold ASCII letters
        connection.create_scalar_function(
            "lower_unicode",
            1,
            FunctionFlags::SQLITE_UTF8 | FunctionFlags::SQLITE_DETERMINISTIC,
            |context| {
                let text: Option<String> = context.get(0)?;
                Ok(text.map(|text| text.to_lowercase()))
            }
        )?;
        connection.execute_batch(SCHEMA)?;

        Ok(Self {
            connection: Mutex::new(connection)
        })
    }

    fn connection(&self) -> Result<MutexGuard<'_, Connection>, StoreError> {
        self.connection.lock()
            .map_err(|_| StoreError::Unavailable("SQLite connection lock is poisoned".to_string()))
    }
}

impl TransactionStore for SqliteStore {
    fn bulk_insert(&self, records: &[TransactionRecord]) -> Result<usize, StoreError> {
        let mut connection = self.connection()?;
        let transaction = connection.transaction()?;

        {
            let mut statement = transaction.prepare_cached(INSERT)?;

            for record in records {
                let velocity = serde_json::to_string(&record.velocity_last_hour)
                    .map_err(|error| StoreError::Decode(error.to_string()))?;

                statement.execute(params![
                    record.transaction_id,
                    record.customer_id,
                    record.card_number,
                    encode_timestamp(&record.timestamp),
                    record.merchant_category,
                    record.merchant_type,
                    record.merchant,
                    record.amount.to_string(),
                    record.currency,
                    record.country,
                    record.city,
                    record.city_size,
                    record.card_type,
                    record.card_present,
                    record.device,
                    record.channel,
                    record.device_fingerprint,
                    record.ip_address,
                    record.distance_from_home,
                    record.high_risk_merchant,
                    record.transaction_hour,
                    record.weekend_transaction,
                    velocity,
                    record.is_fraud
                ])?;
            }
        }

        //NOTE: Dropping the transaction on any error above rolls the whole chunk back
        transaction.commit()?;

        Ok(records.len())
    }

    fn query(&self, predicates: &[Predicate], order: SortOrder, offset: u64, limit: u64) -> Result<Vec<TransactionRecord>, StoreError> {
        let (clause, mut values) = where_clause(predicates);
        let order_by = match order {
            SortOrder::NewestFirst => "timestamp DESC, transaction_id ASC",
            SortOrder::TransactionId => "transaction_id ASC"
        };
        let sql = format!("SELECT {COLUMNS} FROM transactions{clause} ORDER BY {order_by} LIMIT ? OFFSET ?");

        values.push(Value::Integer(i64::try_from(limit).unwrap_or(i64::MAX)));
        values.push(Value::Integer(i64::try_from(offset).unwrap_or(i64::MAX)));

        debug!("SQLite query: {sql}");

        let connection = self.connection()?;
        let mut statement = connection.prepare_cached(&sql)?;
        let records = statement.query_map(params_from_iter(values), read_record)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(records)
    }

    fn count(&self, predicates: &[Predicate]) -> Result<u64, StoreError> {
        let (clause, values) = where_clause(predicates);
        let sql = format!("SELECT COUNT(*) FROM transactions{clause}");

        let connection = self.connection()?;
        let count: i64 = connection.prepare_cached(&sql)?
            .query_row(params_from_iter(values), |row| row.get(0))?;

        Ok(u64::try_from(count).unwrap_or_default())
    }

    fn get(&self, transaction_id: &str) -> Result<Option<TransactionRecord>, StoreError> {
        let sql = format!("SELECT {COLUMNS} FROM transactions WHERE transaction_id = ?1");

        let connection = self.connection()?;
        let record = connection.prepare_cached(&sql)?
            .query_row(params![transaction_id], read_record)
            .optional()?;

        Ok(record)
    }
}

fn where_clause(predicates: &[Predicate]) -> (String, Vec<Value>) {
    if predicates.is_empty() {
        return (String::new(), Vec::new());
    }

    let mut conditions = Vec::with_capacity(predicates.len());
    let mut values = Vec::with_capacity(predicates.len());

    for predicate in predicates {
        match predicate {
            Predicate::MerchantContains(text) => {
                conditions.push("lower_unicode(merchant) LIKE ? ESCAPE '\\'");
                values.push(Value::Text(format!("%{}%", escape_like(&text.to_lowercase()))));
            }
            Predicate::MinAmount(minimum) => {
                conditions.push("CAST(amount AS REAL) >= ?");
                values.push(Value::Real(minimum.to_f64().unwrap_or(f64::MAX)));
            }
            Predicate::MaxAmount(maximum) => {
                conditions.push("CAST(amount AS REAL) <= ?");
                values.push(Value::Real(maximum.to_f64().unwrap_or(f64::MAX)));
            }
        }
    }

    (format!(" WHERE {}", conditions.join(" AND ")), values)
}

fn escape_like(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());

    for character in text.chars() {
        if matches!(character, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(character);
    }

    escaped
}

fn encode_timestamp(timestamp: &DateTime<Utc>) -> String {
    timestamp.to_rfc3339_opts(SecondsFormat::Nanos, true)
}

fn read_record(row: &Row<'_>) -> rusqlite::Result<TransactionRecord> {
    let timestamp: String = row.get("timestamp")?;
    let amount: String = row.get("amount")?;
    let velocity: String = row.get("velocity_last_hour")?;

    Ok(TransactionRecord {
        transaction_id: row.get("transaction_id")?,
        customer_id: row.get("customer_id")?,
        card_number: row.get("card_number")?,
        timestamp: DateTime::parse_from_rfc3339(&timestamp)
            .map(|parsed| parsed.with_timezone(&Utc))
            .map_err(|error| conversion_failure(3, error))?,
        merchant_category: row.get("merchant_category")?,
        merchant_type: row.get("merchant_type")?,
        merchant: row.get("merchant")?,
        amount: Decimal::from_str(&amount).map_err(|error| conversion_failure(7, error))?,
        currency: row.get("currency")?,
        country: row.get("country")?,
        city: row.get("city")?,
        city_size: row.get("city_size")?,
        card_type: row.get("card_type")?,
        card_present: row.get("card_present")?,
        device: row.get("device")?,
        channel: row.get("channel")?,
        device_fingerprint: row.get("device_fingerprint")?,
        ip_address: row.get("ip_address")?,
        distance_from_home: row.get("distance_from_home")?,
        high_risk_merchant: row.get("high_risk_merchant")?,
        transaction_hour: row.get("transaction_hour")?,
        weekend_transaction: row.get("weekend_transaction")?,
        velocity_last_hour: serde_json::from_str(&velocity).map_err(|error| conversion_failure(22, error))?,
        is_fraud: row.get("is_fraud")?
    })
}

/// Indices follow the order of [`COLUMNS`].
fn conversion_failure<E>(index: usize, error: E) -> rusqlite::Error
where
    E: std::error::Error + Send + Sync + 'static,
{
    rusqlite::Error::FromSqlConversionFailure(index, Type::Text, Box::new(error))
}
