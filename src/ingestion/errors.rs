use thiserror::Error;

use crate::config::ConfigError;
use crate::storage::StoreError;

#[derive(Debug, Error)]
pub enum IngestError {
    #[error("Ingestion error: {0}")]
    Config(#[from] ConfigError),
    #[error("Ingestion error: Unable to open source [{path}] | {source}")]
    SourceUnavailable {
        path: String,
        source: std::io::Error
    },
    #[error("Ingestion error: Unable to read source [{path}] | {source}")]
    SourceRead {
        path: String,
        source: csv::Error
    },
    #[error("Ingestion error: {0}")]
    StoreUnavailable(StoreError),
    #[error("Ingestion error: Checkpoint [{path}] | {reason}")]
    Checkpoint {
        path: String,
        reason: String
    },
    #[error("Ingestion error: Background task failed | {0}")]
    Task(String),
    #[error("Ingestion error: Row counts do not reconcile: total {total} != inserted {inserted} + skipped {skipped} + duplicates {duplicates} + failed {failed}")]
    CountMismatch {
        total: u64,
        inserted: u64,
        skipped: u64,
        duplicates: u64,
        failed: u64
    }
}
