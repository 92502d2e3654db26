use std::fmt;
use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};

use crate::ingestion::IngestError;

/// Row accounting for an ingestion run (or a single chunk of one).
///
/// Every source row lands in exactly one bucket, so `total` must always equal
/// `inserted + skipped + duplicates + failed`.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngestReport {
    /// Rows read from the source.
    pub total: u64,
    /// Rows committed to the store.
    pub inserted: u64,
    /// Rows rejected as malformed.
    pub skipped: u64,
    /// Rows dropped because an earlier row had the same transaction id.
    pub duplicates: u64,
    /// Rows lost because the store rejected their chunk.
    pub failed: u64
}

impl IngestReport {
    pub fn merge(&mut self, other: &IngestReport) {
        self.total += other.total;
        self.inserted += other.inserted;
        self.skipped += other.skipped;
        self.duplicates += other.duplicates;
        self.failed += other.failed;
    }

    pub fn is_reconciled(&self) -> bool {
        self.inserted + self.skipped + self.duplicates + self.failed == self.total
    }

    pub fn verify(&self) -> Result<(), IngestError> {
        if self.is_reconciled() {
            return Ok(());
        }

        Err(IngestError::CountMismatch {
            total: self.total,
            inserted: self.inserted,
            skipped: self.skipped,
            duplicates: self.duplicates,
            failed: self.failed
        })
    }
}

impl Display for IngestReport {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
        write!(
            formatter,
            "total={} inserted={} skipped={} duplicates={} failed={}",
            self.total, self.inserted, self.skipped, self.duplicates, self.failed
        )
    }
}
