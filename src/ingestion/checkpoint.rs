use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::ingestion::{IngestError, IngestReport};

/// Progress marker written after every committed chunk.
///
/// Chunk boundaries are deterministic for a given source and chunk size, so a
/// later run over the same input can skip the first `chunks_completed` chunks
/// and carry on from `report`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Checkpoint {
    pub source: String,
    pub chunk_size: usize,
    pub chunks_completed: usize,
    pub report: IngestReport
}

impl Checkpoint {
    pub fn load(path: &Path) -> Result<Option<Self>, IngestError> {
        if !path.exists() {
            return Ok(None);
        }

        let content = fs::read_to_string(path).map_err(|error| checkpoint_error(path, error))?;
        let checkpoint = serde_json::from_str(&content).map_err(|error| checkpoint_error(path, error))?;

        Ok(Some(checkpoint))
    }

    /// Writes to a sibling temporary file first so a crash never leaves a torn checkpoint.
    pub fn save(&self, path: &Path) -> Result<(), IngestError> {
        let content = serde_json::to_string_pretty(self).map_err(|error| checkpoint_error(path, error))?;
        let staging = path.with_extension("partial");

        fs::write(&staging, content).map_err(|error| checkpoint_error(path, error))?;
        fs::rename(&staging, path).map_err(|error| checkpoint_error(path, error))?;

        Ok(())
    }

    pub fn remove(path: &Path) -> Result<(), IngestError> {
        if path.exists() {
            fs::remove_file(path).map_err(|error| checkpoint_error(path, error))?;
        }

        Ok(())
    }

    pub fn applies_to(&self, source: &str, chunk_size: usize) -> bool {
        self.source == source && self.chunk_size == chunk_size
    }
}

fn checkpoint_error(path: &Path, error: impl ToString) -> IngestError {
    IngestError::Checkpoint {
        path: path.display().to_string(),
        reason: error.to_string()
    }
}
