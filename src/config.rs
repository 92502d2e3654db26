use std::path::PathBuf;

use thiserror::Error;

pub const DEFAULT_CHUNK_SIZE: usize = 10_000;
pub const DEFAULT_BACKPRESSURE: usize = 1;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Config error: chunk size must be at least 1")]
    InvalidChunkSize,
    #[error("Config error: backpressure must be at least 1")]
    InvalidBackpressure
}

/// Tunables for one ingestion run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IngestConfig {
    /// Maximum number of deduplicated source rows per chunk. Larger chunks
    /// trade memory for fewer, bigger bulk inserts.
    pub chunk_size: usize,
    /// Number of chunks the reader may buffer ahead of the loader. Besides
    /// the buffered ones, the loader holds the chunk it is inserting and the
    /// reader the chunk it is filling, so raising this multiplies peak memory.
    pub backpressure: usize,
    /// Where to record committed chunks so an interrupted run can resume.
    pub checkpoint: Option<PathBuf>
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            backpressure: DEFAULT_BACKPRESSURE,
            checkpoint: None
        }
    }
}

impl IngestConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.chunk_size == 0 {
            return Err(ConfigError::InvalidChunkSize);
        }

        if self.backpressure == 0 {
            return Err(ConfigError::InvalidBackpressure);
        }

        Ok(())
    }
}
