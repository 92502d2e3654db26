use std::collections::HashSet;
use std::fs::File;
use std::io::BufReader;
use std::mem;
use std::path::PathBuf;
use std::sync::Arc;

use csv::{ReaderBuilder, Trim};
use tokio::sync::mpsc;
use tokio::task::{spawn_blocking, JoinHandle};
use tracing::{debug, error, info, warn};

use crate::config::IngestConfig;
use crate::ingestion::{Checkpoint, IngestError, IngestReport};
use crate::models::{normalize, RawTransaction, TransactionRecord};
use crate::storage::{StoreError, TransactionStore};

const MAX_PREALLOCATED_ROWS: usize = 16_384;

/// A contiguous batch of deduplicated source rows, loaded as one unit.
struct Chunk {
    index: usize,
    rows: Vec<RawTransaction>,
    /// Rows dropped by deduplication while this chunk was filling.
    duplicates: u64,
    /// Rows the CSV reader could not decode while this chunk was filling.
    unreadable: u64
}

impl Chunk {
    fn new(index: usize, capacity: usize) -> Self {
        Self {
            index,
            rows: Vec::with_capacity(capacity.min(MAX_PREALLOCATED_ROWS)),
            duplicates: 0,
            unreadable: 0
        }
    }

    fn total(&self) -> u64 {
        self.rows.len() as u64 + self.duplicates + self.unreadable
    }

    fn is_empty(&self) -> bool {
        self.total() == 0
    }
}

type ChunkMessage = Result<Chunk, csv::Error>;

/// Batch ingestion of a fraud-labeled CSV into a [`TransactionStore`].
///
/// A blocking reader task deduplicates rows by transaction id (first
/// occurrence wins) and hands fixed-size chunks over a bounded channel. The
/// loader then normalizes and bulk-inserts each chunk in order.
pub struct IngestionEngine<S: TransactionStore> {
    storage: Arc<S>,
    config: IngestConfig
}

impl<S: TransactionStore> IngestionEngine<S> {
    pub fn new(storage: Arc<S>) -> Self {
        Self {
            storage,
            config: IngestConfig::default()
        }
    }

    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.config.chunk_size = chunk_size;
        self
    }

    pub fn with_backpressure(mut self, backpressure: usize) -> Self {
        self.config.backpressure = backpressure;
        self
    }

    pub fn with_checkpoint(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.checkpoint = Some(path.into());
        self
    }

    /// Runs the full pipeline over the CSV at `path`.
    ///
    /// Malformed rows and chunks rejected by the store are counted and do not
    /// stop the run. An unreadable source, an unavailable store or a report
    /// whose counts do not reconcile are returned as errors.
    pub async fn run(&self, path: &str) -> Result<IngestReport, IngestError> {
        self.config.validate()?;

        let file = File::open(path).map_err(|source| IngestError::SourceUnavailable {
            path: path.to_string(),
            source
        })?;

        let resume = self.resume_point(path)?;
        let (sender, receiver) = mpsc::channel::<ChunkMessage>(self.config.backpressure);
        let reader_handle = spawn_chunk_reader(file, self.config.chunk_size, sender);
        let loading_result = self.load_chunks(path, receiver, resume).await;

        if let Err(error) = reader_handle.await {
            error!("CSV reader task failed: {error}");
            return Err(IngestError::Task(error.to_string()));
        }

        let report = loading_result?;
        report.verify()?;

        if let Some(checkpoint) = &self.config.checkpoint {
            Checkpoint::remove(checkpoint)?;
        }

        info!("Ingestion of [{path}] finished: {report}");

        Ok(report)
    }

    fn resume_point(&self, path: &str) -> Result<Option<Checkpoint>, IngestError> {
        let Some(checkpoint_path) = &self.config.checkpoint else {
            return Ok(None)
        };

        match Checkpoint::load(checkpoint_path)? {
            Some(checkpoint) if checkpoint.applies_to(path, self.config.chunk_size) => {
                info!(
                    "Resuming [{path}] after {} committed chunks ({})",
                    checkpoint.chunks_completed, checkpoint.report
                );
                Ok(Some(checkpoint))
            }
            Some(_) => {
                warn!("Checkpoint [{}] belongs to a different source or chunk size, starting over", checkpoint_path.display());
                Ok(None)
            }
            None => Ok(None)
        }
    }

    async fn load_chunks(&self, path: &str, mut receiver: mpsc::Receiver<ChunkMessage>, resume: Option<Checkpoint>) -> Result<IngestReport, IngestError> {
        let resuming = resume.is_some();
        let (mut report, chunks_completed) = match resume {
            Some(checkpoint) => (checkpoint.report, checkpoint.chunks_completed),
            None => (IngestReport::default(), 0)
        };

        while let Some(message) = receiver.recv().await {
            let chunk = message.map_err(|source| IngestError::SourceRead {
                path: path.to_string(),
                source
            })?;

            if chunk.index < chunks_completed {
                debug!("Chunk [{}] was committed by a previous run, skipping", chunk.index);
                continue;
            }

            let index = chunk.index;
            //NOTE: A crash between committing a chunk and saving the checkpoint leaves that chunk stored but unrecorded
            let may_be_committed = resuming && index == chunks_completed;
            let storage = self.storage.clone();
            let outcome = spawn_blocking(move || load_chunk(storage.as_ref(), chunk, may_be_committed)).await
                .map_err(|error| IngestError::Task(error.to_string()))??;

            report.merge(&outcome);
            info!("Inserted {} rows so far.", report.inserted);

            self.save_checkpoint(path, index + 1, report)?;
        }

        Ok(report)
    }

    fn save_checkpoint(&self, path: &str, chunks_completed: usize, report: IngestReport) -> Result<(), IngestError> {
        let Some(checkpoint_path) = &self.config.checkpoint else {
            return Ok(())
        };

        Checkpoint {
            source: path.to_string(),
            chunk_size: self.config.chunk_size,
            chunks_completed,
            report
        }.save(checkpoint_path)
    }
}

fn spawn_chunk_reader(file: File, chunk_size: usize, sender: mpsc::Sender<ChunkMessage>) -> JoinHandle<()> {
    spawn_blocking(move || {
        let mut reader = ReaderBuilder::new()
            .trim(Trim::All)
            .flexible(true)
            .from_reader(BufReader::new(file));

        let mut seen = HashSet::<String>::new();
        let mut chunk = Chunk::new(0, chunk_size);

        for result in reader.deserialize::<RawTransaction>() {
            match result {
                Ok(row) => {
                    let duplicate = row.transaction_id()
                        .is_some_and(|transaction_id| !seen.insert(transaction_id.to_string()));

                    if duplicate {
                        debug!("Duplicate transaction [{}] dropped", row.display_id());
                        chunk.duplicates += 1;
                    } else {
                        chunk.rows.push(row);
                    }
                }
                Err(error) if error.is_io_error() => {
                    let _ = sender.blocking_send(Err(error));
                    return;
                }
                Err(error) => {
                    warn!("CSV deserialization error: {error}");
                    chunk.unreadable += 1;
                }
            }

            if chunk.rows.len() == chunk_size {
                let next = Chunk::new(chunk.index + 1, chunk_size);

                if sender.blocking_send(Ok(mem::replace(&mut chunk, next))).is_err() {
                    return;
                }
            }
        }

        //NOTE: Trailing duplicates or unreadable rows still need to be reported, even without rows to insert
        if !chunk.is_empty() {
            let _ = sender.blocking_send(Ok(chunk));
        }
    })
}

fn load_chunk<S: TransactionStore>(storage: &S, chunk: Chunk, may_be_committed: bool) -> Result<IngestReport, IngestError> {
    let mut outcome = IngestReport {
        total: chunk.total(),
        duplicates: chunk.duplicates,
        skipped: chunk.unreadable,
        ..IngestReport::default()
    };

    let records: Vec<TransactionRecord> = chunk.rows.iter()
        .filter_map(|row| match normalize(row) {
            Ok(record) => Some(record),
            Err(rejection) => {
                warn!("{rejection}");
                outcome.skipped += 1;
                None
            }
        })
        .collect();

    if records.is_empty() {
        return Ok(outcome);
    }

    match storage.bulk_insert(&records) {
        Ok(inserted) => {
            outcome.inserted += inserted as u64;
        }
        Err(StoreError::Unavailable(reason)) => {
            return Err(IngestError::StoreUnavailable(StoreError::Unavailable(reason)));
        }
        Err(StoreError::ConstraintViolation(_)) if may_be_committed && all_stored(storage, &records)? => {
            info!("Chunk [{}] was committed before the previous run stopped, counting it as inserted", chunk.index);
            outcome.inserted += records.len() as u64;
        }
        Err(error) => {
            error!("Chunk [{}] was not inserted, {} rows lost: {error}", chunk.index, records.len());
            outcome.failed += records.len() as u64;
        }
    }

    Ok(outcome)
}

/// Chunk inserts are all-or-nothing, so a chunk whose rows are all present was
/// committed as a whole.
fn all_stored<S: TransactionStore>(storage: &S, records: &[TransactionRecord]) -> Result<bool, IngestError> {
    for record in records {
        if storage.get(&record.transaction_id).map_err(IngestError::StoreUnavailable)?.is_none() {
            return Ok(false);
        }
    }

    Ok(true)
}
