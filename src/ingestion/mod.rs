mod checkpoint;
mod errors;
mod pipeline;
mod report;

pub use checkpoint::Checkpoint;
pub use errors::IngestError;
pub use pipeline::IngestionEngine;
pub use report::IngestReport;
