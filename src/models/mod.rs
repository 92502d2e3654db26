mod errors;
mod normalizer;
mod raw;
mod transaction;

pub use errors::RowRejected;
pub use normalizer::normalize;
pub use raw::RawTransaction;
pub use transaction::TransactionRecord;
