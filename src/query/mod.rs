mod errors;
mod filter;
mod pagination;
mod response;
mod service;
#[cfg(test)]
mod tests;

pub use errors::QueryError;
pub use filter::TransactionFilter;
pub use pagination::PageRequest;
pub use response::TransactionsResponse;
pub use service::TransactionQueryService;
