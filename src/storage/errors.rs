use rusqlite::ErrorCode;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Store error: Unavailable: {0}")]
    Unavailable(String),
    #[error("Store error: Constraint violation: {0}")]
    ConstraintViolation(String),
    #[error("Store error: Stored value could not be decoded: {0}")]
    Decode(String)
}

impl From<rusqlite::Error> for StoreError {
    fn from(error: rusqlite::Error) -> Self {
        match &error {
            rusqlite::Error::SqliteFailure(failure, _) if failure.code == ErrorCode::ConstraintViolation => {
                Self::ConstraintViolation(error.to_string())
            }
            rusqlite::Error::FromSqlConversionFailure(..) | rusqlite::Error::InvalidColumnType(..) => {
                Self::Decode(error.to_string())
            }
            _ => Self::Unavailable(error.to_string())
        }
    }
}
