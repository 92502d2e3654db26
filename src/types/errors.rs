use thiserror::Error;

#[derive(Debug, Error)]
pub enum VelocityParseError {
    #[error("Velocity error: Value is not a dictionary: {0}")]
    NotADictionary(String),
    #[error("Velocity error: Unexpected token '{0}'")]
    UnexpectedToken(String),
    #[error("Velocity error: Unterminated string literal")]
    UnterminatedString,
    #[error("Velocity error: {0}")]
    Json(#[from] serde_json::Error)
}
