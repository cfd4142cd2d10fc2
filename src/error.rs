use thiserror::Error;

#[derive(Error, Debug)]
pub enum CardinalityError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON serialization failed: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("record {index}: missing body")]
    MissingBody { index: usize },

    #[error("record {index}: invalid payload: {reason}")]
    InvalidPayload { index: usize, reason: String },

    #[error("workspace query failed: {0}")]
    Query(String),

    #[error("queue publish failed: {0}")]
    Queue(String),

    #[error("gauge registration failed: {0}")]
    Registry(String),
}

pub type Result<T> = std::result::Result<T, CardinalityError>;
