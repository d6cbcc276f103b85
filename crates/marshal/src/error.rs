//! Marshaling error types.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid capability URI: {0}")]
    InvalidUri(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("cannot decode message: {0}")]
    Decode(String),

    #[error("unknown capability: {0}")]
    UnknownCapability(String),

    #[error("number cannot be encoded: {0}")]
    NonFiniteNumber(f64),

    #[error("invalid envelope: {0}")]
    Envelope(#[from] capability::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
