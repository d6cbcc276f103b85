//! Capability error types.

use thiserror::Error;

/// Errors raised while reading the shape of a message.
///
/// This enum is marked `#[non_exhaustive]` to allow adding new variants
/// in future versions without breaking downstream code.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum Error {
    /// A required field is absent from a message.
    #[error("missing field: {0}")]
    MissingField(String),

    /// A field is present but holds a value of the wrong kind.
    #[error("field {field} must be {expected}, found {found}")]
    UnexpectedType {
        field: String,
        expected: &'static str,
        found: &'static str,
    },
}

pub type Result<T> = std::result::Result<T, Error>;
