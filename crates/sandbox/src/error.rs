use thiserror::Error;

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    #[error("domain name collision: {0}")]
    NameCollision(String),

    #[error("entropy source failed: {0}")]
    Entropy(String),

    #[error("config error: {0}")]
    Config(String),

    #[error("malformed bundle: {0}")]
    Bundle(String),

    #[error(transparent)]
    Request(#[from] capability::Error),

    #[error(transparent)]
    Marshal(#[from] marshal::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
