//! CLI error types.

use thiserror::Error;

use crate::config::ConfigError;

/// CLI errors.
///
/// This enum is marked `#[non_exhaustive]` to allow adding new variants
/// in future versions without breaking downstream code.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    /// No demo module has this name.
    #[error("unknown module '{name}'. Run 'stepbox modules' to list them")]
    UnknownModule { name: String },

    /// The sandbox did not answer a `sponsor` request.
    #[error("module '{module}' exported nothing")]
    NoExports { module: String },

    /// Configuration is invalid or unreadable.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// An error occurred while building the sandbox.
    #[error(transparent)]
    Sandbox(#[from] sandbox::Error),

    /// An error occurred in the marshaling layer.
    #[error(transparent)]
    Marshal(#[from] marshal::Error),

    /// A host behavior failed.
    #[error("host behavior failed: {0}")]
    Host(#[from] capability::Fault),
}

pub type Result<T> = std::result::Result<T, Error>;
