//! Error types for netscope.

use thiserror::Error;

/// Result type alias using netscope's Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for netscope operations.
///
/// The log store itself never fails; these variants cover setup and
/// configuration paths around it.
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// The process-wide interceptors were already installed
    #[error("Interceptors already installed")]
    AlreadyInstalled,

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}
