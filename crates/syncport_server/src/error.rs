//! Error types for the server.

use syncport_destination::DestinationError;
use thiserror::Error;

/// Result type for server operations.
pub type ServerResult<T> = Result<T, ServerError>;

/// Errors that can occur in the server.
#[derive(Error, Debug)]
pub enum ServerError {
    /// Invalid configuration.
    #[error("invalid configuration: {0}")]
    Config(String),

    /// The shared secret did not match.
    #[error("unauthorized")]
    Unauthorized,

    /// The request body exceeded the configured limit.
    #[error("request body exceeds {0} bytes")]
    PayloadTooLarge(usize),

    /// The destination could not be built.
    #[error("destination error: {0}")]
    Destination(#[from] DestinationError),

    /// I/O error while binding or serving.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl ServerError {
    /// Returns true if this is a client error (4xx).
    pub fn is_client_error(&self) -> bool {
        matches!(self, ServerError::Unauthorized | ServerError::PayloadTooLarge(_))
    }

    /// Returns the HTTP status code for this error.
    pub fn status_code(&self) -> u16 {
        match self {
            ServerError::Unauthorized => 401,
            ServerError::PayloadTooLarge(_) => 413,
            ServerError::Config(_) | ServerError::Destination(_) | ServerError::Io(_) => 500,
        }
    }
}
