//! Error types for destinations.

use serde_json::Value;
use std::time::Duration;
use thiserror::Error;

/// Result type for destination operations.
pub type DestinationResult<T> = Result<T, DestinationError>;

/// Errors that affect a whole call rather than a single record.
#[derive(Error, Debug)]
pub enum DestinationError {
    /// Object is not known to the destination.
    #[error("unknown object: {0}")]
    UnknownObject(String),

    /// Destination cannot be configured from what was supplied.
    #[error("configuration error: {0}")]
    Config(String),

    /// Could not reach the destination.
    #[error("connection failed: {0}")]
    Connection(String),

    /// A SQL statement failed outside any record write.
    #[error("query failed: {0}")]
    Query(#[from] tokio_postgres::Error),

    /// An HTTP call failed outside any record write.
    #[error("http request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The destination answered with something unusable.
    #[error("unexpected response: {0}")]
    UnexpectedResponse(String),

    /// The batch transaction could not be committed.
    #[error("transaction failed: {0}")]
    Transaction(String),
}

impl DestinationError {
    /// Returns true if the request named something the destination does not have.
    pub fn is_client_error(&self) -> bool {
        matches!(self, DestinationError::UnknownObject(_))
    }
}

/// Errors writing a single record.
///
/// These never abort a batch; each one becomes a failed record result.
#[derive(Error, Debug)]
pub enum RecordError {
    /// An update targeted a record that does not exist.
    #[error("record not found: {identifier}")]
    RecordNotFound {
        /// Active identifier value.
        identifier: Value,
    },

    /// An insert targeted a record that already exists.
    #[error("record already exists: {identifier}")]
    AlreadyExists {
        /// Active identifier value.
        identifier: Value,
    },

    /// A value cannot be written to its column.
    #[error("invalid value for {column}: {reason}")]
    InvalidValue {
        /// Column or field name.
        column: String,
        /// What is wrong with the value.
        reason: String,
    },

    /// The destination refused the write.
    #[error("rejected by destination: {0}")]
    Rejected(String),

    /// The destination failed while writing.
    #[error("destination error: {0}")]
    Backend(String),

    /// The write did not finish in time.
    #[error("write timed out after {0:?}")]
    Timeout(Duration),
}

impl RecordError {
    /// Creates an [`RecordError::InvalidValue`].
    pub fn invalid(column: impl Into<String>, reason: impl Into<String>) -> Self {
        RecordError::InvalidValue {
            column: column.into(),
            reason: reason.into(),
        }
    }
}
