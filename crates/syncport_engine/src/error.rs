//! Error types for the engine.

use crate::schema::SchemaError;
use syncport_destination::DestinationError;
use syncport_protocol::{codes, Operation, ProtocolError, RpcError};
use thiserror::Error;

/// Result type for engine operations.
pub type EngineResult<T> = Result<T, EngineError>;

/// Errors that fail a whole connector call.
///
/// Per-record failures never show up here; they are reported inside
/// `record_results`.
#[derive(Error, Debug)]
pub enum EngineError {
    /// The request could not be decoded or the result encoded.
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// The sync plan's schema is unusable.
    #[error("invalid sync plan: {0}")]
    Schema(#[from] SchemaError),

    /// The destination does not accept this operation for the object.
    #[error("operation {operation} is not supported for object {object}")]
    UnsupportedOperation {
        /// Object API name.
        object: String,
        /// Requested operation.
        operation: Operation,
    },

    /// The destination failed as a whole.
    #[error("destination error: {0}")]
    Destination(#[from] DestinationError),
}

impl EngineError {
    /// Returns true if the failure is on the connector's side rather than
    /// caused by the request.
    pub fn is_systemic(&self) -> bool {
        match self {
            EngineError::Protocol(err) => !err.is_client_error(),
            EngineError::Schema(_) | EngineError::UnsupportedOperation { .. } => false,
            EngineError::Destination(err) => !err.is_client_error(),
        }
    }

    /// Returns the JSON-RPC error code for this error.
    pub fn rpc_code(&self) -> i64 {
        match self {
            EngineError::Protocol(err) => err.rpc_code(),
            EngineError::Schema(_) | EngineError::UnsupportedOperation { .. } => {
                codes::INVALID_PARAMS
            }
            EngineError::Destination(err) if err.is_client_error() => codes::INVALID_PARAMS,
            EngineError::Destination(_) => codes::DESTINATION_ERROR,
        }
    }

    /// Converts to a JSON-RPC error object.
    pub fn to_rpc_error(&self) -> RpcError {
        RpcError::new(self.rpc_code(), self.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_errors_are_invalid_params() {
        let err = EngineError::from(SchemaError::NoActiveIdentifier);
        assert_eq!(err.rpc_code(), codes::INVALID_PARAMS);
        assert!(!err.is_systemic());

        let err = EngineError::UnsupportedOperation {
            object: "user".into(),
            operation: Operation::Insert,
        };
        assert_eq!(err.rpc_code(), codes::INVALID_PARAMS);
        assert_eq!(
            err.to_string(),
            "operation insert is not supported for object user"
        );

        let err = EngineError::from(DestinationError::UnknownObject("invoice".into()));
        assert_eq!(err.rpc_code(), codes::INVALID_PARAMS);
        assert!(!err.is_systemic());
    }

    #[test]
    fn destination_failures_are_systemic() {
        let err = EngineError::from(DestinationError::Transaction("commit failed".into()));
        assert!(err.is_systemic());
        assert_eq!(err.rpc_code(), codes::DESTINATION_ERROR);

        let rpc = err.to_rpc_error();
        assert_eq!(rpc.code, codes::DESTINATION_ERROR);
        assert!(rpc.message.contains("commit failed"));
    }

    #[test]
    fn protocol_errors_keep_their_code() {
        let err = EngineError::from(ProtocolError::UnknownMethod("drop_table".into()));
        assert_eq!(err.rpc_code(), codes::METHOD_NOT_FOUND);
        assert!(!err.is_systemic());
        assert_eq!(err.to_string(), "unknown method: drop_table");
    }
}
