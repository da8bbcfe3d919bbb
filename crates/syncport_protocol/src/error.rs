//! Error types for the connector protocol.

use thiserror::Error;

/// Result type for protocol operations.
pub type ProtocolResult<T> = Result<T, ProtocolError>;

/// JSON-RPC 2.0 error codes used by syncport.
pub mod codes {
    /// Body is not valid JSON.
    pub const PARSE_ERROR: i64 = -32700;
    /// Body is JSON but not a request object.
    pub const INVALID_REQUEST: i64 = -32600;
    /// Method is not one of the six connector methods.
    pub const METHOD_NOT_FOUND: i64 = -32601;
    /// Params do not match the method.
    pub const INVALID_PARAMS: i64 = -32602;
    /// Unexpected failure inside the connector.
    pub const INTERNAL_ERROR: i64 = -32603;
    /// The destination failed in a way that invalidates the whole call.
    pub const DESTINATION_ERROR: i64 = -32000;
}

/// Errors decoding or validating a connector request.
#[derive(Error, Debug)]
pub enum ProtocolError {
    /// Body is not valid JSON.
    #[error("parse error: {0}")]
    Parse(#[source] serde_json::Error),

    /// Body is JSON but not a well formed request.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// Method name is not recognized.
    #[error("unknown method: {0}")]
    UnknownMethod(String),

    /// Params could not be decoded for the method.
    #[error("invalid params for {method}: {source}")]
    InvalidParams {
        /// Method being decoded.
        method: &'static str,
        /// Decode failure.
        #[source]
        source: serde_json::Error,
    },

    /// A result could not be encoded.
    #[error("failed to encode result: {0}")]
    Encode(#[source] serde_json::Error),
}

impl ProtocolError {
    /// Returns the JSON-RPC error code for this error.
    pub fn rpc_code(&self) -> i64 {
        match self {
            ProtocolError::Parse(_) => codes::PARSE_ERROR,
            ProtocolError::InvalidRequest(_) => codes::INVALID_REQUEST,
            ProtocolError::UnknownMethod(_) => codes::METHOD_NOT_FOUND,
            ProtocolError::InvalidParams { .. } => codes::INVALID_PARAMS,
            ProtocolError::Encode(_) => codes::INTERNAL_ERROR,
        }
    }

    /// Returns true if the caller sent something wrong.
    pub fn is_client_error(&self) -> bool {
        !matches!(self, ProtocolError::Encode(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_codes() {
        assert_eq!(
            ProtocolError::UnknownMethod("nope".into()).rpc_code(),
            codes::METHOD_NOT_FOUND
        );
        assert_eq!(
            ProtocolError::InvalidRequest("bad".into()).rpc_code(),
            codes::INVALID_REQUEST
        );
        let parse = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        assert_eq!(ProtocolError::Parse(parse).rpc_code(), codes::PARSE_ERROR);
    }

    #[test]
    fn error_display() {
        let err = ProtocolError::UnknownMethod("delete_everything".into());
        assert_eq!(err.to_string(), "unknown method: delete_everything");
        assert!(err.is_client_error());
    }
}
