//! JSON-RPC 2.0 envelopes.
//!
//! Requests arrive as `{id, method, params}` (the `jsonrpc` member is optional
//! on input). Responses are `{jsonrpc: "2.0", id, result}` or
//! `{jsonrpc: "2.0", id, error}`.

use crate::error::{ProtocolError, ProtocolResult};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// JSON-RPC version tag written on every response.
pub const JSONRPC_VERSION: &str = "2.0";

/// Request correlation id, echoed back on the response.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RequestId {
    /// Numeric id.
    Number(serde_json::Number),
    /// String id.
    String(String),
}

impl From<i64> for RequestId {
    fn from(id: i64) -> Self {
        RequestId::Number(id.into())
    }
}

impl From<&str> for RequestId {
    fn from(id: &str) -> Self {
        RequestId::String(id.to_string())
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RequestId::Number(n) => write!(f, "{n}"),
            RequestId::String(s) => f.write_str(s),
        }
    }
}

/// An inbound connector request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RpcRequest {
    /// Protocol version, `"2.0"` when present.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub jsonrpc: Option<String>,
    /// Correlation id.
    #[serde(default)]
    pub id: Option<RequestId>,
    /// Method name.
    pub method: String,
    /// Method params; `null` when omitted.
    #[serde(default)]
    pub params: Value,
}

impl RpcRequest {
    /// Creates a request.
    pub fn new(id: impl Into<RequestId>, method: impl Into<String>, params: Value) -> Self {
        Self {
            jsonrpc: Some(JSONRPC_VERSION.to_string()),
            id: Some(id.into()),
            method: method.into(),
            params,
        }
    }

    /// Decodes a request body.
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError::Parse`] if the body is not JSON and
    /// [`ProtocolError::InvalidRequest`] if it is JSON but not a request.
    pub fn from_slice(body: &[u8]) -> ProtocolResult<Self> {
        let value: Value = serde_json::from_slice(body).map_err(ProtocolError::Parse)?;
        if !value.is_object() {
            return Err(ProtocolError::InvalidRequest(
                "request must be a JSON object".into(),
            ));
        }

        let request: RpcRequest = serde_json::from_value(value)
            .map_err(|e| ProtocolError::InvalidRequest(e.to_string()))?;

        if let Some(version) = request.jsonrpc.as_deref() {
            if version != JSONRPC_VERSION {
                return Err(ProtocolError::InvalidRequest(format!(
                    "unsupported jsonrpc version: {version}"
                )));
            }
        }

        Ok(request)
    }

    /// Returns the id from a body that failed full decoding, if one is readable.
    pub fn salvage_id(body: &[u8]) -> Option<RequestId> {
        let value: Value = serde_json::from_slice(body).ok()?;
        serde_json::from_value(value.get("id")?.clone()).ok()
    }
}

/// JSON-RPC error object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RpcError {
    /// Error code, see [`crate::codes`].
    pub code: i64,
    /// Human readable message.
    pub message: String,
    /// Optional structured detail.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl RpcError {
    /// Creates an error object.
    pub fn new(code: i64, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            data: None,
        }
    }

    /// Attaches structured detail.
    pub fn with_data(mut self, data: Value) -> Self {
        self.data = Some(data);
        self
    }
}

impl From<&ProtocolError> for RpcError {
    fn from(err: &ProtocolError) -> Self {
        RpcError::new(err.rpc_code(), err.to_string())
    }
}

/// An outbound connector response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RpcResponse {
    /// Always `"2.0"`.
    pub jsonrpc: String,
    /// Id copied from the request; `null` when it could not be read.
    pub id: Option<RequestId>,
    /// Result on success.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    /// Error on failure.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<RpcError>,
}

impl RpcResponse {
    /// Creates a success response.
    pub fn success(id: Option<RequestId>, result: Value) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            id,
            result: Some(result),
            error: None,
        }
    }

    /// Creates an error response.
    pub fn error(id: Option<RequestId>, error: RpcError) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            id,
            result: None,
            error: Some(error),
        }
    }

    /// Returns true if this response carries a result.
    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }

    /// Encodes the response body.
    pub fn to_vec(&self) -> ProtocolResult<Vec<u8>> {
        serde_json::to_vec(self).map_err(ProtocolError::Encode)
    }
}
