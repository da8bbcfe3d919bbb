//! # syncport Protocol
//!
//! Connector protocol types and JSON-RPC envelope for syncport.
//!
//! This crate provides:
//! - The connector data model (`Object`, `Field`, `SyncPlan`, `RecordResult`, ...)
//! - Typed params and results for the six connector methods
//! - A closed [`ConnectorCall`] enum decoded from `(method, params)`
//! - JSON-RPC 2.0 request/response envelopes
//!
//! This is a pure protocol crate with no I/O operations.
//!
//! ## Example
//!
//! ```rust
//! use syncport_protocol::{ConnectorCall, RpcRequest};
//!
//! let body = br#"{"id": 1, "method": "list_objects", "params": {}}"#;
//! let request = RpcRequest::from_slice(body).unwrap();
//! let call = ConnectorCall::decode(&request.method, request.params).unwrap();
//! assert!(matches!(call, ConnectorCall::ListObjects));
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod envelope;
mod error;
mod messages;
mod method;
mod types;

pub use envelope::{RequestId, RpcError, RpcRequest, RpcResponse, JSONRPC_VERSION};
pub use error::{codes, ProtocolError, ProtocolResult};
pub use messages::{
    GetSyncSpeedParams, ListFieldsParams, ListFieldsResult, ListObjectsResult,
    SupportedOperationsParams, SupportedOperationsResult, SyncBatchParams, SyncBatchResult,
    TestConnectionResult,
};
pub use method::{ConnectorCall, ConnectorReply, Method};
pub use types::{
    CanCreateFields, Field, FieldType, Object, Operation, PlanSchema, Record, RecordResult,
    SchemaEntry, SpeedLimits, SyncPlan,
};
