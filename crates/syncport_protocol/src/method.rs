//! Closed set of connector methods.

use crate::error::{ProtocolError, ProtocolResult};
use crate::messages::{
    GetSyncSpeedParams, ListFieldsParams, ListFieldsResult, ListObjectsResult,
    SupportedOperationsParams, SupportedOperationsResult, SyncBatchParams, SyncBatchResult,
    TestConnectionResult,
};
use crate::types::SpeedLimits;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

/// The six connector methods.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    /// `test_connection`
    TestConnection,
    /// `list_objects`
    ListObjects,
    /// `list_fields`
    ListFields,
    /// `supported_operations`
    SupportedOperations,
    /// `get_sync_speed`
    GetSyncSpeed,
    /// `sync_batch`
    SyncBatch,
}

impl Method {
    /// Every method, in protocol order.
    pub const ALL: [Method; 6] = [
        Method::TestConnection,
        Method::ListObjects,
        Method::ListFields,
        Method::SupportedOperations,
        Method::GetSyncSpeed,
        Method::SyncBatch,
    ];

    /// Returns the wire name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::TestConnection => "test_connection",
            Method::ListObjects => "list_objects",
            Method::ListFields => "list_fields",
            Method::SupportedOperations => "supported_operations",
            Method::GetSyncSpeed => "get_sync_speed",
            Method::SyncBatch => "sync_batch",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Method {
    type Err = ProtocolError;

    fn from_str(name: &str) -> ProtocolResult<Self> {
        Method::ALL
            .into_iter()
            .find(|m| m.as_str() == name)
            .ok_or_else(|| ProtocolError::UnknownMethod(name.to_string()))
    }
}

/// A decoded connector call with typed params.
#[derive(Debug, Clone, PartialEq)]
pub enum ConnectorCall {
    /// Round-trip the destination.
    TestConnection,
    /// Enumerate objects.
    ListObjects,
    /// Describe an object's fields.
    ListFields(ListFieldsParams),
    /// Operations accepted for an object.
    SupportedOperations(SupportedOperationsParams),
    /// Capacity hints for a plan.
    GetSyncSpeed(GetSyncSpeedParams),
    /// Write a batch of records.
    SyncBatch(SyncBatchParams),
}

impl ConnectorCall {
    /// Decodes a call from a method name and its params.
    ///
    /// `test_connection` and `list_objects` take no params; whatever is sent
    /// for them is ignored.
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError::UnknownMethod`] for unrecognized names and
    /// [`ProtocolError::InvalidParams`] when params do not match the method.
    pub fn decode(method: &str, params: Value) -> ProtocolResult<Self> {
        let method: Method = method.parse()?;
        let call = match method {
            Method::TestConnection => ConnectorCall::TestConnection,
            Method::ListObjects => ConnectorCall::ListObjects,
            Method::ListFields => ConnectorCall::ListFields(params_for(method, params)?),
            Method::SupportedOperations => {
                ConnectorCall::SupportedOperations(params_for(method, params)?)
            }
            Method::GetSyncSpeed => ConnectorCall::GetSyncSpeed(params_for(method, params)?),
            Method::SyncBatch => ConnectorCall::SyncBatch(params_for(method, params)?),
        };
        Ok(call)
    }

    /// Returns the method this call invokes.
    pub fn method(&self) -> Method {
        match self {
            ConnectorCall::TestConnection => Method::TestConnection,
            ConnectorCall::ListObjects => Method::ListObjects,
            ConnectorCall::ListFields(_) => Method::ListFields,
            ConnectorCall::SupportedOperations(_) => Method::SupportedOperations,
            ConnectorCall::GetSyncSpeed(_) => Method::GetSyncSpeed,
            ConnectorCall::SyncBatch(_) => Method::SyncBatch,
        }
    }
}

fn params_for<T: DeserializeOwned>(method: Method, params: Value) -> ProtocolResult<T> {
    serde_json::from_value(params).map_err(|source| ProtocolError::InvalidParams {
        method: method.as_str(),
        source,
    })
}

/// Typed result of a connector call.
#[derive(Debug, Clone, PartialEq)]
pub enum ConnectorReply {
    /// Result of `test_connection`.
    TestConnection(TestConnectionResult),
    /// Result of `list_objects`.
    ListObjects(ListObjectsResult),
    /// Result of `list_fields`.
    ListFields(ListFieldsResult),
    /// Result of `supported_operations`.
    SupportedOperations(SupportedOperationsResult),
    /// Result of `get_sync_speed`.
    SyncSpeed(SpeedLimits),
    /// Result of `sync_batch`.
    SyncBatch(SyncBatchResult),
}

impl ConnectorReply {
    /// Encodes the reply as the JSON-RPC `result` member.
    pub fn into_value(self) -> ProtocolResult<Value> {
        let value = match self {
            ConnectorReply::TestConnection(r) => serde_json::to_value(r),
            ConnectorReply::ListObjects(r) => serde_json::to_value(r),
            ConnectorReply::ListFields(r) => serde_json::to_value(r),
            ConnectorReply::SupportedOperations(r) => serde_json::to_value(r),
            ConnectorReply::SyncSpeed(r) => serde_json::to_value(r),
            ConnectorReply::SyncBatch(r) => serde_json::to_value(r),
        };
        value.map_err(ProtocolError::Encode)
    }
}
