//! Params and results for the six connector methods.

use crate::types::{Field, Object, Operation, Record, RecordResult, SyncPlan};
use serde::{Deserialize, Serialize};

/// Result of `test_connection`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestConnectionResult {
    /// Whether the round-trip succeeded.
    pub success: bool,
    /// Failure reason.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

impl TestConnectionResult {
    /// Creates a successful result.
    pub fn success() -> Self {
        Self {
            success: true,
            error_message: None,
        }
    }

    /// Creates a failed result.
    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            success: false,
            error_message: Some(message.into()),
        }
    }
}

/// Result of `list_objects`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListObjectsResult {
    /// Syncable objects.
    pub objects: Vec<Object>,
}

/// Params of `list_fields`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListFieldsParams {
    /// Object to describe.
    pub object: Object,
}

/// Result of `list_fields`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListFieldsResult {
    /// Fields of the object.
    pub fields: Vec<Field>,
}

/// Params of `supported_operations`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SupportedOperationsParams {
    /// Object to describe.
    pub object: Object,
}

/// Result of `supported_operations`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SupportedOperationsResult {
    /// Operations the destination accepts for the object.
    pub operations: Vec<Operation>,
}

/// Params of `get_sync_speed`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GetSyncSpeedParams {
    /// Plan the orchestrator is about to run.
    pub sync_plan: SyncPlan,
}

/// Params of `sync_batch`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyncBatchParams {
    /// How to write the batch.
    pub sync_plan: SyncPlan,
    /// Records to write, in orchestrator order.
    pub records: Vec<Record>,
}

/// Result of `sync_batch`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyncBatchResult {
    /// One result per input record, index-aligned with the input.
    pub record_results: Vec<RecordResult>,
}
