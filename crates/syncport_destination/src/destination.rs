//! Destination and batch writer traits.

use crate::error::{DestinationResult, RecordError};
use async_trait::async_trait;
use serde_json::Value;
use syncport_protocol::{Field, Object, Operation, Record, SpeedLimits, SyncPlan};

/// A resolved write: which object, which operation, and which columns in
/// which order.
///
/// The identifier column always comes first, followed by the other columns in
/// schema order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WritePlan {
    /// Target object.
    pub object: Object,
    /// Write operation.
    pub operation: Operation,
    /// The active identifier field.
    pub identifier: Field,
    /// Non-identifier fields, in schema order.
    pub columns: Vec<Field>,
}

impl WritePlan {
    /// Creates a write plan.
    pub fn new(object: Object, operation: Operation, identifier: Field, columns: Vec<Field>) -> Self {
        Self {
            object,
            operation,
            identifier,
            columns,
        }
    }

    /// Name of the active identifier column.
    pub fn identifier_column(&self) -> &str {
        &self.identifier.field_api_name
    }

    /// Names of the non-identifier columns, in order.
    pub fn other_columns(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|f| f.field_api_name.as_str())
    }

    /// Identifier field followed by the other fields.
    pub fn all_fields(&self) -> impl Iterator<Item = &Field> {
        std::iter::once(&self.identifier).chain(self.columns.iter())
    }

    /// Object API name.
    pub fn object_name(&self) -> &str {
        &self.object.object_api_name
    }

    /// Returns the record's active identifier.
    ///
    /// # Errors
    ///
    /// Returns [`RecordError::InvalidValue`] if the identifier is missing or
    /// null.
    pub fn require_identifier(&self, record: &Record) -> Result<Value, RecordError> {
        require_identifier(record, self.identifier_column())
    }
}

/// Every backend refuses a record without an identifier before writing it.
pub(crate) fn require_identifier(record: &Record, column: &str) -> Result<Value, RecordError> {
    let identifier = record.identifier(column);
    if identifier.is_null() {
        return Err(RecordError::invalid(column, "identifier is missing"));
    }
    Ok(identifier)
}

/// A system records are synced to.
///
/// # Invariants
///
/// - Metadata calls never mutate destination state
/// - `open_batch` is called once per `sync_batch` call; the writer it returns
///   is finished exactly once, after every write has completed
/// - Credentials are resolved from the environment at call time, never from
///   the request
///
/// # Implementors
///
/// - [`super::InMemoryDestination`]
/// - [`super::RestDestination`]
/// - [`super::PostgresDestination`]
#[async_trait]
pub trait Destination: Send + Sync {
    /// Short backend name used in logs.
    fn kind(&self) -> &'static str;

    /// Performs a trivial round-trip against the destination.
    ///
    /// # Errors
    ///
    /// Returns an error describing why the destination is unusable.
    async fn test_connection(&self) -> DestinationResult<()>;

    /// Enumerates syncable objects.
    async fn list_objects(&self) -> DestinationResult<Vec<Object>>;

    /// Describes the fields of an object.
    async fn list_fields(&self, object: &Object) -> DestinationResult<Vec<Field>>;

    /// Operations the destination accepts for an object.
    async fn supported_operations(&self, object: &Object) -> DestinationResult<Vec<Operation>>;

    /// Capacity hints for a plan.
    fn sync_speed(&self, plan: &SyncPlan) -> SpeedLimits;

    /// Prepares to write one batch.
    ///
    /// # Errors
    ///
    /// Failures here are systemic: no record of the batch is written.
    async fn open_batch(&self, plan: &WritePlan) -> DestinationResult<Box<dyn BatchWriter>>;
}

/// Writes the records of one batch.
#[async_trait]
pub trait BatchWriter: Send + Sync {
    /// How many `write` calls may be in flight at once.
    fn max_in_flight(&self) -> usize {
        usize::MAX
    }

    /// Writes one record.
    ///
    /// # Errors
    ///
    /// Returns a [`RecordError`] that fails only this record.
    async fn write(&self, record: &Record) -> Result<(), RecordError>;

    /// Completes the batch.
    ///
    /// # Errors
    ///
    /// A failure here invalidates every record result of the batch.
    async fn finish(self: Box<Self>) -> DestinationResult<()>;
}
