//! In-memory destination for tests and demos.

use crate::destination::{BatchWriter, Destination, WritePlan};
use crate::error::{DestinationResult, RecordError};
use crate::registry::{ObjectDefinition, ObjectRegistry};
use async_trait::async_trait;
use parking_lot::RwLock;
use serde_json::Value;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use syncport_protocol::{Field, FieldType, Object, Operation, Record, SpeedLimits, SyncPlan};

/// Rows of every object, keyed by object name and then by identifier.
type Tables = HashMap<String, HashMap<String, Record>>;

#[derive(Debug, Default)]
struct MemoryStore {
    tables: RwLock<Tables>,
    rejected: RwLock<HashSet<String>>,
    in_flight: AtomicUsize,
    peak_in_flight: AtomicUsize,
    writes: AtomicUsize,
    batches: AtomicUsize,
}

/// Decrements the in-flight counter when a write ends.
struct InFlight<'a>(&'a AtomicUsize);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

/// A deterministic destination that keeps records in memory.
///
/// Implements real insert / update / upsert semantics keyed by the active
/// identifier, so the engine's aggregation can be checked against a store
/// whose outcome is predictable. Identifiers registered with
/// [`InMemoryDestination::reject_identifier`] always fail.
///
/// # Thread Safety
///
/// Clones share the same store.
///
/// # Example
///
/// ```rust
/// use syncport_destination::InMemoryDestination;
///
/// let destination = InMemoryDestination::sample();
/// assert_eq!(destination.row_count("customer"), 0);
/// ```
#[derive(Debug, Clone)]
pub struct InMemoryDestination {
    registry: ObjectRegistry,
    store: Arc<MemoryStore>,
    speed: SpeedLimits,
    latency: Option<Duration>,
    max_in_flight: usize,
}

impl InMemoryDestination {
    /// Creates an empty store over the given registry.
    #[must_use]
    pub fn new(registry: ObjectRegistry) -> Self {
        Self {
            registry,
            store: Arc::default(),
            speed: SpeedLimits::new(200, 100, 4),
            latency: None,
            max_in_flight: usize::MAX,
        }
    }

    /// Creates a store with `customer` and `event` objects, each keyed by
    /// `email` with a `name` field.
    #[must_use]
    pub fn sample() -> Self {
        let fields = [
            Field::new("email", "Email", FieldType::String)
                .identifier()
                .required(),
            Field::new("name", "Name", FieldType::String).required(),
        ];

        let customer = fields.iter().cloned().fold(
            ObjectDefinition::new(Object::new("customer", "Customers")),
            ObjectDefinition::field,
        );
        let event = fields.iter().cloned().fold(
            ObjectDefinition::new(Object::new("event", "Events").with_fields_created_on_write()),
            ObjectDefinition::field,
        );

        Self::new(ObjectRegistry::new().with(customer).with(event))
    }

    /// Sets the speed limits reported by `get_sync_speed`.
    #[must_use]
    pub fn with_speed(mut self, speed: SpeedLimits) -> Self {
        self.speed = speed;
        self
    }

    /// Delays every write by `latency`.
    #[must_use]
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Caps concurrent writes per batch.
    #[must_use]
    pub fn with_max_in_flight(mut self, max_in_flight: usize) -> Self {
        self.max_in_flight = max_in_flight.max(1);
        self
    }

    /// Makes every write of a record with this identifier fail.
    pub fn reject_identifier(&self, identifier: impl Into<Value>) {
        self.store.rejected.write().insert(key_of(&identifier.into()));
    }

    /// Stores a record directly, bypassing the write path.
    pub fn seed(&self, object: &str, identifier_column: &str, record: Record) {
        let key = key_of(&record.identifier(identifier_column));
        self.store
            .tables
            .write()
            .entry(object.to_string())
            .or_default()
            .insert(key, record);
    }

    /// Returns a copy of the stored record, if any.
    #[must_use]
    pub fn get(&self, object: &str, identifier: &Value) -> Option<Record> {
        self.store
            .tables
            .read()
            .get(object)
            .and_then(|rows| rows.get(&key_of(identifier)))
            .cloned()
    }

    /// Number of records stored for an object.
    #[must_use]
    pub fn row_count(&self, object: &str) -> usize {
        self.store.tables.read().get(object).map_or(0, HashMap::len)
    }

    /// Total write attempts across all batches.
    #[must_use]
    pub fn write_count(&self) -> usize {
        self.store.writes.load(Ordering::SeqCst)
    }

    /// Number of batches finished.
    #[must_use]
    pub fn batch_count(&self) -> usize {
        self.store.batches.load(Ordering::SeqCst)
    }

    /// Highest number of writes observed in flight at once.
    #[must_use]
    pub fn peak_in_flight(&self) -> usize {
        self.store.peak_in_flight.load(Ordering::SeqCst)
    }
}

impl Default for InMemoryDestination {
    fn default() -> Self {
        Self::sample()
    }
}

#[async_trait]
impl Destination for InMemoryDestination {
    fn kind(&self) -> &'static str {
        "memory"
    }

    async fn test_connection(&self) -> DestinationResult<()> {
        Ok(())
    }

    async fn list_objects(&self) -> DestinationResult<Vec<Object>> {
        Ok(self.registry.objects())
    }

    async fn list_fields(&self, object: &Object) -> DestinationResult<Vec<Field>> {
        Ok(self.registry.require(&object.object_api_name)?.fields.clone())
    }

    async fn supported_operations(&self, object: &Object) -> DestinationResult<Vec<Operation>> {
        self.registry.require(&object.object_api_name)?;
        Ok(vec![Operation::Insert, Operation::Update, Operation::Upsert])
    }

    fn sync_speed(&self, _plan: &SyncPlan) -> SpeedLimits {
        self.speed
    }

    async fn open_batch(&self, plan: &WritePlan) -> DestinationResult<Box<dyn BatchWriter>> {
        self.registry.require(plan.object_name())?;
        Ok(Box::new(MemoryBatchWriter {
            store: Arc::clone(&self.store),
            plan: plan.clone(),
            latency: self.latency,
            max_in_flight: self.max_in_flight,
        }))
    }
}

struct MemoryBatchWriter {
    store: Arc<MemoryStore>,
    plan: WritePlan,
    latency: Option<Duration>,
    max_in_flight: usize,
}

impl MemoryBatchWriter {
    fn apply(&self, record: &Record) -> Result<(), RecordError> {
        let identifier = self.plan.require_identifier(record)?;

        let key = key_of(&identifier);
        if self.store.rejected.read().contains(&key) {
            return Err(RecordError::Rejected(format!(
                "identifier {identifier} is rejected"
            )));
        }

        let row: Record = self
            .plan
            .all_fields()
            .filter_map(|f| {
                record
                    .get(&f.field_api_name)
                    .map(|v| (f.field_api_name.clone(), v.clone()))
            })
            .collect();

        let mut tables = self.store.tables.write();
        let rows = tables.entry(self.plan.object_name().to_string()).or_default();

        match (self.plan.operation, rows.get_mut(&key)) {
            (Operation::Insert, Some(_)) => Err(RecordError::AlreadyExists { identifier }),
            (Operation::Update, None) => Err(RecordError::RecordNotFound { identifier }),
            (_, Some(existing)) => {
                for (field, value) in row.iter() {
                    existing.insert(field.clone(), value.clone());
                }
                Ok(())
            }
            (_, None) => {
                rows.insert(key, row);
                Ok(())
            }
        }
    }
}

#[async_trait]
impl BatchWriter for MemoryBatchWriter {
    fn max_in_flight(&self) -> usize {
        self.max_in_flight
    }

    async fn write(&self, record: &Record) -> Result<(), RecordError> {
        let current = self.store.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        let _guard = InFlight(&self.store.in_flight);
        self.store.peak_in_flight.fetch_max(current, Ordering::SeqCst);
        self.store.writes.fetch_add(1, Ordering::SeqCst);

        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }

        self.apply(record)
    }

    async fn finish(self: Box<Self>) -> DestinationResult<()> {
        self.store.batches.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// Canonical store key for an identifier value; `1` and `"1"` differ.
fn key_of(identifier: &Value) -> String {
    identifier.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn plan(operation: Operation) -> WritePlan {
        WritePlan::new(
            Object::new("customer", "Customers"),
            operation,
            Field::new("email", "Email", FieldType::String).identifier(),
            vec![Field::new("name", "Name", FieldType::String)],
        )
    }

    async fn write(
        destination: &InMemoryDestination,
        operation: Operation,
        record: Record,
    ) -> Result<(), RecordError> {
        let writer = destination.open_batch(&plan(operation)).await.unwrap();
        let result = writer.write(&record).await;
        writer.finish().await.unwrap();
        result
    }

    #[tokio::test]
    async fn upsert_creates_then_updates() {
        let destination = InMemoryDestination::sample();
        let record = Record::new().with("email", "a@x.com").with("name", "A");
        write(&destination, Operation::Upsert, record).await.unwrap();

        let record = Record::new().with("email", "a@x.com").with("name", "B");
        write(&destination, Operation::Upsert, record).await.unwrap();

        assert_eq!(destination.row_count("customer"), 1);
        let stored = destination.get("customer", &json!("a@x.com")).unwrap();
        assert_eq!(stored.get("name"), Some(&json!("B")));
        assert_eq!(destination.batch_count(), 2);
    }

    #[tokio::test]
    async fn insert_and_update_respect_existence() {
        let destination = InMemoryDestination::sample();

        let err = write(
            &destination,
            Operation::Update,
            Record::new().with("email", "a@x.com"),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, RecordError::RecordNotFound { .. }));
        assert_eq!(destination.row_count("customer"), 0);

        write(
            &destination,
            Operation::Insert,
            Record::new().with("email", "a@x.com"),
        )
        .await
        .unwrap();
        let err = write(
            &destination,
            Operation::Insert,
            Record::new().with("email", "a@x.com"),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, RecordError::AlreadyExists { .. }));
    }

    #[tokio::test]
    async fn update_keeps_columns_not_written() {
        let destination = InMemoryDestination::sample();
        destination.seed(
            "customer",
            "email",
            Record::new().with("email", "a@x.com").with("name", "A"),
        );

        let writer = destination
            .open_batch(&WritePlan::new(
                Object::new("customer", "Customers"),
                Operation::Update,
                Field::new("email", "Email", FieldType::String).identifier(),
                vec![],
            ))
            .await
            .unwrap();
        writer
            .write(&Record::new().with("email", "a@x.com"))
            .await
            .unwrap();

        let stored = destination.get("customer", &json!("a@x.com")).unwrap();
        assert_eq!(stored.get("name"), Some(&json!("A")));
    }

    #[tokio::test]
    async fn rejected_identifier_fails() {
        let destination = InMemoryDestination::sample();
        destination.reject_identifier("bad@x.com");

        let err = write(
            &destination,
            Operation::Upsert,
            Record::new().with("email", "bad@x.com"),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, RecordError::Rejected(_)));
    }

    #[tokio::test]
    async fn missing_identifier_is_invalid() {
        let destination = InMemoryDestination::sample();
        let err = write(
            &destination,
            Operation::Upsert,
            Record::new().with("name", "A"),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, RecordError::InvalidValue { ref column, .. } if column == "email"));
    }

    #[tokio::test]
    async fn unknown_object_cannot_open_batch() {
        let destination = InMemoryDestination::sample();
        let mut plan = plan(Operation::Upsert);
        plan.object = Object::new("invoice", "Invoices");
        let err = destination.open_batch(&plan).await.err().unwrap();
        assert!(err.is_client_error());
    }

    #[tokio::test]
    async fn metadata_comes_from_registry() {
        let destination = InMemoryDestination::sample();
        let objects = destination.list_objects().await.unwrap();
        assert_eq!(objects.len(), 2);

        let fields = destination.list_fields(&objects[0]).await.unwrap();
        assert_eq!(fields[0].field_api_name, "email");
        assert!(fields[0].identifier);
    }
}
