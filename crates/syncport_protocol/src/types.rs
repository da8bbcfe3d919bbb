//! Connector data model.
//!
//! All of these values are transient: they are decoded from one RPC call,
//! used for that call, and dropped. Nothing here is persisted by the connector.

use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};
use std::fmt;

/// A syncable entity (table, collection, API resource).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Object {
    /// Stable API name, e.g. `public.customers` or `user`.
    pub object_api_name: String,
    /// Human readable label.
    pub label: String,
    /// Whether the destination creates unknown fields when they are written.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub can_create_fields: Option<CanCreateFields>,
}

impl Object {
    /// Creates an object with the given API name and label.
    pub fn new(object_api_name: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            object_api_name: object_api_name.into(),
            label: label.into(),
            can_create_fields: None,
        }
    }

    /// Marks the object as creating unknown fields on write.
    pub fn with_fields_created_on_write(mut self) -> Self {
        self.can_create_fields = Some(CanCreateFields::OnWrite);
        self
    }
}

/// Field creation capability advertised for an object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CanCreateFields {
    /// Unknown fields are created the first time they are written.
    OnWrite,
    /// The destination never creates fields.
    Never,
}

/// Field value types understood by the orchestrator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldType {
    /// `true` / `false`.
    Boolean,
    /// Binary floating point.
    Float,
    /// Whole number.
    Integer,
    /// Text.
    String,
    /// Calendar date.
    Date,
    /// Timestamp.
    DateTime,
    /// Arbitrary precision decimal.
    Decimal,
}

impl FieldType {
    /// Returns the wire name of this type.
    pub fn as_str(&self) -> &'static str {
        match self {
            FieldType::Boolean => "boolean",
            FieldType::Float => "float",
            FieldType::Integer => "integer",
            FieldType::String => "string",
            FieldType::Date => "date",
            FieldType::DateTime => "date_time",
            FieldType::Decimal => "decimal",
        }
    }
}

fn default_true() -> bool {
    true
}

/// Metadata for one field of an object.
///
/// Flags omitted on the wire take the registry defaults: not an identifier,
/// createable, updateable, optional and scalar.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Field {
    /// Stable API name; for SQL destinations this is the column name.
    pub field_api_name: String,
    /// Human readable label.
    pub label: String,
    /// Whether the field can act as a record identifier.
    #[serde(default)]
    pub identifier: bool,
    /// Whether a value must be supplied on create.
    #[serde(default)]
    pub required: bool,
    /// Whether the field can be set on create.
    #[serde(default = "default_true")]
    pub createable: bool,
    /// Whether the field can be changed after create.
    #[serde(default = "default_true")]
    pub updateable: bool,
    /// Whether the field holds an array of `type`.
    #[serde(default)]
    pub array: bool,
    /// Value type.
    #[serde(rename = "type")]
    pub field_type: FieldType,
}

impl Field {
    /// Creates a field with default flags.
    pub fn new(
        field_api_name: impl Into<String>,
        label: impl Into<String>,
        field_type: FieldType,
    ) -> Self {
        Self {
            field_api_name: field_api_name.into(),
            label: label.into(),
            identifier: false,
            required: false,
            createable: true,
            updateable: true,
            array: false,
            field_type,
        }
    }

    /// Marks the field as an identifier candidate.
    pub fn identifier(mut self) -> Self {
        self.identifier = true;
        self
    }

    /// Marks the field as required.
    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    /// Marks the field as not updateable.
    pub fn read_only(mut self) -> Self {
        self.updateable = false;
        self
    }

    /// Marks the field as an array field.
    pub fn array(mut self) -> Self {
        self.array = true;
        self
    }
}

/// Write operation requested by a sync plan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operation {
    /// Create records; existing identifiers are failures.
    Insert,
    /// Change existing records; missing identifiers are failures.
    Update,
    /// Create or change, keyed by the active identifier.
    Upsert,
}

impl Operation {
    /// Returns the wire name of this operation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Operation::Insert => "insert",
            Operation::Update => "update",
            Operation::Upsert => "upsert",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One entry of a sync plan schema.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaEntry {
    /// Whether this field is the record identity for the sync.
    #[serde(default)]
    pub active_identifier: bool,
    /// Destination field being written.
    pub field: Field,
}

impl SchemaEntry {
    /// Creates a non-identifier entry.
    pub fn new(field: Field) -> Self {
        Self {
            active_identifier: false,
            field,
        }
    }

    /// Creates the active identifier entry.
    pub fn identifier(field: Field) -> Self {
        Self {
            active_identifier: true,
            field,
        }
    }
}

/// Sync plan schema, keyed by field API name.
///
/// Entries keep the order they had in the JSON document, which is the order
/// columns are written in.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PlanSchema {
    entries: Vec<(String, SchemaEntry)>,
}

impl PlanSchema {
    /// Creates an empty schema.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends an entry, replacing an existing entry with the same key in place.
    pub fn insert(&mut self, key: impl Into<String>, entry: SchemaEntry) {
        let key = key.into();
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some(slot) => slot.1 = entry,
            None => self.entries.push((key, entry)),
        }
    }

    /// Builder form of [`PlanSchema::insert`].
    pub fn with(mut self, key: impl Into<String>, entry: SchemaEntry) -> Self {
        self.insert(key, entry);
        self
    }

    /// Iterates entries in document order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &SchemaEntry)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Looks up an entry by key.
    pub fn get(&self, key: &str) -> Option<&SchemaEntry> {
        self.entries.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the schema has no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl FromIterator<(String, SchemaEntry)> for PlanSchema {
    fn from_iter<I: IntoIterator<Item = (String, SchemaEntry)>>(iter: I) -> Self {
        let mut schema = PlanSchema::new();
        for (key, entry) in iter {
            schema.insert(key, entry);
        }
        schema
    }
}

impl Serialize for PlanSchema {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (key, entry) in &self.entries {
            map.serialize_entry(key, entry)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for PlanSchema {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct SchemaVisitor;

        impl<'de> Visitor<'de> for SchemaVisitor {
            type Value = PlanSchema;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a map of field api name to schema entry")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<PlanSchema, A::Error> {
                let mut schema = PlanSchema {
                    entries: Vec::with_capacity(access.size_hint().unwrap_or(0)),
                };
                while let Some((key, entry)) = access.next_entry::<String, SchemaEntry>()? {
                    schema.insert(key, entry);
                }
                Ok(schema)
            }
        }

        deserializer.deserialize_map(SchemaVisitor)
    }
}

/// Declarative description of how one batch is written.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncPlan {
    /// Target object.
    pub object: Object,
    /// Write operation.
    pub operation: Operation,
    /// Field mapping, including exactly one active identifier.
    pub schema: PlanSchema,
}

/// One record of a batch: field API name to scalar, array of scalars, or null.
///
/// The engine never mutates records it receives.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Record(Map<String, Value>);

impl Record {
    /// Creates an empty record.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder that sets one field.
    pub fn with(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.0.insert(field.into(), value.into());
        self
    }

    /// Sets one field, returning the previous value.
    pub fn insert(&mut self, field: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.0.insert(field.into(), value.into())
    }

    /// Returns the value of a field, if present.
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.0.get(field)
    }

    /// Returns the identifier value for `column`, or `null` when absent.
    pub fn identifier(&self, column: &str) -> Value {
        self.0.get(column).cloned().unwrap_or(Value::Null)
    }

    /// Iterates all fields.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.0.iter()
    }

    /// Number of fields.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the record has no fields.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Returns the first field holding something other than a scalar, an
    /// array of scalars, or null.
    pub fn first_non_scalar_field(&self) -> Option<&str> {
        self.0
            .iter()
            .find(|(_, value)| match value {
                Value::Object(_) => true,
                Value::Array(items) => items
                    .iter()
                    .any(|item| matches!(item, Value::Object(_) | Value::Array(_))),
                _ => false,
            })
            .map(|(name, _)| name.as_str())
    }
}

impl From<Map<String, Value>> for Record {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

impl FromIterator<(String, Value)> for Record {
    fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Outcome of writing one record.
///
/// `identifier` always carries the record's active identifier value, even on
/// failure, so the orchestrator can correlate results.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordResult {
    /// Value of the active identifier field.
    pub identifier: Value,
    /// Whether the write succeeded.
    pub success: bool,
    /// Failure reason.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

impl RecordResult {
    /// Creates a successful result.
    pub fn success(identifier: Value) -> Self {
        Self {
            identifier,
            success: true,
            error_message: None,
        }
    }

    /// Creates a failed result.
    pub fn failure(identifier: Value, message: impl Into<String>) -> Self {
        Self {
            identifier,
            success: false,
            error_message: Some(message.into()),
        }
    }
}

/// Advisory capacity the orchestrator must respect when forming batches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpeedLimits {
    /// Maximum records per `sync_batch` call.
    pub maximum_batch_size: u32,
    /// Maximum records per second across all calls.
    pub maximum_records_per_second: u32,
    /// Maximum concurrent `sync_batch` calls.
    pub maximum_parallel_batches: u32,
}

impl SpeedLimits {
    /// Creates speed limits.
    pub fn new(
        maximum_batch_size: u32,
        maximum_records_per_second: u32,
        maximum_parallel_batches: u32,
    ) -> Self {
        Self {
            maximum_batch_size,
            maximum_records_per_second,
            maximum_parallel_batches,
        }
    }
}
