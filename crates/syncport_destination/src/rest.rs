//! REST destination for CRM-style JSON APIs.
//!
//! Each object maps to a resource path under a base URL and is written with
//! two endpoints:
//!
//! - `POST <base>/<path>/create_or_update` writes one record
//! - `POST <base>/<path>/retrieve` looks one record up by a single key
//!
//! The API key travels as `apiKey` in every JSON body. Record fields that are
//! not known to the registry are sent under `customFields`.

use crate::config::SecretSource;
use crate::destination::{BatchWriter, Destination, WritePlan};
use crate::error::{DestinationError, DestinationResult, RecordError};
use crate::registry::{ObjectDefinition, ObjectRegistry};
use async_trait::async_trait;
use futures::future::select_ok;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::time::Duration;
use syncport_protocol::{Field, FieldType, Object, Operation, Record, SpeedLimits, SyncPlan};
use tracing::{debug, warn};

/// Environment variable holding the CRM API key.
pub const API_KEY_ENV: &str = "SYNCPORT_CRM_API_KEY";

/// Top-level body keys owned by the payload itself.
const RESERVED_KEYS: [&str; 2] = ["apiKey", "customFields"];

/// REST destination configuration.
#[derive(Debug, Clone)]
pub struct RestConfig {
    /// API base URL, without a trailing slash.
    pub base_url: String,
    /// Where the API key comes from.
    pub api_key: SecretSource,
    /// Per-request timeout.
    pub timeout: Duration,
    /// Limits reported by `get_sync_speed`.
    pub speed: SpeedLimits,
    /// Concurrent requests per batch.
    pub max_in_flight: usize,
    /// Resource path per object; objects without an entry use their API name.
    pub paths: HashMap<String, String>,
}

impl Default for RestConfig {
    fn default() -> Self {
        Self {
            base_url: "https://canny.io/api/v1".to_string(),
            api_key: SecretSource::Env(API_KEY_ENV.to_string()),
            timeout: Duration::from_secs(30),
            speed: SpeedLimits::new(1000, 100, 4),
            max_in_flight: 8,
            paths: HashMap::from([("user".to_string(), "users".to_string())]),
        }
    }
}

impl RestConfig {
    /// Creates the default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the base URL.
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Sets the API key source.
    #[must_use]
    pub fn with_api_key(mut self, api_key: SecretSource) -> Self {
        self.api_key = api_key;
        self
    }

    /// Sets the per-request timeout.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Sets the resource path of an object.
    #[must_use]
    pub fn with_path(mut self, object: impl Into<String>, path: impl Into<String>) -> Self {
        self.paths.insert(object.into(), path.into());
        self
    }

    /// Sets the number of concurrent requests per batch.
    #[must_use]
    pub fn with_max_in_flight(mut self, max_in_flight: usize) -> Self {
        self.max_in_flight = max_in_flight.max(1);
        self
    }

    fn endpoint(&self, object: &str) -> String {
        let path = self.paths.get(object).map_or(object, String::as_str);
        format!("{}/{}", self.base_url, path)
    }
}

/// A CRM reached over HTTP.
///
/// Supports `update` and `upsert`. An update first confirms the record exists
/// by racing one lookup per available key; if none finds it the record fails
/// and no write is sent.
#[derive(Debug)]
pub struct RestDestination {
    config: RestConfig,
    registry: ObjectRegistry,
    client: reqwest::Client,
}

impl RestDestination {
    /// Creates a destination over the given registry.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(config: RestConfig, registry: ObjectRegistry) -> DestinationResult<Self> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("syncport/", env!("CARGO_PKG_VERSION")))
            .timeout(config.timeout)
            .build()
            .map_err(|e| DestinationError::Config(format!("http client: {e}")))?;

        Ok(Self {
            config,
            registry,
            client,
        })
    }

    /// Creates a destination with the built-in CRM object registry.
    pub fn with_crm_objects(config: RestConfig) -> DestinationResult<Self> {
        Self::new(config, crm_registry())
    }

    /// The configuration in use.
    pub fn config(&self) -> &RestConfig {
        &self.config
    }
}

/// Objects of the built-in CRM: a `user` keyed by `userID`, also findable by
/// `email`.
pub fn crm_registry() -> ObjectRegistry {
    let user = ObjectDefinition::new(
        Object::new("user", "Users").with_fields_created_on_write(),
    )
    .field(
        Field::new("userID", "User ID", FieldType::String)
            .identifier()
            .required()
            .read_only(),
    )
    .field(Field::new("name", "Name", FieldType::String).required())
    .field(Field::new("avatarURL", "Avatar URL", FieldType::String))
    .field(Field::new("created", "Created Date", FieldType::DateTime))
    .field(Field::new("email", "Email", FieldType::String))
    .lookup_key("userID")
    .lookup_key("email");

    ObjectRegistry::new().with(user)
}

#[async_trait]
impl Destination for RestDestination {
    fn kind(&self) -> &'static str {
        "rest"
    }

    async fn test_connection(&self) -> DestinationResult<()> {
        self.config.api_key.resolve()?;

        let response = self.client.get(&self.config.base_url).send().await?;
        match response.status() {
            reqwest::StatusCode::UNAUTHORIZED | reqwest::StatusCode::FORBIDDEN => Err(
                DestinationError::Connection(format!("credentials rejected ({})", response.status())),
            ),
            _ => Ok(()),
        }
    }

    async fn list_objects(&self) -> DestinationResult<Vec<Object>> {
        Ok(self.registry.objects())
    }

    async fn list_fields(&self, object: &Object) -> DestinationResult<Vec<Field>> {
        Ok(self.registry.require(&object.object_api_name)?.fields.clone())
    }

    async fn supported_operations(&self, object: &Object) -> DestinationResult<Vec<Operation>> {
        self.registry.require(&object.object_api_name)?;
        Ok(vec![Operation::Update, Operation::Upsert])
    }

    fn sync_speed(&self, _plan: &SyncPlan) -> SpeedLimits {
        self.config.speed
    }

    async fn open_batch(&self, plan: &WritePlan) -> DestinationResult<Box<dyn BatchWriter>> {
        let definition = self.registry.require(plan.object_name())?.clone();
        let api_key = self.config.api_key.resolve()?;

        Ok(Box::new(RestBatchWriter {
            client: self.client.clone(),
            endpoint: self.config.endpoint(plan.object_name()),
            api_key,
            definition,
            plan: plan.clone(),
            max_in_flight: self.config.max_in_flight,
        }))
    }
}

struct RestBatchWriter {
    client: reqwest::Client,
    endpoint: String,
    api_key: String,
    definition: ObjectDefinition,
    plan: WritePlan,
    max_in_flight: usize,
}

impl RestBatchWriter {
    async fn post(&self, action: &str, body: &Value) -> Result<reqwest::Response, RecordError> {
        let url = format!("{}/{action}", self.endpoint);
        self.client
            .post(&url)
            .json(body)
            .send()
            .await
            .map_err(|e| RecordError::Backend(e.to_string()))
    }

    async fn create_or_update(&self, record: &Record) -> Result<(), RecordError> {
        let body = build_payload(&self.definition, record, &self.api_key);
        let response = self.post("create_or_update", &body).await?;

        let status = response.status();
        if status.is_success() {
            return Ok(());
        }

        let text = response.text().await.unwrap_or_default();
        warn!(status = %status, object = %self.plan.object_name(), "create_or_update rejected");
        Err(RecordError::Rejected(if text.trim().is_empty() {
            status.to_string()
        } else {
            text
        }))
    }

    async fn lookup(&self, key: &str, value: Value) -> Result<(), RecordError> {
        let mut body = Map::new();
        body.insert("apiKey".into(), Value::String(self.api_key.clone()));
        body.insert(key.to_string(), value.clone());

        let response = self.post("retrieve", &Value::Object(body)).await?;
        debug!(key, status = %response.status(), "lookup");
        if response.status().is_success() {
            Ok(())
        } else {
            Err(RecordError::RecordNotFound { identifier: value })
        }
    }

    /// Races one lookup per available key; the first to find the record wins.
    async fn confirm_exists(&self, record: &Record) -> Result<(), RecordError> {
        let identifier = record.identifier(self.plan.identifier_column());
        let lookups: Vec<_> = self
            .definition
            .lookup_keys()
            .into_iter()
            .filter_map(|key| {
                record
                    .get(key)
                    .filter(|v| !v.is_null())
                    .map(|v| Box::pin(self.lookup(key, v.clone())))
            })
            .collect();

        if lookups.is_empty() {
            return Err(RecordError::RecordNotFound { identifier });
        }

        match select_ok(lookups).await {
            Ok(_) => Ok(()),
            Err(RecordError::Backend(message)) => Err(RecordError::Backend(message)),
            Err(_) => Err(RecordError::RecordNotFound { identifier }),
        }
    }
}

#[async_trait]
impl BatchWriter for RestBatchWriter {
    fn max_in_flight(&self) -> usize {
        self.max_in_flight
    }

    async fn write(&self, record: &Record) -> Result<(), RecordError> {
        self.plan.require_identifier(record)?;
        match self.plan.operation {
            Operation::Upsert => self.create_or_update(record).await,
            Operation::Update => {
                self.confirm_exists(record).await?;
                self.create_or_update(record).await
            }
            Operation::Insert => Err(RecordError::Rejected(
                "insert is not supported by this destination".into(),
            )),
        }
    }

    async fn finish(self: Box<Self>) -> DestinationResult<()> {
        Ok(())
    }
}

/// Builds a create-or-update body: known fields at the top level, everything
/// else under `customFields`, plus the API key. Record fields named like a
/// reserved key are kept as custom fields.
fn build_payload(definition: &ObjectDefinition, record: &Record, api_key: &str) -> Value {
    let mut body = Map::new();
    let mut custom = Map::new();

    for (field, value) in record.iter() {
        if definition.is_known_field(field) && !RESERVED_KEYS.contains(&field.as_str()) {
            body.insert(field.clone(), value.clone());
        } else {
            custom.insert(field.clone(), value.clone());
        }
    }

    body.insert("customFields".into(), Value::Object(custom));
    body.insert("apiKey".into(), Value::String(api_key.to_string()));
    Value::Object(body)
}
