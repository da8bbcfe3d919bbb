//! Postgres destination.
//!
//! Objects are tables, named `schema.table`. Fields come from
//! `information_schema`; a column covered by a UNIQUE or PRIMARY KEY
//! constraint is an identifier.
//!
//! Each batch opens its own connection, starts a transaction and prepares one
//! statement that every record reuses. The connection closes when the writer
//! is dropped, whether or not the batch committed.

mod catalog;
mod params;
mod sql;
mod writer;

pub use catalog::field_type_for;
pub use sql::StatementBuilder;

use crate::config::SecretSource;
use crate::destination::{BatchWriter, Destination, WritePlan};
use crate::error::{DestinationError, DestinationResult};
use async_trait::async_trait;
use catalog::{ColumnInfo, LIST_COLUMNS, LIST_CONSTRAINTS, LIST_TABLES};
use std::collections::HashMap;
use std::time::Duration;
use syncport_protocol::{Field, Object, Operation, SpeedLimits, SyncPlan};
use tokio_postgres::error::SqlState;
use tokio_postgres::{Client, NoTls};
use tracing::{debug, warn};
use writer::PostgresBatchWriter;

/// Environment variable holding the connection string.
pub const DATABASE_URL_ENV: &str = "SYNCPORT_DATABASE_URL";

/// Postgres destination configuration.
#[derive(Debug, Clone)]
pub struct PostgresConfig {
    /// Where the connection string comes from.
    pub connection: SecretSource,
    /// Connect timeout.
    pub connect_timeout: Duration,
    /// Limits reported by `get_sync_speed`.
    pub speed: SpeedLimits,
}

impl Default for PostgresConfig {
    fn default() -> Self {
        Self {
            connection: SecretSource::Env(DATABASE_URL_ENV.to_string()),
            connect_timeout: Duration::from_secs(10),
            speed: SpeedLimits::new(1000, 100_000, 8),
        }
    }
}

impl PostgresConfig {
    /// Creates the default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Uses a fixed connection string instead of the environment.
    #[must_use]
    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.connection = SecretSource::Value(url.into());
        self
    }

    /// Sets the connect timeout.
    #[must_use]
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Sets the speed limits.
    #[must_use]
    pub fn with_speed(mut self, speed: SpeedLimits) -> Self {
        self.speed = speed;
        self
    }
}

/// Tables in a Postgres database.
#[derive(Debug, Clone)]
pub struct PostgresDestination {
    config: PostgresConfig,
}

impl PostgresDestination {
    /// Creates a destination; no connection is made until a call needs one.
    #[must_use]
    pub fn new(config: PostgresConfig) -> Self {
        Self { config }
    }

    async fn connect(&self) -> DestinationResult<Client> {
        let url = self.config.connection.resolve()?;
        let mut pg: tokio_postgres::Config = url
            .parse()
            .map_err(|e| DestinationError::Config(format!("invalid connection string: {e}")))?;
        pg.connect_timeout(self.config.connect_timeout);

        let (client, connection) = pg
            .connect(NoTls)
            .await
            .map_err(|e| DestinationError::Connection(e.to_string()))?;

        tokio::spawn(async move {
            if let Err(e) = connection.await {
                warn!(error = %e, "postgres connection error");
            }
        });

        Ok(client)
    }
}

#[async_trait]
impl Destination for PostgresDestination {
    fn kind(&self) -> &'static str {
        "postgres"
    }

    async fn test_connection(&self) -> DestinationResult<()> {
        let client = self.connect().await?;
        client.query_one("SELECT 1", &[]).await?;
        Ok(())
    }

    async fn list_objects(&self) -> DestinationResult<Vec<Object>> {
        let client = self.connect().await?;
        let rows = client.query(LIST_TABLES, &[]).await?;

        rows.iter()
            .map(|row| -> DestinationResult<Object> {
                let schema: String = row.try_get(0)?;
                let table: String = row.try_get(1)?;
                let name = format!("{schema}.{table}");
                Ok(Object::new(name.clone(), name))
            })
            .collect()
    }

    async fn list_fields(&self, object: &Object) -> DestinationResult<Vec<Field>> {
        let (schema, table) = sql::split_object_name(&object.object_api_name);
        let client = self.connect().await?;

        let mut constraints: HashMap<String, Vec<String>> = HashMap::new();
        for row in client.query(LIST_CONSTRAINTS, &[&schema, &table]).await? {
            let column: String = row.try_get(0)?;
            let kind: String = row.try_get(1)?;
            constraints.entry(column).or_default().push(kind);
        }

        let rows = client.query(LIST_COLUMNS, &[&schema, &table]).await?;
        if rows.is_empty() {
            return Err(DestinationError::UnknownObject(
                object.object_api_name.clone(),
            ));
        }

        rows.iter()
            .map(|row| -> DestinationResult<Field> {
                let column = ColumnInfo {
                    name: row.try_get(0)?,
                    data_type: row.try_get(1)?,
                    nullable: row.try_get::<_, Option<bool>>(2)?.unwrap_or(true),
                    updatable: row.try_get::<_, Option<bool>>(3)?.unwrap_or(false),
                    generated: row.try_get::<_, Option<bool>>(4)?.unwrap_or(false),
                };
                Ok(column.into_field(&constraints))
            })
            .collect()
    }

    async fn supported_operations(&self, _object: &Object) -> DestinationResult<Vec<Operation>> {
        Ok(vec![Operation::Insert, Operation::Update, Operation::Upsert])
    }

    fn sync_speed(&self, _plan: &SyncPlan) -> SpeedLimits {
        self.config.speed
    }

    async fn open_batch(&self, plan: &WritePlan) -> DestinationResult<Box<dyn BatchWriter>> {
        let builder = StatementBuilder::new(plan);
        let query = builder.build();
        debug!(object = %plan.object_name(), sql = %query, "preparing batch statement");

        let client = self.connect().await?;
        client.batch_execute("BEGIN").await?;
        let statement = client
            .prepare(&query)
            .await
            .map_err(|e| prepare_error(plan.object_name(), e))?;

        let columns = builder.columns().into_iter().map(str::to_string).collect();
        Ok(Box::new(PostgresBatchWriter::new(
            client,
            statement,
            columns,
            plan.operation,
        )))
    }
}

/// A missing table is the caller naming an unknown object, as in `list_fields`.
fn prepare_error(object: &str, err: tokio_postgres::Error) -> DestinationError {
    if err.code() == Some(&SqlState::UNDEFINED_TABLE) {
        DestinationError::UnknownObject(object.to_string())
    } else {
        DestinationError::Query(err)
    }
}
