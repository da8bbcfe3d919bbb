//! Transactional batch writer.
//!
//! One connection and one transaction per batch. Each record runs inside its
//! own savepoint, so a failing record is rolled back alone and the rest of the
//! batch still commits.

use super::params::PgParam;
use crate::destination::{require_identifier, BatchWriter};
use crate::error::{DestinationError, DestinationResult, RecordError};
use async_trait::async_trait;
use syncport_protocol::{Operation, Record};
use tokio::sync::Mutex;
use tokio_postgres::error::SqlState;
use tokio_postgres::types::ToSql;
use tokio_postgres::{Client, Statement};
use tracing::{debug, error, warn};

const SAVEPOINT: &str = "SAVEPOINT syncport_record";
const RELEASE: &str = "RELEASE SAVEPOINT syncport_record";
const ROLLBACK_TO: &str = "ROLLBACK TO SAVEPOINT syncport_record";

pub(crate) struct PostgresBatchWriter {
    client: Client,
    statement: Statement,
    columns: Vec<String>,
    identifier_column: String,
    operation: Operation,
    /// Set once the transaction can no longer be committed.
    aborted: Mutex<bool>,
}

impl PostgresBatchWriter {
    /// Wraps a client whose transaction is already open.
    pub(crate) fn new(
        client: Client,
        statement: Statement,
        columns: Vec<String>,
        operation: Operation,
    ) -> Self {
        let identifier_column = columns.first().cloned().unwrap_or_default();
        Self {
            client,
            statement,
            columns,
            identifier_column,
            operation,
            aborted: Mutex::new(false),
        }
    }

    fn params(&self, record: &Record) -> Result<Vec<PgParam>, RecordError> {
        self.statement
            .params()
            .iter()
            .zip(&self.columns)
            .map(|(ty, column)| PgParam::convert(column, record.get(column), ty))
            .collect()
    }

    fn classify(&self, record: &Record, err: &tokio_postgres::Error) -> RecordError {
        if self.operation == Operation::Insert && err.code() == Some(&SqlState::UNIQUE_VIOLATION) {
            return RecordError::AlreadyExists {
                identifier: record.identifier(&self.identifier_column),
            };
        }
        match err.as_db_error() {
            Some(db) => RecordError::Rejected(db.message().to_string()),
            None => RecordError::Backend(err.to_string()),
        }
    }
}

#[async_trait]
impl BatchWriter for PostgresBatchWriter {
    fn max_in_flight(&self) -> usize {
        1
    }

    async fn write(&self, record: &Record) -> Result<(), RecordError> {
        // NULL never conflicts, so an upsert without a key would insert a new row.
        require_identifier(record, &self.identifier_column)?;
        let params = self.params(record)?;
        let refs: Vec<&(dyn ToSql + Sync)> = params.iter().map(PgParam::as_tosql).collect();

        let mut aborted = self.aborted.lock().await;
        if *aborted {
            return Err(RecordError::Backend("batch transaction was aborted".into()));
        }

        if let Err(e) = self.client.batch_execute(SAVEPOINT).await {
            *aborted = true;
            return Err(RecordError::Backend(e.to_string()));
        }

        match self.client.execute(&self.statement, &refs).await {
            Ok(rows) => {
                if let Err(e) = self.client.batch_execute(RELEASE).await {
                    *aborted = true;
                    return Err(RecordError::Backend(e.to_string()));
                }
                debug!(rows, "record written");
                if rows == 0 && self.operation == Operation::Update {
                    return Err(RecordError::RecordNotFound {
                        identifier: record.identifier(&self.identifier_column),
                    });
                }
                Ok(())
            }
            Err(e) => {
                if let Err(rollback) = self.client.batch_execute(ROLLBACK_TO).await {
                    error!(error = %rollback, "savepoint rollback failed");
                    *aborted = true;
                }
                Err(self.classify(record, &e))
            }
        }
    }

    async fn finish(self: Box<Self>) -> DestinationResult<()> {
        let this = *self;
        if this.aborted.into_inner() {
            if let Err(e) = this.client.batch_execute("ROLLBACK").await {
                warn!(error = %e, "rollback failed");
            }
            return Err(DestinationError::Transaction(
                "batch transaction aborted and rolled back".into(),
            ));
        }

        this.client
            .batch_execute("COMMIT")
            .await
            .map_err(|e| DestinationError::Transaction(e.to_string()))
    }
}
