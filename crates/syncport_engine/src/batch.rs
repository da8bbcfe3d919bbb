//! Batch synchronization.
//!
//! A batch is written through one [`BatchWriter`]. Records are written
//! concurrently, bounded by the smaller of [`EngineConfig::max_concurrency`]
//! and the writer's own capacity, and their results are emitted in input
//! order no matter which write finishes first.

use crate::config::EngineConfig;
use crate::error::{EngineError, EngineResult};
use crate::schema::resolve_plan;
use futures::stream::{self, StreamExt};
use syncport_destination::{BatchWriter, Destination, RecordError};
use syncport_protocol::{Record, RecordResult, SyncBatchParams, SyncBatchResult};
use tracing::{debug, error, info, warn};

/// Runs `sync_batch` calls against a destination.
#[derive(Debug, Clone, Default)]
pub struct BatchEngine {
    config: EngineConfig,
}

impl BatchEngine {
    /// Creates an engine with the given configuration.
    pub fn new(config: EngineConfig) -> Self {
        Self { config }
    }

    /// The configuration in use.
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Writes a batch and reports one result per record, index-aligned with
    /// `params.records`.
    ///
    /// # Errors
    ///
    /// Fails without writing anything if the plan has no single active
    /// identifier or its operation is not supported for the object. Fails
    /// after writing if the destination cannot finish the batch; in that
    /// case none of the per-record outcomes can be trusted.
    pub async fn sync_batch(
        &self,
        destination: &dyn Destination,
        params: SyncBatchParams,
    ) -> EngineResult<SyncBatchResult> {
        let SyncBatchParams { sync_plan, records } = params;
        let plan = resolve_plan(&sync_plan)?;

        let supported = destination.supported_operations(&plan.object).await?;
        if !supported.contains(&plan.operation) {
            return Err(EngineError::UnsupportedOperation {
                object: plan.object_name().to_string(),
                operation: plan.operation,
            });
        }

        if records.is_empty() {
            return Ok(SyncBatchResult {
                record_results: Vec::new(),
            });
        }

        let writer = destination.open_batch(&plan).await?;
        let limit = self
            .config
            .max_concurrency
            .min(writer.max_in_flight())
            .max(1);
        let identifier_column = plan.identifier_column();

        let writes: Vec<_> = records
            .iter()
            .map(|record| self.write_record(writer.as_ref(), identifier_column, record))
            .collect();
        let record_results: Vec<RecordResult> =
            stream::iter(writes).buffered(limit).collect().await;

        let failed = record_results.iter().filter(|r| !r.success).count();

        if let Err(err) = writer.finish().await {
            error!(
                object = %plan.object_name(),
                operation = %plan.operation,
                records = records.len(),
                error = %err,
                "batch failed"
            );
            return Err(err.into());
        }

        info!(
            object = %plan.object_name(),
            operation = %plan.operation,
            records = records.len(),
            failed,
            "batch synced"
        );

        Ok(SyncBatchResult { record_results })
    }

    async fn write_record(
        &self,
        writer: &dyn BatchWriter,
        identifier_column: &str,
        record: &Record,
    ) -> RecordResult {
        let identifier = record.identifier(identifier_column);

        let outcome = match record.first_non_scalar_field() {
            Some(field) => Err(RecordError::invalid(field, "nested values are not supported")),
            None => match self.config.record_timeout {
                Some(limit) => tokio::time::timeout(limit, writer.write(record))
                    .await
                    .unwrap_or(Err(RecordError::Timeout(limit))),
                None => writer.write(record).await,
            },
        };

        match outcome {
            Ok(()) => {
                debug!(identifier = %identifier, "record written");
                RecordResult::success(identifier)
            }
            Err(err) => {
                warn!(identifier = %identifier, error = %err, "record failed");
                RecordResult::failure(identifier, err.to_string())
            }
        }
    }
}
