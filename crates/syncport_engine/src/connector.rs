//! Method dispatch.

use crate::batch::BatchEngine;
use crate::config::EngineConfig;
use crate::error::EngineResult;
use serde_json::Value;
use std::sync::Arc;
use syncport_destination::Destination;
use syncport_protocol::{
    ConnectorCall, ConnectorReply, ListFieldsResult, ListObjectsResult,
    SupportedOperationsResult, TestConnectionResult,
};
use tracing::{debug, warn};

/// A destination behind the six connector methods.
///
/// Holds no per-request state; one connector serves any number of concurrent
/// calls.
#[derive(Clone)]
pub struct Connector {
    destination: Arc<dyn Destination>,
    engine: BatchEngine,
}

impl std::fmt::Debug for Connector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connector")
            .field("destination", &self.destination.kind())
            .field("engine", &self.engine)
            .finish()
    }
}

impl Connector {
    /// Creates a connector over `destination`.
    pub fn new(destination: Arc<dyn Destination>, config: EngineConfig) -> Self {
        Self {
            destination,
            engine: BatchEngine::new(config),
        }
    }

    /// The destination calls are routed to.
    pub fn destination(&self) -> &Arc<dyn Destination> {
        &self.destination
    }

    /// Runs one decoded call.
    ///
    /// A failed `test_connection` is a successful call with
    /// `success: false`; every other destination failure is an error.
    pub async fn call(&self, call: ConnectorCall) -> EngineResult<ConnectorReply> {
        debug!(method = call.method().as_str(), "dispatching");

        let reply = match call {
            ConnectorCall::TestConnection => {
                let result = match self.destination.test_connection().await {
                    Ok(()) => TestConnectionResult::success(),
                    Err(err) => {
                        warn!(destination = self.destination.kind(), error = %err, "connection test failed");
                        TestConnectionResult::failure(err.to_string())
                    }
                };
                ConnectorReply::TestConnection(result)
            }
            ConnectorCall::ListObjects => ConnectorReply::ListObjects(ListObjectsResult {
                objects: self.destination.list_objects().await?,
            }),
            ConnectorCall::ListFields(params) => ConnectorReply::ListFields(ListFieldsResult {
                fields: self.destination.list_fields(&params.object).await?,
            }),
            ConnectorCall::SupportedOperations(params) => {
                ConnectorReply::SupportedOperations(SupportedOperationsResult {
                    operations: self
                        .destination
                        .supported_operations(&params.object)
                        .await?,
                })
            }
            ConnectorCall::GetSyncSpeed(params) => {
                ConnectorReply::SyncSpeed(self.destination.sync_speed(&params.sync_plan))
            }
            ConnectorCall::SyncBatch(params) => ConnectorReply::SyncBatch(
                self.engine
                    .sync_batch(self.destination.as_ref(), params)
                    .await?,
            ),
        };

        Ok(reply)
    }

    /// Decodes `params` for `method`, runs the call and encodes the result.
    ///
    /// # Errors
    ///
    /// Returns an error for unknown methods, malformed params and any failure
    /// that invalidates the call as a whole.
    pub async fn dispatch(&self, method: &str, params: Value) -> EngineResult<Value> {
        let call = ConnectorCall::decode(method, params)?;
        let reply = self.call(call).await?;
        Ok(reply.into_value()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use syncport_destination::{InMemoryDestination, PostgresConfig, PostgresDestination, SecretSource};
    use syncport_protocol::{codes, Operation};
    use syncport_testkit::{customer_plan, customers, sync_batch_params};

    fn memory() -> (InMemoryDestination, Connector) {
        let destination = InMemoryDestination::sample();
        let connector = Connector::new(Arc::new(destination.clone()), EngineConfig::default());
        (destination, connector)
    }

    #[tokio::test]
    async fn list_objects_and_fields() {
        let (_, connector) = memory();

        let objects = connector.dispatch("list_objects", json!({})).await.unwrap();
        let names: Vec<_> = objects["objects"]
            .as_array()
            .unwrap()
            .iter()
            .map(|o| o["object_api_name"].as_str().unwrap().to_string())
            .collect();
        assert!(names.contains(&"customer".to_string()));

        let fields = connector
            .dispatch(
                "list_fields",
                json!({"object": {"object_api_name": "customer", "label": "Customers"}}),
            )
            .await
            .unwrap();
        assert_eq!(fields["fields"][0]["field_api_name"], "email");
        assert_eq!(fields["fields"][0]["identifier"], true);
    }

    #[tokio::test]
    async fn get_sync_speed_reports_limits() {
        let destination = InMemoryDestination::sample()
            .with_speed(syncport_protocol::SpeedLimits::new(50, 10, 2));
        let connector = Connector::new(Arc::new(destination), EngineConfig::default());

        let plan = serde_json::to_value(customer_plan(Operation::Upsert)).unwrap();
        let speed = connector
            .dispatch("get_sync_speed", json!({"sync_plan": plan}))
            .await
            .unwrap();

        assert_eq!(
            speed,
            json!({
                "maximum_batch_size": 50,
                "maximum_records_per_second": 10,
                "maximum_parallel_batches": 2
            })
        );
    }

    #[tokio::test]
    async fn sync_batch_round_trip() {
        let (destination, connector) = memory();
        let params = sync_batch_params(&customer_plan(Operation::Upsert), &customers(3));

        let result = connector.dispatch("sync_batch", params).await.unwrap();
        assert_eq!(result["record_results"].as_array().unwrap().len(), 3);
        assert_eq!(result["record_results"][0]["identifier"], "customer0@example.com");
        assert_eq!(destination.row_count("customer"), 3);
    }

    #[tokio::test]
    async fn unknown_method_is_rejected() {
        let (destination, connector) = memory();
        let err = connector.dispatch("drop_everything", json!({})).await.unwrap_err();

        assert_eq!(err.rpc_code(), codes::METHOD_NOT_FOUND);
        assert_eq!(destination.write_count(), 0);
    }

    #[tokio::test]
    async fn unknown_object_is_invalid_params() {
        let (_, connector) = memory();
        let err = connector
            .dispatch(
                "supported_operations",
                json!({"object": {"object_api_name": "invoice", "label": "Invoices"}}),
            )
            .await
            .unwrap_err();

        assert_eq!(err.rpc_code(), codes::INVALID_PARAMS);
    }

    #[tokio::test]
    async fn failed_connection_test_is_a_result() {
        let destination = PostgresDestination::new(PostgresConfig {
            connection: SecretSource::Env("SYNCPORT_TEST_SURELY_UNSET_DATABASE_URL".into()),
            ..PostgresConfig::new()
        });
        let connector = Connector::new(Arc::new(destination), EngineConfig::default());

        let result = connector.dispatch("test_connection", json!(null)).await.unwrap();
        assert_eq!(result["success"], false);
        assert!(result["error_message"]
            .as_str()
            .unwrap()
            .contains("SYNCPORT_TEST_SURELY_UNSET_DATABASE_URL"));
    }
}
