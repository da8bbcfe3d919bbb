//! JSON-RPC request handling.

use axum::http::StatusCode;
use std::sync::Arc;
use syncport_destination::Destination;
use syncport_engine::{Connector, EngineConfig};
use syncport_protocol::{RpcError, RpcRequest, RpcResponse};
use tracing::{error, field, info, info_span, warn, Instrument};
use uuid::Uuid;

const ENCODE_FAILURE: &[u8] =
    br#"{"jsonrpc":"2.0","id":null,"error":{"code":-32603,"message":"failed to encode response"}}"#;

/// Turns request bodies into response bodies.
#[derive(Debug, Clone)]
pub struct RequestHandler {
    connector: Connector,
}

impl RequestHandler {
    /// Creates a handler over `destination`.
    pub fn new(destination: Arc<dyn Destination>, engine: EngineConfig) -> Self {
        Self {
            connector: Connector::new(destination, engine),
        }
    }

    /// The connector calls are routed to.
    pub fn connector(&self) -> &Connector {
        &self.connector
    }

    /// Handles one request body.
    ///
    /// Never fails: every problem is reported as a JSON-RPC error object with
    /// a 4xx or 5xx status.
    pub async fn handle(&self, body: &[u8]) -> (StatusCode, RpcResponse) {
        let span = info_span!("rpc", request_id = %Uuid::new_v4(), method = field::Empty);

        async {
            let request = match RpcRequest::from_slice(body) {
                Ok(request) => request,
                Err(err) => {
                    warn!(error = %err, "rejected request");
                    let response =
                        RpcResponse::error(RpcRequest::salvage_id(body), RpcError::from(&err));
                    return (StatusCode::BAD_REQUEST, response);
                }
            };
            tracing::Span::current().record("method", request.method.as_str());

            match self.connector.dispatch(&request.method, request.params).await {
                Ok(result) => {
                    info!("call succeeded");
                    (StatusCode::OK, RpcResponse::success(request.id, result))
                }
                Err(err) if err.is_systemic() => {
                    error!(error = %err, "call failed");
                    (
                        StatusCode::INTERNAL_SERVER_ERROR,
                        RpcResponse::error(request.id, err.to_rpc_error()),
                    )
                }
                Err(err) => {
                    warn!(error = %err, code = err.rpc_code(), "call rejected");
                    (
                        StatusCode::BAD_REQUEST,
                        RpcResponse::error(request.id, err.to_rpc_error()),
                    )
                }
            }
        }
        .instrument(span)
        .await
    }

    /// Handles one request body and encodes the response.
    pub async fn handle_bytes(&self, body: &[u8]) -> (StatusCode, Vec<u8>) {
        let (status, response) = self.handle(body).await;
        match response.to_vec() {
            Ok(bytes) => (status, bytes),
            Err(err) => {
                error!(error = %err, "failed to encode response");
                (StatusCode::INTERNAL_SERVER_ERROR, ENCODE_FAILURE.to_vec())
            }
        }
    }
}
