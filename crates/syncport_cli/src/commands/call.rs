//! Call command implementation.

use serde_json::Value;
use std::sync::Arc;
use syncport_destination::{BackendKind, Destination, DestinationConfig};
use syncport_protocol::{RpcRequest, RpcResponse};
use syncport_server::{RequestHandler, ServerConfig};

/// Runs one JSON-RPC call in-process and prints the response.
pub async fn run(
    backend: BackendKind,
    method: &str,
    params: Option<&str>,
) -> Result<(), Box<dyn std::error::Error>> {
    let params: Value = match params {
        Some(raw) => serde_json::from_str(raw).map_err(|e| format!("params are not JSON: {e}"))?,
        None => Value::Null,
    };

    let destination = DestinationConfig::from_env(backend).build()?;
    let response = execute(destination, method, params).await?;

    println!("{}", serde_json::to_string_pretty(&response)?);
    match &response.error {
        None => Ok(()),
        Some(error) => Err(format!("call failed ({}): {}", error.code, error.message).into()),
    }
}

/// Sends one request through the same handler the server uses.
pub async fn execute(
    destination: Arc<dyn Destination>,
    method: &str,
    params: Value,
) -> Result<RpcResponse, Box<dyn std::error::Error>> {
    let config = ServerConfig::from_env()?;
    let handler = RequestHandler::new(destination, config.engine);

    let body = serde_json::to_vec(&RpcRequest::new(1, method, params))?;
    let (_, response) = handler.handle(&body).await;
    Ok(response)
}
