//! Check command implementation.

use serde_json::Value;
use syncport_destination::{BackendKind, DestinationConfig};
use syncport_engine::{Connector, EngineConfig};
use syncport_protocol::TestConnectionResult;

/// Runs `test_connection` against the configured backend.
pub async fn run(backend: BackendKind) -> Result<(), Box<dyn std::error::Error>> {
    println!("Checking {backend} destination...");

    let destination = DestinationConfig::from_env(backend).build()?;
    let connector = Connector::new(destination, EngineConfig::default());
    let result: TestConnectionResult =
        serde_json::from_value(connector.dispatch("test_connection", Value::Null).await?)?;

    if result.success {
        println!("✓ Connection OK");
        Ok(())
    } else {
        let reason = result.error_message.unwrap_or_default();
        println!("✗ Connection failed: {reason}");
        Err("Connection check failed".into())
    }
}
