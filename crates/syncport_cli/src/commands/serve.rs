//! Serve command implementation.

use std::net::SocketAddr;
use syncport_destination::{BackendKind, DestinationConfig};
use syncport_server::{ConnectorServer, ServerConfig};
use tracing::info;

/// Runs the connector server until Ctrl-C.
pub async fn run(
    backend: BackendKind,
    bind: Option<SocketAddr>,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut config = ServerConfig::from_env()?;
    if let Some(bind) = bind {
        config = config.with_bind_addr(bind);
    }

    let destination = DestinationConfig::from_env(backend).build()?;
    info!(
        backend = %backend,
        bind = %config.bind_addr,
        max_concurrency = config.engine.max_concurrency,
        "starting connector"
    );

    ConnectorServer::new(config, destination).serve().await?;
    Ok(())
}
