//! Serving routers on ephemeral ports.

use axum::Router;
use std::net::SocketAddr;

/// A router running on `127.0.0.1` until the test runtime shuts down.
#[derive(Debug, Clone)]
pub struct TestServer {
    /// Bound address.
    pub addr: SocketAddr,
}

impl TestServer {
    /// Binds `127.0.0.1:0` and serves `router` in the background.
    ///
    /// # Panics
    ///
    /// Panics if the listener cannot be bound.
    pub async fn spawn(router: Router) -> Self {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind test listener");
        let addr = listener.local_addr().expect("Failed to read local address");

        tokio::spawn(async move {
            axum::serve(listener, router)
                .await
                .expect("Test server failed");
        });

        Self { addr }
    }

    /// Base URL, e.g. `http://127.0.0.1:41234`.
    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// URL of a path on this server.
    pub fn url_for(&self, path: &str) -> String {
        format!("{}/{}", self.url(), path.trim_start_matches('/'))
    }
}
