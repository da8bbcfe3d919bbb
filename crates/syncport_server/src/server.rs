//! HTTP server.

use crate::auth::{SharedSecret, SECRET_PARAM};
use crate::config::ServerConfig;
use crate::error::{ServerError, ServerResult};
use crate::handler::RequestHandler;
use axum::body::{to_bytes, Body};
use axum::extract::{Query, State};
use axum::http::{header, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::Router;
use bytes::Bytes;
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use syncport_destination::Destination;
use tokio::net::TcpListener;
use tracing::{info, warn};

struct AppState {
    handler: RequestHandler,
    secret: Option<SharedSecret>,
    max_body_bytes: usize,
}

/// The connector server.
///
/// Exposes one destination over JSON-RPC on `POST /`.
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use syncport_destination::InMemoryDestination;
/// use syncport_server::{ConnectorServer, ServerConfig};
///
/// let server = ConnectorServer::new(ServerConfig::default(), Arc::new(InMemoryDestination::sample()));
/// let router = server.router();
/// # drop(router);
/// ```
pub struct ConnectorServer {
    config: ServerConfig,
    state: Arc<AppState>,
}

impl ConnectorServer {
    /// Creates a server over `destination`.
    pub fn new(config: ServerConfig, destination: Arc<dyn Destination>) -> Self {
        let state = Arc::new(AppState {
            handler: RequestHandler::new(destination, config.engine.clone()),
            secret: config.shared_secret.as_deref().map(SharedSecret::new),
            max_body_bytes: config.max_body_bytes,
        });
        Self { config, state }
    }

    /// The configuration in use.
    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Returns true if RPC calls must carry the shared secret.
    pub fn requires_auth(&self) -> bool {
        self.state.secret.is_some()
    }

    /// Builds the HTTP router.
    pub fn router(&self) -> Router {
        Router::new()
            .route("/", post(rpc))
            .route("/health", get(health))
            .with_state(Arc::clone(&self.state))
    }

    /// Binds the configured address and serves until Ctrl-C.
    ///
    /// # Errors
    ///
    /// Returns an error if the address cannot be bound or serving fails.
    pub async fn serve(self) -> ServerResult<()> {
        let listener = TcpListener::bind(self.config.bind_addr).await?;
        self.serve_with_shutdown(listener, async {
            if let Err(err) = tokio::signal::ctrl_c().await {
                warn!(error = %err, "failed to listen for ctrl-c");
            }
        })
        .await
    }

    /// Serves on `listener` until `shutdown` completes.
    ///
    /// # Errors
    ///
    /// Returns an error if serving fails.
    pub async fn serve_with_shutdown(
        self,
        listener: TcpListener,
        shutdown: impl Future<Output = ()> + Send + 'static,
    ) -> ServerResult<()> {
        let addr = listener.local_addr()?;
        info!(
            %addr,
            destination = self.state.handler.connector().destination().kind(),
            auth = self.requires_auth(),
            "connector listening"
        );

        axum::serve(listener, self.router())
            .with_graceful_shutdown(shutdown)
            .await?;

        info!("connector stopped");
        Ok(())
    }
}

async fn health() -> &'static str {
    "ok"
}

/// Checks the shared secret before reading the body.
async fn rpc(State(state): State<Arc<AppState>>, uri: Uri, body: Body) -> Response {
    if let Some(secret) = &state.secret {
        let provided = Query::<HashMap<String, String>>::try_from_uri(&uri)
            .ok()
            .and_then(|Query(mut query)| query.remove(SECRET_PARAM));
        if !secret.verify(provided.as_deref()) {
            warn!("rejected request with wrong or missing secret");
            return plain_error(&ServerError::Unauthorized);
        }
    }

    let body: Bytes = match to_bytes(body, state.max_body_bytes).await {
        Ok(body) => body,
        Err(err) => {
            warn!(error = %err, limit = state.max_body_bytes, "could not read request body");
            return plain_error(&ServerError::PayloadTooLarge(state.max_body_bytes));
        }
    };

    let (status, body) = state.handler.handle_bytes(&body).await;
    (status, [(header::CONTENT_TYPE, "application/json")], body).into_response()
}

fn plain_error(err: &ServerError) -> Response {
    let status =
        StatusCode::from_u16(err.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    (status, [(header::CONTENT_TYPE, "text/plain")], err.to_string()).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request;
    use serde_json::{json, Value};
    use syncport_destination::InMemoryDestination;
    use syncport_protocol::{codes, Operation};
    use syncport_testkit::{customer_plan, customers, rpc_body, sync_batch_params};
    use tower::ServiceExt;

    fn server(config: ServerConfig) -> (InMemoryDestination, Router) {
        let destination = InMemoryDestination::sample();
        let server = ConnectorServer::new(config, Arc::new(destination.clone()));
        (destination, server.router())
    }

    fn post(uri: &str, body: Vec<u8>) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body))
            .unwrap()
    }

    async fn read_json(response: Response) -> Value {
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&body).unwrap()
    }

    #[tokio::test]
    async fn health_is_unauthenticated() {
        let (_, app) = server(ServerConfig::default().with_shared_secret("s"));
        let request = Request::builder().uri("/health").body(Body::empty()).unwrap();

        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn missing_secret_is_401_and_touches_nothing() {
        let (destination, app) = server(ServerConfig::default().with_shared_secret("s"));
        let params = sync_batch_params(&customer_plan(Operation::Upsert), &customers(3));

        for uri in ["/", "/?secret=wrong", "/?secret="] {
            let response = app
                .clone()
                .oneshot(post(uri, rpc_body(1, "sync_batch", params.clone())))
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

            let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
            assert_eq!(&body[..], b"unauthorized");
        }

        assert_eq!(destination.write_count(), 0);
        assert_eq!(destination.batch_count(), 0);
    }

    #[tokio::test]
    async fn right_secret_dispatches() {
        let (destination, app) = server(ServerConfig::default().with_shared_secret("s"));
        let params = sync_batch_params(&customer_plan(Operation::Upsert), &customers(3));

        let response = app
            .oneshot(post("/?secret=s", rpc_body(1, "sync_batch", params)))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = read_json(response).await;
        assert_eq!(body["result"]["record_results"].as_array().unwrap().len(), 3);
        assert_eq!(destination.row_count("customer"), 3);
    }

    #[tokio::test]
    async fn no_secret_configured_accepts_all() {
        let (_, app) = server(ServerConfig::default());
        let response = app
            .oneshot(post("/", rpc_body(1, "list_objects", json!(null))))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = read_json(response).await;
        assert!(body["result"]["objects"].is_array());
    }

    #[tokio::test]
    async fn protocol_errors_are_400() {
        let (_, app) = server(ServerConfig::default());
        let response = app
            .oneshot(post("/", b"[1, 2, 3]".to_vec()))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = read_json(response).await;
        assert_eq!(body["error"]["code"], codes::INVALID_REQUEST);
        assert_eq!(body["id"], Value::Null);
    }

    #[tokio::test]
    async fn oversized_body_is_rejected() {
        let (destination, app) = server(ServerConfig::default().with_max_body_bytes(64));
        let params = sync_batch_params(&customer_plan(Operation::Upsert), &customers(10));

        let response = app
            .oneshot(post("/", rpc_body(1, "sync_batch", params)))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
        assert_eq!(destination.write_count(), 0);
    }

    #[tokio::test]
    async fn auth_runs_before_query_and_body_checks() {
        let (destination, app) = server(
            ServerConfig::default()
                .with_shared_secret("s")
                .with_max_body_bytes(64),
        );
        let params = sync_batch_params(&customer_plan(Operation::Upsert), &customers(10));

        for uri in ["/?secret=%zz", "/?secret=wrong&secret=again", "/"] {
            let response = app
                .clone()
                .oneshot(post(uri, rpc_body(1, "sync_batch", params.clone())))
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::UNAUTHORIZED, "uri {uri}");
        }

        let response = app
            .oneshot(post("/?secret=s", rpc_body(1, "sync_batch", params)))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
        assert_eq!(destination.write_count(), 0);
        assert_eq!(destination.batch_count(), 0);
    }
}
