//! # Syncport Server
//!
//! HTTP transport for a syncport connector.
//!
//! This crate provides:
//! - A single JSON-RPC endpoint (`POST /`) routing the six connector methods
//! - Optional shared-secret authentication via the `secret` query parameter
//! - A liveness endpoint (`GET /health`)
//!
//! # Status Codes
//!
//! | outcome | status | body |
//! |---|---|---|
//! | result | 200 | JSON-RPC result |
//! | malformed request, unknown method, bad params | 400 | JSON-RPC error |
//! | destination failure that invalidates the call | 500 | JSON-RPC error |
//! | wrong or missing secret | 401 | plain text |
//! | body larger than `max_body_bytes` | 413 | plain text |
//!
//! The secret is checked first: an unauthenticated request gets 401 no matter
//! what its body contains.
//!
//! # Authentication
//!
//! ```rust
//! use std::sync::Arc;
//! use syncport_destination::InMemoryDestination;
//! use syncport_server::{ConnectorServer, ServerConfig};
//!
//! let config = ServerConfig::default().with_shared_secret("s3cret");
//! let server = ConnectorServer::new(config, Arc::new(InMemoryDestination::sample()));
//! assert!(server.requires_auth());
//! ```
//!
//! Requests must then be sent to `POST /?secret=s3cret`.

#![deny(unsafe_code)]
#![warn(missing_docs)]
// Production code must not panic on request input
#![warn(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

mod auth;
mod config;
mod error;
mod handler;
mod server;

pub use auth::SharedSecret;
pub use config::{
    ServerConfig, BIND_ENV, MAX_CONCURRENCY_ENV, RECORD_TIMEOUT_ENV, SHARED_SECRET_ENV,
};
pub use error::{ServerError, ServerResult};
pub use handler::RequestHandler;
pub use server::ConnectorServer;
