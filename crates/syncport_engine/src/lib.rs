//! # Syncport Engine
//!
//! Batch synchronization engine and connector dispatch for syncport.
//!
//! This crate provides:
//! - Schema resolution (active identifier plus ordered columns)
//! - The batch engine: bounded concurrent writes with per-record isolation
//! - [`Connector`], which routes the six connector methods to a destination
//!
//! ## Key Invariants
//!
//! - `sync_batch` returns exactly one result per input record, in input order
//! - Every result carries the record's active identifier, even on failure
//! - A single record's failure never aborts the rest of the batch
//! - A failure that invalidates the batch as a whole is returned as an error,
//!   never as partial results
//!
//! ## Example
//!
//! ```rust
//! use std::sync::Arc;
//! use serde_json::json;
//! use syncport_destination::InMemoryDestination;
//! use syncport_engine::{Connector, EngineConfig};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let connector = Connector::new(Arc::new(InMemoryDestination::sample()), EngineConfig::default());
//!
//! let result = connector.dispatch("test_connection", json!(null)).await.unwrap();
//! assert_eq!(result, json!({"success": true}));
//! # }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod batch;
mod config;
mod connector;
mod error;
mod schema;

pub use batch::BatchEngine;
pub use config::EngineConfig;
pub use connector::Connector;
pub use error::{EngineError, EngineResult};
pub use schema::{resolve_plan, SchemaError};
