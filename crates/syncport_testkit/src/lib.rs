//! # Syncport Testkit
//!
//! Test utilities for syncport.
//!
//! This crate provides:
//! - Sync plan and record fixtures
//! - Property-based test generators using proptest
//! - An in-process fake CRM for the REST destination
//! - Helpers to serve an axum router on an ephemeral port
//!
//! ## Usage
//!
//! ```rust,ignore
//! use syncport_testkit::prelude::*;
//!
//! #[tokio::test]
//! async fn update_unknown_user() {
//!     let crm = FakeCrm::spawn("test-key").await;
//!     let destination = crm.destination();
//!     // ... open a batch and write
//! }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod crm;
pub mod fixtures;
pub mod generators;
pub mod server;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::crm::*;
    pub use crate::fixtures::*;
    pub use crate::generators::*;
    pub use crate::server::*;
}

pub use crm::*;
pub use fixtures::*;
pub use generators::*;
pub use server::*;
