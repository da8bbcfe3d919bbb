//! # Syncport Destination
//!
//! Destination trait and backend adapters for syncport.
//!
//! A destination is the system records are synced *to*. The engine talks to it
//! through two traits:
//!
//! - [`Destination`] answers metadata calls and opens a [`BatchWriter`] per batch
//! - [`BatchWriter`] writes one record at a time and is finished once per batch
//!
//! ## Available Destinations
//!
//! - [`InMemoryDestination`] - Deterministic store for tests and demos
//! - [`RestDestination`] - CRM-style JSON API (create-or-update, retrieve)
//! - [`PostgresDestination`] - SQL tables via `tokio-postgres`
//!
//! Objects and fields known to the in-memory and REST destinations live in an
//! explicit [`ObjectRegistry`] passed in at construction.
//!
//! ## Example
//!
//! ```rust
//! use syncport_destination::{ObjectDefinition, ObjectRegistry};
//! use syncport_protocol::{Field, FieldType, Object};
//!
//! let registry = ObjectRegistry::new().with(
//!     ObjectDefinition::new(Object::new("customer", "Customers"))
//!         .field(Field::new("email", "Email", FieldType::String).identifier())
//!         .field(Field::new("name", "Name", FieldType::String)),
//! );
//!
//! let customer = registry.get("customer").unwrap();
//! assert_eq!(customer.identifier_fields().count(), 1);
//! assert!(registry.get("invoice").is_none());
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod config;
mod destination;
mod error;
mod memory;
mod postgres;
mod registry;
mod rest;

pub use config::{BackendKind, DestinationConfig, SecretSource, CRM_BASE_URL_ENV};
pub use destination::{BatchWriter, Destination, WritePlan};
pub use error::{DestinationError, DestinationResult, RecordError};
pub use memory::InMemoryDestination;
pub use postgres::{
    field_type_for, PostgresConfig, PostgresDestination, StatementBuilder, DATABASE_URL_ENV,
};
pub use registry::{ObjectDefinition, ObjectRegistry};
pub use rest::{crm_registry, RestConfig, RestDestination, API_KEY_ENV};
