//! Schema resolution.
//!
//! Turns a sync plan into a [`WritePlan`]: the single active identifier field
//! and the remaining fields in schema order.

use syncport_destination::WritePlan;
use syncport_protocol::SyncPlan;
use thiserror::Error;

/// A sync plan whose schema cannot be written.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SchemaError {
    /// No schema entry is marked as the active identifier.
    #[error("sync plan has no active identifier")]
    NoActiveIdentifier,

    /// More than one schema entry is marked as the active identifier.
    #[error("sync plan has more than one active identifier: {}", .0.join(", "))]
    AmbiguousIdentifier(Vec<String>),
}

/// Resolves the identifier column and the ordered other columns of a plan.
///
/// # Errors
///
/// Fails unless exactly one entry has `active_identifier` set.
pub fn resolve_plan(plan: &SyncPlan) -> Result<WritePlan, SchemaError> {
    let (identifiers, others): (Vec<_>, Vec<_>) = plan
        .schema
        .iter()
        .map(|(_, entry)| entry)
        .partition(|entry| entry.active_identifier);

    let identifier = match identifiers.as_slice() {
        [] => return Err(SchemaError::NoActiveIdentifier),
        [only] => only.field.clone(),
        many => {
            return Err(SchemaError::AmbiguousIdentifier(
                many.iter().map(|e| e.field.field_api_name.clone()).collect(),
            ))
        }
    };

    Ok(WritePlan::new(
        plan.object.clone(),
        plan.operation,
        identifier,
        others.into_iter().map(|e| e.field.clone()).collect(),
    ))
}
