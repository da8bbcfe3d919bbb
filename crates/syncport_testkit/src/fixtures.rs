//! Sync plan and request fixtures.
//!
//! The `customer` plan matches the in-memory sample objects; the `user` plan
//! matches the CRM registry.

use serde_json::{json, Value};
use syncport_protocol::{
    Field, FieldType, Object, Operation, PlanSchema, Record, RpcRequest, SchemaEntry, SyncPlan,
};

/// A plan writing `customer` records keyed by `email`, with a `name` column.
pub fn customer_plan(operation: Operation) -> SyncPlan {
    SyncPlan {
        object: Object::new("customer", "Customers"),
        operation,
        schema: PlanSchema::new()
            .with(
                "email",
                SchemaEntry::identifier(Field::new("email", "Email", FieldType::String).identifier()),
            )
            .with(
                "name",
                SchemaEntry::new(Field::new("name", "Name", FieldType::String)),
            ),
    }
}

/// A plan writing CRM `user` records keyed by `userID`.
pub fn user_plan(operation: Operation) -> SyncPlan {
    SyncPlan {
        object: Object::new("user", "Users"),
        operation,
        schema: PlanSchema::new()
            .with(
                "userID",
                SchemaEntry::identifier(
                    Field::new("userID", "User ID", FieldType::String).identifier(),
                ),
            )
            .with(
                "name",
                SchemaEntry::new(Field::new("name", "Name", FieldType::String)),
            )
            .with(
                "email",
                SchemaEntry::new(Field::new("email", "Email", FieldType::String)),
            ),
    }
}

/// A customer record.
pub fn customer(email: &str, name: &str) -> Record {
    Record::new().with("email", email).with("name", name)
}

/// `count` customer records with distinct emails.
pub fn customers(count: usize) -> Vec<Record> {
    (0..count)
        .map(|i| customer(&format!("customer{i}@example.com"), &format!("Customer {i}")))
        .collect()
}

/// A CRM user record.
pub fn user(user_id: &str, name: &str, email: &str) -> Record {
    Record::new()
        .with("userID", user_id)
        .with("name", name)
        .with("email", email)
}

/// A JSON-RPC request for `method`.
pub fn rpc_request(id: i64, method: &str, params: Value) -> RpcRequest {
    RpcRequest::new(id, method, params)
}

/// The encoded body of a JSON-RPC request.
///
/// # Panics
///
/// Panics if the request cannot be serialized.
pub fn rpc_body(id: i64, method: &str, params: Value) -> Vec<u8> {
    serde_json::to_vec(&rpc_request(id, method, params)).expect("Failed to encode request")
}

/// Params of a `sync_batch` call.
///
/// # Panics
///
/// Panics if the plan cannot be serialized.
pub fn sync_batch_params(plan: &SyncPlan, records: &[Record]) -> Value {
    json!({
        "sync_plan": serde_json::to_value(plan).expect("Failed to encode plan"),
        "records": records,
    })
}
