//! Property-based test generators using proptest.
//!
//! Provides strategies for generating records and schemas that keep the
//! shapes the connector accepts.

use proptest::prelude::*;
use serde_json::Value;
use syncport_protocol::{Field, FieldType, PlanSchema, Record, SchemaEntry};

/// Strategy for scalar JSON values, including null.
pub fn scalar_strategy() -> impl Strategy<Value = Value> {
    prop_oneof![
        Just(Value::Null),
        any::<bool>().prop_map(Value::from),
        any::<i64>().prop_map(Value::from),
        "[a-zA-Z0-9 ]{0,16}".prop_map(Value::from),
    ]
}

/// Strategy for identifier values: strings, numbers, and occasionally null.
pub fn identifier_strategy() -> impl Strategy<Value = Value> {
    prop_oneof![
        8 => "[a-z]{1,8}@[a-z]{1,6}\\.com".prop_map(Value::from),
        3 => (0i64..100_000).prop_map(Value::from),
        1 => Just(Value::Null),
    ]
}

/// Strategy for customer records keyed by `email`.
///
/// The identifier is sometimes missing, so callers see failing records too.
pub fn customer_record_strategy() -> impl Strategy<Value = Record> {
    (
        prop::option::weighted(0.9, identifier_strategy()),
        scalar_strategy(),
    )
        .prop_map(|(email, name)| {
            let mut record = Record::new().with("name", name);
            if let Some(email) = email {
                record.insert("email", email);
            }
            record
        })
}

/// Strategy for batches of customer records.
pub fn customer_batch_strategy(max_len: usize) -> impl Strategy<Value = Vec<Record>> {
    prop::collection::vec(customer_record_strategy(), 0..=max_len)
}

/// Strategy for schemas with `fields` string columns and exactly `active`
/// active identifiers.
pub fn schema_strategy(fields: usize, active: usize) -> impl Strategy<Value = PlanSchema> {
    let active = active.min(fields);
    Just((0..fields).collect::<Vec<_>>())
        .prop_shuffle()
        .prop_map(move |order| {
            order
                .into_iter()
                .enumerate()
                .map(|(position, column)| {
                    let name = format!("col{column}");
                    let field = Field::new(name.clone(), name.clone(), FieldType::String);
                    let entry = if position < active {
                        SchemaEntry::identifier(field)
                    } else {
                        SchemaEntry::new(field)
                    };
                    (name, entry)
                })
                .collect()
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    proptest! {
        #[test]
        fn schemas_have_requested_identifier_count(schema in schema_strategy(5, 2)) {
            let active = schema.iter().filter(|(_, e)| e.active_identifier).count();
            prop_assert_eq!(active, 2);
            prop_assert_eq!(schema.len(), 5);
        }

        #[test]
        fn customer_records_are_scalar(record in customer_record_strategy()) {
            prop_assert!(record.first_non_scalar_field().is_none());
            prop_assert!(record.get("name").is_some());
        }
    }
}
