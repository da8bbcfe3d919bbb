//! Property tests for batch alignment and schema resolution.

use proptest::prelude::*;
use serde_json::Value;
use std::collections::HashSet;
use syncport_destination::InMemoryDestination;
use syncport_engine::{resolve_plan, BatchEngine, EngineConfig, SchemaError};
use syncport_protocol::{Object, Operation, PlanSchema, Record, SyncBatchParams, SyncBatchResult, SyncPlan};
use syncport_testkit::{customer_batch_strategy, customer_plan, schema_strategy};

fn run_batch(
    destination: &InMemoryDestination,
    engine: &BatchEngine,
    records: Vec<Record>,
) -> SyncBatchResult {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap();
    runtime
        .block_on(engine.sync_batch(
            destination,
            SyncBatchParams {
                sync_plan: customer_plan(Operation::Upsert),
                records,
            },
        ))
        .unwrap()
}

fn unusable_schema() -> impl Strategy<Value = (usize, PlanSchema)> {
    prop_oneof![Just(0usize), 2usize..5].prop_flat_map(|active| (Just(active), schema_strategy(5, active)))
}

proptest! {
    #[test]
    fn results_are_index_aligned(
        records in customer_batch_strategy(40),
        concurrency in 1usize..8,
    ) {
        let destination = InMemoryDestination::sample();
        let engine = BatchEngine::new(EngineConfig::new().with_max_concurrency(concurrency));

        let result = run_batch(&destination, &engine, records.clone());

        prop_assert_eq!(result.record_results.len(), records.len());
        for (record, result) in records.iter().zip(&result.record_results) {
            let identifier = record.identifier("email");
            prop_assert_eq!(&result.identifier, &identifier);
            prop_assert_eq!(result.success, !identifier.is_null());
            prop_assert_eq!(result.error_message.is_some(), !result.success);
        }
    }

    #[test]
    fn upsert_is_idempotent(records in customer_batch_strategy(20)) {
        // Duplicate identifiers within a batch race each other; keep one per key.
        let mut seen = HashSet::new();
        let records: Vec<Record> = records
            .into_iter()
            .filter(|r| !r.identifier("email").is_null())
            .filter(|r| seen.insert(r.identifier("email").to_string()))
            .collect();

        let destination = InMemoryDestination::sample();
        let engine = BatchEngine::default();

        let first = run_batch(&destination, &engine, records.clone());
        let rows_after_first = destination.row_count("customer");
        let second = run_batch(&destination, &engine, records.clone());

        prop_assert!(first.record_results.iter().all(|r| r.success));
        prop_assert_eq!(first, second);
        prop_assert_eq!(destination.row_count("customer"), rows_after_first);
        prop_assert_eq!(rows_after_first, records.len());

        for record in &records {
            let stored = destination.get("customer", &record.identifier("email"));
            prop_assert_eq!(stored.as_ref().and_then(|r| r.get("name")), record.get("name"));
        }
    }

    #[test]
    fn single_active_identifier_resolves(schema in schema_strategy(6, 1)) {
        let plan = SyncPlan {
            object: Object::new("customer", "Customers"),
            operation: Operation::Upsert,
            schema: schema.clone(),
        };

        let resolved = resolve_plan(&plan).unwrap();
        let expected: Vec<&str> = schema
            .iter()
            .filter(|(_, entry)| !entry.active_identifier)
            .map(|(_, entry)| entry.field.field_api_name.as_str())
            .collect();
        prop_assert_eq!(resolved.other_columns().collect::<Vec<_>>(), expected);
    }

    #[test]
    fn zero_or_many_active_identifiers_fail((active, schema) in unusable_schema()) {
        let plan = SyncPlan {
            object: Object::new("customer", "Customers"),
            operation: Operation::Upsert,
            schema,
        };

        let err = resolve_plan(&plan).unwrap_err();
        if active == 0 {
            prop_assert_eq!(err, SchemaError::NoActiveIdentifier);
        } else {
            prop_assert!(
                matches!(err, SchemaError::AmbiguousIdentifier(ref names) if names.len() == active)
            );
        }
    }
}

#[test]
fn null_identifier_stays_null_in_results() {
    let destination = InMemoryDestination::sample();
    let records = vec![Record::new().with("email", Value::Null).with("name", "A")];

    let result = run_batch(&destination, &BatchEngine::default(), records);
    assert_eq!(result.record_results[0].identifier, Value::Null);
    assert!(!result.record_results[0].success);
}
