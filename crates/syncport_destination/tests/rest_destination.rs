//! REST destination against the in-process fake CRM.

use serde_json::{json, Value};
use syncport_destination::{
    crm_registry, Destination, RecordError, RestConfig, RestDestination, SecretSource, WritePlan,
};
use syncport_protocol::{Field, FieldType, Object, Operation, Record};
use syncport_testkit::{user, FakeCrm};

fn plan(operation: Operation) -> WritePlan {
    WritePlan::new(
        Object::new("user", "Users"),
        operation,
        Field::new("userID", "User ID", FieldType::String).identifier(),
        vec![
            Field::new("name", "Name", FieldType::String),
            Field::new("email", "Email", FieldType::String),
        ],
    )
}

#[tokio::test]
async fn upsert_creates_then_updates() {
    let crm = FakeCrm::spawn("key").await;
    let destination = crm.destination();

    let writer = destination.open_batch(&plan(Operation::Upsert)).await.unwrap();
    writer.write(&user("u1", "Ada", "ada@x.com")).await.unwrap();
    writer.write(&user("u1", "Ada L.", "ada@x.com")).await.unwrap();
    writer.finish().await.unwrap();

    assert_eq!(crm.user_count(), 1);
    assert_eq!(crm.user("u1").unwrap()["name"], "Ada L.");
    assert_eq!(crm.retrieve_calls(), 0);
}

#[tokio::test]
async fn update_of_unknown_record_never_creates() {
    let crm = FakeCrm::spawn("key").await;
    let destination = crm.destination();

    let writer = destination.open_batch(&plan(Operation::Update)).await.unwrap();
    let err = writer
        .write(&user("ghost", "Nobody", "ghost@x.com"))
        .await
        .unwrap_err();

    assert!(matches!(err, RecordError::RecordNotFound { ref identifier } if *identifier == json!("ghost")));
    assert_eq!(crm.retrieve_calls(), 2);
    assert_eq!(crm.create_calls(), 0);
    assert_eq!(crm.user_count(), 0);
}

#[tokio::test]
async fn update_finds_record_by_alternate_key() {
    let crm = FakeCrm::spawn("key").await;
    crm.seed_user(json!({"userID": "u1", "name": "Ada", "email": "ada@x.com"}));
    let destination = crm.destination();

    let writer = destination.open_batch(&plan(Operation::Update)).await.unwrap();
    // Unknown id, known email.
    writer
        .write(&user("u9", "Ada Lovelace", "ada@x.com"))
        .await
        .unwrap();

    assert_eq!(crm.create_calls(), 1);
}

#[tokio::test]
async fn custom_fields_are_bucketed() {
    let crm = FakeCrm::spawn("key").await;
    let destination = crm.destination();

    let writer = destination.open_batch(&plan(Operation::Upsert)).await.unwrap();
    writer
        .write(&user("u1", "Ada", "ada@x.com").with("plan_tier", "gold"))
        .await
        .unwrap();

    let stored = crm.user("u1").unwrap();
    assert_eq!(stored["customFields"], json!({"plan_tier": "gold"}));
    assert!(stored.get("plan_tier").is_none());
}

#[tokio::test]
async fn rejection_carries_response_body() {
    let crm = FakeCrm::spawn("key").await;
    crm.ban("u2");
    let destination = crm.destination();

    let writer = destination.open_batch(&plan(Operation::Upsert)).await.unwrap();
    let err = writer.write(&user("u2", "Bob", "bob@x.com")).await.unwrap_err();
    assert!(matches!(err, RecordError::Rejected(ref m) if m == "user is banned"));
}

#[tokio::test]
async fn wrong_api_key_fails_records() {
    let crm = FakeCrm::spawn("key").await;
    let config = crm
        .config()
        .with_api_key(SecretSource::Value("stale".into()));
    let destination = RestDestination::new(config, crm_registry()).unwrap();

    let writer = destination.open_batch(&plan(Operation::Upsert)).await.unwrap();
    let err = writer.write(&user("u1", "Ada", "ada@x.com")).await.unwrap_err();
    assert!(matches!(err, RecordError::Rejected(ref m) if m == "invalid api key"));
}

#[tokio::test]
async fn missing_api_key_fails_the_batch() {
    let config = RestConfig::new()
        .with_base_url("http://127.0.0.1:9")
        .with_api_key(SecretSource::Env("SYNCPORT_TEST_UNSET_CRM_KEY".into()));
    let destination = RestDestination::new(config, crm_registry()).unwrap();

    let err = destination
        .open_batch(&plan(Operation::Upsert))
        .await
        .err()
        .unwrap();
    assert!(err.to_string().contains("SYNCPORT_TEST_UNSET_CRM_KEY"));
}

#[tokio::test]
async fn test_connection_reaches_the_api() {
    let crm = FakeCrm::spawn("key").await;
    crm.destination().test_connection().await.unwrap();
}

#[tokio::test]
async fn null_identifier_is_refused_without_calling_the_api() {
    let crm = FakeCrm::spawn("key").await;
    crm.seed_user(json!({"userID": "u1", "name": "Ada", "email": "ada@x.com"}));
    let destination = crm.destination();

    for operation in [Operation::Update, Operation::Upsert] {
        let writer = destination.open_batch(&plan(operation)).await.unwrap();
        for record in [
            Record::new().with("userID", Value::Null).with("name", "Ada").with("email", "ada@x.com"),
            Record::new().with("name", "Ada").with("email", "ada@x.com"),
        ] {
            let err = writer.write(&record).await.unwrap_err();
            assert!(
                matches!(err, RecordError::InvalidValue { ref column, .. } if column == "userID"),
                "{operation:?}: {err}"
            );
        }
        writer.finish().await.unwrap();
    }

    assert_eq!(crm.retrieve_calls(), 0);
    assert_eq!(crm.create_calls(), 0);
    assert_eq!(crm.user_count(), 1);
}
