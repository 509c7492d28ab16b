use crate::{
    bucket::{Bucket, BucketBuilder},
    error::InternalError,
    index::Indexer,
    migration::{MigrationBucket, MigrationRegistry, SchemaEnvelope, no_modification},
    model::{Model, Object},
    obs::{MetricsEvent, MetricsSink, with_metrics_sink},
    serialize::{deserialize, serialize},
    store::{MemoryStore, ReadStore, WriteStore},
    test_support::Account,
};
use std::{cell::RefCell, rc::Rc, sync::Arc};

// v2 stores balances in cents.
fn to_cents(account: &mut Account) -> Result<(), InternalError> {
    account.balance = account.balance.saturating_mul(100);
    Ok(())
}

fn v1_registry() -> Arc<MigrationRegistry> {
    let mut registry = MigrationRegistry::new();
    registry.register::<Account, _>(1, no_modification);

    Arc::new(registry)
}

fn v2_registry() -> Arc<MigrationRegistry> {
    let mut registry = MigrationRegistry::new();
    registry.register::<Account, _>(1, no_modification);
    registry.register::<Account, _>(2, to_cents);

    Arc::new(registry)
}

fn builder() -> BucketBuilder<Account> {
    Bucket::builder("acct", Account::default()).with_index(
        "name",
        Indexer::single(|a: &Account| Some(a.name.as_bytes().to_vec())),
        true,
    )
}

fn stored_envelope(store: &MemoryStore, key: &[u8]) -> SchemaEnvelope {
    let mut db_key = b"acct:".to_vec();
    db_key.extend_from_slice(key);
    let bytes = store.get(&db_key).expect("get").expect("record present");

    deserialize(&bytes).expect("envelope")
}

#[derive(Default)]
struct CaptureSink(RefCell<Vec<MetricsEvent>>);

impl MetricsSink for CaptureSink {
    fn record(&self, event: MetricsEvent) {
        self.0.borrow_mut().push(event);
    }
}

impl CaptureSink {
    fn migrations(&self) -> Vec<(u32, u32)> {
        self.0
            .borrow()
            .iter()
            .filter_map(|event| match event {
                MetricsEvent::SchemaMigrated { from, to, .. } => Some((*from, *to)),
                _ => None,
            })
            .collect()
    }
}

#[test]
fn writes_are_stamped_with_current_version() {
    let bucket = MigrationBucket::new(builder(), v2_registry());
    let mut store = MemoryStore::new();

    bucket
        .save(&mut store, &Object::new(b"\x01".to_vec(), Account::new("alice", 5)))
        .expect("save");

    assert_eq!(bucket.current_version(), 2);
    assert_eq!(stored_envelope(&store, b"\x01").schema, 2);
}

#[test]
fn old_records_are_migrated_on_read() {
    let mut store = MemoryStore::new();
    let original = Account::new("alice", 5);
    MigrationBucket::new(builder(), v1_registry())
        .save(&mut store, &Object::new(b"\x01".to_vec(), original.clone()))
        .expect("save at v1");
    assert_eq!(stored_envelope(&store, b"\x01").schema, 1);

    let bucket = MigrationBucket::new(builder(), v2_registry());
    let capture = Rc::new(CaptureSink::default());

    let loaded = with_metrics_sink(capture.clone(), || {
        bucket.get(&store, b"\x01").expect("get").expect("present")
    });

    let mut expected = original;
    to_cents(&mut expected).expect("migrate");
    assert_eq!(loaded.value(), &expected);
    assert_eq!(capture.migrations(), vec![(1, 2)]);

    // The store itself is not rewritten by a read.
    assert_eq!(stored_envelope(&store, b"\x01").schema, 1);

    bucket.save(&mut store, &loaded).expect("resave");
    assert_eq!(stored_envelope(&store, b"\x01").schema, 2);

    let capture = Rc::new(CaptureSink::default());
    let reread = with_metrics_sink(capture.clone(), || {
        bucket.get(&store, b"\x01").expect("get").expect("present")
    });
    assert_eq!(reread.value().balance, 500);
    assert!(capture.migrations().is_empty(), "current records are not migrated");
}

#[test]
fn index_lookups_return_migrated_records() {
    let mut store = MemoryStore::new();
    MigrationBucket::new(builder(), v1_registry())
        .save(&mut store, &Object::new(b"\x01".to_vec(), Account::new("alice", 3)))
        .expect("save at v1");

    let bucket = MigrationBucket::new(builder(), v2_registry());
    let found = bucket
        .get_indexed(&store, "name", b"alice")
        .expect("lookup");

    assert_eq!(found.len(), 1);
    assert_eq!(found[0].value().balance, 300);
}

#[test]
fn newer_records_are_a_configuration_error() {
    let mut store = MemoryStore::new();
    MigrationBucket::new(builder(), v2_registry())
        .save(&mut store, &Object::new(b"\x01".to_vec(), Account::new("alice", 5)))
        .expect("save at v2");

    let err = MigrationBucket::new(builder(), v1_registry())
        .get(&store, b"\x01")
        .expect_err("v1 code cannot read v2 data");

    assert!(err.is_configuration());
}

#[test]
fn version_zero_is_corruption() {
    let mut store = MemoryStore::new();
    let envelope = SchemaEnvelope {
        schema: 0,
        payload: Account::new("alice", 1).marshal().expect("marshal"),
    };
    store
        .set(b"acct:\x01".to_vec(), serialize(&envelope).expect("encode"))
        .expect("set");

    let err = MigrationBucket::new(builder(), v2_registry())
        .get(&store, b"\x01")
        .expect_err("version 0 must fail");

    assert!(err.is_corruption());
}

#[test]
fn failing_step_aborts_read() {
    let mut store = MemoryStore::new();
    MigrationBucket::new(builder(), v1_registry())
        .save(&mut store, &Object::new(b"\x01".to_vec(), Account::new("alice", 5)))
        .expect("save at v1");

    let mut registry = MigrationRegistry::new();
    registry.register::<Account, _>(1, no_modification);
    registry.register::<Account, _>(2, |_: &mut Account| {
        Err(InternalError::store_internal("step failed"))
    });
    let bucket = MigrationBucket::new(builder(), Arc::new(registry));

    bucket
        .get(&store, b"\x01")
        .expect_err("step error propagates");
}

#[test]
fn unversioned_bytes_are_rejected() {
    let mut store = MemoryStore::new();
    Bucket::builder("acct", Account::default())
        .build()
        .save(&mut store, &Object::new(b"\x01".to_vec(), Account::new("alice", 1)))
        .expect("plain save");

    let err = MigrationBucket::new(builder(), v2_registry())
        .get(&store, b"\x01")
        .expect_err("no envelope");

    assert!(err.is_corruption());
}

#[test]
fn registry_reports_current_version() {
    let registry = v2_registry();

    assert_eq!(registry.current_version::<Account>(), Some(2));
}

#[test]
#[should_panic(expected = "registered twice")]
fn duplicate_registration_panics() {
    let mut registry = MigrationRegistry::new();
    registry.register::<Account, _>(1, no_modification);
    registry.register::<Account, _>(1, no_modification);
}

#[test]
#[should_panic(expected = "out of order")]
fn gap_in_registration_panics() {
    let mut registry = MigrationRegistry::new();
    registry.register::<Account, _>(1, no_modification);
    registry.register::<Account, _>(3, to_cents);
}

#[test]
#[should_panic(expected = "out of order")]
fn first_version_must_be_one() {
    let mut registry = MigrationRegistry::new();
    registry.register::<Account, _>(2, to_cents);
}

#[test]
#[should_panic(expected = "schema not registered")]
fn unregistered_schema_panics_at_construction() {
    let _ = MigrationBucket::new(builder(), Arc::new(MigrationRegistry::new()));
}
