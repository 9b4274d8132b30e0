#![forbid(unsafe_code)]

use kp_core::{Job, JobId, SchemaError, Status, ValidationError};
use kp_storage::{SqliteStore, StoreConfig, StoreError};
use serde_json::{Map as JsonMap, Value as JsonValue, json};
use std::time::Duration;
use tempfile::TempDir;

fn sdf_validator(document: &JsonMap<String, JsonValue>) -> Result<(), SchemaError> {
    match document.get("events") {
        Some(events) if !events.is_object() => Err(SchemaError::new("events", "must be an object")),
        _ => Ok(()),
    }
}

fn job_fields() -> JsonMap<String, JsonValue> {
    let JsonValue::Object(fields) = json!({
        "title": "sample",
        "description": "sample text",
        "status": "pending",
        "parent": null,
        "sdf_data": {
            "info": { "title": "consume" },
            "events": { "consume": { "label": "Consume" } }
        },
    }) else {
        unreachable!()
    };
    fields
}

fn sample_job() -> Job {
    Job::construct(job_fields(), &sdf_validator).expect("valid job")
}

fn setup() -> (TempDir, SqliteStore) {
    let dir = tempfile::tempdir().expect("create temp dir");
    let store = SqliteStore::open(dir.path()).expect("open store");
    (dir, store)
}

#[test]
fn open_creates_missing_directory() {
    let dir = tempfile::tempdir().expect("create temp dir");
    let nested = dir.path().join("data").join("jobs");
    let mut store = SqliteStore::open(&nested).expect("open store");
    assert!(nested.is_dir());
    assert_eq!(store.storage_dir(), nested.as_path());
    assert!(store.db_path().starts_with(&nested));
    store.close().expect("close");
}

#[test]
fn open_fails_when_path_is_a_file() {
    let dir = tempfile::tempdir().expect("create temp dir");
    let file = dir.path().join("not-a-dir");
    std::fs::write(&file, b"x").expect("write file");

    let err = SqliteStore::open(&file).expect_err("open must fail");
    assert!(err.is_unavailable(), "unexpected error: {err}");
}

#[test]
fn insert_then_get_round_trips() {
    let (_dir, mut store) = setup();
    let job = sample_job();

    let id = store.insert(job.clone()).expect("insert");
    let record = store.get(&id).expect("get");

    assert_eq!(record.id(), &id);
    assert!(record.job().last_updated.is_some());
    let mut stored = record.job().clone();
    stored.last_updated = None;
    assert_eq!(stored, job);
}

#[test]
fn insert_overwrites_caller_timestamp() {
    let (_dir, mut store) = setup();
    let mut fields = job_fields();
    fields.insert("last_updated".into(), json!("1999-01-01T00:00:00Z"));
    let job = Job::construct(fields, &sdf_validator).expect("valid job");
    let supplied = job.last_updated;

    let id = store.insert(job).expect("insert");
    let stored = store.get(&id).expect("get").job().last_updated;
    assert!(stored.is_some());
    assert!(stored > supplied);
}

#[test]
fn insert_issues_distinct_ids() {
    let (_dir, mut store) = setup();
    let first = store.insert(sample_job()).expect("insert");
    let second = store.insert(sample_job()).expect("insert");
    assert_ne!(first, second);
    assert_eq!(store.count().expect("count"), 2);
}

#[test]
fn create_rejects_bad_sdf_without_writing() {
    let (_dir, mut store) = setup();
    let mut fields = job_fields();
    fields.insert("sdf_data".into(), json!({ "events": 19 }));

    let err = store
        .create(fields, &sdf_validator)
        .expect_err("invalid sdf");
    assert!(matches!(
        err,
        StoreError::Validation(ValidationError::Schema(_))
    ));
    assert!(store.is_empty().expect("is_empty"));
}

#[test]
fn unvalidated_sdf_never_reaches_insert() {
    let (_dir, mut store) = setup();
    let mut fields = job_fields();
    fields.insert("sdf_data".into(), json!({ "events": 19 }));

    let err = Job::from_json(JsonValue::Object(fields), &sdf_validator)
        .expect_err("invalid sdf");
    assert!(matches!(err, ValidationError::Schema(_)));

    let mut patch = JsonMap::new();
    patch.insert("sdf_data".into(), json!({ "events": 19 }));
    let err = sample_job()
        .apply_patch(&patch, &sdf_validator)
        .expect_err("invalid sdf patch");
    assert!(matches!(err, ValidationError::Schema(_)));

    assert!(store.is_empty().expect("is_empty"));
    let id = store.insert(sample_job()).expect("insert");
    let stored = store.get(&id).expect("get");
    assert_eq!(stored.job().sdf_data, sample_job().sdf_data);
}

#[test]
fn create_stores_validated_job() {
    let (_dir, mut store) = setup();
    let record = store
        .create(job_fields(), &sdf_validator)
        .expect("create");
    assert!(record.job().last_updated.is_some());
    assert_eq!(store.get(record.id()).expect("get"), record);
}

#[test]
fn get_unknown_id_is_not_found() {
    let (_dir, store) = setup();
    for raw in ["not-a-real-id", "not a key"] {
        let id = JobId::try_new(raw).expect("job id");
        let err = store.get(&id).expect_err("missing");
        assert!(err.is_not_found(), "unexpected error: {err}");
    }
}

#[test]
fn delete_removes_record() {
    let (_dir, mut store) = setup();
    let keep = store.insert(sample_job()).expect("insert");
    let id = store.insert(sample_job()).expect("insert");

    store.delete(&id).expect("delete");
    assert!(store.get(&id).expect_err("deleted").is_not_found());
    assert!(store.delete(&id).expect_err("second delete").is_not_found());
    assert!(store.get(&keep).is_ok());
}

#[test]
fn delete_unknown_id_is_not_found() {
    let (_dir, mut store) = setup();
    let id = JobId::try_new("not-there").expect("job id");
    assert!(store.delete(&id).expect_err("missing").is_not_found());
}

#[test]
fn update_replaces_record_and_restamps() {
    let (_dir, mut store) = setup();
    store.insert(sample_job()).expect("insert");
    let id = store.insert(sample_job()).expect("insert");
    let before = store.get(&id).expect("get");
    assert_eq!(before.job().status, Status::Pending);

    let replacement = sample_job()
        .with_status(Status::Running)
        .with_sdf_data(None);
    let updated = store.update(&id, replacement.clone()).expect("update");
    let after = store.get(&id).expect("get");

    assert_eq!(after, updated);
    assert_eq!(after.job().status, Status::Running);
    assert!(after.job().sdf_data.is_none());
    assert!(after.job().last_updated >= before.job().last_updated);

    let mut stored = after.job().clone();
    stored.last_updated = None;
    assert_eq!(stored, replacement);
}

#[test]
fn update_unknown_id_is_not_found_and_creates_nothing() {
    let (_dir, mut store) = setup();
    let id = JobId::try_new("never-issued").expect("job id");

    let err = store.update(&id, sample_job()).expect_err("strict update");
    assert!(err.is_not_found());
    assert!(store.get(&id).expect_err("still missing").is_not_found());
    assert!(store.is_empty().expect("is_empty"));
}

#[test]
fn patch_then_update_changes_status_only() {
    let (_dir, mut store) = setup();
    let id = store.insert(sample_job()).expect("insert");
    let current = store.get(&id).expect("get");

    let JsonValue::Object(patch) = json!({ "status": "running" }) else {
        unreachable!()
    };
    let patched = current
        .job()
        .apply_patch(&patch, &sdf_validator)
        .expect("patch");
    store.update(&id, patched).expect("update");

    let after = store.get(&id).expect("get");
    assert_eq!(after.job().status, Status::Running);
    assert_eq!(after.job().title, current.job().title);
    assert_eq!(after.job().sdf_data, current.job().sdf_data);
}

#[test]
fn records_survive_reopen() {
    let dir = tempfile::tempdir().expect("create temp dir");
    let mut store = SqliteStore::open(dir.path()).expect("open store");
    let id = store.insert(sample_job()).expect("insert");
    let record = store.get(&id).expect("get");
    store.close().expect("close");

    let mut reopened = SqliteStore::open(dir.path()).expect("reopen store");
    assert_eq!(reopened.get(&id).expect("get"), record);
    reopened.close().expect("close");
}

#[test]
fn close_is_idempotent_and_blocks_further_use() {
    let (_dir, mut store) = setup();
    let id = store.insert(sample_job()).expect("insert");

    store.close().expect("close");
    store.close().expect("close again");
    assert!(store.is_closed());

    let err = store.get(&id).expect_err("closed");
    assert!(matches!(err, StoreError::Closed));
    assert!(err.is_unavailable());
    assert!(matches!(
        store.insert(sample_job()),
        Err(StoreError::Closed)
    ));
}

#[test]
fn with_store_closes_on_success_and_error() {
    let dir = tempfile::tempdir().expect("create temp dir");
    let config = StoreConfig::new(dir.path())
        .with_file_name("scoped.db")
        .with_busy_timeout(Duration::from_millis(250));

    let id = SqliteStore::with_store(config.clone(), |store| store.insert(sample_job()))
        .expect("scoped insert");

    let missing = JobId::try_new("missing").expect("job id");
    let err = SqliteStore::with_store(config.clone(), |store| {
        store.get(&id)?;
        store.get(&missing)
    })
    .expect_err("scoped get");
    assert!(err.is_not_found());

    let count = SqliteStore::with_store(config, |store| store.count()).expect("scoped count");
    assert_eq!(count, 1);
    assert!(dir.path().join("scoped.db").is_file());
}
