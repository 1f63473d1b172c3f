//! Mutation orchestration integration tests: transactional create with
//! revisions, rollback of orphaned records, delete outcomes and default
//! resolution on read.

use schemaforge::mutation::MutationError;
use schemaforge::testing_utils::MemoryStorage;
use schemaforge::{build_core, EntitySchemaCore, EntityStorage, MutationOrchestrator, SourceLocation};
use serde_json::{json, Map, Value};
use std::fs;
use std::sync::Arc;
use tempfile::TempDir;

fn write_def(dir: &TempDir, name: &str, body: Value) {
    let _ = env_logger::builder().is_test(true).try_init();
    fs::write(
        dir.path().join(format!("{}.json", name)),
        serde_json::to_string_pretty(&body).unwrap(),
    )
    .unwrap();
}

fn cat_def(revisions: bool) -> Value {
    json!({
        "description": "A cat",
        "plural": "Cats",
        "storage": "db",
        "revisions": revisions,
        "fields": {
            "name": {"type": "string", "label": "Name", "required": true},
            "breed": {"type": "string", "label": "Breed", "default": "moggy"}
        }
    })
}

fn setup(
    revisions: bool,
) -> (
    TempDir,
    Arc<EntitySchemaCore>,
    MutationOrchestrator,
    Arc<MemoryStorage>,
) {
    let dir = TempDir::new().unwrap();
    write_def(&dir, "Cat", cat_def(revisions));
    let core = Arc::new(build_core(
        vec![SourceLocation::new("app", dir.path())],
        "app",
    ));
    let storage = Arc::new(MemoryStorage::new());
    let orchestrator = MutationOrchestrator::new(
        Arc::clone(&core),
        Arc::clone(&storage) as Arc<dyn EntityStorage>,
    );
    (dir, core, orchestrator, storage)
}

fn args(pairs: Value) -> Map<String, Value> {
    pairs.as_object().cloned().unwrap()
}

#[tokio::test]
async fn create_persists_the_record_with_defaults_and_timestamps() {
    let (_dir, _core, orchestrator, storage) = setup(false);

    let id = orchestrator
        .create("Cat", args(json!({"name": "Mog"})))
        .await
        .unwrap();

    let record = storage.find_by_id("cats", &id).await.unwrap().unwrap();
    assert_eq!(record["name"], "Mog");
    assert_eq!(record["breed"], "moggy");
    assert!(record["_created"].is_string());
    assert!(record["_updated"].is_string());
    assert_eq!(storage.count("catRevisions"), 0);
}

#[tokio::test]
async fn missing_required_field_fails_without_writing() {
    let (_dir, _core, orchestrator, storage) = setup(false);

    let err = orchestrator.create("Cat", args(json!({}))).await.unwrap_err();
    assert!(err.to_string().contains("Missing required field 'name'"));
    assert_eq!(storage.count("cats"), 0);
}

#[tokio::test]
async fn revisioned_create_writes_a_linked_revision_record() {
    let (_dir, _core, orchestrator, storage) = setup(true);

    let id = orchestrator
        .create("Cat", args(json!({"name": "Mog"})))
        .await
        .unwrap();

    assert_eq!(storage.count("cats"), 1);
    assert_eq!(storage.count("catRevisions"), 1);

    let record = storage.find_by_id("cats", &id).await.unwrap().unwrap();
    let revision_id = record["_revision"].as_str().unwrap();
    let revision = storage
        .find_by_id("catRevisions", revision_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(revision["name"], "Mog");
}

#[tokio::test]
async fn failed_create_rolls_back_the_orphaned_revision() {
    let (_dir, _core, orchestrator, storage) = setup(true);

    // The revision snapshot is written during prepare; failing the base
    // write afterwards must remove it again.
    storage.fail_creates_in("cats");
    let err = orchestrator
        .create("Cat", args(json!({"name": "Mog"})))
        .await
        .unwrap_err();
    assert!(matches!(err, MutationError::Failed(_)));
    assert!(err.to_string().contains("simulated create failure"));

    assert_eq!(storage.count("cats"), 0);
    assert_eq!(storage.count("catRevisions"), 0);
}

#[tokio::test]
async fn create_rejects_unknown_and_invalid_entity_types() {
    let (dir, core, orchestrator, _storage) = setup(false);

    let err = orchestrator
        .create("Dog", args(json!({"name": "Rex"})))
        .await
        .unwrap_err();
    assert!(matches!(err, MutationError::Schema(_)));

    write_def(&dir, "Broken", json!({"description": "no fields"}));
    core.clear_cache();
    let err = orchestrator.create("Broken", args(json!({}))).await.unwrap_err();
    match err {
        MutationError::InvalidEntityType(name, message) => {
            assert_eq!(name, "Broken");
            assert!(message.contains("missing required property"));
        }
        other => panic!("unexpected error: {}", other),
    }
}

#[tokio::test]
async fn delete_distinguishes_not_found_from_success() {
    let (_dir, _core, orchestrator, storage) = setup(false);

    let id = orchestrator
        .create("Cat", args(json!({"name": "Mog"})))
        .await
        .unwrap();

    let deleted = orchestrator.delete("Cat", &id).await.unwrap();
    assert_eq!(deleted, id);
    assert_eq!(storage.count("cats"), 0);

    let err = orchestrator.delete("Cat", &id).await.unwrap_err();
    assert!(matches!(err, MutationError::NotFound(_)));
}

#[tokio::test]
async fn reads_resolve_defaults_added_after_the_record_was_created() {
    let dir = TempDir::new().unwrap();
    write_def(
        &dir,
        "Cat",
        json!({
            "plural": "Cats",
            "storage": "db",
            "fields": {
                "name": {"type": "string", "label": "Name", "required": true},
                "stories": {
                    "type": "object",
                    "label": "Stories",
                    "many": true,
                    "fields": {
                        "title": {"type": "string", "label": "Title"},
                        "body": {"type": "text", "label": "Body"}
                    }
                }
            }
        }),
    );

    let core = Arc::new(build_core(
        vec![SourceLocation::new("app", dir.path())],
        "app",
    ));
    let storage = Arc::new(MemoryStorage::new());
    let orchestrator = MutationOrchestrator::new(
        Arc::clone(&core),
        Arc::clone(&storage) as Arc<dyn EntityStorage>,
    );

    let id = orchestrator
        .create(
            "Cat",
            args(json!({"name": "Mog", "stories": [{"title": "A day"}]})),
        )
        .await
        .unwrap();

    // Tighten the definition after the fact: title and body become
    // required with defaults.
    write_def(
        &dir,
        "Cat",
        json!({
            "plural": "Cats",
            "storage": "db",
            "fields": {
                "name": {"type": "string", "label": "Name", "required": true},
                "stories": {
                    "type": "object",
                    "label": "Stories",
                    "many": true,
                    "fields": {
                        "title": {"type": "string", "label": "Title", "required": true, "default": "Untitled"},
                        "body": {"type": "text", "label": "Body", "required": true, "default": ""}
                    }
                }
            }
        }),
    );
    core.clear_cache();

    // The stored record was never touched, yet reads now report the
    // configured defaults for the tightened fields.
    let record = orchestrator.load("Cat", &id).await.unwrap().unwrap();
    assert_eq!(record["stories"][0]["title"], "A day");
    assert_eq!(record["stories"][0]["body"], "");
}

#[tokio::test]
async fn concurrent_creates_use_independent_transactions() {
    let (_dir, _core, orchestrator, storage) = setup(true);
    let orchestrator = Arc::new(orchestrator);

    let mut handles = Vec::new();
    for i in 0..4 {
        let orchestrator = Arc::clone(&orchestrator);
        handles.push(tokio::spawn(async move {
            orchestrator
                .create("Cat", args(json!({"name": format!("cat-{}", i)})))
                .await
        }));
    }
    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    assert_eq!(storage.count("cats"), 4);
    assert_eq!(storage.count("catRevisions"), 4);
}
