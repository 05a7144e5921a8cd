//! Restore engine tests
//!
//! End-to-end restores of buffers, collection files, database folders, dump trees
//! and archives into an in-memory store.
//! Run with: cargo test --test restore_tests

use bson::{Document, doc};
use dumprestore::{
    ArchiveRestoreOptions, BufferRestoreOptions, CollectionRestoreOptions, ConnectionSource,
    DatabaseRestoreOptions, DumpRestoreOptions, MemoryStore, OnCollectionExists, RestoreError,
    restore_buffer, restore_collection, restore_database, restore_dump, restore_dump_archive,
};
use std::fs;
use std::path::Path;
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

fn encode(documents: &[Document]) -> Vec<u8> {
    let mut buffer = Vec::new();
    for document in documents {
        document.to_writer(&mut buffer).unwrap();
    }
    buffer
}

fn users() -> Vec<Document> {
    vec![
        doc! { "_id": 1, "name": "ada", "active": true },
        doc! { "_id": 2, "name": "grace", "active": false },
        doc! { "_id": 3, "name": "linus", "active": true },
    ]
}

fn orders() -> Vec<Document> {
    vec![
        doc! { "_id": 10, "user": 1, "total": 12.5 },
        doc! { "_id": 11, "user": 3, "total": 99.0 },
    ]
}

fn items() -> Vec<Document> {
    vec![doc! { "_id": "sku-1", "stock": 4 }]
}

fn write_collection(dir: &Path, file_name: &str, documents: &[Document]) {
    fs::create_dir_all(dir).unwrap();
    fs::write(dir.join(file_name), encode(documents)).unwrap();
}

/// dbA/{users.bson, orders.bson, orders.metadata.json} and dbB/{items.bson}
fn sample_dump() -> TempDir {
    let root = TempDir::new().unwrap();
    write_collection(&root.path().join("dbA"), "users.bson", &users());
    write_collection(&root.path().join("dbA"), "orders.bson", &orders());
    fs::write(root.path().join("dbA").join("orders.metadata.json"), b"{}").unwrap();
    write_collection(&root.path().join("dbB"), "items.bson", &items());
    fs::write(root.path().join("README.txt"), b"not a database").unwrap();
    root
}

fn connect(store: &Arc<MemoryStore>) -> ConnectionSource {
    ConnectionSource::handle(Arc::clone(store))
}

#[tokio::test]
async fn test_restore_buffer_creates_collection_and_inserts_in_order() {
    let store = Arc::new(MemoryStore::new());
    let options = BufferRestoreOptions::new(connect(&store), "app", "users", encode(&users()));

    let inserted = restore_buffer(options).await.unwrap();

    assert_eq!(inserted, 3);
    assert_eq!(store.documents("app", "users").unwrap(), users());
    assert_eq!(store.bulk_insert_calls(), 1);
}

#[tokio::test]
async fn test_corrupted_buffer_inserts_nothing() {
    let store = Arc::new(MemoryStore::new());
    let mut buffer = encode(&users());
    let second = encode(&users()[..1]).len();
    buffer[second..second + 4].copy_from_slice(&i32::MAX.to_le_bytes());

    let err = restore_buffer(BufferRestoreOptions::new(connect(&store), "app", "users", buffer))
        .await
        .unwrap_err();

    assert!(matches!(err, RestoreError::Decode { offset, .. } if offset == second));
    assert_eq!(store.bulk_insert_calls(), 0);
    assert_eq!(store.documents("app", "users").unwrap_or_default().len(), 0);
}

#[tokio::test]
async fn test_filter_rejecting_everything_is_a_no_op() {
    let store = Arc::new(MemoryStore::new());
    let options = BufferRestoreOptions::new(connect(&store), "app", "users", encode(&users()))
        .with_filter(|_| false);

    let inserted = restore_buffer(options).await.unwrap();

    assert_eq!(inserted, 0);
    assert_eq!(store.bulk_insert_calls(), 0);
}

#[tokio::test]
async fn test_limit_filter_and_transform_on_collection_file() {
    let dir = TempDir::new().unwrap();
    write_collection(dir.path(), "users.bson", &users());
    let store = Arc::new(MemoryStore::new());

    let mut options = CollectionRestoreOptions::new(
        connect(&store),
        "app",
        "people",
        dir.path().join("users.bson"),
    )
    .with_filter(|d| d.get_bool("active").unwrap_or(false))
    .with_transform(|mut d| {
        d.remove("active");
        d
    });
    options.limit = Some(1);

    let inserted = restore_collection(options).await.unwrap();

    assert_eq!(inserted, 1);
    assert_eq!(
        store.documents("app", "people").unwrap(),
        vec![doc! { "_id": 1, "name": "ada" }]
    );
}

#[tokio::test]
async fn test_existing_collection_is_rejected_by_default() {
    let dir = TempDir::new().unwrap();
    write_collection(dir.path(), "users.bson", &users());
    let store = Arc::new(MemoryStore::new());
    let original = vec![doc! { "_id": 99, "name": "keep me" }];
    store.seed("app", "users", original.clone());

    let err = restore_collection(CollectionRestoreOptions::new(
        connect(&store),
        "app",
        "users",
        dir.path().join("users.bson"),
    ))
    .await
    .unwrap_err();

    assert_eq!(err.colliding_collections(), Some(&["users".to_string()][..]));
    assert_eq!(store.documents("app", "users").unwrap(), original);
}

#[tokio::test]
async fn test_overwrite_with_clean_replaces_contents() {
    let dir = TempDir::new().unwrap();
    write_collection(dir.path(), "users.bson", &users());
    let store = Arc::new(MemoryStore::new());
    store.seed("app", "users", vec![doc! { "_id": 99 }, doc! { "_id": 1, "stale": true }]);

    let mut options = CollectionRestoreOptions::new(
        connect(&store),
        "app",
        "users",
        dir.path().join("users.bson"),
    );
    options.policy.on_collection_exists = OnCollectionExists::Overwrite;

    restore_collection(options).await.unwrap();

    assert_eq!(store.documents("app", "users").unwrap(), users());
}

#[tokio::test]
async fn test_duplicate_key_without_clean_is_surfaced() {
    let dir = TempDir::new().unwrap();
    write_collection(dir.path(), "users.bson", &users());
    let store = Arc::new(MemoryStore::new());
    store.seed("app", "users", vec![doc! { "_id": 2 }]);

    let mut options = CollectionRestoreOptions::new(
        connect(&store),
        "app",
        "users",
        dir.path().join("users.bson"),
    );
    options.policy.clean = false;
    options.policy.on_collection_exists = OnCollectionExists::Overwrite;

    let err = restore_collection(options).await.unwrap_err();

    assert!(matches!(err, RestoreError::Store(ref msg) if msg.contains("E11000")));
    assert_eq!(store.bulk_insert_calls(), 1);
}

#[tokio::test]
async fn test_missing_collection_file_is_an_io_error() {
    let store = Arc::new(MemoryStore::new());
    let err = restore_collection(CollectionRestoreOptions::new(
        connect(&store),
        "app",
        "users",
        "/no/such/users.bson",
    ))
    .await
    .unwrap_err();
    assert!(matches!(err, RestoreError::Io { .. }));
}

#[tokio::test]
async fn test_gzipped_collection_file_is_restored() {
    use flate2::Compression;
    use flate2::write::GzEncoder;
    use std::io::Write;

    let dir = TempDir::new().unwrap();
    let mut encoder = GzEncoder::new(
        fs::File::create(dir.path().join("users.bson.gz")).unwrap(),
        Compression::default(),
    );
    encoder.write_all(&encode(&users())).unwrap();
    encoder.finish().unwrap();
    let store = Arc::new(MemoryStore::new());

    let summary = restore_database(DatabaseRestoreOptions::new(connect(&store), "app", dir.path()))
        .await
        .unwrap();

    assert_eq!(summary.inserted, 3);
    assert_eq!(store.documents("app", "users").unwrap(), users());
}

#[tokio::test]
async fn test_database_batch_check_aborts_before_creating_anything() {
    let dump = sample_dump();
    let store = Arc::new(MemoryStore::new());
    store.seed("dbA", "orders", vec![doc! { "_id": 1 }]);

    let err = restore_database(DatabaseRestoreOptions::new(
        connect(&store),
        "dbA",
        dump.path().join("dbA"),
    ))
    .await
    .unwrap_err();

    assert_eq!(err.colliding_collections(), Some(&["orders".to_string()][..]));
    assert_eq!(store.collection_names("dbA"), vec!["orders".to_string()]);
    assert_eq!(store.bulk_insert_calls(), 0);
}

#[tokio::test]
async fn test_database_notify_reports_each_collision_once() {
    let dump = sample_dump();
    let store = Arc::new(MemoryStore::new());
    store.seed("dbA", "users", vec![]);
    store.seed("dbA", "orders", vec![]);
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);

    let mut options = DatabaseRestoreOptions::new(connect(&store), "dbA", dump.path().join("dbA"));
    options.policy.on_collection_exists =
        OnCollectionExists::notify(move |name| sink.lock().unwrap().push(name.to_string()));

    let summary = restore_database(options).await.unwrap();

    let mut seen = seen.lock().unwrap().clone();
    seen.sort();
    assert_eq!(seen, vec!["orders".to_string(), "users".to_string()]);
    assert_eq!(summary.inserted, 5);
}

#[tokio::test]
async fn test_database_transform_observes_collection_name() {
    let dump = sample_dump();
    let store = Arc::new(MemoryStore::new());

    let options = DatabaseRestoreOptions::new(connect(&store), "dbA", dump.path().join("dbA"))
        .with_transform(|mut d, context| {
            d.insert("from", context.collection.clone());
            d
        });

    restore_database(options).await.unwrap();

    for d in store.documents("dbA", "users").unwrap() {
        assert_eq!(d.get_str("from").unwrap(), "users");
    }
    for d in store.documents("dbA", "orders").unwrap() {
        assert_eq!(d.get_str("from").unwrap(), "orders");
    }
}

#[tokio::test]
async fn test_two_files_for_one_collection_fail_before_any_write() {
    use flate2::Compression;
    use flate2::write::GzEncoder;
    use std::io::Write;

    let dir = TempDir::new().unwrap();
    write_collection(dir.path(), "users.bson", &users());
    let mut encoder = GzEncoder::new(
        fs::File::create(dir.path().join("users.bson.gz")).unwrap(),
        Compression::default(),
    );
    encoder.write_all(&encode(&users()[..1])).unwrap();
    encoder.finish().unwrap();
    let store = Arc::new(MemoryStore::new());

    let err = restore_database(DatabaseRestoreOptions::new(connect(&store), "app", dir.path()))
        .await
        .unwrap_err();

    assert!(matches!(err, RestoreError::Config(ref msg) if msg.contains("users")));
    assert!(store.documents("app", "users").is_none());
    assert_eq!(store.bulk_insert_calls(), 0);
}

#[tokio::test]
async fn test_dump_restores_all_databases_and_rejects_rerun() {
    let dump = sample_dump();
    let store = Arc::new(MemoryStore::new());

    let summary = restore_dump(DumpRestoreOptions::new(connect(&store), dump.path()))
        .await
        .unwrap();

    assert_eq!(summary.inserted, 6);
    let names: Vec<&str> = summary.branches.iter().map(|b| b.name.as_str()).collect();
    assert_eq!(names, vec!["dbA", "dbB"]);
    assert_eq!(store.documents("dbA", "users").unwrap(), users());
    assert_eq!(store.documents("dbA", "orders").unwrap(), orders());
    assert_eq!(store.documents("dbB", "items").unwrap(), items());
    assert!(store.documents("dbA", "orders.metadata").is_none());

    let err = restore_dump(DumpRestoreOptions::new(connect(&store), dump.path()))
        .await
        .unwrap_err();

    let mut colliding = err.all_colliding_collections();
    colliding.sort();
    assert_eq!(colliding, vec!["dbA.orders", "dbA.users", "dbB.items"]);
    match err {
        RestoreError::Branches {
            succeeded,
            failures,
            ..
        } => {
            assert!(succeeded.is_empty());
            assert_eq!(failures.len(), 2);
            for failure in &failures {
                assert!(failure.error.colliding_collections().is_some());
            }
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert_eq!(store.documents("dbA", "users").unwrap(), users());
    assert_eq!(store.documents("dbB", "items").unwrap(), items());
    assert!(!store.is_closed());
}

#[tokio::test]
async fn test_dump_restore_with_overwrite_is_idempotent() {
    let dump = sample_dump();
    let store = Arc::new(MemoryStore::new());
    let options = || {
        let mut options = DumpRestoreOptions::new(connect(&store), dump.path());
        options.policy.on_collection_exists = OnCollectionExists::Overwrite;
        options
    };

    restore_dump(options()).await.unwrap();
    let first = store.documents("dbA", "users").unwrap();
    restore_dump(options()).await.unwrap();
    let second = store.documents("dbA", "users").unwrap();

    assert_eq!(first, users());
    assert_eq!(first, second);
    assert_eq!(store.documents("dbB", "items").unwrap(), items());
}

#[tokio::test]
async fn test_dump_transform_observes_database_name() {
    let dump = sample_dump();
    let store = Arc::new(MemoryStore::new());

    let options = DumpRestoreOptions::new(connect(&store), dump.path()).with_transform(|mut d, context| {
        d.insert("db", context.database.clone());
        d
    });

    restore_dump(options).await.unwrap();

    for d in store.documents("dbA", "orders").unwrap() {
        assert_eq!(d.get_str("db").unwrap(), "dbA");
    }
    for d in store.documents("dbB", "items").unwrap() {
        assert_eq!(d.get_str("db").unwrap(), "dbB");
    }
}

#[tokio::test]
async fn test_dump_archive_is_extracted_and_restored() {
    use flate2::Compression;
    use flate2::write::GzEncoder;

    let dump = sample_dump();
    let out = TempDir::new().unwrap();
    let archive_path = out.path().join("dump.tar.gz");
    let encoder = GzEncoder::new(fs::File::create(&archive_path).unwrap(), Compression::default());
    let mut builder = tar::Builder::new(encoder);
    builder.append_dir_all("dump", dump.path()).unwrap();
    builder.into_inner().unwrap().finish().unwrap();

    let store = Arc::new(MemoryStore::new());
    let mut options = ArchiveRestoreOptions::new(connect(&store), &archive_path);
    options.dump_root = Some("dump".into());

    let summary = restore_dump_archive(options).await.unwrap();

    assert_eq!(summary.inserted, 6);
    assert_eq!(store.documents("dbB", "items").unwrap(), items());
}

#[tokio::test]
async fn test_invalid_options_fail_before_any_io() {
    let store = Arc::new(MemoryStore::new());

    let err = restore_buffer(BufferRestoreOptions::new(connect(&store), "", "users", encode(&users())))
        .await
        .unwrap_err();
    assert!(matches!(err, RestoreError::Config(_)));

    let err = restore_dump(DumpRestoreOptions::new(ConnectionSource::uri(""), "dump"))
        .await
        .unwrap_err();
    assert!(matches!(err, RestoreError::Config(_)));

    assert_eq!(store.bulk_insert_calls(), 0);
    assert!(store.collection_names("app").is_empty());
}
