//! Adapter conformance: every store honors the same contract.

use std::thread;
use std::time::Duration;

use chrono::Utc;
use pretty_assertions::assert_eq;
use textmarker_engine::anchor::{AnchorPatch, HighlightAnchor};
use textmarker_engine::normalize_default;
use textmarker_storage::{
    ChannelStore, FileStore, HighlightStore, MemoryStore, StorageError, channel_store_pair,
};

fn anchor(raw: &str) -> HighlightAnchor {
    let now = Utc::now();
    HighlightAnchor {
        id: HighlightAnchor::generate_id(),
        raw_text: raw.to_string(),
        normalized_text: normalize_default(raw),
        prefix_context: "before ".into(),
        suffix_context: " after".into(),
        start_offset: 0,
        end_offset: normalize_default(raw).chars().count(),
        spans_multiple_nodes: false,
        color: Some("gold".into()),
        note: None,
        created_at: now,
        updated_at: now,
    }
}

/// Contract properties every adapter must satisfy.
fn conformance(store: &mut dyn HighlightStore) {
    assert!(store.load().unwrap().is_empty());

    // save then load returns the saved anchor
    let first = anchor("brown fox");
    let second = anchor("lazy dog");
    store.save(&first).unwrap();
    store.save(&second).unwrap();
    let loaded = store.load().unwrap();
    assert_eq!(loaded.len(), 2);
    assert!(loaded.contains(&first));
    assert!(loaded.contains(&second));

    // update merges fields and bumps updated_at
    let updated = store
        .update(
            &first.id,
            &AnchorPatch {
                color: Some("tomato".into()),
                note: Some("good one".into()),
            },
        )
        .unwrap();
    assert_eq!(updated.color.as_deref(), Some("tomato"));
    assert!(updated.updated_at >= first.updated_at);
    let reloaded = store.load().unwrap();
    let stored = reloaded.iter().find(|a| a.id == first.id).unwrap();
    assert_eq!(stored.note.as_deref(), Some("good one"));

    // unknown ids are not-found errors
    assert!(matches!(
        store.update("missing", &AnchorPatch::default()),
        Err(StorageError::NotFound(_))
    ));
    assert!(matches!(
        store.remove("missing"),
        Err(StorageError::NotFound(_))
    ));

    // malformed anchors are rejected without persisting
    let mut malformed = anchor("ok text");
    malformed.normalized_text = String::new();
    assert!(store.save(&malformed).is_err());
    assert_eq!(store.load().unwrap().len(), 2);

    // remove then load excludes the removed anchor
    store.remove(&second.id).unwrap();
    let after_remove = store.load().unwrap();
    assert_eq!(after_remove.len(), 1);
    assert!(!after_remove.iter().any(|a| a.id == second.id));

    // clear then load is empty
    store.clear().unwrap();
    assert!(store.load().unwrap().is_empty());
}

#[test]
fn test_memory_store_conformance() {
    let mut store = MemoryStore::new();
    conformance(&mut store);
}

#[test]
fn test_file_store_conformance() {
    let dir = tempfile::tempdir().unwrap();
    let mut store = FileStore::new(dir.path().join("highlights.json"), "doc-1");
    conformance(&mut store);
}

#[test]
fn test_channel_store_conformance() {
    let (mut store, server) = channel_store_pair(MemoryStore::new(), Duration::from_secs(5));
    let server_thread = thread::spawn(move || server.run());
    conformance(&mut store);
    drop(store);
    server_thread.join().unwrap();
}

#[test]
fn test_file_store_is_durable_across_instances() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("highlights.json");
    let saved = anchor("persistent passage");

    {
        let mut store = FileStore::new(&path, "doc-1");
        store.save(&saved).unwrap();
    }

    let mut reopened = FileStore::new(&path, "doc-1");
    assert_eq!(reopened.load().unwrap(), vec![saved]);
}

#[test]
fn test_file_store_namespaces_are_isolated() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("highlights.json");

    let mut doc1 = FileStore::new(&path, "doc-1");
    let mut doc2 = FileStore::new(&path, "doc-2");
    let a1 = anchor("first document");
    let a2 = anchor("second document");
    doc1.save(&a1).unwrap();
    doc2.save(&a2).unwrap();

    assert_eq!(doc1.load().unwrap(), vec![a1.clone()]);
    assert_eq!(doc2.load().unwrap(), vec![a2]);

    // Clearing one namespace leaves the other untouched.
    doc2.clear().unwrap();
    assert_eq!(doc1.load().unwrap(), vec![a1]);
    assert!(doc2.load().unwrap().is_empty());
}

#[test]
fn test_file_store_rejects_corrupt_content() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("highlights.json");
    std::fs::write(&path, "not json at all").unwrap();

    let mut store = FileStore::new(&path, "doc-1");
    assert!(matches!(store.load(), Err(StorageError::Corrupt(_))));
}

#[test]
fn test_channel_store_times_out_without_a_server() {
    // The server end exists but never processes requests.
    let (mut store, _idle_server) = channel_store_pair(MemoryStore::new(), Duration::from_millis(50));
    match store.load() {
        Err(StorageError::Timeout(elapsed)) => assert_eq!(elapsed, Duration::from_millis(50)),
        other => panic!("expected timeout, got {other:?}"),
    }
}

#[test]
fn test_channel_store_reports_disconnected_endpoint() {
    let (mut store, server) = channel_store_pair(MemoryStore::new(), Duration::from_millis(50));
    drop(server);
    assert!(matches!(store.load(), Err(StorageError::Transport(_))));
}

#[test]
fn test_channel_store_propagates_remote_not_found() {
    let (mut store, server) = channel_store_pair(MemoryStore::new(), Duration::from_secs(5));
    let server_thread = thread::spawn(move || server.run());
    assert!(matches!(
        store.remove("missing"),
        Err(StorageError::NotFound(_))
    ));
    drop(store);
    server_thread.join().unwrap();
}
