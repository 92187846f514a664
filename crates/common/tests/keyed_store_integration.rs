//! Integration tests for keyed storage shared between namespaces.

#![cfg(feature = "runtime")]

use std::sync::Arc;
use std::time::Duration;

use marginalia_common::{KeyedStore, MemoryBackend, MockClock, StorageBackend, StorageError};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct Shelf {
    id: String,
    titles: Vec<String>,
}

/// Two stores on one medium never see each other's keys
#[test]
fn namespaces_are_isolated_on_a_shared_backend() -> anyhow::Result<()> {
    let backend = Arc::new(MemoryBackend::new());
    let reader = KeyedStore::new(backend.clone(), "reader:");
    let settings = KeyedStore::new(backend.clone(), "settings:");

    reader.set("token", "reader-token", None)?;
    settings.set("token", "settings-token", None)?;

    assert_eq!(reader.get::<String>("token").as_deref(), Some("reader-token"));
    assert_eq!(settings.get::<String>("token").as_deref(), Some("settings-token"));

    reader.clear()?;
    assert!(reader.get::<String>("token").is_none());
    assert_eq!(settings.get::<String>("token").as_deref(), Some("settings-token"));
    assert_eq!(backend.keys()?, vec!["settings:token".to_string()]);
    Ok(())
}

/// Structured values survive a round trip and expire lazily per key
#[test]
fn structured_values_expire_independently() -> anyhow::Result<()> {
    let clock = MockClock::at_epoch_millis(5_000);
    let store = KeyedStore::new(Arc::new(MemoryBackend::new()), "mg:")
        .with_clock(Arc::new(clock.clone()));

    let shelf = Shelf { id: "s1".into(), titles: vec!["Dune".into()] };
    store.set("cache:shelf", &shelf, Some(Duration::from_secs(60)))?;
    store.set("cache:profile", &"reader", Some(Duration::from_secs(600)))?;

    clock.advance(Duration::from_secs(61));

    assert_eq!(store.get::<Shelf>("cache:shelf"), None);
    assert_eq!(store.get::<String>("cache:profile").as_deref(), Some("reader"));
    assert_eq!(store.keys_with_prefix("cache:").len(), 1);
    Ok(())
}

/// A full device surfaces a write failure instead of silently dropping data
#[test]
fn quota_exhaustion_surfaces_write_failed() {
    let store = KeyedStore::new(Arc::new(MemoryBackend::with_quota(64)), "mg:");
    let big = "x".repeat(128);

    let err = store.set("note-draft", &big, None).unwrap_err();
    assert!(matches!(err, StorageError::WriteFailed { .. }));
    assert!(store.get::<String>("note-draft").is_none());
}
