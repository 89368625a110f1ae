//! Integration tests: the credential survives a "reload" when file-backed.

use std::sync::Arc;

use warden_store::{FileStore, KeyValueStore, LoginGrant, TokenStore};

fn open(path: &std::path::Path) -> TokenStore {
    TokenStore::new(Arc::new(FileStore::open(path).expect("open store")))
}

#[test]
fn test_login_survives_reload() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("credential.json");

    open(&path)
        .persist_login(&LoginGrant {
            access_token: "h.p.s".into(),
            role: Some("employee".into()),
        })
        .unwrap();

    let reloaded = open(&path);
    assert_eq!(reloaded.get().as_deref(), Some("h.p.s"));
    assert_eq!(reloaded.role().as_deref(), Some("employee"));
}

#[test]
fn test_clear_survives_reload() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("credential.json");
    let store = open(&path);
    store.set_token("h.p.s").unwrap();
    store.set_role("admin").unwrap();

    store.clear().unwrap();

    let reloaded = open(&path);
    assert_eq!(reloaded.get(), None);
    assert_eq!(reloaded.role(), None);
}

#[test]
fn test_legacy_key_written_by_older_client_is_readable() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("credential.json");
    std::fs::write(&path, r#"{"token": "legacy.p.s", "role": "admin"}"#).unwrap();

    let store = open(&path);

    assert_eq!(store.get().as_deref(), Some("legacy.p.s"));

    // Writing a new token goes to the primary key only.
    store.set_token("new.p.s").unwrap();
    let raw = FileStore::open(&path).unwrap();
    assert_eq!(raw.get("token").unwrap().as_deref(), Some("legacy.p.s"));
    assert_eq!(raw.get("access_token").unwrap().as_deref(), Some("new.p.s"));
}
