//! Integration tests for the file keystore

mod common;

use ::common::atsign::AtSign;
use ::common::keystore::{FileKeyStore, KeyStore, KeyStoreError};
use crate::common::test_keys;
use tempfile::TempDir;

#[test]
fn test_save_then_load() {
    let dir = TempDir::new().unwrap();
    let store = FileKeyStore::new(dir.path().join("keys"));
    let alice = AtSign::new("alice");
    let keys = test_keys();

    let path = store.save(&alice, &keys).unwrap();
    assert!(path.ends_with("@alice_key.atKeys"));

    let loaded = store.load(&alice).unwrap();
    assert_eq!(loaded.pkam_public_key, keys.pkam_public_key);
    assert_eq!(loaded.pkam_private_key, keys.pkam_private_key);
    assert_eq!(loaded.encryption_public_key, keys.encryption_public_key);
    assert_eq!(loaded.encryption_private_key, keys.encryption_private_key);
    assert_eq!(loaded.self_encryption_key, keys.self_encryption_key);
}

#[test]
fn test_rsa_keys_are_not_stored_in_the_clear() {
    let dir = TempDir::new().unwrap();
    let store = FileKeyStore::new(dir.path());
    let alice = AtSign::new("alice");
    let keys = test_keys();
    let path = store.save(&alice, &keys).unwrap();

    let json: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(path).unwrap()).unwrap();
    assert_ne!(
        json["aesPkamPrivateKey"].as_str().unwrap(),
        keys.pkam_private_key.to_base64().unwrap()
    );
    assert_eq!(
        json["selfEncryptionKey"].as_str().unwrap(),
        keys.self_encryption_key.to_base64()
    );
}

#[test]
fn test_missing_file_is_not_found() {
    let dir = TempDir::new().unwrap();
    let store = FileKeyStore::new(dir.path());

    match store.load(&AtSign::new("nobody")) {
        Err(KeyStoreError::NotFound { atsign, .. }) => assert_eq!(atsign.as_str(), "@nobody"),
        other => panic!("expected NotFound, got {:?}", other.map(|_| ())),
    }
}

#[test]
fn test_wrong_self_key_rejected() {
    let dir = TempDir::new().unwrap();
    let store = FileKeyStore::new(dir.path());
    let alice = AtSign::new("alice");
    let path = store.save(&alice, &test_keys()).unwrap();

    let mut json: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
    json["selfEncryptionKey"] =
        serde_json::Value::String(::common::crypto::AesKey::generate().to_base64());
    std::fs::write(&path, json.to_string()).unwrap();

    assert!(matches!(
        store.load(&alice),
        Err(KeyStoreError::Key { .. })
    ));
}

#[test]
fn test_malformed_file_rejected() {
    let dir = TempDir::new().unwrap();
    let store = FileKeyStore::new(dir.path());
    let alice = AtSign::new("alice");
    std::fs::write(store.path_for(&alice), "{\"selfEncryptionKey\": \"x\"}").unwrap();

    assert!(matches!(store.load(&alice), Err(KeyStoreError::Format(_))));
}

#[test]
fn test_fallback_directory_searched_after_primary() {
    let dir = TempDir::new().unwrap();
    let legacy = FileKeyStore::new(dir.path().join("legacy"));
    let alice = AtSign::new("alice");
    let keys = test_keys();
    let legacy_path = legacy.save(&alice, &keys).unwrap();

    let store = FileKeyStore::new(dir.path().join("primary")).with_fallback(legacy.dir());
    assert_eq!(store.locate(&alice), Some(legacy_path));
    let loaded = store.load(&alice).unwrap();
    assert_eq!(loaded.pkam_public_key, keys.pkam_public_key);

    // a file in the primary directory wins
    let primary_keys = test_keys();
    let primary_path = store.save(&alice, &primary_keys).unwrap();
    assert_eq!(store.locate(&alice), Some(primary_path));
    assert_eq!(
        store.load(&alice).unwrap().pkam_public_key,
        primary_keys.pkam_public_key
    );

    // NotFound names the primary location
    match store.load(&AtSign::new("bob")) {
        Err(KeyStoreError::NotFound { path, .. }) => assert_eq!(path, store.path_for(&AtSign::new("bob"))),
        other => panic!("expected NotFound, got {:?}", other.map(|_| ())),
    }
}
