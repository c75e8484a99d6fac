//! Integration tests for the vault guard, items, and record store.

use chrono::Utc;
use passvault::errors::VaultError;
use passvault::vault::{
    decrypt_all, decrypt_record, EncryptedRecord, MemoryStore, NoteItem, PasswordItem, RecordKind,
    RecordStore, VaultGuard, VaultItem,
};

fn sample_password() -> VaultItem {
    VaultItem::Password(PasswordItem {
        title: "Gmail".to_string(),
        site: "mail.google.com".to_string(),
        login: "alice".to_string(),
        password: "s3cret!".to_string(),
        item_type: "Website".to_string(),
    })
}

fn sample_note() -> VaultItem {
    VaultItem::Note(NoteItem {
        title: "Recovery codes".to_string(),
        item_type: "Note".to_string(),
        content: "1111 2222 3333".to_string(),
    })
}

// ---------------------------------------------------------------------------
// Lock state machine
// ---------------------------------------------------------------------------

#[test]
fn guard_starts_locked() {
    let guard = VaultGuard::new();
    assert!(!guard.is_unlocked());

    let result = guard.encrypt_value(&serde_json::json!("x"));
    assert!(matches!(result, Err(VaultError::VaultLocked)));
}

#[test]
fn unlock_then_lock_transitions() {
    let mut guard = VaultGuard::new();

    guard.unlock("Correct1!", "abc").expect("unlock");
    assert!(guard.is_unlocked());

    guard.lock();
    assert!(!guard.is_unlocked());

    // Locking again is a harmless no-op.
    guard.lock();
    assert!(!guard.is_unlocked());
}

#[test]
fn operations_fail_closed_after_lock() {
    let mut guard = VaultGuard::new();
    guard.unlock("pw", "salt").expect("unlock");

    let envelope = guard
        .encrypt_value(&serde_json::json!({"k": "v"}))
        .expect("encrypt");

    guard.lock();

    let result: Result<serde_json::Value, _> = guard.decrypt_value(&envelope);
    assert!(matches!(result, Err(VaultError::VaultLocked)));
}

#[test]
fn lock_unlock_roundtrip_recovers_data() {
    // Unlock, encrypt, lock, unlock with the same credentials, decrypt.
    let mut guard = VaultGuard::new();
    guard.unlock("Correct1!", "abc").expect("first unlock");

    let envelope = guard
        .encrypt_value(&serde_json::json!({"title": "Gmail"}))
        .expect("encrypt");

    guard.lock();
    guard.unlock("Correct1!", "abc").expect("second unlock");

    let recovered: serde_json::Value = guard.decrypt_value(&envelope).expect("decrypt");
    assert_eq!(recovered, serde_json::json!({"title": "Gmail"}));
}

#[test]
fn wrong_password_unlocks_but_cannot_decrypt() {
    // Unlock never validates the password; the mistake surfaces at
    // decrypt time as DecryptionFailed, not before.
    let mut guard = VaultGuard::new();
    guard.unlock("right-password", "abc").expect("unlock");
    let envelope = guard.encrypt_value(&serde_json::json!("data")).expect("encrypt");

    guard.lock();
    guard.unlock("wrong-password", "abc").expect("unlock still succeeds");
    assert!(guard.is_unlocked());

    let result: Result<serde_json::Value, _> = guard.decrypt_value(&envelope);
    assert!(matches!(result, Err(VaultError::DecryptionFailed)));
}

#[test]
fn reunlock_replaces_the_key() {
    let mut guard = VaultGuard::new();
    guard.unlock("pw-one", "salt").expect("unlock 1");
    let envelope = guard.encrypt_value(&serde_json::json!(1)).expect("encrypt");

    // Unlock again without locking first: the key is re-derived.
    guard.unlock("pw-two", "salt").expect("unlock 2");
    let result: Result<serde_json::Value, _> = guard.decrypt_value(&envelope);
    assert!(matches!(result, Err(VaultError::DecryptionFailed)));
}

// ---------------------------------------------------------------------------
// Field-wise item encryption
// ---------------------------------------------------------------------------

#[test]
fn password_items_encrypt_one_envelope_per_field() {
    let mut guard = VaultGuard::new();
    guard.unlock("pw", "salt").expect("unlock");

    let record =
        EncryptedRecord::encrypt(&guard, "p1", &sample_password(), Utc::now()).expect("encrypt");

    assert_eq!(record.kind, RecordKind::Password);
    assert_eq!(record.fields.len(), 5, "title, site, login, password, type");
    assert!(record.needs_sync(), "fresh records have no sync cursor");

    let item = decrypt_record(&guard, &record).expect("decrypt");
    assert_eq!(item, sample_password());
}

#[test]
fn note_items_roundtrip() {
    let mut guard = VaultGuard::new();
    guard.unlock("pw", "salt").expect("unlock");

    let record = EncryptedRecord::encrypt(&guard, "n1", &sample_note(), Utc::now()).expect("encrypt");
    assert_eq!(record.fields.len(), 3, "title, type, content");

    let item = decrypt_record(&guard, &record).expect("decrypt");
    assert_eq!(item, sample_note());
}

#[test]
fn bulk_decrypt_survives_a_corrupted_record() {
    let mut guard = VaultGuard::new();
    guard.unlock("pw", "salt").expect("unlock");

    let good1 = EncryptedRecord::encrypt(&guard, "a", &sample_password(), Utc::now()).expect("a");
    let good2 = EncryptedRecord::encrypt(&guard, "b", &sample_note(), Utc::now()).expect("b");

    // A record written under a different key cannot be decrypted here.
    let mut foreign_guard = VaultGuard::new();
    foreign_guard.unlock("other-pw", "salt").expect("unlock");
    let bad =
        EncryptedRecord::encrypt(&foreign_guard, "c", &sample_note(), Utc::now()).expect("c");

    let outcome = decrypt_all(&guard, &[good1, bad, good2]);

    assert_eq!(outcome.failed, 1, "one record fails, the load continues");
    assert_eq!(outcome.items.len(), 2);
    let ids: Vec<&str> = outcome.items.iter().map(|(id, _)| id.as_str()).collect();
    assert_eq!(ids, vec!["a", "b"]);
}

// ---------------------------------------------------------------------------
// Record store
// ---------------------------------------------------------------------------

#[test]
fn store_lists_by_kind_sorted() {
    let mut guard = VaultGuard::new();
    guard.unlock("pw", "salt").expect("unlock");

    let mut store = MemoryStore::new();
    store.upsert(EncryptedRecord::encrypt(&guard, "z", &sample_note(), Utc::now()).unwrap());
    store.upsert(EncryptedRecord::encrypt(&guard, "a", &sample_note(), Utc::now()).unwrap());
    store.upsert(EncryptedRecord::encrypt(&guard, "m", &sample_password(), Utc::now()).unwrap());

    let notes = store.list(RecordKind::Note);
    let ids: Vec<&str> = notes.iter().map(|r| r.id.as_str()).collect();
    assert_eq!(ids, vec!["a", "z"]);

    assert_eq!(store.list(RecordKind::Password).len(), 1);
}

#[test]
fn mark_synced_clears_the_unsynced_set() {
    let mut guard = VaultGuard::new();
    guard.unlock("pw", "salt").expect("unlock");

    let mut store = MemoryStore::new();
    store.upsert(EncryptedRecord::encrypt(&guard, "n1", &sample_note(), Utc::now()).unwrap());
    assert_eq!(store.unsynced(RecordKind::Note).len(), 1);

    store.mark_synced("n1", "remote-9", Utc::now());
    assert!(store.unsynced(RecordKind::Note).is_empty());

    let record = store.get("n1").expect("record");
    assert_eq!(record.remote_id.as_deref(), Some("remote-9"));
    assert_eq!(
        store
            .find_by_remote_id(RecordKind::Note, "remote-9")
            .map(|r| r.id),
        Some("n1".to_string())
    );
}
