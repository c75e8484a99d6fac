//! Integration tests for the trust-boundary bridge.

use passvault::VaultBridge;

// ---------------------------------------------------------------------------
// Reply envelopes
// ---------------------------------------------------------------------------

#[test]
fn replies_never_panic_across_the_boundary() {
    let bridge = VaultBridge::new();

    // Decrypting while locked is an error, but it must arrive as a
    // reply envelope, not a panic or a Result.
    let reply = bridge.decrypt(&serde_json::json!({
        "data": "00ff",
        "iv": "00000000000000000000000000000000",
        "version": 2
    }));

    assert!(!reply.success);
    assert!(reply.data.is_none());
    let error = reply.error.expect("error message present");
    assert!(error.contains("locked"), "got: {error}");
}

#[test]
fn success_replies_omit_the_error_field_on_the_wire() {
    let bridge = VaultBridge::new();
    let reply = bridge.is_unlocked();

    let wire = serde_json::to_value(&reply).expect("serialize reply");
    assert_eq!(wire["success"], true);
    assert_eq!(wire["data"], false);
    assert!(
        wire.get("error").is_none(),
        "error must be absent, not null"
    );
}

// ---------------------------------------------------------------------------
// The five operations
// ---------------------------------------------------------------------------

#[test]
fn unlock_encrypt_decrypt_flow() {
    let bridge = VaultBridge::new();

    assert!(bridge.unlock("Correct1!", "abc").success);
    assert_eq!(bridge.is_unlocked().data, Some(serde_json::json!(true)));

    let plaintext = serde_json::json!({"title": "Gmail"});
    let encrypted = bridge.encrypt(&plaintext);
    assert!(encrypted.success);

    let envelope = encrypted.data.expect("envelope data");
    assert_eq!(envelope["version"], 2, "bridge hands out opaque versioned envelopes");

    let decrypted = bridge.decrypt(&envelope);
    assert!(decrypted.success);
    assert_eq!(decrypted.data, Some(plaintext));
}

#[test]
fn unlock_failure_is_a_reply_not_an_error() {
    let bridge = VaultBridge::new();

    // Empty salt is rejected by derivation.
    let reply = bridge.unlock("pw", "");
    assert!(!reply.success);
    assert!(reply.error.is_some());
    assert_eq!(bridge.is_unlocked().data, Some(serde_json::json!(false)));
}

#[test]
fn lock_takes_effect_for_all_handles() {
    // Clones share the same guard: a lock through one handle is
    // immediately visible through every other.
    let bridge = VaultBridge::new();
    let ui_handle = bridge.clone();

    assert!(bridge.unlock("pw", "salt").success);
    assert_eq!(ui_handle.is_unlocked().data, Some(serde_json::json!(true)));

    let envelope = bridge
        .encrypt(&serde_json::json!("payload"))
        .data
        .expect("envelope");

    assert!(ui_handle.lock().success);

    // A decrypt issued after lock() returned must fail closed.
    let reply = bridge.decrypt(&envelope);
    assert!(!reply.success);
    assert_eq!(bridge.is_unlocked().data, Some(serde_json::json!(false)));
}

#[test]
fn malformed_envelopes_are_reported_not_thrown() {
    let bridge = VaultBridge::new();
    assert!(bridge.unlock("pw", "salt").success);

    let reply = bridge.decrypt(&serde_json::json!({"version": 2}));
    assert!(!reply.success);
    assert!(reply.error.is_some());
}

#[test]
fn replies_never_echo_the_password() {
    let bridge = VaultBridge::new();

    let reply = bridge.unlock("Hunter2-Sup3rSecret", "");
    assert!(!reply.success);
    let error = reply.error.expect("error");
    assert!(
        !error.contains("Hunter2-Sup3rSecret"),
        "error text must not leak the password: {error}"
    );
}
