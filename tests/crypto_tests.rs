//! Integration tests for the PassVault crypto engine.

use passvault::crypto::{
    decrypt, derive_master_key, derive_master_key_with_iterations, encrypt, generate_salt,
    master_password_hash, verify_master_password_hash, CipherEnvelope,
};
use passvault::errors::VaultError;

// ---------------------------------------------------------------------------
// Encryption round-trip
// ---------------------------------------------------------------------------

#[test]
fn encrypt_decrypt_roundtrip() {
    let key = derive_master_key("hunter2", "some-salt").expect("derive");
    let plaintext = serde_json::json!({"title": "Gmail", "login": "alice"});

    let envelope = encrypt(&key, &plaintext).expect("encrypt should succeed");
    let recovered: serde_json::Value = decrypt(&key, &envelope).expect("decrypt should succeed");

    assert_eq!(recovered, plaintext);
}

#[test]
fn encrypt_produces_different_ciphertext_each_time() {
    let key = derive_master_key("hunter2", "some-salt").expect("derive");
    let plaintext = serde_json::json!("the same value");

    let env1 = encrypt(&key, &plaintext).expect("encrypt 1");
    let env2 = encrypt(&key, &plaintext).expect("encrypt 2");

    // Because each call generates a new random IV, the envelopes differ.
    assert_ne!(
        env1, env2,
        "two encryptions of the same plaintext must differ"
    );
}

#[test]
fn new_envelopes_are_versioned() {
    let key = derive_master_key("hunter2", "some-salt").expect("derive");
    let envelope = encrypt(&key, &serde_json::json!("x")).expect("encrypt");

    assert!(!envelope.is_legacy());

    // And the serialized wire shape carries the version marker + IV.
    let wire = serde_json::to_value(&envelope).expect("serialize");
    assert_eq!(wire["version"], 2);
    assert_eq!(wire["iv"].as_str().expect("iv is hex").len(), 32);
}

#[test]
fn decrypt_with_wrong_key_fails() {
    let key = derive_master_key("correct-password", "salt").expect("derive");
    let wrong = derive_master_key("wrong-password", "salt").expect("derive");

    let envelope = encrypt(&key, &serde_json::json!({"secret": 42})).expect("encrypt");
    let result: Result<serde_json::Value, _> = decrypt(&wrong, &envelope);

    assert!(
        matches!(result, Err(VaultError::DecryptionFailed)),
        "decryption with the wrong key must fail with DecryptionFailed"
    );
}

#[test]
fn decrypt_with_corrupted_ciphertext_fails() {
    let key = derive_master_key("pw", "salt").expect("derive");
    let envelope = encrypt(&key, &serde_json::json!({"a": "b"})).expect("encrypt");

    let corrupted = match envelope {
        CipherEnvelope::Versioned { mut ciphertext, iv } => {
            ciphertext[0] ^= 0xFF;
            CipherEnvelope::Versioned { ciphertext, iv }
        }
        other => other,
    };

    let result: Result<serde_json::Value, _> = decrypt(&key, &corrupted);
    assert!(result.is_err(), "corrupted ciphertext must fail to decrypt");
}

// ---------------------------------------------------------------------------
// Key derivation (PBKDF2)
// ---------------------------------------------------------------------------

#[test]
fn same_inputs_derive_the_same_key() {
    // The key type exposes no bytes, so determinism is observed through
    // ciphertext: a key derived twice must decrypt its own output.
    let key1 = derive_master_key("my-passphrase", "abc").expect("derive 1");
    let key2 = derive_master_key("my-passphrase", "abc").expect("derive 2");

    let envelope = encrypt(&key1, &serde_json::json!("payload")).expect("encrypt");
    let recovered: String = decrypt(&key2, &envelope).expect("re-derived key must decrypt");
    assert_eq!(recovered, "payload");
}

#[test]
fn different_salts_derive_different_keys() {
    let key1 = derive_master_key("same-password", "salt-one").expect("derive 1");
    let key2 = derive_master_key("same-password", "salt-two").expect("derive 2");

    let envelope = encrypt(&key1, &serde_json::json!("payload")).expect("encrypt");
    let result: Result<String, _> = decrypt(&key2, &envelope);
    assert!(result.is_err(), "different salts must produce different keys");
}

#[test]
fn weak_iteration_counts_are_rejected() {
    let result = derive_master_key_with_iterations("pw", "salt", 1_000);
    assert!(matches!(result, Err(VaultError::KeyDerivationFailed(_))));
}

#[test]
fn empty_salt_is_rejected() {
    let result = derive_master_key("pw", "");
    assert!(matches!(result, Err(VaultError::KeyDerivationFailed(_))));
}

#[test]
fn generated_salts_are_hex_and_unique() {
    let salt1 = generate_salt();
    let salt2 = generate_salt();

    assert_eq!(salt1.len(), 64, "32 bytes hex-encoded");
    assert!(salt1.bytes().all(|b| b.is_ascii_hexdigit()));
    assert_ne!(salt1, salt2);
}

// ---------------------------------------------------------------------------
// Master-password hash
// ---------------------------------------------------------------------------

#[test]
fn password_hash_matches_known_vector() {
    // SHA-256 of the empty string.
    assert_eq!(
        master_password_hash(""),
        "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
    );
}

#[test]
fn password_hash_verification() {
    let hash = master_password_hash("Correct1!");
    assert!(verify_master_password_hash("Correct1!", &hash));
    assert!(!verify_master_password_hash("correct1!", &hash));
}

// ---------------------------------------------------------------------------
// Envelope wire format
// ---------------------------------------------------------------------------

#[test]
fn malformed_envelopes_are_rejected() {
    // version present but IV missing
    let bad = serde_json::json!({"data": "00ff", "version": 2});
    assert!(CipherEnvelope::from_json_value(&bad).is_err());

    // unknown version
    let bad = serde_json::json!({
        "data": "00ff",
        "iv": "00000000000000000000000000000000",
        "version": 9
    });
    assert!(CipherEnvelope::from_json_value(&bad).is_err());

    // not an envelope at all
    let bad = serde_json::json!({"unrelated": true});
    assert!(CipherEnvelope::from_json_value(&bad).is_err());
}

#[test]
fn legacy_shapes_decode_as_legacy() {
    let bare = serde_json::json!("00ffaa");
    let envelope = CipherEnvelope::from_json_value(&bare).expect("bare string decodes");
    assert!(envelope.is_legacy());

    let object = serde_json::json!({"data": "00ffaa"});
    let envelope = CipherEnvelope::from_json_value(&object).expect("marker-less object decodes");
    assert!(envelope.is_legacy());
}
