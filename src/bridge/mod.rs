//! The trust boundary between the privileged vault process and the UI.
//!
//! `VaultBridge` exposes exactly five operations — `unlock`, `lock`,
//! `is_unlocked`, `encrypt`, `decrypt` — and nothing else.  Results cross
//! the boundary as `BridgeReply` envelopes (`{success, data?, error?}`)
//! rather than as error types, so the UI can render failures without ever
//! receiving anything resembling a stack trace or key material.
//!
//! The guard sits behind a mutex: crypto operations serialize against
//! `lock()`, so a decrypt in flight either finishes with the pre-lock key
//! or fails with the locked error — never a torn key.  Password arguments
//! are borrowed for the duration of the call and not retained.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde::Serialize;

use crate::crypto::envelope::CipherEnvelope;
use crate::errors::VaultError;
use crate::vault::guard::VaultGuard;

/// The reply envelope every bridge operation returns.
#[derive(Debug, Clone, Serialize)]
pub struct BridgeReply {
    pub success: bool,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl BridgeReply {
    fn ok(data: serde_json::Value) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    fn ok_empty() -> Self {
        Self {
            success: true,
            data: None,
            error: None,
        }
    }

    fn failure(err: &VaultError) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(err.to_string()),
        }
    }
}

/// The only channel through which the untrusted side may drive the vault.
#[derive(Clone)]
pub struct VaultBridge {
    guard: Arc<Mutex<VaultGuard>>,
}

impl VaultBridge {
    pub fn new() -> Self {
        Self {
            guard: Arc::new(Mutex::new(VaultGuard::new())),
        }
    }

    /// Derive the master key and unlock the vault.
    pub fn unlock(&self, password: &str, salt: &str) -> BridgeReply {
        match self.lock_guard().unlock(password, salt) {
            Ok(()) => BridgeReply::ok_empty(),
            Err(err) => BridgeReply::failure(&err),
        }
    }

    /// Lock the vault, clearing the key from memory.
    pub fn lock(&self) -> BridgeReply {
        self.lock_guard().lock();
        BridgeReply::ok_empty()
    }

    /// Report whether the vault is currently unlocked.
    pub fn is_unlocked(&self) -> BridgeReply {
        let unlocked = self.lock_guard().is_unlocked();
        BridgeReply::ok(serde_json::Value::Bool(unlocked))
    }

    /// Encrypt an arbitrary JSON value; the reply carries the envelope.
    pub fn encrypt(&self, plaintext: &serde_json::Value) -> BridgeReply {
        let result = self
            .lock_guard()
            .encrypt_value(plaintext)
            .and_then(|envelope| envelope.to_json_value());
        match result {
            Ok(envelope) => BridgeReply::ok(envelope),
            Err(err) => BridgeReply::failure(&err),
        }
    }

    /// Decrypt an envelope (as JSON); the reply carries the plaintext.
    pub fn decrypt(&self, envelope: &serde_json::Value) -> BridgeReply {
        let result = CipherEnvelope::from_json_value(envelope)
            .and_then(|env| self.lock_guard().decrypt_value::<serde_json::Value>(&env));
        match result {
            Ok(plaintext) => BridgeReply::ok(plaintext),
            Err(err) => BridgeReply::failure(&err),
        }
    }

    /// Run a closure against the guard while holding the serialization
    /// lock.  Crate-private: the privileged-side protocols (sync,
    /// transfer import) use this; the UI surface is the five operations
    /// above.
    pub(crate) fn with_guard<R>(&self, f: impl FnOnce(&mut VaultGuard) -> R) -> R {
        let mut guard = self.lock_guard();
        f(&mut guard)
    }

    fn lock_guard(&self) -> MutexGuard<'_, VaultGuard> {
        // A poisoned mutex still holds a coherent guard (the state enum
        // can never be observed half-written); recover it.
        self.guard.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for VaultBridge {
    fn default() -> Self {
        Self::new()
    }
}
