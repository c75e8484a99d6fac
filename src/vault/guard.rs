//! The vault lock state machine.
//!
//! `VaultGuard` is the single owner of the in-memory master key and the
//! single enforcement point of the fail-closed invariant: every crypto
//! operation checks the lock state first, and no caller ever sees or
//! holds the key itself.
//!
//! The guard is not internally synchronized — the bridge wraps it in a
//! mutex so that crypto operations serialize against `lock()`.  An
//! in-flight decrypt therefore either completes with the pre-lock key or
//! observes `Locked` and fails, never a torn key.

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::crypto::envelope::CipherEnvelope;
use crate::crypto::kdf::derive_master_key;
use crate::crypto::keys::MasterKey;
use crate::crypto::{codec, hash};
use crate::errors::{Result, VaultError};

/// Lock state of the vault.  Holding the key inside the `Unlocked`
/// variant makes "unlocked without a key" unrepresentable, and replacing
/// the state drops (and thereby zeroizes) the previous key.
enum VaultState {
    Locked,
    Unlocked { key: MasterKey },
}

/// Owner of the master key; one per process.
pub struct VaultGuard {
    state: VaultState,
}

impl VaultGuard {
    /// Create a guard in the `Locked` state.
    pub fn new() -> Self {
        Self {
            state: VaultState::Locked,
        }
    }

    /// Derive the master key from the password and salt and unlock.
    ///
    /// Safe to call while already unlocked: the key is re-derived and
    /// replaces the old one.  The password is never validated here — a
    /// wrong password yields a wrong key, and the mistake surfaces as
    /// `DecryptionFailed` on the first decrypt.
    pub fn unlock(&mut self, password: &str, salt: &str) -> Result<()> {
        let key = derive_master_key(password, salt)?;
        self.state = VaultState::Unlocked { key };
        tracing::info!("vault unlocked");
        Ok(())
    }

    /// Drop the master key and return to `Locked`.
    ///
    /// No-op when already locked.  Called on explicit user lock,
    /// application shutdown, and logout.
    pub fn lock(&mut self) {
        if matches!(self.state, VaultState::Unlocked { .. }) {
            // Replacing the state drops the MasterKey, which zeroizes
            // the key bytes.
            self.state = VaultState::Locked;
            tracing::info!("vault locked, key cleared from memory");
        }
    }

    /// `true` iff the vault is unlocked and a key is present.
    pub fn is_unlocked(&self) -> bool {
        matches!(self.state, VaultState::Unlocked { .. })
    }

    /// Encrypt a value under the held key.
    ///
    /// Fails with `VaultLocked` when no key is present.
    pub fn encrypt_value<T: Serialize>(&self, value: &T) -> Result<CipherEnvelope> {
        codec::encrypt(self.key()?, value)
    }

    /// Decrypt an envelope with the held key.
    ///
    /// Fails with `VaultLocked` when no key is present.
    pub fn decrypt_value<T: DeserializeOwned>(&self, envelope: &CipherEnvelope) -> Result<T> {
        codec::decrypt(self.key()?, envelope)
    }

    /// Verify a candidate master password against a known server-side
    /// hash, in constant time.  Used by the transfer-import flow; does
    /// not require (or change) the lock state.
    pub fn verify_password(&self, password: &str, expected_hash: &str) -> bool {
        hash::verify_master_password_hash(password, expected_hash)
    }

    fn key(&self) -> Result<&MasterKey> {
        match &self.state {
            VaultState::Unlocked { key } => Ok(key),
            VaultState::Locked => Err(VaultError::VaultLocked),
        }
    }
}

impl Default for VaultGuard {
    fn default() -> Self {
        Self::new()
    }
}
