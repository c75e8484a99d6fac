//! Password-based key derivation using PBKDF2-HMAC-SHA256.
//!
//! The same (password, salt) pair must always produce the same key — the
//! vault has to be openable again on re-login, and a vault transferred to
//! another device is re-opened with the salt carried in the transfer
//! payload.  Nothing here validates the password: a wrong password simply
//! yields a wrong key, which surfaces later as a decryption failure.

use pbkdf2::pbkdf2_hmac;
use rand::RngCore;
use sha2::Sha256;
use zeroize::Zeroize;

use crate::errors::{Result, VaultError};

use super::keys::{MasterKey, KEY_LEN};

/// Length of a generated salt in bytes (256 bits).
const SALT_LEN: usize = 32;

/// PBKDF2 iteration count used for every vault.
pub const PBKDF2_ITERATIONS: u32 = 100_000;

/// Derive a 32-byte master key from a password and salt.
///
/// Uses the fixed iteration count (`PBKDF2_ITERATIONS`).  The caller must
/// discard the password immediately after this returns.
pub fn derive_master_key(password: &str, salt: &str) -> Result<MasterKey> {
    derive_master_key_with_iterations(password, salt, PBKDF2_ITERATIONS)
}

/// Derive a 32-byte master key with an explicit iteration count.
///
/// Rejects counts below `PBKDF2_ITERATIONS` to prevent dangerously weak
/// KDF settings.
pub fn derive_master_key_with_iterations(
    password: &str,
    salt: &str,
    iterations: u32,
) -> Result<MasterKey> {
    if iterations < PBKDF2_ITERATIONS {
        return Err(VaultError::KeyDerivationFailed(format!(
            "iteration count must be at least {PBKDF2_ITERATIONS} (got {iterations})"
        )));
    }
    if salt.is_empty() {
        return Err(VaultError::KeyDerivationFailed("salt cannot be empty".into()));
    }

    let mut key = [0u8; KEY_LEN];
    pbkdf2_hmac::<Sha256>(password.as_bytes(), salt.as_bytes(), iterations, &mut key);

    let master = MasterKey::new(key);
    key.zeroize();
    Ok(master)
}

/// Generate a cryptographically random salt, hex-encoded.
///
/// The salt is stored alongside the account (it is not a secret) and is
/// what makes the derived key unique per vault.
pub fn generate_salt() -> String {
    let mut salt = [0u8; SALT_LEN];
    rand::rng().fill_bytes(&mut salt);
    hex::encode(salt)
}
