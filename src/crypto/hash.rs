//! Master-password hashing for server-side authentication.
//!
//! The servers never see the master password or the derived key — they
//! see a single SHA-256 digest, used purely as an authentication
//! credential.  The digest and the PBKDF2-derived key are independent:
//! knowing the hash does not help recover the vault key.

use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;

/// Compute the hex-encoded SHA-256 digest of the master password.
///
/// This is the `passwordHash` value sent to `/auth/login` and the
/// `remote-proxy` auth endpoints.
pub fn master_password_hash(password: &str) -> String {
    let digest = Sha256::digest(password.as_bytes());
    hex::encode(digest)
}

/// Compare a candidate password against a known hash in constant time.
///
/// Used when importing a transfer snapshot: the receiving device verifies
/// the user typed the originating master password before re-wrapping any
/// ciphertext under the new key.
pub fn verify_master_password_hash(password: &str, expected_hash: &str) -> bool {
    let candidate = master_password_hash(password);
    candidate.as_bytes().ct_eq(expected_hash.as_bytes()).into()
}
