//! Cryptographic engine for PassVault.
//!
//! This module provides:
//! - AES-256-CBC encryption of structured data with versioned envelopes
//!   and a legacy decrypt-only fallback (`codec`, `envelope`)
//! - PBKDF2-HMAC-SHA256 master-key derivation (`kdf`)
//! - The zeroize-on-drop master key wrapper (`keys`)
//! - Server-facing master-password hashing (`hash`)

pub mod codec;
pub mod envelope;
pub mod hash;
pub mod kdf;
pub mod keys;

// Re-export the most commonly used items so callers can write:
//   use crate::crypto::{encrypt, decrypt, derive_master_key, ...};
pub use codec::{decrypt, encrypt};
pub use envelope::{CipherEnvelope, FORMAT_VERSION, IV_LEN};
pub use hash::{master_password_hash, verify_master_password_hash};
pub use kdf::{derive_master_key, derive_master_key_with_iterations, generate_salt};
pub use keys::MasterKey;
