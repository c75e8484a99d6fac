//! Vault module — the privileged side of the trust boundary.
//!
//! This module provides:
//! - The lock state machine owning the master key (`guard`)
//! - Plaintext items and their field-wise encrypted records (`item`)
//! - The keyed record store boundary (`store`)

pub mod guard;
pub mod item;
pub mod store;

// Re-export the most commonly used items.
pub use guard::VaultGuard;
pub use item::{
    decrypt_all, decrypt_record, encrypt_fields, BulkDecrypt, EncryptedRecord, NoteItem,
    PasswordItem, RecordKind, VaultItem,
};
pub use store::{MemoryStore, RecordStore};
