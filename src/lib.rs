//! PassVault core — a local-first encrypted vault for credentials and
//! notes.
//!
//! The crate is split along the trust boundary: `crypto` and `vault`
//! form the privileged side that owns the master key; `bridge` is the
//! five-operation surface the untrusted UI talks to; `sync` drives the
//! push/pull, account-linking, and device-transfer protocols against the
//! local and remote servers, moving only ciphertext envelopes.

pub mod bridge;
pub mod config;
pub mod crypto;
pub mod errors;
pub mod sync;
pub mod vault;

pub use bridge::{BridgeReply, VaultBridge};
pub use errors::{Result, VaultError};
