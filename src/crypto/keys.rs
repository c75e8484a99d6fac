//! The master key wrapper.
//!
//! A `MasterKey` holds the single 256-bit symmetric key that protects a
//! vault.  Its raw bytes are readable only inside this crate: the UI side
//! of the trust boundary can hold handles that *use* the key (through
//! `VaultGuard`), but it has no way to read the key material itself.

use zeroize::Zeroize;

/// Length of the master key in bytes (256 bits, for AES-256).
pub const KEY_LEN: usize = 32;

/// A 32-byte master key that zeroes its memory when dropped.
///
/// The key exists only inside the privileged boundary; it is never
/// serialized, logged, or returned across the bridge.
#[derive(Zeroize)]
#[zeroize(drop)]
pub struct MasterKey {
    bytes: [u8; KEY_LEN],
}

impl MasterKey {
    /// Wrap raw key bytes.
    pub fn new(bytes: [u8; KEY_LEN]) -> Self {
        Self { bytes }
    }

    /// Access the raw key bytes.
    ///
    /// Crate-private on purpose: nothing outside the privileged modules
    /// may observe key material.
    pub(crate) fn as_bytes(&self) -> &[u8; KEY_LEN] {
        &self.bytes
    }
}

impl std::fmt::Debug for MasterKey {
    // Never print key bytes, even in debug output.
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("MasterKey(..)")
    }
}
