//! AES-256-CBC encryption and decryption of structured data.
//!
//! `encrypt` serializes the value to JSON, generates a fresh random
//! 16-byte IV, and always produces a versioned envelope.  `decrypt`
//! branches on the envelope variant:
//!
//! - versioned: decrypt with the embedded IV;
//! - legacy: derive key and IV deterministically from the master key the
//!   way OpenSSL's `EVP_BytesToKey` does (MD5, no salt) and log a
//!   downgrade warning.  No new legacy ciphertext is ever produced.
//!
//! A padding or JSON-parse failure maps to `DecryptionFailed` — this is
//! the only place a wrong master password ever becomes observable.

use aes::Aes256;
use cbc::cipher::block_padding::Pkcs7;
use cbc::cipher::{BlockDecryptMut, BlockEncryptMut, KeyIvInit};
use md5::{Digest, Md5};
use rand::RngCore;
use serde::de::DeserializeOwned;
use serde::Serialize;
use zeroize::Zeroize;

use crate::errors::{Result, VaultError};

use super::envelope::{CipherEnvelope, IV_LEN};
use super::keys::{MasterKey, KEY_LEN};

type Aes256CbcEnc = cbc::Encryptor<Aes256>;
type Aes256CbcDec = cbc::Decryptor<Aes256>;

/// Encrypt a serializable value under the master key.
///
/// Always returns a versioned envelope with a fresh random IV; two calls
/// with the same plaintext never produce the same ciphertext.
pub fn encrypt<T: Serialize>(key: &MasterKey, plaintext: &T) -> Result<CipherEnvelope> {
    let mut serialized = serde_json::to_vec(plaintext)
        .map_err(|e| VaultError::SerializationError(e.to_string()))?;

    let mut iv = [0u8; IV_LEN];
    rand::rng().fill_bytes(&mut iv);

    let ciphertext = Aes256CbcEnc::new(key.as_bytes().into(), &iv.into())
        .encrypt_padded_vec_mut::<Pkcs7>(&serialized);
    serialized.zeroize();

    Ok(CipherEnvelope::Versioned { ciphertext, iv })
}

/// Decrypt an envelope back into a value.
///
/// Fails with `DecryptionFailed` when the key is wrong or the ciphertext
/// was corrupted or tampered with.
pub fn decrypt<T: DeserializeOwned>(key: &MasterKey, envelope: &CipherEnvelope) -> Result<T> {
    let plaintext = match envelope {
        CipherEnvelope::Versioned { ciphertext, iv } => {
            Aes256CbcDec::new(key.as_bytes().into(), iv.into())
                .decrypt_padded_vec_mut::<Pkcs7>(ciphertext)
                .map_err(|_| VaultError::DecryptionFailed)?
        }
        CipherEnvelope::Legacy { ciphertext } => {
            tracing::warn!("decrypting legacy-format envelope without a stored IV");
            decrypt_legacy(key, ciphertext)?
        }
    };

    parse_plaintext(plaintext)
}

/// Deserialize decrypted bytes, zeroizing them on the way out.
fn parse_plaintext<T: DeserializeOwned>(mut plaintext: Vec<u8>) -> Result<T> {
    let value = serde_json::from_slice(&plaintext).map_err(|_| VaultError::DecryptionFailed);
    plaintext.zeroize();
    value
}

/// Decrypt the legacy fixed-IV-derivation format.
///
/// The old stack encrypted with a cipher keyed by `EVP_BytesToKey(MD5,
/// master_key)` — key and IV both derived from the master key, no salt,
/// no stored IV.  Weaker than the versioned scheme; preserved strictly
/// for reading pre-versioning vault data.
fn decrypt_legacy(key: &MasterKey, ciphertext: &[u8]) -> Result<Vec<u8>> {
    let (mut legacy_key, mut legacy_iv) = evp_bytes_to_key(key.as_bytes());

    let result = Aes256CbcDec::new((&legacy_key).into(), (&legacy_iv).into())
        .decrypt_padded_vec_mut::<Pkcs7>(ciphertext)
        .map_err(|_| VaultError::DecryptionFailed);

    legacy_key.zeroize();
    legacy_iv.zeroize();
    result
}

/// OpenSSL `EVP_BytesToKey` with MD5, one round, no salt.
///
/// D_1 = MD5(secret), D_n = MD5(D_{n-1} || secret); the concatenation is
/// split into a 32-byte key and a 16-byte IV.
fn evp_bytes_to_key(secret: &[u8]) -> ([u8; KEY_LEN], [u8; IV_LEN]) {
    let mut derived = Vec::with_capacity(KEY_LEN + IV_LEN);
    let mut previous: Vec<u8> = Vec::new();

    while derived.len() < KEY_LEN + IV_LEN {
        let mut hasher = Md5::new();
        hasher.update(&previous);
        hasher.update(secret);
        previous = hasher.finalize().to_vec();
        derived.extend_from_slice(&previous);
    }

    let mut key = [0u8; KEY_LEN];
    let mut iv = [0u8; IV_LEN];
    key.copy_from_slice(&derived[..KEY_LEN]);
    iv.copy_from_slice(&derived[KEY_LEN..KEY_LEN + IV_LEN]);
    derived.zeroize();

    (key, iv)
}
