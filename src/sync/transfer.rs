//! Device transfer via short-lived, single-use tokens.
//!
//! The issuing device authenticates locally, then asks the server to
//! mint a 16-character token valid for five minutes.  The receiving
//! device redeems the token exactly once and gets back the full
//! encrypted snapshot: account material (salt, master-password hash) and
//! every item, still under the originating vault's encryption.  Nothing
//! is re-encrypted until the user proves they know the master password
//! and the vault has been unlocked locally.
//!
//! Expiry is a pure comparison against `expires_at`; the issuing UI
//! re-evaluates it on demand rather than running a timer.

use chrono::{DateTime, Duration, Utc};

use crate::bridge::VaultBridge;
use crate::crypto::hash::verify_master_password_hash;
use crate::errors::{Result, VaultError};
use crate::vault::item::{EncryptedRecord, RecordKind};
use crate::vault::store::RecordStore;

use super::api::{ServerApi, SessionTokens, TransferPayload};

/// Length of a transfer token.
pub const TRANSFER_TOKEN_LEN: usize = 16;

/// Lifetime of a freshly minted transfer token.
pub const TRANSFER_TTL_MINUTES: i64 = 5;

/// A minted transfer token as held by the issuing device.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferToken {
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

impl TransferToken {
    /// `true` once the deadline has passed.  The issuing device must
    /// treat the token as dead from this moment, whatever the server
    /// thinks.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }

    /// Time left before expiry, floored at zero.
    pub fn remaining(&self, now: DateTime<Utc>) -> Duration {
        (self.expires_at - now).max(Duration::zero())
    }
}

/// `true` if `token` has the shape the server mints: 16 alphanumeric
/// characters.
fn is_well_formed(token: &str) -> bool {
    token.len() == TRANSFER_TOKEN_LEN && token.bytes().all(|b| b.is_ascii_alphanumeric())
}

/// Mint a transfer token for this account.
///
/// Authenticates against the local server first (storing the fresh local
/// session in `tokens`), then asks the remote server for the token.
pub fn create_transfer_token(
    api: &impl ServerApi,
    tokens: &mut SessionTokens,
    username: &str,
    password_hash: &str,
    device_info: &str,
) -> Result<TransferToken> {
    let local = api.auth_login(username, password_hash)?;
    tokens.local = Some(local);

    let grant = api.create_transfer_token(tokens, username, password_hash, device_info)?;

    if !is_well_formed(&grant.transfer_token) {
        return Err(VaultError::TransferTokenInvalid);
    }

    tracing::info!(expires_at = %grant.expires_at, "transfer token minted");
    Ok(TransferToken {
        token: grant.transfer_token,
        expires_at: grant.expires_at,
    })
}

/// Redeem a transfer token on the receiving device.
///
/// Succeeds at most once per token; reuse and expiry both fail with
/// `TransferTokenInvalid`.  On success the remote session from the
/// payload is stored in `tokens`.
pub fn use_transfer_token(
    api: &impl ServerApi,
    tokens: &mut SessionTokens,
    transfer_token: &str,
    device_info: &str,
) -> Result<TransferPayload> {
    let transfer_token = transfer_token.trim();
    if !is_well_formed(transfer_token) {
        return Err(VaultError::TransferTokenInvalid);
    }

    let payload = api.use_transfer_token(tokens, transfer_token, device_info)?;
    tokens.remote = Some(payload.token.clone());

    tracing::info!(
        passwords = payload.passwords.len(),
        notes = payload.notes.len(),
        "transfer snapshot received"
    );
    Ok(payload)
}

/// What `import_snapshot` wrote into the local store.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct ImportReport {
    pub passwords: usize,
    pub notes: usize,
}

/// Import a transfer snapshot verbatim.
///
/// Every item is stored exactly as it arrived — still encrypted under
/// the originating vault's key — and marked as in sync with the server.
/// Re-encryption happens separately, via `rewrap_records`, once the user
/// has unlocked locally.
pub fn import_snapshot(
    store: &mut impl RecordStore,
    payload: &TransferPayload,
    now: DateTime<Utc>,
) -> ImportReport {
    let mut report = ImportReport::default();

    for (kind, items) in [
        (RecordKind::Password, &payload.passwords),
        (RecordKind::Note, &payload.notes),
    ] {
        for item in items {
            store.upsert(item.to_record(kind, now));
            match kind {
                RecordKind::Password => report.passwords += 1,
                RecordKind::Note => report.notes += 1,
            }
        }
    }

    report
}

/// Verify the user-entered master password against the hash carried in
/// the snapshot, in constant time.  Must pass before any re-wrap.
pub fn verify_snapshot_password(payload: &TransferPayload, password: &str) -> bool {
    verify_master_password_hash(password, &payload.master_password_hash)
}

/// Re-encrypt imported records under this device's own salt.
///
/// Unlocks with the originating salt to read each field, then re-unlocks
/// with the local salt and encrypts everything again.  The guard is left
/// unlocked under the local salt.  Fails with `DecryptionFailed` if the
/// password does not match the originating vault.
pub fn rewrap_records(
    bridge: &VaultBridge,
    password: &str,
    originating_salt: &str,
    local_salt: &str,
    records: &[EncryptedRecord],
    now: DateTime<Utc>,
) -> Result<Vec<EncryptedRecord>> {
    bridge.with_guard(|guard| {
        // Pass 1: read every field with the originating key.
        guard.unlock(password, originating_salt)?;
        let mut plaintexts: Vec<Vec<(String, String)>> = Vec::with_capacity(records.len());
        for record in records {
            let mut fields = Vec::with_capacity(record.fields.len());
            for (name, envelope) in &record.fields {
                fields.push((name.clone(), guard.decrypt_value(envelope)?));
            }
            plaintexts.push(fields);
        }

        // Pass 2: re-encrypt under the local key.
        guard.unlock(password, local_salt)?;
        let mut rewrapped = Vec::with_capacity(records.len());
        for (record, fields) in records.iter().zip(plaintexts) {
            let mut out = record.clone();
            out.fields.clear();
            for (name, value) in fields {
                out.fields.insert(name, guard.encrypt_value(&value)?);
            }
            out.updated_at = now;
            // The server still holds the originating ciphertext; the
            // re-wrapped copy is a local change until the next push.
            out.last_synced_at = None;
            rewrapped.push(out);
        }

        tracing::info!(records = rewrapped.len(), "snapshot re-encrypted under local key");
        Ok(rewrapped)
    })
}
