//! Vault items and their persisted, field-wise encrypted form.
//!
//! A `VaultItem` (password entry or secure note) exists in plaintext only
//! transiently inside the privileged boundary.  Its persisted form is an
//! `EncryptedRecord`: every field carried as its own `CipherEnvelope`, so
//! corruption of one ciphertext never destroys the whole item.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::crypto::envelope::CipherEnvelope;
use crate::errors::{Result, VaultError};

use super::guard::VaultGuard;

/// The two record categories the vault stores and syncs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordKind {
    Password,
    Note,
}

fn default_password_type() -> String {
    "Website".to_string()
}

fn default_note_type() -> String {
    "Note".to_string()
}

/// A credential entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PasswordItem {
    pub title: String,
    pub site: String,
    pub login: String,
    pub password: String,
    #[serde(rename = "type", default = "default_password_type")]
    pub item_type: String,
}

/// A secure note.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NoteItem {
    pub title: String,
    #[serde(rename = "type", default = "default_note_type")]
    pub item_type: String,
    pub content: String,
}

/// A plaintext vault item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum VaultItem {
    Password(PasswordItem),
    Note(NoteItem),
}

impl VaultItem {
    pub fn kind(&self) -> RecordKind {
        match self {
            VaultItem::Password(_) => RecordKind::Password,
            VaultItem::Note(_) => RecordKind::Note,
        }
    }

    /// Break the item into its named plaintext fields.
    fn fields(&self) -> Vec<(&'static str, &str)> {
        match self {
            VaultItem::Password(p) => vec![
                ("title", p.title.as_str()),
                ("site", p.site.as_str()),
                ("login", p.login.as_str()),
                ("password", p.password.as_str()),
                ("type", p.item_type.as_str()),
            ],
            VaultItem::Note(n) => vec![
                ("title", n.title.as_str()),
                ("type", n.item_type.as_str()),
                ("content", n.content.as_str()),
            ],
        }
    }
}

/// Persisted form of a vault item: one envelope per field, plus sync
/// bookkeeping.  `last_synced_at` is the per-item sync cursor.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EncryptedRecord {
    pub id: String,

    /// Id assigned by the remote server once the record has been pushed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remote_id: Option<String>,

    pub kind: RecordKind,

    /// Field name -> independently encrypted envelope.
    pub fields: BTreeMap<String, CipherEnvelope>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_synced_at: Option<DateTime<Utc>>,
}

impl EncryptedRecord {
    /// Encrypt a plaintext item into a fresh record.
    pub fn encrypt(
        guard: &VaultGuard,
        id: impl Into<String>,
        item: &VaultItem,
        now: DateTime<Utc>,
    ) -> Result<Self> {
        Ok(Self {
            id: id.into(),
            remote_id: None,
            kind: item.kind(),
            fields: encrypt_fields(guard, item)?,
            created_at: now,
            updated_at: now,
            last_synced_at: None,
        })
    }

    /// `true` when the record has local changes the server has not seen.
    pub fn needs_sync(&self) -> bool {
        match self.last_synced_at {
            None => true,
            Some(synced) => self.updated_at > synced,
        }
    }

    /// Record a successful upload.
    pub fn mark_synced(&mut self, remote_id: impl Into<String>, at: DateTime<Utc>) {
        self.remote_id = Some(remote_id.into());
        self.last_synced_at = Some(at);
    }

    fn field(&self, name: &str) -> Result<&CipherEnvelope> {
        self.fields.get(name).ok_or_else(|| {
            VaultError::InvalidEnvelopeFormat(format!("record is missing field '{name}'"))
        })
    }
}

/// Encrypt every field of an item independently.
pub fn encrypt_fields(
    guard: &VaultGuard,
    item: &VaultItem,
) -> Result<BTreeMap<String, CipherEnvelope>> {
    let mut fields = BTreeMap::new();
    for (name, value) in item.fields() {
        fields.insert(name.to_string(), guard.encrypt_value(&value)?);
    }
    Ok(fields)
}

/// Decrypt a record back into a plaintext item.
pub fn decrypt_record(guard: &VaultGuard, record: &EncryptedRecord) -> Result<VaultItem> {
    let get = |name: &str| -> Result<String> { guard.decrypt_value(record.field(name)?) };

    let item = match record.kind {
        RecordKind::Password => VaultItem::Password(PasswordItem {
            title: get("title")?,
            site: get("site")?,
            login: get("login")?,
            password: get("password")?,
            item_type: get("type")?,
        }),
        RecordKind::Note => VaultItem::Note(NoteItem {
            title: get("title")?,
            item_type: get("type")?,
            content: get("content")?,
        }),
    };

    Ok(item)
}

/// Outcome of a bulk decrypt: everything that could be read, plus a count
/// of records that could not.
#[derive(Debug)]
pub struct BulkDecrypt {
    /// Successfully decrypted items, paired with their record ids.
    pub items: Vec<(String, VaultItem)>,
    /// Number of records that failed to decrypt.
    pub failed: usize,
}

/// Decrypt a batch of records, tolerating per-record failures.
///
/// A record that fails to decrypt is counted and skipped — one corrupted
/// item must never abort loading the rest of the vault.
pub fn decrypt_all(guard: &VaultGuard, records: &[EncryptedRecord]) -> BulkDecrypt {
    let mut items = Vec::with_capacity(records.len());
    let mut failed = 0;

    for record in records {
        match decrypt_record(guard, record) {
            Ok(item) => items.push((record.id.clone(), item)),
            Err(err) => {
                tracing::warn!(record_id = %record.id, %err, "failed to decrypt record");
                failed += 1;
            }
        }
    }

    BulkDecrypt { items, failed }
}
