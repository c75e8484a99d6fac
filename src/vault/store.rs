//! The local record store boundary.
//!
//! Persistence itself lives outside this crate (the local server keeps
//! records in its own database); the sync client only needs a keyed
//! record store it can list, upsert, and mark as synced.  `MemoryStore`
//! is the in-crate implementation, used by tests and as a local cache.

use std::collections::HashMap;

use chrono::{DateTime, Utc};

use super::item::{EncryptedRecord, RecordKind};

/// A simple keyed store of encrypted records.
pub trait RecordStore {
    /// All records of the given kind, sorted by id for deterministic
    /// iteration.
    fn list(&self, kind: RecordKind) -> Vec<EncryptedRecord>;

    /// Look up a record by local id.
    fn get(&self, id: &str) -> Option<EncryptedRecord>;

    /// Insert or replace a record.
    fn upsert(&mut self, record: EncryptedRecord);

    /// Record that `id` was uploaded and now exists remotely as
    /// `remote_id`.
    fn mark_synced(&mut self, id: &str, remote_id: &str, at: DateTime<Utc>);

    /// Records of the given kind with local changes the server has not
    /// seen.
    fn unsynced(&self, kind: RecordKind) -> Vec<EncryptedRecord> {
        self.list(kind)
            .into_iter()
            .filter(EncryptedRecord::needs_sync)
            .collect()
    }

    /// Find the local record tracking a given remote id.
    fn find_by_remote_id(&self, kind: RecordKind, remote_id: &str) -> Option<EncryptedRecord> {
        self.list(kind)
            .into_iter()
            .find(|r| r.remote_id.as_deref() == Some(remote_id))
    }
}

/// HashMap-backed record store.
#[derive(Debug, Default)]
pub struct MemoryStore {
    records: HashMap<String, EncryptedRecord>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl RecordStore for MemoryStore {
    fn list(&self, kind: RecordKind) -> Vec<EncryptedRecord> {
        let mut list: Vec<EncryptedRecord> = self
            .records
            .values()
            .filter(|r| r.kind == kind)
            .cloned()
            .collect();
        list.sort_by(|a, b| a.id.cmp(&b.id));
        list
    }

    fn get(&self, id: &str) -> Option<EncryptedRecord> {
        self.records.get(id).cloned()
    }

    fn upsert(&mut self, record: EncryptedRecord) {
        self.records.insert(record.id.clone(), record);
    }

    fn mark_synced(&mut self, id: &str, remote_id: &str, at: DateTime<Utc>) {
        if let Some(record) = self.records.get_mut(id) {
            record.mark_synced(remote_id, at);
        }
    }
}
