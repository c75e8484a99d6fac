//! The sync protocol client.
//!
//! `SyncClient` drives selective/force push, pull, and the on-demand
//! remote status report against the server contracts in `api`.  Items
//! travel as field-wise ciphertext envelopes and are never decrypted
//! here; the client's only crypto dependency is the bridge, used by the
//! transfer-import flow.
//!
//! Push and pull are independently retryable: `synchronize` runs both
//! and reports each outcome separately, so a push failure never blocks
//! the pull attempt (or vice versa).  Per-item failures are collected
//! rather than aborting the batch.

use chrono::{DateTime, Utc};

use crate::errors::{Result, VaultError};
use crate::vault::item::RecordKind;
use crate::vault::store::RecordStore;

use super::api::{RemoteItemRequest, ServerApi, SessionTokens};
use super::linking::AccountLink;

/// Which record kinds a push covers, and how conflicts resolve.
#[derive(Debug, Clone, Copy)]
pub struct SyncSelection {
    pub sync_notes: bool,
    pub sync_passwords: bool,
    /// `false`: skip remote items newer than our last sync cursor.
    /// `true`: overwrite remote state unconditionally.
    pub force_sync: bool,
}

impl Default for SyncSelection {
    fn default() -> Self {
        Self {
            sync_notes: true,
            sync_passwords: true,
            force_sync: false,
        }
    }
}

/// One item that could not be synced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncFailure {
    pub id: String,
    pub error: String,
}

/// Outcome of a push.
#[derive(Debug, Default)]
pub struct PushReport {
    pub notes_pushed: usize,
    pub passwords_pushed: usize,
    /// Items skipped because the remote copy was newer (non-force only).
    pub skipped: usize,
    pub failures: Vec<SyncFailure>,
}

/// Outcome of a pull.
#[derive(Debug, Default)]
pub struct PullReport {
    pub notes_pulled: usize,
    pub passwords_pulled: usize,
    pub failures: Vec<SyncFailure>,
}

/// Combined outcome of `synchronize` — each leg reports independently.
#[derive(Debug)]
pub struct FullSyncOutcome {
    pub push: Result<PushReport>,
    pub pull: Result<PullReport>,
}

/// On-demand snapshot of where the account stands; never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteStatus {
    pub has_remote_account: bool,
    pub remote_server_available: bool,
    pub token_valid: bool,
    pub unsynced_notes: usize,
    pub unsynced_passwords: usize,
}

/// Client for the three sync protocols: push/pull, account linking, and
/// device transfer.
pub struct SyncClient<A: ServerApi, S: RecordStore> {
    api: A,
    store: S,
    link: AccountLink,
    tokens: SessionTokens,
}

impl<A: ServerApi, S: RecordStore> SyncClient<A, S> {
    pub fn new(api: A, store: S) -> Self {
        Self {
            api,
            store,
            link: AccountLink::new(),
            tokens: SessionTokens::default(),
        }
    }

    // ------------------------------------------------------------------
    // Accessors
    // ------------------------------------------------------------------

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut S {
        &mut self.store
    }

    pub fn link(&self) -> &AccountLink {
        &self.link
    }

    pub fn tokens(&self) -> &SessionTokens {
        &self.tokens
    }

    // ------------------------------------------------------------------
    // Local session
    // ------------------------------------------------------------------

    /// Authenticate against the local server and hold the session JWT.
    pub fn login_local(&mut self, username: &str, password_hash: &str) -> Result<()> {
        let token = self.api.auth_login(username, password_hash)?;
        self.tokens.local = Some(token);
        Ok(())
    }

    /// Drop every session and unlink the cloud account.  Locking the
    /// vault is the caller's separate responsibility.
    pub fn logout(&mut self) {
        self.tokens = SessionTokens::default();
        self.link.unlink();
    }

    // ------------------------------------------------------------------
    // Cloud-account linking
    // ------------------------------------------------------------------

    /// Begin OTP-gated linking; the server emails a 6-digit code.
    pub fn setup_sync(&mut self, username: &str, email: &str) -> Result<()> {
        self.link
            .setup_sync(&self.api, &self.tokens, username, email, Utc::now())
    }

    /// Verify the emailed code; on success the remote session is held
    /// for subsequent sync calls.
    pub fn verify_otp(&mut self, otp_code: &str) -> Result<()> {
        let session = self
            .link
            .verify_otp(&self.api, &self.tokens, otp_code, Utc::now())?;
        self.tokens.remote = Some(session.token);
        Ok(())
    }

    /// Re-trigger the OTP email without changing state.
    pub fn resend_otp(&mut self) -> Result<()> {
        self.link.resend_otp(&self.api, &self.tokens, Utc::now())
    }

    // ------------------------------------------------------------------
    // Device transfer
    // ------------------------------------------------------------------

    /// Mint a transfer token for this account (issuing device).
    pub fn create_transfer_token(
        &mut self,
        username: &str,
        password_hash: &str,
        device_info: &str,
    ) -> Result<super::transfer::TransferToken> {
        super::transfer::create_transfer_token(
            &self.api,
            &mut self.tokens,
            username,
            password_hash,
            device_info,
        )
    }

    /// Redeem a transfer token (receiving device) and import the
    /// encrypted snapshot verbatim.  The account ends up linked with the
    /// session carried in the payload.
    pub fn use_transfer_token(
        &mut self,
        transfer_token: &str,
        device_info: &str,
    ) -> Result<super::api::TransferPayload> {
        let payload = super::transfer::use_transfer_token(
            &self.api,
            &mut self.tokens,
            transfer_token,
            device_info,
        )?;

        super::transfer::import_snapshot(&mut self.store, &payload, Utc::now());
        self.link = AccountLink::from_session(
            payload.user_data.username.clone(),
            super::api::RemoteSession {
                token: payload.token.clone(),
                user_id: payload.user_id.clone(),
            },
        );

        Ok(payload)
    }

    // ------------------------------------------------------------------
    // Push / pull
    // ------------------------------------------------------------------

    /// Upload unsynced local records.
    ///
    /// With `force_sync` off, a remote item that changed since our last
    /// sync of that record is left alone and counted in `skipped`.
    /// Per-item upload failures are collected in `failures`; a kind
    /// whose remote listing cannot be fetched at all contributes one
    /// failure entry, and the push only errors out when every selected
    /// kind is unreachable.
    pub fn push(&mut self, selection: &SyncSelection) -> Result<PushReport> {
        if !self.link.is_linked() {
            return Err(VaultError::NotLinked);
        }

        let mut report = PushReport::default();
        let mut kinds_attempted = 0usize;
        let mut kinds_failed = 0usize;
        let mut first_error: Option<VaultError> = None;

        for kind in selected_kinds(selection) {
            kinds_attempted += 1;
            match self.push_kind(kind, selection.force_sync, &mut report) {
                Ok(()) => {}
                Err(err) => {
                    self.invalidate_session_on(&err);
                    tracing::warn!(?kind, %err, "push failed for kind");
                    kinds_failed += 1;
                    report.failures.push(SyncFailure {
                        id: kind_label(kind).to_string(),
                        error: err.to_string(),
                    });
                    if first_error.is_none() {
                        first_error = Some(err);
                    }
                }
            }
        }

        match first_error {
            // Every selected kind failed outright: surface the error.
            Some(err) if kinds_failed == kinds_attempted && kinds_attempted > 0 => Err(err),
            _ => {
                tracing::info!(
                    notes = report.notes_pushed,
                    passwords = report.passwords_pushed,
                    skipped = report.skipped,
                    failed = report.failures.len(),
                    "push finished"
                );
                Ok(report)
            }
        }
    }

    fn push_kind(
        &mut self,
        kind: RecordKind,
        force_sync: bool,
        report: &mut PushReport,
    ) -> Result<()> {
        // One listing per kind gives us the remote timestamps needed for
        // conflict detection.
        let remote_items = self.api.list_items(&self.tokens, kind)?;
        let remote_updated: std::collections::HashMap<&str, DateTime<Utc>> = remote_items
            .iter()
            .map(|item| (item.id.as_str(), item.updated_at))
            .collect();

        let now = Utc::now();

        for record in self.store.unsynced(kind) {
            let request = RemoteItemRequest {
                fields: record.fields.clone(),
            };

            let outcome = match record.remote_id.as_deref() {
                Some(remote_id) => {
                    if !force_sync && conflicts(&record, remote_updated.get(remote_id).copied()) {
                        tracing::debug!(id = %record.id, "skipping push, remote copy is newer");
                        report.skipped += 1;
                        continue;
                    }
                    self.api
                        .update_item(&self.tokens, kind, remote_id, &request)
                }
                None => self.api.create_item(&self.tokens, kind, &request),
            };

            match outcome {
                Ok(remote) => {
                    self.store.mark_synced(&record.id, &remote.id, now);
                    match kind {
                        RecordKind::Note => report.notes_pushed += 1,
                        RecordKind::Password => report.passwords_pushed += 1,
                    }
                }
                // An auth rejection poisons the whole session — stop
                // this kind instead of failing every remaining item.
                Err(err @ VaultError::AuthFailed(_)) => return Err(err),
                Err(err) => {
                    tracing::warn!(id = %record.id, %err, "failed to push record");
                    report.failures.push(SyncFailure {
                        id: record.id.clone(),
                        error: err.to_string(),
                    });
                }
            }
        }

        Ok(())
    }

    /// Download remote items and upsert them locally.
    ///
    /// An existing local record is only overwritten when the remote copy
    /// is strictly newer.  Kind-level fetch failures are collected; the
    /// pull errors out only when every kind is unreachable.
    pub fn pull(&mut self) -> Result<PullReport> {
        if !self.link.is_linked() {
            return Err(VaultError::NotLinked);
        }

        let mut report = PullReport::default();
        let mut first_error: Option<VaultError> = None;
        let mut kinds_attempted = 0usize;
        let mut kinds_failed = 0usize;

        for kind in [RecordKind::Note, RecordKind::Password] {
            kinds_attempted += 1;
            match self.pull_kind(kind, &mut report) {
                Ok(()) => {}
                Err(err) => {
                    self.invalidate_session_on(&err);
                    tracing::warn!(?kind, %err, "pull failed for kind");
                    kinds_failed += 1;
                    report.failures.push(SyncFailure {
                        id: kind_label(kind).to_string(),
                        error: err.to_string(),
                    });
                    if first_error.is_none() {
                        first_error = Some(err);
                    }
                }
            }
        }

        match first_error {
            Some(err) if kinds_failed == kinds_attempted => Err(err),
            _ => {
                tracing::info!(
                    notes = report.notes_pulled,
                    passwords = report.passwords_pulled,
                    "pull finished"
                );
                Ok(report)
            }
        }
    }

    fn pull_kind(&mut self, kind: RecordKind, report: &mut PullReport) -> Result<()> {
        let remote_items = self.api.list_items(&self.tokens, kind)?;
        let now = Utc::now();

        for item in remote_items {
            let pulled = match self.store.find_by_remote_id(kind, &item.id) {
                Some(mut local) => {
                    // Strictly-newer remote wins; otherwise local stands.
                    if item.updated_at > local.updated_at {
                        local.fields = item.fields.clone();
                        local.updated_at = item.updated_at;
                        local.last_synced_at = Some(now);
                        self.store.upsert(local);
                        true
                    } else {
                        false
                    }
                }
                None => {
                    self.store.upsert(item.to_record(kind, now));
                    true
                }
            };

            if pulled {
                match kind {
                    RecordKind::Note => report.notes_pulled += 1,
                    RecordKind::Password => report.passwords_pulled += 1,
                }
            }
        }

        Ok(())
    }

    /// Run push then pull; each leg reports its own outcome, so one
    /// failing never aborts the other.
    pub fn synchronize(&mut self, selection: &SyncSelection) -> FullSyncOutcome {
        FullSyncOutcome {
            push: self.push(selection),
            pull: self.pull(),
        }
    }

    // ------------------------------------------------------------------
    // Status
    // ------------------------------------------------------------------

    /// Recompute the remote status.  Purely derived: nothing here is
    /// cached or persisted.
    pub fn status(&self) -> RemoteStatus {
        let remote_server_available = self.api.remote_health().unwrap_or(false);
        RemoteStatus {
            has_remote_account: self.link.is_linked(),
            remote_server_available,
            token_valid: self.link.is_linked() && self.tokens.remote.is_some(),
            unsynced_notes: self.store.unsynced(RecordKind::Note).len(),
            unsynced_passwords: self.store.unsynced(RecordKind::Password).len(),
        }
    }

    // ------------------------------------------------------------------
    // Internal
    // ------------------------------------------------------------------

    /// Session hygiene on auth rejection: the session token is dead, so
    /// drop it.  The vault lock state is deliberately untouched.
    fn invalidate_session_on(&mut self, err: &VaultError) {
        if matches!(err, VaultError::AuthFailed(_)) {
            tracing::warn!("session rejected by server, clearing local session");
            self.tokens.local = None;
        }
    }
}

fn selected_kinds(selection: &SyncSelection) -> Vec<RecordKind> {
    let mut kinds = Vec::with_capacity(2);
    if selection.sync_notes {
        kinds.push(RecordKind::Note);
    }
    if selection.sync_passwords {
        kinds.push(RecordKind::Password);
    }
    kinds
}

fn kind_label(kind: RecordKind) -> &'static str {
    match kind {
        RecordKind::Note => "notes",
        RecordKind::Password => "passwords",
    }
}

/// A remote copy conflicts when it changed after our last sync of this
/// record.  With no cursor at all (never synced from this device) any
/// remote change counts as a conflict.
fn conflicts(
    record: &crate::vault::EncryptedRecord,
    remote_updated: Option<DateTime<Utc>>,
) -> bool {
    match remote_updated {
        None => false, // Nothing on the server to clobber.
        Some(remote) => match record.last_synced_at {
            Some(cursor) => remote > cursor,
            None => true,
        },
    }
}
