//! Synchronization and device-transfer protocols.
//!
//! This module provides:
//! - The server contracts and wire DTOs (`api`)
//! - Selective/force push, pull, and remote status (`client`)
//! - OTP-gated cloud-account linking (`linking`)
//! - Expiring single-use transfer tokens and snapshot import (`transfer`)

pub mod api;
pub mod client;
pub mod linking;
pub mod transfer;

// Re-export the most commonly used items.
pub use api::{
    AccountMaterial, AuthSetupRequest, AuthStatus, HttpApi, RemoteItem, RemoteItemRequest,
    RemoteSession, ServerApi, SessionTokens, TransferGrant, TransferPayload, OTP_TYPE_SYNC_SETUP,
};
pub use client::{
    FullSyncOutcome, PullReport, PushReport, RemoteStatus, SyncClient, SyncFailure, SyncSelection,
};
pub use linking::{AccountLink, LinkState, OTP_DIGITS, OTP_TTL_MINUTES};
pub use transfer::{
    create_transfer_token, import_snapshot, rewrap_records, use_transfer_token, ImportReport,
    TransferToken, TRANSFER_TOKEN_LEN, TRANSFER_TTL_MINUTES,
};
