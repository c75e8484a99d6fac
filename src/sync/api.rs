//! Server contracts consumed by the sync protocol client.
//!
//! Two servers are involved: the local REST server (account state, and
//! the `remote-proxy` passthrough) and, behind the proxy, the remote
//! cloud server.  This module defines the wire DTOs (camelCase on the
//! wire), the `ServerApi` trait the client is written against, and the
//! `HttpApi` implementation backed by a blocking `ureq` agent.
//!
//! Error normalization happens here: transport failures become
//! `RemoteUnavailable`, HTTP 401 becomes `AuthFailed`, and the
//! protocol-specific rejections (bad OTP code, dead transfer token) are
//! mapped where the endpoint semantics are known.

use std::collections::BTreeMap;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::config::Settings;
use crate::crypto::envelope::CipherEnvelope;
use crate::errors::{Result, VaultError};
use crate::vault::item::RecordKind;

/// OTP challenge type used for cloud-account linking.
pub const OTP_TYPE_SYNC_SETUP: &str = "SYNC_SETUP";

// ---------------------------------------------------------------------------
// Wire DTOs
// ---------------------------------------------------------------------------

/// Session tokens held by the client: the local server JWT and, once
/// linked, the remote session token (sent as `X-Remote-Token`).
#[derive(Debug, Clone, Default)]
pub struct SessionTokens {
    pub local: Option<String>,
    pub remote: Option<String>,
}

/// Reply of `GET /auth/status`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthStatus {
    pub initialized: bool,
    #[serde(default)]
    pub username: Option<String>,
}

/// Body of `POST /auth/setup`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthSetupRequest {
    pub username: String,
    pub salt: String,
    pub password_hash: String,
}

/// Remote session established by OTP verification or token redemption.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteSession {
    pub token: String,
    pub user_id: String,
}

/// Reply of `create-transfer-token`: the token plus its hard deadline.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransferGrant {
    pub transfer_token: String,
    pub expires_at: DateTime<Utc>,
}

/// Account material carried inside a transfer snapshot.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountMaterial {
    pub username: String,
    pub email: String,
}

/// The full encrypted snapshot returned by `use-transfer-token`.
///
/// Every item stays under the originating vault's encryption; the salt
/// and master-password hash let the receiving device re-derive the same
/// key after the user proves they know the master password.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransferPayload {
    pub token: String,
    pub user_id: String,
    pub user_data: AccountMaterial,
    pub master_password_hash: String,
    pub salt: String,
    #[serde(default)]
    pub passwords: Vec<RemoteItem>,
    #[serde(default)]
    pub notes: Vec<RemoteItem>,
}

/// An encrypted item as the remote server stores it.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteItem {
    pub id: String,
    pub fields: BTreeMap<String, CipherEnvelope>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl RemoteItem {
    /// Materialize this remote item as a local record.
    ///
    /// The local id is namespaced by kind (remote note and password ids
    /// come from separate tables and may collide).  The record is marked
    /// as synced at `now` — it is, by construction, identical to the
    /// server copy.
    pub fn to_record(&self, kind: RecordKind, now: DateTime<Utc>) -> crate::vault::EncryptedRecord {
        let id = match kind {
            RecordKind::Password => format!("pwd-{}", self.id),
            RecordKind::Note => format!("note-{}", self.id),
        };
        crate::vault::EncryptedRecord {
            id,
            remote_id: Some(self.id.clone()),
            kind,
            fields: self.fields.clone(),
            created_at: self.created_at,
            updated_at: self.updated_at,
            last_synced_at: Some(now),
        }
    }
}

/// Upload body for creating or updating a remote item.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteItemRequest {
    pub fields: BTreeMap<String, CipherEnvelope>,
}

// ---------------------------------------------------------------------------
// ServerApi
// ---------------------------------------------------------------------------

/// Everything the sync client needs from the two servers.
///
/// Tests implement this in memory; production uses `HttpApi`.
pub trait ServerApi {
    // Local account endpoints.
    fn auth_status(&self) -> Result<AuthStatus>;
    fn auth_setup(&self, request: &AuthSetupRequest) -> Result<()>;
    /// Authenticate locally; returns the local session JWT.
    fn auth_login(&self, username: &str, password_hash: &str) -> Result<String>;
    /// Probe whether the remote server is reachable through the proxy.
    fn remote_health(&self) -> Result<bool>;

    // Cloud-account linking (remote, via proxy).
    fn sync_setup(&self, tokens: &SessionTokens, username: &str, email: &str) -> Result<()>;
    fn verify_otp(
        &self,
        tokens: &SessionTokens,
        username: &str,
        otp_code: &str,
        otp_type: &str,
    ) -> Result<RemoteSession>;

    // Device transfer (remote, via proxy).
    fn create_transfer_token(
        &self,
        tokens: &SessionTokens,
        username: &str,
        password_hash: &str,
        device_info: &str,
    ) -> Result<TransferGrant>;
    fn use_transfer_token(
        &self,
        tokens: &SessionTokens,
        transfer_token: &str,
        device_info: &str,
    ) -> Result<TransferPayload>;

    // Encrypted item sync (remote, via proxy).
    fn list_items(&self, tokens: &SessionTokens, kind: RecordKind) -> Result<Vec<RemoteItem>>;
    fn create_item(
        &self,
        tokens: &SessionTokens,
        kind: RecordKind,
        request: &RemoteItemRequest,
    ) -> Result<RemoteItem>;
    fn update_item(
        &self,
        tokens: &SessionTokens,
        kind: RecordKind,
        remote_id: &str,
        request: &RemoteItemRequest,
    ) -> Result<RemoteItem>;
}

// ---------------------------------------------------------------------------
// HttpApi
// ---------------------------------------------------------------------------

/// Blocking HTTP implementation of `ServerApi` against the local server.
pub struct HttpApi {
    base_url: String,
    agent: ureq::Agent,
}

impl HttpApi {
    pub fn new(settings: &Settings) -> Self {
        let agent = ureq::AgentBuilder::new()
            .timeout(Duration::from_millis(settings.timeout_ms))
            .build();
        Self {
            base_url: settings.local_server_url.trim_end_matches('/').to_string(),
            agent,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    /// Attach the session headers the servers expect: the local JWT as a
    /// bearer token, the remote session token as `X-Remote-Token`.
    fn with_auth(&self, request: ureq::Request, tokens: &SessionTokens) -> ureq::Request {
        let mut request = request;
        if let Some(local) = &tokens.local {
            request = request.set("Authorization", &format!("Bearer {local}"));
        }
        if let Some(remote) = &tokens.remote {
            request = request.set("X-Remote-Token", remote);
        }
        request
    }

    fn items_path(kind: RecordKind) -> &'static str {
        match kind {
            RecordKind::Password => "/remote-proxy/sync/passwords",
            RecordKind::Note => "/remote-proxy/sync/notes",
        }
    }

    fn parse<T: serde::de::DeserializeOwned>(response: ureq::Response) -> Result<T> {
        response
            .into_json::<T>()
            .map_err(|e| VaultError::SerializationError(format!("response body: {e}")))
    }
}

/// Default mapping from HTTP errors to the vault taxonomy.
fn map_http_error(err: ureq::Error) -> VaultError {
    match err {
        ureq::Error::Status(401, _) => VaultError::AuthFailed("session rejected (401)".into()),
        ureq::Error::Status(code, _) => {
            VaultError::RemoteUnavailable(format!("server replied HTTP {code}"))
        }
        ureq::Error::Transport(transport) => VaultError::RemoteUnavailable(transport.to_string()),
    }
}

impl ServerApi for HttpApi {
    fn auth_status(&self) -> Result<AuthStatus> {
        let response = self
            .agent
            .get(&self.url("/auth/status"))
            .call()
            .map_err(map_http_error)?;
        Self::parse(response)
    }

    fn auth_setup(&self, request: &AuthSetupRequest) -> Result<()> {
        self.agent
            .post(&self.url("/auth/setup"))
            .send_json(request)
            .map_err(map_http_error)?;
        Ok(())
    }

    fn auth_login(&self, username: &str, password_hash: &str) -> Result<String> {
        #[derive(Deserialize)]
        struct LoginReply {
            token: String,
        }

        let response = self
            .agent
            .post(&self.url("/auth/login"))
            .send_json(serde_json::json!({
                "username": username,
                "passwordHash": password_hash,
            }))
            .map_err(map_http_error)?;
        Ok(Self::parse::<LoginReply>(response)?.token)
    }

    fn remote_health(&self) -> Result<bool> {
        #[derive(Deserialize)]
        struct HealthReply {
            status: String,
        }

        let response = self
            .agent
            .get(&self.url("/api/remote/status"))
            .call()
            .map_err(map_http_error)?;
        Ok(Self::parse::<HealthReply>(response)?.status == "online")
    }

    fn sync_setup(&self, tokens: &SessionTokens, username: &str, email: &str) -> Result<()> {
        self.with_auth(self.agent.post(&self.url("/remote-proxy/auth/sync-setup")), tokens)
            .send_json(serde_json::json!({
                "username": username,
                "email": email,
            }))
            .map_err(map_http_error)?;
        Ok(())
    }

    fn verify_otp(
        &self,
        tokens: &SessionTokens,
        username: &str,
        otp_code: &str,
        otp_type: &str,
    ) -> Result<RemoteSession> {
        let response = self
            .with_auth(self.agent.post(&self.url("/remote-proxy/auth/verify-otp")), tokens)
            .send_json(serde_json::json!({
                "username": username,
                "otpCode": otp_code,
                "otpType": otp_type,
            }))
            .map_err(|err| match err {
                // Any rejection of the challenge itself is an OTP
                // mismatch; the caller may resend within the window.
                ureq::Error::Status(code, _) if code != 401 => VaultError::OtpMismatch,
                other => map_http_error(other),
            })?;
        Self::parse(response)
    }

    fn create_transfer_token(
        &self,
        tokens: &SessionTokens,
        username: &str,
        password_hash: &str,
        device_info: &str,
    ) -> Result<TransferGrant> {
        let response = self
            .with_auth(
                self.agent
                    .post(&self.url("/remote-proxy/auth/create-transfer-token")),
                tokens,
            )
            .send_json(serde_json::json!({
                "username": username,
                "passwordHash": password_hash,
                "deviceInfo": device_info,
            }))
            .map_err(map_http_error)?;
        Self::parse(response)
    }

    fn use_transfer_token(
        &self,
        tokens: &SessionTokens,
        transfer_token: &str,
        device_info: &str,
    ) -> Result<TransferPayload> {
        let response = self
            .with_auth(
                self.agent
                    .post(&self.url("/remote-proxy/auth/use-transfer-token")),
                tokens,
            )
            .send_json(serde_json::json!({
                "transferToken": transfer_token,
                "deviceInfo": device_info,
            }))
            .map_err(|err| match err {
                // The server refuses consumed, expired, and unknown
                // tokens alike; all are terminal for this token.
                ureq::Error::Status(code, _) if code != 401 => VaultError::TransferTokenInvalid,
                other => map_http_error(other),
            })?;
        Self::parse(response)
    }

    fn list_items(&self, tokens: &SessionTokens, kind: RecordKind) -> Result<Vec<RemoteItem>> {
        let response = self
            .with_auth(self.agent.get(&self.url(Self::items_path(kind))), tokens)
            .call()
            .map_err(map_http_error)?;
        Self::parse(response)
    }

    fn create_item(
        &self,
        tokens: &SessionTokens,
        kind: RecordKind,
        request: &RemoteItemRequest,
    ) -> Result<RemoteItem> {
        let response = self
            .with_auth(self.agent.post(&self.url(Self::items_path(kind))), tokens)
            .send_json(request)
            .map_err(map_http_error)?;
        Self::parse(response)
    }

    fn update_item(
        &self,
        tokens: &SessionTokens,
        kind: RecordKind,
        remote_id: &str,
        request: &RemoteItemRequest,
    ) -> Result<RemoteItem> {
        let url = format!("{}/{remote_id}", self.url(Self::items_path(kind)));
        let response = self
            .with_auth(self.agent.put(&url), tokens)
            .send_json(request)
            .map_err(map_http_error)?;
        Self::parse(response)
    }
}
