//! OTP-gated cloud-account linking.
//!
//! State machine: `Idle -> AwaitingOtp -> Linked`.  Setup asks the server
//! to email a 6-digit one-time code (type `SYNC_SETUP`, 10-minute
//! window); verification trades the code for a remote session token.  A
//! wrong code leaves the machine in `AwaitingOtp` so the user can retry
//! or resend; issuing a new challenge invalidates the previous code on
//! the server side.
//!
//! Expiry is a pure comparison against the challenge timestamp — there is
//! no timer to cancel.

use chrono::{DateTime, Duration, Utc};

use crate::errors::{Result, VaultError};

use super::api::{RemoteSession, ServerApi, SessionTokens, OTP_TYPE_SYNC_SETUP};

/// Number of digits in an OTP code.
pub const OTP_DIGITS: usize = 6;

/// How long an issued OTP code stays valid.
pub const OTP_TTL_MINUTES: i64 = 10;

/// Where the account stands in the linking flow.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkState {
    /// No cloud account configured.
    Idle,
    /// A challenge is outstanding; the user has been emailed a code.
    AwaitingOtp {
        username: String,
        email: String,
        requested_at: DateTime<Utc>,
    },
    /// The account is linked and holds a remote session.
    Linked { username: String },
}

/// Client-side driver of the linking state machine.
#[derive(Debug)]
pub struct AccountLink {
    state: LinkState,
    session: Option<RemoteSession>,
}

impl AccountLink {
    pub fn new() -> Self {
        Self {
            state: LinkState::Idle,
            session: None,
        }
    }

    /// Restore a link from a previously stored session (e.g. after a
    /// device transfer or an app restart).
    pub fn from_session(username: impl Into<String>, session: RemoteSession) -> Self {
        Self {
            state: LinkState::Linked {
                username: username.into(),
            },
            session: Some(session),
        }
    }

    pub fn state(&self) -> &LinkState {
        &self.state
    }

    pub fn is_linked(&self) -> bool {
        matches!(self.state, LinkState::Linked { .. })
    }

    pub fn session(&self) -> Option<&RemoteSession> {
        self.session.as_ref()
    }

    /// Begin (or restart) the linking flow for `username`.
    ///
    /// The server emails a fresh OTP code; any previously issued code is
    /// invalidated by the reissue.  `Idle | AwaitingOtp -> AwaitingOtp`.
    pub fn setup_sync(
        &mut self,
        api: &impl ServerApi,
        tokens: &SessionTokens,
        username: &str,
        email: &str,
        now: DateTime<Utc>,
    ) -> Result<()> {
        if self.is_linked() {
            return Err(VaultError::AuthFailed(
                "cloud sync is already set up for this account".into(),
            ));
        }

        api.sync_setup(tokens, username, email)?;

        self.state = LinkState::AwaitingOtp {
            username: username.to_string(),
            email: email.to_string(),
            requested_at: now,
        };
        tracing::info!(username, "sync setup initiated, awaiting OTP");
        Ok(())
    }

    /// Trade the emailed code for a remote session.
    ///
    /// `AwaitingOtp -> Linked` on success.  A wrong or expired code fails
    /// with `OtpMismatch` and leaves the state untouched.
    pub fn verify_otp(
        &mut self,
        api: &impl ServerApi,
        tokens: &SessionTokens,
        otp_code: &str,
        now: DateTime<Utc>,
    ) -> Result<RemoteSession> {
        let (username, requested_at) = match &self.state {
            LinkState::AwaitingOtp {
                username,
                requested_at,
                ..
            } => (username.clone(), *requested_at),
            _ => return Err(VaultError::NotLinked),
        };

        // Cheap client-side checks before a network round trip: shape,
        // then the fixed validity window.
        if otp_code.len() != OTP_DIGITS || !otp_code.bytes().all(|b| b.is_ascii_digit()) {
            return Err(VaultError::OtpMismatch);
        }
        if now - requested_at > Duration::minutes(OTP_TTL_MINUTES) {
            return Err(VaultError::OtpMismatch);
        }

        let session = api.verify_otp(tokens, &username, otp_code, OTP_TYPE_SYNC_SETUP)?;

        self.state = LinkState::Linked { username };
        self.session = Some(session.clone());
        tracing::info!("cloud account linked");
        Ok(session)
    }

    /// Re-trigger the challenge without changing state.
    ///
    /// The server issues a new code (invalidating the old one) and the
    /// validity window restarts.
    pub fn resend_otp(
        &mut self,
        api: &impl ServerApi,
        tokens: &SessionTokens,
        now: DateTime<Utc>,
    ) -> Result<()> {
        let (username, email) = match &self.state {
            LinkState::AwaitingOtp {
                username, email, ..
            } => (username.clone(), email.clone()),
            _ => return Err(VaultError::NotLinked),
        };

        api.sync_setup(tokens, &username, &email)?;

        self.state = LinkState::AwaitingOtp {
            username,
            email,
            requested_at: now,
        };
        tracing::info!("OTP challenge reissued");
        Ok(())
    }

    /// Drop the remote session and return to `Idle`.  Called on logout;
    /// never touches the vault lock state.
    pub fn unlink(&mut self) {
        self.state = LinkState::Idle;
        self.session = None;
    }
}

impl Default for AccountLink {
    fn default() -> Self {
        Self::new()
    }
}
