//! Authentication session model and provider trait.
//!
//! The session itself belongs to the hosted auth service; this crate only
//! reads its expiry and asks the provider to refresh it.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Default tolerance past expiry before a session is unrecoverable.
pub const DEFAULT_REFRESH_GRACE_SECS: i64 = 5 * 60;

/// An access credential issued by the auth service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthSession {
    pub access_token: String,
    pub refresh_token: String,
    pub expires_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_email: Option<String>,
}

impl AuthSession {
    /// Whether the access token is still inside its lifetime.
    pub fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
        now < self.expires_at
    }

    /// Whether the session expired more than `grace` before `now`.
    pub fn is_expired_beyond(&self, grace: Duration, now: DateTime<Utc>) -> bool {
        now - self.expires_at > grace
    }
}

/// Source of the current admin session.
#[async_trait]
pub trait AuthProvider: Send + Sync {
    /// Returns the current session, or `None` when signed out.
    async fn current_session(&self) -> Result<Option<AuthSession>>;

    /// Exchanges the refresh token for a new session and stores it.
    async fn refresh_session(&self) -> Result<AuthSession>;
}
