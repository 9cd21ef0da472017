//! GoTrue-backed implementation of AuthProvider.
//!
//! Sessions are cached in memory and mirrored to `session.json` so a signed-in
//! admin survives process restarts.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use cardvault_core::auth::{AuthProvider, AuthSession};
use cardvault_core::error::{AuthErrorKind, CardvaultError, Result};
use chrono::{DateTime, Duration, TimeZone, Utc};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tokio::sync::{Mutex, RwLock};

use crate::http::{REQUEST_TIMEOUT, check_response, request_error};
use crate::storage::write_atomic_private;

/// Lifetime assumed when the token response carries no expiry.
const DEFAULT_TOKEN_LIFETIME_SECS: i64 = 3600;

#[derive(Debug, Serialize)]
struct PasswordGrant<'a> {
    email: &'a str,
    password: &'a str,
}

#[derive(Debug, Serialize)]
struct RefreshGrant<'a> {
    refresh_token: &'a str,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    refresh_token: String,
    #[serde(default)]
    expires_in: Option<i64>,
    /// Unix seconds.
    #[serde(default)]
    expires_at: Option<i64>,
    #[serde(default)]
    user: Option<UserInfo>,
}

#[derive(Debug, Deserialize)]
struct UserInfo {
    #[serde(default)]
    email: Option<String>,
}

impl TokenResponse {
    fn into_session(self, now: DateTime<Utc>) -> AuthSession {
        let expires_at = self
            .expires_at
            .and_then(|secs| Utc.timestamp_opt(secs, 0).single())
            .unwrap_or_else(|| {
                now + Duration::seconds(self.expires_in.unwrap_or(DEFAULT_TOKEN_LIFETIME_SECS))
            });
        AuthSession {
            access_token: self.access_token,
            refresh_token: self.refresh_token,
            expires_at,
            user_email: self.user.and_then(|user| user.email),
        }
    }
}

/// Auth provider talking to `<api_url>/auth/v1`.
#[derive(Clone)]
pub struct GoTrueAuthProvider {
    client: Client,
    auth_url: String,
    anon_key: String,
    session_file: Option<PathBuf>,
    session: Arc<RwLock<Option<AuthSession>>>,
    /// Serializes refreshes so concurrent callers do not spend the same refresh token twice.
    refresh_lock: Arc<Mutex<()>>,
}

impl GoTrueAuthProvider {
    /// Creates a provider, restoring the session stored at `session_file` if any.
    pub fn new(api_url: &str, anon_key: impl Into<String>, session_file: Option<PathBuf>) -> Self {
        let restored = session_file.as_deref().and_then(read_session_file);
        Self {
            client: Client::new(),
            auth_url: format!("{}/auth/v1", api_url.trim_end_matches('/')),
            anon_key: anon_key.into(),
            session_file,
            session: Arc::new(RwLock::new(restored)),
            refresh_lock: Arc::new(Mutex::new(())),
        }
    }

    /// Signs in with email and password and stores the new session.
    pub async fn sign_in_with_password(&self, email: &str, password: &str) -> Result<AuthSession> {
        if email.trim().is_empty() || password.is_empty() {
            return Err(CardvaultError::validation("Email and password are required"));
        }

        let session = self
            .token_request("password", &PasswordGrant {
                email: email.trim(),
                password,
            })
            .await?;
        self.store_session(Some(session.clone())).await?;

        tracing::info!(email = %email.trim(), expires_at = %session.expires_at, "Signed in");
        Ok(session)
    }

    /// Revokes the session remotely (best effort) and forgets it locally.
    pub async fn sign_out(&self) -> Result<()> {
        let current = self.session.read().await.clone();
        if let Some(session) = current {
            let result = self
                .client
                .post(format!("{}/logout", self.auth_url))
                .header("apikey", &self.anon_key)
                .header("Authorization", format!("Bearer {}", session.access_token))
                .timeout(REQUEST_TIMEOUT)
                .send()
                .await;
            match result {
                Ok(response) if !response.status().is_success() => {
                    tracing::warn!(status = %response.status(), "Remote sign-out rejected");
                }
                Err(e) => tracing::warn!(error = %e, "Remote sign-out failed"),
                Ok(_) => {}
            }
        }
        self.store_session(None).await
    }

    async fn token_request<B: Serialize + Sync>(&self, grant_type: &str, body: &B) -> Result<AuthSession> {
        let response = self
            .client
            .post(format!("{}/token", self.auth_url))
            .query(&[("grant_type", grant_type)])
            .header("apikey", &self.anon_key)
            .json(body)
            .timeout(REQUEST_TIMEOUT)
            .send()
            .await
            .map_err(|e| request_error("Auth request failed", e))?;
        let response = check_response(response).await?;

        let token: TokenResponse = response
            .json()
            .await
            .map_err(|e| request_error("Failed to parse auth response", e))?;
        Ok(token.into_session(Utc::now()))
    }

    async fn store_session(&self, session: Option<AuthSession>) -> Result<()> {
        if let Some(path) = &self.session_file {
            match &session {
                Some(session) => write_session_file(path, session)?,
                None => match fs::remove_file(path) {
                    Ok(()) => {}
                    Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                    Err(e) => return Err(e.into()),
                },
            }
        }
        *self.session.write().await = session;
        Ok(())
    }
}

#[async_trait]
impl AuthProvider for GoTrueAuthProvider {
    async fn current_session(&self) -> Result<Option<AuthSession>> {
        Ok(self.session.read().await.clone())
    }

    async fn refresh_session(&self) -> Result<AuthSession> {
        let _guard = self.refresh_lock.lock().await;
        let current = self
            .session
            .read()
            .await
            .clone()
            .ok_or(CardvaultError::Unauthenticated)?;

        let refreshed = self
            .token_request("refresh_token", &RefreshGrant {
                refresh_token: &current.refresh_token,
            })
            .await;

        match refreshed {
            Ok(session) => {
                self.store_session(Some(session.clone())).await?;
                tracing::debug!(expires_at = %session.expires_at, "Session refreshed");
                Ok(session)
            }
            Err(CardvaultError::Remote {
                status: 400 | 401,
                message,
                ..
            }) => {
                tracing::warn!(%message, "Refresh token rejected, signing out locally");
                self.store_session(None).await?;
                Err(CardvaultError::auth(AuthErrorKind::InvalidToken, message))
            }
            Err(e) => Err(e),
        }
    }
}

impl std::fmt::Debug for GoTrueAuthProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GoTrueAuthProvider")
            .field("auth_url", &self.auth_url)
            .field("session_file", &self.session_file)
            .finish_non_exhaustive()
    }
}

fn read_session_file(path: &Path) -> Option<AuthSession> {
    let content = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return None,
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "Failed to read session file");
            return None;
        }
    };
    match serde_json::from_str(&content) {
        Ok(session) => Some(session),
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "Ignoring unreadable session file");
            None
        }
    }
}

fn write_session_file(path: &Path, session: &AuthSession) -> Result<()> {
    let json = serde_json::to_string_pretty(session)?;
    write_atomic_private(path, json.as_bytes())
}
