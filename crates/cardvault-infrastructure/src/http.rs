//! Shared HTTP plumbing for the hosted backend: credentials and error mapping.

use std::sync::Arc;
use std::time::Duration;

use cardvault_core::auth::AuthProvider;
use cardvault_core::error::{AuthErrorKind, CardvaultError, Result};
use reqwest::{RequestBuilder, Response};
use serde::Deserialize;

/// Timeout applied to every backend request.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// PostgREST codes for a rejected or expired JWT.
const EXPIRED_JWT_CODES: [&str; 2] = ["PGRST301", "PGRST303"];

/// Postgres `insufficient_privilege`, raised by row-level security.
const INSUFFICIENT_PRIVILEGE: &str = "42501";

/// Credentials attached to backend requests.
///
/// Requests always carry the anonymous key as `apikey`. The bearer token is the
/// signed-in session's access token when there is one, else the anonymous key.
#[derive(Clone)]
pub struct ApiCredentials {
    anon_key: String,
    auth: Option<Arc<dyn AuthProvider>>,
}

impl ApiCredentials {
    pub fn anonymous(anon_key: impl Into<String>) -> Self {
        Self {
            anon_key: anon_key.into(),
            auth: None,
        }
    }

    pub fn with_auth(anon_key: impl Into<String>, auth: Arc<dyn AuthProvider>) -> Self {
        Self {
            anon_key: anon_key.into(),
            auth: Some(auth),
        }
    }

    pub fn anon_key(&self) -> &str {
        &self.anon_key
    }

    /// Returns the token to send as `Authorization: Bearer`.
    pub async fn bearer_token(&self) -> Result<String> {
        if let Some(auth) = &self.auth {
            if let Some(session) = auth.current_session().await? {
                return Ok(session.access_token);
            }
        }
        Ok(self.anon_key.clone())
    }

    /// Adds `apikey` and `Authorization` headers to `request`.
    pub async fn apply(&self, request: RequestBuilder) -> Result<RequestBuilder> {
        let token = self.bearer_token().await?;
        Ok(request
            .header("apikey", &self.anon_key)
            .header("Authorization", format!("Bearer {}", token)))
    }
}

impl std::fmt::Debug for ApiCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiCredentials")
            .field("anon_key", &"<redacted>")
            .field("auth", &self.auth.is_some())
            .finish()
    }
}

/// Error body returned by PostgREST, GoTrue, and the storage API.
///
/// The services disagree on field names, so every known spelling is accepted.
#[derive(Debug, Default, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    code: Option<serde_json::Value>,
    #[serde(default, alias = "error_code")]
    error: Option<String>,
    #[serde(default, alias = "msg", alias = "error_description")]
    message: Option<String>,
}

impl ErrorBody {
    fn code(&self) -> Option<String> {
        // GoTrue sends the HTTP status as a numeric `code`; prefer its text code.
        match &self.code {
            Some(serde_json::Value::String(code)) => Some(code.clone()),
            Some(serde_json::Value::Number(code)) => {
                self.error.clone().or_else(|| Some(code.to_string()))
            }
            _ => self.error.clone(),
        }
    }
}

/// Maps a failed response to the error taxonomy.
///
/// Auth failures are recognized by status and error code. Message text only
/// separates an expired token from an invalid one within a 401.
pub fn classify_error(status: u16, body: &str) -> CardvaultError {
    let parsed: ErrorBody = serde_json::from_str(body).unwrap_or_default();
    let code = parsed.code();
    let message = parsed
        .message
        .clone()
        .or_else(|| parsed.error.clone())
        .unwrap_or_else(|| {
            let trimmed = body.trim();
            if trimmed.is_empty() {
                "Unknown error".to_string()
            } else {
                trimmed.to_string()
            }
        });

    if status == 401 {
        let expired = code
            .as_deref()
            .is_some_and(|c| EXPIRED_JWT_CODES.contains(&c))
            || message.to_lowercase().contains("expired");
        let kind = if expired {
            AuthErrorKind::TokenExpired
        } else {
            AuthErrorKind::InvalidToken
        };
        return CardvaultError::auth(kind, message);
    }

    if status == 403 || code.as_deref() == Some(INSUFFICIENT_PRIVILEGE) {
        return CardvaultError::auth(AuthErrorKind::PermissionDenied, message);
    }

    CardvaultError::remote(status, code, message)
}

/// Returns the response when successful, else the classified error.
pub async fn check_response(response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response
        .text()
        .await
        .unwrap_or_else(|_| "Unknown error".to_string());
    Err(classify_error(status.as_u16(), &body))
}

/// Maps a transport-level failure (connect, timeout, decode).
pub fn request_error(context: &str, err: reqwest::Error) -> CardvaultError {
    let status = err.status().map(|s| s.as_u16()).unwrap_or(0);
    CardvaultError::remote(status, None, format!("{}: {}", context, err))
}
