//! Error types for Cardvault.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Authentication failure classes reported by the remote store.
///
/// The retry wrapper decides on these kinds, never on message text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthErrorKind {
    /// No credential was available for the request.
    MissingCredentials,
    /// The access token was rejected because it expired.
    TokenExpired,
    /// The access token was malformed or signed with an unknown key.
    InvalidToken,
    /// The request was rejected by a permission or row-level policy.
    PermissionDenied,
}

impl AuthErrorKind {
    /// Whether a credential refresh can plausibly fix this failure.
    pub fn is_refreshable(self) -> bool {
        !matches!(self, Self::MissingCredentials)
    }
}

/// Coarse classification used by callers that branch on failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    NotFound,
    Validation,
    Auth(AuthErrorKind),
    SessionExpired,
    Unauthenticated,
    Remote,
    Storage,
    Cancelled,
    Internal,
}

/// The shared error type for every Cardvault crate.
#[derive(Error, Debug, Clone)]
pub enum CardvaultError {
    /// Entity not found error with type information
    #[error("Entity not found: {entity_type} '{id}'")]
    NotFound {
        entity_type: &'static str,
        id: String,
    },

    /// Input rejected before any remote call
    #[error("Validation error: {0}")]
    Validation(String),

    /// Remote store rejected the credential
    #[error("Authentication error ({kind:?}): {message}")]
    Auth { kind: AuthErrorKind, message: String },

    /// Session expired beyond the refresh grace period
    #[error("Session expired, log in again")]
    SessionExpired,

    /// No session is available
    #[error("Not signed in")]
    Unauthenticated,

    /// Remote store failure that is not auth related
    #[error("Remote error (status {status}{}): {message}", code_suffix(.code))]
    Remote {
        status: u16,
        code: Option<String>,
        message: String,
    },

    /// IO error (local file system operations)
    #[error("IO error: {message}")]
    Io { message: String },

    /// Serialization/deserialization error
    #[error("Serialization error: {format} - {message}")]
    Serialization { format: String, message: String },

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Operation was cancelled by the caller
    #[error("Operation cancelled")]
    Cancelled,

    /// Internal error (should not happen in normal operation)
    #[error("Internal error: {0}")]
    Internal(String),
}

impl CardvaultError {
    // ============================================================================
    // Constructor helpers
    // ============================================================================

    /// Creates a NotFound error
    pub fn not_found(entity_type: &'static str, id: impl Into<String>) -> Self {
        Self::NotFound {
            entity_type,
            id: id.into(),
        }
    }

    /// Creates a Validation error
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Creates an Auth error
    pub fn auth(kind: AuthErrorKind, message: impl Into<String>) -> Self {
        Self::Auth {
            kind,
            message: message.into(),
        }
    }

    /// Creates a Remote error
    pub fn remote(status: u16, code: Option<String>, message: impl Into<String>) -> Self {
        Self::Remote {
            status,
            code,
            message: message.into(),
        }
    }

    /// Creates an IO error
    pub fn io(message: impl Into<String>) -> Self {
        Self::Io {
            message: message.into(),
        }
    }

    /// Creates a Config error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Creates an Internal error
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    // ============================================================================
    // Type checking methods
    // ============================================================================

    /// Returns the taxonomy bucket of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::NotFound { .. } => ErrorKind::NotFound,
            Self::Validation(_) => ErrorKind::Validation,
            Self::Auth { kind, .. } => ErrorKind::Auth(*kind),
            Self::SessionExpired => ErrorKind::SessionExpired,
            Self::Unauthenticated => ErrorKind::Unauthenticated,
            Self::Remote { .. } => ErrorKind::Remote,
            Self::Io { .. } | Self::Serialization { .. } | Self::Config(_) => ErrorKind::Storage,
            Self::Cancelled => ErrorKind::Cancelled,
            Self::Internal(_) => ErrorKind::Internal,
        }
    }

    /// Check if this is a NotFound error
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// Check if this is a Validation error
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }

    /// Check if a credential refresh followed by a retry may succeed.
    pub fn is_auth_retryable(&self) -> bool {
        matches!(self.kind(), ErrorKind::Auth(kind) if kind.is_refreshable())
    }
}

// ============================================================================
// From implementations for automatic conversion
// ============================================================================

impl From<std::io::Error> for CardvaultError {
    fn from(err: std::io::Error) -> Self {
        Self::Io {
            message: format!("{} (kind: {:?})", err, err.kind()),
        }
    }
}

impl From<serde_json::Error> for CardvaultError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization {
            format: "JSON".to_string(),
            message: err.to_string(),
        }
    }
}

impl From<toml::de::Error> for CardvaultError {
    fn from(err: toml::de::Error) -> Self {
        Self::Serialization {
            format: "TOML".to_string(),
            message: err.to_string(),
        }
    }
}

impl From<toml::ser::Error> for CardvaultError {
    fn from(err: toml::ser::Error) -> Self {
        Self::Serialization {
            format: "TOML".to_string(),
            message: err.to_string(),
        }
    }
}

fn code_suffix(code: &Option<String>) -> String {
    code.as_deref()
        .map(|c| format!(", code {c}"))
        .unwrap_or_default()
}

/// A type alias for `Result<T, CardvaultError>`.
pub type Result<T> = std::result::Result<T, CardvaultError>;
