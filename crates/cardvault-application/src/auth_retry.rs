//! Authenticated-mutation retry wrapper.

use std::future::Future;
use std::sync::Arc;

use cardvault_core::auth::{AuthProvider, DEFAULT_REFRESH_GRACE_SECS};
use cardvault_core::error::{CardvaultError, Result};
use chrono::{Duration, Utc};

/// Runs remote mutations with a usable session and at most one refresh.
///
/// Before the first attempt the session must exist and must not have expired
/// more than `grace` ago. A failure classified as a refreshable auth error
/// triggers one session refresh and one retry. Errors from the refresh or the
/// retry are returned as they are.
#[derive(Clone)]
pub struct AuthRetry {
    auth: Arc<dyn AuthProvider>,
    grace: Duration,
}

impl AuthRetry {
    pub fn new(auth: Arc<dyn AuthProvider>) -> Self {
        Self {
            auth,
            grace: Duration::seconds(DEFAULT_REFRESH_GRACE_SECS),
        }
    }

    pub fn with_grace(mut self, grace: Duration) -> Self {
        self.grace = grace;
        self
    }

    pub fn grace(&self) -> Duration {
        self.grace
    }

    /// Runs `operation`, refreshing the session and retrying once on auth failure.
    pub async fn run<T, F, Fut>(&self, operation: F) -> Result<T>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        self.ensure_session().await?;

        match operation().await {
            Err(e) if e.is_auth_retryable() => {
                tracing::info!(error = %e, "Auth failure, refreshing session and retrying once");
                self.auth.refresh_session().await?;
                operation().await
            }
            result => result,
        }
    }

    async fn ensure_session(&self) -> Result<()> {
        let session = self
            .auth
            .current_session()
            .await?
            .ok_or(CardvaultError::Unauthenticated)?;

        if session.is_expired_beyond(self.grace, Utc::now()) {
            tracing::warn!(expires_at = %session.expires_at, "Session expired beyond grace period");
            return Err(CardvaultError::SessionExpired);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use cardvault_core::auth::AuthSession;
    use cardvault_core::error::AuthErrorKind;
    use chrono::DateTime;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    // Mock AuthProvider with a fixed session and a counted refresh
    struct MockAuthProvider {
        session: Mutex<Option<AuthSession>>,
        refreshes: AtomicUsize,
        refresh_error: Option<CardvaultError>,
    }

    impl MockAuthProvider {
        fn expiring_at(expires_at: DateTime<Utc>) -> Self {
            Self {
                session: Mutex::new(Some(AuthSession {
                    access_token: "access".to_string(),
                    refresh_token: "refresh".to_string(),
                    expires_at,
                    user_email: None,
                })),
                refreshes: AtomicUsize::new(0),
                refresh_error: None,
            }
        }

        fn signed_out() -> Self {
            Self {
                session: Mutex::new(None),
                refreshes: AtomicUsize::new(0),
                refresh_error: None,
            }
        }
    }

    #[async_trait]
    impl AuthProvider for MockAuthProvider {
        async fn current_session(&self) -> Result<Option<AuthSession>> {
            Ok(self.session.lock().unwrap().clone())
        }

        async fn refresh_session(&self) -> Result<AuthSession> {
            self.refreshes.fetch_add(1, Ordering::SeqCst);
            if let Some(err) = &self.refresh_error {
                return Err(err.clone());
            }
            let mut session = self.session.lock().unwrap();
            let refreshed = AuthSession {
                access_token: "refreshed".to_string(),
                refresh_token: "refresh-2".to_string(),
                expires_at: Utc::now() + Duration::hours(1),
                user_email: None,
            };
            *session = Some(refreshed.clone());
            Ok(refreshed)
        }
    }

    fn fresh() -> Arc<MockAuthProvider> {
        Arc::new(MockAuthProvider::expiring_at(Utc::now() + Duration::minutes(30)))
    }

    fn expired_jwt() -> CardvaultError {
        CardvaultError::auth(AuthErrorKind::TokenExpired, "JWT expired")
    }

    #[tokio::test]
    async fn test_success_needs_no_refresh() {
        let auth = fresh();
        let retry = AuthRetry::new(auth.clone());
        let calls = AtomicUsize::new(0);

        let value = retry
            .run(|| async {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok(7)
            })
            .await
            .unwrap();

        assert_eq!(value, 7);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(auth.refreshes.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_auth_failure_refreshes_and_retries_once() {
        let auth = fresh();
        let retry = AuthRetry::new(auth.clone());
        let calls = AtomicUsize::new(0);

        let value = retry
            .run(|| async {
                if calls.fetch_add(1, Ordering::SeqCst) == 0 {
                    Err(expired_jwt())
                } else {
                    Ok("saved")
                }
            })
            .await
            .unwrap();

        assert_eq!(value, "saved");
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(auth.refreshes.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_persistent_auth_failure_is_bounded() {
        let auth = fresh();
        let retry = AuthRetry::new(auth.clone());
        let calls = AtomicUsize::new(0);

        let err = retry
            .run(|| async {
                calls.fetch_add(1, Ordering::SeqCst);
                Err::<(), _>(CardvaultError::auth(AuthErrorKind::PermissionDenied, "rls"))
            })
            .await
            .unwrap_err();

        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(auth.refreshes.load(Ordering::SeqCst), 1);
        assert!(matches!(
            err,
            CardvaultError::Auth {
                kind: AuthErrorKind::PermissionDenied,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn test_non_auth_error_is_not_retried() {
        let auth = fresh();
        let retry = AuthRetry::new(auth.clone());
        let calls = AtomicUsize::new(0);

        let err = retry
            .run(|| async {
                calls.fetch_add(1, Ordering::SeqCst);
                Err::<(), _>(CardvaultError::remote(500, None, "JWT expired somewhere"))
            })
            .await
            .unwrap_err();

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(auth.refreshes.load(Ordering::SeqCst), 0);
        assert!(!err.is_auth_retryable());
    }

    #[tokio::test]
    async fn test_missing_credentials_are_not_retried() {
        let auth = fresh();
        let retry = AuthRetry::new(auth.clone());

        let err = retry
            .run(|| async {
                Err::<(), _>(CardvaultError::auth(AuthErrorKind::MissingCredentials, "none"))
            })
            .await
            .unwrap_err();

        assert!(matches!(err, CardvaultError::Auth { .. }));
        assert_eq!(auth.refreshes.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_refresh_error_is_returned_verbatim() {
        let auth = Arc::new(MockAuthProvider {
            refresh_error: Some(CardvaultError::auth(
                AuthErrorKind::InvalidToken,
                "Invalid Refresh Token",
            )),
            ..MockAuthProvider::expiring_at(Utc::now() + Duration::minutes(1))
        });
        let retry = AuthRetry::new(auth.clone());
        let calls = AtomicUsize::new(0);

        let err = retry
            .run(|| async {
                calls.fetch_add(1, Ordering::SeqCst);
                Err::<(), _>(expired_jwt())
            })
            .await
            .unwrap_err();

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(
            err.to_string(),
            "Authentication error (InvalidToken): Invalid Refresh Token"
        );
    }

    #[tokio::test]
    async fn test_session_expired_beyond_grace_fails_fast() {
        let auth = Arc::new(MockAuthProvider::expiring_at(
            Utc::now() - Duration::minutes(6),
        ));
        let retry = AuthRetry::new(auth.clone());
        let calls = AtomicUsize::new(0);

        let err = retry
            .run(|| async {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok(())
            })
            .await
            .unwrap_err();

        assert!(matches!(err, CardvaultError::SessionExpired));
        assert_eq!(err.to_string(), "Session expired, log in again");
        assert_eq!(calls.load(Ordering::SeqCst), 0);
        assert_eq!(auth.refreshes.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_session_expired_within_grace_proceeds() {
        let auth = Arc::new(MockAuthProvider::expiring_at(
            Utc::now() - Duration::minutes(2),
        ));
        let retry = AuthRetry::new(auth.clone());

        assert!(retry.run(|| async { Ok(()) }).await.is_ok());
    }

    #[tokio::test]
    async fn test_custom_grace() {
        let auth = Arc::new(MockAuthProvider::expiring_at(
            Utc::now() - Duration::minutes(2),
        ));
        let retry = AuthRetry::new(auth).with_grace(Duration::seconds(30));

        let err = retry.run(|| async { Ok(()) }).await.unwrap_err();
        assert!(matches!(err, CardvaultError::SessionExpired));
    }

    #[tokio::test]
    async fn test_signed_out_is_unauthenticated() {
        let retry = AuthRetry::new(Arc::new(MockAuthProvider::signed_out()));
        let err = retry.run(|| async { Ok(()) }).await.unwrap_err();
        assert!(matches!(err, CardvaultError::Unauthenticated));
    }
}
