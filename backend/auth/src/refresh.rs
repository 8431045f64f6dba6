//! Single refresh-and-retry for calls rejected with an expired token.

use std::future::Future;

use async_trait::async_trait;
use tracing::warn;

use studymate_core::{Principal, StudyError};

use crate::error::AuthError;
use crate::session::AuthSession;

/// Exchanges a refresh token for a new session.
#[async_trait]
pub trait SessionRefresher: Send + Sync {
    async fn refresh_session(&self, refresh_token: &str) -> Result<AuthSession, AuthError>;
}

/// Run `op` with the session's principal. If it fails with
/// [`StudyError::AuthExpired`], refresh the session once and retry once.
///
/// A failed refresh surfaces the original expiry error. Any other failure,
/// or a failure of the retry, is returned unchanged. On a successful refresh
/// `session` holds the new tokens.
pub async fn with_session_refresh<T, F, Fut>(
    session: &mut AuthSession,
    refresher: &dyn SessionRefresher,
    mut op: F,
) -> Result<T, StudyError>
where
    F: FnMut(Principal) -> Fut,
    Fut: Future<Output = Result<T, StudyError>>,
{
    match op(session.principal()).await {
        Err(err) if err.is_auth_expired() => {
            warn!(user_id = %session.user_id, "Access token expired; refreshing session");
            match refresher.refresh_session(&session.refresh_token).await {
                Ok(fresh) => {
                    *session = fresh;
                    op(session.principal()).await
                }
                Err(refresh_err) => {
                    warn!(error = %refresh_err, "Session refresh failed");
                    Err(err)
                }
            }
        }
        other => other,
    }
}
