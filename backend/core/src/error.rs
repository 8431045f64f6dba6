use thiserror::Error;

/// Top-level error type for a StudyMate user action.
///
/// Every crate-local error converts into one of these variants at the
/// boundary of the action that triggered it.
#[derive(Debug, Error)]
pub enum StudyError {
    /// Network error, timeout, non-2xx status, or malformed body from a remote API.
    #[error("remote failure: {0}")]
    RemoteFailure(String),

    /// Invalid credentials or a rejected session.
    #[error("authentication failed: {0}")]
    AuthFailure(String),

    /// The session token was rejected as expired; refresh once and retry.
    #[error("session expired: {0}")]
    AuthExpired(String),

    #[error("persistence failure: {0}")]
    PersistenceFailure(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("could not read image: {0}")]
    OcrFailure(String),

    #[error("{0}")]
    ValidationFailure(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl StudyError {
    /// True when the caller should refresh the session and retry once.
    pub fn is_auth_expired(&self) -> bool {
        matches!(self, StudyError::AuthExpired(_))
    }

    /// Message shown to the user at the boundary of a failed action.
    pub fn user_message(&self) -> String {
        match self {
            StudyError::RemoteFailure(_) => {
                "Could not reach the remote service. Please try again.".to_string()
            }
            StudyError::AuthFailure(msg) => msg.clone(),
            StudyError::AuthExpired(_) => "Your session has expired. Please log in again.".to_string(),
            StudyError::PersistenceFailure(_) => "Could not save your changes. Please try again.".to_string(),
            StudyError::NotFound(what) => format!("{what} was not found."),
            StudyError::OcrFailure(_) => {
                "Error processing image. Please try another image or enter text manually.".to_string()
            }
            StudyError::ValidationFailure(msg) => msg.clone(),
            StudyError::Config(msg) => format!("Configuration error: {msg}"),
            StudyError::Other(_) => "An unexpected error occurred.".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_message_is_shown_verbatim() {
        let err = StudyError::ValidationFailure("Please fill in all fields".into());
        assert_eq!(err.user_message(), "Please fill in all fields");
    }

    #[test]
    fn remote_failure_hides_details() {
        let err = StudyError::RemoteFailure("503 from upstream: secret body".into());
        assert!(!err.user_message().contains("secret"));
    }

    #[test]
    fn only_expired_sessions_are_retryable() {
        assert!(StudyError::AuthExpired("JWT expired".into()).is_auth_expired());
        assert!(!StudyError::AuthFailure("bad password".into()).is_auth_expired());
    }
}
