use studymate_core::StudyError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AuthError {
    /// Form input rejected before any remote call.
    #[error("{0}")]
    Validation(String),

    #[error("Invalid email or password")]
    InvalidCredentials,

    #[error("This email is already registered")]
    AlreadyRegistered,

    #[error("Connection failed. Please check your Supabase configuration.")]
    Connection(String),

    /// Any other rejection, carrying the provider's message.
    #[error("{0}")]
    Rejected(String),

    /// The provider answered with something that is not a session.
    #[error("unexpected auth response: {0}")]
    Malformed(String),
}

impl AuthError {
    /// Classify a provider error message.
    pub(crate) fn from_provider_message(message: &str) -> Self {
        let lower = message.to_lowercase();
        if lower.contains("invalid login") {
            AuthError::InvalidCredentials
        } else if lower.contains("already registered") {
            AuthError::AlreadyRegistered
        } else {
            AuthError::Rejected(message.to_string())
        }
    }
}

impl From<AuthError> for StudyError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::Validation(msg) => StudyError::ValidationFailure(msg),
            AuthError::Malformed(msg) => StudyError::RemoteFailure(msg),
            other => StudyError::AuthFailure(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn provider_messages_are_classified() {
        assert!(matches!(
            AuthError::from_provider_message("Invalid login credentials"),
            AuthError::InvalidCredentials
        ));
        assert!(matches!(
            AuthError::from_provider_message("User already registered"),
            AuthError::AlreadyRegistered
        ));
        let other = AuthError::from_provider_message("Email rate limit exceeded");
        assert_eq!(other.to_string(), "Email rate limit exceeded");
    }

    #[test]
    fn user_sees_mapped_message() {
        let err: StudyError = AuthError::InvalidCredentials.into();
        assert_eq!(err.user_message(), "Invalid email or password");
        let err: StudyError = AuthError::Connection("dns".into()).into();
        assert!(err.user_message().starts_with("Connection failed"));
    }
}
