use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use studymate_core::Principal;

/// A signed-in user's tokens as issued by the auth provider.
#[derive(Clone, Serialize, Deserialize)]
pub struct AuthSession {
    pub user_id: String,
    pub email: Option<String>,
    pub access_token: String,
    pub refresh_token: String,
    pub expires_at: Option<DateTime<Utc>>,
}

impl AuthSession {
    /// Identity used to scope remote note and feedback rows.
    pub fn principal(&self) -> Principal {
        Principal {
            user_id: self.user_id.clone(),
            access_token: self.access_token.clone(),
        }
    }
}

impl fmt::Debug for AuthSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthSession")
            .field("user_id", &self.user_id)
            .field("email", &self.email)
            .field("access_token", &"***")
            .field("refresh_token", &"***")
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn debug_hides_tokens() {
        let session = AuthSession {
            user_id: "u1".into(),
            email: None,
            access_token: "eyJsecret".into(),
            refresh_token: "refresh-secret".into(),
            expires_at: None,
        };
        let printed = format!("{session:?}");
        assert!(!printed.contains("secret"));
        assert_eq!(session.principal().user_id, "u1");
    }
}
