//! Sign-in, sign-up and session refresh against a hosted GoTrue auth service.

pub mod client;
pub mod error;
pub mod refresh;
pub mod session;
pub mod validation;

pub use client::{HostedAuthClient, SignUpOutcome};
pub use error::AuthError;
pub use refresh::{with_session_refresh, SessionRefresher};
pub use session::AuthSession;
pub use validation::{validate_login, validate_signup, MIN_PASSWORD_LEN};
