//! Form checks run before any call to the auth provider.

use crate::error::AuthError;

pub const MIN_PASSWORD_LEN: usize = 6;

const EMPTY_FIELDS: &str = "Please fill in all fields";

pub fn validate_login(email: &str, password: &str) -> Result<(), AuthError> {
    if email.trim().is_empty() || password.is_empty() {
        return Err(AuthError::Validation(EMPTY_FIELDS.to_string()));
    }
    Ok(())
}

pub fn validate_signup(email: &str, password: &str, confirm: &str) -> Result<(), AuthError> {
    if email.trim().is_empty() || password.is_empty() || confirm.is_empty() {
        return Err(AuthError::Validation(EMPTY_FIELDS.to_string()));
    }
    if password != confirm {
        return Err(AuthError::Validation("Passwords do not match".to_string()));
    }
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(AuthError::Validation(format!(
            "Password must be at least {MIN_PASSWORD_LEN} characters long"
        )));
    }
    Ok(())
}
