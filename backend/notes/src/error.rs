use studymate_core::{NoteId, StudyError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("{0}")]
    Validation(String),

    #[error("note {0} not found")]
    NotFound(NoteId),

    /// Unreadable file, failed write, or a non-2xx answer from the database.
    #[error("persistence failure: {0}")]
    Persistence(String),

    /// Remote store called without a signed-in user.
    #[error("not signed in")]
    AuthRequired,

    #[error("session expired: {0}")]
    AuthExpired(String),

    /// The database could not be reached at all.
    #[error("transport error: {0}")]
    Transport(String),
}

impl From<StoreError> for StudyError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Validation(msg) => StudyError::ValidationFailure(msg),
            StoreError::NotFound(_) => StudyError::NotFound("Note".to_string()),
            StoreError::Persistence(msg) => StudyError::PersistenceFailure(msg),
            StoreError::AuthRequired => {
                StudyError::AuthFailure("Please log in to manage your notes".to_string())
            }
            StoreError::AuthExpired(msg) => StudyError::AuthExpired(msg),
            StoreError::Transport(msg) => StudyError::RemoteFailure(msg),
        }
    }
}
