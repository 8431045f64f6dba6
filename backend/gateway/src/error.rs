//! Failure boundary for user actions.
//!
//! Every handler error ends up here as JSON `{ "error": message }` with a
//! status derived from the [`StudyError`] variant. Internal detail goes to
//! the log, never to the response.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use tracing::{error, warn};

use logging::{EventLogger, StudyEvent};
use studymate_core::StudyError;

use crate::session::SessionHandle;

#[derive(Debug)]
pub struct ApiError {
    pub error: StudyError,
    message: Option<String>,
}

impl ApiError {
    /// Replace the default user-facing message.
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    pub fn status(&self) -> StatusCode {
        status_for(&self.error)
    }

    pub fn message(&self) -> String {
        self.message
            .clone()
            .unwrap_or_else(|| self.error.user_message())
    }
}

impl<E: Into<StudyError>> From<E> for ApiError {
    fn from(err: E) -> Self {
        Self {
            error: err.into(),
            message: None,
        }
    }
}

pub fn status_for(err: &StudyError) -> StatusCode {
    match err {
        StudyError::ValidationFailure(_) => StatusCode::BAD_REQUEST,
        StudyError::AuthFailure(_) | StudyError::AuthExpired(_) => StatusCode::UNAUTHORIZED,
        StudyError::NotFound(_) => StatusCode::NOT_FOUND,
        StudyError::RemoteFailure(_) | StudyError::OcrFailure(_) => StatusCode::BAD_GATEWAY,
        StudyError::PersistenceFailure(_) | StudyError::Config(_) | StudyError::Other(_) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!(error = %self.error, %status, "Request failed");
        } else {
            warn!(error = %self.error, %status, "Request rejected");
        }
        (status, Json(json!({ "error": self.message() }))).into_response()
    }
}

/// Record a failed action as a study event and turn it into a response error.
pub fn failed(session: &SessionHandle, action: &str, err: impl Into<StudyError>) -> ApiError {
    let err = ApiError::from(err.into());
    EventLogger::log_event(
        &session.id,
        StudyEvent::Failure {
            action: action.to_string(),
            error_msg: err.error.to_string(),
        },
    );
    err
}
