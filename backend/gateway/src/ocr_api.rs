//! Image upload to text.

use axum::Json;
use axum::body::Bytes;
use axum::extract::{Extension, State};
use serde_json::{Value, json};
use tracing::instrument;

use studymate_core::StudyError;

use crate::error::{ApiError, failed};
use crate::server::GatewayState;
use crate::session::SessionHandle;

/// Largest accepted upload.
pub const MAX_IMAGE_BYTES: usize = 10 * 1024 * 1024;

pub const NO_TEXT_FOUND: &str =
    "Couldn't extract text from image. Please try another image or enter text manually.";

/// `POST /api/ocr` with the raw image as the body.
#[instrument(skip_all, fields(session_id = %session.id, bytes = image.len()))]
pub async fn extract(
    State(state): State<GatewayState>,
    Extension(session): Extension<SessionHandle>,
    image: Bytes,
) -> Result<Json<Value>, ApiError> {
    if image.is_empty() {
        return Err(failed(
            &session,
            "ocr",
            StudyError::ValidationFailure("Please upload an image".into()),
        ));
    }
    let text = state
        .services
        .ocr
        .extract_text(&image)
        .await
        .map_err(|e| failed(&session, "ocr", e))?;

    if text.is_empty() {
        return Ok(Json(json!({ "text": "", "message": NO_TEXT_FOUND })));
    }
    Ok(Json(json!({ "text": text })))
}
