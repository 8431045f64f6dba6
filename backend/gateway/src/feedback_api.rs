//! Helpfulness feedback on the last explanation.

use axum::Json;
use axum::extract::{Extension, State};
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::instrument;

use logging::{EventLogger, StudyEvent};
use studymate_core::{FeedbackEntry, StudyError, Verdict};

use crate::error::{ApiError, failed};
use crate::server::GatewayState;
use crate::session::SessionHandle;

#[derive(Debug, Deserialize)]
pub struct FeedbackBody {
    pub helpful: bool,
    #[serde(default)]
    pub message: Option<String>,
}

/// `POST /api/feedback`
#[instrument(skip_all, fields(session_id = %session.id))]
pub async fn submit(
    State(state): State<GatewayState>,
    Extension(session): Extension<SessionHandle>,
    Json(body): Json<FeedbackBody>,
) -> Result<Json<Value>, ApiError> {
    let ctx = session.context.lock().await;
    let last = ctx.last_explanation.as_ref().ok_or_else(|| {
        failed(
            &session,
            "feedback",
            StudyError::ValidationFailure("Ask for an explanation before rating it".into()),
        )
    })?;

    let verdict = if body.helpful { Verdict::Helpful } else { Verdict::NotHelpful };
    let mut entry = FeedbackEntry::new(&last.subject, verdict);
    entry.explanation = Some(last.result.raw_text.clone());
    entry.message = body.message.filter(|m| !m.trim().is_empty());
    entry.user_id = ctx.auth.as_ref().map(|a| a.user_id.clone());
    let principal = ctx.auth.as_ref().map(|a| a.principal());

    let sink = &state.services.feedback;
    sink.submit(&entry, principal.as_ref())
        .await
        .map_err(|e| failed(&session, "feedback", e))?;

    EventLogger::log_event(
        &session.id,
        StudyEvent::FeedbackSubmitted {
            helpful: verdict.is_helpful(),
            sink: sink.name().to_string(),
        },
    );
    Ok(Json(json!({ "status": "ok", "message": "Thanks for your feedback!" })))
}
