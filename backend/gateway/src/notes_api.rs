//! Note endpoints.
//!
//! Calls to the store run through [`scoped`], which supplies the signed-in
//! principal and transparently refreshes an expired session once.

use std::future::Future;

use axum::Json;
use axum::extract::{Extension, Path, State};
use axum::http::{StatusCode, header};
use axum::response::IntoResponse;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::instrument;

use logging::{EventLogger, StudyEvent};
use studymate_auth::with_session_refresh;
use studymate_core::{Note, NoteId, Principal, StudyError};

use crate::error::{ApiError, failed};
use crate::server::GatewayState;
use crate::session::SessionHandle;
use crate::session_registry::SessionContext;

pub const EXPORT_FILENAME: &str = "StudyMate_Notes.pdf";

/// Run a store operation as the session's user.
///
/// With a hosted auth client, an `AuthExpired` failure refreshes the
/// session once and retries once. Without a signed-in user `op` receives
/// `None`.
pub(crate) async fn scoped<T, F, Fut>(
    state: &GatewayState,
    ctx: &mut SessionContext,
    mut op: F,
) -> Result<T, StudyError>
where
    F: FnMut(Option<Principal>) -> Fut,
    Fut: Future<Output = Result<T, StudyError>>,
{
    match (ctx.auth.as_mut(), state.services.auth.as_deref()) {
        (Some(session), Some(client)) => {
            with_session_refresh(session, client, |principal| op(Some(principal))).await
        }
        (Some(session), None) => op(Some(session.principal())).await,
        (None, _) => op(None).await,
    }
}

fn lines_to_html(lines: &[String]) -> String {
    let mut html = String::from("<ul class=\"note-lines\">\n");
    for line in lines {
        html.push_str("<li>");
        html.push_str(&markdown::to_html(line));
        html.push_str("</li>\n");
    }
    html.push_str("</ul>\n");
    html
}

#[derive(Debug, Serialize)]
pub struct NoteView {
    pub id: NoteId,
    pub question: String,
    pub content: Vec<String>,
    /// Content lines run through the math pipeline, as a bullet list.
    pub html: String,
    pub created_at: Option<DateTime<Utc>>,
    pub editing: bool,
}

impl NoteView {
    fn new(note: Note, ctx: &SessionContext) -> Self {
        Self {
            editing: ctx.editing.contains(&note.id),
            html: lines_to_html(&note.content),
            id: note.id,
            question: note.question,
            content: note.content,
            created_at: note.created_at,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct CreateNoteBody {
    /// Defaults to the subject of the last explanation.
    #[serde(default)]
    pub question: Option<String>,
    pub text: String,
}

#[derive(Debug, Deserialize)]
pub struct UpdateNoteBody {
    pub text: String,
}

/// `GET /api/notes`
#[instrument(skip_all, fields(session_id = %session.id))]
pub async fn list(
    State(state): State<GatewayState>,
    Extension(session): Extension<SessionHandle>,
) -> Result<Json<Value>, ApiError> {
    let mut ctx = session.context.lock().await;
    let store = state.services.notes.clone();
    let notes = scoped(&state, &mut ctx, |principal| {
        let store = store.clone();
        async move { Ok(store.list(principal.as_ref()).await?) }
    })
    .await
    .map_err(|e| failed(&session, "list_notes", e))?;

    let views: Vec<NoteView> = notes.into_iter().map(|n| NoteView::new(n, &ctx)).collect();
    Ok(Json(json!({ "backend": store.backend(), "notes": views })))
}

/// `POST /api/notes`
#[instrument(skip_all, fields(session_id = %session.id))]
pub async fn create(
    State(state): State<GatewayState>,
    Extension(session): Extension<SessionHandle>,
    Json(body): Json<CreateNoteBody>,
) -> Result<(StatusCode, Json<NoteView>), ApiError> {
    let mut ctx = session.context.lock().await;
    let question = body
        .question
        .filter(|q| !q.trim().is_empty())
        .or_else(|| ctx.last_explanation.as_ref().map(|last| last.subject.clone()))
        .unwrap_or_default();

    let store = state.services.notes.clone();
    let note = scoped(&state, &mut ctx, |principal| {
        let store = store.clone();
        let question = question.clone();
        let text = body.text.clone();
        async move { Ok(store.create(principal.as_ref(), &question, &text).await?) }
    })
    .await
    .map_err(|e| failed(&session, "save_note", e))?;

    EventLogger::log_event(
        &session.id,
        StudyEvent::NoteSaved {
            note_id: note.id.to_string(),
            lines: note.content.len(),
        },
    );
    Ok((StatusCode::CREATED, Json(NoteView::new(note, &ctx))))
}

/// `PUT /api/notes/:id`
#[instrument(skip_all, fields(session_id = %session.id, note_id = %id))]
pub async fn update(
    State(state): State<GatewayState>,
    Extension(session): Extension<SessionHandle>,
    Path(id): Path<NoteId>,
    Json(body): Json<UpdateNoteBody>,
) -> Result<Json<NoteView>, ApiError> {
    let mut ctx = session.context.lock().await;
    let store = state.services.notes.clone();
    let note = scoped(&state, &mut ctx, |principal| {
        let store = store.clone();
        let text = body.text.clone();
        async move { Ok(store.update(principal.as_ref(), id, &text).await?) }
    })
    .await
    .map_err(|e| failed(&session, "update_note", e))?;

    ctx.editing.remove(&id);
    EventLogger::log_event(
        &session.id,
        StudyEvent::NoteSaved {
            note_id: id.to_string(),
            lines: note.content.len(),
        },
    );
    Ok(Json(NoteView::new(note, &ctx)))
}

/// `DELETE /api/notes/:id`
#[instrument(skip_all, fields(session_id = %session.id, note_id = %id))]
pub async fn delete(
    State(state): State<GatewayState>,
    Extension(session): Extension<SessionHandle>,
    Path(id): Path<NoteId>,
) -> Result<Json<Value>, ApiError> {
    let mut ctx = session.context.lock().await;
    let store = state.services.notes.clone();
    scoped(&state, &mut ctx, |principal| {
        let store = store.clone();
        async move { Ok(store.delete(principal.as_ref(), id).await?) }
    })
    .await
    .map_err(|e| failed(&session, "delete_note", e))?;

    ctx.editing.remove(&id);
    EventLogger::log_event(&session.id, StudyEvent::NoteDeleted { note_id: id.to_string() });
    Ok(Json(json!({ "status": "deleted", "id": id })))
}

/// `POST /api/notes/:id/edit`: open or close a note for editing.
pub async fn toggle_edit(
    Extension(session): Extension<SessionHandle>,
    Path(id): Path<NoteId>,
) -> Json<Value> {
    let mut ctx = session.context.lock().await;
    let editing = if ctx.editing.remove(&id) {
        false
    } else {
        ctx.editing.insert(id);
        true
    };
    Json(json!({ "id": id, "editing": editing }))
}

/// `GET /api/notes/export.pdf`
#[instrument(skip_all, fields(session_id = %session.id))]
pub async fn export_pdf(
    State(state): State<GatewayState>,
    Extension(session): Extension<SessionHandle>,
) -> Result<impl IntoResponse, ApiError> {
    let mut ctx = session.context.lock().await;
    let store = state.services.notes.clone();
    let notes = scoped(&state, &mut ctx, |principal| {
        let store = store.clone();
        async move { Ok(store.list(principal.as_ref()).await?) }
    })
    .await
    .map_err(|e| failed(&session, "export_notes", e))?;

    let bytes = studymate_export::export_notes_pdf(&notes)
        .map_err(|e| failed(&session, "export_notes", e))?;
    Ok((
        [
            (header::CONTENT_TYPE, "application/pdf".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{EXPORT_FILENAME}\""),
            ),
        ],
        bytes,
    ))
}
