//! Explanation endpoints: one-shot JSON and a server-sent event stream.

use std::convert::Infallible;
use std::time::Instant;

use axum::extract::{Extension, State};
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::Json;
use chrono::{DateTime, Utc};
use futures::stream::{Stream, StreamExt};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tokio::sync::mpsc;
use tokio_stream::wrappers::UnboundedReceiverStream;
use tracing::{info, instrument};

use logging::{EventLogger, StudyEvent};
use markdown::Span;
use studymate_core::{ExplanationRequest, ExplanationResult, StudyError, Style};
use studymate_explain::ExplainError;

use crate::error::{ApiError, failed};
use crate::server::GatewayState;
use crate::session::SessionHandle;
use crate::session_registry::LastExplanation;

pub const EXPLAIN_FAILED: &str = "Could not generate explanation. Please try again.";

#[derive(Debug, Deserialize)]
pub struct ExplainBody {
    pub subject: String,
    #[serde(default)]
    pub style: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ExplainResponse {
    pub raw_text: String,
    pub generated_at: DateTime<Utc>,
    pub spans: Vec<Span>,
    pub html: String,
}

impl From<&ExplanationResult> for ExplainResponse {
    fn from(result: &ExplanationResult) -> Self {
        let spans = markdown::prepare(&result.raw_text);
        Self {
            raw_text: result.raw_text.clone(),
            generated_at: result.generated_at,
            html: markdown::spans_to_html(&spans),
            spans,
        }
    }
}

fn parse_style(style: Option<&str>) -> Result<Style, StudyError> {
    style.map(str::parse).transpose().map(Option::unwrap_or_default)
}

fn explain_failed(session: &SessionHandle, err: ExplainError) -> ApiError {
    let remote = matches!(err, ExplainError::RemoteFailure(_));
    let api = failed(session, "explain", err);
    if remote { api.with_message(EXPLAIN_FAILED) } else { api }
}

fn served(session: &SessionHandle, subject: &str, style: Style, streamed: bool, start: Instant) {
    EventLogger::log_event(
        &session.id,
        StudyEvent::ExplanationServed {
            subject: subject.to_string(),
            style: style.to_string(),
            streamed,
            latency_ms: start.elapsed().as_millis() as u64,
        },
    );
}

/// `POST /api/explain`
#[instrument(skip_all, fields(session_id = %session.id))]
pub async fn explain(
    State(state): State<GatewayState>,
    Extension(session): Extension<SessionHandle>,
    Json(body): Json<ExplainBody>,
) -> Result<Json<ExplainResponse>, ApiError> {
    let style = parse_style(body.style.as_deref()).map_err(|e| failed(&session, "explain", e))?;
    let mut ctx = session.context.lock().await;

    let start = Instant::now();
    let result = state
        .services
        .explainer
        .explain(&body.subject, style, &state.services.credentials)
        .await
        .map_err(|e| explain_failed(&session, e))?;
    served(&session, &body.subject, style, false, start);

    ctx.last_explanation = Some(LastExplanation {
        subject: body.subject.trim().to_string(),
        style,
        result: result.clone(),
    });
    Ok(Json(ExplainResponse::from(&result)))
}

fn json_event(name: &str, data: Value) -> Event {
    Event::default()
        .event(name)
        .json_data(data)
        .unwrap_or_else(|_| Event::default().event("error").data(EXPLAIN_FAILED))
}

/// `POST /api/explain/stream`
///
/// Emits `delta` events carrying `{ "text": ... }` as the model writes, then
/// one `done` event with the full rendered explanation, or one `error` event.
#[instrument(skip_all, fields(session_id = %session.id))]
pub async fn explain_stream(
    State(state): State<GatewayState>,
    Extension(session): Extension<SessionHandle>,
    Json(body): Json<ExplainBody>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, ApiError> {
    let style = parse_style(body.style.as_deref()).map_err(|e| failed(&session, "explain", e))?;
    let request =
        ExplanationRequest::new(&body.subject, style).map_err(|e| failed(&session, "explain", e))?;

    let (tx, rx) = mpsc::unbounded_channel::<Event>();
    tokio::spawn(async move {
        let mut ctx = session.context.lock().await;
        let start = Instant::now();
        let delta_tx = tx.clone();
        let mut on_delta = move |delta: &str| {
            let _ = delta_tx.send(json_event("delta", json!({ "text": delta })));
        };

        let outcome = state
            .services
            .explainer
            .explain_stream(&request.subject, style, &state.services.credentials, &mut on_delta)
            .await;
        match outcome {
            Ok(result) => {
                served(&session, &request.subject, style, true, start);
                let done = serde_json::to_value(ExplainResponse::from(&result)).unwrap_or_default();
                ctx.last_explanation = Some(LastExplanation {
                    subject: request.subject.clone(),
                    style,
                    result,
                });
                let _ = tx.send(json_event("done", done));
            }
            Err(e) => {
                let err = explain_failed(&session, e);
                let _ = tx.send(json_event("error", json!({ "error": err.message() })));
            }
        }
        info!("Explanation stream finished");
    });

    let events = UnboundedReceiverStream::new(rx).map(Ok);
    Ok(Sse::new(events).keep_alive(KeepAlive::default()))
}
