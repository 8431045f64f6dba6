//! Main HTTP Gateway Server.

use std::net::SocketAddr;
use std::time::Instant;

use anyhow::Result;
use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post, put};
use axum::{Router, middleware};
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::{info, instrument};

use crate::services::Services;
use crate::session_registry::{SESSION_IDLE_TTL, SessionRegistry};
use crate::{auth_api, control_ui, explain_api, feedback_api, health_api, notes_api, ocr_api, session};

/// Application state shared across routes.
#[derive(Clone)]
pub struct GatewayState {
    pub services: Services,
    pub sessions: SessionRegistry,
    pub started_at: Instant,
}

impl GatewayState {
    pub fn new(services: Services) -> Self {
        Self {
            services,
            sessions: SessionRegistry::new(),
            started_at: Instant::now(),
        }
    }
}

pub fn build_router(state: GatewayState) -> Router {
    // Only routes that read or write per-session state start a session.
    let session_routes = Router::new()
        .route("/api/auth/login", post(auth_api::login))
        .route("/api/auth/signup", post(auth_api::signup))
        .route("/api/auth/logout", post(auth_api::logout))
        .route("/api/auth/me", get(auth_api::me))
        .route("/api/explain", post(explain_api::explain))
        .route("/api/explain/stream", post(explain_api::explain_stream))
        .route(
            "/api/ocr",
            post(ocr_api::extract).layer(DefaultBodyLimit::max(ocr_api::MAX_IMAGE_BYTES)),
        )
        .route("/api/notes", get(notes_api::list).post(notes_api::create))
        .route("/api/notes/export.pdf", get(notes_api::export_pdf))
        .route("/api/notes/:id", put(notes_api::update).delete(notes_api::delete))
        .route("/api/notes/:id/edit", post(notes_api::toggle_edit))
        .route("/api/feedback", post(feedback_api::submit))
        .route_layer(middleware::from_fn_with_state(state.clone(), session::attach_session));

    Router::new()
        .route("/", get(control_ui::index))
        .route("/api/health", get(health_api::get_health))
        .merge(session_routes)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Starts the Axum HTTP server and runs until Ctrl-C.
#[instrument(skip(state))]
pub async fn start_server(addr: SocketAddr, state: GatewayState) -> Result<()> {
    let sweeper = state.sessions.spawn_sweep_loop(SESSION_IDLE_TTL);
    let app = build_router(state);

    let listener = TcpListener::bind(&addr).await?;
    info!("StudyMate listening on http://{}", listener.local_addr()?);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    sweeper.abort();
    info!("Gateway stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    use async_trait::async_trait;
    use axum::body::{Body, to_bytes};
    use axum::http::{Request, StatusCode, header};
    use serde_json::{Value, json};
    use tower::ServiceExt;

    use studymate_core::{ApiCredentials, FeedbackEntry, Principal};
    use studymate_explain::providers::mock::MockFailure;
    use studymate_explain::{ExplainSettings, ExplanationClient, MockProvider};
    use studymate_feedback::{FeedbackError, FeedbackSink};
    use studymate_notes::JsonFileStore;
    use studymate_understanding::{OcrError, OcrService, TextRecognizer};

    #[derive(Default)]
    struct RecordingSink {
        entries: Mutex<Vec<FeedbackEntry>>,
    }

    #[async_trait]
    impl FeedbackSink for RecordingSink {
        fn name(&self) -> &'static str {
            "recording"
        }

        async fn submit(
            &self,
            entry: &FeedbackEntry,
            _principal: Option<&Principal>,
        ) -> Result<(), FeedbackError> {
            self.entries.lock().unwrap().push(entry.clone());
            Ok(())
        }
    }

    struct FixedRecognizer;

    #[async_trait]
    impl TextRecognizer for FixedRecognizer {
        fn name(&self) -> &str {
            "fixed"
        }

        async fn recognize(&self, _png: &[u8]) -> Result<String, OcrError> {
            Ok("x^2".into())
        }
    }

    struct Harness {
        app: Router,
        sink: Arc<RecordingSink>,
        sessions: SessionRegistry,
        _dir: tempfile::TempDir,
    }

    fn harness(provider: MockProvider) -> Harness {
        let dir = tempfile::tempdir().unwrap();
        let sink = Arc::new(RecordingSink::default());
        let services = Services {
            explainer: Arc::new(ExplanationClient::new(
                Arc::new(provider),
                ExplainSettings::default(),
            )),
            credentials: ApiCredentials::new("sk-or-test"),
            notes: Arc::new(JsonFileStore::new(dir.path().join("notes.json"))),
            auth: None,
            feedback: sink.clone(),
            ocr: OcrService::new(Arc::new(FixedRecognizer)),
            streaming: false,
        };
        let state = GatewayState::new(services);
        Harness {
            sessions: state.sessions.clone(),
            app: build_router(state),
            sink,
            _dir: dir,
        }
    }

    fn ok_provider() -> MockProvider {
        MockProvider::new("mock").with_response("The area is ```latex A = \\pi r^2``` for a circle.")
    }

    async fn call(
        app: &Router,
        method: &str,
        uri: &str,
        cookie: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Option<String>, Vec<u8>) {
        let mut request = Request::builder().method(method).uri(uri);
        if let Some(cookie) = cookie {
            request = request.header(header::COOKIE, cookie);
        }
        let request = match body {
            Some(body) => request
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string())),
            None => request.body(Body::empty()),
        }
        .unwrap();

        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let set_cookie = response
            .headers()
            .get(header::SET_COOKIE)
            .map(|v| v.to_str().unwrap().split(';').next().unwrap().to_string());
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, set_cookie, bytes.to_vec())
    }

    fn json_body(bytes: &[u8]) -> Value {
        serde_json::from_slice(bytes).unwrap()
    }

    #[tokio::test]
    async fn health_reports_backends() {
        let h = harness(ok_provider());
        let (status, _, body) = call(&h.app, "GET", "/api/health", None, None).await;
        assert_eq!(status, StatusCode::OK);
        let body = json_body(&body);
        assert_eq!(body["status"], "ok");
        assert_eq!(body["note_backend"], "file");
        assert_eq!(body["auth_enabled"], false);
        assert_eq!(body["provider"], "mock");
    }

    #[tokio::test]
    async fn index_serves_the_ui() {
        let h = harness(ok_provider());
        let (status, _, body) = call(&h.app, "GET", "/", None, None).await;
        assert_eq!(status, StatusCode::OK);
        assert!(String::from_utf8(body).unwrap().contains("StudyMate"));
    }

    #[tokio::test]
    async fn explain_renders_math_and_starts_a_session() {
        let h = harness(ok_provider());
        let (status, cookie, body) = call(
            &h.app,
            "POST",
            "/api/explain",
            None,
            Some(json!({ "subject": "area of a circle", "style": "simple" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert!(cookie.unwrap().starts_with("studymate_session="));
        let body = json_body(&body);
        assert_eq!(body["spans"][1]["kind"], "block_math");
        assert_eq!(body["spans"][1]["content"], "A = \\pi r^2");
        assert!(body["html"].as_str().unwrap().contains("math display"));
    }

    #[tokio::test]
    async fn empty_subject_is_rejected() {
        let h = harness(ok_provider());
        let (status, _, body) =
            call(&h.app, "POST", "/api/explain", None, Some(json!({ "subject": "  " }))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json_body(&body)["error"], "Please enter a concept or question");
    }

    #[tokio::test]
    async fn remote_failure_is_a_bad_gateway_with_friendly_message() {
        let h = harness(MockProvider::new("down").failing(MockFailure::Status(503)));
        let (status, _, body) =
            call(&h.app, "POST", "/api/explain", None, Some(json!({ "subject": "limits" }))).await;
        assert_eq!(status, StatusCode::BAD_GATEWAY);
        assert_eq!(
            json_body(&body)["error"],
            "Could not generate explanation. Please try again."
        );
    }

    #[tokio::test]
    async fn stream_emits_deltas_then_done() {
        let h = harness(ok_provider());
        let (status, _, body) = call(
            &h.app,
            "POST",
            "/api/explain/stream",
            None,
            Some(json!({ "subject": "area of a circle" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let text = String::from_utf8(body).unwrap();
        assert!(text.contains("event: delta"));
        let done = text.find("event: done").unwrap();
        assert!(text[..done].contains("event: delta"));
        assert!(!text.contains("event: error"));
    }

    #[tokio::test]
    async fn note_lifecycle() {
        let h = harness(ok_provider());
        let (status, cookie, body) = call(
            &h.app,
            "POST",
            "/api/notes",
            None,
            Some(json!({ "question": "derivatives", "text": "point one\npoint two\n\npoint three" })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        let cookie = cookie.unwrap();
        let created = json_body(&body);
        assert_eq!(created["content"], json!(["point one", "point two", "point three"]));
        let id = created["id"].as_str().unwrap().to_string();

        let (_, _, body) =
            call(&h.app, "POST", &format!("/api/notes/{id}/edit"), Some(&cookie), None).await;
        assert_eq!(json_body(&body)["editing"], true);

        let (_, _, body) = call(&h.app, "GET", "/api/notes", Some(&cookie), None).await;
        assert_eq!(json_body(&body)["notes"][0]["editing"], true);

        let (status, _, body) = call(
            &h.app,
            "PUT",
            &format!("/api/notes/{id}"),
            Some(&cookie),
            Some(json!({ "text": "rewritten" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let updated = json_body(&body);
        assert_eq!(updated["content"], json!(["rewritten"]));
        assert_eq!(updated["editing"], false);

        let (status, _, _) =
            call(&h.app, "DELETE", &format!("/api/notes/{id}"), Some(&cookie), None).await;
        assert_eq!(status, StatusCode::OK);
        let (_, _, body) = call(&h.app, "GET", "/api/notes", Some(&cookie), None).await;
        assert_eq!(json_body(&body)["notes"], json!([]));
    }

    #[tokio::test]
    async fn deleting_unknown_note_is_not_found() {
        let h = harness(ok_provider());
        call(
            &h.app,
            "POST",
            "/api/notes",
            None,
            Some(json!({ "question": "q", "text": "keep me" })),
        )
        .await;
        let (status, _, body) = call(
            &h.app,
            "DELETE",
            "/api/notes/00000000-0000-4000-8000-000000000000",
            None,
            None,
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(json_body(&body)["error"], "Note was not found.");

        let (_, _, body) = call(&h.app, "GET", "/api/notes", None, None).await;
        assert_eq!(json_body(&body)["notes"].as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn note_question_defaults_to_last_explanation() {
        let h = harness(ok_provider());
        let (_, cookie, _) = call(
            &h.app,
            "POST",
            "/api/explain",
            None,
            Some(json!({ "subject": "area of a circle" })),
        )
        .await;
        let (status, _, body) = call(
            &h.app,
            "POST",
            "/api/notes",
            cookie.as_deref(),
            Some(json!({ "text": "pi r squared" })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(json_body(&body)["question"], "area of a circle");
    }

    #[tokio::test]
    async fn feedback_needs_an_explanation_in_the_same_session() {
        let h = harness(ok_provider());
        let (status, _, _) =
            call(&h.app, "POST", "/api/feedback", None, Some(json!({ "helpful": true }))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (_, cookie, _) = call(
            &h.app,
            "POST",
            "/api/explain",
            None,
            Some(json!({ "subject": "area of a circle" })),
        )
        .await;
        let (status, _, _) = call(
            &h.app,
            "POST",
            "/api/feedback",
            cookie.as_deref(),
            Some(json!({ "helpful": false, "message": "too short" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);

        let entries = h.sink.entries.lock().unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].query, "area of a circle");
        assert_eq!(entries[0].verdict.label(), "not helpful");
        assert_eq!(entries[0].message.as_deref(), Some("too short"));
    }

    #[tokio::test]
    async fn export_returns_a_pdf() {
        let h = harness(ok_provider());
        let (status, _, body) = call(&h.app, "GET", "/api/notes/export.pdf", None, None).await;
        assert_eq!(status, StatusCode::OK);
        assert!(body.starts_with(b"%PDF"));
    }

    #[tokio::test]
    async fn undecodable_upload_is_a_bad_gateway() {
        let h = harness(ok_provider());
        let request = Request::builder()
            .method("POST")
            .uri("/api/ocr")
            .body(Body::from("definitely not an image"))
            .unwrap();
        let response = h.app.clone().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    }

    #[tokio::test]
    async fn login_without_hosted_backend_is_unauthorized() {
        let h = harness(ok_provider());
        let (status, _, _) = call(
            &h.app,
            "POST",
            "/api/auth/login",
            None,
            Some(json!({ "email": "a@b.c", "password": "secret1" })),
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let (_, _, body) = call(&h.app, "GET", "/api/auth/me", None, None).await;
        assert_eq!(json_body(&body)["authenticated"], false);
    }

    #[tokio::test]
    async fn cookieless_health_and_index_do_not_start_sessions() {
        let h = harness(ok_provider());
        for _ in 0..50 {
            let (_, cookie, _) = call(&h.app, "GET", "/api/health", None, None).await;
            assert!(cookie.is_none());
            call(&h.app, "GET", "/", None, None).await;
        }
        assert_eq!(h.sessions.len().await, 0);
    }

    #[tokio::test]
    async fn logout_drops_the_session() {
        let h = harness(ok_provider());
        let (_, cookie, _) = call(
            &h.app,
            "POST",
            "/api/explain",
            None,
            Some(json!({ "subject": "area of a circle" })),
        )
        .await;
        assert_eq!(h.sessions.len().await, 1);
        let (_, _, body) = call(&h.app, "GET", "/api/health", None, None).await;
        assert_eq!(json_body(&body)["active_sessions"], 1);

        let (status, cleared, _) =
            call(&h.app, "POST", "/api/auth/logout", cookie.as_deref(), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(cleared.as_deref(), Some("studymate_session="));
        assert_eq!(h.sessions.len().await, 0);

        // Rating the old explanation no longer works.
        let (status, _, _) = call(
            &h.app,
            "POST",
            "/api/feedback",
            cookie.as_deref(),
            Some(json!({ "helpful": true })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn saved_notes_are_rendered_with_math() {
        let h = harness(ok_provider());
        call(
            &h.app,
            "POST",
            "/api/notes",
            None,
            Some(json!({ "question": "powers", "text": "square is $x^2$\n```latex \\int_0^1 x\\,dx```" })),
        )
        .await;
        let (_, _, body) = call(&h.app, "GET", "/api/notes", None, None).await;
        let html = json_body(&body)["notes"][0]["html"].as_str().unwrap().to_string();
        assert!(html.contains("<span class=\"math inline\">\\(x^2\\)</span>"));
        assert!(html.contains("<div class=\"math display\">\\[\\int_0^1 x\\,dx\\]</div>"));
    }
}
