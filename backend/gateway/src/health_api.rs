//! Gateway Health API

use axum::{Json, extract::State};
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::server::GatewayState;

#[derive(Debug, Serialize)]
pub struct HealthReport {
    pub status: String,
    pub version: String,
    pub uptime_seconds: u64,
    pub note_backend: String,
    pub feedback_sink: String,
    pub auth_enabled: bool,
    pub streaming: bool,
    pub provider: String,
    pub model: String,
    pub active_sessions: usize,
    pub timestamp: DateTime<Utc>,
}

/// Handler for `GET /api/health`
pub async fn get_health(State(state): State<GatewayState>) -> Json<HealthReport> {
    let services = &state.services;
    Json(HealthReport {
        status: "ok".into(),
        version: env!("CARGO_PKG_VERSION").into(),
        uptime_seconds: state.started_at.elapsed().as_secs(),
        note_backend: services.notes.backend().into(),
        feedback_sink: services.feedback.name().into(),
        auth_enabled: services.auth.is_some(),
        streaming: services.streaming,
        provider: services.explainer.provider_name().into(),
        model: services.explainer.settings().model.clone(),
        active_sessions: state.sessions.len().await,
        timestamp: Utc::now(),
    })
}
