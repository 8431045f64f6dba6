//! Study Event Logger
//!
//! Structured domain events written through `tracing` to the NDJSON log.

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::info;

use crate::redact::redact_sensitive_data;

#[derive(Debug, Serialize)]
#[serde(tag = "type")]
pub enum StudyEvent {
    ExplanationServed {
        subject: String,
        style: String,
        streamed: bool,
        latency_ms: u64,
    },
    NoteSaved {
        note_id: String,
        lines: usize,
    },
    NoteDeleted {
        note_id: String,
    },
    FeedbackSubmitted {
        helpful: bool,
        sink: String,
    },
    Failure {
        action: String,
        error_msg: String,
    },
}

#[derive(Debug, Serialize)]
pub struct EventLogEntry {
    pub session_id: String,
    pub timestamp: DateTime<Utc>,
    pub event: StudyEvent,
}

pub struct EventLogger;

impl EventLogger {
    /// Logs a domain event, redacting free-text fields first.
    pub fn log_event(session_id: &str, event: StudyEvent) {
        let entry = EventLogEntry {
            session_id: session_id.into(),
            timestamp: Utc::now(),
            event: redact_event(event),
        };
        let json = serde_json::to_string(&entry).unwrap_or_default();
        info!(target: "study_events", event = %json, "Study event");
    }
}

fn redact_event(mut event: StudyEvent) -> StudyEvent {
    match &mut event {
        StudyEvent::ExplanationServed { subject, .. } => {
            *subject = redact_sensitive_data(subject);
        }
        StudyEvent::Failure { error_msg, .. } => {
            *error_msg = redact_sensitive_data(error_msg);
        }
        StudyEvent::NoteSaved { .. }
        | StudyEvent::NoteDeleted { .. }
        | StudyEvent::FeedbackSubmitted { .. } => {}
    }
    event
}
