//! Feedback sinks: where helpful / not helpful verdicts end up.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder};
use serde_json::json;
use thiserror::Error;
use tracing::{info, warn};

use studymate_core::{FeedbackEntry, Principal, StudyError};

const AIRTABLE_API: &str = "https://api.airtable.com/v0";

#[derive(Debug, Error)]
pub enum FeedbackError {
    #[error("feedback sink unreachable: {0}")]
    Transport(String),

    #[error("feedback sink returned {status}: {body}")]
    Rejected { status: u16, body: String },
}

impl From<FeedbackError> for StudyError {
    fn from(err: FeedbackError) -> Self {
        StudyError::RemoteFailure(err.to_string())
    }
}

/// Append-only destination for feedback entries.
#[async_trait]
pub trait FeedbackSink: Send + Sync {
    fn name(&self) -> &'static str;

    async fn submit(
        &self,
        entry: &FeedbackEntry,
        principal: Option<&Principal>,
    ) -> Result<(), FeedbackError>;
}

fn http_client(timeout: Duration) -> Result<Client, FeedbackError> {
    Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| FeedbackError::Transport(e.to_string()))
}

async fn send(request: RequestBuilder) -> Result<(), FeedbackError> {
    let response = request
        .send()
        .await
        .map_err(|e| FeedbackError::Transport(e.to_string()))?;
    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        warn!(%status, "Feedback sink rejected entry");
        return Err(FeedbackError::Rejected {
            status: status.as_u16(),
            body,
        });
    }
    Ok(())
}

/// Spreadsheet-style logging through the Airtable records API.
pub struct AirtableSink {
    client: Client,
    endpoint: String,
    api_key: String,
}

impl AirtableSink {
    pub fn new(
        api_key: impl Into<String>,
        base_id: &str,
        table: &str,
        timeout: Duration,
    ) -> Result<Self, FeedbackError> {
        Ok(Self {
            client: http_client(timeout)?,
            endpoint: format!("{AIRTABLE_API}/{base_id}/{table}"),
            api_key: api_key.into(),
        })
    }

    /// Point at another API root (tests, proxies).
    pub fn with_api_root(mut self, root: &str, base_id: &str, table: &str) -> Self {
        self.endpoint = format!("{}/{base_id}/{table}", root.trim_end_matches('/'));
        self
    }
}

#[async_trait]
impl FeedbackSink for AirtableSink {
    fn name(&self) -> &'static str {
        "airtable"
    }

    async fn submit(
        &self,
        entry: &FeedbackEntry,
        _principal: Option<&Principal>,
    ) -> Result<(), FeedbackError> {
        // The table's timestamp column is a date field.
        let body = json!({
            "fields": {
                "timestamp": entry.created_at.format("%Y-%m-%d").to_string(),
                "query": entry.query,
                "explanation": entry.explanation.as_deref().unwrap_or_default(),
                "feedback": entry.verdict.label(),
            }
        });
        send(self.client.post(&self.endpoint).bearer_auth(&self.api_key).json(&body)).await?;
        info!(feedback = entry.verdict.label(), "Feedback logged to Airtable");
        Ok(())
    }
}

/// Rows in the hosted `feedback` table.
pub struct RemoteFeedbackSink {
    client: Client,
    endpoint: String,
    api_key: String,
}

impl RemoteFeedbackSink {
    pub fn new(
        project_url: &str,
        api_key: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, FeedbackError> {
        Ok(Self {
            client: http_client(timeout)?,
            endpoint: format!("{}/rest/v1/feedback", project_url.trim_end_matches('/')),
            api_key: api_key.into(),
        })
    }
}

#[async_trait]
impl FeedbackSink for RemoteFeedbackSink {
    fn name(&self) -> &'static str {
        "remote"
    }

    async fn submit(
        &self,
        entry: &FeedbackEntry,
        principal: Option<&Principal>,
    ) -> Result<(), FeedbackError> {
        let user_id = principal
            .map(|p| p.user_id.clone())
            .or_else(|| entry.user_id.clone());
        let bearer = principal.map_or(self.api_key.as_str(), |p| p.access_token.as_str());
        let row = json!({
            "user_id": user_id,
            "message": entry.message.as_deref().unwrap_or_default(),
            "is_helpful": entry.verdict.is_helpful(),
            "created_at": entry.created_at.to_rfc3339(),
        });
        send(
            self.client
                .post(&self.endpoint)
                .header("apikey", &self.api_key)
                .bearer_auth(bearer)
                .header("Prefer", "return=minimal")
                .json(&row),
        )
        .await?;
        info!(helpful = entry.verdict.is_helpful(), "Feedback stored");
        Ok(())
    }
}

/// Accepts and logs feedback when no sink is configured.
pub struct LogOnlySink;

#[async_trait]
impl FeedbackSink for LogOnlySink {
    fn name(&self) -> &'static str {
        "none"
    }

    async fn submit(
        &self,
        entry: &FeedbackEntry,
        _principal: Option<&Principal>,
    ) -> Result<(), FeedbackError> {
        info!(
            feedback = entry.verdict.label(),
            query = %entry.query,
            "Feedback received (no sink configured)"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    use axum::extract::State;
    use axum::http::{HeaderMap, StatusCode};
    use axum::routing::post;
    use axum::{Json, Router};
    use chrono::TimeZone;
    use serde_json::Value;
    use studymate_core::Verdict;

    type Seen = Arc<Mutex<Vec<(HeaderMap, Value)>>>;

    async fn spawn(path: &str, status: StatusCode) -> (String, Seen) {
        let seen: Seen = Arc::default();
        let app = Router::new()
            .route(
                path,
                post(
                    move |State(seen): State<Seen>, headers: HeaderMap, Json(body): Json<Value>| async move {
                        seen.lock().unwrap().push((headers, body));
                        status
                    },
                ),
            )
            .with_state(seen.clone());
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        (format!("http://{addr}"), seen)
    }

    fn entry(verdict: Verdict) -> FeedbackEntry {
        let mut entry = FeedbackEntry::new("What is a derivative?", verdict);
        entry.created_at = chrono::Utc.with_ymd_and_hms(2025, 5, 4, 18, 30, 0).unwrap();
        entry.explanation = Some("The slope of $f$".into());
        entry
    }

    #[tokio::test]
    async fn airtable_record_uses_date_only_timestamp() {
        let (root, seen) = spawn("/appX/Feedback", StatusCode::OK).await;
        let sink = AirtableSink::new("pat-key", "appX", "Feedback", Duration::from_secs(5))
            .unwrap()
            .with_api_root(&root, "appX", "Feedback");

        sink.submit(&entry(Verdict::NotHelpful), None).await.unwrap();

        let seen = seen.lock().unwrap();
        let (headers, body) = &seen[0];
        assert_eq!(headers["authorization"], "Bearer pat-key");
        assert_eq!(body["fields"]["timestamp"], "2025-05-04");
        assert_eq!(body["fields"]["feedback"], "not helpful");
        assert_eq!(body["fields"]["explanation"], "The slope of $f$");
    }

    #[tokio::test]
    async fn remote_row_carries_user_and_verdict() {
        let (root, seen) = spawn("/rest/v1/feedback", StatusCode::CREATED).await;
        let sink = RemoteFeedbackSink::new(&root, "anon", Duration::from_secs(5)).unwrap();
        let principal = Principal {
            user_id: "u1".into(),
            access_token: "access-u1".into(),
        };

        let mut e = entry(Verdict::Helpful);
        e.message = Some("clear".into());
        sink.submit(&e, Some(&principal)).await.unwrap();

        let seen = seen.lock().unwrap();
        let (headers, body) = &seen[0];
        assert_eq!(headers["apikey"], "anon");
        assert_eq!(headers["authorization"], "Bearer access-u1");
        assert_eq!(body["user_id"], "u1");
        assert_eq!(body["is_helpful"], true);
        assert_eq!(body["message"], "clear");
    }

    #[tokio::test]
    async fn rejection_is_reported_not_fatal() {
        let (root, _) = spawn("/rest/v1/feedback", StatusCode::FORBIDDEN).await;
        let sink = RemoteFeedbackSink::new(&root, "anon", Duration::from_secs(5)).unwrap();
        let err = sink.submit(&entry(Verdict::Helpful), None).await.unwrap_err();
        assert!(matches!(err, FeedbackError::Rejected { status: 403, .. }));
        assert!(matches!(StudyError::from(err), StudyError::RemoteFailure(_)));
    }
}
