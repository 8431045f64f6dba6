//! Notes stored as rows of a hosted PostgREST `notes` table.
//!
//! Rows are `{id, user_id, created_at, question, content}`. Every request
//! carries the project key and the user's bearer token, and every query is
//! filtered by `user_id` so one user never sees another's rows.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{debug, info};

use studymate_core::{Note, NoteContent, NoteId, Principal};

use crate::error::StoreError;
use crate::store::{NoteStore, validate_content, validate_question};
use crate::timestamp;

const TABLE: &str = "notes";

#[derive(Debug, Serialize, Deserialize)]
struct NoteRow {
    id: NoteId,
    user_id: String,
    created_at: String,
    #[serde(default)]
    question: Option<String>,
    #[serde(default)]
    content: NoteContent,
}

impl NoteRow {
    fn into_note(self) -> Note {
        Note {
            id: self.id,
            question: self.question.unwrap_or_default(),
            content: self.content.into_lines(),
            created_at: timestamp::parse(&self.created_at),
            owner: Some(self.user_id),
        }
    }
}

pub struct RemoteNoteStore {
    client: Client,
    endpoint: String,
    api_key: String,
}

impl RemoteNoteStore {
    /// `base_url` is the project URL, e.g. `https://project.supabase.co`.
    pub fn new(
        base_url: &str,
        api_key: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, StoreError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| StoreError::Transport(e.to_string()))?;
        Ok(Self {
            client,
            endpoint: format!("{}/rest/v1/{TABLE}", base_url.trim_end_matches('/')),
            api_key: api_key.into(),
        })
    }

    fn request(
        &self,
        method: reqwest::Method,
        principal: &Principal,
    ) -> RequestBuilder {
        self.client
            .request(method, &self.endpoint)
            .header("apikey", &self.api_key)
            .bearer_auth(&principal.access_token)
            .query(&[("user_id", format!("eq.{}", principal.user_id))])
    }

    /// Send and decode the returned rows, mapping failures.
    async fn rows(&self, builder: RequestBuilder) -> Result<Vec<NoteRow>, StoreError> {
        let response = builder
            .send()
            .await
            .map_err(|e| StoreError::Transport(e.to_string()))?;
        let response = check(response).await?;
        response
            .json::<Vec<NoteRow>>()
            .await
            .map_err(|e| StoreError::Persistence(format!("unexpected notes payload: {e}")))
    }
}

fn require(principal: Option<&Principal>) -> Result<&Principal, StoreError> {
    principal.ok_or(StoreError::AuthRequired)
}

/// 401, or any error mentioning the JWT, means the access token expired.
async fn check(response: Response) -> Result<Response, StoreError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    if status == reqwest::StatusCode::UNAUTHORIZED || body.contains("JWT") {
        return Err(StoreError::AuthExpired(body));
    }
    Err(StoreError::Persistence(format!("{status}: {body}")))
}

#[async_trait]
impl NoteStore for RemoteNoteStore {
    fn backend(&self) -> &'static str {
        "remote"
    }

    async fn create(
        &self,
        principal: Option<&Principal>,
        question: &str,
        text: &str,
    ) -> Result<Note, StoreError> {
        let principal = require(principal)?;
        let question = validate_question(question)?;
        let content = validate_content(text)?;
        let note = Note::new(question, content, Some(principal.user_id.clone()));

        let row = json!({
            "id": note.id,
            "user_id": principal.user_id,
            "created_at": note.created_at.as_ref().map(timestamp::format),
            "question": note.question,
            "content": note.content,
        });
        let rows = self
            .rows(
                self.client
                    .post(&self.endpoint)
                    .header("apikey", &self.api_key)
                    .bearer_auth(&principal.access_token)
                    .header("Prefer", "return=representation")
                    .json(&row),
            )
            .await?;
        info!(note_id = %note.id, "Note saved remotely");
        Ok(rows.into_iter().next().map(NoteRow::into_note).unwrap_or(note))
    }

    async fn list(&self, principal: Option<&Principal>) -> Result<Vec<Note>, StoreError> {
        let principal = require(principal)?;
        let rows = self
            .rows(
                self.request(reqwest::Method::GET, principal)
                    .query(&[("select", "*"), ("order", "created_at.desc")]),
            )
            .await?;
        debug!(count = rows.len(), "Loaded remote notes");
        Ok(rows.into_iter().map(NoteRow::into_note).collect())
    }

    async fn get(&self, principal: Option<&Principal>, id: NoteId) -> Result<Note, StoreError> {
        let principal = require(principal)?;
        self.rows(
            self.request(reqwest::Method::GET, principal)
                .query(&[("select", "*".to_string()), ("id", format!("eq.{id}"))]),
        )
        .await?
        .into_iter()
        .next()
        .map(NoteRow::into_note)
        .ok_or(StoreError::NotFound(id))
    }

    async fn update(
        &self,
        principal: Option<&Principal>,
        id: NoteId,
        text: &str,
    ) -> Result<Note, StoreError> {
        let principal = require(principal)?;
        let content = validate_content(text)?;
        let rows = self
            .rows(
                self.request(reqwest::Method::PATCH, principal)
                    .query(&[("id", format!("eq.{id}"))])
                    .header("Prefer", "return=representation")
                    .json(&json!({ "content": content })),
            )
            .await?;
        let note = rows
            .into_iter()
            .next()
            .map(NoteRow::into_note)
            .ok_or(StoreError::NotFound(id))?;
        info!(note_id = %id, "Note updated remotely");
        Ok(note)
    }

    async fn delete(&self, principal: Option<&Principal>, id: NoteId) -> Result<(), StoreError> {
        let principal = require(principal)?;
        let rows = self
            .rows(
                self.request(reqwest::Method::DELETE, principal)
                    .query(&[("id", format!("eq.{id}"))])
                    .header("Prefer", "return=representation"),
            )
            .await?;
        if rows.is_empty() {
            return Err(StoreError::NotFound(id));
        }
        info!(note_id = %id, "Note deleted remotely");
        Ok(())
    }
}
