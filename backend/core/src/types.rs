use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::StudyError;

/// Stable identifier of a saved note.
pub type NoteId = Uuid;

/// Register of the explanation the user asked for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum Style {
    #[default]
    Simple,
    Technical,
}

impl fmt::Display for Style {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Style::Simple => write!(f, "Simple"),
            Style::Technical => write!(f, "Technical"),
        }
    }
}

impl FromStr for Style {
    type Err = StudyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "simple" => Ok(Style::Simple),
            "technical" => Ok(Style::Technical),
            other => Err(StudyError::ValidationFailure(format!(
                "Unknown explanation style '{other}'. Use 'Simple' or 'Technical'"
            ))),
        }
    }
}

/// A user query for an explanation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ExplanationRequest {
    pub subject: String,
    #[serde(default)]
    pub style: Style,
}

impl ExplanationRequest {
    /// Build a request, trimming the subject and rejecting empty ones.
    pub fn new(subject: impl AsRef<str>, style: Style) -> Result<Self, StudyError> {
        let subject = subject.as_ref().trim();
        if subject.is_empty() {
            return Err(StudyError::ValidationFailure(
                "Please enter a concept or question".to_string(),
            ));
        }
        Ok(Self {
            subject: subject.to_string(),
            style,
        })
    }
}

/// Raw model output for one explanation request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExplanationResult {
    pub raw_text: String,
    pub generated_at: DateTime<Utc>,
}

impl ExplanationResult {
    pub fn new(raw_text: impl Into<String>) -> Self {
        Self {
            raw_text: raw_text.into(),
            generated_at: Utc::now(),
        }
    }
}

/// API key used to authenticate against the explanation endpoint.
///
/// Part of the memoization key, so it is hashable, but never printed.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct ApiCredentials(String);

impl ApiCredentials {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl fmt::Debug for ApiCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ApiCredentials(***)")
    }
}

/// Authenticated identity that scopes remote note and feedback rows.
#[derive(Clone, PartialEq, Eq)]
pub struct Principal {
    pub user_id: String,
    pub access_token: String,
}

impl fmt::Debug for Principal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Principal")
            .field("user_id", &self.user_id)
            .field("access_token", &"***")
            .finish()
    }
}

/// Note content as found in storage: a single string or a list of lines.
///
/// Normalized to lines at the store boundary via [`NoteContent::into_lines`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum NoteContent {
    Single(String),
    Lines(Vec<String>),
}

impl NoteContent {
    pub fn into_lines(self) -> Vec<String> {
        match self {
            NoteContent::Single(text) => normalize_lines(&text),
            NoteContent::Lines(lines) => lines
                .iter()
                .flat_map(|line| normalize_lines(line))
                .collect(),
        }
    }
}

impl Default for NoteContent {
    fn default() -> Self {
        NoteContent::Lines(Vec::new())
    }
}

/// Split free text into trimmed, non-blank bullet lines.
pub fn normalize_lines(text: &str) -> Vec<String> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}

pub const INVALID_DATE: &str = "Invalid date format";

/// A saved note tied to the question it was taken for.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Note {
    pub id: NoteId,
    pub question: String,
    pub content: Vec<String>,
    /// `None` when the stored timestamp could not be read.
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner: Option<String>,
}

impl Note {
    pub fn new(question: impl Into<String>, content: Vec<String>, owner: Option<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            question: question.into(),
            content,
            created_at: Some(Utc::now()),
            owner,
        }
    }

    /// `YYYY-MM-DD HH:MM`, or [`INVALID_DATE`] when the timestamp was unreadable.
    pub fn date_label(&self) -> String {
        match self.created_at {
            Some(at) => at.format("%Y-%m-%d %H:%M").to_string(),
            None => INVALID_DATE.to_string(),
        }
    }
}

/// Helpfulness verdict for an explanation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
    Helpful,
    NotHelpful,
}

impl Verdict {
    pub fn is_helpful(self) -> bool {
        matches!(self, Verdict::Helpful)
    }

    pub fn label(self) -> &'static str {
        match self {
            Verdict::Helpful => "helpful",
            Verdict::NotHelpful => "not helpful",
        }
    }
}

/// One append-only feedback row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedbackEntry {
    pub created_at: DateTime<Utc>,
    pub query: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub explanation: Option<String>,
    pub verdict: Verdict,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
}

impl FeedbackEntry {
    pub fn new(query: impl Into<String>, verdict: Verdict) -> Self {
        Self {
            created_at: Utc::now(),
            query: query.into(),
            explanation: None,
            verdict,
            message: None,
            user_id: None,
        }
    }
}
