use async_trait::async_trait;

use studymate_core::{Note, NoteId, Principal, normalize_lines};

use crate::error::StoreError;

/// Persistent collection of notes.
///
/// The principal scopes every call on the remote variant; the local file
/// variant ignores it.
#[async_trait]
pub trait NoteStore: Send + Sync {
    /// Short backend name for health reports and logs.
    fn backend(&self) -> &'static str;

    /// Save a new note; `text` is split into bullet lines.
    async fn create(
        &self,
        principal: Option<&Principal>,
        question: &str,
        text: &str,
    ) -> Result<Note, StoreError>;

    /// All notes, newest first.
    async fn list(&self, principal: Option<&Principal>) -> Result<Vec<Note>, StoreError>;

    async fn get(&self, principal: Option<&Principal>, id: NoteId) -> Result<Note, StoreError>;

    /// Replace a note's content.
    async fn update(
        &self,
        principal: Option<&Principal>,
        id: NoteId,
        text: &str,
    ) -> Result<Note, StoreError>;

    async fn delete(&self, principal: Option<&Principal>, id: NoteId) -> Result<(), StoreError>;
}

pub fn validate_question(question: &str) -> Result<String, StoreError> {
    let question = question.trim();
    if question.is_empty() {
        return Err(StoreError::Validation(
            "A note needs the question it belongs to".to_string(),
        ));
    }
    Ok(question.to_string())
}

/// Normalize note text to bullet lines; blank text is rejected.
pub fn validate_content(text: &str) -> Result<Vec<String>, StoreError> {
    let lines = normalize_lines(text);
    if lines.is_empty() {
        return Err(StoreError::Validation("Please enter some notes".to_string()));
    }
    Ok(lines)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn content_is_split_into_lines() {
        assert_eq!(
            validate_content("point one\npoint two\n\npoint three").unwrap(),
            vec!["point one", "point two", "point three"]
        );
    }

    #[test]
    fn blank_input_is_rejected() {
        assert!(matches!(validate_content(" \n\t\n"), Err(StoreError::Validation(_))));
        assert!(matches!(validate_question("  "), Err(StoreError::Validation(_))));
    }
}
