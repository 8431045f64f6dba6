//! Notes kept in one local JSON file.
//!
//! The file is a JSON array of `{id?, timestamp, question, content}`
//! records; `content` is a string or a list of lines. Every mutation
//! rewrites the whole file through a temp file and a rename.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tokio::fs;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};
use uuid::Uuid;

use studymate_core::{Note, NoteContent, NoteId, Principal};

use crate::error::StoreError;
use crate::store::{NoteStore, validate_content, validate_question};
use crate::timestamp;

/// One stored record. Fields this store does not know about are carried
/// through rewrites untouched, as is the original timestamp text.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct FileRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    id: Option<Uuid>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    timestamp: Option<String>,
    #[serde(default)]
    question: String,
    #[serde(default)]
    content: NoteContent,
    #[serde(flatten)]
    extra: Map<String, Value>,
}

impl FileRecord {
    fn from_note(note: &Note) -> Self {
        Self {
            id: Some(note.id),
            timestamp: note.created_at.as_ref().map(timestamp::format),
            question: note.question.clone(),
            content: NoteContent::Lines(note.content.clone()),
            extra: Map::new(),
        }
    }

    fn is(&self, id: NoteId) -> bool {
        self.id == Some(id)
    }

    fn to_note(&self) -> Note {
        let id = self.id.unwrap_or_default();
        let raw = self.timestamp.as_deref().unwrap_or_default();
        let created_at = timestamp::parse(raw);
        if created_at.is_none() {
            warn!(%id, raw, "Unreadable note timestamp");
        }
        Note {
            id,
            question: self.question.clone(),
            content: self.content.clone().into_lines(),
            created_at,
            owner: None,
        }
    }
}

pub struct JsonFileStore {
    path: PathBuf,
    /// Serializes read-modify-write cycles within this process.
    lock: Mutex<()>,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read every record in file order. Records without an id get one and
    /// the file is rewritten so the id sticks; nothing else in them changes.
    async fn load(&self) -> Result<Vec<FileRecord>, StoreError> {
        let raw = match fs::read_to_string(&self.path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "Notes file does not exist yet");
                return Ok(Vec::new());
            }
            Err(e) => {
                return Err(StoreError::Persistence(format!(
                    "failed to read {}: {e}",
                    self.path.display()
                )));
            }
        };
        if raw.trim().is_empty() {
            return Ok(Vec::new());
        }

        let mut records: Vec<FileRecord> = serde_json::from_str(&raw).map_err(|e| {
            StoreError::Persistence(format!("corrupt notes file {}: {e}", self.path.display()))
        })?;

        let mut assigned = 0usize;
        for record in records.iter_mut().filter(|r| r.id.is_none()) {
            record.id = Some(Uuid::new_v4());
            assigned += 1;
        }

        if assigned > 0 {
            info!(path = %self.path.display(), assigned, "Assigned ids to legacy notes");
            self.save(&records).await?;
        }
        Ok(records)
    }

    async fn save(&self, records: &[FileRecord]) -> Result<(), StoreError> {
        let json = serde_json::to_string_pretty(records)
            .map_err(|e| StoreError::Persistence(format!("failed to serialize notes: {e}")))?;

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).await.map_err(|e| {
                StoreError::Persistence(format!("failed to create {}: {e}", parent.display()))
            })?;
        }

        let tmp_path = self.path.with_extension("json.tmp");
        fs::write(&tmp_path, json.as_bytes()).await.map_err(|e| {
            StoreError::Persistence(format!("failed to write {}: {e}", tmp_path.display()))
        })?;
        fs::rename(&tmp_path, &self.path).await.map_err(|e| {
            StoreError::Persistence(format!("failed to replace {}: {e}", self.path.display()))
        })?;
        Ok(())
    }
}

#[async_trait]
impl NoteStore for JsonFileStore {
    fn backend(&self) -> &'static str {
        "file"
    }

    async fn create(
        &self,
        _principal: Option<&Principal>,
        question: &str,
        text: &str,
    ) -> Result<Note, StoreError> {
        let question = validate_question(question)?;
        let content = validate_content(text)?;

        let _guard = self.lock.lock().await;
        let mut records = self.load().await?;
        let note = Note::new(question, content, None);
        records.push(FileRecord::from_note(&note));
        self.save(&records).await?;
        info!(note_id = %note.id, lines = note.content.len(), "Note saved");
        Ok(note)
    }

    async fn list(&self, _principal: Option<&Principal>) -> Result<Vec<Note>, StoreError> {
        let _guard = self.lock.lock().await;
        let mut notes: Vec<Note> = self.load().await?.iter().map(FileRecord::to_note).collect();
        // Unreadable dates sort last.
        notes.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(notes)
    }

    async fn get(&self, _principal: Option<&Principal>, id: NoteId) -> Result<Note, StoreError> {
        let _guard = self.lock.lock().await;
        self.load()
            .await?
            .iter()
            .find(|record| record.is(id))
            .map(FileRecord::to_note)
            .ok_or(StoreError::NotFound(id))
    }

    async fn update(
        &self,
        _principal: Option<&Principal>,
        id: NoteId,
        text: &str,
    ) -> Result<Note, StoreError> {
        let content = validate_content(text)?;

        let _guard = self.lock.lock().await;
        let mut records = self.load().await?;
        let record = records
            .iter_mut()
            .find(|record| record.is(id))
            .ok_or(StoreError::NotFound(id))?;
        record.content = NoteContent::Lines(content);
        let updated = record.to_note();
        self.save(&records).await?;
        info!(note_id = %id, "Note updated");
        Ok(updated)
    }

    async fn delete(&self, _principal: Option<&Principal>, id: NoteId) -> Result<(), StoreError> {
        let _guard = self.lock.lock().await;
        let mut records = self.load().await?;
        let before = records.len();
        records.retain(|record| !record.is(id));
        if records.len() == before {
            return Err(StoreError::NotFound(id));
        }
        self.save(&records).await?;
        info!(note_id = %id, "Note deleted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn store_in(dir: &tempfile::TempDir) -> JsonFileStore {
        JsonFileStore::new(dir.path().join("notes.json"))
    }

    #[tokio::test]
    async fn create_normalizes_lines_and_persists() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);
        let note = store
            .create(None, "What is entropy?", "point one\npoint two\n\npoint three")
            .await
            .unwrap();
        assert_eq!(note.content, vec!["point one", "point two", "point three"]);

        let raw: Value =
            serde_json::from_str(&std::fs::read_to_string(store.path()).unwrap()).unwrap();
        assert_eq!(raw[0]["content"], json!(["point one", "point two", "point three"]));
        assert_eq!(raw[0]["id"], json!(note.id.to_string()));
        assert!(!store.path().with_extension("json.tmp").exists());
    }

    #[tokio::test]
    async fn missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        assert!(store_in(&dir).list(None).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn corrupt_file_is_persistence_failure() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);
        std::fs::write(store.path(), "{not json").unwrap();
        assert!(matches!(store.list(None).await, Err(StoreError::Persistence(_))));
    }

    #[tokio::test]
    async fn legacy_records_get_ids_and_both_content_shapes_load() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);
        std::fs::write(
            store.path(),
            json!([
                {"timestamp": "2024-05-01T10:00:00.000001", "question": "Q1", "content": "a\n\n b "},
                {"timestamp": "2024-05-02T10:00:00", "question": "Q2", "content": ["x", " ", "y"]}
            ])
            .to_string(),
        )
        .unwrap();

        let notes = store.list(None).await.unwrap();
        assert_eq!(notes.len(), 2);
        assert_eq!(notes[0].question, "Q2", "newest first");
        assert_eq!(notes[0].content, vec!["x", "y"]);
        assert_eq!(notes[1].content, vec!["a", "b"]);

        // Ids were written back and stay stable.
        let again = store.list(None).await.unwrap();
        assert_eq!(notes[0].id, again[0].id);
        let raw: Value =
            serde_json::from_str(&std::fs::read_to_string(store.path()).unwrap()).unwrap();
        assert!(raw[0]["id"].is_string());
    }

    #[tokio::test]
    async fn update_replaces_content() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);
        let note = store.create(None, "Q", "old").await.unwrap();
        let updated = store.update(None, note.id, "new one\nnew two").await.unwrap();
        assert_eq!(updated.content, vec!["new one", "new two"]);
        assert_eq!(store.get(None, note.id).await.unwrap().content, updated.content);
    }

    #[tokio::test]
    async fn unknown_id_leaves_collection_unchanged() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);
        store.create(None, "Q", "keep me").await.unwrap();
        let before = std::fs::read_to_string(store.path()).unwrap();

        let missing = Uuid::new_v4();
        assert!(matches!(store.delete(None, missing).await, Err(StoreError::NotFound(_))));
        assert!(matches!(
            store.update(None, missing, "text").await,
            Err(StoreError::NotFound(_))
        ));
        assert_eq!(std::fs::read_to_string(store.path()).unwrap(), before);
    }

    #[tokio::test]
    async fn delete_removes_note() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);
        let a = store.create(None, "A", "a").await.unwrap();
        let b = store.create(None, "B", "b").await.unwrap();
        store.delete(None, a.id).await.unwrap();
        let ids: Vec<_> = store.list(None).await.unwrap().into_iter().map(|n| n.id).collect();
        assert_eq!(ids, vec![b.id]);
    }

    #[tokio::test]
    async fn validation_happens_before_io() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);
        assert!(matches!(store.create(None, "", "x").await, Err(StoreError::Validation(_))));
        assert!(matches!(store.create(None, "Q", "\n\n").await, Err(StoreError::Validation(_))));
        assert!(!store.path().exists());
    }

    #[tokio::test]
    async fn id_backfill_keeps_unreadable_timestamps_and_unknown_fields() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);
        std::fs::write(
            store.path(),
            json!([
                {"timestamp": "May 1, 2024 10:00", "question": "Q", "content": "a", "tag": "old"},
                {"timestamp": "2024-05-02T10:00:00", "question": "R", "content": ["b"]}
            ])
            .to_string(),
        )
        .unwrap();

        let notes = store.list(None).await.unwrap();
        assert_eq!(notes[0].question, "R");
        assert_eq!(notes[1].created_at, None, "unreadable dates sort last");
        assert_eq!(notes[1].date_label(), studymate_core::INVALID_DATE);

        let raw: Value =
            serde_json::from_str(&std::fs::read_to_string(store.path()).unwrap()).unwrap();
        assert!(raw[0]["id"].is_string());
        assert_eq!(raw[0]["timestamp"], "May 1, 2024 10:00");
        assert_eq!(raw[0]["content"], "a");
        assert_eq!(raw[0]["tag"], "old");
        assert_eq!(raw[1]["timestamp"], "2024-05-02T10:00:00");

        // Editing one note leaves the other record's text alone.
        store.update(None, notes[0].id, "b2").await.unwrap();
        let raw: Value =
            serde_json::from_str(&std::fs::read_to_string(store.path()).unwrap()).unwrap();
        assert_eq!(raw[0]["timestamp"], "May 1, 2024 10:00");
        assert_eq!(raw[1]["content"], json!(["b2"]));
    }
}
