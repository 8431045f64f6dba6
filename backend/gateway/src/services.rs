//! Wiring from a validated config to the service objects every front end uses.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tracing::info;

use studymate_auth::HostedAuthClient;
use studymate_config::{
    FeedbackSinkKind, NotesBackend, StudyMateConfig, defaults, resolve_data_path,
};
use studymate_core::ApiCredentials;
use studymate_explain::{ExplainSettings, ExplanationClient, OpenRouterProvider};
use studymate_feedback::{AirtableSink, FeedbackSink, LogOnlySink, RemoteFeedbackSink};
use studymate_notes::{JsonFileStore, NoteStore, RemoteNoteStore};
use studymate_understanding::{OcrService, VisionRecognizer};

/// Everything a user action may touch.
#[derive(Clone)]
pub struct Services {
    pub explainer: Arc<ExplanationClient>,
    pub credentials: ApiCredentials,
    pub notes: Arc<dyn NoteStore>,
    pub auth: Option<Arc<HostedAuthClient>>,
    pub feedback: Arc<dyn FeedbackSink>,
    pub ocr: OcrService,
    pub streaming: bool,
}

impl Services {
    /// Build services from a config that already passed validation.
    ///
    /// `config_dir` anchors relative data paths such as the notes file.
    pub fn from_config(config: &StudyMateConfig, config_dir: &Path) -> Result<Self> {
        let llm = config.llm();
        let timeout = Duration::from_secs(llm.timeout_secs.unwrap_or(defaults::DEFAULT_TIMEOUT_SECS));
        let base_url = llm
            .base_url
            .clone()
            .unwrap_or_else(|| defaults::DEFAULT_LLM_BASE_URL.to_string());
        let referer = llm
            .referer
            .clone()
            .unwrap_or_else(|| defaults::DEFAULT_REFERER.to_string());
        let credentials = ApiCredentials::new(llm.api_key.clone().unwrap_or_default());

        let provider = OpenRouterProvider::new(timeout)
            .context("Failed to build explanation HTTP client")?
            .with_base_url(base_url.clone())
            .with_referer(referer.clone());
        let settings = ExplainSettings {
            model: llm
                .model
                .clone()
                .unwrap_or_else(|| defaults::DEFAULT_MODEL.to_string()),
            temperature: llm.temperature.unwrap_or(defaults::DEFAULT_TEMPERATURE),
            max_tokens: llm.max_tokens.unwrap_or(defaults::DEFAULT_MAX_TOKENS),
            timeout,
        };
        let explainer = Arc::new(ExplanationClient::new(Arc::new(provider), settings));

        let supabase = config.supabase.clone().unwrap_or_default();
        let supabase_url = supabase.url.as_deref();
        let anon_key = supabase.anon_key.clone().unwrap_or_default();

        let notes_config = config.notes();
        let notes: Arc<dyn NoteStore> = match notes_config.backend.unwrap_or_default() {
            NotesBackend::File => {
                let configured = notes_config
                    .path
                    .unwrap_or_else(|| defaults::DEFAULT_NOTES_FILE.to_string());
                let path = resolve_data_path(config_dir, &configured);
                info!(path = %path.display(), "Using local notes file");
                Arc::new(JsonFileStore::new(path))
            }
            NotesBackend::Remote => {
                let url = supabase_url.context("supabase.url is required for remote notes")?;
                info!(%url, "Using hosted notes table");
                Arc::new(
                    RemoteNoteStore::new(url, anon_key.clone(), timeout)
                        .context("Failed to build notes HTTP client")?,
                )
            }
        };

        let auth = match supabase_url {
            Some(url) => Some(Arc::new(
                HostedAuthClient::new(url, anon_key.clone(), timeout)
                    .context("Invalid hosted auth configuration")?,
            )),
            None => None,
        };

        let feedback_config = config.feedback();
        let feedback: Arc<dyn FeedbackSink> = match feedback_config.sink.unwrap_or_default() {
            FeedbackSinkKind::None => Arc::new(LogOnlySink),
            FeedbackSinkKind::Airtable => {
                let airtable = feedback_config.airtable.unwrap_or_default();
                Arc::new(
                    AirtableSink::new(
                        airtable.api_key.unwrap_or_default(),
                        airtable.base_id.as_deref().unwrap_or_default(),
                        airtable.table_name.as_deref().unwrap_or_default(),
                        timeout,
                    )
                    .context("Failed to build Airtable client")?,
                )
            }
            FeedbackSinkKind::Remote => {
                let url = supabase_url.context("supabase.url is required for remote feedback")?;
                Arc::new(
                    RemoteFeedbackSink::new(url, anon_key.clone(), timeout)
                        .context("Failed to build feedback HTTP client")?,
                )
            }
        };

        let ocr_model = config
            .ocr()
            .model
            .unwrap_or_else(|| defaults::DEFAULT_OCR_MODEL.to_string());
        let recognizer = VisionRecognizer::new(&base_url, ocr_model, credentials.clone(), timeout)
            .context("Failed to build OCR client")?
            .with_referer(referer);

        Ok(Self {
            explainer,
            credentials,
            notes,
            auth,
            feedback,
            ocr: OcrService::new(Arc::new(recognizer)),
            streaming: llm.stream.unwrap_or(false),
        })
    }
}
