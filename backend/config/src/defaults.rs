//! Config defaults: fills every optional field the runtime depends on.

use crate::schema::{
    FeedbackConfig, FeedbackSinkKind, GatewayConfig, LlmConfig, LoggingConfig, NotesBackend,
    NotesConfig, OcrConfig, StudyMateConfig,
};

/// OpenRouter-compatible API root.
pub const DEFAULT_LLM_BASE_URL: &str = "https://openrouter.ai/api/v1";

/// Explanation model.
pub const DEFAULT_MODEL: &str = "deepseek/deepseek-prover-v2:free";

/// Vision model used for OCR.
pub const DEFAULT_OCR_MODEL: &str = "google/gemini-2.0-flash-001";

pub const DEFAULT_TEMPERATURE: f32 = 0.7;

/// Default max tokens for an explanation.
pub const DEFAULT_MAX_TOKENS: u32 = 1500;

/// Remote call timeout (seconds).
pub const DEFAULT_TIMEOUT_SECS: u64 = 60;

pub const DEFAULT_REFERER: &str = "http://localhost:8080";

pub const DEFAULT_BIND: &str = "127.0.0.1";

pub const DEFAULT_PORT: u16 = 8080;

/// Notes file name, resolved relative to the config directory.
pub const DEFAULT_NOTES_FILE: &str = "notes.json";

pub const DEFAULT_LOG_LEVEL: &str = "info";

/// Apply all defaults to a freshly loaded config.
pub fn apply_all_defaults(config: StudyMateConfig) -> StudyMateConfig {
    let config = apply_llm_defaults(config);
    let config = apply_notes_defaults(config);
    let config = apply_feedback_defaults(config);
    let config = apply_gateway_defaults(config);
    let config = apply_logging_defaults(config);
    apply_ocr_defaults(config)
}

fn apply_llm_defaults(mut config: StudyMateConfig) -> StudyMateConfig {
    let llm = config.llm.get_or_insert_with(LlmConfig::default);
    llm.base_url.get_or_insert_with(|| DEFAULT_LLM_BASE_URL.to_string());
    llm.model.get_or_insert_with(|| DEFAULT_MODEL.to_string());
    llm.temperature.get_or_insert(DEFAULT_TEMPERATURE);
    llm.max_tokens.get_or_insert(DEFAULT_MAX_TOKENS);
    llm.timeout_secs.get_or_insert(DEFAULT_TIMEOUT_SECS);
    llm.stream.get_or_insert(false);
    llm.referer.get_or_insert_with(|| DEFAULT_REFERER.to_string());
    config
}

fn apply_notes_defaults(mut config: StudyMateConfig) -> StudyMateConfig {
    let notes = config.notes.get_or_insert_with(NotesConfig::default);
    notes.backend.get_or_insert(NotesBackend::File);
    notes.path.get_or_insert_with(|| DEFAULT_NOTES_FILE.to_string());
    config
}

/// An Airtable section with no explicit sink selects the Airtable sink.
fn apply_feedback_defaults(mut config: StudyMateConfig) -> StudyMateConfig {
    let feedback = config.feedback.get_or_insert_with(FeedbackConfig::default);
    if feedback.sink.is_none() {
        feedback.sink = Some(if feedback.airtable.is_some() {
            FeedbackSinkKind::Airtable
        } else {
            FeedbackSinkKind::None
        });
    }
    config
}

fn apply_gateway_defaults(mut config: StudyMateConfig) -> StudyMateConfig {
    let gateway = config.gateway.get_or_insert_with(GatewayConfig::default);
    gateway.bind.get_or_insert_with(|| DEFAULT_BIND.to_string());
    gateway.port.get_or_insert(DEFAULT_PORT);
    config
}

fn apply_logging_defaults(mut config: StudyMateConfig) -> StudyMateConfig {
    let logging = config.logging.get_or_insert_with(LoggingConfig::default);
    logging.level.get_or_insert_with(|| DEFAULT_LOG_LEVEL.to_string());
    config
}

fn apply_ocr_defaults(mut config: StudyMateConfig) -> StudyMateConfig {
    let ocr = config.ocr.get_or_insert_with(OcrConfig::default);
    ocr.model.get_or_insert_with(|| DEFAULT_OCR_MODEL.to_string());
    config
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::AirtableConfig;

    #[test]
    fn fills_llm_defaults() {
        let cfg = apply_all_defaults(StudyMateConfig::default());
        let llm = cfg.llm();
        assert_eq!(llm.max_tokens, Some(DEFAULT_MAX_TOKENS));
        assert_eq!(llm.temperature, Some(0.7));
        assert_eq!(llm.timeout_secs, Some(60));
        assert_eq!(cfg.gateway().port, Some(8080));
        assert_eq!(cfg.notes().path.as_deref(), Some("notes.json"));
    }

    #[test]
    fn does_not_override_user_values() {
        let mut cfg = StudyMateConfig::default();
        cfg.llm = Some(LlmConfig {
            max_tokens: Some(300),
            ..Default::default()
        });
        let cfg = apply_all_defaults(cfg);
        assert_eq!(cfg.llm().max_tokens, Some(300));
    }

    #[test]
    fn airtable_section_selects_airtable_sink() {
        let mut cfg = StudyMateConfig::default();
        cfg.feedback = Some(FeedbackConfig {
            sink: None,
            airtable: Some(AirtableConfig::default()),
        });
        let cfg = apply_all_defaults(cfg);
        assert_eq!(cfg.feedback().sink, Some(FeedbackSinkKind::Airtable));

        let cfg = apply_all_defaults(StudyMateConfig::default());
        assert_eq!(cfg.feedback().sink, Some(FeedbackSinkKind::None));
    }
}
