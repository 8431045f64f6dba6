//! Config validation: every error is fatal at startup.

use once_cell::sync::Lazy;
use regex::Regex;
use thiserror::Error;

use crate::schema::{FeedbackSinkKind, NotesBackend, StudyMateConfig};

/// `scheme://host[:port][/path]` with an http(s) scheme and a non-empty host.
static ENDPOINT_URL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?i:https?)://[A-Za-z0-9](?:[A-Za-z0-9.\-]*[A-Za-z0-9])?(?::\d{1,5})?(?:/\S*)?$")
        .unwrap()
});

/// A config validation error with field path and message.
#[derive(Debug, Error)]
#[error("Config validation error at '{path}': {message}")]
pub struct ConfigValidationError {
    pub path: String,
    pub message: String,
}

/// A collection of validation errors found in one pass.
#[derive(Debug, Default)]
pub struct ValidationReport {
    pub errors: Vec<ConfigValidationError>,
    pub warnings: Vec<ConfigValidationError>,
}

impl ValidationReport {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    fn error(&mut self, path: impl Into<String>, message: impl Into<String>) {
        self.errors.push(ConfigValidationError {
            path: path.into(),
            message: message.into(),
        });
    }

    fn warn(&mut self, path: impl Into<String>, message: impl Into<String>) {
        self.warnings.push(ConfigValidationError {
            path: path.into(),
            message: message.into(),
        });
    }
}

/// True when `url` has an http(s) scheme and a host.
pub fn is_valid_endpoint_url(url: &str) -> bool {
    ENDPOINT_URL.is_match(url.trim())
}

/// Validate the config and return a report of all errors and warnings.
pub fn validate(config: &StudyMateConfig) -> ValidationReport {
    let mut report = ValidationReport::default();
    validate_llm(config, &mut report);
    validate_supabase(config, &mut report);
    validate_feedback(config, &mut report);
    validate_gateway(config, &mut report);
    report
}

fn is_blank(value: &Option<String>) -> bool {
    value.as_deref().map(str::trim).map_or(true, str::is_empty)
}

fn validate_llm(config: &StudyMateConfig, report: &mut ValidationReport) {
    let llm = config.llm();
    if is_blank(&llm.api_key) {
        report.error(
            "llm.apiKey",
            "An OpenRouter API key is required (set OPENROUTER_API_KEY)",
        );
    }
    if let Some(url) = &llm.base_url {
        if !is_valid_endpoint_url(url) {
            report.error("llm.baseUrl", format!("'{url}' is not a valid http(s) URL"));
        }
    }
    if let Some(t) = llm.temperature {
        if !(0.0..=2.0).contains(&t) {
            report.error("llm.temperature", "temperature must be between 0 and 2");
        }
    }
    if llm.max_tokens == Some(0) {
        report.error("llm.maxTokens", "maxTokens must be >= 1");
    }
    if llm.timeout_secs == Some(0) {
        report.error("llm.timeoutSecs", "timeoutSecs must be >= 1");
    }
}

/// Remote notes or remote feedback need the hosted backend settings.
fn validate_supabase(config: &StudyMateConfig, report: &mut ValidationReport) {
    let needs_remote = config.notes().backend == Some(NotesBackend::Remote)
        || config.feedback().sink == Some(FeedbackSinkKind::Remote);

    let supabase = config.supabase.clone().unwrap_or_default();
    match &supabase.url {
        Some(url) if !url.trim().is_empty() => {
            if !is_valid_endpoint_url(url) {
                report.error("supabase.url", format!("'{url}' is not a valid http(s) URL"));
            }
        }
        _ if needs_remote => {
            report.error("supabase.url", "Supabase URL is required for the remote backend (set SUPABASE_URL)");
        }
        _ => {}
    }
    if needs_remote && is_blank(&supabase.anon_key) {
        report.error("supabase.anonKey", "Supabase key is required for the remote backend (set SUPABASE_KEY)");
    }
}

fn validate_feedback(config: &StudyMateConfig, report: &mut ValidationReport) {
    let feedback = config.feedback();
    if feedback.sink != Some(FeedbackSinkKind::Airtable) {
        return;
    }
    let airtable = feedback.airtable.unwrap_or_default();
    if is_blank(&airtable.api_key) {
        report.error("feedback.airtable.apiKey", "Airtable API key is required (set AIRTABLE_API_KEY)");
    }
    if is_blank(&airtable.base_id) {
        report.error("feedback.airtable.baseId", "Airtable base id is required (set AIRTABLE_BASE_ID)");
    }
    if is_blank(&airtable.table_name) {
        report.error(
            "feedback.airtable.tableName",
            "Airtable table name is required (set AIRTABLE_TABLE_NAME)",
        );
    }
}

fn validate_gateway(config: &StudyMateConfig, report: &mut ValidationReport) {
    if let Some(port) = config.gateway().port {
        if port < 1024 && port != 80 && port != 443 {
            report.warn(
                "gateway.port",
                format!("Port {port} requires elevated privileges; consider using a port >= 1024"),
            );
        }
    }
}
