//! `studymate-config` holds the runtime configuration for StudyMate.
//!
//! Provides:
//! - Typed config schema (LLM endpoint, note store, hosted backend, feedback sink, gateway, logging)
//! - YAML read/write with atomic replace
//! - `${ENV_VAR}` substitution and well-known environment overrides
//! - Default value application
//! - Validation; any error is fatal at startup
//! - Redaction for safe display

pub mod defaults;
pub mod env;
pub mod io;
pub mod redact;
pub mod schema;
pub mod validation;

pub use defaults::apply_all_defaults;
pub use env::{apply_env_overrides, resolve_env_vars, resolve_env_vars_with, MissingEnvVarError};
pub use io::{config_dir, config_file_path, load_config, resolve_data_path, write_config};
pub use redact::redact;
pub use schema::{
    AirtableConfig, FeedbackConfig, FeedbackSinkKind, GatewayConfig, LlmConfig, LoggingConfig,
    NotesBackend, NotesConfig, OcrConfig, StudyMateConfig, SupabaseConfig,
};
pub use validation::{is_valid_endpoint_url, validate, ConfigValidationError, ValidationReport};

use anyhow::{bail, Context, Result};
use std::collections::HashMap;
use std::path::Path;

/// Load, substitute env vars, apply overrides and defaults, and validate.
///
/// This is the main entry point for loading a config at runtime. Validation
/// errors are fatal: the caller should not start serving.
pub async fn load_and_prepare(path: &Path) -> Result<StudyMateConfig> {
    load_and_prepare_with(path, &std::env::vars().collect()).await
}

/// Same as [`load_and_prepare`] with an explicit environment (useful for testing).
pub async fn load_and_prepare_with(
    path: &Path,
    env: &HashMap<String, String>,
) -> Result<StudyMateConfig> {
    let raw_config = load_config(path).await?;

    let value = serde_json::to_value(&raw_config)
        .context("Failed to serialize config for processing")?;
    let value = resolve_env_vars_with(&value, env).context("Failed to resolve env vars in config")?;
    let config: StudyMateConfig =
        serde_json::from_value(value).context("Failed to deserialize config after processing")?;

    let config = apply_env_overrides(config, env);
    let config = apply_all_defaults(config);

    let report = validate(&config);
    for warning in &report.warnings {
        tracing::warn!(path = %warning.path, message = %warning.message, "Config warning");
    }
    if !report.is_valid() {
        for error in &report.errors {
            tracing::error!(path = %error.path, message = %error.message, "Config error");
        }
        let summary: Vec<String> = report.errors.iter().map(ToString::to_string).collect();
        bail!("invalid configuration:\n  {}", summary.join("\n  "));
    }

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn env(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    #[tokio::test]
    async fn missing_file_with_env_key_is_valid() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        let config = load_and_prepare_with(&path, &env(&[("OPENROUTER_API_KEY", "sk-or-1")]))
            .await
            .unwrap();
        assert_eq!(config.llm().api_key.as_deref(), Some("sk-or-1"));
        assert_eq!(config.llm().max_tokens, Some(defaults::DEFAULT_MAX_TOKENS));
    }

    #[tokio::test]
    async fn missing_api_key_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        let err = load_and_prepare_with(&path, &HashMap::new()).await.unwrap_err();
        assert!(err.to_string().contains("llm.apiKey"));
    }

    #[tokio::test]
    async fn substitutes_env_references_in_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        tokio::fs::write(&path, "llm:\n  apiKey: \"${MY_KEY}\"\n  model: test/model\n")
            .await
            .unwrap();
        let config = load_and_prepare_with(&path, &env(&[("MY_KEY", "sk-from-env")]))
            .await
            .unwrap();
        assert_eq!(config.llm().api_key.as_deref(), Some("sk-from-env"));
        assert_eq!(config.llm().model.as_deref(), Some("test/model"));
    }
}
