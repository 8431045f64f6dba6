//! Environment variable substitution and overrides for config values.
//!
//! Supports `${VAR_NAME}` syntax in string values, resolved at load time.
//! Only uppercase `[A-Z_][A-Z0-9_]*` names are matched; `$${VAR}` escapes
//! to a literal `${VAR}`. Well-known variables (`OPENROUTER_API_KEY`,
//! `SUPABASE_URL`, ...) override the file when set.

use anyhow::{bail, Result};
use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use serde_json::Value;
use std::collections::HashMap;

use crate::schema::{
    AirtableConfig, FeedbackConfig, GatewayConfig, LlmConfig, StudyMateConfig, SupabaseConfig,
};

/// `$${VAR}` (escaped) or `${VAR}` (reference).
static ENV_VAR_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(\$?)\$\{([A-Z_][A-Z0-9_]*)\}").unwrap());

/// Error returned for missing env vars.
#[derive(Debug, thiserror::Error)]
#[error("Missing env var \"{var_name}\" referenced at config path: {config_path}")]
pub struct MissingEnvVarError {
    pub var_name: String,
    pub config_path: String,
}

/// Substitute `${VAR}` references using the process environment.
pub fn resolve_env_vars(value: &Value) -> Result<Value> {
    resolve_env_vars_with(value, &std::env::vars().collect())
}

/// Substitute `${VAR}` references using a provided map.
///
/// Walks the value tree; only string leaves are processed. A reference to an
/// unset or empty variable is an error.
pub fn resolve_env_vars_with(value: &Value, env: &HashMap<String, String>) -> Result<Value> {
    substitute_value(value, env, "")
}

fn substitute_value(value: &Value, env: &HashMap<String, String>, path: &str) -> Result<Value> {
    match value {
        Value::String(s) => Ok(Value::String(substitute_string(s, env, path)?)),
        Value::Array(items) => items
            .iter()
            .enumerate()
            .map(|(i, v)| substitute_value(v, env, &format!("{path}[{i}]")))
            .collect::<Result<Vec<_>>>()
            .map(Value::Array),
        Value::Object(map) => {
            let mut out = serde_json::Map::with_capacity(map.len());
            for (key, v) in map {
                let child = if path.is_empty() { key.clone() } else { format!("{path}.{key}") };
                out.insert(key.clone(), substitute_value(v, env, &child)?);
            }
            Ok(Value::Object(out))
        }
        other => Ok(other.clone()),
    }
}

fn substitute_string(s: &str, env: &HashMap<String, String>, path: &str) -> Result<String> {
    if !s.contains("${") {
        return Ok(s.to_string());
    }

    let mut missing: Option<MissingEnvVarError> = None;
    let out = ENV_VAR_PATTERN.replace_all(s, |caps: &Captures| {
        let name = &caps[2];
        if !caps[1].is_empty() {
            return format!("${{{name}}}");
        }
        match env.get(name) {
            Some(val) if !val.is_empty() => val.clone(),
            _ => {
                missing.get_or_insert_with(|| MissingEnvVarError {
                    var_name: name.to_string(),
                    config_path: path.to_string(),
                });
                String::new()
            }
        }
    });

    if let Some(err) = missing {
        bail!(err);
    }
    Ok(out.into_owned())
}

/// Apply well-known environment variables on top of the file config.
pub fn apply_env_overrides(mut config: StudyMateConfig, env: &HashMap<String, String>) -> StudyMateConfig {
    let get = |key: &str| env.get(key).filter(|v| !v.trim().is_empty()).cloned();

    if let Some(key) = get("OPENROUTER_API_KEY") {
        config.llm.get_or_insert_with(LlmConfig::default).api_key = Some(key);
    }
    if let Some(url) = get("SUPABASE_URL") {
        config.supabase.get_or_insert_with(SupabaseConfig::default).url = Some(url);
    }
    if let Some(key) = get("SUPABASE_KEY") {
        config.supabase.get_or_insert_with(SupabaseConfig::default).anon_key = Some(key);
    }

    let airtable_vars = [
        get("AIRTABLE_API_KEY"),
        get("AIRTABLE_BASE_ID"),
        get("AIRTABLE_TABLE_NAME"),
    ];
    if airtable_vars.iter().any(Option::is_some) {
        let [api_key, base_id, table_name] = airtable_vars;
        let airtable = config
            .feedback
            .get_or_insert_with(FeedbackConfig::default)
            .airtable
            .get_or_insert_with(AirtableConfig::default);
        if api_key.is_some() {
            airtable.api_key = api_key;
        }
        if base_id.is_some() {
            airtable.base_id = base_id;
        }
        if table_name.is_some() {
            airtable.table_name = table_name;
        }
    }

    if let Some(port) = get("STUDYMATE_PORT").and_then(|p| p.parse().ok()) {
        config.gateway.get_or_insert_with(GatewayConfig::default).port = Some(port);
    }

    config
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn env(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    #[test]
    fn substitutes_nested_var() {
        let v = json!({"llm": {"apiKey": "${OPENROUTER_API_KEY}"}});
        let result = resolve_env_vars_with(&v, &env(&[("OPENROUTER_API_KEY", "sk-or-1")])).unwrap();
        assert_eq!(result["llm"]["apiKey"], "sk-or-1");
    }

    #[test]
    fn error_names_missing_var_and_path() {
        let v = json!({"supabase": {"url": "${SUPABASE_URL}"}});
        let err = resolve_env_vars_with(&v, &HashMap::new()).unwrap_err().to_string();
        assert!(err.contains("SUPABASE_URL"));
        assert!(err.contains("supabase.url"));
    }

    #[test]
    fn escaped_reference_is_literal() {
        let v = json!({"note": "$${HOME} stays"});
        let result = resolve_env_vars_with(&v, &HashMap::new()).unwrap();
        assert_eq!(result["note"], "${HOME} stays");
    }

    #[test]
    fn overrides_fill_missing_sections() {
        let config = apply_env_overrides(
            StudyMateConfig::default(),
            &env(&[
                ("OPENROUTER_API_KEY", "sk-or-2"),
                ("AIRTABLE_BASE_ID", "app42"),
                ("STUDYMATE_PORT", "9000"),
            ]),
        );
        assert_eq!(config.llm().api_key.as_deref(), Some("sk-or-2"));
        assert_eq!(config.feedback().airtable.unwrap().base_id.as_deref(), Some("app42"));
        assert_eq!(config.gateway().port, Some(9000));
        assert!(config.supabase.is_none());
    }
}
