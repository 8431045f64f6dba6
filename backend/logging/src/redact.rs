//! Log Redaction Layer
//!
//! Scrubs API keys, bearer tokens and JWTs from strings prior to logging.

use regex::Regex;
use std::sync::LazyLock;

/// OpenRouter/OpenAI style keys and Airtable personal access tokens.
static API_KEY_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(sk-[a-zA-Z0-9\-_]{20,})|(pat[a-zA-Z0-9]{14}\.[a-f0-9]{32,})|(Bearer\s+[a-zA-Z0-9\-\._~+/]+=*)")
        .unwrap()
});
/// Three base64url segments starting with a JSON header (`eyJ`).
static JWT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"eyJ[a-zA-Z0-9_\-]+\.[a-zA-Z0-9_\-]+\.[a-zA-Z0-9_\-]+").unwrap()
});

/// Redacts sensitive patterns in a string.
pub fn redact_sensitive_data(input: &str) -> String {
    let redacted = API_KEY_RE.replace_all(input, "[REDACTED_TOKEN]");
    JWT_RE.replace_all(&redacted, "[REDACTED_JWT]").into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn redacts_bearer_and_keys() {
        let raw = "auth Bearer eyJhbGciOiJIUzI1NiIsInR5cCI6IkpXVCJ9 key sk-or-v1-0123456789abcdef0123";
        let clean = redact_sensitive_data(raw);
        assert!(!clean.contains("eyJhbGciOiJIUzI1NiIsInR5cCI6IkpXVCJ9"));
        assert!(!clean.contains("sk-or-v1-0123456789abcdef0123"));
        assert!(clean.starts_with("auth [REDACTED_TOKEN]"));
    }

    #[test]
    fn redacts_bare_jwt() {
        let clean = redact_sensitive_data("token=eyJhbGciOi.eyJzdWIiOiIxIn0.c2lnbmF0dXJl done");
        assert_eq!(clean, "token=[REDACTED_JWT] done");
    }

    #[test]
    fn leaves_plain_text_alone() {
        let text = "Explain this concept: $x^2$ in 3 steps";
        assert_eq!(redact_sensitive_data(text), text);
    }
}
