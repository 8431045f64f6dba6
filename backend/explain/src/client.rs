//! Explanation client with process-lifetime memoization.
//!
//! Identical `(subject, style, credentials)` calls hit the remote once.
//! Failures are never cached, so a retry after an error goes back out.

use std::sync::Arc;
use std::time::{Duration, Instant};

use moka::sync::Cache;
use thiserror::Error;
use tracing::{debug, info, warn};

use studymate_core::{
    ApiCredentials, ExplanationRequest, ExplanationResult, LlmProvider, LlmRequest, LlmResponse,
    ProviderError, Style, StudyError,
};

use crate::prompt::{system_prompt, user_prompt};

#[derive(Debug, Error)]
pub enum ExplainError {
    /// Transport error, timeout, non-2xx status or unusable body.
    #[error("could not generate explanation: {0}")]
    RemoteFailure(String),

    #[error("{0}")]
    Validation(String),
}

impl From<ExplainError> for StudyError {
    fn from(err: ExplainError) -> Self {
        match err {
            ExplainError::RemoteFailure(msg) => StudyError::RemoteFailure(msg),
            ExplainError::Validation(msg) => StudyError::ValidationFailure(msg),
        }
    }
}

impl From<ProviderError> for ExplainError {
    fn from(err: ProviderError) -> Self {
        ExplainError::RemoteFailure(err.to_string())
    }
}

/// Request parameters shared by every call.
#[derive(Debug, Clone)]
pub struct ExplainSettings {
    pub model: String,
    pub temperature: f32,
    pub max_tokens: u32,
    pub timeout: Duration,
}

impl Default for ExplainSettings {
    fn default() -> Self {
        Self {
            model: "deepseek/deepseek-prover-v2:free".to_string(),
            temperature: 0.7,
            max_tokens: 1500,
            timeout: Duration::from_secs(60),
        }
    }
}

#[derive(Clone, PartialEq, Eq, Hash)]
struct CacheKey {
    subject: String,
    style: Style,
    credentials: ApiCredentials,
}

pub struct ExplanationClient {
    provider: Arc<dyn LlmProvider>,
    settings: ExplainSettings,
    cache: Cache<CacheKey, ExplanationResult>,
}

impl ExplanationClient {
    pub fn new(provider: Arc<dyn LlmProvider>, settings: ExplainSettings) -> Self {
        Self {
            provider,
            settings,
            // Unbounded and never invalidated; lives as long as the process.
            cache: Cache::builder().build(),
        }
    }

    pub fn settings(&self) -> &ExplainSettings {
        &self.settings
    }

    pub fn provider_name(&self) -> &str {
        self.provider.name()
    }

    /// Request an explanation of `subject` in `style`.
    pub async fn explain(
        &self,
        subject: &str,
        style: Style,
        credentials: &ApiCredentials,
    ) -> Result<ExplanationResult, ExplainError> {
        let (key, request) = self.prepare(subject, style, credentials)?;
        if let Some(hit) = self.cache.get(&key) {
            debug!(subject = %key.subject, %style, "Explanation cache hit");
            return Ok(hit);
        }

        let start = Instant::now();
        let response = self.bounded(self.provider.complete(&request)).await?;
        self.finish(key, response, start)
    }

    /// Like [`explain`](Self::explain), passing each increment of the text to
    /// `on_delta` as it arrives.
    ///
    /// A transport failure (connect error or broken stream) falls back to one
    /// plain completion whose result is returned as-is; deltas already
    /// delivered are not replayed. A cache hit is delivered as one delta.
    pub async fn explain_stream(
        &self,
        subject: &str,
        style: Style,
        credentials: &ApiCredentials,
        on_delta: &mut (dyn for<'a> FnMut(&'a str) + Send),
    ) -> Result<ExplanationResult, ExplainError> {
        let (key, request) = self.prepare(subject, style, credentials)?;
        if let Some(hit) = self.cache.get(&key) {
            debug!(subject = %key.subject, %style, "Explanation cache hit");
            on_delta(&hit.raw_text);
            return Ok(hit);
        }

        let start = Instant::now();
        let streamed = self
            .bounded(self.provider.complete_stream(&request, on_delta))
            .await;
        let response = match streamed {
            Ok(response) => response,
            Err(ProviderError::Transport(reason)) => {
                warn!(provider = %self.provider.name(), %reason, "Streaming failed; retrying without streaming");
                self.bounded(self.provider.complete(&request)).await?
            }
            Err(e) => return Err(e.into()),
        };
        self.finish(key, response, start)
    }

    fn prepare(
        &self,
        subject: &str,
        style: Style,
        credentials: &ApiCredentials,
    ) -> Result<(CacheKey, LlmRequest), ExplainError> {
        let validated = ExplanationRequest::new(subject, style)
            .map_err(|e| ExplainError::Validation(e.to_string()))?;
        let request = LlmRequest {
            model: self.settings.model.clone(),
            system_prompt: system_prompt(style),
            user_prompt: user_prompt(&validated.subject),
            max_tokens: self.settings.max_tokens,
            temperature: self.settings.temperature,
            credentials: credentials.clone(),
        };
        // Keyed on the exact input; the prompt uses the trimmed subject.
        let key = CacheKey {
            subject: subject.to_string(),
            style,
            credentials: credentials.clone(),
        };
        Ok((key, request))
    }

    /// Apply the per-call timeout; an elapsed timeout is a transport failure.
    async fn bounded<F>(&self, call: F) -> Result<LlmResponse, ProviderError>
    where
        F: std::future::Future<Output = Result<LlmResponse, ProviderError>>,
    {
        tokio::time::timeout(self.settings.timeout, call)
            .await
            .unwrap_or_else(|_| {
                Err(ProviderError::Transport(format!(
                    "timed out after {:?}",
                    self.settings.timeout
                )))
            })
    }

    fn finish(
        &self,
        key: CacheKey,
        response: LlmResponse,
        start: Instant,
    ) -> Result<ExplanationResult, ExplainError> {
        if response.content.trim().is_empty() {
            return Err(ExplainError::RemoteFailure("model returned an empty explanation".into()));
        }
        info!(
            provider = %response.provider,
            model = %response.model,
            tokens = response.tokens_used,
            latency_ms = start.elapsed().as_millis() as u64,
            "Explanation generated"
        );
        let result = ExplanationResult::new(response.content);
        self.cache.insert(key, result.clone());
        Ok(result)
    }
}
