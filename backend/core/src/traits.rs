use async_trait::async_trait;
use thiserror::Error;

use crate::types::ApiCredentials;

/// Failure modes of a chat-completion provider.
///
/// `Transport` is kept apart from the others because a streaming caller
/// falls back to a plain completion only on transport failures.
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("transport error: {0}")]
    Transport(String),

    #[error("provider returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("malformed response: {0}")]
    Malformed(String),
}

/// Trait for chat-completion providers used by the explanation client.
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Provider name (e.g., "openrouter", "mock").
    fn name(&self) -> &str;

    /// Send a completion request and return the full response text.
    async fn complete(&self, request: &LlmRequest) -> Result<LlmResponse, ProviderError>;

    /// Send a streaming completion request, invoking `on_delta` for every
    /// increment. Providers without streaming support deliver the whole
    /// response as a single delta.
    async fn complete_stream(
        &self,
        request: &LlmRequest,
        on_delta: &mut (dyn for<'a> FnMut(&'a str) + Send),
    ) -> Result<LlmResponse, ProviderError> {
        let response = self.complete(request).await?;
        on_delta(&response.content);
        Ok(response)
    }
}

/// Request to an LLM provider.
#[derive(Debug, Clone)]
pub struct LlmRequest {
    pub model: String,
    pub system_prompt: String,
    pub user_prompt: String,
    pub max_tokens: u32,
    pub temperature: f32,
    /// Bearer token for this call.
    pub credentials: ApiCredentials,
}

/// Response from an LLM provider.
#[derive(Debug, Clone)]
pub struct LlmResponse {
    pub content: String,
    pub provider: String,
    pub model: String,
    pub tokens_used: u64,
    pub latency_ms: u64,
}
