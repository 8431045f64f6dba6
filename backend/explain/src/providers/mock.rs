use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use studymate_core::{LlmProvider, LlmRequest, LlmResponse, ProviderError};

/// How a [`MockProvider`] misbehaves.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MockFailure {
    /// Every call fails with a non-2xx status.
    Status(u16),
    /// Every call fails before any byte arrives.
    Transport,
    /// Streaming emits the first chunk, then the connection drops.
    /// Plain completions succeed.
    BrokenStream,
}

/// A mock LLM provider that returns canned responses and counts calls.
pub struct MockProvider {
    name: String,
    fixed_response: Option<String>,
    chunk_size: usize,
    failure: Option<MockFailure>,
    delay: Option<Duration>,
    completes: AtomicUsize,
    streams: AtomicUsize,
}

impl MockProvider {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            fixed_response: None,
            chunk_size: 8,
            failure: None,
            delay: None,
            completes: AtomicUsize::new(0),
            streams: AtomicUsize::new(0),
        }
    }

    pub fn with_response(mut self, response: impl Into<String>) -> Self {
        self.fixed_response = Some(response.into());
        self
    }

    pub fn failing(mut self, failure: MockFailure) -> Self {
        self.failure = Some(failure);
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Number of plain `complete` calls received.
    pub fn complete_calls(&self) -> usize {
        self.completes.load(Ordering::SeqCst)
    }

    /// Number of `complete_stream` calls received.
    pub fn stream_calls(&self) -> usize {
        self.streams.load(Ordering::SeqCst)
    }

    fn content(&self) -> String {
        self.fixed_response
            .clone()
            .unwrap_or_else(|| "Mock response".to_string())
    }

    fn response(&self, request: &LlmRequest) -> LlmResponse {
        LlmResponse {
            content: self.content(),
            provider: self.name.clone(),
            model: request.model.clone(),
            tokens_used: 0,
            latency_ms: 0,
        }
    }

    fn chunks(&self) -> Vec<String> {
        let chars: Vec<char> = self.content().chars().collect();
        chars
            .chunks(self.chunk_size.max(1))
            .map(|c| c.iter().collect())
            .collect()
    }
}

#[async_trait]
impl LlmProvider for MockProvider {
    fn name(&self) -> &str {
        &self.name
    }

    async fn complete(&self, request: &LlmRequest) -> Result<LlmResponse, ProviderError> {
        self.completes.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        match self.failure {
            Some(MockFailure::Status(status)) => Err(ProviderError::Status {
                status,
                body: "mock failure".into(),
            }),
            Some(MockFailure::Transport) => Err(ProviderError::Transport("connection refused".into())),
            Some(MockFailure::BrokenStream) | None => Ok(self.response(request)),
        }
    }

    async fn complete_stream(
        &self,
        request: &LlmRequest,
        on_delta: &mut (dyn for<'a> FnMut(&'a str) + Send),
    ) -> Result<LlmResponse, ProviderError> {
        self.streams.fetch_add(1, Ordering::SeqCst);
        match self.failure {
            Some(MockFailure::Status(status)) => Err(ProviderError::Status {
                status,
                body: "mock failure".into(),
            }),
            Some(MockFailure::Transport) => Err(ProviderError::Transport("connection refused".into())),
            Some(MockFailure::BrokenStream) => {
                if let Some(first) = self.chunks().first() {
                    on_delta(first);
                }
                Err(ProviderError::Transport("connection reset mid-stream".into()))
            }
            None => {
                for chunk in self.chunks() {
                    on_delta(&chunk);
                }
                Ok(self.response(request))
            }
        }
    }
}
