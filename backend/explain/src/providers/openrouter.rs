use std::time::{Duration, Instant};

use async_trait::async_trait;
use futures::StreamExt;
use reqwest::{Client, RequestBuilder};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use studymate_core::{LlmProvider, LlmRequest, LlmResponse, ProviderError};

use super::sse::{SseDecoder, SseLine};

const DEFAULT_BASE_URL: &str = "https://openrouter.ai/api/v1";
const APP_TITLE: &str = "StudyMate";

/// OpenRouter.ai chat-completions provider (any OpenAI-compatible endpoint).
pub struct OpenRouterProvider {
    client: Client,
    base_url: String,
    referer: String,
}

impl OpenRouterProvider {
    pub fn new(timeout: Duration) -> Result<Self, ProviderError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ProviderError::Transport(e.to_string()))?;
        Ok(Self {
            client,
            base_url: DEFAULT_BASE_URL.to_string(),
            referer: "http://localhost".to_string(),
        })
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    /// Value of the `HTTP-Referer` attribution header.
    pub fn with_referer(mut self, referer: impl Into<String>) -> Self {
        self.referer = referer.into();
        self
    }

    fn post(&self, request: &LlmRequest, stream: bool) -> RequestBuilder {
        let mut messages = Vec::with_capacity(2);
        if !request.system_prompt.is_empty() {
            messages.push(ChatMessage {
                role: "system".to_string(),
                content: request.system_prompt.clone(),
            });
        }
        messages.push(ChatMessage {
            role: "user".to_string(),
            content: request.user_prompt.clone(),
        });

        let body = ChatRequest {
            model: request.model.clone(),
            messages,
            max_tokens: Some(request.max_tokens),
            temperature: Some(request.temperature),
            stream: stream.then_some(true),
        };

        self.client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(request.credentials.expose())
            .header("HTTP-Referer", &self.referer)
            .header("X-Title", APP_TITLE)
            .json(&body)
    }

    async fn send(&self, builder: RequestBuilder) -> Result<reqwest::Response, ProviderError> {
        let response = builder.send().await.map_err(transport)?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ProviderError::Status {
                status: status.as_u16(),
                body,
            });
        }
        Ok(response)
    }
}

fn transport(err: reqwest::Error) -> ProviderError {
    ProviderError::Transport(err.to_string())
}

#[derive(Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    max_tokens: Option<u32>,
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    stream: Option<bool>,
}

#[derive(Serialize, Deserialize)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
    usage: Option<Usage>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChatMessage,
}

#[derive(Deserialize)]
struct Usage {
    total_tokens: Option<u64>,
}

#[async_trait]
impl LlmProvider for OpenRouterProvider {
    fn name(&self) -> &str {
        "openrouter"
    }

    async fn complete(&self, request: &LlmRequest) -> Result<LlmResponse, ProviderError> {
        let start = Instant::now();
        debug!(model = %request.model, "Sending request to OpenRouter");

        let response = self.send(self.post(request, false)).await?;
        let bytes = response.bytes().await.map_err(transport)?;
        let chat_response: ChatResponse = serde_json::from_slice(&bytes)
            .map_err(|e| ProviderError::Malformed(e.to_string()))?;

        let content = chat_response
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .ok_or_else(|| ProviderError::Malformed("response has no choices".into()))?;

        let tokens_used = chat_response
            .usage
            .and_then(|u| u.total_tokens)
            .unwrap_or(0);

        Ok(LlmResponse {
            content,
            provider: "openrouter".to_string(),
            model: request.model.clone(),
            tokens_used,
            latency_ms: start.elapsed().as_millis() as u64,
        })
    }

    async fn complete_stream(
        &self,
        request: &LlmRequest,
        on_delta: &mut (dyn for<'a> FnMut(&'a str) + Send),
    ) -> Result<LlmResponse, ProviderError> {
        let start = Instant::now();
        debug!(model = %request.model, "Opening OpenRouter stream");

        let response = self.send(self.post(request, true)).await?;
        let mut body = response.bytes_stream();
        let mut decoder = SseDecoder::default();
        let mut content = String::new();
        let mut done = false;

        'read: while let Some(chunk) = body.next().await {
            let chunk = chunk.map_err(|e| {
                warn!(error = %e, received = content.len(), "Stream interrupted");
                transport(e)
            })?;
            for line in decoder.push(&chunk)? {
                match line {
                    SseLine::Delta(text) => {
                        content.push_str(&text);
                        on_delta(&text);
                    }
                    SseLine::Done => {
                        done = true;
                        break 'read;
                    }
                    SseLine::Skip => {}
                }
            }
        }
        if !done {
            if let SseLine::Delta(text) = decoder.finish()? {
                content.push_str(&text);
                on_delta(&text);
            }
        }

        Ok(LlmResponse {
            content,
            provider: "openrouter".to_string(),
            model: request.model.clone(),
            tokens_used: 0,
            latency_ms: start.elapsed().as_millis() as u64,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{http::HeaderMap, http::StatusCode, routing::post, Json, Router};
    use serde_json::{json, Value};
    use studymate_core::ApiCredentials;

    async fn spawn(app: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{addr}")
    }

    fn request() -> LlmRequest {
        LlmRequest {
            model: "test/model".into(),
            system_prompt: "system".into(),
            user_prompt: "Explain this concept: entropy".into(),
            max_tokens: 1500,
            temperature: 0.7,
            credentials: ApiCredentials::new("sk-test"),
        }
    }

    fn provider(base: String) -> OpenRouterProvider {
        OpenRouterProvider::new(Duration::from_secs(5))
            .unwrap()
            .with_base_url(base)
    }

    #[tokio::test]
    async fn complete_sends_headers_and_reads_first_choice() {
        let app = Router::new().route(
            "/chat/completions",
            post(|headers: HeaderMap, Json(body): Json<Value>| async move {
                assert_eq!(headers["authorization"], "Bearer sk-test");
                assert_eq!(headers["x-title"], "StudyMate");
                assert!(headers.contains_key("http-referer"));
                assert_eq!(body["max_tokens"], 1500);
                assert_eq!(body["messages"][1]["content"], "Explain this concept: entropy");
                assert!(body.get("stream").is_none());
                Json(json!({
                    "choices": [{"message": {"role": "assistant", "content": "Entropy is $S$"}}],
                    "usage": {"total_tokens": 42}
                }))
            }),
        );
        let response = provider(spawn(app).await).complete(&request()).await.unwrap();
        assert_eq!(response.content, "Entropy is $S$");
        assert_eq!(response.tokens_used, 42);
    }

    #[tokio::test]
    async fn non_success_status_is_status_error() {
        let app = Router::new().route(
            "/chat/completions",
            post(|| async { (StatusCode::TOO_MANY_REQUESTS, "slow down") }),
        );
        let err = provider(spawn(app).await).complete(&request()).await.unwrap_err();
        assert!(matches!(err, ProviderError::Status { status: 429, .. }));
    }

    #[tokio::test]
    async fn empty_choices_is_malformed() {
        let app = Router::new().route(
            "/chat/completions",
            post(|| async { Json(json!({"choices": []})) }),
        );
        let err = provider(spawn(app).await).complete(&request()).await.unwrap_err();
        assert!(matches!(err, ProviderError::Malformed(_)));
    }

    #[tokio::test]
    async fn unreachable_host_is_transport_error() {
        let err = provider("http://127.0.0.1:1".into())
            .complete(&request())
            .await
            .unwrap_err();
        assert!(matches!(err, ProviderError::Transport(_)));
    }

    #[tokio::test]
    async fn stream_accumulates_deltas_until_done() {
        let app = Router::new().route(
            "/chat/completions",
            post(|Json(body): Json<Value>| async move {
                assert_eq!(body["stream"], true);
                concat!(
                    ": OPENROUTER PROCESSING\n\n",
                    "data: {\"choices\":[{\"delta\":{\"content\":\"Use \"}}]}\n\n",
                    "data: {\"choices\":[{\"delta\":{\"content\":\"$x^2$\"}}]}\n\n",
                    "data: [DONE]\n\n",
                    "data: {\"choices\":[{\"delta\":{\"content\":\"ignored\"}}]}\n\n",
                )
            }),
        );
        let mut deltas = Vec::new();
        let response = provider(spawn(app).await)
            .complete_stream(&request(), &mut |d: &str| deltas.push(d.to_string()))
            .await
            .unwrap();
        assert_eq!(deltas, vec!["Use ", "$x^2$"]);
        assert_eq!(response.content, "Use $x^2$");
    }
}
