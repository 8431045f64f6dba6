//! Vision-model transcription through an OpenRouter-compatible chat endpoint.

use std::time::Duration;

use async_trait::async_trait;
use base64::{Engine, engine::general_purpose::STANDARD};
use reqwest::Client;
use serde_json::{Value, json};
use tracing::info;

use studymate_core::ApiCredentials;

use crate::ocr::{OcrError, TextRecognizer};

const TRANSCRIBE_PROMPT: &str = "Transcribe all text in this image exactly as written, \
including handwriting. Write mathematical expressions in LaTeX between $ signs. \
Reply with the transcription only; reply with nothing if there is no text.";

pub struct VisionRecognizer {
    client: Client,
    endpoint: String,
    model: String,
    credentials: ApiCredentials,
    referer: String,
}

impl VisionRecognizer {
    pub fn new(
        base_url: &str,
        model: impl Into<String>,
        credentials: ApiCredentials,
        timeout: Duration,
    ) -> Result<Self, OcrError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| OcrError::Recognition(e.to_string()))?;
        Ok(Self {
            client,
            endpoint: format!("{}/chat/completions", base_url.trim_end_matches('/')),
            model: model.into(),
            credentials,
            referer: "http://localhost:8080".to_string(),
        })
    }

    pub fn with_referer(mut self, referer: impl Into<String>) -> Self {
        self.referer = referer.into();
        self
    }
}

#[async_trait]
impl TextRecognizer for VisionRecognizer {
    fn name(&self) -> &str {
        &self.model
    }

    async fn recognize(&self, png: &[u8]) -> Result<String, OcrError> {
        info!(model = %self.model, "Transcribing image via vision model");
        let body = json!({
            "model": self.model,
            "messages": [{
                "role": "user",
                "content": [
                    { "type": "text", "text": TRANSCRIBE_PROMPT },
                    { "type": "image_url",
                      "image_url": { "url": format!("data:image/png;base64,{}", STANDARD.encode(png)) } }
                ]
            }],
            "max_tokens": 1024,
            "temperature": 0.0
        });

        let resp = self
            .client
            .post(&self.endpoint)
            .bearer_auth(self.credentials.expose())
            .header("HTTP-Referer", &self.referer)
            .header("X-Title", "StudyMate")
            .json(&body)
            .send()
            .await
            .map_err(|e| OcrError::Recognition(e.to_string()))?;
        let status = resp.status();
        if !status.is_success() {
            let text = resp.text().await.unwrap_or_default();
            return Err(OcrError::Recognition(format!("vision API returned {status}: {text}")));
        }
        let json: Value = resp
            .json()
            .await
            .map_err(|e| OcrError::Recognition(e.to_string()))?;
        Ok(json["choices"][0]["message"]["content"]
            .as_str()
            .unwrap_or_default()
            .to_string())
    }
}
