//! Incremental parser for chat-completion server-sent events.
//!
//! Bytes arrive in arbitrary chunks; lines are only decoded once complete so
//! multibyte characters split across chunks survive.

use serde_json::Value;

use studymate_core::ProviderError;

#[derive(Debug, PartialEq)]
pub(crate) enum SseLine {
    Delta(String),
    Done,
    Skip,
}

#[derive(Default)]
pub(crate) struct SseDecoder {
    pending: Vec<u8>,
}

impl SseDecoder {
    /// Feed one chunk and return the events of every completed line.
    pub fn push(&mut self, chunk: &[u8]) -> Result<Vec<SseLine>, ProviderError> {
        self.pending.extend_from_slice(chunk);
        let mut lines = Vec::new();
        while let Some(pos) = self.pending.iter().position(|&b| b == b'\n') {
            let raw: Vec<u8> = self.pending.drain(..=pos).collect();
            lines.push(parse_line(&String::from_utf8_lossy(&raw))?);
        }
        Ok(lines)
    }

    /// Parse whatever is left once the body ends without a trailing newline.
    pub fn finish(&mut self) -> Result<SseLine, ProviderError> {
        let rest = std::mem::take(&mut self.pending);
        parse_line(&String::from_utf8_lossy(&rest))
    }
}

/// Interpret one SSE line. Comments (`:`), blank lines and non-data fields
/// are skipped.
pub(crate) fn parse_line(line: &str) -> Result<SseLine, ProviderError> {
    let line = line.trim();
    let Some(data) = line.strip_prefix("data:") else {
        return Ok(SseLine::Skip);
    };
    let data = data.trim();
    if data == "[DONE]" {
        return Ok(SseLine::Done);
    }
    let Ok(json) = serde_json::from_str::<Value>(data) else {
        return Ok(SseLine::Skip);
    };
    if let Some(error) = json.get("error") {
        let message = error["message"].as_str().unwrap_or("stream error").to_string();
        return Err(ProviderError::Malformed(message));
    }
    match json["choices"][0]["delta"]["content"].as_str() {
        Some(text) if !text.is_empty() => Ok(SseLine::Delta(text.to_string())),
        _ => Ok(SseLine::Skip),
    }
}
