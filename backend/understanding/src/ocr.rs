//! Optical character recognition.
//!
//! Uploaded images are decoded, reduced to grayscale and re-encoded as PNG
//! before being handed to a [`TextRecognizer`].

use std::io::Cursor;
use std::sync::Arc;

use async_trait::async_trait;
use image::ImageOutputFormat;
use thiserror::Error;
use tracing::{debug, info};

use studymate_core::StudyError;

#[derive(Debug, Error)]
pub enum OcrError {
    #[error("could not read image: {0}")]
    Decode(String),

    #[error("text recognition failed: {0}")]
    Recognition(String),
}

impl From<OcrError> for StudyError {
    fn from(err: OcrError) -> Self {
        StudyError::OcrFailure(err.to_string())
    }
}

/// Turns a grayscale PNG into text.
#[async_trait]
pub trait TextRecognizer: Send + Sync {
    fn name(&self) -> &str;

    async fn recognize(&self, png: &[u8]) -> Result<String, OcrError>;
}

#[derive(Clone)]
pub struct OcrService {
    recognizer: Arc<dyn TextRecognizer>,
}

impl OcrService {
    pub fn new(recognizer: Arc<dyn TextRecognizer>) -> Self {
        Self { recognizer }
    }

    /// Extract the text visible in an image. An image without readable text
    /// yields an empty string, not an error.
    pub async fn extract_text(&self, bytes: &[u8]) -> Result<String, OcrError> {
        let png = to_grayscale_png(bytes)?;
        info!(
            recognizer = self.recognizer.name(),
            bytes = png.len(),
            "Running OCR on uploaded image"
        );
        let text = self.recognizer.recognize(&png).await?;
        Ok(text.trim().to_string())
    }
}

/// Decode any format the `image` crate understands and re-encode as
/// single-channel PNG.
pub fn to_grayscale_png(bytes: &[u8]) -> Result<Vec<u8>, OcrError> {
    let decoded = image::load_from_memory(bytes).map_err(|e| OcrError::Decode(e.to_string()))?;
    debug!(
        width = decoded.width(),
        height = decoded.height(),
        "Decoded upload"
    );
    let gray = decoded.grayscale();
    let mut out = Cursor::new(Vec::new());
    gray.write_to(&mut out, ImageOutputFormat::Png)
        .map_err(|e| OcrError::Decode(e.to_string()))?;
    Ok(out.into_inner())
}
