//! Reading text out of uploaded images.

pub mod ocr;
pub mod vision;

pub use ocr::{OcrError, OcrService, TextRecognizer};
pub use vision::VisionRecognizer;
