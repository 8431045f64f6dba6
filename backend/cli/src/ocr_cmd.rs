//! `studymate ocr <image>`

use std::path::Path;

use anyhow::{Context, Result};
use studymate_core::StudyError;

use crate::context::AppContext;
use crate::terminal_output::note_warn;

pub async fn run(ctx: &AppContext, image: &Path) -> Result<()> {
    let bytes = tokio::fs::read(image)
        .await
        .with_context(|| format!("Failed to read {}", image.display()))?;
    let services = ctx.services()?;
    let text = services
        .ocr
        .extract_text(&bytes)
        .await
        .map_err(StudyError::from)?;

    if text.is_empty() {
        note_warn("Couldn't extract text from image. Please try another image or enter text manually.");
    } else {
        println!("{text}");
    }
    Ok(())
}
