//! Notes to PDF.
//!
//! Layout is computed first as plain data ([`layout_pages`]) and then drawn
//! with the built-in Helvetica faces, so page breaking can be tested without
//! parsing PDF output.

mod layout;

use printpdf::{BuiltinFont, IndirectFontRef, Mm, PdfDocument};
use thiserror::Error;
use tracing::debug;

use studymate_core::{Note, StudyError};

pub use layout::{layout_pages, to_latin1, wrap, Line, LineStyle, Page};

pub const DOCUMENT_TITLE: &str = "StudyMate Notes";

const PAGE_WIDTH_MM: f32 = 210.0;
const PAGE_HEIGHT_MM: f32 = 297.0;
const LEFT_MARGIN_MM: f32 = 20.0;

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("PDF generation failed: {0}")]
    Pdf(String),
}

impl From<ExportError> for StudyError {
    fn from(err: ExportError) -> Self {
        StudyError::PersistenceFailure(err.to_string())
    }
}

/// Render every note into a single PDF document.
pub fn export_notes_pdf(notes: &[Note]) -> Result<Vec<u8>, ExportError> {
    let pages = layout_pages(notes);
    debug!(notes = notes.len(), pages = pages.len(), "Exporting notes to PDF");

    let (doc, first_page, first_layer) = PdfDocument::new(
        DOCUMENT_TITLE,
        Mm(PAGE_WIDTH_MM),
        Mm(PAGE_HEIGHT_MM),
        "Notes",
    );
    let regular = doc
        .add_builtin_font(BuiltinFont::Helvetica)
        .map_err(pdf_error)?;
    let bold = doc
        .add_builtin_font(BuiltinFont::HelveticaBold)
        .map_err(pdf_error)?;

    for (index, page) in pages.iter().enumerate() {
        let (page_ref, layer_ref) = if index == 0 {
            (first_page, first_layer)
        } else {
            doc.add_page(Mm(PAGE_WIDTH_MM), Mm(PAGE_HEIGHT_MM), "Notes")
        };
        let layer = doc.get_page(page_ref).get_layer(layer_ref);
        for line in &page.lines {
            let font: &IndirectFontRef = match line.style {
                LineStyle::Title | LineStyle::Heading => &bold,
                LineStyle::Date | LineStyle::Body => &regular,
            };
            layer.use_text(
                line.text.clone(),
                line.style.font_size(),
                Mm(LEFT_MARGIN_MM + line.indent_mm),
                Mm(line.y_mm),
                font,
            );
        }
    }

    doc.save_to_bytes().map_err(pdf_error)
}

fn pdf_error(err: impl std::fmt::Display) -> ExportError {
    ExportError::Pdf(err.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn empty_collection_is_a_valid_document() {
        let bytes = export_notes_pdf(&[]).unwrap();
        assert!(bytes.starts_with(b"%PDF"));
    }

    #[test]
    fn exports_notes_with_non_latin_text() {
        let mut note = Note::new(
            "Was ist Δx?",
            vec!["Änderung von x".into(), "日本語".into()],
            None,
        );
        note.created_at = chrono::Utc.with_ymd_and_hms(2025, 5, 4, 9, 15, 0).single();
        let bytes = export_notes_pdf(&[note]).unwrap();
        assert!(bytes.starts_with(b"%PDF"));
        assert!(bytes.len() > 500);
    }
}
