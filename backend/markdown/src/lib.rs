//! Math-aware rendering of model output.
//!
//! Splits LLM explanations into text and LaTeX spans in a single pass, then
//! dispatches each span, in order, to a render surface (HTML for the web UI,
//! plain text for the terminal and PDF export).

pub mod emphasis;
pub mod ir;
pub mod renderer;
pub mod segment;

pub use emphasis::strip_emphasis;
pub use ir::{Span, SpanKind};
pub use renderer::{HtmlSurface, PlainSurface, RenderSurface, render};
pub use segment::segment;

/// Full pipeline entry point: emphasis pre-pass, then segmentation.
pub fn prepare(raw: &str) -> Vec<Span> {
    segment(&strip_emphasis(raw))
}

/// Render raw model output to HTML for the math renderer in the browser.
pub fn to_html(raw: &str) -> String {
    spans_to_html(&prepare(raw))
}

/// HTML for spans that were already prepared.
pub fn spans_to_html(spans: &[Span]) -> String {
    let mut surface = HtmlSurface::new();
    render(spans, &mut surface);
    surface.finish()
}

/// Render raw model output to plain text.
pub fn to_plain_text(raw: &str) -> String {
    let mut surface = PlainSurface::new();
    render(&prepare(raw), &mut surface);
    surface.finish()
}
