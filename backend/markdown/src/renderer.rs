//! Render dispatch for segmented spans.
//!
//! Walks spans in order and hands each one to a [`RenderSurface`]: text to
//! the formatted-text writer, math to the LaTeX writer. Output order is the
//! input order, one write per span.

use pulldown_cmark::{Event, Options, Parser, html};

use crate::ir::{Span, SpanKind};

/// Destination for rendered spans (web page, terminal, PDF body).
pub trait RenderSurface {
    /// Formatted text; may contain basic markdown markup.
    fn write_text(&mut self, text: &str);

    fn write_inline_math(&mut self, latex: &str);

    fn write_block_math(&mut self, latex: &str);
}

/// Dispatch every span to `surface` in order. Empty math spans are skipped.
pub fn render<S: RenderSurface + ?Sized>(spans: &[Span], surface: &mut S) {
    for span in spans {
        match span.kind {
            SpanKind::Text => surface.write_text(&span.content),
            SpanKind::InlineMath if !span.content.is_empty() => {
                surface.write_inline_math(&span.content)
            }
            SpanKind::BlockMath if !span.content.is_empty() => {
                surface.write_block_math(&span.content)
            }
            SpanKind::InlineMath | SpanKind::BlockMath => {}
        }
    }
}

/// HTML output for the browser, using KaTeX auto-render delimiters.
#[derive(Debug, Default)]
pub struct HtmlSurface {
    out: String,
}

impl HtmlSurface {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn finish(self) -> String {
        self.out
    }
}

impl RenderSurface for HtmlSurface {
    fn write_text(&mut self, text: &str) {
        let rendered = markdown_to_html(text);
        // A lone paragraph flows inline with neighbouring inline math.
        let inner = rendered
            .strip_prefix("<p>")
            .and_then(|rest| rest.strip_suffix("</p>\n"))
            .filter(|inner| !inner.contains("<p>"));
        match inner {
            Some(inner) => {
                self.out.push_str("<span class=\"md\">");
                self.out.push_str(inner);
                self.out.push_str("</span>\n");
            }
            None => self.out.push_str(&rendered),
        }
    }

    fn write_inline_math(&mut self, latex: &str) {
        self.out.push_str("<span class=\"math inline\">\\(");
        self.out.push_str(&escape_html(latex));
        self.out.push_str("\\)</span>\n");
    }

    fn write_block_math(&mut self, latex: &str) {
        self.out.push_str("<div class=\"math display\">\\[");
        self.out.push_str(&escape_html(latex));
        self.out.push_str("\\]</div>\n");
    }
}

/// Plain text output for terminals and PDF bodies.
#[derive(Debug, Default)]
pub struct PlainSurface {
    out: String,
}

impl PlainSurface {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn finish(self) -> String {
        self.out.trim_end().to_string()
    }

    fn separate(&mut self) {
        if !self.out.is_empty() && !self.out.ends_with('\n') {
            self.out.push(' ');
        }
    }
}

impl RenderSurface for PlainSurface {
    fn write_text(&mut self, text: &str) {
        self.separate();
        self.out.push_str(text);
    }

    fn write_inline_math(&mut self, latex: &str) {
        self.separate();
        self.out.push('$');
        self.out.push_str(latex);
        self.out.push('$');
    }

    fn write_block_math(&mut self, latex: &str) {
        if !self.out.is_empty() {
            self.out.push_str("\n\n");
        }
        self.out.push_str("    ");
        self.out.push_str(latex);
        self.out.push_str("\n\n");
    }
}

fn markdown_to_html(text: &str) -> String {
    let mut options = Options::empty();
    options.insert(Options::ENABLE_STRIKETHROUGH);
    options.insert(Options::ENABLE_TABLES);
    // Raw HTML from the model is shown as text, never injected.
    let parser = Parser::new_ext(text, options).map(|event| match event {
        Event::Html(raw) => Event::Text(raw),
        other => other,
    });
    let mut out = String::with_capacity(text.len() * 2);
    html::push_html(&mut out, parser);
    out
}

pub(crate) fn escape_html(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}
