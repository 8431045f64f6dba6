//! Terminal output utilities: notes, tables, streamed text and a math-aware
//! render surface for explanations.

use std::io::Write;

use markdown::RenderSurface;

// ---------------------------------------------------------------------------
// ANSI Color/Style helpers
// ---------------------------------------------------------------------------

pub const RESET: &str = "\x1b[0m";
pub const BOLD: &str = "\x1b[1m";
pub const DIM: &str = "\x1b[2m";

pub const RED: &str = "\x1b[31m";
pub const GREEN: &str = "\x1b[32m";
pub const YELLOW: &str = "\x1b[33m";
pub const CYAN: &str = "\x1b[36m";

/// Check if the terminal supports color output.
pub fn supports_color() -> bool {
    std::env::var("NO_COLOR").is_err()
        && (std::env::var("COLORTERM").is_ok()
            || std::env::var("TERM")
                .map(|t| t != "dumb")
                .unwrap_or(false))
}

/// Strip ANSI escape codes from a string.
pub fn strip_ansi(s: &str) -> String {
    let mut result = String::with_capacity(s.len());
    let mut chars = s.chars().peekable();
    while let Some(c) = chars.next() {
        if c == '\x1b' {
            // Skip until 'm'
            for next in chars.by_ref() {
                if next == 'm' {
                    break;
                }
            }
        } else {
            result.push(c);
        }
    }
    result
}

// ---------------------------------------------------------------------------
// Formatted notes
// ---------------------------------------------------------------------------

pub fn note_info(msg: &str) {
    if supports_color() {
        println!("{CYAN}{BOLD}ℹ{RESET} {msg}");
    } else {
        println!("INFO: {msg}");
    }
}

pub fn note_warn(msg: &str) {
    if supports_color() {
        println!("{YELLOW}{BOLD}⚠{RESET} {msg}");
    } else {
        println!("WARN: {msg}");
    }
}

pub fn note_error(msg: &str) {
    if supports_color() {
        eprintln!("{RED}{BOLD}✗{RESET} {msg}");
    } else {
        eprintln!("ERROR: {msg}");
    }
}

pub fn note_success(msg: &str) {
    if supports_color() {
        println!("{GREEN}{BOLD}✓{RESET} {msg}");
    } else {
        println!("OK: {msg}");
    }
}

// ---------------------------------------------------------------------------
// Table rendering
// ---------------------------------------------------------------------------

pub struct Column {
    pub header: String,
    pub max_width: Option<usize>,
}

impl Column {
    pub fn new(header: impl Into<String>) -> Self {
        Self { header: header.into(), max_width: None }
    }

    pub fn max(mut self, width: usize) -> Self {
        self.max_width = Some(width);
        self
    }
}

/// Render a left-aligned table. Cells wider than a column's `max_width` are
/// cut with an ellipsis.
pub fn render_table(columns: &[Column], rows: &[Vec<String>]) -> String {
    let num_cols = columns.len();
    let fit = |i: usize, cell: &str| -> String {
        match columns[i].max_width {
            Some(max) if cell.chars().count() > max => {
                let mut cut: String = cell.chars().take(max.saturating_sub(1)).collect();
                cut.push('…');
                cut
            }
            _ => cell.to_string(),
        }
    };

    let mut widths: Vec<usize> = columns.iter().map(|c| strip_ansi(&c.header).chars().count()).collect();
    for row in rows {
        for (i, cell) in row.iter().enumerate().take(num_cols) {
            widths[i] = widths[i].max(strip_ansi(&fit(i, cell)).chars().count());
        }
    }

    let mut out = String::new();
    let header: Vec<String> = columns
        .iter()
        .enumerate()
        .map(|(i, col)| pad_cell(&col.header, widths[i]))
        .collect();
    out.push_str(&format!("{BOLD}  {}  {RESET}\n", header.join("  ")));

    let sep: Vec<String> = widths.iter().map(|w| "-".repeat(*w)).collect();
    out.push_str(&format!("  {}  \n", sep.join("  ")));

    for row in rows {
        let cells: Vec<String> = (0..num_cols)
            .map(|i| {
                let cell = row.get(i).map(String::as_str).unwrap_or("");
                pad_cell(&fit(i, cell), widths[i])
            })
            .collect();
        out.push_str(&format!("  {}  \n", cells.join("  ")));
    }

    out
}

fn pad_cell(s: &str, width: usize) -> String {
    let visible_len = strip_ansi(s).chars().count();
    format!("{s}{}", " ".repeat(width.saturating_sub(visible_len)))
}

// ---------------------------------------------------------------------------
// Streaming writer
// ---------------------------------------------------------------------------

/// Write chunks to a buffered writer, flushing after each.
pub fn stream_write(writer: &mut impl Write, chunk: &str) -> std::io::Result<()> {
    writer.write_all(chunk.as_bytes())?;
    writer.flush()
}

// ---------------------------------------------------------------------------
// Explanation rendering
// ---------------------------------------------------------------------------

/// Plain text with math highlighted; block math sits on its own indented line.
#[derive(Default)]
pub struct TerminalSurface {
    out: String,
    color: bool,
}

impl TerminalSurface {
    pub fn new(color: bool) -> Self {
        Self { out: String::new(), color }
    }

    pub fn finish(self) -> String {
        self.out.trim_end().to_string()
    }

    fn separate(&mut self) {
        if !self.out.is_empty() && !self.out.ends_with('\n') {
            self.out.push(' ');
        }
    }

    fn math(&self, latex: &str) -> String {
        if self.color {
            format!("{CYAN}{latex}{RESET}")
        } else {
            latex.to_string()
        }
    }
}

impl RenderSurface for TerminalSurface {
    fn write_text(&mut self, text: &str) {
        self.separate();
        self.out.push_str(text);
    }

    fn write_inline_math(&mut self, latex: &str) {
        self.separate();
        let math = self.math(latex);
        self.out.push_str(&math);
    }

    fn write_block_math(&mut self, latex: &str) {
        if !self.out.is_empty() {
            self.out.push_str("\n\n");
        }
        let math = self.math(latex);
        self.out.push_str("    ");
        self.out.push_str(&math);
        self.out.push_str("\n\n");
    }
}

/// Render raw model output for the terminal.
pub fn render_explanation(raw: &str, color: bool) -> String {
    let mut surface = TerminalSurface::new(color);
    markdown::render(&markdown::prepare(raw), &mut surface);
    surface.finish()
}
