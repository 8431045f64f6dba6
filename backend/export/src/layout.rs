use studymate_core::Note;

use crate::DOCUMENT_TITLE;

const TOP_MM: f32 = 277.0;
const BOTTOM_MM: f32 = 20.0;
const BULLET_INDENT_MM: f32 = 5.0;
/// Characters per body line at 12pt Helvetica within the margins.
const WRAP_COLUMNS: usize = 80;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineStyle {
    Title,
    Heading,
    Date,
    Body,
}

impl LineStyle {
    pub fn font_size(self) -> f32 {
        match self {
            LineStyle::Title => 16.0,
            LineStyle::Heading => 12.0,
            LineStyle::Date => 10.0,
            LineStyle::Body => 12.0,
        }
    }

    fn advance_mm(self) -> f32 {
        match self {
            LineStyle::Title => 20.0,
            LineStyle::Heading => 10.0,
            LineStyle::Date | LineStyle::Body => 8.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Line {
    pub text: String,
    pub style: LineStyle,
    pub y_mm: f32,
    pub indent_mm: f32,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Page {
    pub lines: Vec<Line>,
}

const BULLET: &str = "-";

struct Cursor {
    done: Vec<Page>,
    current: Page,
    y: f32,
}

impl Cursor {
    fn new() -> Self {
        Self {
            done: Vec::new(),
            current: Page::default(),
            y: TOP_MM,
        }
    }

    fn new_page(&mut self) {
        self.done.push(std::mem::take(&mut self.current));
        self.y = TOP_MM;
    }

    fn finish(mut self) -> Vec<Page> {
        self.done.push(self.current);
        self.done
    }

    fn push(&mut self, text: String, style: LineStyle, indent_mm: f32) {
        if self.y - style.advance_mm() < BOTTOM_MM {
            self.new_page();
        }
        self.current.lines.push(Line {
            text,
            style,
            y_mm: self.y,
            indent_mm,
        });
        self.y -= style.advance_mm();
    }
}

/// Lay notes out page by page: the title on the first page, then each note
/// starting on its own page, continuing onto further pages when it overflows.
pub fn layout_pages(notes: &[Note]) -> Vec<Page> {
    let mut cursor = Cursor::new();
    cursor.push(DOCUMENT_TITLE.to_string(), LineStyle::Title, 0.0);

    for (index, note) in notes.iter().enumerate() {
        if index > 0 {
            cursor.new_page();
        }
        for heading in wrap(&format!("Q: {}", to_latin1(&note.question)), WRAP_COLUMNS) {
            cursor.push(heading, LineStyle::Heading, 0.0);
        }
        cursor.push(
            format!("Date: {}", note.date_label()),
            LineStyle::Date,
            0.0,
        );
        for item in &note.content {
            // Fences and emphasis markers go; LaTeX source stays readable.
            let text = markdown::to_plain_text(item);
            let wrapped = wrap(&to_latin1(&text), WRAP_COLUMNS - 2);
            for (n, piece) in wrapped.into_iter().enumerate() {
                if n == 0 {
                    cursor.push(format!("{BULLET} {piece}"), LineStyle::Body, 0.0);
                } else {
                    cursor.push(piece, LineStyle::Body, BULLET_INDENT_MM);
                }
            }
        }
    }

    cursor.finish()
}

/// Replace characters the built-in fonts cannot show with `?`.
pub fn to_latin1(text: &str) -> String {
    text.chars()
        .map(|c| if (c as u32) < 0x100 { c } else { '?' })
        .collect()
}

/// Greedy word wrap by character count. Words longer than `width` are split.
pub fn wrap(text: &str, width: usize) -> Vec<String> {
    let width = width.max(1);
    let mut lines = Vec::new();
    let mut current = String::new();
    let mut current_len = 0;

    for word in text.split_whitespace() {
        let mut word: Vec<char> = word.chars().collect();
        while word.len() > width {
            if current_len > 0 {
                lines.push(std::mem::take(&mut current));
                current_len = 0;
            }
            let rest = word.split_off(width);
            lines.push(word.into_iter().collect());
            word = rest;
        }
        let needed = if current_len == 0 { word.len() } else { current_len + 1 + word.len() };
        if needed > width && current_len > 0 {
            lines.push(std::mem::take(&mut current));
            current_len = 0;
        }
        if current_len > 0 {
            current.push(' ');
            current_len += 1;
        }
        current.extend(word.iter());
        current_len += word.len();
    }

    if current_len > 0 || lines.is_empty() {
        lines.push(current);
    }
    lines
}

#[cfg(test)]
mod tests {
    use super::*;

    fn note(question: &str, lines: usize) -> Note {
        let content = (0..lines).map(|i| format!("point {i}")).collect();
        Note::new(question, content, None)
    }

    #[test]
    fn zero_notes_is_one_title_page() {
        let pages = layout_pages(&[]);
        assert_eq!(pages.len(), 1);
        assert_eq!(pages[0].lines.len(), 1);
        assert_eq!(pages[0].lines[0].text, DOCUMENT_TITLE);
    }

    #[test]
    fn each_note_starts_a_page() {
        let pages = layout_pages(&[note("first", 2), note("second", 2)]);
        assert_eq!(pages.len(), 2);
        assert_eq!(pages[0].lines[1].text, "Q: first");
        assert!(pages[0].lines[2].text.starts_with("Date: "));
        assert_eq!(pages[0].lines[3].text, "- point 0");
        assert_eq!(pages[1].lines[0].text, "Q: second");
    }

    #[test]
    fn long_note_continues_on_next_page() {
        let pages = layout_pages(&[note("long", 60)]);
        assert!(pages.len() >= 2);
        let total: usize = pages.iter().map(|p| p.lines.len()).sum();
        assert_eq!(total, 1 + 1 + 1 + 60);
        for page in &pages {
            assert!(page.lines.iter().all(|l| l.y_mm >= BOTTOM_MM));
        }
    }

    #[test]
    fn wraps_on_word_boundaries() {
        assert_eq!(wrap("aa bb cc dd", 5), vec!["aa bb", "cc dd"]);
        assert_eq!(wrap("abcdefgh", 3), vec!["abc", "def", "gh"]);
        assert_eq!(wrap("", 10), vec![""]);
    }

    #[test]
    fn replaces_characters_outside_latin1() {
        assert_eq!(to_latin1("Ä Δ é 日"), "Ä ? é ?");
    }

    #[test]
    fn body_lines_are_rendered_as_plain_text() {
        let mut n = Note::new(
            "circles",
            vec!["area is ```latex A = \\pi r^2```".into(), "**key** idea".into()],
            None,
        );
        n.created_at = None;
        let pages = layout_pages(&[n]);
        let texts: Vec<&str> = pages[0].lines.iter().map(|l| l.text.as_str()).collect();
        assert!(texts.contains(&"Date: Invalid date format"));
        assert!(texts.contains(&"- area is A = \\pi r^2"));
        assert!(texts.contains(&"- key idea"));
    }
}
