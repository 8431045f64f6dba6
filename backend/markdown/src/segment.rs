//! Single-pass segmentation of model output into text and math spans.
//!
//! Recognized delimiters, scanned left to right:
//! - a fence of three or more backticks followed by the word `latex`
//!   (any case), closed by a run of exactly as many backticks: block math
//! - `$$...$$`: block math
//! - `$...$`: inline math
//!
//! The first valid close terminates a span; nesting is not supported. An
//! opener without a close turns the rest of the input into plain text.

use std::ops::Range;

use crate::ir::Span;

const FENCE_WORD: &str = "latex";
const MIN_FENCE_TICKS: usize = 3;

/// A delimiter pair located in the input.
pub(crate) struct Delimited {
    pub start: usize,
    pub content: Range<usize>,
    pub end: usize,
    pub block: bool,
}

pub(crate) enum Scan {
    Matched(Delimited),
    Unterminated,
    /// Not an opener; skip this many bytes.
    NotOpener(usize),
}

/// Split `raw` into an ordered sequence of non-overlapping spans.
pub fn segment(raw: &str) -> Vec<Span> {
    let mut spans = Vec::new();
    let mut text_start = 0;
    let mut i = 0;

    while i < raw.len() {
        match scan_at(raw, i) {
            Scan::Matched(found) => {
                push_text(raw, text_start..found.start, &mut spans);
                let content = raw[found.content.clone()].trim();
                let range = found.start..found.end;
                spans.push(if found.block {
                    Span::block_math(content, range)
                } else {
                    Span::inline_math(content, range)
                });
                i = found.end;
                text_start = i;
            }
            Scan::Unterminated => break,
            Scan::NotOpener(skip) => i += skip,
        }
    }

    push_text(raw, text_start..raw.len(), &mut spans);
    spans
}

/// Try to match a delimiter pair opening at byte `i`.
pub(crate) fn scan_at(raw: &str, i: usize) -> Scan {
    let bytes = raw.as_bytes();
    match bytes[i] {
        b'`' => scan_fence(raw, i),
        b'$' if !is_escaped(bytes, i) => scan_dollar(raw, i),
        _ => Scan::NotOpener(1),
    }
}

fn scan_fence(raw: &str, i: usize) -> Scan {
    let bytes = raw.as_bytes();
    let ticks = bytes[i..].iter().take_while(|&&b| b == b'`').count();
    if ticks < MIN_FENCE_TICKS {
        return Scan::NotOpener(ticks);
    }

    let word_start = i + ticks;
    let word_end = word_start + FENCE_WORD.len();
    let is_latex = raw
        .get(word_start..word_end)
        .is_some_and(|word| word.eq_ignore_ascii_case(FENCE_WORD))
        && bytes
            .get(word_end)
            .map_or(true, |b| !b.is_ascii_alphanumeric());
    if !is_latex {
        return Scan::NotOpener(ticks);
    }

    match find_backtick_run(bytes, word_end, ticks) {
        Some(close) => Scan::Matched(Delimited {
            start: i,
            content: word_end..close,
            end: close + ticks,
            block: true,
        }),
        None => Scan::Unterminated,
    }
}

fn scan_dollar(raw: &str, i: usize) -> Scan {
    if raw[i..].starts_with("$$") {
        let content_start = i + 2;
        return match raw[content_start..].find("$$") {
            Some(offset) => {
                let close = content_start + offset;
                Scan::Matched(Delimited {
                    start: i,
                    content: content_start..close,
                    end: close + 2,
                    block: true,
                })
            }
            None => Scan::Unterminated,
        };
    }

    let content_start = i + 1;
    match find_unescaped_dollar(raw, content_start) {
        Some(close) => Scan::Matched(Delimited {
            start: i,
            content: content_start..close,
            end: close + 1,
            block: false,
        }),
        None => Scan::Unterminated,
    }
}

/// Start of the first run of exactly `ticks` backticks at or after `from`.
fn find_backtick_run(bytes: &[u8], from: usize, ticks: usize) -> Option<usize> {
    let mut j = from;
    while j < bytes.len() {
        if bytes[j] != b'`' {
            j += 1;
            continue;
        }
        let run = bytes[j..].iter().take_while(|&&b| b == b'`').count();
        if run == ticks {
            return Some(j);
        }
        j += run;
    }
    None
}

fn find_unescaped_dollar(raw: &str, from: usize) -> Option<usize> {
    let bytes = raw.as_bytes();
    (from..bytes.len()).find(|&j| bytes[j] == b'$' && !is_escaped(bytes, j))
}

/// A `$` preceded by an odd number of backslashes is a literal dollar sign.
fn is_escaped(bytes: &[u8], i: usize) -> bool {
    let backslashes = bytes[..i].iter().rev().take_while(|&&b| b == b'\\').count();
    backslashes % 2 == 1
}

fn push_text(raw: &str, range: Range<usize>, spans: &mut Vec<Span>) {
    let slice = &raw[range.clone()];
    let trimmed = slice.trim();
    if trimmed.is_empty() {
        return;
    }
    let start = range.start + (slice.len() - slice.trim_start().len());
    spans.push(Span::text(trimmed, start..start + trimmed.len()));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::SpanKind;

    fn kinds(spans: &[Span]) -> Vec<(SpanKind, &str)> {
        spans.iter().map(|s| (s.kind, s.content.as_str())).collect()
    }

    #[test]
    fn latex_fence_becomes_block_math() {
        let spans = segment("The area is ```latex A = \\pi r^2``` for a circle.");
        assert_eq!(
            kinds(&spans),
            vec![
                (SpanKind::Text, "The area is"),
                (SpanKind::BlockMath, "A = \\pi r^2"),
                (SpanKind::Text, "for a circle."),
            ]
        );
    }

    #[test]
    fn dollar_runs_become_inline_and_block_math() {
        let spans = segment("Use $x^2$ and $$\\int_0^1 f(x)dx$$ here");
        assert_eq!(
            kinds(&spans),
            vec![
                (SpanKind::Text, "Use"),
                (SpanKind::InlineMath, "x^2"),
                (SpanKind::Text, "and"),
                (SpanKind::BlockMath, "\\int_0^1 f(x)dx"),
                (SpanKind::Text, "here"),
            ]
        );
    }

    #[test]
    fn plain_text_is_one_trimmed_span() {
        let spans = segment("  just words \n");
        assert_eq!(kinds(&spans), vec![(SpanKind::Text, "just words")]);
        assert_eq!(spans[0].source_range, 2..12);
    }

    #[test]
    fn empty_and_whitespace_input_yield_nothing() {
        assert!(segment("").is_empty());
        assert!(segment(" \n\t ").is_empty());
    }

    #[test]
    fn unterminated_dollar_is_absorbed_into_text() {
        let spans = segment("It costs $5 today");
        assert_eq!(kinds(&spans), vec![(SpanKind::Text, "It costs $5 today")]);
    }

    #[test]
    fn unterminated_fence_is_absorbed_into_text() {
        let spans = segment("$a$ then ```latex x^2 never closes");
        assert_eq!(
            kinds(&spans),
            vec![
                (SpanKind::InlineMath, "a"),
                (SpanKind::Text, "then ```latex x^2 never closes"),
            ]
        );
    }

    #[test]
    fn unterminated_double_dollar_is_not_split_into_singles() {
        let spans = segment("$$x and $y$");
        assert_eq!(kinds(&spans), vec![(SpanKind::Text, "$$x and $y$")]);
    }

    #[test]
    fn first_close_terminates_span() {
        let spans = segment("$a $b$ c$");
        assert_eq!(
            kinds(&spans),
            vec![
                (SpanKind::InlineMath, "a"),
                (SpanKind::Text, "b"),
                (SpanKind::InlineMath, "c"),
            ]
        );
    }

    #[test]
    fn empty_math_content_is_kept() {
        let spans = segment("$$$$");
        assert_eq!(kinds(&spans), vec![(SpanKind::BlockMath, "")]);
    }

    #[test]
    fn fence_closes_only_on_a_run_of_equal_length() {
        assert_eq!(
            kinds(&segment("````latex a ``` b```` done")),
            vec![(SpanKind::BlockMath, "a ``` b"), (SpanKind::Text, "done")]
        );
        // A longer run never closes a three-tick fence, so no stray tick leaks out.
        assert_eq!(
            kinds(&segment("```latex x```` tail")),
            vec![(SpanKind::Text, "```latex x```` tail")]
        );
    }

    #[test]
    fn fence_word_is_case_insensitive() {
        let spans = segment("````LaTeX\n E = mc^2\n````");
        assert_eq!(kinds(&spans), vec![(SpanKind::BlockMath, "E = mc^2")]);
    }

    #[test]
    fn other_fences_stay_text() {
        let spans = segment("```python\nprint(1)\n``` and $x$");
        assert_eq!(
            kinds(&spans),
            vec![
                (SpanKind::Text, "```python\nprint(1)\n``` and"),
                (SpanKind::InlineMath, "x"),
            ]
        );
    }

    #[test]
    fn fence_word_must_end_at_word_boundary() {
        let spans = segment("```latexify me```");
        assert_eq!(kinds(&spans), vec![(SpanKind::Text, "```latexify me```")]);
    }

    #[test]
    fn escaped_dollar_is_literal() {
        let spans = segment("costs \\$5 and $x$");
        assert_eq!(
            kinds(&spans),
            vec![(SpanKind::Text, "costs \\$5 and"), (SpanKind::InlineMath, "x")]
        );
    }

    #[test]
    fn handles_multibyte_text() {
        let spans = segment("Δ ist $\\Delta$ — ok");
        assert_eq!(
            kinds(&spans),
            vec![
                (SpanKind::Text, "Δ ist"),
                (SpanKind::InlineMath, "\\Delta"),
                (SpanKind::Text, "— ok"),
            ]
        );
    }

    #[test]
    fn source_ranges_reconstruct_input() {
        let inputs = [
            "Use $x^2$ and $$\\int_0^1 f(x)dx$$ here",
            "The area is ```latex A = \\pi r^2``` for a circle.",
            "$a$$$b$$```latex c```",
            "  lead\n\n$$ x $$\n\ntrail  ",
        ];
        for raw in inputs {
            let spans = segment(raw);
            let mut cursor = 0;
            for span in &spans {
                assert!(raw[cursor..span.source_range.start].trim().is_empty(), "gap in {raw:?}");
                let source = &raw[span.source_range.clone()];
                match span.kind {
                    SpanKind::Text => assert_eq!(source, span.content),
                    _ => assert!(source.contains(span.content.as_str())),
                }
                cursor = span.source_range.end;
            }
            assert!(raw[cursor..].trim().is_empty(), "tail lost in {raw:?}");
        }
    }

    #[test]
    fn delimiters_reinserted_reproduce_input() {
        let raw = "Use $x^2$ and $$y$$ then ```latex z``` end";
        let rebuilt: Vec<String> = segment(raw)
            .into_iter()
            .map(|span| match span.kind {
                SpanKind::Text => span.content,
                SpanKind::InlineMath => format!("${}$", span.content),
                SpanKind::BlockMath => raw[span.source_range].to_string(),
            })
            .collect();
        assert_eq!(rebuilt.join(" "), raw);
    }
}
