//! Emphasis pre-pass.
//!
//! Strips paired markdown emphasis markers (`*`, `**`, `_`, `__`) from text
//! outside math delimiters so the markdown renderer cannot corrupt LaTeX.
//! Markers inside `$...$`, `$$...$$` and latex fences are left untouched.

use std::sync::LazyLock;

use regex::Regex;

use crate::segment::{Scan, scan_at};

static STRONG_STAR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\*\*([^\s*](?:[^*]*?[^\s*])?)\*\*").unwrap());
static STRONG_UNDERSCORE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(^|[^\w])__([^\s_](?:[^_]*?[^\s_])?)__([^\w]|$)").unwrap());
static EM_STAR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\*([^\s*](?:[^*]*?[^\s*])?)\*").unwrap());
static EM_UNDERSCORE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(^|[^\w])_([^\s_](?:[^_]*?[^\s_])?)_([^\w]|$)").unwrap());

/// Remove emphasis markers outside math runs.
///
/// Runs to a fixpoint, so `strip_emphasis(strip_emphasis(x)) == strip_emphasis(x)`.
pub fn strip_emphasis(text: &str) -> String {
    let mut current = text.to_string();
    loop {
        let next = strip_once(&current);
        if next == current {
            return current;
        }
        current = next;
    }
}

fn strip_once(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut chunk_start = 0;
    let mut i = 0;

    while i < text.len() {
        match scan_at(text, i) {
            Scan::Matched(found) => {
                out.push_str(&strip_chunk(&text[chunk_start..found.start]));
                out.push_str(&text[found.start..found.end]);
                i = found.end;
                chunk_start = i;
            }
            Scan::Unterminated => break,
            Scan::NotOpener(skip) => i += skip,
        }
    }

    out.push_str(&strip_chunk(&text[chunk_start..]));
    out
}

fn strip_chunk(chunk: &str) -> String {
    let s = STRONG_STAR.replace_all(chunk, "${1}");
    let s = STRONG_UNDERSCORE.replace_all(&s, "${1}${2}${3}");
    let s = EM_STAR.replace_all(&s, "${1}");
    EM_UNDERSCORE.replace_all(&s, "${1}${2}${3}").into_owned()
}
