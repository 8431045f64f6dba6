//! Span intermediate representation produced by the segmenter.

use std::ops::Range;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SpanKind {
    Text,
    InlineMath,
    BlockMath,
}

/// A contiguous, typed slice of the segmented text.
///
/// `source_range` is a byte range into the segmented input. For math spans
/// it covers the delimiters; for text spans it covers the trimmed text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Span {
    pub kind: SpanKind,
    pub content: String,
    pub source_range: Range<usize>,
}

impl Span {
    pub fn text(content: impl Into<String>, source_range: Range<usize>) -> Self {
        Self { kind: SpanKind::Text, content: content.into(), source_range }
    }

    pub fn inline_math(content: impl Into<String>, source_range: Range<usize>) -> Self {
        Self { kind: SpanKind::InlineMath, content: content.into(), source_range }
    }

    pub fn block_math(content: impl Into<String>, source_range: Range<usize>) -> Self {
        Self { kind: SpanKind::BlockMath, content: content.into(), source_range }
    }
}
