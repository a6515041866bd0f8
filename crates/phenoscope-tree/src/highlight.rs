//! Search-term highlighting for node labels.
//!
//! One rule for every tree: the first case-insensitive occurrence of the
//! query is marked. Concatenating the spans always gives back the label.

use std::ops::Range;

use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Span {
    pub text: String,
    pub is_match: bool,
}

impl Span {
    fn plain(text: &str) -> Self {
        Self { text: text.to_string(), is_match: false }
    }

    fn matched(text: &str) -> Self {
        Self { text: text.to_string(), is_match: true }
    }
}

/// Byte range of the first case-insensitive occurrence of `query` in `label`.
///
/// Comparison is per character, so a match always starts and ends on a
/// character boundary of `label` even when case folding changes byte lengths.
pub fn find_match(label: &str, query: &str) -> Option<Range<usize>> {
    if query.is_empty() {
        return None;
    }
    let wanted: Vec<char> = query.chars().collect();

    'start: for (start, _) in label.char_indices() {
        let mut end = start;
        let mut rest = label[start..].chars();
        for q in &wanted {
            match rest.next() {
                Some(c) if chars_match(c, *q) => end += c.len_utf8(),
                _ => continue 'start,
            }
        }
        return Some(start..end);
    }
    None
}

fn chars_match(a: char, b: char) -> bool {
    a == b || a.to_lowercase().eq(b.to_lowercase())
}

/// Split `label` into non-matching and matching spans for `query`.
///
/// Empty spans are omitted, except that an empty label yields one empty
/// non-matching span.
pub fn highlight(label: &str, query: &str) -> Vec<Span> {
    let Some(range) = find_match(label, query) else {
        return vec![Span::plain(label)];
    };

    let mut spans = Vec::with_capacity(3);
    if range.start > 0 {
        spans.push(Span::plain(&label[..range.start]));
    }
    spans.push(Span::matched(&label[range.clone()]));
    if range.end < label.len() {
        spans.push(Span::plain(&label[range.end..]));
    }
    spans
}
