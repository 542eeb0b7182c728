//! Locating the structured payload inside a free-text reply.
//!
//! Two stages run before any parse: a fenced block tagged as JSON is
//! preferred over the whole text, then known wrapper markers are stripped.

use lazy_static::lazy_static;
use regex::Regex;
use std::ops::Range;

lazy_static! {
    /// A fenced block tagged as structured data. An unterminated fence runs
    /// to the end of the text so truncated replies still reach the parser.
    static ref TAGGED_FENCE: Regex = Regex::new(
        r"(?is)```[ \t]*(?:json|jsonc|json5)[ \t]*\r?\n(.*?)(?:```|\z)"
    ).unwrap();

    /// Untagged fence lines wrapped around the whole payload.
    static ref BARE_FENCE: Regex = Regex::new(r"(?s)\A```[ \t]*\r?\n(.*?)\r?\n?```\s*\z").unwrap();

    /// XML-ish wrapper tags some models emit around JSON.
    static ref WRAPPER_TAGS: Regex = Regex::new(
        r"(?is)\A<(json|output|result|response)>\s*(.*?)\s*</(?:json|output|result|response)>\s*\z"
    ).unwrap();

    /// A leading "JSON:" style label.
    static ref LEADING_LABEL: Regex = Regex::new(r"(?i)\A(?:json|output|result)\s*:\s*").unwrap();
}

/// The candidate payload text and whatever surrounded it.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Located {
    /// Text handed to the strict parser
    pub body: String,
    /// Free text outside the payload, trimmed
    pub residual: String,
}

/// Stage one and two: pick the fenced block if present, then strip wrappers.
pub(crate) fn locate(raw: &str) -> Located {
    let (inner, residual) = match TAGGED_FENCE.captures(raw) {
        Some(caps) => {
            let whole = caps.get(0).map(|m| m.range()).unwrap_or(0..0);
            let inner = caps.get(1).map(|m| m.as_str()).unwrap_or_default();
            let residual = join_residual(&raw[..whole.start], &raw[whole.end..]);
            (inner, residual)
        }
        None => (raw, String::new()),
    };

    Located {
        body: strip_wrappers(inner).to_string(),
        residual,
    }
}

/// Remove known wrapper markers around a payload.
pub(crate) fn strip_wrappers(text: &str) -> &str {
    let mut current = text.trim().trim_start_matches('\u{feff}').trim();

    // Wrappers can nest (a tag inside a bare fence), so peel until stable.
    loop {
        let before = current;

        if let Some(inner) = BARE_FENCE.captures(current).and_then(|c| c.get(1)) {
            current = inner.as_str().trim();
        }
        if let Some(inner) = WRAPPER_TAGS.captures(current).and_then(|c| c.get(2)) {
            current = inner.as_str().trim();
        }
        if let Some(label) = LEADING_LABEL.find(current) {
            current = current[label.end()..].trim();
        }

        if current == before {
            return current;
        }
    }
}

/// Every balanced JSON object or array in `text`, in order of its opening
/// bracket.
///
/// Each `{` or `[` is tried as a start, so spans may nest or overlap.
/// Callers decide which span is the payload.
pub(crate) fn balanced_spans(text: &str) -> impl Iterator<Item = Range<usize>> + '_ {
    text.match_indices(['{', '['])
        .filter_map(move |(start, _)| balanced_span_at(text, start))
}

/// The balanced span opening at byte `start`.
///
/// String literals and escapes are respected so braces inside strings do
/// not unbalance the scan. Returns `None` when nothing balances.
fn balanced_span_at(text: &str, start: usize) -> Option<Range<usize>> {
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (offset, ch) in text[start..].char_indices() {
        if in_string {
            match ch {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }

        match ch {
            '"' => in_string = true,
            '{' | '[' => depth += 1,
            '}' | ']' => {
                depth = depth.checked_sub(1)?;
                if depth == 0 {
                    let end = start + offset + ch.len_utf8();
                    return Some(start..end);
                }
            }
            _ => {}
        }
    }

    None
}

/// Join the text before and after a payload into one residual string.
pub(crate) fn join_residual(before: &str, after: &str) -> String {
    let before = before.trim();
    let after = after.trim();
    match (before.is_empty(), after.is_empty()) {
        (true, true) => String::new(),
        (false, true) => before.to_string(),
        (true, false) => after.to_string(),
        (false, false) => format!("{}\n\n{}", before, after),
    }
}
