//! Keyword/value line parsing.

use std::ops::Range;

use regex::Regex;
use tracing::trace;

use super::block::extract_block;
use crate::error::{Result, SourceError};

/// A line split at its first `=` or `:`.
///
/// `keyword` keeps leading indentation and `value` keeps everything after the
/// separator, including trailing punctuation and the line ending, so the
/// three parts concatenate back to the original line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KwargLine<'a> {
    pub keyword: &'a str,
    pub separator: char,
    pub value: &'a str,
}

/// Byte range of a string literal's contents within a line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LiteralSpan {
    pub range: Range<usize>,
    /// Whether the literal is a raw string (`r"..."`, `r#"..."#`).
    pub raw: bool,
}

/// Split a line at whichever of `=` or `:` occurs first.
///
/// Returns `None` when the line has no separator or either side is empty.
pub fn separate_kwarg_line(line: &str) -> Option<KwargLine<'_>> {
    let index = line.find(|c| c == '=' || c == ':')?;
    let (keyword, rest) = line.split_at(index);
    let separator = rest.chars().next()?;
    let value = &rest[separator.len_utf8()..];

    if keyword.is_empty() || value.is_empty() {
        return None;
    }
    Some(KwargLine {
        keyword,
        separator,
        value,
    })
}

/// Escape `value` the way it is written inside an ordinary `"..."` literal.
pub fn escape_literal(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '\\' => escaped.push_str("\\\\"),
            '"' => escaped.push_str("\\\""),
            '\n' => escaped.push_str("\\n"),
            '\r' => escaped.push_str("\\r"),
            '\t' => escaped.push_str("\\t"),
            '\0' => escaped.push_str("\\0"),
            c => escaped.push(c),
        }
    }
    escaped
}

/// Build the pattern that matches `keyword` assigned the literal `value`.
///
/// Accepts `keyword = "value"` as well as `"keyword": "value"` with the
/// keyword quotes optional. The keyword must not be the tail of a longer
/// identifier, and the value must fill the literal exactly. The literal is
/// either quoted, with `value` in its escaped source form (group `esc`), or
/// a raw string holding `value` verbatim (group `raw`).
pub fn kwarg_pattern(keyword: &str, value: &str) -> String {
    format!(
        r##"(?:^|[^\w'"])(?:{kwd}\s*=|['"]?{kwd}['"]?\s*:)\s*(?:r#*"(?P<raw>{raw})"#*|['"](?P<esc>{esc})['"])"##,
        kwd = regex::escape(keyword),
        raw = regex::escape(value),
        esc = regex::escape(&escape_literal(value)),
    )
}

/// Locate the contents of the literal assigning `value` to `keyword` on a
/// single line.
pub fn find_literal(line: &str, keyword: &str, value: &str) -> Option<LiteralSpan> {
    let pattern = Regex::new(&kwarg_pattern(keyword, value)).ok()?;
    let caps = pattern.captures(line)?;
    if let Some(m) = caps.name("raw") {
        return Some(LiteralSpan {
            range: m.range(),
            raw: true,
        });
    }
    caps.name("esc").map(|m| LiteralSpan {
        range: m.range(),
        raw: false,
    })
}

/// Find the line inside the call starting at `from_line` that assigns
/// `value` to `keyword`.
///
/// # Errors
///
/// Returns `SourceError::KwargNotFound` if the call cannot be delimited or
/// no line inside it matches.
pub fn find_kwarg_line<S: AsRef<str>>(
    lines: &[S],
    from_line: usize,
    keyword: &str,
    value: &str,
) -> Result<usize> {
    let not_found = || SourceError::KwargNotFound {
        keyword: keyword.to_string(),
        value: value.to_string(),
    };

    let (start, end) = extract_block(lines, from_line).ok_or_else(not_found)?;
    let pattern = Regex::new(&kwarg_pattern(keyword, value)).map_err(|_| not_found())?;

    for (i, line) in lines.iter().enumerate().take(end + 1).skip(start) {
        let line = line.as_ref();
        if separate_kwarg_line(line).is_some() && pattern.is_match(line) {
            trace!(line = i, keyword, "keyword line found");
            return Ok(i);
        }
    }
    Err(not_found().into())
}
