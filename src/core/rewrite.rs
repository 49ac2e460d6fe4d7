//! In-place swapping of secret literals and wrapped tags in source files.
//!
//! Each file is read whole, edited in memory, and written back whole. Files
//! are processed one at a time; there is no atomicity across files.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, trace};

use crate::core::domain::SecretFieldRecord;
use crate::core::source::{escape_literal, find_literal};
use crate::core::tag;
use crate::error::{Result, SourceError};

/// Which representation to write into the source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Replace the plaintext literal with its wrapped tag.
    Encrypt,
    /// Replace a wrapped tag with the plaintext it stands for.
    Decrypt,
}

/// Rewrite every file referenced by `records` in the given direction.
///
/// Returns the number of lines changed. A record whose line no longer holds
/// its keyword, or already holds the target representation, is left alone,
/// so applying the same direction twice is a no-op.
///
/// # Errors
///
/// Returns `SourceError::MissingFiles` before touching anything if any
/// referenced file does not exist, and `SourceError::LineOutOfRange` before
/// writing a file whose record points past its end.
pub fn rewrite_files(records: &[SecretFieldRecord], direction: Direction) -> Result<usize> {
    let mut by_file: BTreeMap<&Path, Vec<&SecretFieldRecord>> = BTreeMap::new();
    for record in records {
        by_file.entry(record.file_path()).or_default().push(record);
    }

    let missing: Vec<PathBuf> = by_file
        .keys()
        .filter(|path| !path.is_file())
        .map(|path| path.to_path_buf())
        .collect();
    if !missing.is_empty() {
        return Err(SourceError::MissingFiles(missing).into());
    }

    let mut changed = 0;
    for (path, records) in by_file {
        changed += rewrite_file(path, &records, direction)?;
    }
    Ok(changed)
}

fn rewrite_file(path: &Path, records: &[&SecretFieldRecord], direction: Direction) -> Result<usize> {
    let contents = fs::read_to_string(path)?;
    let mut lines: Vec<String> = contents.split_inclusive('\n').map(str::to_string).collect();

    if let Some(record) = records.iter().find(|r| r.line_number() >= lines.len()) {
        return Err(SourceError::LineOutOfRange {
            path: path.to_path_buf(),
            line: record.line_number(),
        }
        .into());
    }

    let mut changed = 0;
    for record in records {
        let line = &lines[record.line_number()];
        if let Some(updated) = rewrite_line(line, record, direction) {
            trace!(tag = record.tag(), line = record.line_number(), ?direction, "line rewritten");
            lines[record.line_number()] = updated;
            changed += 1;
        }
    }

    if changed > 0 {
        fs::write(path, lines.concat())?;
    }
    debug!(path = %path.display(), changed, ?direction, "file processed");
    Ok(changed)
}

/// Compute the replacement for one line, or `None` if nothing applies.
///
/// Only the contents of the literal assigned to the record's keyword are
/// touched, so other arguments on the same line, including keys that end
/// with the keyword, are left alone. Ordinary literals get the escaped
/// source form of the value back on decrypt; raw literals get it verbatim.
fn rewrite_line(line: &str, record: &SecretFieldRecord, direction: Direction) -> Option<String> {
    let wrapped = tag::wrap(record.tag())?;
    let keyword = record.field_keyword();
    let plaintext = record.field_value();

    let (span, replacement) = match direction {
        Direction::Encrypt => {
            if plaintext.is_empty() {
                return None;
            }
            (find_literal(line, keyword, plaintext)?, wrapped)
        }
        Direction::Decrypt => {
            let span = find_literal(line, keyword, &wrapped)?;
            let restored = if span.raw {
                plaintext.to_string()
            } else {
                escape_literal(plaintext)
            };
            (span, restored)
        }
    };

    let mut updated = String::with_capacity(line.len() + replacement.len());
    updated.push_str(&line[..span.range.start]);
    updated.push_str(&replacement);
    updated.push_str(&line[span.range.end..]);
    Some(updated)
}
