//! Opaque secret identifiers.
//!
//! A tag is 32 lowercase hex characters (128 random bits). In source files it
//! appears wrapped as `[ENC_ID>` + tag + `<ID_END]`, always 40 ASCII
//! characters. Ordinary string literals are checked against this format all
//! the time, so malformed input yields `None` rather than an error.

use rand::RngCore;

use crate::core::constants::{TAG_LEN, TAG_PREFIX, TAG_SUFFIX};
use crate::core::types::{Tag, WrappedTag};

/// Generate a fresh random tag.
pub fn generate() -> Tag {
    let mut bytes = [0u8; TAG_LEN / 2];
    rand::thread_rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}

/// The `(prefix, suffix)` pair that wraps a tag.
pub fn delimiters() -> (&'static str, &'static str) {
    (TAG_PREFIX, TAG_SUFFIX)
}

/// Check an unwrapped tag: exactly 32 characters, all in `[0-9a-f]`.
pub fn is_valid(tag: &str) -> bool {
    tag.len() == TAG_LEN && tag.bytes().all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f'))
}

/// Validate a wrapped tag and return the inner tag.
///
/// Checks, in order: prefix, suffix, length, and hex alphabet.
pub fn validate(wrapped: &str) -> Option<&str> {
    let inner = wrapped.strip_prefix(TAG_PREFIX)?;
    let inner = inner.strip_suffix(TAG_SUFFIX)?;
    is_valid(inner).then_some(inner)
}

/// Wrap a valid tag in its delimiters.
pub fn wrap(tag: &str) -> Option<WrappedTag> {
    is_valid(tag).then(|| format!("{}{}{}", TAG_PREFIX, tag, TAG_SUFFIX))
}

/// Unwrap a wrapped tag into an owned tag.
pub fn unwrap(wrapped: &str) -> Option<Tag> {
    validate(wrapped).map(str::to_string)
}

/// Extract the span from the first `[` to the last `]`.
///
/// Recovers a wrapped tag from surrounding quotes or call syntax, e.g.
/// `"[ENC_ID>...<ID_END]".into(),`. The result still needs [`validate`].
pub fn sanitize(dirty: &str) -> Option<&str> {
    let start = dirty.find('[')?;
    let end = dirty.rfind(']')?;
    (end > start).then(|| &dirty[start..=end])
}
