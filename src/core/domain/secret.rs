//! Secret field record.
//!
//! One discovered occurrence of a secret literal in a source file.

use std::path::{Path, PathBuf};

use crate::core::tag;
use crate::core::types::Tag;

/// A secret literal found in source, together with the tag that replaces it.
///
/// The tag is assigned once at construction and never changes.
#[derive(Clone, PartialEq, Eq)]
pub struct SecretFieldRecord {
    tag: Tag,
    file_path: PathBuf,
    line_number: usize,
    field_keyword: String,
    field_value: String,
    secret_value: String,
    from_file: bool,
}

impl SecretFieldRecord {
    /// Create a record with a freshly generated tag.
    ///
    /// `line_number` is the 0-based index of the keyword line itself.
    pub fn new(
        file_path: impl Into<PathBuf>,
        line_number: usize,
        field_keyword: impl Into<String>,
        field_value: impl Into<String>,
        secret_value: impl Into<String>,
        from_file: bool,
    ) -> Self {
        Self::with_tag(
            tag::generate(),
            file_path,
            line_number,
            field_keyword,
            field_value,
            secret_value,
            from_file,
        )
    }

    /// Rebuild a record whose tag was assigned earlier, e.g. when reading
    /// the secret store.
    pub(crate) fn with_tag(
        tag: Tag,
        file_path: impl Into<PathBuf>,
        line_number: usize,
        field_keyword: impl Into<String>,
        field_value: impl Into<String>,
        secret_value: impl Into<String>,
        from_file: bool,
    ) -> Self {
        Self {
            tag,
            file_path: file_path.into(),
            line_number,
            field_keyword: field_keyword.into(),
            field_value: field_value.into(),
            secret_value: secret_value.into(),
            from_file,
        }
    }

    pub fn tag(&self) -> &str {
        &self.tag
    }

    /// Absolute path of the source file holding the literal.
    pub fn file_path(&self) -> &Path {
        &self.file_path
    }

    /// 0-based index of the keyword/value line.
    pub fn line_number(&self) -> usize {
        self.line_number
    }

    pub fn field_keyword(&self) -> &str {
        &self.field_keyword
    }

    /// The literal as it appeared in source.
    pub fn field_value(&self) -> &str {
        &self.field_value
    }

    /// The secret content: plaintext, or base64 of file bytes when
    /// [`from_file`](Self::from_file) is set.
    pub fn secret_value(&self) -> &str {
        &self.secret_value
    }

    pub fn from_file(&self) -> bool {
        self.from_file
    }
}

impl std::fmt::Debug for SecretFieldRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SecretFieldRecord")
            .field("tag", &self.tag)
            .field("file_path", &self.file_path)
            .field("line_number", &self.line_number)
            .field("field_keyword", &self.field_keyword)
            .field("secret_value", &"<redacted>")
            .field("from_file", &self.from_file)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_assigns_unique_tags() {
        let a = SecretFieldRecord::new("/p/Heart.rs", 3, "password", "pw", "pw", false);
        let b = SecretFieldRecord::new("/p/Heart.rs", 3, "password", "pw", "pw", false);
        assert!(tag::is_valid(a.tag()));
        assert_ne!(a.tag(), b.tag());
        assert_ne!(a, b);
    }

    #[test]
    fn test_debug_redacts_secret() {
        let record = SecretFieldRecord::new("/p/Heart.rs", 0, "password", "hunter2", "hunter2", false);
        let debug = format!("{:?}", record);
        assert!(!debug.contains("hunter2"));
        assert!(debug.contains(record.tag()));
    }
}
