//! Secret store: one JSON file per tag.
//!
//! Each discovered secret is persisted under a designated directory in a
//! file named by its tag. Source paths are stored relative to the project
//! root so the store stays valid across checkouts. When recipients are
//! configured, the secret value is sealed to them with age.

use std::fs;
use std::path::{Path, PathBuf};

use age::x25519;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::core::cipher;
use crate::core::domain::SecretFieldRecord;
use crate::core::project::Project;
use crate::core::tag;
use crate::error::{CipherError, Result, ValidationError};

/// On-disk form of a [`SecretFieldRecord`].
#[derive(Debug, Serialize, Deserialize)]
struct StoredSecret {
    tag: String,
    file_path: String,
    line_number: usize,
    field_keyword: String,
    field_value: String,
    secret_value: String,
    from_file: bool,
    #[serde(default)]
    sealed: bool,
}

/// Writer and reader for the per-tag secret files.
pub struct SecretStore {
    dir: PathBuf,
    project: Project,
    recipients: Vec<x25519::Recipient>,
}

impl SecretStore {
    /// Store plaintext records under `dir`.
    pub fn new(dir: impl Into<PathBuf>, project: Project) -> Self {
        Self {
            dir: dir.into(),
            project,
            recipients: Vec::new(),
        }
    }

    /// Seal secret values to `recipients` on write.
    pub fn with_recipients(mut self, recipients: Vec<x25519::Recipient>) -> Self {
        self.recipients = recipients;
        self
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Write one file per record, fully overwriting existing files.
    ///
    /// An empty slice does nothing: the directory is neither created nor
    /// cleared.
    ///
    /// # Errors
    ///
    /// Returns `PathError` if a record's source file is not under the
    /// project root, or an IO/cipher error if writing fails.
    pub fn write(&self, records: &[SecretFieldRecord]) -> Result<()> {
        if records.is_empty() {
            return Ok(());
        }
        fs::create_dir_all(&self.dir)?;

        let sealed = !self.recipients.is_empty();
        for record in records {
            let (field_value, secret_value) = if sealed {
                (
                    cipher::seal(record.field_value(), &self.recipients)?,
                    cipher::seal(record.secret_value(), &self.recipients)?,
                )
            } else {
                (
                    record.field_value().to_string(),
                    record.secret_value().to_string(),
                )
            };
            let stored = StoredSecret {
                tag: record.tag().to_string(),
                file_path: self.project.to_relative(record.file_path())?,
                line_number: record.line_number(),
                field_keyword: record.field_keyword().to_string(),
                field_value,
                secret_value,
                from_file: record.from_file(),
                sealed,
            };
            fs::write(self.dir.join(record.tag()), serde_json::to_vec(&stored)?)?;
        }

        debug!(dir = %self.dir.display(), count = records.len(), sealed, "secret store written");
        Ok(())
    }

    /// Read every record in the store, restoring absolute source paths.
    ///
    /// Sealed values are opened with `identity`; without one, sealed records
    /// are rejected. Files whose names are not tags are skipped.
    ///
    /// # Errors
    ///
    /// Returns `CipherError::CannotDecrypt` for sealed values that cannot be
    /// opened, or a validation error if a file's tag does not match its name.
    pub fn read_all(&self, identity: Option<&x25519::Identity>) -> Result<Vec<SecretFieldRecord>> {
        if !self.dir.is_dir() {
            return Ok(Vec::new());
        }

        let mut records = Vec::new();
        for entry in fs::read_dir(&self.dir)? {
            let path = entry?.path();
            let name = path.file_name().and_then(|n| n.to_str()).unwrap_or_default();
            if !tag::is_valid(name) {
                warn!(path = %path.display(), "skipping non-tag file in secret store");
                continue;
            }

            let stored: StoredSecret = serde_json::from_slice(&fs::read(&path)?)?;
            if stored.tag != name {
                return Err(ValidationError::Invalid {
                    field: "tag",
                    reason: format!("store file {} holds tag {}", name, stored.tag),
                }
                .into());
            }
            records.push(self.restore(stored, identity)?);
        }

        records.sort_by(|a, b| {
            (a.file_path(), a.line_number()).cmp(&(b.file_path(), b.line_number()))
        });
        Ok(records)
    }

    fn restore(
        &self,
        stored: StoredSecret,
        identity: Option<&x25519::Identity>,
    ) -> Result<SecretFieldRecord> {
        let (field_value, secret_value) = match (stored.sealed, identity) {
            (false, _) => (stored.field_value, stored.secret_value),
            (true, Some(identity)) => (
                cipher::open(&stored.field_value, identity)?,
                cipher::open(&stored.secret_value, identity)?,
            ),
            (true, None) => return Err(CipherError::CannotDecrypt.into()),
        };
        Ok(SecretFieldRecord::with_tag(
            stored.tag,
            self.project.to_absolute(&stored.file_path)?,
            stored.line_number,
            stored.field_keyword,
            field_value,
            secret_value,
            stored.from_file,
        ))
    }
}
