//! Error types for kupydo.
//!
//! One top-level [`Error`] wraps a focused enum per concern so callers can
//! match on the class of failure (gate, not-found, parse, crypto, config,
//! path) without string inspection.

use std::path::PathBuf;

use thiserror::Error;

/// Top-level error.
#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error(transparent)]
    Source(#[from] SourceError),

    #[error(transparent)]
    Cipher(#[from] CipherError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Path(#[from] PathError),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Registry gate and lookup failures.
#[derive(Error, Debug)]
pub enum RegistryError {
    #[error("registry is disabled: enable it before registering or querying")]
    Disabled,

    #[error("{}", describe_missing(.0))]
    SecretNotFound(Option<String>),

    #[error("no resource templates have been declared")]
    ResourcesMissing,

    #[error(
        "plaintext secret at {}:{} must be replaced by its tag before deploying",
        .path.display(),
        .line + 1
    )]
    ForbiddenPlaintext { path: PathBuf, line: usize },
}

/// Failures while locating or rewriting secret literals in source files.
#[derive(Error, Debug)]
pub enum SourceError {
    #[error("no line assigning '{value}' to '{keyword}' found in the enclosing call")]
    KwargNotFound { keyword: String, value: String },

    #[error("line {} is out of range for {}", .line, .path.display())]
    LineOutOfRange { path: PathBuf, line: usize },

    #[error("cannot write registered secrets into missing files: {}", format_paths(.0))]
    MissingFiles(Vec<PathBuf>),

    #[error("no stack frame outside of {} was found", .0.display())]
    NoExternalCaller(PathBuf),
}

/// Encryption and decryption failures.
///
/// Variants never carry plaintext or key material.
#[derive(Error, Debug)]
pub enum CipherError {
    #[error("cannot decrypt: wrong password or tampered data")]
    CannotDecrypt,

    #[error("encryption failed: {0}")]
    EncryptionFailed(String),

    #[error("key derivation failed: {0}")]
    KeyDerivation(String),

    #[error("invalid age public key: {0}")]
    InvalidPublicKey(String),

    #[error("invalid age secret key")]
    InvalidSecretKey,

    #[error("armor error: {0}")]
    ArmorFailed(String),
}

/// Config file integrity failures.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("duplicate {field} values not allowed in {file} config file")]
    Duplicate {
        file: &'static str,
        field: &'static str,
    },

    #[error("failed to read config file {}: {}", .path.display(), .source)]
    ReadFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config file {}: {}", .path.display(), .source)]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("unable to determine home directory")]
    NoHomeDir,
}

/// Path kind and location failures.
#[derive(Error, Debug)]
pub enum PathError {
    #[error("expected a relative path, got: {0}")]
    ExpectedRelative(String),

    #[error("expected an absolute path, got: {0}")]
    ExpectedAbsolute(String),

    #[error("{} is outside of the project root {}", .path.display(), .root.display())]
    OutsideProject { path: PathBuf, root: PathBuf },

    #[error("not inside a git repository")]
    RepoNotFound,
}

/// Malformed identifiers and field values.
#[derive(Error, Debug)]
pub enum ValidationError {
    #[error("invalid {field}: {reason}")]
    Invalid { field: &'static str, reason: String },
}

fn describe_missing(tag: &Option<String>) -> String {
    match tag {
        Some(tag) => format!("unable to find secret in registry by tag: '{}'", tag),
        None => "no secrets have been registered".to_string(),
    }
}

fn format_paths(paths: &[PathBuf]) -> String {
    paths
        .iter()
        .map(|p| p.display().to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

pub type Result<T> = std::result::Result<T, Error>;
