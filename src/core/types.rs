//! Type aliases for domain concepts.
//!
//! Provides semantic type aliases to make function signatures more descriptive.

/// An unwrapped tag: 32 lowercase hex characters.
pub type Tag = String;

/// A tag with its `[ENC_ID>` / `<ID_END]` delimiters, as it appears in source.
pub type WrappedTag = String;

/// A deployment identifier (32 lowercase hex characters).
pub type DeploymentId = String;

/// An age public key string (starts with "age1...").
pub type PublicKey = String;
