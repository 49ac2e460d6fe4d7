//! Constants used throughout kupydo.
//!
//! Centralizes magic strings and configuration values.

/// Opening delimiter of a wrapped tag.
pub const TAG_PREFIX: &str = "[ENC_ID>";

/// Closing delimiter of a wrapped tag.
pub const TAG_SUFFIX: &str = "<ID_END]";

/// Number of hex characters in an unwrapped tag or deployment id.
pub const TAG_LEN: usize = 32;

/// Public config file name, stored at the project root (.kupydo).
pub const PUBLIC_CONFIG_FILE: &str = ".kupydo";

/// Private config directory relative to HOME (~/.kupydo).
pub const PRIVATE_CONFIG_DIR: &str = ".kupydo";

/// Marker directory that identifies a project root.
pub const REPO_MARKER: &str = ".git";

/// File name every deployment entry point must carry.
pub const DEPLOYMENT_ENTRY_FILE: &str = "Heart.rs";

/// Prefix of an age secret key. Stripped before encryption, restored after.
pub const AGE_SECRET_KEY_PREFIX: &str = "AGE-SECRET-KEY-";

/// Maximum length of a deployment alias.
pub const ALIAS_MAX_LEN: usize = 20;

/// Number of random bytes in a KDF salt (64 chars once base64 encoded).
pub const SALT_LEN: usize = 48;

/// Length of the base64 encoded salt.
pub const SALT_B64_LEN: usize = 64;

/// Environment variable selecting the KDF profile.
pub const KDF_PROFILE_ENV: &str = "KUPYDO_KDF_PROFILE";
