//! Argon2id key derivation for deployment credentials.
//!
//! The derived key is a 64-byte Argon2id hash rendered as unpadded base64
//! (86 characters). The three AES part keys are consecutive 24-byte slices
//! of that text. The salt is fed to Argon2 in its base64 form, so stored
//! salts remain usable byte for byte.

use base64::engine::general_purpose::{STANDARD, STANDARD_NO_PAD};
use base64::Engine;
use rand::RngCore;
use tracing::debug;
use zeroize::Zeroizing;

use crate::core::constants::{KDF_PROFILE_ENV, SALT_LEN};
use crate::core::validation;
use crate::error::{CipherError, Result};

/// Argon2 output length in bytes.
const HASH_LEN: usize = 64;

/// Length of one AES-192 part key.
pub const PART_KEY_LEN: usize = 24;

/// Argon2 cost profile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum KdfProfile {
    /// 2^23 KiB of memory.
    #[default]
    Production,
    /// 2^10 KiB of memory. Only for test suites.
    Testing,
}

impl KdfProfile {
    /// `Testing` when `KUPYDO_KDF_PROFILE=testing`, otherwise `Production`.
    pub fn from_env() -> Self {
        Self::from_setting(std::env::var(KDF_PROFILE_ENV).ok().as_deref())
    }

    fn from_setting(setting: Option<&str>) -> Self {
        match setting {
            Some(v) if v.trim().eq_ignore_ascii_case("testing") => KdfProfile::Testing,
            _ => KdfProfile::Production,
        }
    }

    /// Memory cost in KiB.
    pub fn memory_cost(&self) -> u32 {
        match self {
            KdfProfile::Production => 1 << 23,
            KdfProfile::Testing => 1 << 10,
        }
    }
}

/// Key material derived from a password.
pub struct DerivedKey {
    material: Zeroizing<String>,
    salt: String,
}

impl DerivedKey {
    /// Derive from `password`, with a fresh salt or the given base64 salt.
    ///
    /// # Errors
    ///
    /// Returns a validation error for a malformed salt and
    /// `CipherError::KeyDerivation` if Argon2 rejects its input.
    pub fn derive(password: &str, salt: Option<&str>, profile: KdfProfile) -> Result<Self> {
        let salt = match salt {
            Some(salt) => {
                validation::validate_salt(salt)?;
                salt.to_string()
            }
            None => generate_salt(),
        };

        let params = argon2::Params::new(profile.memory_cost(), 1, 4, Some(HASH_LEN))
            .map_err(|e| CipherError::KeyDerivation(format!("invalid Argon2id parameters: {e}")))?;
        let argon2 =
            argon2::Argon2::new(argon2::Algorithm::Argon2id, argon2::Version::V0x13, params);

        let mut hash = Zeroizing::new([0u8; HASH_LEN]);
        argon2
            .hash_password_into(password.as_bytes(), salt.as_bytes(), hash.as_mut())
            .map_err(|e| CipherError::KeyDerivation(format!("Argon2id failed: {e}")))?;

        debug!(?profile, "key derived");
        Ok(Self {
            material: Zeroizing::new(STANDARD_NO_PAD.encode(hash.as_ref())),
            salt,
        })
    }

    /// Base64 salt used for this derivation.
    pub fn salt(&self) -> &str {
        &self.salt
    }

    /// The part key for `index` in `0..3`.
    pub fn part_key(&self, index: usize) -> &[u8] {
        let start = index * PART_KEY_LEN;
        &self.material.as_bytes()[start..start + PART_KEY_LEN]
    }
}

impl std::fmt::Debug for DerivedKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DerivedKey")
            .field("material", &"<redacted>")
            .field("salt", &self.salt)
            .finish()
    }
}

fn generate_salt() -> String {
    let mut bytes = [0u8; SALT_LEN];
    rand::thread_rng().fill_bytes(&mut bytes);
    STANDARD.encode(bytes)
}
