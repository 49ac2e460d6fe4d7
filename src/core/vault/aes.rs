//! AES-192-GCM encryption of one credential part.
//!
//! Nonces are 16 random bytes and tags 16 bytes. All three components are
//! stored hex encoded.

use aes_gcm::aead::consts::U16;
use aes_gcm::aead::{Aead, KeyInit};
use aes_gcm::aes::Aes192;
use aes_gcm::{AesGcm, Nonce};
use rand::RngCore;
use serde::{Deserialize, Serialize};
use zeroize::Zeroizing;

use crate::core::validation;
use crate::error::{CipherError, Result};

type PartCipher = AesGcm<Aes192, U16>;

const NONCE_LEN: usize = 16;
const TAG_LEN: usize = 16;

/// One encrypted part: ciphertext, nonce, and authentication tag.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CipherPart {
    pub ciphertext: String,
    pub nonce: String,
    pub tag: String,
}

impl CipherPart {
    /// Encrypt `plaintext` under a 24-byte key with a fresh nonce.
    ///
    /// # Errors
    ///
    /// Returns `CipherError::EncryptionFailed` for an empty plaintext or a
    /// key of the wrong length.
    pub fn encrypt(key: &[u8], plaintext: &[u8]) -> Result<Self> {
        if plaintext.is_empty() {
            return Err(CipherError::EncryptionFailed("empty credential part".to_string()).into());
        }
        let cipher = PartCipher::new_from_slice(key)
            .map_err(|_| CipherError::EncryptionFailed("invalid part key length".to_string()))?;

        let mut nonce = [0u8; NONCE_LEN];
        rand::thread_rng().fill_bytes(&mut nonce);

        let mut sealed = cipher
            .encrypt(Nonce::<U16>::from_slice(&nonce), plaintext)
            .map_err(|_| CipherError::EncryptionFailed("AES-GCM encryption failed".to_string()))?;
        let tag = sealed.split_off(sealed.len() - TAG_LEN);

        Ok(Self {
            ciphertext: hex::encode(sealed),
            nonce: hex::encode(nonce),
            tag: hex::encode(tag),
        })
    }

    /// Decrypt and authenticate.
    ///
    /// # Errors
    ///
    /// Returns `CipherError::CannotDecrypt` for a wrong key, malformed hex, or
    /// tampered data. No partial plaintext is ever returned.
    pub fn decrypt(&self, key: &[u8]) -> Result<Zeroizing<Vec<u8>>> {
        let cipher = PartCipher::new_from_slice(key).map_err(|_| CipherError::CannotDecrypt)?;
        let nonce = hex::decode(&self.nonce).map_err(|_| CipherError::CannotDecrypt)?;
        if nonce.len() != NONCE_LEN {
            return Err(CipherError::CannotDecrypt.into());
        }

        let mut sealed = hex::decode(&self.ciphertext).map_err(|_| CipherError::CannotDecrypt)?;
        sealed.extend(hex::decode(&self.tag).map_err(|_| CipherError::CannotDecrypt)?);

        cipher
            .decrypt(Nonce::<U16>::from_slice(&nonce), sealed.as_slice())
            .map(Zeroizing::new)
            .map_err(|_| CipherError::CannotDecrypt.into())
    }

    /// Check that every component is well-formed hex of the right size.
    ///
    /// # Errors
    ///
    /// Returns a validation error naming the bad component.
    pub fn validate(&self) -> Result<()> {
        validation::validate_hex("ciphertext", &self.ciphertext, None)?;
        validation::validate_hex("nonce", &self.nonce, Some(NONCE_LEN))?;
        validation::validate_hex("tag", &self.tag, Some(TAG_LEN))
    }
}
