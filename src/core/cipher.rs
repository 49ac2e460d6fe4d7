//! Age encryption for secret store payloads.
//!
//! Secret values written to the store are sealed to the deployments' age
//! public keys with ASCII armor, and opened with the age identity recovered
//! from the credential vault.

use std::io::{Read, Write};

use age::x25519;
use tracing::trace;

use crate::error::{CipherError, Result};

/// Encrypt plaintext for one or more age recipients.
///
/// Returns an ASCII-armored string any of the recipients can decrypt.
///
/// # Errors
///
/// Returns `CipherError::EncryptionFailed` if there are no recipients or
/// the age encryptor fails.
pub fn seal(plaintext: &str, recipients: &[x25519::Recipient]) -> Result<String> {
    trace!(recipients = recipients.len(), "sealing");

    let encryptor =
        age::Encryptor::with_recipients(recipients.iter().map(|r| r as &dyn age::Recipient))
            .map_err(|e| CipherError::EncryptionFailed(format!("{}", e)))?;

    let mut encrypted = Vec::new();
    let mut writer = encryptor
        .wrap_output(age::armor::ArmoredWriter::wrap_output(
            &mut encrypted,
            age::armor::Format::AsciiArmor,
        )?)
        .map_err(|e| CipherError::EncryptionFailed(format!("{}", e)))?;

    writer.write_all(plaintext.as_bytes())?;
    let armored = writer
        .finish()
        .map_err(|e| CipherError::EncryptionFailed(format!("{}", e)))?;
    armored
        .finish()
        .map_err(|e| CipherError::ArmorFailed(format!("{}", e)))?;

    String::from_utf8(encrypted)
        .map_err(|e| CipherError::EncryptionFailed(format!("UTF-8 error: {}", e)).into())
}

/// Decrypt an armored age payload.
///
/// # Errors
///
/// Returns `CipherError::CannotDecrypt` for a wrong identity, corrupted
/// armor, or a non-UTF-8 payload.
pub fn open(armored: &str, identity: &x25519::Identity) -> Result<String> {
    trace!(ciphertext_len = armored.len(), "opening");

    let reader = age::armor::ArmoredReader::new(armored.as_bytes());
    let decryptor = age::Decryptor::new(reader).map_err(|_| CipherError::CannotDecrypt)?;

    let mut reader = decryptor
        .decrypt(std::iter::once(identity as &dyn age::Identity))
        .map_err(|_| CipherError::CannotDecrypt)?;

    let mut decrypted = Vec::new();
    reader
        .read_to_end(&mut decrypted)
        .map_err(|_| CipherError::CannotDecrypt)?;

    String::from_utf8(decrypted).map_err(|_| CipherError::CannotDecrypt.into())
}

/// Parse an age public key (`age1...`).
///
/// # Errors
///
/// Returns `CipherError::InvalidPublicKey` if the key format is invalid.
pub fn parse_recipient(key: &str) -> Result<x25519::Recipient> {
    key.parse::<x25519::Recipient>()
        .map_err(|_| CipherError::InvalidPublicKey(key.to_string()).into())
}

/// Parse an age secret key (`AGE-SECRET-KEY-1...`).
///
/// # Errors
///
/// Returns `CipherError::InvalidSecretKey`; the key itself is never echoed.
pub fn parse_identity(key: &str) -> Result<x25519::Identity> {
    key.parse::<x25519::Identity>()
        .map_err(|_| CipherError::InvalidSecretKey.into())
}
