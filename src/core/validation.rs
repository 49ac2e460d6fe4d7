//! Input validation for deployment config records.
//!
//! Validates deployment ids, salts, aliases, and hex-encoded cipher parts.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;

use crate::core::constants::{ALIAS_MAX_LEN, SALT_B64_LEN, SALT_LEN, TAG_LEN};
use crate::error::{Result, ValidationError};

/// Validate a deployment id: 32 lowercase hex characters.
///
/// # Errors
///
/// Returns `ValidationError` if the id has the wrong length or alphabet.
pub fn validate_id(id: &str) -> Result<()> {
    if id.len() != TAG_LEN {
        return Err(invalid(
            "id",
            format!("expected {} characters, got {}", TAG_LEN, id.len()),
        ));
    }
    if !id.bytes().all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f')) {
        return Err(invalid("id", "only lowercase hex characters are allowed".to_string()));
    }
    Ok(())
}

/// Validate a KDF salt: 64 base64 characters decoding to 48 bytes.
///
/// # Errors
///
/// Returns `ValidationError` if the salt is malformed.
pub fn validate_salt(salt: &str) -> Result<()> {
    if salt.len() != SALT_B64_LEN {
        return Err(invalid(
            "salt",
            format!("expected {} characters, got {}", SALT_B64_LEN, salt.len()),
        ));
    }
    match STANDARD.decode(salt) {
        Ok(bytes) if bytes.len() == SALT_LEN => Ok(()),
        _ => Err(invalid("salt", "not base64 of 48 bytes".to_string())),
    }
}

/// Validate a deployment alias.
///
/// Aliases must be:
/// - Non-empty and at most 20 characters
/// - Only ASCII letters, digits, and hyphens
///
/// # Errors
///
/// Returns `ValidationError` if the alias is invalid.
pub fn validate_alias(alias: &str) -> Result<()> {
    if alias.is_empty() {
        return Err(invalid("alias", "cannot be empty".to_string()));
    }
    if alias.chars().count() > ALIAS_MAX_LEN {
        return Err(invalid(
            "alias",
            format!("longer than {} characters", ALIAS_MAX_LEN),
        ));
    }
    for (i, ch) in alias.chars().enumerate() {
        if !ch.is_ascii_alphanumeric() && ch != '-' {
            return Err(invalid(
                "alias",
                format!(
                    "invalid character '{}' at position {}. Only A-Z, a-z, 0-9, and hyphen are allowed",
                    ch,
                    i + 1
                ),
            ));
        }
    }
    Ok(())
}

/// Validate a hex-encoded cipher component of the given byte length.
///
/// # Arguments
///
/// * `field` - Component name for error messages
/// * `value` - The hex string
/// * `bytes` - Expected decoded length, or `None` for any non-empty length
///
/// # Errors
///
/// Returns `ValidationError` if the value is not hex or has the wrong length.
pub fn validate_hex(field: &'static str, value: &str, bytes: Option<usize>) -> Result<()> {
    let decoded = hex::decode(value).map_err(|e| invalid(field, e.to_string()))?;
    match bytes {
        Some(expected) if decoded.len() != expected => Err(invalid(
            field,
            format!("expected {} bytes, got {}", expected, decoded.len()),
        )),
        None if decoded.is_empty() => Err(invalid(field, "cannot be empty".to_string())),
        _ => Ok(()),
    }
}

fn invalid(field: &'static str, reason: String) -> crate::error::Error {
    ValidationError::Invalid { field, reason }.into()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_ids() {
        assert!(validate_id("0123456789abcdef0123456789abcdef").is_ok());
        assert!(validate_id(&crate::core::tag::generate()).is_ok());
    }

    #[test]
    fn test_invalid_ids() {
        assert!(validate_id("").is_err());
        assert!(validate_id("0123456789ABCDEF0123456789ABCDEF").is_err());
        assert!(validate_id("0123456789abcdef0123456789abcde").is_err());
        assert!(validate_id("g123456789abcdef0123456789abcdef").is_err());
    }

    #[test]
    fn test_salts() {
        assert!(validate_salt(&STANDARD.encode([7u8; 48])).is_ok());
        // Right length, wrong alphabet
        assert!(validate_salt(&"!".repeat(64)).is_err());
        assert!(validate_salt(&STANDARD.encode([7u8; 47])).is_err());
        assert!(validate_salt("").is_err());
    }

    #[test]
    fn test_aliases() {
        assert!(validate_alias("prod").is_ok());
        assert!(validate_alias("eu-west-1").is_ok());
        assert!(validate_alias("A1234567890123456789").is_ok());

        assert!(validate_alias("").is_err());
        assert!(validate_alias("A12345678901234567890").is_err());
        assert!(validate_alias("under_score").is_err());
        assert!(validate_alias("dot.ted").is_err());
        assert!(validate_alias("space d").is_err());
    }

    #[test]
    fn test_hex_components() {
        assert!(validate_hex("nonce", &"ab".repeat(16), Some(16)).is_ok());
        assert!(validate_hex("nonce", &"ab".repeat(12), Some(16)).is_err());
        assert!(validate_hex("ciphertext", "deadbeef", None).is_ok());
        assert!(validate_hex("ciphertext", "", None).is_err());
        assert!(validate_hex("ciphertext", "xyz", None).is_err());
    }
}
