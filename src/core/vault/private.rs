//! Private deployment credentials.
//!
//! Each deployment's age secret key is protected by a password. The key text
//! minus its `AGE-SECRET-KEY-` prefix is split into three ranges, and each
//! range is encrypted with its own part key and nonce. The private config
//! file holding these records lives under the user's home directory.

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use age::secrecy::ExposeSecret;
use age::x25519;
use serde::{Deserialize, Serialize};
use tracing::debug;
use zeroize::Zeroizing;

use super::aes::CipherPart;
use super::kdf::{DerivedKey, KdfProfile};
use crate::core::cipher;
use crate::core::constants::AGE_SECRET_KEY_PREFIX;
use crate::core::project::Project;
use crate::core::tag;
use crate::core::types::DeploymentId;
use crate::core::validation;
use crate::error::{CipherError, ConfigError, Result};

/// Byte offsets splitting the prefix-less key into three parts.
const SPLITS: [usize; 2] = [20, 40];

/// Appended to the last part before encryption, removed after.
const PAD: char = ' ';

/// One deployment's password-protected secret key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeploymentCredential {
    pub id: DeploymentId,
    pub salt: String,
    pub part1: CipherPart,
    pub part2: CipherPart,
    pub part3: CipherPart,
}

impl DeploymentCredential {
    /// Generate a fresh deployment id.
    pub fn generate_id() -> DeploymentId {
        tag::generate()
    }

    /// Protect `secret_key` with `password`.
    ///
    /// # Errors
    ///
    /// Returns a validation error for a malformed id,
    /// `CipherError::InvalidSecretKey` if `secret_key` is not an age secret
    /// key, or a KDF/cipher error.
    pub fn encrypt(
        password: &str,
        secret_key: &str,
        id: &str,
        profile: KdfProfile,
    ) -> Result<Self> {
        validation::validate_id(id)?;
        cipher::parse_identity(secret_key)?;
        let data = secret_key
            .strip_prefix(AGE_SECRET_KEY_PREFIX)
            .filter(|d| d.is_ascii() && d.len() > SPLITS[1])
            .ok_or(CipherError::InvalidSecretKey)?;

        let key = DerivedKey::derive(password, None, profile)?;
        let last = Zeroizing::new(format!("{}{}", &data[SPLITS[1]..], PAD));

        let credential = Self {
            id: id.to_string(),
            salt: key.salt().to_string(),
            part1: CipherPart::encrypt(key.part_key(0), data[..SPLITS[0]].as_bytes())?,
            part2: CipherPart::encrypt(key.part_key(1), data[SPLITS[0]..SPLITS[1]].as_bytes())?,
            part3: CipherPart::encrypt(key.part_key(2), last.as_bytes())?,
        };
        debug!(id = %credential.id, "credential encrypted");
        Ok(credential)
    }

    /// Recover the protected secret key text.
    ///
    /// # Errors
    ///
    /// Returns `CipherError::CannotDecrypt` for a wrong password or tampered
    /// record.
    pub fn decrypt(&self, password: &str, profile: KdfProfile) -> Result<Zeroizing<String>> {
        let key = DerivedKey::derive(password, Some(&self.salt), profile)?;

        let mut text = Zeroizing::new(String::from(AGE_SECRET_KEY_PREFIX));
        for (i, part) in self.parts().iter().enumerate() {
            let bytes = part.decrypt(key.part_key(i))?;
            let chunk = std::str::from_utf8(&bytes).map_err(|_| CipherError::CannotDecrypt)?;
            text.push_str(chunk);
        }

        match text.strip_suffix(PAD) {
            Some(stripped) => Ok(Zeroizing::new(stripped.to_string())),
            None => Err(CipherError::CannotDecrypt.into()),
        }
    }

    /// Decrypt and parse the age identity.
    ///
    /// # Errors
    ///
    /// As [`decrypt`](Self::decrypt), plus `CipherError::InvalidSecretKey`
    /// if the recovered text is not an age secret key.
    pub fn unlock(&self, password: &str, profile: KdfProfile) -> Result<x25519::Identity> {
        let text = self.decrypt(password, profile)?;
        let identity = cipher::parse_identity(&text)?;
        debug!(id = %self.id, "credential unlocked");
        Ok(identity)
    }

    /// Check the id, salt, and every cipher component.
    ///
    /// # Errors
    ///
    /// Returns a validation error naming the bad field.
    pub fn validate(&self) -> Result<()> {
        validation::validate_id(&self.id)?;
        validation::validate_salt(&self.salt)?;
        self.parts().iter().try_for_each(|p| p.validate())
    }

    fn parts(&self) -> [&CipherPart; 3] {
        [&self.part1, &self.part2, &self.part3]
    }
}

/// The private config file: every deployment credential of a project.
#[derive(Debug)]
pub struct PrivateConfig {
    path: PathBuf,
    deployments: Vec<DeploymentCredential>,
}

impl PrivateConfig {
    /// Load the private config of `project` from the user's home directory.
    ///
    /// # Errors
    ///
    /// As [`load`](Self::load), plus `ConfigError::NoHomeDir`.
    pub fn for_project(project: &Project) -> Result<Self> {
        Self::load(project.private_config_path()?)
    }

    /// Load from `path`. A missing or empty file yields an empty config.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Parse` for malformed JSON, a validation error
    /// for a malformed record, and `ConfigError::Duplicate` if records share
    /// an id, salt, or cipher component.
    pub fn load(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        debug!(path = %path.display(), "loading private config");

        let deployments = read_array(&path)?;
        let config = Self::from_deployments(path, deployments)?;
        debug!(deployments = config.deployments.len(), "private config loaded");
        Ok(config)
    }

    /// Build from records, applying the same checks as [`load`](Self::load).
    ///
    /// # Errors
    ///
    /// See [`load`](Self::load).
    pub fn from_deployments(
        path: impl Into<PathBuf>,
        deployments: Vec<DeploymentCredential>,
    ) -> Result<Self> {
        for deployment in &deployments {
            deployment.validate()?;
        }
        check_duplicates(&deployments)?;
        Ok(Self {
            path: path.into(),
            deployments,
        })
    }

    /// Write the config as a pretty JSON array, readable only by the owner.
    ///
    /// # Errors
    ///
    /// Returns an IO or serialization error.
    pub fn save(&self) -> Result<()> {
        debug!(path = %self.path.display(), "saving private config");
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&self.path, serde_json::to_vec_pretty(&self.deployments)?)?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(&self.path, fs::Permissions::from_mode(0o600))?;
        }
        Ok(())
    }

    /// Re-read the file, discarding unsaved changes.
    ///
    /// # Errors
    ///
    /// See [`load`](Self::load).
    pub fn reload(&mut self) -> Result<()> {
        *self = Self::load(self.path.clone())?;
        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn deployments(&self) -> &[DeploymentCredential] {
        &self.deployments
    }

    pub fn get(&self, id: &str) -> Option<&DeploymentCredential> {
        self.deployments.iter().find(|d| d.id == id)
    }

    /// Add a credential, keeping the config duplicate-free.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Duplicate` if the credential shares any unique
    /// value with an existing one; the config is left unchanged.
    pub fn insert(&mut self, credential: DeploymentCredential) -> Result<()> {
        credential.validate()?;
        self.deployments.push(credential);
        if let Err(e) = check_duplicates(&self.deployments) {
            self.deployments.pop();
            return Err(e);
        }
        Ok(())
    }

    /// Remove and return the credential with `id`.
    pub fn remove(&mut self, id: &str) -> Option<DeploymentCredential> {
        let index = self.deployments.iter().position(|d| d.id == id)?;
        Some(self.deployments.remove(index))
    }
}

/// Read a JSON array config file, treating missing or blank files as empty.
pub(super) fn read_array<T: serde::de::DeserializeOwned>(path: &Path) -> Result<Vec<T>> {
    if !path.exists() {
        return Ok(Vec::new());
    }
    let contents = fs::read_to_string(path).map_err(|source| ConfigError::ReadFile {
        path: path.to_path_buf(),
        source,
    })?;
    if contents.trim().is_empty() {
        return Ok(Vec::new());
    }
    serde_json::from_str(&contents).map_err(|source| {
        ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        }
        .into()
    })
}

/// Fail if `values` holds any value twice.
pub(super) fn ensure_unique<'a, I>(file: &'static str, field: &'static str, values: I) -> Result<()>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut seen = HashSet::new();
    if values.into_iter().all(|v| seen.insert(v)) {
        Ok(())
    } else {
        Err(ConfigError::Duplicate { file, field }.into())
    }
}

fn check_duplicates(deployments: &[DeploymentCredential]) -> Result<()> {
    ensure_unique("private", "id", deployments.iter().map(|d| d.id.as_str()))?;
    ensure_unique("private", "salt", deployments.iter().map(|d| d.salt.as_str()))?;

    let parts = || deployments.iter().flat_map(|d| d.parts());
    ensure_unique("private", "ciphertext", parts().map(|p| p.ciphertext.as_str()))?;
    ensure_unique("private", "nonce", parts().map(|p| p.nonce.as_str()))?;
    ensure_unique("private", "tag", parts().map(|p| p.tag.as_str()))
}

/// Generate a fresh age key pair, returning the secret key text and the
/// public key.
pub fn generate_keypair() -> (Zeroizing<String>, String) {
    let identity = x25519::Identity::generate();
    let secret = Zeroizing::new(identity.to_string().expose_secret().to_string());
    (secret, identity.to_public().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use tempfile::TempDir;

    fn credential(password: &str) -> (DeploymentCredential, Zeroizing<String>) {
        let (secret, _) = generate_keypair();
        let id = DeploymentCredential::generate_id();
        let cred = DeploymentCredential::encrypt(password, &secret, &id, KdfProfile::Testing).unwrap();
        (cred, secret)
    }

    #[test]
    fn test_roundtrip() {
        let (cred, secret) = credential("correct horse");
        cred.validate().unwrap();
        let recovered = cred.decrypt("correct horse", KdfProfile::Testing).unwrap();
        assert_eq!(recovered.as_str(), secret.as_str());
        assert!(cred.unlock("correct horse", KdfProfile::Testing).is_ok());
    }

    #[test]
    fn test_wrong_password_fails_closed() {
        let (cred, _) = credential("correct horse");
        assert!(matches!(
            cred.decrypt("battery staple", KdfProfile::Testing),
            Err(Error::Cipher(CipherError::CannotDecrypt))
        ));
    }

    #[test]
    fn test_parts_use_independent_randomness() {
        let (cred, _) = credential("pw");
        let parts = cred.parts();
        assert_ne!(parts[0].nonce, parts[1].nonce);
        assert_ne!(parts[1].nonce, parts[2].nonce);
        assert_ne!(parts[0].ciphertext, parts[1].ciphertext);
    }

    #[test]
    fn test_encrypt_rejects_bad_input() {
        let (secret, public) = generate_keypair();
        let id = DeploymentCredential::generate_id();
        assert!(DeploymentCredential::encrypt("pw", &public, &id, KdfProfile::Testing).is_err());
        assert!(DeploymentCredential::encrypt("pw", &secret, "not-hex", KdfProfile::Testing).is_err());
    }

    #[test]
    fn test_load_missing_or_empty_file() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("private");
        assert!(PrivateConfig::load(&path).unwrap().deployments().is_empty());

        fs::write(&path, "  \n").unwrap();
        assert!(PrivateConfig::load(&path).unwrap().deployments().is_empty());

        fs::write(&path, "{ not json").unwrap();
        assert!(matches!(
            PrivateConfig::load(&path),
            Err(Error::Config(ConfigError::Parse { .. }))
        ));
    }

    #[test]
    fn test_save_load_roundtrip() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join(".kupydo").join("abc");
        let (a, _) = credential("pw");
        let (b, _) = credential("pw");

        let mut config = PrivateConfig::load(&path).unwrap();
        config.insert(a.clone()).unwrap();
        config.insert(b.clone()).unwrap();
        config.save().unwrap();

        let loaded = PrivateConfig::load(&path).unwrap();
        assert_eq!(loaded.deployments(), &[a.clone(), b]);
        assert_eq!(loaded.get(&a.id), Some(&a));

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mode = std::fs::metadata(&path).unwrap().permissions().mode();
            assert_eq!(mode & 0o777, 0o600);
        }
    }

    #[test]
    fn test_insert_rejects_duplicates() {
        let tmp = TempDir::new().unwrap();
        let (a, _) = credential("pw");
        let mut config = PrivateConfig::from_deployments(tmp.path().join("p"), vec![a.clone()]).unwrap();

        let err = config.insert(a.clone()).unwrap_err();
        assert!(matches!(err, Error::Config(ConfigError::Duplicate { field: "id", .. })));
        assert_eq!(config.deployments().len(), 1);

        let (mut b, _) = credential("pw");
        b.part2.tag = a.part1.tag.clone();
        assert!(matches!(
            config.insert(b),
            Err(Error::Config(ConfigError::Duplicate { field: "tag", .. }))
        ));
    }

    #[test]
    fn test_remove() {
        let tmp = TempDir::new().unwrap();
        let (a, _) = credential("pw");
        let mut config = PrivateConfig::from_deployments(tmp.path().join("p"), vec![a.clone()]).unwrap();
        assert_eq!(config.remove(&a.id), Some(a));
        assert!(config.deployments().is_empty());
        assert_eq!(config.remove("missing"), None);
    }
}
