//! Public deployment metadata.
//!
//! The public config file at the project root lists every deployment's id,
//! alias, entry-point path, and age public key. It is safe to commit.

use std::fs;
use std::path::{Path, PathBuf};

use age::x25519;
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::private::{ensure_unique, read_array};
use crate::core::cipher;
use crate::core::constants::DEPLOYMENT_ENTRY_FILE;
use crate::core::project::{is_absolute_anywhere, Project};
use crate::core::types::{DeploymentId, PublicKey};
use crate::core::validation;
use crate::error::{CipherError, PathError, Result, ValidationError};

/// Non-secret data identifying one deployment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeploymentPublicData {
    pub id: DeploymentId,
    pub alias: String,
    /// Project-relative path of the deployment's entry-point file.
    pub path: String,
    pub pubkey: PublicKey,
}

impl DeploymentPublicData {
    /// Check every field against `project`.
    ///
    /// # Errors
    ///
    /// Returns a validation error for a malformed id or alias,
    /// `PathError::ExpectedRelative` for an absolute path, a validation
    /// error if the path is not an existing entry-point file, and
    /// `CipherError::InvalidPublicKey` for a secret key or malformed public
    /// key.
    pub fn validate(&self, project: &Project) -> Result<()> {
        validation::validate_id(&self.id)?;
        validation::validate_alias(&self.alias)?;
        self.validate_path(project)?;
        validate_pubkey(&self.pubkey)
    }

    /// The age recipient for this deployment.
    ///
    /// # Errors
    ///
    /// Returns `CipherError::InvalidPublicKey` if the key does not parse.
    pub fn recipient(&self) -> Result<x25519::Recipient> {
        cipher::parse_recipient(&self.pubkey)
    }

    fn validate_path(&self, project: &Project) -> Result<()> {
        if is_absolute_anywhere(&self.path) {
            return Err(PathError::ExpectedRelative(self.path.clone()).into());
        }
        let path = project.to_absolute(&self.path)?;
        if !path.is_file() {
            return Err(invalid_path(format!("{} does not exist", self.path)));
        }
        if path.file_name().and_then(|n| n.to_str()) != Some(DEPLOYMENT_ENTRY_FILE) {
            return Err(invalid_path(format!(
                "{} must point to a file named {}",
                self.path, DEPLOYMENT_ENTRY_FILE
            )));
        }
        Ok(())
    }
}

fn invalid_path(reason: String) -> crate::error::Error {
    ValidationError::Invalid {
        field: "path",
        reason,
    }
    .into()
}

fn validate_pubkey(pubkey: &str) -> Result<()> {
    let forbidden = Regex::new(r"^AGE-SECRET-KEY-[0-9A-Z]{59}$")
        .map_err(|e| CipherError::InvalidPublicKey(e.to_string()))?;
    if forbidden.is_match(pubkey) || cipher::parse_identity(pubkey).is_ok() {
        return Err(CipherError::InvalidPublicKey(
            "an age secret key cannot be used as a public key".to_string(),
        )
        .into());
    }

    let allowed = Regex::new(r"^age[0-9a-z]{59}$")
        .map_err(|e| CipherError::InvalidPublicKey(e.to_string()))?;
    if !allowed.is_match(pubkey) {
        return Err(CipherError::InvalidPublicKey(pubkey.to_string()).into());
    }
    cipher::parse_recipient(pubkey).map(|_| ())
}

/// The public config file of a project.
#[derive(Debug)]
pub struct PublicConfig {
    project: Project,
    deployments: Vec<DeploymentPublicData>,
}

impl PublicConfig {
    /// Load `.kupydo` from the project root. A missing or empty file yields
    /// an empty config.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Parse` for malformed JSON, a validation error
    /// for a malformed record, and `ConfigError::Duplicate` if records share
    /// an id, alias, path, or public key.
    pub fn load(project: &Project) -> Result<Self> {
        let path = project.public_config_path();
        debug!(path = %path.display(), "loading public config");

        let deployments = read_array(&path)?;
        let config = Self::from_deployments(project.clone(), deployments)?;
        debug!(deployments = config.deployments.len(), "public config loaded");
        Ok(config)
    }

    /// Build from records, applying the same checks as [`load`](Self::load).
    ///
    /// # Errors
    ///
    /// See [`load`](Self::load).
    pub fn from_deployments(project: Project, deployments: Vec<DeploymentPublicData>) -> Result<Self> {
        for deployment in &deployments {
            deployment.validate(&project)?;
        }
        check_duplicates(&deployments)?;
        Ok(Self {
            project,
            deployments,
        })
    }

    /// Write the config as a pretty JSON array.
    ///
    /// # Errors
    ///
    /// Returns an IO or serialization error.
    pub fn save(&self) -> Result<()> {
        let path = self.path();
        debug!(path = %path.display(), "saving public config");
        fs::write(&path, serde_json::to_vec_pretty(&self.deployments)?)?;
        Ok(())
    }

    /// Re-read the file, discarding unsaved changes.
    ///
    /// # Errors
    ///
    /// See [`load`](Self::load).
    pub fn reload(&mut self) -> Result<()> {
        *self = Self::load(&self.project)?;
        Ok(())
    }

    pub fn path(&self) -> PathBuf {
        self.project.public_config_path()
    }

    pub fn project(&self) -> &Project {
        &self.project
    }

    pub fn deployments(&self) -> &[DeploymentPublicData] {
        &self.deployments
    }

    pub fn get(&self, id: &str) -> Option<&DeploymentPublicData> {
        self.deployments.iter().find(|d| d.id == id)
    }

    pub fn get_by_alias(&self, alias: &str) -> Option<&DeploymentPublicData> {
        self.deployments.iter().find(|d| d.alias == alias)
    }

    /// The deployment whose entry point is `entry`, an absolute path.
    pub fn get_by_entry(&self, entry: &Path) -> Option<&DeploymentPublicData> {
        let rel = self.project.to_relative(entry).ok()?;
        self.deployments.iter().find(|d| d.path == rel)
    }

    /// Add a deployment, keeping the config duplicate-free.
    ///
    /// # Errors
    ///
    /// Returns a validation error for a malformed record, or
    /// `ConfigError::Duplicate` if it shares any unique value with an
    /// existing one; the config is left unchanged.
    pub fn insert(&mut self, deployment: DeploymentPublicData) -> Result<()> {
        deployment.validate(&self.project)?;
        self.deployments.push(deployment);
        if let Err(e) = check_duplicates(&self.deployments) {
            self.deployments.pop();
            return Err(e);
        }
        Ok(())
    }

    /// Remove and return the deployment with `id`.
    pub fn remove(&mut self, id: &str) -> Option<DeploymentPublicData> {
        let index = self.deployments.iter().position(|d| d.id == id)?;
        Some(self.deployments.remove(index))
    }

    /// Age recipients of every deployment.
    ///
    /// # Errors
    ///
    /// Returns `CipherError::InvalidPublicKey` if any key does not parse.
    pub fn recipients(&self) -> Result<Vec<x25519::Recipient>> {
        self.deployments.iter().map(|d| d.recipient()).collect()
    }
}

fn check_duplicates(deployments: &[DeploymentPublicData]) -> Result<()> {
    ensure_unique("public", "id", deployments.iter().map(|d| d.id.as_str()))?;
    ensure_unique("public", "alias", deployments.iter().map(|d| d.alias.as_str()))?;
    ensure_unique("public", "path", deployments.iter().map(|d| d.path.as_str()))?;
    ensure_unique("public", "pubkey", deployments.iter().map(|d| d.pubkey.as_str()))
}
