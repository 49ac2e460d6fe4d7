//! Project root lookup and path conversion.
//!
//! Records on disk store paths relative to the project root so a checkout
//! can move without invalidating them. The private config lives outside
//! the project, keyed by a hash of the root path.

use std::path::{Component, Path, PathBuf};

use sha2::{Digest, Sha256};
use tracing::debug;

use crate::core::constants::{PRIVATE_CONFIG_DIR, PUBLIC_CONFIG_FILE, REPO_MARKER};
use crate::error::{ConfigError, PathError, Result};

/// A project checkout, identified by its root directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Project {
    root: PathBuf,
}

impl Project {
    /// Use `root` as the project root without looking for a marker.
    pub fn at(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Walk upward from `start` to the first directory containing `.git`.
    ///
    /// # Errors
    ///
    /// Returns `PathError::RepoNotFound` if no ancestor is a repository root.
    pub fn discover(start: &Path) -> Result<Self> {
        let start = start.canonicalize()?;
        for dir in start.ancestors() {
            if dir.join(REPO_MARKER).is_dir() {
                debug!(root = %dir.display(), "project root found");
                return Ok(Self::at(dir));
            }
        }
        Err(PathError::RepoNotFound.into())
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Convert an absolute path under the root into a forward-slash
    /// relative path.
    ///
    /// # Errors
    ///
    /// Returns `PathError::ExpectedAbsolute` for relative input and
    /// `PathError::OutsideProject` for paths not under the root.
    pub fn to_relative(&self, path: &Path) -> Result<String> {
        if !path.is_absolute() {
            return Err(PathError::ExpectedAbsolute(path.display().to_string()).into());
        }
        let rel = path
            .strip_prefix(&self.root)
            .map_err(|_| PathError::OutsideProject {
                path: path.to_path_buf(),
                root: self.root.clone(),
            })?;

        let parts: Vec<String> = rel
            .components()
            .map(|c| c.as_os_str().to_string_lossy().into_owned())
            .collect();
        Ok(parts.join("/"))
    }

    /// Convert a project-relative path into an absolute one.
    ///
    /// # Errors
    ///
    /// Returns `PathError::ExpectedRelative` if `rel` is absolute on either
    /// POSIX or Windows, or climbs out of the root with `..`.
    pub fn to_absolute(&self, rel: &str) -> Result<PathBuf> {
        if is_absolute_anywhere(rel) {
            return Err(PathError::ExpectedRelative(rel.to_string()).into());
        }
        let path = Path::new(rel);
        if path.components().any(|c| matches!(c, Component::ParentDir)) {
            return Err(PathError::OutsideProject {
                path: path.to_path_buf(),
                root: self.root.clone(),
            }
            .into());
        }
        Ok(self.root.join(path))
    }

    /// The public config file at the project root (`.kupydo`).
    pub fn public_config_path(&self) -> PathBuf {
        self.root.join(PUBLIC_CONFIG_FILE)
    }

    /// The private config file under `home`.
    ///
    /// Named by the first 32 hex characters of the SHA-256 of the root path,
    /// so every checkout at the same location shares one private store.
    pub fn private_config_path_in(&self, home: &Path) -> PathBuf {
        home.join(PRIVATE_CONFIG_DIR).join(self.fingerprint())
    }

    /// The private config file under the user's home directory.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::NoHomeDir` if the home directory is unknown.
    pub fn private_config_path(&self) -> Result<PathBuf> {
        let home = dirs::home_dir().ok_or(ConfigError::NoHomeDir)?;
        Ok(self.private_config_path_in(&home))
    }

    /// First 32 hex characters of the SHA-256 of the root's POSIX path.
    fn fingerprint(&self) -> String {
        let posix = self.root.to_string_lossy().replace('\\', "/");
        let digest = Sha256::digest(posix.as_bytes());
        hex::encode(digest)[..32].to_string()
    }
}

/// True for POSIX absolute paths, Windows drive or UNC paths, and rooted
/// paths, regardless of the host platform.
pub fn is_absolute_anywhere(path: &str) -> bool {
    let bytes = path.as_bytes();
    let drive = bytes.len() >= 2 && bytes[0].is_ascii_alphabetic() && bytes[1] == b':';
    path.starts_with('/') || path.starts_with('\\') || drive || Path::new(path).is_absolute()
}
