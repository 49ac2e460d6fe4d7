//! Secret discovery during resource construction.
//!
//! Resource constructors pass every secret argument through a
//! [`SecretDiscovery`] together with the caller's location. A wrapped tag is
//! swapped for the value registered under it; a plaintext literal is located
//! in the caller's source, recorded in the registry as plaintext, and passed
//! through.
//!
//! Source lines are cached per file and re-read once the file's modification
//! time or length changes, so a rewrite between two resolutions is seen.

use std::cell::RefCell;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::rc::Rc;
use std::time::SystemTime;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use tracing::{debug, trace};

use crate::core::domain::SecretFieldRecord;
use crate::core::registry::Registry;
use crate::core::source::{find_kwarg_line, CallerContext};
use crate::core::tag;
use crate::error::Result;

/// File state a cached read is valid for.
#[derive(Clone, Copy, PartialEq, Eq)]
struct Stamp {
    modified: Option<SystemTime>,
    len: u64,
}

impl Stamp {
    fn of(path: &Path) -> Result<Self> {
        let meta = fs::metadata(path)?;
        Ok(Self {
            modified: meta.modified().ok(),
            len: meta.len(),
        })
    }
}

/// Resolves secret arguments against a registry, caching source lines per
/// file.
pub struct SecretDiscovery<'r> {
    registry: &'r Registry,
    sources: RefCell<HashMap<PathBuf, (Stamp, Rc<Vec<String>>)>>,
}

impl<'r> SecretDiscovery<'r> {
    pub fn new(registry: &'r Registry) -> Self {
        Self {
            registry,
            sources: RefCell::new(HashMap::new()),
        }
    }

    pub fn registry(&self) -> &'r Registry {
        self.registry
    }

    /// Resolve an inline secret argument.
    ///
    /// Returns the registered value for a wrapped tag, or the literal itself
    /// for plaintext. Plaintext is recorded only while the registry is
    /// enabled, but is always located so a literal that cannot be found in
    /// the caller's source fails early.
    ///
    /// # Errors
    ///
    /// Returns `SourceError::KwargNotFound` if the literal is not on a
    /// `keyword` line of the call at `caller`, or a registry error for an
    /// unknown tag.
    pub fn resolve(&self, caller: &CallerContext, keyword: &str, literal: &str) -> Result<String> {
        self.resolve_with(caller, keyword, literal, false)
    }

    /// Resolve a secret given as a path to a file.
    ///
    /// The file's bytes become the secret, base64 encoded. Relative paths are
    /// taken relative to the directory of the caller's source file.
    ///
    /// # Errors
    ///
    /// As [`resolve`](Self::resolve), plus IO errors reading the file.
    pub fn resolve_file(&self, caller: &CallerContext, keyword: &str, literal: &str) -> Result<String> {
        self.resolve_with(caller, keyword, literal, true)
    }

    fn resolve_with(
        &self,
        caller: &CallerContext,
        keyword: &str,
        literal: &str,
        from_file: bool,
    ) -> Result<String> {
        if let Some(tag) = tag::unwrap(literal) {
            return match self.registry.get_secret(&tag)? {
                Some(record) => {
                    trace!(tag = %tag, keyword, "tag resolved");
                    Ok(record.secret_value().to_string())
                }
                None => Ok(literal.to_string()),
            };
        }

        let caller = caller.absolute()?;
        let lines = self.lines(caller.file())?;
        let line_number = find_kwarg_line(&lines, caller.line_index(), keyword, literal)?;

        let secret = if from_file {
            read_encoded(&caller, literal)?
        } else {
            literal.to_string()
        };

        if self.registry.is_enabled() {
            let record = SecretFieldRecord::new(
                caller.file(),
                line_number,
                keyword,
                literal,
                secret.clone(),
                from_file,
            );
            debug!(
                tag = record.tag(),
                path = %caller.file().display(),
                line = line_number,
                keyword,
                "plaintext secret discovered"
            );
            self.registry.register_plaintext(record)?;
        }
        Ok(secret)
    }

    fn lines(&self, path: &Path) -> Result<Rc<Vec<String>>> {
        let stamp = Stamp::of(path)?;
        if let Some((cached, lines)) = self.sources.borrow().get(path) {
            if *cached == stamp {
                return Ok(Rc::clone(lines));
            }
            trace!(path = %path.display(), "source changed, re-reading");
        }
        let contents = fs::read_to_string(path)?;
        let lines = Rc::new(contents.lines().map(str::to_string).collect::<Vec<_>>());
        self.sources
            .borrow_mut()
            .insert(path.to_path_buf(), (stamp, Rc::clone(&lines)));
        Ok(lines)
    }
}

fn read_encoded(caller: &CallerContext, literal: &str) -> Result<String> {
    let path = Path::new(literal);
    let path = if path.is_absolute() {
        path.to_path_buf()
    } else {
        caller
            .file()
            .parent()
            .map(|dir| dir.join(path))
            .unwrap_or_else(|| path.to_path_buf())
    };
    let bytes = fs::read(&path)?;
    trace!(path = %path.display(), len = bytes.len(), "secret file read");
    Ok(STANDARD.encode(bytes))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{Error, RegistryError, SourceError};
    use tempfile::TempDir;

    const SOURCE: &str = "let auth = Resource::basic_auth(&discovery, BasicAuth {\n    username: \"asdfg\".into(),\n    password: \"qwerty\".into(),\n    keyfile: \"./id_ed25519\".into(),\n})?;\n";

    fn setup() -> (TempDir, CallerContext) {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("Heart.rs");
        fs::write(&path, SOURCE).unwrap();
        fs::write(tmp.path().join("id_ed25519"), b"\x00key-bytes\xff").unwrap();
        (tmp, CallerContext::new(path, 1))
    }

    #[test]
    fn test_plaintext_is_registered() {
        let (_tmp, caller) = setup();
        let registry = Registry::new();
        registry.enable();
        let discovery = SecretDiscovery::new(&registry);

        assert_eq!(discovery.resolve(&caller, "password", "qwerty").unwrap(), "qwerty");
        let secrets = registry.get_all_secrets().unwrap();
        assert_eq!(secrets.len(), 1);
        assert_eq!(secrets[0].line_number(), 2);
        assert_eq!(secrets[0].field_keyword(), "password");
        assert_eq!(secrets[0].file_path(), caller.file());
        assert!(!secrets[0].from_file());
    }

    #[test]
    fn test_file_secret_is_base64() {
        let (_tmp, caller) = setup();
        let registry = Registry::new();
        registry.enable();
        let discovery = SecretDiscovery::new(&registry);

        let secret = discovery.resolve_file(&caller, "keyfile", "./id_ed25519").unwrap();
        assert_eq!(secret, STANDARD.encode(b"\x00key-bytes\xff"));

        let record = &registry.get_all_secrets().unwrap()[0];
        assert!(record.from_file());
        assert_eq!(record.field_value(), "./id_ed25519");
        assert_eq!(record.line_number(), 3);
    }

    #[test]
    fn test_tag_resolves_to_registered_value() {
        let (_tmp, caller) = setup();
        let registry = Registry::new();
        registry.enable();
        let record = SecretFieldRecord::new(caller.file(), 2, "password", "qwerty", "qwerty", false);
        registry.register_secret(record.clone()).unwrap();
        let discovery = SecretDiscovery::new(&registry);

        let wrapped = tag::wrap(record.tag()).unwrap();
        assert_eq!(discovery.resolve(&caller, "password", &wrapped).unwrap(), "qwerty");
        assert_eq!(registry.get_all_secrets().unwrap().len(), 1);
    }

    #[test]
    fn test_unknown_tag() {
        let (_tmp, caller) = setup();
        let registry = Registry::new();
        registry.enable();
        let discovery = SecretDiscovery::new(&registry);
        let wrapped = tag::wrap(&tag::generate()).unwrap();

        assert!(matches!(
            discovery.resolve(&caller, "password", &wrapped),
            Err(Error::Registry(RegistryError::SecretNotFound(Some(_))))
        ));

        registry.set_silent(true);
        assert_eq!(discovery.resolve(&caller, "password", &wrapped).unwrap(), wrapped);
    }

    #[test]
    fn test_locator_failure_registers_nothing() {
        let (_tmp, caller) = setup();
        let registry = Registry::new();
        registry.enable();
        let discovery = SecretDiscovery::new(&registry);

        assert!(matches!(
            discovery.resolve(&caller, "password", "not-in-source"),
            Err(Error::Source(SourceError::KwargNotFound { .. }))
        ));
        registry.set_silent(true);
        assert!(registry.get_all_secrets().unwrap().is_empty());
    }

    #[test]
    fn test_discovered_plaintext_is_forbidden() {
        let (_tmp, caller) = setup();
        let registry = Registry::new();
        registry.enable();
        let discovery = SecretDiscovery::new(&registry);

        discovery.resolve(&caller, "password", "qwerty").unwrap();
        match registry.assert_all_encrypted() {
            Err(Error::Registry(RegistryError::ForbiddenPlaintext { path, line })) => {
                assert_eq!(path, caller.file());
                assert_eq!(line, 2);
            }
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn test_rewritten_source_is_reread() {
        let (_tmp, caller) = setup();
        let registry = Registry::new();
        registry.enable();
        let discovery = SecretDiscovery::new(&registry);
        discovery.resolve(&caller, "password", "qwerty").unwrap();

        let rewritten = SOURCE.replace("\"qwerty\"", "\"changed-password\"");
        fs::write(caller.file(), rewritten).unwrap();

        assert!(matches!(
            discovery.resolve(&caller, "password", "qwerty"),
            Err(Error::Source(SourceError::KwargNotFound { .. }))
        ));
        assert_eq!(
            discovery.resolve(&caller, "password", "changed-password").unwrap(),
            "changed-password"
        );
    }

    #[test]
    fn test_disabled_registry_passes_plaintext_through() {
        let (_tmp, caller) = setup();
        let registry = Registry::new();
        let discovery = SecretDiscovery::new(&registry);

        assert_eq!(discovery.resolve(&caller, "username", "asdfg").unwrap(), "asdfg");
        registry.enable();
        assert!(registry.get_all_secrets().is_err());
    }
}
