//! Registry of pending resource templates and discovered secrets.
//!
//! The registry is an explicit context object. Resource constructors queue
//! templates in it, secret discovery records secret fields in it, and the
//! build step drains it by materializing every template under a namespace.
//!
//! Two flags govern it:
//!
//! - `enabled` gates every mutation and query. A disabled registry fails
//!   with [`RegistryError::Disabled`].
//! - `silent` softens failures for inert evaluation passes: not-found
//!   conditions become empty results, and a disabled registry accepts
//!   mutations as no-ops instead of failing.
//!
//! Secrets found as plaintext in source are tracked apart from secrets
//! loaded from the store, so a deployment pass can refuse to proceed while
//! any plaintext remains ([`Registry::assert_all_encrypted`]).
//!
//! Disabling never wipes state; only [`Registry::reset`] does.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Mutex, MutexGuard, PoisonError};

use tracing::{debug, trace};

use crate::core::domain::SecretFieldRecord;
use crate::core::resource::{Resource, ResourceKind, ValidatedValues};
use crate::core::types::Tag;
use crate::error::{RegistryError, Result};

/// A resource declaration waiting for a namespace.
#[derive(Debug, Clone, PartialEq)]
pub struct ResourceTemplate {
    pub kind: ResourceKind,
    pub values: ValidatedValues,
}

#[derive(Debug, Default)]
struct State {
    enabled: bool,
    silent: bool,
    templates: Vec<ResourceTemplate>,
    secrets: BTreeMap<Tag, SecretFieldRecord>,
    plaintext: BTreeSet<Tag>,
}

/// Process-owned registry state.
///
/// Created disabled and not silent.
#[derive(Debug, Default)]
pub struct Registry {
    state: Mutex<State>,
}

/// Outcome of the gate check for one operation.
enum Gate {
    Open,
    /// Disabled but silent: skip the operation.
    Skip,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn enable(&self) {
        self.lock().enabled = true;
        debug!("registry enabled");
    }

    pub fn disable(&self) {
        self.lock().enabled = false;
        debug!("registry disabled");
    }

    pub fn set_silent(&self, silent: bool) {
        self.lock().silent = silent;
        debug!(silent, "registry silent mode changed");
    }

    pub fn is_enabled(&self) -> bool {
        self.lock().enabled
    }

    pub fn is_silent(&self) -> bool {
        self.lock().silent
    }

    /// Queue a template. No deduplication: declaring the same resource
    /// twice queues it twice.
    ///
    /// # Errors
    ///
    /// Returns `RegistryError::Disabled` if the registry is disabled and
    /// not silent.
    pub fn register_template(&self, kind: ResourceKind, values: ValidatedValues) -> Result<()> {
        let mut state = self.lock();
        if let Gate::Skip = gate(&state)? {
            return Ok(());
        }
        trace!(kind = kind.api_kind(), name = values.name(), "template registered");
        state.templates.push(ResourceTemplate { kind, values });
        Ok(())
    }

    /// Insert a secret record keyed by its tag, replacing any record with
    /// the same tag.
    ///
    /// # Errors
    ///
    /// Returns `RegistryError::Disabled` if the registry is disabled and
    /// not silent.
    pub fn register_secret(&self, record: SecretFieldRecord) -> Result<()> {
        let mut state = self.lock();
        if let Gate::Skip = gate(&state)? {
            return Ok(());
        }
        trace!(tag = record.tag(), keyword = record.field_keyword(), "secret registered");
        state.plaintext.remove(record.tag());
        state.secrets.insert(record.tag().to_string(), record);
        Ok(())
    }

    /// Insert a secret that was found as a plaintext literal in source.
    ///
    /// It resolves like any other secret, but keeps
    /// [`assert_all_encrypted`](Self::assert_all_encrypted) failing until the
    /// registry is reset.
    ///
    /// # Errors
    ///
    /// Returns `RegistryError::Disabled` if the registry is disabled and
    /// not silent.
    pub fn register_plaintext(&self, record: SecretFieldRecord) -> Result<()> {
        let mut state = self.lock();
        if let Gate::Skip = gate(&state)? {
            return Ok(());
        }
        trace!(tag = record.tag(), keyword = record.field_keyword(), "plaintext registered");
        state.plaintext.insert(record.tag().to_string());
        state.secrets.insert(record.tag().to_string(), record);
        Ok(())
    }

    /// Fail if any secret was registered as plaintext.
    ///
    /// # Errors
    ///
    /// Returns `RegistryError::Disabled` when disabled and not silent, and
    /// `RegistryError::ForbiddenPlaintext` naming the first offending
    /// location, ordered by file and line.
    pub fn assert_all_encrypted(&self) -> Result<()> {
        let state = self.lock();
        if let Gate::Skip = gate(&state)? {
            return Ok(());
        }
        let first = state
            .plaintext
            .iter()
            .filter_map(|tag| state.secrets.get(tag))
            .min_by(|a, b| {
                (a.file_path(), a.line_number()).cmp(&(b.file_path(), b.line_number()))
            });
        match first {
            Some(record) => Err(RegistryError::ForbiddenPlaintext {
                path: record.file_path().to_path_buf(),
                line: record.line_number(),
            }
            .into()),
            None => Ok(()),
        }
    }

    /// Look up a secret by tag.
    ///
    /// Returns `Ok(None)` for an unknown tag in silent mode.
    ///
    /// # Errors
    ///
    /// Returns `RegistryError::Disabled` when disabled and not silent, and
    /// `RegistryError::SecretNotFound` for an unknown tag when not silent.
    pub fn get_secret(&self, tag: &str) -> Result<Option<SecretFieldRecord>> {
        let state = self.lock();
        gate(&state)?;
        match state.secrets.get(tag) {
            Some(record) => Ok(Some(record.clone())),
            None if state.silent => Ok(None),
            None => Err(RegistryError::SecretNotFound(Some(tag.to_string())).into()),
        }
    }

    /// All registered secrets, ordered by tag.
    ///
    /// # Errors
    ///
    /// Returns `RegistryError::Disabled` when disabled and not silent, and
    /// `RegistryError::SecretNotFound` when nothing is registered and not
    /// silent.
    pub fn get_all_secrets(&self) -> Result<Vec<SecretFieldRecord>> {
        let state = self.lock();
        gate(&state)?;
        if state.secrets.is_empty() && !state.silent {
            return Err(RegistryError::SecretNotFound(None).into());
        }
        Ok(state.secrets.values().cloned().collect())
    }

    /// Number of templates waiting to be materialized.
    pub fn pending_templates(&self) -> usize {
        self.lock().templates.len()
    }

    /// Bind every pending template to `namespace` and build the resources.
    ///
    /// Templates are consumed: a second call without new declarations finds
    /// nothing. Resources are built through the pre-validated path, so no
    /// validation or secret discovery runs again.
    ///
    /// # Errors
    ///
    /// Returns `RegistryError::Disabled` when disabled and not silent, and
    /// `RegistryError::ResourcesMissing` when nothing is pending and not
    /// silent.
    pub fn materialize(&self, namespace: &str) -> Result<Vec<Resource>> {
        let templates = {
            let mut state = self.lock();
            gate(&state)?;
            if state.templates.is_empty() && !state.silent {
                return Err(RegistryError::ResourcesMissing.into());
            }
            std::mem::take(&mut state.templates)
        };

        let resources: Vec<Resource> = templates
            .into_iter()
            .map(|t| Resource::from_validated(t.kind, t.values, Some(namespace)))
            .collect();
        debug!(namespace, count = resources.len(), "templates materialized");
        Ok(resources)
    }

    /// Drop all templates and secrets. Flags are left as they are.
    pub fn reset(&self) {
        let mut state = self.lock();
        state.templates.clear();
        state.secrets.clear();
        state.plaintext.clear();
        debug!("registry reset");
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn gate(state: &State) -> Result<Gate> {
    match (state.enabled, state.silent) {
        (true, _) => Ok(Gate::Open),
        (false, true) => Ok(Gate::Skip),
        (false, false) => Err(RegistryError::Disabled.into()),
    }
}
