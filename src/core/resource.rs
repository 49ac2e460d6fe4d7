//! Resource construction seam.
//!
//! Every kind has two entry points. [`Resource::declare`] validates raw
//! field input and queues a template in the registry. [`Resource::from_validated`]
//! accepts a bundle that already passed validation and performs no checks
//! and no secret discovery; the registry uses it when binding templates to
//! a namespace.

use std::collections::BTreeMap;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde_json::{json, Map, Value};
use tracing::debug;

use crate::core::discovery::SecretDiscovery;
use crate::core::registry::Registry;
use crate::core::source::CallerContext;
use crate::error::{Error, RegistryError, Result, ValidationError};

/// Raw field input, keyed by field name.
pub type RawValues = BTreeMap<String, Value>;

/// Supported resource kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceKind {
    Namespace,
    ConfigMap,
    Secret,
}

impl ResourceKind {
    /// Kind name as used by the orchestration API.
    pub fn api_kind(&self) -> &'static str {
        match self {
            ResourceKind::Namespace => "Namespace",
            ResourceKind::ConfigMap => "ConfigMap",
            ResourceKind::Secret => "Secret",
        }
    }

    /// Whether instances live inside a namespace.
    pub fn is_namespaced(&self) -> bool {
        !matches!(self, ResourceKind::Namespace)
    }

    fn fields(&self) -> &'static [&'static str] {
        match self {
            ResourceKind::Namespace => &["name", "labels", "annotations"],
            ResourceKind::ConfigMap => &[
                "name",
                "namespace",
                "labels",
                "annotations",
                "data",
                "immutable",
            ],
            ResourceKind::Secret => &[
                "name",
                "namespace",
                "labels",
                "annotations",
                "data",
                "string_data",
                "immutable",
                "subtype",
            ],
        }
    }

    /// Validate raw input for this kind.
    ///
    /// Unknown fields and nulls are dropped. `name` is required.
    ///
    /// # Errors
    ///
    /// Returns `ValidationError` for a missing or malformed name, or for a
    /// field holding the wrong type.
    pub fn validate(&self, raw: RawValues) -> Result<ValidatedValues> {
        let mut values = BTreeMap::new();
        for (key, value) in raw {
            if value.is_null() || !self.fields().contains(&key.as_str()) {
                continue;
            }
            check_field(&key, &value)?;
            values.insert(key, value);
        }

        match values.get("name").and_then(Value::as_str) {
            Some(name) => validate_name(name)?,
            None => return Err(invalid("name", "name is required".to_string())),
        }
        Ok(ValidatedValues(values))
    }
}

/// Field values that passed [`ResourceKind::validate`].
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedValues(BTreeMap<String, Value>);

impl ValidatedValues {
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn name(&self) -> &str {
        self.get("name").and_then(Value::as_str).unwrap_or_default()
    }

    pub fn namespace(&self) -> Option<&str> {
        self.get("namespace").and_then(Value::as_str)
    }

    fn with_namespace(mut self, namespace: &str) -> Self {
        self.0
            .insert("namespace".to_string(), Value::String(namespace.to_string()));
        self
    }
}

/// A constructed resource.
#[derive(Debug, Clone, PartialEq)]
pub struct Resource {
    kind: ResourceKind,
    values: ValidatedValues,
}

/// Input for [`Resource::basic_auth`].
#[derive(Debug, Clone, Default)]
pub struct BasicAuth {
    pub name: String,
    pub namespace: Option<String>,
    pub username: String,
    pub password: String,
}

/// Input for [`Resource::opaque_secret`].
///
/// `string_data` is a JSON object of strings, usually written with
/// `json!({ "key": "value" })` so each entry is locatable in source. Every
/// value is a secret.
#[derive(Debug, Clone, Default)]
pub struct OpaqueSecret {
    pub name: String,
    pub namespace: Option<String>,
    pub string_data: Value,
}

/// Input for [`Resource::docker_auth`].
#[derive(Debug, Clone, Default)]
pub struct DockerAuth {
    pub name: String,
    pub namespace: Option<String>,
    pub registry: String,
    pub username: String,
    pub password: String,
}

/// Input for [`Resource::ssh_auth`]. `keyfile` is a path.
#[derive(Debug, Clone, Default)]
pub struct SshAuth {
    pub name: String,
    pub namespace: Option<String>,
    pub keyfile: String,
}

/// Input for [`Resource::tls`]. Both fields are paths.
#[derive(Debug, Clone, Default)]
pub struct TlsCert {
    pub name: String,
    pub namespace: Option<String>,
    pub certfile: String,
    pub keyfile: String,
}

impl Resource {
    /// Validate raw input and queue a template for later materialization.
    ///
    /// A disabled registry does not prevent construction; the resource is
    /// simply not queued.
    ///
    /// # Errors
    ///
    /// Returns `ValidationError` if the input does not validate.
    pub fn declare(kind: ResourceKind, raw: RawValues, registry: &Registry) -> Result<Self> {
        let values = kind.validate(raw)?;
        match registry.register_template(kind, values.clone()) {
            Ok(()) => {}
            Err(Error::Registry(RegistryError::Disabled)) => {
                debug!(kind = kind.api_kind(), "registry disabled, template not queued");
            }
            Err(e) => return Err(e),
        }
        Ok(Self { kind, values })
    }

    /// Build from values that already passed validation, bound to `namespace`.
    ///
    /// The namespace is ignored for cluster-wide kinds.
    pub fn from_validated(kind: ResourceKind, values: ValidatedValues, namespace: Option<&str>) -> Self {
        let values = match namespace {
            Some(ns) if kind.is_namespaced() => values.with_namespace(ns),
            _ => values,
        };
        Self { kind, values }
    }

    /// Declare a basic-auth secret, running discovery on both credentials.
    ///
    /// Plaintext credentials are registered for later substitution; tagged
    /// credentials are replaced by their registered values.
    ///
    /// # Errors
    ///
    /// Returns a source error if a literal cannot be located in the caller's
    /// file, or a validation error for a bad name.
    #[track_caller]
    pub fn basic_auth(discovery: &SecretDiscovery<'_>, auth: BasicAuth) -> Result<Self> {
        let caller = CallerContext::here();
        let username = discovery.resolve(&caller, "username", &auth.username)?;
        let password = discovery.resolve(&caller, "password", &auth.password)?;

        let payload = json!({ "username": username, "password": password });
        secret(
            discovery,
            auth.name,
            auth.namespace,
            "kubernetes.io/basic-auth",
            "string_data",
            payload,
        )
    }

    /// Declare an opaque secret. Each entry is discovered under its own key.
    #[track_caller]
    pub fn opaque_secret(discovery: &SecretDiscovery<'_>, input: OpaqueSecret) -> Result<Self> {
        let caller = CallerContext::here();
        let entries = match input.string_data {
            Value::Object(entries) => entries,
            other => {
                return Err(invalid(
                    "string_data",
                    format!("expected an object, got {}", other),
                ))
            }
        };
        let mut payload = Map::new();
        for (key, value) in entries {
            let resolved = match value.as_str() {
                Some(literal) => Value::String(discovery.resolve(&caller, &key, literal)?),
                None => value,
            };
            payload.insert(key, resolved);
        }
        secret(
            discovery,
            input.name,
            input.namespace,
            "Opaque",
            "string_data",
            Value::Object(payload),
        )
    }

    /// Declare a registry pull secret with a generated `.dockerconfigjson`.
    #[track_caller]
    pub fn docker_auth(discovery: &SecretDiscovery<'_>, auth: DockerAuth) -> Result<Self> {
        let caller = CallerContext::here();
        let registry = discovery.resolve(&caller, "registry", &auth.registry)?;
        let username = discovery.resolve(&caller, "username", &auth.username)?;
        let password = discovery.resolve(&caller, "password", &auth.password)?;

        let credentials = STANDARD.encode(format!("{}:{}", username, password));
        let config = json!({
            "auths": {
                registry: { "username": username, "password": password, "auth": credentials }
            }
        });
        let payload = json!({ ".dockerconfigjson": STANDARD.encode(config.to_string()) });
        secret(
            discovery,
            auth.name,
            auth.namespace,
            "kubernetes.io/dockerconfigjson",
            "data",
            payload,
        )
    }

    /// Declare an SSH auth secret from a private key file.
    #[track_caller]
    pub fn ssh_auth(discovery: &SecretDiscovery<'_>, auth: SshAuth) -> Result<Self> {
        let caller = CallerContext::here();
        let key = discovery.resolve_file(&caller, "keyfile", &auth.keyfile)?;

        let payload = json!({ "ssh-privatekey": key });
        secret(
            discovery,
            auth.name,
            auth.namespace,
            "kubernetes.io/ssh-auth",
            "data",
            payload,
        )
    }

    /// Declare a TLS secret from certificate and key files.
    #[track_caller]
    pub fn tls(discovery: &SecretDiscovery<'_>, cert: TlsCert) -> Result<Self> {
        let caller = CallerContext::here();
        let crt = discovery.resolve_file(&caller, "certfile", &cert.certfile)?;
        let key = discovery.resolve_file(&caller, "keyfile", &cert.keyfile)?;

        let payload = json!({ "tls.crt": crt, "tls.key": key });
        secret(
            discovery,
            cert.name,
            cert.namespace,
            "kubernetes.io/tls",
            "data",
            payload,
        )
    }

    pub fn kind(&self) -> ResourceKind {
        self.kind
    }

    pub fn values(&self) -> &ValidatedValues {
        &self.values
    }

    pub fn name(&self) -> &str {
        self.values.name()
    }

    pub fn namespace(&self) -> Option<&str> {
        self.values.namespace()
    }

    /// Render the request body for the orchestration API.
    pub fn to_manifest(&self) -> Value {
        let mut metadata = Map::new();
        metadata.insert("name".to_string(), json!(self.name()));
        if self.kind.is_namespaced() {
            if let Some(ns) = self.namespace() {
                metadata.insert("namespace".to_string(), json!(ns));
            }
        }
        for key in ["labels", "annotations"] {
            if let Some(v) = self.values.get(key) {
                metadata.insert(key.to_string(), v.clone());
            }
        }

        let mut body = Map::new();
        body.insert("apiVersion".to_string(), json!("v1"));
        body.insert("kind".to_string(), json!(self.kind.api_kind()));
        body.insert("metadata".to_string(), Value::Object(metadata));

        let renames = [
            ("data", "data"),
            ("string_data", "stringData"),
            ("immutable", "immutable"),
            ("subtype", "type"),
        ];
        for (field, api_field) in renames {
            if let Some(v) = self.values.get(field) {
                body.insert(api_field.to_string(), v.clone());
            }
        }
        Value::Object(body)
    }
}

fn secret(
    discovery: &SecretDiscovery<'_>,
    name: String,
    namespace: Option<String>,
    subtype: &str,
    field: &str,
    payload: Value,
) -> Result<Resource> {
    let mut raw = RawValues::new();
    raw.insert("name".to_string(), Value::String(name));
    if let Some(ns) = namespace {
        raw.insert("namespace".to_string(), Value::String(ns));
    }
    raw.insert("subtype".to_string(), json!(subtype));
    raw.insert(field.to_string(), payload);
    Resource::declare(ResourceKind::Secret, raw, discovery.registry())
}

fn invalid(field: &'static str, reason: String) -> Error {
    ValidationError::Invalid { field, reason }.into()
}

fn check_field(key: &str, value: &Value) -> Result<()> {
    let ok = match key {
        "name" | "namespace" | "subtype" => value.is_string(),
        "immutable" => value.is_boolean(),
        "labels" | "annotations" | "data" | "string_data" => value
            .as_object()
            .map(|m| m.values().all(Value::is_string))
            .unwrap_or(false),
        _ => true,
    };
    if ok {
        return Ok(());
    }
    Err(invalid(
        "resource field",
        format!("'{}' has the wrong type: {}", key, value),
    ))
}

/// DNS-1123 subdomain: lowercase alphanumerics, '-' and '.', at most 253
/// characters, starting and ending with an alphanumeric.
fn validate_name(name: &str) -> Result<()> {
    let valid_chars = name
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-' || c == '.');
    let valid_edges = name.starts_with(|c: char| c.is_ascii_alphanumeric())
        && name.ends_with(|c: char| c.is_ascii_alphanumeric());

    if name.is_empty() || name.len() > 253 || !valid_chars || !valid_edges {
        return Err(invalid(
            "name",
            format!("'{}' is not a valid resource name", name),
        ));
    }
    Ok(())
}
