//! Kupydo - keep secret literals out of resource definitions.
//!
//! Secrets are written as ordinary literals in deployment definition files.
//! Before the source is committed, each literal is swapped for an opaque
//! wrapped tag and its value is saved to a secret store; when definitions
//! are evaluated for deployment the swap is reversed. Each deployment's age
//! key is protected by a password in a private config file.
//!
//! # Architecture
//!
//! ```text
//! src/
//! └── core/               # Core library components
//!     ├── tag             # Tag generation, wrapping, validation
//!     ├── source/         # Source locator
//!     │   ├── block       # Balanced-parenthesis call extraction
//!     │   ├── kwarg       # Keyword/value line matching
//!     │   └── caller      # Call-site capture
//!     ├── rewrite         # Plaintext <-> tag file rewriting
//!     ├── store           # One JSON file per secret
//!     ├── registry        # Templates and discovered secrets
//!     ├── discovery       # Secret resolution during construction
//!     ├── resource        # Validated resource declarations
//!     ├── project         # Project root and path conversion
//!     ├── cipher          # age encryption for stored secrets
//!     └── vault/          # Password-protected deployment keys
//!         ├── kdf         # Argon2id key derivation
//!         ├── aes         # AES-GCM credential parts
//!         ├── private     # Private config (~/.kupydo/<hash>)
//!         └── public      # Public config (.kupydo)
//! ```
//!
//! # Example
//!
//! ```no_run
//! use kupydo::{Registry, Resource, SecretDiscovery, BasicAuth};
//!
//! # fn main() -> kupydo::Result<()> {
//! let registry = Registry::new();
//! registry.enable();
//! let discovery = SecretDiscovery::new(&registry);
//!
//! Resource::basic_auth(&discovery, BasicAuth {
//!     name: "login".into(),
//!     username: "admin".into(),
//!     password: "hunter2".into(),
//!     ..Default::default()
//! })?;
//!
//! let resources = registry.materialize("production")?;
//! let secrets = registry.get_all_secrets()?;
//! # Ok(())
//! # }
//! ```

pub mod core;
pub mod error;

pub use crate::core::discovery::SecretDiscovery;
pub use crate::core::domain::SecretFieldRecord;
pub use crate::core::project::Project;
pub use crate::core::registry::Registry;
pub use crate::core::resource::{
    BasicAuth, DockerAuth, OpaqueSecret, Resource, ResourceKind, SshAuth, TlsCert,
};
pub use crate::core::rewrite::{rewrite_files, Direction};
pub use crate::core::store::SecretStore;
pub use crate::core::vault::{
    DeploymentCredential, DeploymentPublicData, KdfProfile, PrivateConfig, PublicConfig,
};
pub use crate::error::{Error, Result};
