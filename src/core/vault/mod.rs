//! Credential vault.
//!
//! Protects each deployment's age secret key behind a password and keeps
//! the public and private deployment config files duplicate-free.

mod aes;
mod kdf;
mod private;
mod public;

pub use aes::CipherPart;
pub use kdf::{DerivedKey, KdfProfile, PART_KEY_LEN};
pub use private::{generate_keypair, DeploymentCredential, PrivateConfig};
pub use public::{DeploymentPublicData, PublicConfig};
