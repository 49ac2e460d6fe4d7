//! Domain types.

mod secret;

pub use secret::SecretFieldRecord;
