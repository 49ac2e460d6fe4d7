//! Core library components.
//!
//! This module contains the tag codec, the source locator and rewriter, the
//! registry that sits between resource declaration and materialization, and
//! the credential vault.

pub mod cipher;
pub mod constants;
pub mod discovery;
pub mod domain;
pub mod project;
pub mod registry;
pub mod resource;
pub mod rewrite;
pub mod source;
pub mod store;
pub mod tag;
pub mod types;
pub mod validation;
pub mod vault;
