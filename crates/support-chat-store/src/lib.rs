//! In-memory collaborators for the support chat core.
//!
//! Provides:
//! - `MemoryStore` - Push-based conversation and message store
//! - `MemoryAuthenticator` - Credential table authenticator
//! - `OpenAuthenticator` - Accepts any credentials

pub mod auth;

#[cfg(feature = "memory")]
pub mod memory;

pub use auth::{MemoryAuthenticator, OpenAuthenticator};

#[cfg(feature = "memory")]
pub use memory::MemoryStore;
