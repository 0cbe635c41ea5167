//! Session credential access for the sync agent.
//!
//! The schedule site keeps its auth state as a JSON string under a fixed
//! storage key. This crate reads that string from a pluggable store and
//! turns it into a typed [`Credential`].

pub mod credential;
pub mod store;

pub use credential::{Credential, DEFAULT_EMAIL, DEFAULT_NAME};
pub use store::{open_store, CredentialStore, FileStore, KeyringStore, MemoryStore};
