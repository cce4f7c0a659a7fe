//! Passkey functionality for application integration
//!
//! This module connects the `WebAuthn` ceremonies to credential and
//! challenge storage.

mod challenge;
mod errors;
mod service;
mod store;

pub use challenge::{ChallengeStore, MemoryChallengeStore, PendingCeremony};
pub use errors::{PasskeyError, StoreError};
pub use service::PasskeyService;
pub use store::{CredentialStore, MemoryCredentialStore};
