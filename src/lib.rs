#![warn(clippy::pedantic)]
#![warn(clippy::cargo)]
#![deny(warnings)]
#![allow(clippy::multiple_crate_versions)]

/// Version of the passkey-core library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub mod passkey;
pub mod settings;
pub mod utils;
pub mod webauthn;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

/// Re-export commonly used items
pub use passkey::{
    ChallengeStore, CredentialStore, MemoryChallengeStore, MemoryCredentialStore, PasskeyError,
    PasskeyService,
};
pub use settings::Settings;
pub use webauthn::{
    CredentialRecord, ErrorKind, PublicKeyCredential, VerificationVerdict, WebAuthnError,
    WebAuthnService, WebAuthnSettings,
};
