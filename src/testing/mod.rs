//! Testing utilities for passkey-core
//!
//! Available to unit tests and, with the `testing` feature, to integration tests.
//!
//! ## Organization
//!
//! - [`authenticator`] - A software authenticator with a fixed P-256 key
//! - [`builders`] - Fluent builders for authenticator data and attestation objects
//! - [`fixtures`] - Pre-built settings, credential records and a real Apple capture
//!
//! ## Usage
//!
//! ```rust,ignore
//! use passkey_core::testing::{AttestationObjectBuilder, TestFixtures};
//!
//! let client_data = br#"{"type":"webauthn.create","challenge":"AA","origin":"https://example.com"}"#;
//! let attestation_object = AttestationObjectBuilder::packed_self("example.com", client_data).build();
//! let service = TestFixtures::webauthn_service();
//! ```

pub mod authenticator;
pub mod builders;
pub mod fixtures;

// Re-export commonly used items for convenience
pub use authenticator::TestAuthenticator;
pub use builders::{client_data_json, AttestationObjectBuilder, AuthenticatorDataBuilder};
pub use fixtures::TestFixtures;

/// Common test constants
pub mod constants {
    /// Relying party ID used by the test settings
    pub const TEST_RP_ID: &str = "example.com";

    /// Origin matching [`TEST_RP_ID`]
    pub const TEST_ORIGIN: &str = "https://example.com";

    /// Default credential owner
    pub const TEST_OWNER: &str = "test@example.com";

    /// Default display name
    pub const TEST_DISPLAY_NAME: &str = "Test User";
}
