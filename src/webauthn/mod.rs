//! `WebAuthn` implementation
//!
//! This module provides the core `WebAuthn` verification functionality,
//! independent of any transport, session or storage. Every operation is a
//! pure function of its inputs.

pub mod attestation;
pub mod authenticator_data;
pub mod cbor;
pub mod certificate;
pub mod client_data;
pub mod cose;
pub mod crypto;
pub mod cursor;
mod errors;
mod service;
mod settings;
pub mod transport;
mod types;

// Re-exports for public use
pub use authenticator_data::{AttestedCredentialData, AuthenticatorData, AuthenticatorFlags};
pub use cbor::{decode_attestation_object, AttestationFormat, AttestationObject, AttestationStatement};
pub use certificate::{parse_certificate, CertificateSummary};
pub use client_data::{CeremonyType, ClientData};
pub use cose::{to_public_key, CoseKey, PublicKey};
pub use crypto::{verify_signature, VerificationKey};
pub use cursor::BinaryCursor;
pub use errors::{ErrorKind, WebAuthnError};
pub use service::{counter_advanced, generate_user_handle, WebAuthnService};
pub use settings::WebAuthnSettings;
pub use transport::{AssertionResponse, AttestationResponse, CredentialResponse, PublicKeyCredential};
pub use types::*;
