//! `WebAuthn` error types
//!
//! Every parser and verification step fails with one specific kind so the
//! caller can tell attacker noise (`SignatureInvalid`) apart from a signal
//! that a credential may be compromised (`PossibleCloneDetected`).

use std::fmt;

/// Errors that can occur while parsing or verifying a `WebAuthn` ceremony
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WebAuthnError {
    /// A fixed-width read ran past the end of the buffer
    TruncatedInput,

    /// CBOR could not be decoded, or undecoded bytes were left over
    MalformedCBOR,

    /// A required field was absent or had the wrong type
    MissingField(&'static str),

    /// A public key (COSE or SEC1) was structurally invalid
    InvalidKeyEncoding,

    /// Key type, curve, algorithm or attestation format is not supported
    UnsupportedAlgorithm,

    /// An X.509 certificate could not be decoded
    MalformedCertificate,

    /// Client data `type` does not match the ceremony
    TypeMismatch,

    /// Client data challenge differs from the issued challenge
    ChallengeMismatch,

    /// Client data origin differs from the relying party origin
    OriginMismatch,

    /// The signature did not verify
    SignatureInvalid,

    /// The signature counter did not advance
    PossibleCloneDetected,

    /// The assertion names a credential that is not on file
    UnknownCredential,

    /// `rpIdHash` is not the hash of the configured relying party ID
    RpIdMismatch,

    /// The user-present flag is not set
    UserNotPresent,

    /// User verification was required but the flag is not set
    UserNotVerified,

    /// Configuration error (e.g., invalid settings)
    ConfigurationError(String),

    /// Other internal error
    InternalError(String),
}

/// Short alias used throughout the ceremony code
pub type ErrorKind = WebAuthnError;

impl WebAuthnError {
    /// Whether the relying party should consider invalidating the credential
    #[must_use]
    pub fn is_clone_warning(&self) -> bool {
        matches!(self, Self::PossibleCloneDetected)
    }
}

impl fmt::Display for WebAuthnError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TruncatedInput => write!(f, "Truncated input"),
            Self::MalformedCBOR => write!(f, "Malformed CBOR"),
            Self::MissingField(field) => write!(f, "Missing field: {field}"),
            Self::InvalidKeyEncoding => write!(f, "Invalid key encoding"),
            Self::UnsupportedAlgorithm => write!(f, "Unsupported algorithm"),
            Self::MalformedCertificate => write!(f, "Malformed certificate"),
            Self::TypeMismatch => write!(f, "Client data type mismatch"),
            Self::ChallengeMismatch => write!(f, "Challenge mismatch"),
            Self::OriginMismatch => write!(f, "Origin mismatch"),
            Self::SignatureInvalid => write!(f, "Signature verification failed"),
            Self::PossibleCloneDetected => {
                write!(f, "Signature counter did not increase, possible cloned authenticator")
            }
            Self::UnknownCredential => write!(f, "Unknown credential"),
            Self::RpIdMismatch => write!(f, "Relying party ID hash mismatch"),
            Self::UserNotPresent => write!(f, "User presence flag not set"),
            Self::UserNotVerified => write!(f, "User verification flag not set"),
            Self::ConfigurationError(msg) => write!(f, "Configuration error: {msg}"),
            Self::InternalError(msg) => write!(f, "Internal error: {msg}"),
        }
    }
}

impl std::error::Error for WebAuthnError {}
