//! Passkey error types

use thiserror::Error;

use crate::webauthn::WebAuthnError;

/// Errors raised by credential and challenge stores
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// A credential with the same ID already exists
    #[error("credential {0} is already registered")]
    Duplicate(String),

    /// The backing store could not be reached or is poisoned
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// Errors returned by [`PasskeyService`](super::PasskeyService)
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PasskeyError {
    /// No outstanding challenge for this session, or it was already used
    #[error("no outstanding challenge for this session")]
    ChallengeNotFound,

    /// The submitted credential has the wrong shape for this ceremony
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// A ceremony step failed
    #[error("verification failed: {0}")]
    Verification(#[from] WebAuthnError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl PasskeyError {
    /// The ceremony error kind, if this is a verification failure
    #[must_use]
    pub fn kind(&self) -> Option<&WebAuthnError> {
        match self {
            Self::Verification(kind) => Some(kind),
            _ => None,
        }
    }
}
