//! `WebAuthn` core types
//!
//! This module defines core data structures for `WebAuthn` operations,
//! independent of application-specific logic.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::cose::PublicKey;
use super::errors::WebAuthnError;
use crate::utils::encoding::base64url;

/// `WebAuthn` registration options sent to the client
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct RegistrationOptions {
    pub challenge: String, // Base64URL-encoded random challenge
    pub rp: RelyingParty,
    pub user: UserEntity,
    #[serde(rename = "pubKeyCredParams")]
    pub public_key_params: Vec<PublicKeyCredentialParameters>,
    pub timeout: u32, // milliseconds
    pub attestation: String, // "none", "indirect", "direct"
    #[serde(rename = "authenticatorSelection")]
    pub authenticator_selection: AuthenticatorSelectionCriteria,
    #[serde(rename = "excludeCredentials", default)]
    pub exclude_credentials: Vec<PublicKeyCredentialDescriptor>,
}

/// `WebAuthn` authentication options sent to the client
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct AuthenticationOptions {
    pub challenge: String, // Base64URL-encoded random challenge
    pub timeout: u32,      // milliseconds
    #[serde(rename = "rpId")]
    pub rp_id: String,
    #[serde(rename = "allowCredentials")]
    pub allow_credentials: Vec<PublicKeyCredentialDescriptor>,
    #[serde(rename = "userVerification")]
    pub user_verification: String, // "required", "preferred", "discouraged"
}

/// `WebAuthn` relying party information
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct RelyingParty {
    pub id: String,
    pub name: String,
}

/// `WebAuthn` user entity
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct UserEntity {
    pub id: String, // Base64URL-encoded user handle
    pub name: String,
    #[serde(rename = "displayName")]
    pub display_name: String,
}

/// Public key credential parameters
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct PublicKeyCredentialParameters {
    #[serde(rename = "type")]
    pub r#type: String, // Always "public-key"
    pub alg: i64,
}

/// Authenticator selection criteria
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct AuthenticatorSelectionCriteria {
    #[serde(rename = "authenticatorAttachment", skip_serializing_if = "Option::is_none")]
    pub authenticator_attachment: Option<String>, // "platform", "cross-platform"
    #[serde(rename = "requireResidentKey")]
    pub require_resident_key: bool,
    #[serde(rename = "userVerification")]
    pub user_verification: String,
}

/// Public key credential descriptor
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct PublicKeyCredentialDescriptor {
    #[serde(rename = "type")]
    pub r#type: String, // Always "public-key"
    pub id: String,     // Base64URL-encoded credential ID
}

/// Registration state kept server-side until the client answers
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct RegistrationState {
    pub user_handle: String,
    pub user_name: String,
    pub display_name: String,
    #[serde(with = "base64url")]
    pub challenge: Vec<u8>,
    pub created_at: DateTime<Utc>,
}

/// Authentication state kept server-side until the client answers
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct AuthenticationState {
    #[serde(with = "base64url")]
    pub challenge: Vec<u8>,
    /// Base64URL IDs offered in `allowCredentials`; empty means any
    pub allowed_credentials: Vec<String>,
    pub created_at: DateTime<Utc>,
}

/// A registered credential
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct CredentialRecord {
    #[serde(with = "base64url")]
    pub credential_id: Vec<u8>,
    pub public_key: PublicKey,
    pub sign_count: u32,
    pub aaguid: [u8; 16],
    pub owner: String,
    pub attestation_format: String,
    pub created_at: DateTime<Utc>,
    pub last_used: Option<DateTime<Utc>>,
}

impl CredentialRecord {
    /// Credential ID as Base64URL
    #[must_use]
    pub fn credential_id_b64(&self) -> String {
        crate::utils::encoding::encode(&self.credential_id)
    }

    /// Descriptor for `allowCredentials` / `excludeCredentials`
    #[must_use]
    pub fn descriptor(&self) -> PublicKeyCredentialDescriptor {
        PublicKeyCredentialDescriptor {
            r#type: "public-key".to_string(),
            id: self.credential_id_b64(),
        }
    }
}

/// Where a ceremony stopped
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CeremonyState {
    ChallengeIssued,
    ClientDataValidated,
    SignatureValidated,
    CounterValidated,
    Verified,
    Failed(WebAuthnError),
}

impl CeremonyState {
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Verified | Self::Failed(_))
    }
}

/// Outcome of a ceremony as reported to the caller
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerificationVerdict {
    pub verified: bool,
    pub reason: Option<WebAuthnError>,
    pub updated_credential: Option<CredentialRecord>,
    /// Attestation certificates that failed to parse; advisory only
    pub certificate_errors: Vec<WebAuthnError>,
    pub state: CeremonyState,
    /// Last step that passed before the ceremony ended
    pub last_step: CeremonyState,
}

impl VerificationVerdict {
    #[must_use]
    pub fn success(credential: CredentialRecord, certificate_errors: Vec<WebAuthnError>) -> Self {
        Self {
            verified: true,
            reason: None,
            updated_credential: Some(credential),
            certificate_errors,
            state: CeremonyState::Verified,
            last_step: CeremonyState::Verified,
        }
    }

    #[must_use]
    pub fn failure(
        reason: WebAuthnError,
        last_step: CeremonyState,
        certificate_errors: Vec<WebAuthnError>,
    ) -> Self {
        Self {
            verified: false,
            reason: Some(reason.clone()),
            updated_credential: None,
            certificate_errors,
            state: CeremonyState::Failed(reason),
            last_step,
        }
    }
}
