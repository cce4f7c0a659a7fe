//! JSON shapes exchanged with the browser
//!
//! `PublicKeyCredential` as produced by `navigator.credentials.create()` and
//! `navigator.credentials.get()`, with every binary member Base64URL-encoded.
//! Members added by `toJSON()` are accepted; anything else unknown is ignored.

use serde::{Deserialize, Serialize};

use crate::utils::encoding::{base64url, base64url_option};

/// Credential type string; the only value defined by `WebAuthn`
pub const PUBLIC_KEY_TYPE: &str = "public-key";

/// A credential returned by the browser
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicKeyCredential {
    /// Base64URL credential ID
    pub id: String,
    #[serde(with = "base64url")]
    pub raw_id: Vec<u8>,
    #[serde(rename = "type")]
    pub credential_type: String,
    pub response: CredentialResponse,
    /// `"platform"` or `"cross-platform"`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub authenticator_attachment: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_extension_results: Option<serde_json::Value>,
}

/// Authenticator response, one of the two shapes the browser can return
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CredentialResponse {
    /// Registration (`AuthenticatorAttestationResponse`)
    Attestation(AttestationResponse),
    /// Authentication (`AuthenticatorAssertionResponse`)
    Assertion(AssertionResponse),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttestationResponse {
    #[serde(rename = "clientDataJSON", with = "base64url")]
    pub client_data_json: Vec<u8>,
    #[serde(with = "base64url")]
    pub attestation_object: Vec<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transports: Option<Vec<String>>,
    /// DER SubjectPublicKeyInfo, copied by the browser; not used for verification
    #[serde(default, with = "base64url_option", skip_serializing_if = "Option::is_none")]
    pub public_key: Option<Vec<u8>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub public_key_algorithm: Option<i64>,
    #[serde(default, with = "base64url_option", skip_serializing_if = "Option::is_none")]
    pub authenticator_data: Option<Vec<u8>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssertionResponse {
    #[serde(rename = "clientDataJSON", with = "base64url")]
    pub client_data_json: Vec<u8>,
    #[serde(with = "base64url")]
    pub authenticator_data: Vec<u8>,
    #[serde(with = "base64url")]
    pub signature: Vec<u8>,
    #[serde(default, with = "base64url_option", skip_serializing_if = "Option::is_none")]
    pub user_handle: Option<Vec<u8>>,
}

impl PublicKeyCredential {
    /// Whether `type` is `"public-key"` and `id` matches `rawId`
    #[must_use]
    pub fn is_well_formed(&self) -> bool {
        self.credential_type == PUBLIC_KEY_TYPE
            && crate::utils::encoding::decode(&self.id).is_ok_and(|id| id == self.raw_id)
    }

    #[must_use]
    pub fn attestation(&self) -> Option<&AttestationResponse> {
        match &self.response {
            CredentialResponse::Attestation(response) => Some(response),
            CredentialResponse::Assertion(_) => None,
        }
    }

    #[must_use]
    pub fn assertion(&self) -> Option<&AssertionResponse> {
        match &self.response {
            CredentialResponse::Assertion(response) => Some(response),
            CredentialResponse::Attestation(_) => None,
        }
    }
}
