//! Client data JSON handling
//!
//! The browser serialises `CollectedClientData` and the authenticator signs
//! its SHA-256 hash, so the raw bytes must be kept alongside the parsed form.

use serde::Deserialize;

use super::errors::WebAuthnError;
use crate::utils::encoding;

/// Which ceremony a client data blob belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CeremonyType {
    /// `webauthn.create`
    Create,
    /// `webauthn.get`
    Get,
}

impl CeremonyType {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Create => "webauthn.create",
            Self::Get => "webauthn.get",
        }
    }
}

/// Parsed client data
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientData {
    pub ceremony_type: CeremonyType,
    /// Challenge bytes (decoded from the Base64URL JSON member)
    pub challenge: Vec<u8>,
    pub origin: String,
    pub cross_origin: Option<bool>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawClientData {
    #[serde(rename = "type")]
    ceremony_type: Option<String>,
    challenge: Option<String>,
    origin: Option<String>,
    cross_origin: Option<bool>,
}

impl ClientData {
    /// Parse the raw `clientDataJSON` bytes
    ///
    /// # Errors
    /// * `MissingField` if the bytes are not a JSON object or lack `type`,
    ///   `challenge` or `origin`
    /// * `TypeMismatch` if `type` is not a known ceremony
    /// * `ChallengeMismatch` if the challenge is not valid Base64URL
    pub fn parse(bytes: &[u8]) -> Result<Self, WebAuthnError> {
        let raw: RawClientData = serde_json::from_slice(bytes).map_err(|e| {
            log::debug!("Client data is not valid JSON: {e}");
            WebAuthnError::MissingField("clientDataJSON")
        })?;

        let Some(ceremony_type) = raw.ceremony_type else {
            return Err(WebAuthnError::MissingField("type"));
        };
        let ceremony_type = match ceremony_type.as_str() {
            "webauthn.create" => CeremonyType::Create,
            "webauthn.get" => CeremonyType::Get,
            _ => return Err(WebAuthnError::TypeMismatch),
        };

        let Some(challenge) = raw.challenge else {
            return Err(WebAuthnError::MissingField("challenge"));
        };
        let challenge =
            encoding::decode(&challenge).map_err(|_| WebAuthnError::ChallengeMismatch)?;

        let Some(origin) = raw.origin else {
            return Err(WebAuthnError::MissingField("origin"));
        };

        Ok(Self {
            ceremony_type,
            challenge,
            origin,
            cross_origin: raw.cross_origin,
        })
    }

    /// Check the ceremony type, challenge and origin, in that order
    ///
    /// # Errors
    /// `TypeMismatch`, `ChallengeMismatch` or `OriginMismatch` for the first
    /// check that fails
    pub fn validate(
        &self,
        expected_type: CeremonyType,
        expected_challenge: &[u8],
        expected_origin: &str,
    ) -> Result<(), WebAuthnError> {
        if self.ceremony_type != expected_type {
            return Err(WebAuthnError::TypeMismatch);
        }
        if self.challenge != expected_challenge {
            return Err(WebAuthnError::ChallengeMismatch);
        }
        if self.origin != expected_origin {
            return Err(WebAuthnError::OriginMismatch);
        }
        Ok(())
    }
}

/// Parse and validate in one step
///
/// # Errors
/// Any error from [`ClientData::parse`] or [`ClientData::validate`]
pub fn verify_client_data(
    client_data_json: &[u8],
    expected_type: CeremonyType,
    expected_challenge: &[u8],
    expected_origin: &str,
) -> Result<ClientData, WebAuthnError> {
    let client_data = ClientData::parse(client_data_json)?;
    client_data.validate(expected_type, expected_challenge, expected_origin)?;
    Ok(client_data)
}

#[cfg(test)]
mod tests {
    use super::*;

    const ORIGIN: &str = "https://example.com";

    fn json(ceremony: &str, challenge: &[u8], origin: &str) -> Vec<u8> {
        format!(
            r#"{{"type":"{ceremony}","challenge":"{}","origin":"{origin}"}}"#,
            encoding::encode(challenge)
        )
        .into_bytes()
    }

    #[test]
    fn test_accepts_matching_client_data() {
        let bytes = json("webauthn.create", b"0123456789abcdef", ORIGIN);
        let parsed =
            verify_client_data(&bytes, CeremonyType::Create, b"0123456789abcdef", ORIGIN).unwrap();
        assert_eq!(parsed.ceremony_type, CeremonyType::Create);
        assert_eq!(parsed.cross_origin, None);
    }

    #[test]
    fn test_wrong_type() {
        let bytes = json("webauthn.get", b"c", ORIGIN);
        assert_eq!(
            verify_client_data(&bytes, CeremonyType::Create, b"c", ORIGIN),
            Err(WebAuthnError::TypeMismatch)
        );

        let bytes = json("payment.get", b"c", ORIGIN);
        assert_eq!(
            verify_client_data(&bytes, CeremonyType::Get, b"c", ORIGIN),
            Err(WebAuthnError::TypeMismatch)
        );
    }

    #[test]
    fn test_challenge_is_byte_exact() {
        let bytes = json("webauthn.get", b"Challenge", ORIGIN);
        assert_eq!(
            verify_client_data(&bytes, CeremonyType::Get, b"challenge", ORIGIN),
            Err(WebAuthnError::ChallengeMismatch)
        );
    }

    #[test]
    fn test_origin_is_byte_exact() {
        let bytes = json("webauthn.get", b"c", "https://example.com/");
        assert_eq!(
            verify_client_data(&bytes, CeremonyType::Get, b"c", ORIGIN),
            Err(WebAuthnError::OriginMismatch)
        );
        let bytes = json("webauthn.get", b"c", "https://EXAMPLE.com");
        assert_eq!(
            verify_client_data(&bytes, CeremonyType::Get, b"c", ORIGIN),
            Err(WebAuthnError::OriginMismatch)
        );
    }

    #[test]
    fn test_missing_members_and_bad_json() {
        assert_eq!(
            ClientData::parse(br#"{"challenge":"YQ","origin":"x"}"#),
            Err(WebAuthnError::MissingField("type"))
        );
        assert_eq!(
            ClientData::parse(br#"{"type":"webauthn.get","origin":"x"}"#),
            Err(WebAuthnError::MissingField("challenge"))
        );
        assert_eq!(
            ClientData::parse(br#"{"type":"webauthn.get","challenge":"YQ"}"#),
            Err(WebAuthnError::MissingField("origin"))
        );
        assert_eq!(
            ClientData::parse(b"\xff\xfe"),
            Err(WebAuthnError::MissingField("clientDataJSON"))
        );
        assert_eq!(
            ClientData::parse(b"42"),
            Err(WebAuthnError::MissingField("clientDataJSON"))
        );
    }

    #[test]
    fn test_cross_origin_and_unknown_members() {
        let parsed = ClientData::parse(
            br#"{"type":"webauthn.get","challenge":"YQ","origin":"x","crossOrigin":true,"tokenBinding":{"status":"present"}}"#,
        )
        .unwrap();
        assert_eq!(parsed.cross_origin, Some(true));
        assert_eq!(parsed.challenge, b"a");
    }
}
