//! Test fixtures providing pre-built test objects
//!
//! Includes a real registration from an Apple platform authenticator
//! (`fmt = "apple"`), used to check the parsers against browser output.

use chrono::Utc;
use ciborium::value::Value;

use super::authenticator::TestAuthenticator;
use super::constants::{TEST_ORIGIN, TEST_OWNER, TEST_RP_ID};
use crate::passkey::{MemoryChallengeStore, MemoryCredentialStore, PasskeyService};
use crate::utils::encoding;
use crate::webauthn::{CredentialRecord, WebAuthnService, WebAuthnSettings};

/// Apple attestation object, Base64URL
const APPLE_ATTESTATION_OBJECT: &str = concat!(
    "o2NmbXRlYXBwbGVnYXR0U3RtdKJjYWxnJmN4NWOCWQJHMIICQzCCAcmgAwIBAgIGAXPlan3sMAoGCCqGSM49BAMCME",
    "gxHDAaBgNVBAMME0FwcGxlIFdlYkF1dGhuIENBIDExEzARBgNVBAoMCkFwcGxlIEluYy4xEzARBgNVBAgMCkNhbGlm",
    "b3JuaWEwHhcNMjAwODEzMDExMzQ4WhcNMjAwODE0MDEyMzQ4WjCBkTFJMEcGA1UEAwxANzYyZGVkYzZjYzYyZDkwMG",
    "JmMDVhOTA5YmJiNTEzMGY2N2Q0ZjM3NGIzYjZlOGFlNzVmN2VmNWY4ZDZiNGY4OTEaMBgGA1UECwwRQUFBIENlcnRp",
    "ZmljYXRpb24xEzARBgNVBAoMCkFwcGxlIEluYy4xEzARBgNVBAgMCkNhbGlmb3JuaWEwWTATBgcqhkjOPQIBBggqhk",
    "jOPQMBBwNCAATPCpcst-aKu66kIHRK64ge2K5kTvF0mxHxfG2WQU1zG7VjhcZU2M9HxatrwnG5C8fy0psyHfTrz4RK",
    "RRwvgBM0o1UwUzAMBgNVHRMBAf8EAjAAMA4GA1UdDwEB_wQEAwIE8DAzBgkqhkiG92NkCAIEJjAkoSIEIPjWIeqIEF",
    "c-PMYidPRUA5ldSuGdXiH9hC008hZwu12oMAoGCCqGSM49BAMCA2gAMGUCMQDlBfBF5nySqJjJz3_yuP1VPMv7bzkB",
    "ijw22FtfCw8eAY-4RnNC4DxcssxWMO3vErYCMD3FP7gHGiLxTikuPN3EJ1Oc50T7gYFv0tZ1yQuc5IsAXF9IMmdU0B",
    "vSC87ifw7ZEFkCODCCAjQwggG6oAMCAQICEFYlU5XHp_tA6-Io2CYIU7YwCgYIKoZIzj0EAwMwSzEfMB0GA1UEAwwW",
    "QXBwbGUgV2ViQXV0aG4gUm9vdCBDQTETMBEGA1UECgwKQXBwbGUgSW5jLjETMBEGA1UECAwKQ2FsaWZvcm5pYTAeFw",
    "0yMDAzMTgxODM4MDFaFw0zMDAzMTMwMDAwMDBaMEgxHDAaBgNVBAMME0FwcGxlIFdlYkF1dGhuIENBIDExEzARBgNV",
    "BAoMCkFwcGxlIEluYy4xEzARBgNVBAgMCkNhbGlmb3JuaWEwdjAQBgcqhkjOPQIBBgUrgQQAIgNiAASDLocvJhSRgQ",
    "IlufX81rtjeLX1Xz_LBFvHNZk0df1UkETfm_4ZIRdlxpod2gULONRQg0AaQ0-yTREtVsPhz7_LmJH-wGlggb75bLx3",
    "yI3dr0alruHdUVta-quTvpwLJpGjZjBkMBIGA1UdEwEB_wQIMAYBAf8CAQAwHwYDVR0jBBgwFoAUJtdk2cV4wlpn0a",
    "feaxLQG2PxxtcwHQYDVR0OBBYEFOuugsT_oaxbUdTPJGEFAL5jvXeIMA4GA1UdDwEB_wQEAwIBBjAKBggqhkjOPQQD",
    "AwNoADBlAjEA3YsaNIGl-tnbtOdle4QeFEwnt1uHakGGwrFHV1Azcifv5VRFfvZIlQxjLlxIPnDBAjAsimBE3CAfz-",
    "Wbw00pMMFIeFHZYO1qdfHrSsq-OM0luJfQyAW-8Mf3iwelccboDgdoYXV0aERhdGFYmHG0E2gvzptU8q_W7-M2e1-n",
    "ONmozTn0VVmr3c2DTo8-RQAAAAAAAAAAAAAAAAAAAAAAAAAAABRR-YfFRKT4rjcY_uqoEg6VNn2g_KUBAgMmIAEhWC",
    "DPCpcst-aKu66kIHRK64ge2K5kTvF0mxHxfG2WQU1zGyJYILVjhcZU2M9HxatrwnG5C8fy0psyHfTrz4RKRRwvgBM0",
);

/// Client data for the Apple registration, Base64URL
const APPLE_CLIENT_DATA_JSON: &str = "eyJ0eXBlIjoid2ViYXV0aG4uY3JlYXRlIiwiY2hhbGxlbmdlIjoiQnJVYll0bG8yLUV5M2RXMmhQLUptM0JJZnJHX3h4eXZ2ZVVBVGtMQ2ZUMCIsIm9yaWdpbiI6Imh0dHBzOi8vd2ViYXV0aG5wbGF5Lmhlcm9rdWFwcC5jb20ifQ";

/// Central fixture provider for all test data
pub struct TestFixtures;

impl TestFixtures {
    /// Relying party the Apple capture was made for
    pub const APPLE_RP_ID: &'static str = "webauthnplay.herokuapp.com";
    pub const APPLE_ORIGIN: &'static str = "https://webauthnplay.herokuapp.com";
    /// Challenge as it appears in the Apple client data
    pub const APPLE_CHALLENGE: &'static str = "BrUbYtlo2-Ey3dW2hP-Jm3BIfrG_xxyvveUATkLCfT0";
    /// Credential ID of the Apple capture, Base64URL
    pub const APPLE_CREDENTIAL_ID: &'static str = "UfmHxUSk-K43GP7qqBIOlTZ9oPw";

    /// Settings for `example.com`
    #[must_use]
    pub fn webauthn_settings() -> WebAuthnSettings {
        WebAuthnSettings {
            rp_id: TEST_RP_ID.to_string(),
            rp_name: "Example".to_string(),
            rp_origin: TEST_ORIGIN.to_string(),
            ..WebAuthnSettings::default()
        }
    }

    /// Settings matching the Apple capture
    #[must_use]
    pub fn apple_settings() -> WebAuthnSettings {
        WebAuthnSettings {
            rp_id: Self::APPLE_RP_ID.to_string(),
            rp_name: "WebAuthn Play".to_string(),
            rp_origin: Self::APPLE_ORIGIN.to_string(),
            ..WebAuthnSettings::default()
        }
    }

    /// # Panics
    /// Panics if the test settings are invalid
    #[must_use]
    pub fn webauthn_service() -> WebAuthnService {
        WebAuthnService::new(Self::webauthn_settings()).expect("valid test settings")
    }

    /// Passkey service over fresh in-memory stores
    #[must_use]
    pub fn passkey_service() -> PasskeyService<MemoryCredentialStore, MemoryChallengeStore> {
        let timeout = Self::webauthn_settings().timeout_seconds;
        PasskeyService::new(
            Self::webauthn_service(),
            MemoryCredentialStore::new(),
            MemoryChallengeStore::with_ttl_seconds(timeout),
        )
    }

    /// Stored credential for `authenticator` with the given counter
    #[must_use]
    pub fn credential_record(authenticator: &TestAuthenticator, sign_count: u32) -> CredentialRecord {
        CredentialRecord {
            credential_id: authenticator.credential_id(),
            public_key: authenticator.public_key(),
            sign_count,
            aaguid: authenticator.aaguid(),
            owner: TEST_OWNER.to_string(),
            attestation_format: "packed".to_string(),
            created_at: Utc::now(),
            last_used: None,
        }
    }

    /// # Panics
    /// Panics if the embedded fixture is not valid Base64URL
    #[must_use]
    pub fn apple_attestation_object() -> Vec<u8> {
        encoding::decode(APPLE_ATTESTATION_OBJECT).expect("fixture is Base64URL")
    }

    /// # Panics
    /// Panics if the embedded fixture is not valid Base64URL
    #[must_use]
    pub fn apple_client_data_json() -> Vec<u8> {
        encoding::decode(APPLE_CLIENT_DATA_JSON).expect("fixture is Base64URL")
    }

    /// # Panics
    /// Panics if the embedded challenge is not valid Base64URL
    #[must_use]
    pub fn apple_challenge() -> Vec<u8> {
        encoding::decode(Self::APPLE_CHALLENGE).expect("fixture is Base64URL")
    }

    /// The Apple registration as the browser would post it
    #[must_use]
    pub fn apple_registration_json() -> String {
        serde_json::json!({
            "id": Self::APPLE_CREDENTIAL_ID,
            "rawId": Self::APPLE_CREDENTIAL_ID,
            "type": "public-key",
            "response": {
                "clientDataJSON": APPLE_CLIENT_DATA_JSON,
                "attestationObject": APPLE_ATTESTATION_OBJECT,
            },
        })
        .to_string()
    }

    /// DER certificates from the Apple statement, leaf first
    ///
    /// # Panics
    /// Panics if the fixture does not contain an `x5c` array
    #[must_use]
    pub fn apple_certificate_chain() -> Vec<Vec<u8>> {
        let object: Value = ciborium::de::from_reader(Self::apple_attestation_object().as_slice())
            .expect("fixture is CBOR");
        let statement = object
            .as_map()
            .and_then(|map| map.iter().find(|(k, _)| k.as_text() == Some("attStmt")))
            .and_then(|(_, v)| v.as_map())
            .expect("fixture has attStmt");
        statement
            .iter()
            .find(|(k, _)| k.as_text() == Some("x5c"))
            .and_then(|(_, v)| v.as_array())
            .expect("fixture has x5c")
            .iter()
            .map(|cert| cert.as_bytes().expect("x5c entries are bytes").clone())
            .collect()
    }
}
