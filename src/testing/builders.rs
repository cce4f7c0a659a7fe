//! Fluent builders for creating customizable test objects
//!
//! Builders produce raw wire bytes, so tests exercise the same parsers a
//! browser response would.

use ciborium::value::{Integer, Value};

use super::authenticator::TestAuthenticator;
use crate::utils::encoding;
use crate::webauthn::authenticator_data::AuthenticatorFlags;
use crate::webauthn::crypto;

/// Serialize a `clientDataJSON` blob with the challenge Base64URL-encoded
#[must_use]
pub fn client_data_json(ceremony_type: &str, challenge: &[u8], origin: &str) -> Vec<u8> {
    serde_json::json!({
        "type": ceremony_type,
        "challenge": encoding::encode(challenge),
        "origin": origin,
        "crossOrigin": false,
    })
    .to_string()
    .into_bytes()
}

fn encode_cbor(value: &Value) -> Vec<u8> {
    let mut out = Vec::new();
    ciborium::ser::into_writer(value, &mut out).expect("encode CBOR");
    out
}

fn text(s: &str) -> Value {
    Value::Text(s.to_string())
}

/// Builder for authenticator data buffers
pub struct AuthenticatorDataBuilder {
    rp_id_hash: [u8; 32],
    flags: u8,
    sign_count: u32,
    attested: Option<(TestAuthenticator, Vec<u8>)>,
    extensions: Option<Vec<u8>>,
}

impl AuthenticatorDataBuilder {
    /// Defaults: UP set, counter 0, no attested data
    #[must_use]
    pub fn new(rp_id: &str) -> Self {
        Self {
            rp_id_hash: crypto::sha256(rp_id.as_bytes()),
            flags: AuthenticatorFlags::USER_PRESENT,
            sign_count: 0,
            attested: None,
            extensions: None,
        }
    }

    /// Replace the base flags. AT and ED are still added when their blocks are present.
    #[must_use]
    pub fn with_flags(mut self, flags: u8) -> Self {
        self.flags = flags;
        self
    }

    #[must_use]
    pub fn with_sign_count(mut self, sign_count: u32) -> Self {
        self.sign_count = sign_count;
        self
    }

    /// Include the authenticator's credential ID and COSE key
    #[must_use]
    pub fn with_attested_credential(mut self, authenticator: &TestAuthenticator) -> Self {
        self.attested = Some((authenticator.clone(), authenticator.cose_public_key_bytes()));
        self
    }

    /// Include an extension map of text keys to integers
    #[must_use]
    pub fn with_extensions(mut self, extensions: &[(&str, i64)]) -> Self {
        let map = Value::Map(
            extensions
                .iter()
                .map(|(name, value)| (text(name), Value::Integer(Integer::from(*value))))
                .collect(),
        );
        self.extensions = Some(encode_cbor(&map));
        self
    }

    /// # Panics
    /// Panics if the credential ID is longer than `u16::MAX`
    #[must_use]
    pub fn build(self) -> Vec<u8> {
        let mut flags = self.flags;
        if self.attested.is_some() {
            flags |= AuthenticatorFlags::ATTESTED_CREDENTIAL_DATA;
        }
        if self.extensions.is_some() {
            flags |= AuthenticatorFlags::EXTENSION_DATA;
        }

        let mut out = Vec::with_capacity(256);
        out.extend_from_slice(&self.rp_id_hash);
        out.push(flags);
        out.extend_from_slice(&self.sign_count.to_be_bytes());

        if let Some((authenticator, cose_key)) = &self.attested {
            let credential_id = authenticator.credential_id();
            let id_len = u16::try_from(credential_id.len()).expect("credential ID fits in u16");
            out.extend_from_slice(&authenticator.aaguid());
            out.extend_from_slice(&id_len.to_be_bytes());
            out.extend_from_slice(&credential_id);
            out.extend_from_slice(cose_key);
        }
        if let Some(extensions) = &self.extensions {
            out.extend_from_slice(extensions);
        }
        out
    }
}

/// Builder for attestation objects
pub struct AttestationObjectBuilder {
    fmt: String,
    authenticator: TestAuthenticator,
    auth_data: Vec<u8>,
    client_data_json: Vec<u8>,
    alg: Option<i64>,
    sign: bool,
    tamper_signature: bool,
    x5c: Option<Vec<Vec<u8>>>,
}

impl AttestationObjectBuilder {
    /// `fmt = "none"` around fresh authenticator data for `rp_id`
    #[must_use]
    pub fn none(rp_id: &str) -> Self {
        let authenticator = TestAuthenticator::new();
        let auth_data = AuthenticatorDataBuilder::new(rp_id)
            .with_attested_credential(&authenticator)
            .build();
        Self {
            fmt: "none".to_string(),
            authenticator,
            auth_data,
            client_data_json: Vec::new(),
            alg: None,
            sign: false,
            tamper_signature: false,
            x5c: None,
        }
    }

    /// Packed self attestation signed over `authData || SHA-256(client_data_json)`
    #[must_use]
    pub fn packed_self(rp_id: &str, client_data_json: &[u8]) -> Self {
        Self {
            fmt: "packed".to_string(),
            client_data_json: client_data_json.to_vec(),
            alg: Some(-7),
            sign: true,
            ..Self::none(rp_id)
        }
    }

    /// Use a different authenticator for the credential and the signature
    #[must_use]
    pub fn with_authenticator(mut self, rp_id: &str, authenticator: &TestAuthenticator) -> Self {
        self.auth_data = AuthenticatorDataBuilder::new(rp_id)
            .with_attested_credential(authenticator)
            .build();
        self.authenticator = authenticator.clone();
        self
    }

    /// Replace the authenticator data bytes wholesale
    #[must_use]
    pub fn with_auth_data(mut self, auth_data: Vec<u8>) -> Self {
        self.auth_data = auth_data;
        self
    }

    #[must_use]
    pub fn with_format(mut self, fmt: &str) -> Self {
        self.fmt = fmt.to_string();
        self
    }

    #[must_use]
    pub fn with_alg(mut self, alg: i64) -> Self {
        self.alg = Some(alg);
        self
    }

    #[must_use]
    pub fn without_sig(mut self) -> Self {
        self.sign = false;
        self
    }

    /// Flip one bit of the statement signature
    #[must_use]
    pub fn with_tampered_signature(mut self) -> Self {
        self.tamper_signature = true;
        self
    }

    #[must_use]
    pub fn with_x5c(mut self, certificates: Vec<Vec<u8>>) -> Self {
        self.x5c = Some(certificates);
        self
    }

    /// Raw authenticator data that will be embedded
    #[must_use]
    pub fn auth_data(&self) -> &[u8] {
        &self.auth_data
    }

    #[must_use]
    pub fn build(self) -> Vec<u8> {
        let mut statement = Vec::new();
        if let Some(alg) = self.alg {
            statement.push((text("alg"), Value::Integer(Integer::from(alg))));
        }
        if self.sign {
            let message = crypto::signed_message(&self.auth_data, &self.client_data_json);
            let mut sig = self.authenticator.sign(&message);
            if self.tamper_signature {
                let last = sig.len() - 1;
                sig[last] ^= 0x01;
            }
            statement.push((text("sig"), Value::Bytes(sig)));
        }
        if let Some(x5c) = self.x5c {
            statement.push((
                text("x5c"),
                Value::Array(x5c.into_iter().map(Value::Bytes).collect()),
            ));
        }

        encode_cbor(&Value::Map(vec![
            (text("fmt"), text(&self.fmt)),
            (text("attStmt"), Value::Map(statement)),
            (text("authData"), Value::Bytes(self.auth_data)),
        ]))
    }
}
