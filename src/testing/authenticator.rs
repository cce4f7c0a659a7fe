//! Software authenticator for tests
//!
//! Holds a fixed P-256 key so signatures and encodings are reproducible.

use ciborium::value::{Integer, Value};
use p256::ecdsa::signature::Signer;
use p256::ecdsa::{Signature, SigningKey};

use crate::webauthn::PublicKey;

const DEFAULT_SECRET: [u8; 32] = [
    0xc9, 0xaf, 0xa9, 0xd8, 0x45, 0xba, 0x75, 0x16, 0x6b, 0x5c, 0x21, 0x57, 0x67, 0xb1, 0xd6, 0x93,
    0x4e, 0x50, 0xc3, 0xdb, 0x36, 0xe8, 0x9b, 0x12, 0x7b, 0x8a, 0x62, 0x2b, 0x12, 0x0f, 0x67, 0x21,
];

const DEFAULT_AAGUID: [u8; 16] = [
    0xad, 0xce, 0x00, 0x02, 0x35, 0xbc, 0xc6, 0x0a, 0x64, 0x8b, 0x0b, 0x25, 0xf1, 0xf0, 0x55, 0x03,
];

/// A test authenticator with a fixed key, AAGUID and credential ID
#[derive(Clone)]
pub struct TestAuthenticator {
    signing_key: SigningKey,
    credential_id: Vec<u8>,
    aaguid: [u8; 16],
}

impl Default for TestAuthenticator {
    fn default() -> Self {
        Self::new()
    }
}

impl TestAuthenticator {
    /// The default authenticator
    ///
    /// # Panics
    /// Never; the built-in secret is a valid scalar
    #[must_use]
    pub fn new() -> Self {
        Self::with_secret(DEFAULT_SECRET, b"test-credential-0001")
    }

    /// An authenticator with a different key and credential ID
    ///
    /// # Panics
    /// Panics if `secret` is zero or not below the curve order
    #[must_use]
    pub fn with_secret(secret: [u8; 32], credential_id: &[u8]) -> Self {
        Self {
            signing_key: SigningKey::from_slice(&secret).expect("valid P-256 secret"),
            credential_id: credential_id.to_vec(),
            aaguid: DEFAULT_AAGUID,
        }
    }

    /// A second, distinct authenticator
    #[must_use]
    pub fn other() -> Self {
        let mut secret = DEFAULT_SECRET;
        secret[31] ^= 0x5a;
        Self::with_secret(secret, b"test-credential-0002")
    }

    #[must_use]
    pub fn credential_id(&self) -> Vec<u8> {
        self.credential_id.clone()
    }

    #[must_use]
    pub fn aaguid(&self) -> [u8; 16] {
        self.aaguid
    }

    /// Uncompressed public point
    ///
    /// # Panics
    /// Never for a valid signing key
    #[must_use]
    pub fn public_key(&self) -> PublicKey {
        let point = self.signing_key.verifying_key().to_encoded_point(false);
        PublicKey::from_uncompressed(point.as_bytes()).expect("signing key yields a valid point")
    }

    /// `COSE_Key` with labels in the order browsers emit them
    #[must_use]
    pub fn cose_public_key(&self) -> Value {
        let pk = self.public_key();
        let int = |v: i64| Value::Integer(Integer::from(v));
        Value::Map(vec![
            (int(1), int(2)),
            (int(3), int(-7)),
            (int(-1), int(1)),
            (int(-2), Value::Bytes(pk.x().to_vec())),
            (int(-3), Value::Bytes(pk.y().to_vec())),
        ])
    }

    /// CBOR encoding of [`Self::cose_public_key`]
    ///
    /// # Panics
    /// Panics if CBOR encoding fails
    #[must_use]
    pub fn cose_public_key_bytes(&self) -> Vec<u8> {
        let mut out = Vec::new();
        ciborium::ser::into_writer(&self.cose_public_key(), &mut out).expect("encode COSE key");
        out
    }

    /// DER-encoded ES256 signature over `message`
    #[must_use]
    pub fn sign(&self, message: &[u8]) -> Vec<u8> {
        let signature: Signature = self.signing_key.sign(message);
        signature.to_der().as_bytes().to_vec()
    }
}
