//! `WebAuthn` cryptography operations
//!
//! Signature verification, hashing and random challenge generation.

use ring::rand::SecureRandom;
use ring::signature;
use sha2::{Digest, Sha256};

use super::cose::PublicKey;
use super::errors::WebAuthnError;

/// Public key material a signature can be checked against
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VerificationKey {
    /// ECDSA P-256 with SHA-256, DER-encoded signatures
    Es256(PublicKey),
    /// RSASSA-PKCS1-v1_5 with SHA-256, big-endian modulus and exponent
    Rs256 { modulus: Vec<u8>, exponent: Vec<u8> },
}

/// Check `signature` over `message`
///
/// Every failure (bad DER, wrong key, wrong message) collapses to `false`.
#[must_use]
pub fn verify_signature(key: &VerificationKey, message: &[u8], signature: &[u8]) -> bool {
    match key {
        VerificationKey::Es256(public_key) => {
            signature::UnparsedPublicKey::new(
                &signature::ECDSA_P256_SHA256_ASN1,
                public_key.as_bytes(),
            )
            .verify(message, signature)
            .is_ok()
        }
        VerificationKey::Rs256 { modulus, exponent } => {
            let components = signature::RsaPublicKeyComponents {
                n: strip_leading_zeros(modulus),
                e: strip_leading_zeros(exponent),
            };
            components
                .verify(&signature::RSA_PKCS1_2048_8192_SHA256, message, signature)
                .is_ok()
        }
    }
}

// DER integers carry a sign byte that ring refuses
fn strip_leading_zeros(bytes: &[u8]) -> &[u8] {
    let start = bytes.iter().position(|b| *b != 0).unwrap_or(bytes.len());
    &bytes[start..]
}

/// SHA-256 digest
#[must_use]
pub fn sha256(data: &[u8]) -> [u8; 32] {
    Sha256::digest(data).into()
}

/// Bytes an authenticator signs: `authData || SHA-256(clientDataJSON)`
#[must_use]
pub fn signed_message(auth_data: &[u8], client_data_json: &[u8]) -> Vec<u8> {
    let mut message = Vec::with_capacity(auth_data.len() + 32);
    message.extend_from_slice(auth_data);
    message.extend_from_slice(&sha256(client_data_json));
    message
}

/// Generate a secure random 32-byte challenge
///
/// # Errors
/// Returns `InternalError` if the system RNG fails
pub fn generate_challenge() -> Result<[u8; 32], WebAuthnError> {
    random_bytes::<32>()
}

/// Generate a random 16-byte user handle
///
/// # Errors
/// Returns `InternalError` if the system RNG fails
pub fn generate_user_handle() -> Result<[u8; 16], WebAuthnError> {
    random_bytes::<16>()
}

fn random_bytes<const N: usize>() -> Result<[u8; N], WebAuthnError> {
    let mut bytes = [0u8; N];
    ring::rand::SystemRandom::new()
        .fill(&mut bytes)
        .map_err(|_| WebAuthnError::InternalError("system random generator failed".to_string()))?;
    Ok(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::TestAuthenticator;

    // 2048-bit key, e = 65537, signing b"rs256 signed over sha-256"
    const RSA_MODULUS_HEX: &str = "997267fc00be8ec22b6b535779130f551c0b50126aa0e0ad03015cff7f345f461dd7c7a2b220550809273b3a6c265db967572e2cd88741422a9e70510941fc402cf386e61870308d774c6981292593cb192611ba385b07bf32ef42b2a04f5fa9c6cfa50ab06271ff7b833119e51efdff9c30316aa4311d9c012c56545bae287af16ddfe81455861d06e059fad8c54c93ed1685655bf525b98944f65360ae216e19f96837f2e5cc2e7f9c27a6b670d904922ffd7070b40e012232991dde8adac09feca6575ec3f68a77955001b625611e72830c73033657284f339b0b52aa0fe665a8f9fd825444bb09b8bab5a7d116f0171c4894227c7730b848fdd528e00809";
    const RSA_SIGNATURE_HEX: &str = "7e5cae2d2a703a1d339f72c28f8529d469378ef5c7e4080d8da2a1f5a0c9219dadc4b77eca1e72afffb41b800471ed15919ba4eb02879fad5db63d5f669eab6b7a760067b7923455bf469489de46847a5acb1461b3f4623e39ce0779355fc1f5c5bfdec20ebe2073beae3ca5651d85d6a30baa02e46a25e1da43296e57b7b33f72630b04a5fa6a3e61daeb4d8e778f1bd3f9e6891d849b54005cd026737f531ae0bae4e39841eaaacecfbfac82563016624ff6f344ab88ecbe8f83bf8795b2699046548e0e05ee9c838cee5416f3d05b201d332c46a1aac7e481449b6a81a688e86c90a9a9ef4f71b5f85caf920642d460210e19deccf9eecfd10c39417d9ea4";
    const RSA_MESSAGE: &[u8] = b"rs256 signed over sha-256";

    fn unhex(s: &str) -> Vec<u8> {
        (0..s.len())
            .step_by(2)
            .map(|i| u8::from_str_radix(&s[i..i + 2], 16).unwrap())
            .collect()
    }

    fn rsa_key(modulus: Vec<u8>) -> VerificationKey {
        VerificationKey::Rs256 {
            modulus,
            exponent: vec![0x01, 0x00, 0x01],
        }
    }

    #[test]
    fn test_es256_roundtrip() {
        let authenticator = TestAuthenticator::new();
        let key = VerificationKey::Es256(authenticator.public_key());
        let sig = authenticator.sign(b"payload");

        assert!(verify_signature(&key, b"payload", &sig));
        assert!(!verify_signature(&key, b"payload!", &sig));
    }

    #[test]
    fn test_es256_rejects_bad_der() {
        let authenticator = TestAuthenticator::new();
        let key = VerificationKey::Es256(authenticator.public_key());
        assert!(!verify_signature(&key, b"payload", &[0x30, 0x00]));
        assert!(!verify_signature(&key, b"payload", &[]));
    }

    #[test]
    fn test_rs256_known_vector() {
        let key = rsa_key(unhex(RSA_MODULUS_HEX));
        let sig = unhex(RSA_SIGNATURE_HEX);

        assert!(verify_signature(&key, RSA_MESSAGE, &sig));
        assert!(!verify_signature(&key, b"something else", &sig));
    }

    #[test]
    fn test_rs256_accepts_der_sign_byte() {
        let mut modulus = vec![0x00];
        modulus.extend(unhex(RSA_MODULUS_HEX));
        let key = rsa_key(modulus);

        assert!(verify_signature(&key, RSA_MESSAGE, &unhex(RSA_SIGNATURE_HEX)));
    }

    #[test]
    fn test_rs256_flipped_signature_byte() {
        let key = rsa_key(unhex(RSA_MODULUS_HEX));
        let mut sig = unhex(RSA_SIGNATURE_HEX);
        sig[10] ^= 0x01;

        assert!(!verify_signature(&key, RSA_MESSAGE, &sig));
    }

    #[test]
    fn test_sha256_empty_input() {
        assert_eq!(
            sha256(b"")[..4],
            [0xe3, 0xb0, 0xc4, 0x42]
        );
    }

    #[test]
    fn test_signed_message_layout() {
        let message = signed_message(&[1, 2, 3], b"{}");
        assert_eq!(message.len(), 35);
        assert_eq!(&message[..3], &[1, 2, 3]);
        assert_eq!(&message[3..], &sha256(b"{}"));
    }

    #[test]
    fn test_challenges_are_unique() {
        let a = generate_challenge().unwrap();
        let b = generate_challenge().unwrap();
        assert_ne!(a, b);
        assert_eq!(generate_user_handle().unwrap().len(), 16);
    }
}
