//! `WebAuthn` attestation processing
//!
//! Checks the attestation statement of a registration against the freshly
//! extracted credential key. Certificate chains are not validated against any
//! root of trust.

use super::cbor::{AttestationFormat, AttestationObject};
use super::cose::{PublicKey, COSE_ALG_ES256, COSE_ALG_RS256};
use super::crypto::{self, VerificationKey};
use super::errors::WebAuthnError;

/// Verify the attestation statement
///
/// `client_data_json` is the raw client data; the statement signature covers
/// `authData || SHA-256(clientDataJSON)`.
///
/// # Errors
/// * `UnsupportedAlgorithm` for unknown formats or an `alg` that does not fit the key
/// * `MissingField("sig")` when a packed statement has no signature
/// * `SignatureInvalid` when the signature, Apple nonce or Apple key does not match
pub fn verify_attestation(
    object: &AttestationObject,
    credential_key: &PublicKey,
    client_data_json: &[u8],
) -> Result<(), WebAuthnError> {
    let message = crypto::signed_message(&object.auth_data_bytes, client_data_json);

    match &object.fmt {
        AttestationFormat::None => Ok(()),
        AttestationFormat::Packed if object.att_stmt.x5c.is_empty() => {
            verify_packed_self(object, credential_key, &message)
        }
        AttestationFormat::Packed => verify_packed_full(object, &message),
        AttestationFormat::Apple => verify_apple(object, credential_key, &message),
        AttestationFormat::Other(name) => {
            log::warn!("Unsupported attestation format: {name}");
            Err(WebAuthnError::UnsupportedAlgorithm)
        }
    }
}

fn verify_packed_self(
    object: &AttestationObject,
    credential_key: &PublicKey,
    message: &[u8],
) -> Result<(), WebAuthnError> {
    if object.att_stmt.alg != Some(COSE_ALG_ES256) {
        return Err(WebAuthnError::UnsupportedAlgorithm);
    }
    let Some(sig) = &object.att_stmt.sig else {
        return Err(WebAuthnError::MissingField("sig"));
    };

    let key = VerificationKey::Es256(credential_key.clone());
    if crypto::verify_signature(&key, message, sig) {
        Ok(())
    } else {
        Err(WebAuthnError::SignatureInvalid)
    }
}

fn verify_packed_full(object: &AttestationObject, message: &[u8]) -> Result<(), WebAuthnError> {
    let Some(sig) = &object.att_stmt.sig else {
        return Err(WebAuthnError::MissingField("sig"));
    };
    // An unparseable leaf leaves nothing to verify against
    let Some(key) = object
        .att_stmt
        .leaf_certificate()
        .and_then(|leaf| leaf.verification_key())
    else {
        return Err(WebAuthnError::SignatureInvalid);
    };

    let expected_alg = match key {
        VerificationKey::Es256(_) => COSE_ALG_ES256,
        VerificationKey::Rs256 { .. } => COSE_ALG_RS256,
    };
    if object.att_stmt.alg != Some(expected_alg) {
        return Err(WebAuthnError::UnsupportedAlgorithm);
    }

    if crypto::verify_signature(&key, message, sig) {
        Ok(())
    } else {
        Err(WebAuthnError::SignatureInvalid)
    }
}

fn verify_apple(
    object: &AttestationObject,
    credential_key: &PublicKey,
    message: &[u8],
) -> Result<(), WebAuthnError> {
    let Some(leaf) = object.att_stmt.leaf_certificate() else {
        return Err(WebAuthnError::SignatureInvalid);
    };

    let expected_nonce = crypto::sha256(message);
    if leaf.apple_nonce != Some(expected_nonce) {
        log::debug!("Apple attestation nonce does not match");
        return Err(WebAuthnError::SignatureInvalid);
    }

    if leaf.subject_public_key.as_slice() != credential_key.as_bytes() {
        log::debug!("Apple attestation certificate key differs from credential key");
        return Err(WebAuthnError::SignatureInvalid);
    }

    Ok(())
}
