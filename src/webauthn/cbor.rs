//! CBOR processing for `WebAuthn`
//!
//! Decodes the attestation object returned by `navigator.credentials.create()`:
//! a CBOR map with `fmt`, `attStmt` and `authData`.

use ciborium::value::Value;

use super::authenticator_data::{decode_one_item, AuthenticatorData};
use super::certificate::{parse_certificate, CertificateSummary};
use super::errors::WebAuthnError;

/// Attestation statement format
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttestationFormat {
    Packed,
    Apple,
    None,
    Other(String),
}

impl AttestationFormat {
    #[must_use]
    pub fn from_name(name: &str) -> Self {
        match name {
            "packed" => Self::Packed,
            "apple" => Self::Apple,
            "none" => Self::None,
            other => Self::Other(other.to_string()),
        }
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Packed => "packed",
            Self::Apple => "apple",
            Self::None => "none",
            Self::Other(name) => name,
        }
    }
}

/// Format-dependent attestation statement
#[derive(Debug, Clone, PartialEq, Default)]
pub struct AttestationStatement {
    pub alg: Option<i64>,
    pub sig: Option<Vec<u8>>,
    /// DER certificates, leaf first
    pub x5c: Vec<Vec<u8>>,
    /// Parse result for each entry of `x5c`, same order
    pub certificates: Vec<Result<CertificateSummary, WebAuthnError>>,
}

impl AttestationStatement {
    /// Leaf certificate, if present and parseable
    #[must_use]
    pub fn leaf_certificate(&self) -> Option<&CertificateSummary> {
        self.certificates.first().and_then(|cert| cert.as_ref().ok())
    }

    /// Errors from certificates that failed to parse
    #[must_use]
    pub fn certificate_errors(&self) -> Vec<WebAuthnError> {
        self.certificates
            .iter()
            .filter_map(|cert| cert.as_ref().err().cloned())
            .collect()
    }
}

/// Decoded attestation object
#[derive(Debug, Clone, PartialEq)]
pub struct AttestationObject {
    pub fmt: AttestationFormat,
    pub att_stmt: AttestationStatement,
    pub auth_data: AuthenticatorData,
    /// `authData` exactly as received; the attestation signature covers these bytes
    pub auth_data_bytes: Vec<u8>,
}

/// Decode an attestation object
///
/// # Errors
/// * `MalformedCBOR` if the input is not exactly one CBOR map
/// * `MissingField` if `fmt`, `attStmt` or `authData` is absent or mistyped
/// * any error from [`AuthenticatorData::parse`]
///
/// Certificate failures do not abort decoding; they are recorded in
/// [`AttestationStatement::certificates`].
pub fn decode_attestation_object(bytes: &[u8]) -> Result<AttestationObject, WebAuthnError> {
    let (value, consumed) = decode_one_item(bytes)?;
    if consumed != bytes.len() {
        return Err(WebAuthnError::MalformedCBOR);
    }
    let Value::Map(entries) = value else {
        return Err(WebAuthnError::MalformedCBOR);
    };

    let Some(fmt) = text_entry(&entries, "fmt").and_then(Value::as_text) else {
        return Err(WebAuthnError::MissingField("fmt"));
    };
    let Some(att_stmt) = text_entry(&entries, "attStmt").and_then(Value::as_map) else {
        return Err(WebAuthnError::MissingField("attStmt"));
    };
    let Some(auth_data_bytes) = text_entry(&entries, "authData").and_then(Value::as_bytes) else {
        return Err(WebAuthnError::MissingField("authData"));
    };

    let auth_data = AuthenticatorData::parse(auth_data_bytes)?;
    let att_stmt = decode_statement(att_stmt)?;

    Ok(AttestationObject {
        fmt: AttestationFormat::from_name(fmt),
        att_stmt,
        auth_data,
        auth_data_bytes: auth_data_bytes.clone(),
    })
}

fn decode_statement(entries: &[(Value, Value)]) -> Result<AttestationStatement, WebAuthnError> {
    let alg = match text_entry(entries, "alg") {
        None => None,
        Some(value) => {
            let alg = value
                .as_integer()
                .and_then(|alg| i64::try_from(alg).ok())
                .ok_or(WebAuthnError::MissingField("alg"))?;
            Some(alg)
        }
    };

    let sig = match text_entry(entries, "sig") {
        None => None,
        Some(value) => Some(
            value
                .as_bytes()
                .cloned()
                .ok_or(WebAuthnError::MissingField("sig"))?,
        ),
    };

    let x5c = match text_entry(entries, "x5c") {
        None => Vec::new(),
        Some(value) => value
            .as_array()
            .ok_or(WebAuthnError::MissingField("x5c"))?
            .iter()
            .map(|cert| cert.as_bytes().cloned().ok_or(WebAuthnError::MissingField("x5c")))
            .collect::<Result<Vec<_>, _>>()?,
    };

    let certificates = x5c
        .iter()
        .map(|der| {
            let parsed = parse_certificate(der);
            if let Err(e) = &parsed {
                log::warn!("Attestation certificate could not be parsed: {e}");
            }
            parsed
        })
        .collect();

    Ok(AttestationStatement {
        alg,
        sig,
        x5c,
        certificates,
    })
}

fn text_entry<'a>(entries: &'a [(Value, Value)], key: &str) -> Option<&'a Value> {
    entries
        .iter()
        .find(|(k, _)| k.as_text() == Some(key))
        .map(|(_, v)| v)
}
