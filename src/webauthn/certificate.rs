//! X.509 attestation certificate parsing
//!
//! Structural decoding only. Signatures, validity dates and chains of trust
//! are not checked here.

use chrono::{DateTime, Utc};
use x509_parser::certificate::X509Certificate;
use x509_parser::objects::{oid2sn, oid_registry};
use x509_parser::oid_registry::Oid;
use x509_parser::public_key::PublicKey as SpkiPublicKey;
use x509_parser::der_parser::asn1_rs::Tag;
use x509_parser::x509::{AttributeTypeAndValue, X509Name};

use super::cose::PublicKey;
use super::crypto::VerificationKey;
use super::cursor::BinaryCursor;
use super::errors::WebAuthnError;

/// Apple anonymous attestation nonce extension
pub const OID_APPLE_NONCE: &str = "1.2.840.113635.100.8.2";
const OID_EC_PUBLIC_KEY: &str = "1.2.840.10045.2.1";
const OID_RSA_ENCRYPTION: &str = "1.2.840.113549.1.1.1";

/// Structural projection of a parsed certificate
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CertificateSummary {
    /// Human version number (3 for X.509 v3)
    pub version: u32,
    /// Serial number as lower-case hex
    pub serial_number: String,
    /// Short name of the signature algorithm, or its dotted OID
    pub signature_algorithm: String,
    pub signature_value: Vec<u8>,
    /// `(attribute short name, value)` pairs in certificate order
    pub issuer: Vec<(String, String)>,
    pub subject: Vec<(String, String)>,
    pub not_before: DateTime<Utc>,
    pub not_after: DateTime<Utc>,
    /// DER of the whole `SubjectPublicKeyInfo`
    pub subject_public_key_info: Vec<u8>,
    /// Dotted OID of the SPKI algorithm
    pub public_key_algorithm: String,
    /// Contents of the SPKI bit string
    pub subject_public_key: Vec<u8>,
    /// Apple nonce extension value, when present
    pub apple_nonce: Option<[u8; 32]>,
    rsa_components: Option<(Vec<u8>, Vec<u8>)>,
}

impl CertificateSummary {
    /// First value of the subject attribute with the given short name
    #[must_use]
    pub fn subject_value(&self, name: &str) -> Option<&str> {
        find_attribute(&self.subject, name)
    }

    /// First value of the issuer attribute with the given short name
    #[must_use]
    pub fn issuer_value(&self, name: &str) -> Option<&str> {
        find_attribute(&self.issuer, name)
    }

    /// Key usable for verifying attestation signatures, if the SPKI holds one
    /// this crate supports (P-256 or RSA)
    #[must_use]
    pub fn verification_key(&self) -> Option<VerificationKey> {
        match self.public_key_algorithm.as_str() {
            OID_EC_PUBLIC_KEY => PublicKey::from_uncompressed(&self.subject_public_key)
                .ok()
                .map(VerificationKey::Es256),
            OID_RSA_ENCRYPTION => {
                self.rsa_components
                    .clone()
                    .map(|(modulus, exponent)| VerificationKey::Rs256 { modulus, exponent })
            }
            _ => None,
        }
    }
}

fn find_attribute<'a>(attributes: &'a [(String, String)], name: &str) -> Option<&'a str> {
    attributes
        .iter()
        .find(|(attr, _)| attr == name)
        .map(|(_, value)| value.as_str())
}

/// Parse one DER-encoded certificate
///
/// # Errors
/// Returns `MalformedCertificate` on any structural violation, including
/// trailing bytes after the certificate
pub fn parse_certificate(der: &[u8]) -> Result<CertificateSummary, WebAuthnError> {
    let (rest, cert) = x509_parser::parse_x509_certificate(der).map_err(|e| {
        log::debug!("X.509 parse failure: {e}");
        WebAuthnError::MalformedCertificate
    })?;
    if !rest.is_empty() {
        return Err(WebAuthnError::MalformedCertificate);
    }
    summarize(&cert)
}

fn summarize(cert: &X509Certificate<'_>) -> Result<CertificateSummary, WebAuthnError> {
    let spki = cert.public_key();
    let rsa_components = match spki.parsed() {
        Ok(SpkiPublicKey::RSA(rsa)) => Some((rsa.modulus.to_vec(), rsa.exponent.to_vec())),
        _ => None,
    };

    let apple_nonce = cert
        .extensions()
        .iter()
        .find(|ext| ext.oid.to_id_string() == OID_APPLE_NONCE)
        .map(|ext| parse_apple_nonce(ext.value))
        .transpose()?;

    Ok(CertificateSummary {
        version: cert.version().0 + 1,
        serial_number: hex(cert.raw_serial()),
        signature_algorithm: oid_name(&cert.signature_algorithm.algorithm),
        signature_value: cert.signature_value.data.to_vec(),
        issuer: name_attributes(cert.issuer()),
        subject: name_attributes(cert.subject()),
        not_before: timestamp(cert.validity().not_before.timestamp())?,
        not_after: timestamp(cert.validity().not_after.timestamp())?,
        subject_public_key_info: spki.raw.to_vec(),
        public_key_algorithm: spki.algorithm.algorithm.to_id_string(),
        subject_public_key: spki.subject_public_key.data.to_vec(),
        apple_nonce,
        rsa_components,
    })
}

fn name_attributes(name: &X509Name<'_>) -> Vec<(String, String)> {
    name.iter_attributes()
        .map(|attr| (oid_name(attr.attr_type()), attribute_value(attr)))
        .collect()
}

/// Text of a DN attribute. BMPString is decoded as UTF-16BE; any other
/// non-text value is rendered as `#` followed by the hex of its contents.
fn attribute_value(attr: &AttributeTypeAndValue<'_>) -> String {
    if let Ok(text) = attr.as_str() {
        return text.to_string();
    }
    let raw = attr.as_slice();
    if attr.attr_value().tag() == Tag::BmpString && raw.len() % 2 == 0 {
        let units = raw.chunks_exact(2).map(|pair| u16::from_be_bytes([pair[0], pair[1]]));
        if let Ok(text) = char::decode_utf16(units).collect::<Result<String, _>>() {
            return text;
        }
    }
    format!("#{}", hex(raw))
}

fn oid_name(oid: &Oid<'_>) -> String {
    oid2sn(oid, oid_registry()).map_or_else(|_| oid.to_id_string(), ToString::to_string)
}

fn timestamp(secs: i64) -> Result<DateTime<Utc>, WebAuthnError> {
    DateTime::<Utc>::from_timestamp(secs, 0).ok_or(WebAuthnError::MalformedCertificate)
}

fn hex(bytes: &[u8]) -> String {
    use std::fmt::Write;
    bytes.iter().fold(String::with_capacity(bytes.len() * 2), |mut out, b| {
        let _ = write!(out, "{b:02x}");
        out
    })
}

/// `SEQUENCE { [1] EXPLICIT OCTET STRING (32 bytes) }`
fn parse_apple_nonce(value: &[u8]) -> Result<[u8; 32], WebAuthnError> {
    const PREFIX: [u8; 6] = [0x30, 0x24, 0xa1, 0x22, 0x04, 0x20];
    let mut cursor = BinaryCursor::new(value);
    let header = cursor
        .take(PREFIX.len())
        .map_err(|_| WebAuthnError::MalformedCertificate)?;
    if header != PREFIX {
        return Err(WebAuthnError::MalformedCertificate);
    }
    let nonce = cursor
        .take_array::<32>()
        .map_err(|_| WebAuthnError::MalformedCertificate)?;
    if !cursor.is_empty() {
        return Err(WebAuthnError::MalformedCertificate);
    }
    Ok(nonce)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::TestFixtures;

    #[test]
    fn test_parses_apple_leaf_certificate() {
        let chain = TestFixtures::apple_certificate_chain();
        let leaf = parse_certificate(&chain[0]).unwrap();

        assert_eq!(leaf.version, 3);
        assert_eq!(leaf.serial_number, "0173e56a7dec");
        assert!(leaf
            .issuer
            .iter()
            .any(|(_, value)| value == "Apple WebAuthn CA 1"));
        assert!(leaf
            .subject
            .iter()
            .any(|(_, value)| value == "AAA Certification"));
        assert_eq!(leaf.not_before.timestamp(), 1_597_281_228);
        assert_eq!(leaf.not_after.timestamp(), 1_597_368_228);
        assert_eq!(leaf.public_key_algorithm, OID_EC_PUBLIC_KEY);
        assert_eq!(leaf.subject_public_key.len(), 65);
        assert!(leaf.signature_algorithm.to_lowercase().contains("ecdsa"));
        assert!(leaf.apple_nonce.is_some());
        assert!(matches!(
            leaf.verification_key(),
            Some(VerificationKey::Es256(_))
        ));
    }

    #[test]
    fn test_parses_apple_intermediate_certificate() {
        let chain = TestFixtures::apple_certificate_chain();
        let intermediate = parse_certificate(&chain[1]).unwrap();

        assert_eq!(intermediate.serial_number, "56255395c7a7fb40ebe228d8260853b6");
        assert_eq!(intermediate.not_before.timestamp(), 1_584_556_681);
        assert_eq!(intermediate.not_after.timestamp(), 1_899_590_400);
        assert!(intermediate.apple_nonce.is_none());
        // P-384 keys are parsed but not usable for verification here
        assert!(intermediate.verification_key().is_none());
    }

    #[test]
    fn test_rejects_garbage() {
        assert_eq!(
            parse_certificate(&[0x30, 0x03, 0x02, 0x01]),
            Err(WebAuthnError::MalformedCertificate)
        );
        assert_eq!(parse_certificate(&[]), Err(WebAuthnError::MalformedCertificate));
    }

    #[test]
    fn test_rejects_trailing_bytes() {
        let mut der = TestFixtures::apple_certificate_chain()[0].clone();
        der.push(0x00);
        assert_eq!(
            parse_certificate(&der),
            Err(WebAuthnError::MalformedCertificate)
        );
    }

    #[test]
    fn test_rejects_truncated_certificate() {
        let der = &TestFixtures::apple_certificate_chain()[0];
        assert_eq!(
            parse_certificate(&der[..der.len() - 10]),
            Err(WebAuthnError::MalformedCertificate)
        );
    }

    #[test]
    fn test_apple_nonce_layout() {
        let mut value = vec![0x30, 0x24, 0xa1, 0x22, 0x04, 0x20];
        value.extend_from_slice(&[7u8; 32]);
        assert_eq!(parse_apple_nonce(&value).unwrap(), [7u8; 32]);

        value[5] = 0x1f;
        assert_eq!(
            parse_apple_nonce(&value),
            Err(WebAuthnError::MalformedCertificate)
        );
    }

    #[test]
    fn test_non_text_attributes_do_not_fail_the_name() {
        use x509_parser::der_parser::asn1_rs::{Any, Header};
        use x509_parser::oid_registry::OID_X509_COMMON_NAME;

        // "Tést" as BMPString
        let bmp = [0x00, 0x54, 0x00, 0xe9, 0x00, 0x73, 0x00, 0x74];
        let attr = AttributeTypeAndValue::new(
            OID_X509_COMMON_NAME,
            Any::new(Header::new_simple(Tag::BmpString), &bmp),
        );
        assert_eq!(attribute_value(&attr), "Tést");

        // unpaired surrogate falls back to hex
        let broken = [0xd8, 0x00];
        let attr = AttributeTypeAndValue::new(
            OID_X509_COMMON_NAME,
            Any::new(Header::new_simple(Tag::BmpString), &broken),
        );
        assert_eq!(attribute_value(&attr), "#d800");

        let octets = [0x01, 0xff];
        let attr = AttributeTypeAndValue::new(
            OID_X509_COMMON_NAME,
            Any::new(Header::new_simple(Tag::OctetString), &octets),
        );
        assert_eq!(attribute_value(&attr), "#01ff");
    }

    #[test]
    fn test_hex_is_lowercase_and_padded() {
        assert_eq!(hex(&[0x00, 0x0a, 0xff]), "000aff");
    }
}
