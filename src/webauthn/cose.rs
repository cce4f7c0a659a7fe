//! COSE key handling
//!
//! Converts the `COSE_Key` map embedded in attested credential data into the
//! uncompressed SEC1 point consumed by signature verification.
//!
//! ```text
//! label  name  EC2 value
//!   1    kty   2 (EC2)
//!   3    alg   -7 (ES256)
//!  -1    crv   1 (P-256)
//!  -2    x     bstr, 32 bytes
//!  -3    y     bstr, 32 bytes
//! ```

use std::fmt;

use ciborium::value::{Integer, Value};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use super::errors::WebAuthnError;
use crate::utils::encoding;

pub const COSE_KTY_EC2: i128 = 2;
pub const COSE_KTY_RSA: i128 = 3;
pub const COSE_ALG_ES256: i64 = -7;
pub const COSE_ALG_RS256: i64 = -257;
pub const COSE_CRV_P256: i128 = 1;

const LABEL_KTY: i128 = 1;
const LABEL_ALG: i128 = 3;
const LABEL_CRV: i128 = -1;
const LABEL_X: i128 = -2;
const LABEL_Y: i128 = -3;

const P256_COORDINATE_LEN: usize = 32;
const UNCOMPRESSED_POINT_LEN: usize = 1 + 2 * P256_COORDINATE_LEN;

/// Decoded `COSE_Key` map, labels kept in wire order
#[derive(Debug, Clone, PartialEq)]
pub struct CoseKey {
    entries: Vec<(Value, Value)>,
}

impl CoseKey {
    /// Wrap a decoded CBOR value
    ///
    /// # Errors
    /// Returns `InvalidKeyEncoding` if the value is not a map
    pub fn from_value(value: Value) -> Result<Self, WebAuthnError> {
        match value {
            Value::Map(entries) => Ok(Self { entries }),
            _ => Err(WebAuthnError::InvalidKeyEncoding),
        }
    }

    /// Decode a standalone CBOR-encoded `COSE_Key`
    ///
    /// # Errors
    /// Returns `InvalidKeyEncoding` if the bytes are not a single CBOR map
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, WebAuthnError> {
        let mut reader = std::io::Cursor::new(bytes);
        let value: Value = ciborium::de::from_reader(&mut reader)
            .map_err(|_| WebAuthnError::InvalidKeyEncoding)?;
        if usize::try_from(reader.position()).ok() != Some(bytes.len()) {
            return Err(WebAuthnError::InvalidKeyEncoding);
        }
        Self::from_value(value)
    }

    fn get(&self, label: i128) -> Option<&Value> {
        self.entries.iter().find_map(|(key, value)| match key {
            Value::Integer(int) if i128::from(*int) == label => Some(value),
            _ => None,
        })
    }

    fn get_int(&self, label: i128) -> Option<i128> {
        self.get(label)
            .and_then(Value::as_integer)
            .map(i128::from)
    }

    fn get_bytes(&self, label: i128) -> Option<&[u8]> {
        self.get(label).and_then(Value::as_bytes).map(Vec::as_slice)
    }

    /// Key type (label 1)
    #[must_use]
    pub fn kty(&self) -> Option<i128> {
        self.get_int(LABEL_KTY)
    }

    /// Algorithm (label 3)
    #[must_use]
    pub fn alg(&self) -> Option<i64> {
        self.get_int(LABEL_ALG)
            .and_then(|alg| i64::try_from(alg).ok())
    }

    /// EC2 curve (label -1)
    #[must_use]
    pub fn crv(&self) -> Option<i128> {
        self.get_int(LABEL_CRV)
    }

    /// EC2 x-coordinate (label -2)
    #[must_use]
    pub fn x(&self) -> Option<&[u8]> {
        self.get_bytes(LABEL_X)
    }

    /// EC2 y-coordinate (label -3)
    #[must_use]
    pub fn y(&self) -> Option<&[u8]> {
        self.get_bytes(LABEL_Y)
    }

    #[must_use]
    pub fn into_value(self) -> Value {
        Value::Map(self.entries)
    }

    /// Encode back to CBOR
    ///
    /// # Errors
    /// Returns `InternalError` if serialization fails
    pub fn to_bytes(&self) -> Result<Vec<u8>, WebAuthnError> {
        let mut out = Vec::new();
        ciborium::ser::into_writer(&Value::Map(self.entries.clone()), &mut out)
            .map_err(|e| WebAuthnError::InternalError(format!("COSE key encoding: {e}")))?;
        Ok(out)
    }
}

/// Uncompressed P-256 point `0x04 || X || Y`
#[derive(Clone, PartialEq, Eq)]
pub struct PublicKey {
    point: Vec<u8>,
}

impl PublicKey {
    /// Build from raw coordinates
    ///
    /// # Errors
    /// Returns `InvalidKeyEncoding` if either coordinate is not 32 bytes or the
    /// point is not on the P-256 curve
    pub fn from_coordinates(x: &[u8], y: &[u8]) -> Result<Self, WebAuthnError> {
        if x.len() != P256_COORDINATE_LEN || y.len() != P256_COORDINATE_LEN {
            return Err(WebAuthnError::InvalidKeyEncoding);
        }
        let mut point = Vec::with_capacity(UNCOMPRESSED_POINT_LEN);
        point.push(0x04);
        point.extend_from_slice(x);
        point.extend_from_slice(y);
        Self::from_uncompressed(&point)
    }

    /// Build from an uncompressed SEC1 point
    ///
    /// # Errors
    /// Returns `InvalidKeyEncoding` if the bytes are not a valid uncompressed P-256 point
    pub fn from_uncompressed(bytes: &[u8]) -> Result<Self, WebAuthnError> {
        if bytes.len() != UNCOMPRESSED_POINT_LEN || bytes[0] != 0x04 {
            return Err(WebAuthnError::InvalidKeyEncoding);
        }
        p256::PublicKey::from_sec1_bytes(bytes).map_err(|_| WebAuthnError::InvalidKeyEncoding)?;
        Ok(Self {
            point: bytes.to_vec(),
        })
    }

    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.point
    }

    #[must_use]
    pub fn x(&self) -> &[u8] {
        &self.point[1..=P256_COORDINATE_LEN]
    }

    #[must_use]
    pub fn y(&self) -> &[u8] {
        &self.point[1 + P256_COORDINATE_LEN..]
    }

    /// Re-encode as an EC2 / ES256 / P-256 `COSE_Key`
    #[must_use]
    pub fn to_cose_key(&self) -> CoseKey {
        let int = |v: i64| Value::Integer(Integer::from(v));
        CoseKey {
            entries: vec![
                (int(1), int(2)),
                (int(3), int(COSE_ALG_ES256)),
                (int(-1), int(1)),
                (int(-2), Value::Bytes(self.x().to_vec())),
                (int(-3), Value::Bytes(self.y().to_vec())),
            ],
        }
    }
}

impl fmt::Debug for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("PublicKey")
            .field(&encoding::encode(&self.point))
            .finish()
    }
}

impl Serialize for PublicKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&encoding::encode(&self.point))
    }
}

impl<'de> Deserialize<'de> for PublicKey {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let bytes = encoding::base64url::deserialize(deserializer)?;
        Self::from_uncompressed(&bytes).map_err(serde::de::Error::custom)
    }
}

/// Convert a `COSE_Key` into a verification key
///
/// Only EC2 keys on P-256 for ES256 are accepted.
///
/// # Errors
/// * `UnsupportedAlgorithm` for any other key type, curve or algorithm
/// * `InvalidKeyEncoding` if x or y is missing, not 32 bytes, or not on the curve
pub fn to_public_key(key: &CoseKey) -> Result<PublicKey, WebAuthnError> {
    if key.kty() != Some(COSE_KTY_EC2) {
        return Err(WebAuthnError::UnsupportedAlgorithm);
    }
    if key.crv() != Some(COSE_CRV_P256) {
        return Err(WebAuthnError::UnsupportedAlgorithm);
    }
    if key.alg().is_some_and(|alg| alg != COSE_ALG_ES256) {
        return Err(WebAuthnError::UnsupportedAlgorithm);
    }

    let x = key.x().ok_or(WebAuthnError::InvalidKeyEncoding)?;
    let y = key.y().ok_or(WebAuthnError::InvalidKeyEncoding)?;
    PublicKey::from_coordinates(x, y)
}
