//! Authenticator data parsing
//!
//! ```text
//! offset  length  field
//!      0      32  rpIdHash
//!     32       1  flags (UP=bit0, UV=bit2, BE=bit3, BS=bit4, AT=bit6, ED=bit7)
//!     33       4  signCount (big-endian)
//!     37      16  aaguid                 } only when AT is set
//!     53       2  credentialIdLength     }
//!     55       L  credentialId           }
//!   55+L       *  credentialPublicKey    } one CBOR COSE_Key item
//!      *       *  extensions             only when ED is set, one CBOR map
//! ```

use std::fmt;
use std::io::Cursor;

use ciborium::value::Value;
use uuid::Uuid;

use super::cose::CoseKey;
use super::cursor::BinaryCursor;
use super::errors::WebAuthnError;
use crate::utils::encoding;

/// Length of the fixed header (rpIdHash, flags, signCount)
pub const AUTH_DATA_HEADER_LEN: usize = 37;

/// Authenticator data flag bits
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct AuthenticatorFlags(u8);

impl AuthenticatorFlags {
    pub const USER_PRESENT: u8 = 0x01;
    pub const USER_VERIFIED: u8 = 0x04;
    pub const BACKUP_ELIGIBLE: u8 = 0x08;
    pub const BACKED_UP: u8 = 0x10;
    pub const ATTESTED_CREDENTIAL_DATA: u8 = 0x40;
    pub const EXTENSION_DATA: u8 = 0x80;

    #[must_use]
    pub fn new(bits: u8) -> Self {
        Self(bits)
    }

    #[must_use]
    pub fn bits(self) -> u8 {
        self.0
    }

    #[must_use]
    pub fn user_present(self) -> bool {
        self.0 & Self::USER_PRESENT != 0
    }

    #[must_use]
    pub fn user_verified(self) -> bool {
        self.0 & Self::USER_VERIFIED != 0
    }

    #[must_use]
    pub fn backup_eligible(self) -> bool {
        self.0 & Self::BACKUP_ELIGIBLE != 0
    }

    #[must_use]
    pub fn backed_up(self) -> bool {
        self.0 & Self::BACKED_UP != 0
    }

    #[must_use]
    pub fn attested_credential_data(self) -> bool {
        self.0 & Self::ATTESTED_CREDENTIAL_DATA != 0
    }

    #[must_use]
    pub fn extension_data(self) -> bool {
        self.0 & Self::EXTENSION_DATA != 0
    }
}

impl fmt::Debug for AuthenticatorFlags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthenticatorFlags")
            .field("bits", &format_args!("{:#04x}", self.0))
            .field("up", &self.user_present())
            .field("uv", &self.user_verified())
            .field("be", &self.backup_eligible())
            .field("bs", &self.backed_up())
            .field("at", &self.attested_credential_data())
            .field("ed", &self.extension_data())
            .finish()
    }
}

/// Credential block present when the AT flag is set
#[derive(Debug, Clone, PartialEq)]
pub struct AttestedCredentialData {
    pub aaguid: [u8; 16],
    pub credential_id: Vec<u8>,
    pub credential_public_key: CoseKey,
    /// Exact bytes of the `COSE_Key` item as they appeared on the wire
    pub credential_public_key_bytes: Vec<u8>,
}

impl AttestedCredentialData {
    /// AAGUID as a UUID, for logging and metadata lookups
    #[must_use]
    pub fn aaguid_uuid(&self) -> Uuid {
        Uuid::from_bytes(self.aaguid)
    }
}

/// Parsed authenticator data
#[derive(Debug, Clone, PartialEq)]
pub struct AuthenticatorData {
    pub rp_id_hash: [u8; 32],
    pub flags: AuthenticatorFlags,
    pub sign_count: u32,
    pub attested_credential_data: Option<AttestedCredentialData>,
    /// Raw CBOR extension map when the ED flag is set
    pub extensions: Option<Vec<u8>>,
}

impl AuthenticatorData {
    /// Parse an authenticator data buffer
    ///
    /// The buffer must be consumed exactly: surplus bytes are never folded
    /// into the credential key or ignored.
    ///
    /// # Errors
    /// * `TruncatedInput` if a fixed-width field runs past the end, or a flagged
    ///   CBOR block is missing entirely
    /// * `InvalidKeyEncoding` if the credential public key is not a CBOR map
    /// * `MalformedCBOR` if the extension item is undecodable or bytes are left over
    pub fn parse(bytes: &[u8]) -> Result<Self, WebAuthnError> {
        let mut cursor = BinaryCursor::new(bytes);

        let rp_id_hash = cursor.take_array::<32>()?;
        let flags = AuthenticatorFlags::new(cursor.read_u8()?);
        let sign_count = cursor.read_u32_be()?;

        let attested_credential_data = if flags.attested_credential_data() {
            Some(parse_attested_credential_data(&mut cursor)?)
        } else {
            None
        };

        let extensions = if flags.extension_data() {
            if cursor.is_empty() {
                return Err(WebAuthnError::TruncatedInput);
            }
            let (_, consumed) =
                decode_one_item(cursor.remaining()).map_err(|_| WebAuthnError::MalformedCBOR)?;
            Some(cursor.take(consumed)?.to_vec())
        } else {
            None
        };

        if !cursor.is_empty() {
            log::debug!(
                "Authenticator data has {} surplus bytes",
                cursor.remaining().len()
            );
            return Err(WebAuthnError::MalformedCBOR);
        }

        Ok(Self {
            rp_id_hash,
            flags,
            sign_count,
            attested_credential_data,
            extensions,
        })
    }

    /// Credential ID as Base64URL, when attested data is present
    #[must_use]
    pub fn credential_id_b64(&self) -> Option<String> {
        self.attested_credential_data
            .as_ref()
            .map(|data| encoding::encode(&data.credential_id))
    }
}

fn parse_attested_credential_data(
    cursor: &mut BinaryCursor<'_>,
) -> Result<AttestedCredentialData, WebAuthnError> {
    let aaguid = cursor.take_array::<16>()?;
    let id_len = cursor.read_u16_be()?;
    let credential_id = cursor.take(usize::from(id_len))?.to_vec();

    if cursor.is_empty() {
        return Err(WebAuthnError::TruncatedInput);
    }

    let (value, consumed) =
        decode_one_item(cursor.remaining()).map_err(|_| WebAuthnError::InvalidKeyEncoding)?;
    let credential_public_key_bytes = cursor.take(consumed)?.to_vec();
    let credential_public_key = CoseKey::from_value(value)?;

    Ok(AttestedCredentialData {
        aaguid,
        credential_id,
        credential_public_key,
        credential_public_key_bytes,
    })
}

/// Decode a single CBOR item from the front of `bytes`, reporting how many
/// bytes it occupied
pub(crate) fn decode_one_item(bytes: &[u8]) -> Result<(Value, usize), WebAuthnError> {
    let mut reader = Cursor::new(bytes);
    let value: Value =
        ciborium::de::from_reader(&mut reader).map_err(|_| WebAuthnError::MalformedCBOR)?;
    let consumed = usize::try_from(reader.position()).map_err(|_| WebAuthnError::MalformedCBOR)?;
    if consumed == 0 || consumed > bytes.len() {
        return Err(WebAuthnError::MalformedCBOR);
    }
    Ok((value, consumed))
}
