//! `WebAuthn` service implementation
//!
//! Registration and authentication ceremonies. Each ceremony walks
//! `ChallengeIssued -> ClientDataValidated -> SignatureValidated ->
//! CounterValidated -> Verified` and stops at the first failing step.
//! Challenges and stored credentials are always passed in by the caller.

use chrono::Utc;

use super::attestation;
use super::authenticator_data::AuthenticatorData;
use super::cbor;
use super::client_data::{verify_client_data, CeremonyType};
use super::cose;
use super::crypto::{self, VerificationKey};
use super::errors::WebAuthnError;
use super::settings::WebAuthnSettings;
use super::transport::PUBLIC_KEY_TYPE;
use super::types::{
    AuthenticationOptions, AuthenticationState, AuthenticatorSelectionCriteria, CeremonyState,
    CredentialRecord, PublicKeyCredentialParameters, RegistrationOptions, RegistrationState,
    RelyingParty, UserEntity, VerificationVerdict,
};
use crate::utils::encoding;
use crate::utils::logging::LoggingHelper;

/// Generate a Base64URL user handle using secure random data
///
/// # Errors
/// Returns `InternalError` if the system RNG fails
pub fn generate_user_handle() -> Result<String, WebAuthnError> {
    crypto::generate_user_handle().map(|handle| encoding::encode(&handle))
}

/// Whether a reported counter is acceptable against the stored one
///
/// The counter must strictly increase. Authenticators without a counter
/// report 0 forever, so 0 after 0 is accepted.
#[must_use]
pub fn counter_advanced(stored: u32, reported: u32) -> bool {
    reported > stored || (stored == 0 && reported == 0)
}

/// Core `WebAuthn` service
#[derive(Debug, Clone)]
pub struct WebAuthnService {
    settings: WebAuthnSettings,
}

impl WebAuthnService {
    /// Create a new `WebAuthnService` with the given settings
    ///
    /// # Errors
    /// Returns `ConfigurationError` if the settings do not validate
    pub fn new(settings: WebAuthnSettings) -> Result<Self, WebAuthnError> {
        settings.validate()?;
        Ok(Self { settings })
    }

    #[must_use]
    pub fn settings(&self) -> &WebAuthnSettings {
        &self.settings
    }

    /// Create registration options for a new credential
    ///
    /// `existing` credentials are listed in `excludeCredentials` so the same
    /// authenticator is not registered twice.
    ///
    /// # Errors
    /// Returns `InternalError` if no challenge could be generated
    pub fn start_registration(
        &self,
        user_handle: &str,
        user_name: &str,
        display_name: &str,
        existing: &[CredentialRecord],
    ) -> Result<(RegistrationOptions, RegistrationState), WebAuthnError> {
        let challenge = crypto::generate_challenge()?;

        let options = RegistrationOptions {
            challenge: encoding::encode(&challenge),
            rp: RelyingParty {
                id: self.settings.rp_id.clone(),
                name: self.settings.rp_name.clone(),
            },
            user: UserEntity {
                id: user_handle.to_string(),
                name: user_name.to_string(),
                display_name: display_name.to_string(),
            },
            public_key_params: vec![PublicKeyCredentialParameters {
                r#type: PUBLIC_KEY_TYPE.to_string(),
                alg: cose::COSE_ALG_ES256,
            }],
            timeout: self.settings.timeout_millis(),
            attestation: "direct".to_string(),
            authenticator_selection: AuthenticatorSelectionCriteria {
                authenticator_attachment: self.settings.authenticator_attachment.clone(),
                require_resident_key: false,
                user_verification: self.settings.user_verification.clone(),
            },
            exclude_credentials: existing.iter().map(CredentialRecord::descriptor).collect(),
        };

        let state = RegistrationState {
            user_handle: user_handle.to_string(),
            user_name: user_name.to_string(),
            display_name: display_name.to_string(),
            challenge: challenge.to_vec(),
            created_at: Utc::now(),
        };

        LoggingHelper::log_challenge_issued("registration", Some(user_name));
        Ok((options, state))
    }

    /// Create authentication options restricted to `credentials`
    ///
    /// An empty slice produces options for discoverable credentials.
    ///
    /// # Errors
    /// Returns `InternalError` if no challenge could be generated
    pub fn start_authentication(
        &self,
        credentials: &[CredentialRecord],
    ) -> Result<(AuthenticationOptions, AuthenticationState), WebAuthnError> {
        let challenge = crypto::generate_challenge()?;
        let allow_credentials: Vec<_> =
            credentials.iter().map(CredentialRecord::descriptor).collect();

        let options = AuthenticationOptions {
            challenge: encoding::encode(&challenge),
            timeout: self.settings.timeout_millis(),
            rp_id: self.settings.rp_id.clone(),
            allow_credentials: allow_credentials.clone(),
            user_verification: self.settings.user_verification.clone(),
        };

        let state = AuthenticationState {
            challenge: challenge.to_vec(),
            allowed_credentials: allow_credentials.into_iter().map(|d| d.id).collect(),
            created_at: Utc::now(),
        };

        LoggingHelper::log_challenge_issued(
            "authentication",
            credentials.first().map(|c| c.owner.as_str()),
        );
        Ok((options, state))
    }

    /// Verify a registration and build the new credential record
    ///
    /// # Errors
    /// The first failing ceremony step's error kind
    pub fn verify_registration(
        &self,
        attestation_object: &[u8],
        client_data_json: &[u8],
        expected_challenge: &[u8],
        expected_origin: &str,
        owner: &str,
    ) -> Result<CredentialRecord, WebAuthnError> {
        let mut certificate_errors = Vec::new();
        let mut step = CeremonyState::ChallengeIssued;
        let result = self.run_registration(
            attestation_object,
            client_data_json,
            expected_challenge,
            expected_origin,
            owner,
            &mut certificate_errors,
            &mut step,
        );
        LoggingHelper::log_certificate_errors(&certificate_errors);
        result
    }

    /// Like [`Self::verify_registration`], reporting a verdict
    #[must_use]
    pub fn registration_verdict(
        &self,
        attestation_object: &[u8],
        client_data_json: &[u8],
        expected_challenge: &[u8],
        expected_origin: &str,
        owner: &str,
    ) -> VerificationVerdict {
        let mut certificate_errors = Vec::new();
        let mut step = CeremonyState::ChallengeIssued;
        let result = self.run_registration(
            attestation_object,
            client_data_json,
            expected_challenge,
            expected_origin,
            owner,
            &mut certificate_errors,
            &mut step,
        );
        LoggingHelper::log_certificate_errors(&certificate_errors);
        match result {
            Ok(record) => VerificationVerdict::success(record, certificate_errors),
            Err(e) => VerificationVerdict::failure(e, step, certificate_errors),
        }
    }

    /// Verify an assertion against the stored credential
    ///
    /// Returns the record with the new counter and `last_used`. The caller
    /// persists it with a conditional update keyed on the counter it read.
    ///
    /// # Errors
    /// The first failing ceremony step's error kind
    pub fn verify_authentication(
        &self,
        authenticator_data: &[u8],
        client_data_json: &[u8],
        signature: &[u8],
        expected_challenge: &[u8],
        expected_origin: &str,
        stored_credential: &CredentialRecord,
    ) -> Result<CredentialRecord, WebAuthnError> {
        let mut step = CeremonyState::ChallengeIssued;
        self.run_authentication(
            authenticator_data,
            client_data_json,
            signature,
            expected_challenge,
            expected_origin,
            stored_credential,
            &mut step,
        )
    }

    /// Like [`Self::verify_authentication`], reporting a verdict
    #[must_use]
    pub fn authentication_verdict(
        &self,
        authenticator_data: &[u8],
        client_data_json: &[u8],
        signature: &[u8],
        expected_challenge: &[u8],
        expected_origin: &str,
        stored_credential: &CredentialRecord,
    ) -> VerificationVerdict {
        let mut step = CeremonyState::ChallengeIssued;
        match self.run_authentication(
            authenticator_data,
            client_data_json,
            signature,
            expected_challenge,
            expected_origin,
            stored_credential,
            &mut step,
        ) {
            Ok(record) => VerificationVerdict::success(record, Vec::new()),
            Err(e) => VerificationVerdict::failure(e, step, Vec::new()),
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn run_authentication(
        &self,
        authenticator_data: &[u8],
        client_data_json: &[u8],
        signature: &[u8],
        expected_challenge: &[u8],
        expected_origin: &str,
        stored_credential: &CredentialRecord,
        state: &mut CeremonyState,
    ) -> Result<CredentialRecord, WebAuthnError> {
        verify_client_data(
            client_data_json,
            CeremonyType::Get,
            expected_challenge,
            expected_origin,
        )
        .inspect_err(|e| fail(state, e))?;
        let auth_data =
            AuthenticatorData::parse(authenticator_data).inspect_err(|e| fail(state, e))?;
        self.check_relying_party(&auth_data)
            .inspect_err(|e| fail(state, e))?;
        advance(state, CeremonyState::ClientDataValidated);

        let key = VerificationKey::Es256(stored_credential.public_key.clone());
        let message = crypto::signed_message(authenticator_data, client_data_json);
        if !crypto::verify_signature(&key, &message, signature) {
            fail(state, &WebAuthnError::SignatureInvalid);
            return Err(WebAuthnError::SignatureInvalid);
        }
        advance(state, CeremonyState::SignatureValidated);

        if !counter_advanced(stored_credential.sign_count, auth_data.sign_count) {
            log::warn!(
                "Counter for credential {} went from {} to {}",
                stored_credential.credential_id_b64(),
                stored_credential.sign_count,
                auth_data.sign_count
            );
            fail(state, &WebAuthnError::PossibleCloneDetected);
            return Err(WebAuthnError::PossibleCloneDetected);
        }
        advance(state, CeremonyState::CounterValidated);

        let mut updated = stored_credential.clone();
        updated.sign_count = auth_data.sign_count;
        updated.last_used = Some(Utc::now());
        advance(state, CeremonyState::Verified);
        Ok(updated)
    }

    #[allow(clippy::too_many_arguments)]
    fn run_registration(
        &self,
        attestation_object: &[u8],
        client_data_json: &[u8],
        expected_challenge: &[u8],
        expected_origin: &str,
        owner: &str,
        certificate_errors: &mut Vec<WebAuthnError>,
        state: &mut CeremonyState,
    ) -> Result<CredentialRecord, WebAuthnError> {
        verify_client_data(
            client_data_json,
            CeremonyType::Create,
            expected_challenge,
            expected_origin,
        )
        .inspect_err(|e| fail(state, e))?;

        let object =
            cbor::decode_attestation_object(attestation_object).inspect_err(|e| fail(state, e))?;
        certificate_errors.extend(object.att_stmt.certificate_errors());

        self.check_relying_party(&object.auth_data)
            .inspect_err(|e| fail(state, e))?;
        let Some(attested) = object.auth_data.attested_credential_data.as_ref() else {
            let e = WebAuthnError::MissingField("attestedCredentialData");
            fail(state, &e);
            return Err(e);
        };
        advance(state, CeremonyState::ClientDataValidated);

        let public_key = cose::to_public_key(&attested.credential_public_key)
            .inspect_err(|e| fail(state, e))?;
        attestation::verify_attestation(&object, &public_key, client_data_json)
            .inspect_err(|e| fail(state, e))?;
        advance(state, CeremonyState::SignatureValidated);

        // Nothing to compare a first counter against
        advance(state, CeremonyState::CounterValidated);

        let record = CredentialRecord {
            credential_id: attested.credential_id.clone(),
            public_key,
            sign_count: object.auth_data.sign_count,
            aaguid: attested.aaguid,
            owner: owner.to_string(),
            attestation_format: object.fmt.as_str().to_string(),
            created_at: Utc::now(),
            last_used: None,
        };
        log::debug!(
            "Credential {} from authenticator model {}",
            record.credential_id_b64(),
            attested.aaguid_uuid()
        );
        advance(state, CeremonyState::Verified);
        Ok(record)
    }

    fn check_relying_party(&self, auth_data: &AuthenticatorData) -> Result<(), WebAuthnError> {
        if auth_data.rp_id_hash != crypto::sha256(self.settings.rp_id.as_bytes()) {
            return Err(WebAuthnError::RpIdMismatch);
        }
        if self.settings.require_user_presence && !auth_data.flags.user_present() {
            return Err(WebAuthnError::UserNotPresent);
        }
        if self.settings.requires_user_verification() && !auth_data.flags.user_verified() {
            return Err(WebAuthnError::UserNotVerified);
        }
        Ok(())
    }
}

fn advance(state: &mut CeremonyState, next: CeremonyState) {
    log::trace!("Ceremony {state:?} -> {next:?}");
    *state = next;
}

// `state` keeps the last step that passed
fn fail(state: &CeremonyState, error: &WebAuthnError) {
    log::debug!("Ceremony failed after {state:?}: {error}");
}
