//! Passkey service implementation
//!
//! Wires the `WebAuthn` ceremonies to a credential store and a challenge
//! store. Every ceremony is keyed by a caller-supplied session key; the
//! challenge for that key is consumed before verification starts, so a
//! replayed response always fails with `ChallengeNotFound`.

use chrono::Utc;

use super::challenge::{ChallengeStore, PendingCeremony};
use super::errors::PasskeyError;
use super::store::CredentialStore;
use crate::utils::logging::LoggingHelper;
use crate::webauthn::{
    generate_user_handle, AuthenticationOptions, CredentialRecord, PublicKeyCredential,
    RegistrationOptions, WebAuthnError, WebAuthnService,
};

/// Registration and authentication against injected stores
pub struct PasskeyService<C, S> {
    webauthn: WebAuthnService,
    credentials: C,
    challenges: S,
}

impl<C: CredentialStore, S: ChallengeStore> PasskeyService<C, S> {
    #[must_use]
    pub fn new(webauthn: WebAuthnService, credentials: C, challenges: S) -> Self {
        Self {
            webauthn,
            credentials,
            challenges,
        }
    }

    #[must_use]
    pub fn credentials(&self) -> &C {
        &self.credentials
    }

    /// Start registering a new passkey for `owner`
    ///
    /// # Errors
    /// Returns an error if the challenge cannot be generated or stored
    pub fn begin_registration(
        &self,
        session_key: &str,
        owner: &str,
        display_name: &str,
    ) -> Result<RegistrationOptions, PasskeyError> {
        let existing = self.credentials.list_for_owner(owner)?;
        let user_handle = generate_user_handle()?;
        let (options, state) =
            self.webauthn
                .start_registration(&user_handle, owner, display_name, &existing)?;
        self.challenges
            .issue(session_key, PendingCeremony::Registration(state))?;
        Ok(options)
    }

    /// Verify the browser's registration response and store the credential
    ///
    /// # Errors
    /// * `ChallengeNotFound` if no registration is pending for `session_key`
    /// * `InvalidRequest` if the credential is not an attestation response
    /// * `Verification` with the failing ceremony step
    /// * `Store` if the credential ID is already registered
    pub fn finish_registration(
        &self,
        session_key: &str,
        credential: &PublicKeyCredential,
    ) -> Result<CredentialRecord, PasskeyError> {
        let Some(PendingCeremony::Registration(state)) = self.challenges.consume(session_key)?
        else {
            return Err(PasskeyError::ChallengeNotFound);
        };

        if !credential.is_well_formed() {
            return Err(PasskeyError::InvalidRequest(
                "credential type or id is invalid".to_string(),
            ));
        }
        let Some(response) = credential.attestation() else {
            return Err(PasskeyError::InvalidRequest(
                "expected an attestation response".to_string(),
            ));
        };

        let record = self
            .webauthn
            .verify_registration(
                &response.attestation_object,
                &response.client_data_json,
                &state.challenge,
                &self.webauthn.settings().rp_origin,
                &state.user_name,
            )
            .inspect_err(|e| {
                LoggingHelper::log_ceremony_failure("registration", Some(&credential.id), e);
            })?;

        if record.credential_id != credential.raw_id {
            return Err(PasskeyError::InvalidRequest(
                "rawId does not match the attested credential".to_string(),
            ));
        }

        self.credentials.create(record.clone())?;
        LoggingHelper::log_registration_success(&record);
        Ok(record)
    }

    /// Start authenticating, optionally restricted to `owner`'s credentials
    ///
    /// # Errors
    /// Returns an error if the credentials cannot be listed or the challenge
    /// cannot be generated or stored
    pub fn begin_authentication(
        &self,
        session_key: &str,
        owner: Option<&str>,
    ) -> Result<AuthenticationOptions, PasskeyError> {
        let credentials = match owner {
            Some(owner) => self.credentials.list_for_owner(owner)?,
            None => Vec::new(),
        };
        let (options, state) = self.webauthn.start_authentication(&credentials)?;
        self.challenges
            .issue(session_key, PendingCeremony::Authentication(state))?;
        Ok(options)
    }

    /// Verify an assertion and advance the stored counter
    ///
    /// # Errors
    /// * `ChallengeNotFound` if no authentication is pending for `session_key`
    /// * `InvalidRequest` if the credential is not an assertion response
    /// * `Verification(UnknownCredential)` if the credential is not on file or
    ///   was not offered
    /// * `Verification` with the failing ceremony step; a lost counter race is
    ///   `PossibleCloneDetected`
    pub fn finish_authentication(
        &self,
        session_key: &str,
        credential: &PublicKeyCredential,
    ) -> Result<CredentialRecord, PasskeyError> {
        let Some(PendingCeremony::Authentication(state)) = self.challenges.consume(session_key)?
        else {
            return Err(PasskeyError::ChallengeNotFound);
        };

        if !credential.is_well_formed() {
            return Err(PasskeyError::InvalidRequest(
                "credential type or id is invalid".to_string(),
            ));
        }
        let Some(response) = credential.assertion() else {
            return Err(PasskeyError::InvalidRequest(
                "expected an assertion response".to_string(),
            ));
        };

        if !state.allowed_credentials.is_empty()
            && !state.allowed_credentials.contains(&credential.id)
        {
            LoggingHelper::log_ceremony_failure(
                "authentication",
                Some(&credential.id),
                &WebAuthnError::UnknownCredential,
            );
            return Err(WebAuthnError::UnknownCredential.into());
        }
        let Some(stored) = self.credentials.get(&credential.raw_id)? else {
            LoggingHelper::log_ceremony_failure(
                "authentication",
                Some(&credential.id),
                &WebAuthnError::UnknownCredential,
            );
            return Err(WebAuthnError::UnknownCredential.into());
        };

        let updated = self
            .webauthn
            .verify_authentication(
                &response.authenticator_data,
                &response.client_data_json,
                &response.signature,
                &state.challenge,
                &self.webauthn.settings().rp_origin,
                &stored,
            )
            .inspect_err(|e| {
                LoggingHelper::log_ceremony_failure("authentication", Some(&credential.id), e);
            })?;

        let last_used = updated.last_used.unwrap_or_else(Utc::now);
        if !self.credentials.update_sign_count(
            &stored.credential_id,
            stored.sign_count,
            updated.sign_count,
            last_used,
        )? {
            LoggingHelper::log_ceremony_failure(
                "authentication",
                Some(&credential.id),
                &WebAuthnError::PossibleCloneDetected,
            );
            return Err(WebAuthnError::PossibleCloneDetected.into());
        }

        LoggingHelper::log_authentication_success(&updated);
        Ok(updated)
    }
}
