// Centralized logging for ceremony outcomes. Keys and signatures are never logged.
use log::{debug, info, warn};

use crate::webauthn::{CredentialRecord, WebAuthnError};

pub struct LoggingHelper;

impl LoggingHelper {
    /// Log settings at startup
    pub fn log_settings_loaded(rp_id: &str, rp_origin: &str, user_verification: &str) {
        info!(
            "🔧 WebAuthn relying party {} at {} (user verification: {})",
            rp_id, rp_origin, user_verification
        );
    }

    /// Log a fresh challenge being issued
    pub fn log_challenge_issued(ceremony: &str, owner: Option<&str>) {
        debug!(
            "Issued {} challenge for {}",
            ceremony,
            owner.unwrap_or("<discoverable>")
        );
    }

    /// Log a successful registration
    pub fn log_registration_success(record: &CredentialRecord) {
        info!(
            "✅ Registered credential {} for {} (fmt: {}, signCount: {})",
            record.credential_id_b64(),
            record.owner,
            record.attestation_format,
            record.sign_count
        );
    }

    /// Log a successful authentication
    pub fn log_authentication_success(record: &CredentialRecord) {
        info!(
            "✅ Authenticated credential {} for {} (signCount: {})",
            record.credential_id_b64(),
            record.owner,
            record.sign_count
        );
    }

    /// Log a failed ceremony. Clone warnings are raised to `warn!`.
    pub fn log_ceremony_failure(ceremony: &str, credential_id: Option<&str>, error: &WebAuthnError) {
        let id = credential_id.unwrap_or("<unknown>");
        if error.is_clone_warning() {
            warn!(
                "⚠️  Possible cloned authenticator during {}: credential {} counter did not advance",
                ceremony, id
            );
        } else {
            info!("❌ {} failed for credential {}: {}", ceremony, id, error);
        }
    }

    /// Log attestation certificates that could not be parsed
    pub fn log_certificate_errors(errors: &[WebAuthnError]) {
        if !errors.is_empty() {
            warn!(
                "{} attestation certificate(s) could not be parsed: {:?}",
                errors.len(),
                errors
            );
        }
    }
}
