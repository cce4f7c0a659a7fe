//! `WebAuthn` settings implementation
//!
//! This module defines settings for `WebAuthn` operations independent
//! of application-specific settings.

use serde::{Deserialize, Serialize};

use super::errors::WebAuthnError;

/// `WebAuthn` settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WebAuthnSettings {
    /// Relying Party ID (usually the domain)
    pub rp_id: String,
    /// Relying Party name (displayed to user)
    pub rp_name: String,
    /// Relying Party origin (e.g., <https://example.com>)
    pub rp_origin: String,
    /// Timeout in seconds for operations
    pub timeout_seconds: u64,
    /// User verification preference ("required", "preferred", "discouraged")
    pub user_verification: String,
    /// Optional authenticator attachment ("platform", "cross-platform")
    pub authenticator_attachment: Option<String>,
    /// Reject ceremonies whose authenticator data lacks the UP flag
    pub require_user_presence: bool,
}

impl Default for WebAuthnSettings {
    fn default() -> Self {
        Self {
            rp_id: "localhost".to_string(),
            rp_name: "Passkey Core".to_string(),
            rp_origin: "https://localhost".to_string(),
            timeout_seconds: 60,
            user_verification: "preferred".to_string(),
            authenticator_attachment: None,
            require_user_presence: true,
        }
    }
}

impl WebAuthnSettings {
    /// Check the settings are usable
    ///
    /// # Errors
    /// Returns `ConfigurationError` if:
    /// - the relying party ID is empty
    /// - the origin is not `https://` (plain `http://localhost` is allowed)
    /// - `user_verification` is not a known preference
    pub fn validate(&self) -> Result<(), WebAuthnError> {
        if self.rp_id.is_empty() {
            return Err(WebAuthnError::ConfigurationError(
                "Relying party ID cannot be empty".into(),
            ));
        }

        if !self.rp_origin.starts_with("https://") && !is_plain_localhost(&self.rp_origin) {
            return Err(WebAuthnError::ConfigurationError(
                "Origin must be https:// except for localhost".into(),
            ));
        }

        if !matches!(
            self.user_verification.as_str(),
            "required" | "preferred" | "discouraged"
        ) {
            return Err(WebAuthnError::ConfigurationError(format!(
                "Unknown user verification preference: {}",
                self.user_verification
            )));
        }

        Ok(())
    }

    /// Whether the UV flag must be set
    #[must_use]
    pub fn requires_user_verification(&self) -> bool {
        self.user_verification == "required"
    }

    /// Timeout in milliseconds, saturating at `u32::MAX`
    #[must_use]
    pub fn timeout_millis(&self) -> u32 {
        u32::try_from(self.timeout_seconds.saturating_mul(1000)).unwrap_or(u32::MAX)
    }
}

fn is_plain_localhost(origin: &str) -> bool {
    origin
        .strip_prefix("http://localhost")
        .is_some_and(|rest| rest.is_empty() || rest.starts_with(':'))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        assert!(WebAuthnSettings::default().validate().is_ok());
    }

    #[test]
    fn test_empty_rp_id_rejected() {
        let settings = WebAuthnSettings {
            rp_id: String::new(),
            ..WebAuthnSettings::default()
        };
        assert!(matches!(
            settings.validate(),
            Err(WebAuthnError::ConfigurationError(_))
        ));
    }

    #[test]
    fn test_origin_scheme_rules() {
        let with_origin = |origin: &str| WebAuthnSettings {
            rp_origin: origin.to_string(),
            ..WebAuthnSettings::default()
        };

        assert!(with_origin("https://example.com").validate().is_ok());
        assert!(with_origin("http://localhost").validate().is_ok());
        assert!(with_origin("http://localhost:8080").validate().is_ok());
        assert!(with_origin("http://example.com").validate().is_err());
        assert!(with_origin("http://localhost.evil.com").validate().is_err());
    }

    #[test]
    fn test_user_verification_values() {
        let settings = WebAuthnSettings {
            user_verification: "always".to_string(),
            ..WebAuthnSettings::default()
        };
        assert!(settings.validate().is_err());

        let settings = WebAuthnSettings {
            user_verification: "required".to_string(),
            ..WebAuthnSettings::default()
        };
        assert!(settings.validate().is_ok());
        assert!(settings.requires_user_verification());
    }

    #[test]
    fn test_timeout_millis_saturates() {
        let settings = WebAuthnSettings {
            timeout_seconds: u64::MAX,
            ..WebAuthnSettings::default()
        };
        assert_eq!(settings.timeout_millis(), u32::MAX);
        assert_eq!(WebAuthnSettings::default().timeout_millis(), 60_000);
    }
}
