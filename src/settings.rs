//! Configuration loading
//!
//! Settings are layered, highest priority first:
//! 1. Environment variables
//! 2. `Settings.toml` in `PASSKEY_SECRETS_DIR` (if set and present)
//! 3. `Settings.toml` in the current directory (if present)
//! 4. Defaults

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Context;
use serde::{Deserialize, Serialize};

use crate::utils::logging::LoggingHelper;
use crate::webauthn::WebAuthnSettings;

pub const SETTINGS_FILE: &str = "Settings.toml";
pub const SECRETS_DIR_ENV: &str = "PASSKEY_SECRETS_DIR";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    /// `env_logger` filter string, e.g. `info` or `passkey_core=debug`
    pub level: String,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

/// Top-level settings
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub webauthn: WebAuthnSettings,
    pub logging: LoggingSettings,
}

impl Settings {
    /// Load settings from files and environment, validate them and initialise logging
    ///
    /// # Errors
    /// Returns an error if a settings file cannot be read or parsed, or the
    /// resulting `WebAuthn` settings are invalid
    pub fn load() -> anyhow::Result<Self> {
        let secrets_dir = std::env::var(SECRETS_DIR_ENV).ok().map(PathBuf::from);
        let mut settings = Self::load_files(Path::new(SETTINGS_FILE), secrets_dir.as_deref())?;
        settings.apply_env_overrides();
        settings.webauthn.validate()?;

        settings.init_logging();
        LoggingHelper::log_settings_loaded(
            &settings.webauthn.rp_id,
            &settings.webauthn.rp_origin,
            &settings.webauthn.user_verification,
        );
        Ok(settings)
    }

    /// Read the file layers: defaults, then `local`, then `secrets_dir/Settings.toml`
    ///
    /// A later file replaces the earlier one entirely; fields it omits take
    /// their defaults.
    ///
    /// # Errors
    /// Returns an error if an existing file cannot be read or is not valid TOML
    pub fn load_files(local: &Path, secrets_dir: Option<&Path>) -> anyhow::Result<Self> {
        let mut settings = Self::default();

        if local.exists() {
            settings = Self::read_file(local)?;
            log::debug!("Loaded base settings from {}", local.display());
        }

        if let Some(dir) = secrets_dir {
            let secrets_path = dir.join(SETTINGS_FILE);
            if secrets_path.exists() {
                settings = Self::read_file(&secrets_path)?;
                log::debug!("Overriding settings from {}", secrets_path.display());
            } else {
                log::debug!(
                    "{SECRETS_DIR_ENV} set but no {SETTINGS_FILE} found at: {}",
                    secrets_path.display()
                );
            }
        }

        Ok(settings)
    }

    fn read_file(path: &Path) -> anyhow::Result<Self> {
        let content =
            fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
        basic_toml::from_str(&content).with_context(|| format!("parsing {}", path.display()))
    }

    /// Apply environment variable overrides
    pub fn apply_env_overrides(&mut self) {
        let webauthn = &mut self.webauthn;
        apply_string_env_override("RP_ID", &mut webauthn.rp_id);
        apply_string_env_override("RP_NAME", &mut webauthn.rp_name);
        apply_string_env_override("RP_ORIGIN", &mut webauthn.rp_origin);
        apply_string_env_override("USER_VERIFICATION", &mut webauthn.user_verification);
        if let Ok(value) = std::env::var("WEBAUTHN_TIMEOUT_SECONDS") {
            match value.parse::<u64>() {
                Ok(seconds) => webauthn.timeout_seconds = seconds,
                Err(_) => log::warn!("Ignoring non-numeric WEBAUTHN_TIMEOUT_SECONDS: {value}"),
            }
        }
        apply_string_env_override("LOG_LEVEL", &mut self.logging.level);
    }

    fn init_logging(&self) {
        if env_logger::Builder::new()
            .parse_filters(&self.logging.level)
            .try_init()
            .is_err()
        {
            log::debug!("Logger already initialised");
        }
    }
}

fn apply_string_env_override(env_var: &str, target: &mut String) {
    if let Ok(value) = std::env::var(env_var) {
        *target = value;
    }
}
