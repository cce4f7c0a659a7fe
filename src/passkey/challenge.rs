//! Single-use challenge bookkeeping
//!
//! A challenge is stored when a ceremony starts and removed the first time it
//! is consumed, whether the ceremony then succeeds or not. Challenges older
//! than the ceremony timeout are never handed out.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, TimeDelta, Utc};

use super::errors::StoreError;
use crate::webauthn::{AuthenticationState, RegistrationState};

/// Server-side state for an outstanding ceremony
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PendingCeremony {
    Registration(RegistrationState),
    Authentication(AuthenticationState),
}

impl PendingCeremony {
    #[must_use]
    pub fn challenge(&self) -> &[u8] {
        match self {
            Self::Registration(state) => &state.challenge,
            Self::Authentication(state) => &state.challenge,
        }
    }

    #[must_use]
    pub fn created_at(&self) -> DateTime<Utc> {
        match self {
            Self::Registration(state) => state.created_at,
            Self::Authentication(state) => state.created_at,
        }
    }
}

/// Storage for outstanding challenges, keyed by session
pub trait ChallengeStore: Send + Sync {
    /// Record a challenge, replacing any previous one for `key`
    ///
    /// # Errors
    /// `StoreError::Unavailable` if the store cannot be written
    fn issue(&self, key: &str, ceremony: PendingCeremony) -> Result<(), StoreError>;

    /// Remove and return the challenge for `key`. A second call returns `None`.
    ///
    /// # Errors
    /// `StoreError::Unavailable` if the store cannot be written
    fn consume(&self, key: &str) -> Result<Option<PendingCeremony>, StoreError>;
}

const DEFAULT_TTL_SECONDS: u64 = 60;

/// In-memory challenge store
///
/// Expired entries are dropped whenever a new challenge is issued, so
/// abandoned sessions do not accumulate.
#[derive(Debug)]
pub struct MemoryChallengeStore {
    pending: Mutex<HashMap<String, PendingCeremony>>,
    ttl: TimeDelta,
}

impl Default for MemoryChallengeStore {
    fn default() -> Self {
        Self::with_ttl_seconds(DEFAULT_TTL_SECONDS)
    }
}

impl MemoryChallengeStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Store whose challenges expire after `seconds`, normally the
    /// configured ceremony timeout
    #[must_use]
    pub fn with_ttl_seconds(seconds: u64) -> Self {
        let ttl = i64::try_from(seconds)
            .ok()
            .and_then(TimeDelta::try_seconds)
            .unwrap_or(TimeDelta::MAX);
        Self {
            pending: Mutex::new(HashMap::new()),
            ttl,
        }
    }

    /// Number of challenges currently held
    ///
    /// # Errors
    /// `StoreError::Unavailable` if the lock is poisoned
    pub fn pending_count(&self) -> Result<usize, StoreError> {
        Ok(self.lock()?.len())
    }

    fn lock(&self) -> Result<MutexGuard<'_, HashMap<String, PendingCeremony>>, StoreError> {
        self.pending
            .lock()
            .map_err(|_| StoreError::Unavailable("challenge store lock poisoned".to_string()))
    }

    fn is_live(&self, ceremony: &PendingCeremony, now: DateTime<Utc>) -> bool {
        now.signed_duration_since(ceremony.created_at()) <= self.ttl
    }
}

impl ChallengeStore for MemoryChallengeStore {
    fn issue(&self, key: &str, ceremony: PendingCeremony) -> Result<(), StoreError> {
        let now = Utc::now();
        let mut pending = self.lock()?;
        let before = pending.len();
        pending.retain(|_, existing| self.is_live(existing, now));
        if pending.len() < before {
            log::debug!("Dropped {} expired challenges", before - pending.len());
        }
        pending.insert(key.to_string(), ceremony);
        Ok(())
    }

    fn consume(&self, key: &str) -> Result<Option<PendingCeremony>, StoreError> {
        let ceremony = self.lock()?.remove(key);
        Ok(ceremony.filter(|c| self.is_live(c, Utc::now())))
    }
}
