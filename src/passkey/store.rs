//! Credential storage
//!
//! The store is the only place a credential's signature counter is written.
//! `update_sign_count` is a compare-and-update so two assertions racing on
//! the same counter value cannot both be accepted.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, Utc};

use super::errors::StoreError;
use crate::utils::encoding;
use crate::webauthn::{counter_advanced, CredentialRecord};

/// Storage for registered credentials
pub trait CredentialStore: Send + Sync {
    /// Insert a new credential
    ///
    /// # Errors
    /// `StoreError::Duplicate` if the credential ID is taken
    fn create(&self, record: CredentialRecord) -> Result<(), StoreError>;

    /// Look up a credential by ID
    ///
    /// # Errors
    /// `StoreError::Unavailable` if the store cannot be read
    fn get(&self, credential_id: &[u8]) -> Result<Option<CredentialRecord>, StoreError>;

    /// All credentials registered to `owner`
    ///
    /// # Errors
    /// `StoreError::Unavailable` if the store cannot be read
    fn list_for_owner(&self, owner: &str) -> Result<Vec<CredentialRecord>, StoreError>;

    /// Set the counter to `new` if it still equals `observed` and `new` is
    /// an acceptable successor. Returns whether the write happened.
    ///
    /// # Errors
    /// `StoreError::Unavailable` if the store cannot be written
    fn update_sign_count(
        &self,
        credential_id: &[u8],
        observed: u32,
        new: u32,
        last_used: DateTime<Utc>,
    ) -> Result<bool, StoreError>;
}

/// In-memory credential store
#[derive(Debug, Default)]
pub struct MemoryCredentialStore {
    credentials: Mutex<HashMap<Vec<u8>, CredentialRecord>>,
}

impl MemoryCredentialStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, HashMap<Vec<u8>, CredentialRecord>>, StoreError> {
        self.credentials
            .lock()
            .map_err(|_| StoreError::Unavailable("credential store lock poisoned".to_string()))
    }
}

impl CredentialStore for MemoryCredentialStore {
    fn create(&self, record: CredentialRecord) -> Result<(), StoreError> {
        let mut credentials = self.lock()?;
        if credentials.contains_key(&record.credential_id) {
            return Err(StoreError::Duplicate(record.credential_id_b64()));
        }
        credentials.insert(record.credential_id.clone(), record);
        Ok(())
    }

    fn get(&self, credential_id: &[u8]) -> Result<Option<CredentialRecord>, StoreError> {
        Ok(self.lock()?.get(credential_id).cloned())
    }

    fn list_for_owner(&self, owner: &str) -> Result<Vec<CredentialRecord>, StoreError> {
        let mut records: Vec<_> = self
            .lock()?
            .values()
            .filter(|record| record.owner == owner)
            .cloned()
            .collect();
        records.sort_by_key(|record| record.created_at);
        Ok(records)
    }

    fn update_sign_count(
        &self,
        credential_id: &[u8],
        observed: u32,
        new: u32,
        last_used: DateTime<Utc>,
    ) -> Result<bool, StoreError> {
        let mut credentials = self.lock()?;
        let Some(record) = credentials.get_mut(credential_id) else {
            return Ok(false);
        };
        if record.sign_count != observed || !counter_advanced(record.sign_count, new) {
            log::debug!(
                "Rejected counter update for {}: stored {}, observed {}, new {}",
                encoding::encode(credential_id),
                record.sign_count,
                observed,
                new
            );
            return Ok(false);
        }
        record.sign_count = new;
        record.last_used = Some(last_used);
        Ok(true)
    }
}
