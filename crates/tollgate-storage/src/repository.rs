//! Typed access to gate metadata on top of a [`MetadataStore`].
//!
//! Keys:
//!
//! - `slot/<N>`: [`SlotOwner`] for fingerprint slot `N`
//! - `pass/<TAG>`: [`PassRecord`] for vehicle tag `TAG`

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tollgate_core::{SlotId, TagId};
use tracing::{debug, warn};

use crate::error::{StorageError, StorageResult};
use crate::models::{PassRecord, SlotOwner};
use crate::store::MetadataStore;

const SLOT_PREFIX: &str = "slot/";
const PASS_PREFIX: &str = "pass/";

fn slot_key(slot: SlotId) -> String {
    format!("{SLOT_PREFIX}{slot}")
}

fn pass_key(tag: &TagId) -> String {
    format!("{PASS_PREFIX}{tag}")
}

/// Gate metadata repository.
#[derive(Debug)]
pub struct MetadataRepository<S> {
    store: S,
}

impl<S: MetadataStore> MetadataRepository<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn into_inner(self) -> S {
        self.store
    }

    /// Save owner metadata for `slot`, replacing any previous record.
    ///
    /// # Errors
    ///
    /// Fails if the record cannot be serialized or the store rejects the write.
    pub fn save_owner(&mut self, slot: SlotId, owner: &SlotOwner) -> StorageResult<()> {
        self.write(&slot_key(slot), owner)?;
        debug!(slot = %slot, owner = %owner.owner, "Saved slot owner");
        Ok(())
    }

    /// Owner metadata for `slot`, if any.
    ///
    /// # Errors
    ///
    /// Fails if a stored record is not valid JSON for [`SlotOwner`].
    pub fn owner(&self, slot: SlotId) -> StorageResult<Option<SlotOwner>> {
        self.read(&slot_key(slot))
    }

    /// Remove owner metadata for `slot`. Returns whether a record existed.
    ///
    /// # Errors
    ///
    /// Fails with [`StorageError::WriteRejected`] if the record exists but the
    /// store could not remove it.
    pub fn remove_owner(&mut self, slot: SlotId) -> StorageResult<bool> {
        let key = slot_key(slot);
        if self.store.remove(&key) {
            return Ok(true);
        }
        if self.store.get(&key, "").is_empty() {
            return Ok(false);
        }
        warn!(slot = %slot, "Owner record could not be removed");
        Err(StorageError::WriteRejected { key })
    }

    /// Slots that carry owner metadata.
    pub fn owned_slots(&self) -> Vec<SlotId> {
        let mut slots: Vec<SlotId> = self
            .store
            .keys(SLOT_PREFIX)
            .iter()
            .filter_map(|key| key.strip_prefix(SLOT_PREFIX)?.parse().ok())
            .collect();
        slots.sort();
        slots
    }

    /// Count a confirmed pass for `tag` and return the updated record.
    ///
    /// # Errors
    ///
    /// Fails if the stored record is corrupt or the write is rejected.
    pub fn record_pass(&mut self, tag: &TagId, at: DateTime<Utc>) -> StorageResult<PassRecord> {
        let record = match self.pass_record(tag)? {
            Some(mut record) => {
                record.bump(at);
                record
            }
            None => PassRecord::first(tag.clone(), at),
        };
        self.write(&pass_key(tag), &record)?;
        Ok(record)
    }

    /// Pass log for `tag`, if any.
    ///
    /// # Errors
    ///
    /// Fails if a stored record is not valid JSON for [`PassRecord`].
    pub fn pass_record(&self, tag: &TagId) -> StorageResult<Option<PassRecord>> {
        self.read(&pass_key(tag))
    }

    fn read<T: DeserializeOwned>(&self, key: &str) -> StorageResult<Option<T>> {
        let text = self.store.get(key, "");
        if text.is_empty() {
            return Ok(None);
        }
        match serde_json::from_str(&text) {
            Ok(value) => Ok(Some(value)),
            Err(e) => {
                warn!(key, error = %e, "Corrupt metadata record");
                Err(e.into())
            }
        }
    }

    fn write<T: Serialize>(&mut self, key: &str, value: &T) -> StorageResult<()> {
        let text = serde_json::to_string(value)?;
        if self.store.put(key, &text) {
            Ok(())
        } else {
            Err(StorageError::WriteRejected {
                key: key.to_string(),
            })
        }
    }
}
