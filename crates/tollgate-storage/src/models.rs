//! Typed metadata records.
//!
//! Records are serialized to JSON only when they cross into a
//! [`MetadataStore`](crate::MetadataStore).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tollgate_core::TagId;

use crate::error::{StorageError, StorageResult};

/// Longest accepted owner name or role, in characters.
pub const MAX_LABEL_LEN: usize = 64;

/// Human-readable owner of an enrolled fingerprint slot.
///
/// # Examples
///
/// ```
/// use tollgate_storage::SlotOwner;
/// use chrono::Utc;
///
/// let owner = SlotOwner::new("Ana Souza", "operator", Utc::now()).unwrap();
/// assert_eq!(owner.owner, "Ana Souza");
/// assert!(SlotOwner::new("  ", "operator", Utc::now()).is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlotOwner {
    /// Display name
    pub owner: String,

    /// Free-form role, e.g. "resident" or "staff"
    pub role: String,

    /// When the metadata was saved
    pub registered_at: DateTime<Utc>,
}

impl SlotOwner {
    /// Build a validated owner record. Labels are trimmed.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Validation` if the owner is empty or either label
    /// is longer than [`MAX_LABEL_LEN`].
    pub fn new(
        owner: impl AsRef<str>,
        role: impl AsRef<str>,
        registered_at: DateTime<Utc>,
    ) -> StorageResult<Self> {
        let owner = owner.as_ref().trim();
        let role = role.as_ref().trim();

        if owner.is_empty() {
            return Err(StorageError::Validation("owner must not be empty".into()));
        }
        for (field, value) in [("owner", owner), ("role", role)] {
            if value.chars().count() > MAX_LABEL_LEN {
                return Err(StorageError::Validation(format!(
                    "{field} longer than {MAX_LABEL_LEN} characters"
                )));
            }
        }

        Ok(Self {
            owner: owner.to_string(),
            role: role.to_string(),
            registered_at,
        })
    }
}

/// Running pass log for one vehicle tag.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PassRecord {
    pub tag: TagId,

    /// Confirmed passes recorded for this tag
    pub count: u64,

    pub last_pass_at: DateTime<Utc>,
}

impl PassRecord {
    pub fn first(tag: TagId, at: DateTime<Utc>) -> Self {
        Self {
            tag,
            count: 1,
            last_pass_at: at,
        }
    }

    /// Count one more pass.
    pub fn bump(&mut self, at: DateTime<Utc>) {
        self.count += 1;
        self.last_pass_at = at;
    }
}
