//! Metadata persistence for the gate controller.
//!
//! The controller only needs a key-value capability ([`MetadataStore`]).
//! [`MetadataRepository`] layers typed records on top of it:
//!
//! - [`SlotOwner`] - who a fingerprint slot belongs to
//! - [`PassRecord`] - how often a vehicle tag has passed
//!
//! # Examples
//!
//! ```
//! use tollgate_core::SlotId;
//! use tollgate_storage::{MemoryStore, MetadataRepository, SlotOwner};
//! use chrono::Utc;
//!
//! let mut repo = MetadataRepository::new(MemoryStore::new());
//! let slot = SlotId::new(3).unwrap();
//! let owner = SlotOwner::new("Ana", "resident", Utc::now()).unwrap();
//!
//! repo.save_owner(slot, &owner).unwrap();
//! assert_eq!(repo.owner(slot).unwrap().unwrap().role, "resident");
//! ```

pub mod error;
pub mod models;
pub mod repository;
pub mod store;

pub use error::{StorageError, StorageResult};
pub use models::{MAX_LABEL_LEN, PassRecord, SlotOwner};
pub use repository::MetadataRepository;
pub use store::{JsonFileStore, MemoryStore, MetadataStore};
