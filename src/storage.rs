// File: src/storage.rs
//! The storage port every progress store is built on.
//!
//! The browser app kept each record as a JSON string under a fixed or templated
//! key. [`KeyValueStore`] is that capability, injected into the stores instead
//! of being reached for globally.

use crate::error::StorageError;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::BTreeMap;
use tracing::{debug, warn};

/// Key layout of the persisted state.
pub mod keys {
    pub const AVATAR_STATE: &str = "avatarState";
    pub const USER: &str = "user";
    pub const WORKFLOW_STATE: &str = "workflowState";
    pub const SIMPLE_JOURNEY_PROGRESS: &str = "journeyProgress";
    pub const USER_PROGRESS: &str = "userProgress";
    pub const SELECTED_JOURNEY: &str = "selectedJourney";
    /// Owned by the login/registration flow; the progress core never touches it.
    pub const REGISTERED_USERS: &str = "registeredUsers";

    pub fn journey_progress(journey_id: &str) -> String {
        format!("journey_{}_progress", journey_id)
    }

    pub fn location_progress(location_id: &str) -> String {
        format!("location_{}_progress", location_id)
    }
}

/// A synchronous string-keyed store with no cross-key atomicity.
pub trait KeyValueStore {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&mut self, key: &str, value: String) -> Result<(), StorageError>;
    fn remove(&mut self, key: &str) -> Result<(), StorageError>;
}

impl<S: KeyValueStore + ?Sized> KeyValueStore for Box<S> {
    fn get(&self, key: &str) -> Option<String> {
        (**self).get(key)
    }

    fn set(&mut self, key: &str, value: String) -> Result<(), StorageError> {
        (**self).set(key, value)
    }

    fn remove(&mut self, key: &str) -> Result<(), StorageError> {
        (**self).remove(key)
    }
}

/// In-process store. With a quota it behaves like a full browser profile:
/// writes that would push the total size of keys and values past the limit
/// are rejected and leave the store untouched.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    entries: BTreeMap<String, String>,
    quota: Option<usize>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_quota(limit: usize) -> Self {
        Self {
            entries: BTreeMap::new(),
            quota: Some(limit),
        }
    }

    pub fn from_entries(entries: BTreeMap<String, String>) -> Self {
        Self { entries, quota: None }
    }

    pub fn entries(&self) -> &BTreeMap<String, String> {
        &self.entries
    }

    /// Total bytes of keys and values currently held.
    pub fn used_bytes(&self) -> usize {
        self.entries.iter().map(|(k, v)| k.len() + v.len()).sum()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: String) -> Result<(), StorageError> {
        if let Some(limit) = self.quota {
            let replaced = self.entries.get(key).map_or(0, |old| key.len() + old.len());
            let needed = self.used_bytes() - replaced + key.len() + value.len();
            if needed > limit {
                return Err(StorageError::QuotaExceeded {
                    key: key.to_string(),
                    needed,
                    limit,
                });
            }
        }
        self.entries.insert(key.to_string(), value);
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<(), StorageError> {
        self.entries.remove(key);
        Ok(())
    }
}

/// Reads and decodes a JSON record. Absent and malformed payloads both come
/// back as `None`; the latter is logged.
pub fn load_json<T, S>(storage: &S, key: &str) -> Option<T>
where
    T: DeserializeOwned,
    S: KeyValueStore + ?Sized,
{
    let raw = storage.get(key)?;
    match serde_json::from_str(&raw) {
        Ok(value) => Some(value),
        Err(e) => {
            warn!(key, error = %e, "malformed payload, falling back to default");
            None
        }
    }
}

pub fn store_json<T, S>(storage: &mut S, key: &str, value: &T) -> Result<(), StorageError>
where
    T: Serialize + ?Sized,
    S: KeyValueStore + ?Sized,
{
    let json = serde_json::to_string(value)?;
    storage.set(key, json)
}

/// Writes a record, logging instead of failing. Returns whether the write
/// actually landed.
pub fn persist<T, S>(storage: &mut S, key: &str, value: &T) -> bool
where
    T: Serialize + ?Sized,
    S: KeyValueStore + ?Sized,
{
    match store_json(storage, key, value) {
        Ok(()) => {
            debug!(key, "persisted");
            true
        }
        Err(e) => {
            warn!(key, error = %e, "write failed, state not persisted");
            false
        }
    }
}

/// A batch of writes that lands completely or not at all.
///
/// Each key's prior value is captured right before it is overwritten; if a
/// later write fails, the keys already written are restored in reverse order.
#[derive(Debug, Default)]
pub struct StoreTransaction {
    writes: Vec<(String, String)>,
}

impl StoreTransaction {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stage(&mut self, key: impl Into<String>, value: String) -> &mut Self {
        self.writes.push((key.into(), value));
        self
    }

    pub fn stage_json<T: Serialize + ?Sized>(
        &mut self,
        key: impl Into<String>,
        value: &T,
    ) -> Result<&mut Self, StorageError> {
        let json = serde_json::to_string(value)?;
        Ok(self.stage(key, json))
    }

    pub fn is_empty(&self) -> bool {
        self.writes.is_empty()
    }

    pub fn commit<S: KeyValueStore + ?Sized>(self, storage: &mut S) -> Result<(), StorageError> {
        let mut applied: Vec<(String, Option<String>)> = Vec::with_capacity(self.writes.len());
        for (key, value) in self.writes {
            let prior = storage.get(&key);
            if let Err(e) = storage.set(&key, value) {
                warn!(key = %key, error = %e, "transaction write failed, rolling back");
                rollback(storage, applied);
                return Err(e);
            }
            applied.push((key, prior));
        }
        Ok(())
    }
}

fn rollback<S: KeyValueStore + ?Sized>(storage: &mut S, applied: Vec<(String, Option<String>)>) {
    for (key, prior) in applied.into_iter().rev() {
        let restored = match prior {
            Some(value) => storage.set(&key, value),
            None => storage.remove(&key),
        };
        if let Err(e) = restored {
            warn!(key = %key, error = %e, "rollback could not restore key");
        }
    }
}
