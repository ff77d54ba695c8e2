//! Key-value persistence substrate
//!
//! The vault only ever touches three records (`wallet`, `settings`,
//! `session`). Backends must apply each `set` and `remove` call atomically:
//! a multi-key write is all-or-nothing and readers never observe a torn
//! record.

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Mutex;
use thiserror::Error;
use tokio::sync::broadcast;

/// A batch of records keyed by name.
pub type Records = HashMap<String, Value>;

/// Capacity of the change-notification channel
const CHANGE_CHANNEL_CAPACITY: usize = 64;

/// Errors from the persistence substrate
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Store lock poisoned")]
    Poisoned,
}

/// A record was written (`value: Some`) or removed (`value: None`).
#[derive(Debug, Clone, PartialEq)]
pub struct StoreChange {
    pub key: String,
    pub value: Option<Value>,
}

/// Namespaced, durable key-value storage.
pub trait KvStore: Send + Sync {
    /// Fetch the given keys. Absent keys are missing from the result.
    fn get(&self, keys: &[&str]) -> Result<Records, StoreError>;

    /// Write all entries in one atomic step.
    fn set(&self, entries: Records) -> Result<(), StoreError>;

    /// Delete all keys in one atomic step. Missing keys are ignored.
    fn remove(&self, keys: &[&str]) -> Result<(), StoreError>;

    /// Receive a `StoreChange` for every key written or removed after this call.
    fn subscribe(&self) -> broadcast::Receiver<StoreChange>;
}

/// Read and decode one record.
pub fn read_record<T, S>(store: &S, key: &str) -> Result<Option<T>, StoreError>
where
    T: DeserializeOwned,
    S: KvStore + ?Sized,
{
    match store.get(&[key])?.remove(key) {
        Some(value) => Ok(Some(serde_json::from_value(value)?)),
        None => Ok(None),
    }
}

/// Encode a record for inclusion in a `set` batch.
pub fn encode_record<T: Serialize>(
    records: &mut Records,
    key: &str,
    value: &T,
) -> Result<(), StoreError> {
    records.insert(key.to_string(), serde_json::to_value(value)?);
    Ok(())
}

/// Fan-out of change notifications shared by the backends.
pub(crate) struct ChangeNotifier {
    tx: broadcast::Sender<StoreChange>,
}

impl ChangeNotifier {
    pub(crate) fn new() -> Self {
        let (tx, _) = broadcast::channel(CHANGE_CHANNEL_CAPACITY);
        Self { tx }
    }

    pub(crate) fn subscribe(&self) -> broadcast::Receiver<StoreChange> {
        self.tx.subscribe()
    }

    pub(crate) fn written(&self, entries: &Records) {
        for (key, value) in entries {
            self.send(StoreChange {
                key: key.clone(),
                value: Some(value.clone()),
            });
        }
    }

    pub(crate) fn removed(&self, keys: &[&str]) {
        for key in keys {
            self.send(StoreChange {
                key: key.to_string(),
                value: None,
            });
        }
    }

    fn send(&self, change: StoreChange) {
        // No subscribers is not an error
        let _ = self.tx.send(change);
    }
}

/// In-process store. Durable only for the life of the process.
pub struct MemoryStore {
    records: Mutex<Records>,
    notifier: ChangeNotifier,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            records: Mutex::new(HashMap::new()),
            notifier: ChangeNotifier::new(),
        }
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl KvStore for MemoryStore {
    fn get(&self, keys: &[&str]) -> Result<Records, StoreError> {
        let records = self.records.lock().map_err(|_| StoreError::Poisoned)?;
        Ok(keys
            .iter()
            .filter_map(|k| records.get(*k).map(|v| (k.to_string(), v.clone())))
            .collect())
    }

    fn set(&self, entries: Records) -> Result<(), StoreError> {
        {
            let mut records = self.records.lock().map_err(|_| StoreError::Poisoned)?;
            for (key, value) in &entries {
                records.insert(key.clone(), value.clone());
            }
        }
        self.notifier.written(&entries);
        Ok(())
    }

    fn remove(&self, keys: &[&str]) -> Result<(), StoreError> {
        {
            let mut records = self.records.lock().map_err(|_| StoreError::Poisoned)?;
            for key in keys {
                records.remove(*key);
            }
        }
        self.notifier.removed(keys);
        Ok(())
    }

    fn subscribe(&self) -> broadcast::Receiver<StoreChange> {
        self.notifier.subscribe()
    }
}
