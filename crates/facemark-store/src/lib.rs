//! facemark-store — Persistence for registered references and the attendance ledger.
//!
//! Both collections live under their own key in a [`KvBackend`] as JSON arrays
//! and are rewritten in full on every mutation. There is no rollback: a failed
//! write is reported to the caller and the stored value may be stale.

pub mod backend;
pub mod fingerprints;
pub mod ledger;

pub use backend::{BackendError, KvBackend, MemoryBackend, SqliteBackend};
pub use fingerprints::{FingerprintStore, StoredReference, REFERENCES_KEY};
pub use ledger::{AttendanceLedger, HISTORY_KEY};

use serde::de::DeserializeOwned;
use serde::Serialize;
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("storage backend: {0}")]
    Backend(#[from] BackendError),
    #[error("serialization: {0}")]
    Serialize(#[from] serde_json::Error),
    #[error("fingerprint encoding: {0}")]
    Encode(#[from] facemark_core::EncodeError),
    #[error("stored reference {index} ({name}) could not be decoded: {source}")]
    Decode {
        index: usize,
        name: String,
        source: facemark_core::DecodeError,
    },
}

/// Storage service: one backend shared by the fingerprint store and the ledger.
pub struct Storage {
    fingerprints: FingerprintStore,
    ledger: AttendanceLedger,
}

impl Storage {
    pub fn new(backend: Arc<dyn KvBackend>, target_size: u32) -> Self {
        Self {
            fingerprints: FingerprintStore::new(Arc::clone(&backend), target_size),
            ledger: AttendanceLedger::new(backend),
        }
    }

    pub fn in_memory(target_size: u32) -> Self {
        Self::new(Arc::new(MemoryBackend::new()), target_size)
    }

    pub fn open_sqlite(path: impl AsRef<Path>, target_size: u32) -> Result<Self, StoreError> {
        Ok(Self::new(Arc::new(SqliteBackend::open(path)?), target_size))
    }

    pub fn fingerprints(&self) -> &FingerprintStore {
        &self.fingerprints
    }

    pub fn ledger(&self) -> &AttendanceLedger {
        &self.ledger
    }
}

/// Read a JSON array stored under `key`. Absent or malformed values read as empty.
pub(crate) fn read_sequence<T: DeserializeOwned>(
    backend: &dyn KvBackend,
    key: &str,
) -> Result<Vec<T>, StoreError> {
    let Some(raw) = backend.get(key)? else {
        return Ok(Vec::new());
    };

    match serde_json::from_str::<Vec<T>>(&raw) {
        Ok(items) => Ok(items),
        Err(e) => {
            tracing::warn!(key, error = %e, "malformed stored collection; treating as empty");
            Ok(Vec::new())
        }
    }
}

pub(crate) fn write_sequence<T: Serialize>(
    backend: &dyn KvBackend,
    key: &str,
    items: &[T],
) -> Result<(), StoreError> {
    let raw = serde_json::to_string(items)?;
    backend.put(key, &raw)?;
    Ok(())
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_storage_shares_one_backend() {
        let backend: Arc<dyn KvBackend> = Arc::new(MemoryBackend::new());
        let storage = Storage::new(Arc::clone(&backend), 8);

        storage.fingerprints().add("A", &testutil::solid(8, [1, 2, 3])).unwrap();
        storage.ledger().append("A", 42).unwrap();

        assert!(backend.get(REFERENCES_KEY).unwrap().is_some());
        assert!(backend.get(HISTORY_KEY).unwrap().is_some());
    }

    #[test]
    fn test_sqlite_storage_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("attendance.db");
        let first = testutil::solid(8, [10, 20, 30]);
        let second = testutil::solid(8, [200, 100, 0]);

        {
            let storage = Storage::open_sqlite(&path, 8).unwrap();
            storage.fingerprints().add("Aman", &first).unwrap();
            storage.fingerprints().add("Riya", &second).unwrap();
            storage.ledger().append("Aman", 1_000).unwrap();
        }

        let storage = Storage::open_sqlite(&path, 8).unwrap();
        let refs = storage.fingerprints().list().unwrap();
        let names: Vec<&str> = refs.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, ["Aman", "Riya"]);
        assert_eq!(refs[0].image, first);
        assert_eq!(refs[1].image, second);
        assert_eq!(storage.ledger().all().unwrap().len(), 1);
    }
}
