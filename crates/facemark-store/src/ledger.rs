//! Append-only attendance history, oldest first.

use crate::backend::KvBackend;
use crate::{read_sequence, write_sequence, StoreError};
use facemark_core::AttendanceEntry;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Backend key holding the attendance history.
pub const HISTORY_KEY: &str = "face_attendance_history_v1";

/// The ledger never reads the clock; timestamps come from the caller.
pub struct AttendanceLedger {
    backend: Arc<dyn KvBackend>,
}

impl AttendanceLedger {
    pub fn new(backend: Arc<dyn KvBackend>) -> Self {
        Self { backend }
    }

    /// Append one entry. Repeats for the same name are recorded as-is.
    pub fn append(&self, name: &str, timestamp: i64) -> Result<AttendanceEntry, StoreError> {
        let entry = AttendanceEntry {
            name: name.to_string(),
            timestamp,
        };

        let mut entries = self.all()?;
        entries.push(entry.clone());
        write_sequence(self.backend.as_ref(), HISTORY_KEY, &entries)?;

        tracing::info!(name, timestamp, total = entries.len(), "attendance recorded");
        Ok(entry)
    }

    /// Every entry in append order.
    pub fn all(&self) -> Result<Vec<AttendanceEntry>, StoreError> {
        read_sequence(self.backend.as_ref(), HISTORY_KEY)
    }

    /// Most recent timestamp per name, in append order (later appends win).
    pub fn last_seen(&self) -> Result<BTreeMap<String, i64>, StoreError> {
        Ok(self
            .all()?
            .into_iter()
            .map(|e| (e.name, e.timestamp))
            .collect())
    }

    pub fn len(&self) -> Result<usize, StoreError> {
        Ok(self.all()?.len())
    }

    pub fn is_empty(&self) -> Result<bool, StoreError> {
        Ok(self.len()? == 0)
    }
}
