//! In-process record store.
//!
//! Keeps every collection in insertion order and pages through it with
//! offset cursors. Useful for tests and for dry runs without a backend.

use super::{Page, PageRequest, RecordStore};
use crate::models::{RecordFields, RecordId, RecordKind, StoredRecord};
use crate::{Error, Result};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

/// In-memory record store.
#[derive(Debug, Default)]
pub struct MemoryStore {
    collections: Mutex<HashMap<RecordKind, Vec<StoredRecord>>>,
}

impl MemoryStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store pre-populated with records.
    #[must_use]
    pub fn with_records(records: impl IntoIterator<Item = StoredRecord>) -> Self {
        let mut collections: HashMap<RecordKind, Vec<StoredRecord>> = HashMap::new();
        for record in records {
            collections.entry(record.kind()).or_default().push(record);
        }
        Self {
            collections: Mutex::new(collections),
        }
    }

    fn lock(&self) -> Result<MutexGuard<'_, HashMap<RecordKind, Vec<StoredRecord>>>> {
        self.collections
            .lock()
            .map_err(|e| Error::operation("memory_store_lock", e))
    }

    /// Returns a copy of every record of a kind, in insertion order.
    ///
    /// # Errors
    ///
    /// Returns an error if the store lock is poisoned.
    pub fn snapshot(&self, kind: RecordKind) -> Result<Vec<StoredRecord>> {
        Ok(self.lock()?.get(&kind).cloned().unwrap_or_default())
    }

    /// Returns the number of records of a kind.
    ///
    /// # Errors
    ///
    /// Returns an error if the store lock is poisoned.
    pub fn count(&self, kind: RecordKind) -> Result<usize> {
        Ok(self.lock()?.get(&kind).map_or(0, Vec::len))
    }

    /// Inserts a record with a fresh identifier.
    pub(super) fn insert(&self, fields: RecordFields) -> Result<StoredRecord> {
        let record = StoredRecord::new(RecordId::generate(), fields);
        self.lock()?
            .entry(record.kind())
            .or_default()
            .push(record.clone());
        Ok(record)
    }

    /// Removes a record by identifier.
    pub(super) fn remove(&self, kind: RecordKind, id: &RecordId) -> Result<Option<StoredRecord>> {
        let mut collections = self.lock()?;
        let Some(records) = collections.get_mut(&kind) else {
            return Ok(None);
        };
        Ok(records
            .iter()
            .position(|r| &r.id == id)
            .map(|pos| records.remove(pos)))
    }

    /// Replaces a whole collection; used when loading snapshots.
    pub(super) fn replace(&self, kind: RecordKind, records: Vec<StoredRecord>) -> Result<()> {
        self.lock()?.insert(kind, records);
        Ok(())
    }

    fn page(&self, kind: RecordKind, request: &PageRequest) -> Result<Page> {
        let offset = match request.cursor.as_deref() {
            None => 0,
            Some(cursor) => cursor.parse::<usize>().map_err(|_| {
                Error::store("list", kind, format!("invalid continuation cursor '{cursor}'"))
            })?,
        };
        let page_size = request.page_size.max(1);

        let collections = self.lock()?;
        let records = collections.get(&kind).map_or(&[][..], Vec::as_slice);
        let end = offset.saturating_add(page_size).min(records.len());
        let items = records.get(offset..end).map(<[_]>::to_vec).unwrap_or_default();
        let next_cursor = (end < records.len()).then(|| end.to_string());

        Ok(Page { items, next_cursor })
    }
}

#[async_trait]
impl RecordStore for MemoryStore {
    fn name(&self) -> &'static str {
        "memory"
    }

    async fn list(&self, kind: RecordKind, request: PageRequest) -> Result<Page> {
        self.page(kind, &request)
    }

    async fn create(&self, fields: RecordFields) -> Result<StoredRecord> {
        self.insert(fields)
    }

    async fn delete(&self, kind: RecordKind, id: &RecordId) -> Result<Option<StoredRecord>> {
        self.remove(kind, id)
    }

    async fn get(&self, kind: RecordKind, id: &RecordId) -> Result<Option<StoredRecord>> {
        Ok(self
            .lock()?
            .get(&kind)
            .and_then(|records| records.iter().find(|r| &r.id == id).cloned()))
    }
}
