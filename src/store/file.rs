//! File-backed record store.
//!
//! Keeps one JSON snapshot per record kind (`<data_dir>/<kind>.json`) and
//! serves reads from memory. Every mutation rewrites the affected snapshot
//! through a temporary file and a rename. A mutation whose snapshot cannot
//! be written is rolled back in memory, so memory and disk never disagree.
//!
//! # Limits
//!
//! Snapshots larger than [`MAX_SNAPSHOT_SIZE`] are rejected on open.
//!
//! Each create or delete rewrites the whole snapshot of its kind, so a bulk
//! import of N rows writes O(N²) bytes.

use super::memory::MemoryStore;
use super::{Page, PageRequest, RecordStore};
use crate::models::{RecordFields, RecordId, RecordKind, StoredRecord};
use crate::{Error, Result};
use async_trait::async_trait;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

/// Maximum snapshot file size (64MB).
const MAX_SNAPSHOT_SIZE: u64 = 64 * 1024 * 1024;

/// Record store persisted as JSON snapshots.
#[derive(Debug)]
pub struct FileStore {
    data_dir: PathBuf,
    records: MemoryStore,
    /// Held across each mutation and its snapshot write.
    write_lock: Mutex<()>,
}

impl FileStore {
    /// Opens (or creates) a store rooted at `data_dir`.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be created or a snapshot is
    /// unreadable.
    pub fn open(data_dir: &Path) -> Result<Self> {
        fs::create_dir_all(data_dir).map_err(|e| Error::OperationFailed {
            operation: "create_data_dir".to_string(),
            cause: format!("{}: {e}", data_dir.display()),
        })?;

        let records = MemoryStore::new();
        for kind in RecordKind::all() {
            let path = snapshot_path(data_dir, *kind);
            if path.exists() {
                let loaded = load_snapshot(&path, *kind)?;
                tracing::debug!(kind = %kind, count = loaded.len(), "loaded snapshot");
                records.replace(*kind, loaded)?;
            }
        }

        Ok(Self {
            data_dir: data_dir.to_path_buf(),
            records,
            write_lock: Mutex::new(()),
        })
    }

    fn lock_writes(&self) -> Result<MutexGuard<'_, ()>> {
        self.write_lock
            .lock()
            .map_err(|e| Error::operation("file_store_lock", e))
    }

    /// Writes the snapshot of a kind; callers hold the write lock.
    fn persist(&self, kind: RecordKind) -> Result<()> {
        let values = self
            .records
            .snapshot(kind)?
            .iter()
            .map(StoredRecord::to_json)
            .collect::<Result<Vec<_>>>()?;
        let json = serde_json::to_vec_pretty(&values)
            .map_err(|e| Error::operation("serialize_snapshot", e))?;

        let path = snapshot_path(&self.data_dir, kind);
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, json).map_err(|e| Error::OperationFailed {
            operation: "write_snapshot".to_string(),
            cause: format!("{}: {e}", tmp.display()),
        })?;
        fs::rename(&tmp, &path).map_err(|e| Error::OperationFailed {
            operation: "rename_snapshot".to_string(),
            cause: format!("{}: {e}", path.display()),
        })
    }
}

fn snapshot_path(data_dir: &Path, kind: RecordKind) -> PathBuf {
    data_dir.join(format!("{}.json", kind.as_str()))
}

fn load_snapshot(path: &Path, kind: RecordKind) -> Result<Vec<StoredRecord>> {
    let metadata = fs::metadata(path).map_err(|e| Error::OperationFailed {
        operation: "stat_snapshot".to_string(),
        cause: format!("{}: {e}", path.display()),
    })?;
    if metadata.len() > MAX_SNAPSHOT_SIZE {
        return Err(Error::OperationFailed {
            operation: "load_snapshot".to_string(),
            cause: format!(
                "{} exceeds maximum size of {MAX_SNAPSHOT_SIZE} bytes",
                path.display()
            ),
        });
    }

    let contents = fs::read(path).map_err(|e| Error::OperationFailed {
        operation: "read_snapshot".to_string(),
        cause: format!("{}: {e}", path.display()),
    })?;
    let values: Vec<serde_json::Value> = serde_json::from_slice(&contents)
        .map_err(|e| Error::operation("parse_snapshot", format!("{}: {e}", path.display())))?;

    values
        .into_iter()
        .map(|value| StoredRecord::from_json(kind, value))
        .collect()
}

#[async_trait]
impl RecordStore for FileStore {
    fn name(&self) -> &'static str {
        "file"
    }

    async fn list(&self, kind: RecordKind, request: PageRequest) -> Result<Page> {
        self.records.list(kind, request).await
    }

    async fn create(&self, fields: RecordFields) -> Result<StoredRecord> {
        let _guard = self.lock_writes()?;
        let record = self.records.insert(fields)?;
        if let Err(e) = self.persist(record.kind()) {
            self.records.remove(record.kind(), &record.id)?;
            return Err(e);
        }
        Ok(record)
    }

    async fn delete(&self, kind: RecordKind, id: &RecordId) -> Result<Option<StoredRecord>> {
        let _guard = self.lock_writes()?;
        let before = self.records.snapshot(kind)?;
        let removed = self.records.remove(kind, id)?;
        if removed.is_some()
            && let Err(e) = self.persist(kind)
        {
            self.records.replace(kind, before)?;
            return Err(e);
        }
        Ok(removed)
    }

    async fn get(&self, kind: RecordKind, id: &RecordId) -> Result<Option<StoredRecord>> {
        self.records.get(kind, id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::MoveCategory;
    use tempfile::TempDir;

    fn category(key: &str) -> RecordFields {
        RecordFields::MoveCategory(MoveCategory {
            move_category_id: key.to_string(),
            move_category: format!("{key} label"),
        })
    }

    #[tokio::test]
    async fn test_records_survive_reopen() {
        let dir = TempDir::new().unwrap();
        let created = {
            let store = FileStore::open(dir.path()).unwrap();
            let a = store.create(category("normal")).await.unwrap();
            store.create(category("special")).await.unwrap();
            a
        };

        let reopened = FileStore::open(dir.path()).unwrap();
        let page = reopened
            .list(RecordKind::MoveCategory, PageRequest::first(10))
            .await
            .unwrap();
        assert_eq!(page.items.len(), 2);
        assert_eq!(page.items[0], created);
        assert!(dir.path().join("move_category.json").exists());
    }

    #[tokio::test]
    async fn test_delete_persists() {
        let dir = TempDir::new().unwrap();
        let store = FileStore::open(dir.path()).unwrap();
        let created = store.create(category("throw")).await.unwrap();
        store
            .delete(RecordKind::MoveCategory, &created.id)
            .await
            .unwrap();

        let reopened = FileStore::open(dir.path()).unwrap();
        assert!(
            reopened
                .get(RecordKind::MoveCategory, &created.id)
                .await
                .unwrap()
                .is_none()
        );
    }

    fn open_in_subdir(dir: &TempDir) -> FileStore {
        FileStore::open(&dir.path().join("data")).unwrap()
    }

    /// Swaps the data directory for a plain file so snapshot writes fail.
    fn break_data_dir(dir: &TempDir) {
        let data_dir = dir.path().join("data");
        fs::remove_dir_all(&data_dir).unwrap();
        fs::write(&data_dir, "not a directory").unwrap();
    }

    #[tokio::test]
    async fn test_failed_create_leaves_no_record() {
        let dir = TempDir::new().unwrap();
        let store = open_in_subdir(&dir);
        break_data_dir(&dir);

        assert!(store.create(category("normal")).await.is_err());
        let page = store
            .list(RecordKind::MoveCategory, PageRequest::first(10))
            .await
            .unwrap();
        assert!(page.items.is_empty());
    }

    #[tokio::test]
    async fn test_failed_delete_keeps_record_in_place() {
        let dir = TempDir::new().unwrap();
        let store = open_in_subdir(&dir);
        let first = store.create(category("normal")).await.unwrap();
        let second = store.create(category("special")).await.unwrap();
        break_data_dir(&dir);

        assert!(store.delete(RecordKind::MoveCategory, &first.id).await.is_err());
        let page = store
            .list(RecordKind::MoveCategory, PageRequest::first(10))
            .await
            .unwrap();
        assert_eq!(page.items, vec![first, second]);
    }

    #[test]
    fn test_corrupt_snapshot_is_error() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("character.json"), "not json").unwrap();
        assert!(FileStore::open(dir.path()).is_err());
    }
}
