//! Reconciliation against the pre-run snapshot.
//!
//! Two strategies decide what happens to records that already exist:
//!
//! | Mode | Existing records | Duplicate rows |
//! |------|------------------|----------------|
//! | replace-all | deleted by [`batch_delete`] before import | cannot occur |
//! | skip (default) | kept | skipped via [`NaturalKeyIndex`] |
//!
//! Foreign keys resolve through [`ReferenceIndex`], built from the snapshot of
//! the target kind.

use crate::models::{RecordId, RecordKind, StoredRecord};
use crate::observability::metrics;
use crate::store::RecordStore;
use futures::future::join_all;
use std::collections::{HashMap, HashSet};

/// Outcome of a replace-all deletion pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeleteReport {
    /// Deletes issued.
    pub attempted: usize,
    /// Deletes that succeeded.
    pub deleted: usize,
    /// Deletes that failed.
    pub failed: usize,
    /// One message per failed delete, in record order.
    pub errors: Vec<String>,
}

/// Deletes `records` in contiguous chunks of `batch_size`.
///
/// Deletes within a chunk run concurrently; a chunk starts only after the
/// previous one has fully settled. A failed delete is logged and counted but
/// never aborts the pass. `on_progress(processed, total)` fires once per chunk,
/// counting failed deletes as processed.
#[tracing::instrument(skip(store, records, on_progress), fields(total = records.len()))]
pub async fn batch_delete(
    store: &dyn RecordStore,
    kind: RecordKind,
    records: &[StoredRecord],
    batch_size: usize,
    mut on_progress: impl FnMut(usize, usize),
) -> DeleteReport {
    let total = records.len();
    let mut report = DeleteReport::default();

    for chunk in records.chunks(batch_size.max(1)) {
        let outcomes = join_all(chunk.iter().map(|record| store.delete(kind, &record.id))).await;

        for (record, outcome) in chunk.iter().zip(outcomes) {
            report.attempted += 1;
            match outcome {
                Ok(_) => {
                    report.deleted += 1;
                    metrics::record_delete(kind, true);
                },
                Err(e) => {
                    tracing::warn!(id = %record.id, error = %e, "delete failed");
                    report.failed += 1;
                    report.errors.push(format!("{}: {e}", record.id));
                    metrics::record_delete(kind, false);
                },
            }
        }
        on_progress(report.attempted, total);
    }

    tracing::info!(
        deleted = report.deleted,
        failed = report.failed,
        "replace-all deletion finished"
    );
    report
}

/// Natural keys present in a snapshot.
#[derive(Debug, Clone, Default)]
pub struct NaturalKeyIndex {
    keys: HashSet<String>,
}

impl NaturalKeyIndex {
    /// Builds the index; records without a natural key are ignored.
    #[must_use]
    pub fn from_records(records: &[StoredRecord]) -> Self {
        Self {
            keys: records
                .iter()
                .filter_map(StoredRecord::natural_key)
                .map(ToString::to_string)
                .collect(),
        }
    }

    /// Returns `true` if a record with this natural key already exists.
    #[must_use]
    pub fn contains(&self, key: &str) -> bool {
        self.keys.contains(key)
    }

    /// Number of distinct keys.
    #[must_use]
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    /// Returns `true` if the index is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}

/// Natural key to internal identifier, for one referenced kind.
///
/// When a snapshot holds several records with the same natural key, the
/// first one in server order wins.
#[derive(Debug, Clone, Default)]
pub struct ReferenceIndex {
    ids: HashMap<String, RecordId>,
}

impl ReferenceIndex {
    /// Builds the index; records without a natural key are ignored.
    #[must_use]
    pub fn from_records(records: &[StoredRecord]) -> Self {
        let mut ids = HashMap::with_capacity(records.len());
        for record in records {
            if let Some(key) = record.natural_key() {
                ids.entry(key.to_string())
                    .or_insert_with(|| record.id.clone());
            }
        }
        Self { ids }
    }

    /// Returns the internal identifier for a natural key.
    #[must_use]
    pub fn resolve(&self, key: &str) -> Option<&RecordId> {
        self.ids.get(key)
    }

    /// Number of distinct keys.
    #[must_use]
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    /// Returns `true` if the index is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{MoveCategory, RecordFields};
    use crate::store::MemoryStore;

    fn category(id: &str, key: &str) -> StoredRecord {
        StoredRecord::new(
            RecordId::new(id),
            RecordFields::MoveCategory(MoveCategory {
                move_category_id: key.to_string(),
                move_category: key.to_uppercase(),
            }),
        )
    }

    #[tokio::test]
    async fn test_batch_delete_chunks_and_progress() {
        let records: Vec<_> = (0..23)
            .map(|i| category(&format!("id-{i}"), &format!("k{i}")))
            .collect();
        let store = MemoryStore::with_records(records.clone());

        let mut progress = Vec::new();
        let report = batch_delete(&store, RecordKind::MoveCategory, &records, 10, |done, total| {
            progress.push((done, total));
        })
        .await;

        assert_eq!(progress, vec![(10, 23), (20, 23), (23, 23)]);
        assert_eq!(report.attempted, 23);
        assert_eq!(report.deleted, 23);
        assert_eq!(report.failed, 0);
        assert_eq!(store.count(RecordKind::MoveCategory).unwrap(), 0);
    }

    #[tokio::test]
    async fn test_batch_delete_zero_batch_size_is_one() {
        let records = vec![category("a", "a"), category("b", "b")];
        let store = MemoryStore::with_records(records.clone());

        let mut calls = 0;
        let report = batch_delete(&store, RecordKind::MoveCategory, &records, 0, |_, _| {
            calls += 1;
        })
        .await;

        assert_eq!(calls, 2);
        assert_eq!(report.deleted, 2);
    }

    #[tokio::test]
    async fn test_batch_delete_empty_emits_nothing() {
        let store = MemoryStore::new();
        let mut calls = 0;
        let report = batch_delete(&store, RecordKind::Move, &[], 10, |_, _| calls += 1).await;
        assert_eq!(calls, 0);
        assert_eq!(report, DeleteReport::default());
    }

    #[test]
    fn test_natural_key_index_ignores_blank_keys() {
        let index = NaturalKeyIndex::from_records(&[
            category("1", "normal"),
            category("2", ""),
            category("3", "normal"),
        ]);
        assert_eq!(index.len(), 1);
        assert!(index.contains("normal"));
        assert!(!index.contains(""));
    }

    #[test]
    fn test_reference_index_first_wins() {
        let index = ReferenceIndex::from_records(&[
            category("first", "special"),
            category("second", "special"),
        ]);
        assert_eq!(index.resolve("special"), Some(&RecordId::new("first")));
        assert_eq!(index.len(), 1);
        assert!(index.resolve("missing").is_none());
    }
}
