//! Record export service.
//!
//! Writes a whole collection as CSV using the canonical headers, so an export
//! can be re-imported unchanged. Foreign keys stored by internal identifier
//! are written back as the target's natural key.

use crate::io::formats::{create_export_sink, ensure_csv_path};
use crate::io::traits::{ExportRow, ExportSink};
use crate::models::{RecordId, RecordKind, Resolution, StoredRecord};
use crate::store::{DEFAULT_PAGE_SIZE, RecordStore, fetch_all};
use crate::{Error, Result};
use serde_json::Value;
use std::collections::HashMap;
use std::io::Write;
use std::path::Path;
use std::sync::Arc;

/// Options for one export.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExportOptions {
    /// Record kind to export.
    pub kind: RecordKind,
    /// Page size for collection fetches.
    pub page_size: usize,
}

impl ExportOptions {
    /// Creates default options for a kind.
    #[must_use]
    pub const fn for_kind(kind: RecordKind) -> Self {
        Self {
            kind,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }

    /// Sets the fetch page size.
    #[must_use]
    pub const fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size;
        self
    }
}

/// Result of an export operation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExportResult {
    /// Rows written.
    pub exported: usize,
    /// Foreign keys whose target no longer exists; written as the raw identifier.
    pub dangling_references: usize,
    /// Output path (if file export).
    pub output_path: Option<String>,
}

/// Internal identifier to natural key, per referenced kind.
type KeyLookup = HashMap<RecordKind, HashMap<RecordId, String>>;

/// Service for exporting records to CSV.
pub struct ExportService {
    store: Arc<dyn RecordStore>,
}

impl ExportService {
    /// Creates a new export service.
    #[must_use]
    pub fn new(store: Arc<dyn RecordStore>) -> Self {
        Self { store }
    }

    /// Exports a collection to a CSV file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written or a fetch fails.
    pub async fn export_to_file(&self, path: &Path, options: ExportOptions) -> Result<ExportResult> {
        ensure_csv_path(path)?;
        let file = std::fs::File::create(path).map_err(|e| Error::OperationFailed {
            operation: "create_export_file".to_string(),
            cause: format!("{}: {e}", path.display()),
        })?;

        let mut result = self
            .export_to_writer(std::io::BufWriter::new(file), options)
            .await?;
        result.output_path = Some(path.display().to_string());
        Ok(result)
    }

    /// Exports a collection to a writer.
    ///
    /// # Errors
    ///
    /// Returns an error if a fetch or write fails.
    #[tracing::instrument(skip(self, writer), fields(kind = %options.kind))]
    pub async fn export_to_writer<W: Write + 'static>(
        &self,
        writer: W,
        options: ExportOptions,
    ) -> Result<ExportResult> {
        let records = fetch_all(self.store.as_ref(), options.kind, options.page_size, None).await?;

        let mut lookup = KeyLookup::new();
        for reference in options.kind.descriptor().references {
            if reference.resolution != Resolution::InternalId
                || lookup.contains_key(&reference.target)
            {
                continue;
            }
            let targets =
                fetch_all(self.store.as_ref(), reference.target, options.page_size, None).await?;
            lookup.insert(
                reference.target,
                targets
                    .into_iter()
                    .filter_map(|r| r.natural_key().map(ToString::to_string).map(|k| (r.id, k)))
                    .collect(),
            );
        }

        let mut sink = create_export_sink(writer, options.kind);
        let result = export_records(&records, &lookup, sink.as_mut())?;
        sink.finalize()?;

        tracing::info!(exported = result.exported, "export finished");
        Ok(result)
    }
}

/// Writes records to a sink in the given order.
fn export_records(
    records: &[StoredRecord],
    lookup: &KeyLookup,
    sink: &mut dyn ExportSink,
) -> Result<ExportResult> {
    let mut result = ExportResult::default();
    for record in records {
        let (row, dangling) = to_export_row(record, lookup)?;
        sink.write(&row)?;
        result.exported += 1;
        result.dangling_references += dangling;
    }
    Ok(result)
}

/// Flattens one record into canonical columns.
///
/// Array fields fill `prefix_1..prefix_N`; values past the group width are
/// dropped.
fn to_export_row(record: &StoredRecord, lookup: &KeyLookup) -> Result<(ExportRow, usize)> {
    let descriptor = record.kind().descriptor();
    let object = record.fields.to_json()?;
    let mut row = ExportRow::new();
    let mut dangling = 0;

    for field in descriptor.fields {
        row.set(field.name, object.get(field.name).and_then(cell));
    }

    for group in descriptor.array_groups {
        let values = object
            .get(group.target)
            .and_then(Value::as_array)
            .map(Vec::as_slice)
            .unwrap_or_default();
        if values.len() > group.width {
            tracing::warn!(
                id = %record.id,
                field = group.target,
                count = values.len(),
                "array field wider than export columns; extra values dropped"
            );
        }
        for (slot, value) in values.iter().take(group.width).enumerate() {
            row.set(group.column(slot + 1), cell(value));
        }
    }

    for reference in descriptor.references {
        if reference.resolution != Resolution::InternalId {
            continue;
        }
        let Some(id) = object.get(reference.field).and_then(Value::as_str) else {
            continue;
        };
        let key = lookup
            .get(&reference.target)
            .and_then(|keys| keys.get(&RecordId::new(id)));
        if let Some(key) = key {
            row.set(reference.field, Some(key.clone()));
        } else {
            tracing::warn!(id = %record.id, field = reference.field, target = id, "dangling reference");
            dangling += 1;
        }
    }

    Ok((row, dangling))
}

fn cell(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::formats::csv::CsvExportSink;
    use crate::models::{Move, MoveCategory, RecordFields};
    use crate::store::MemoryStore;

    fn jab(category_id: Option<&str>, effects: Option<Vec<&str>>) -> StoredRecord {
        StoredRecord::new(
            RecordId::new("m-1"),
            RecordFields::Move(Move {
                move_id: "m1".to_string(),
                move_num: Some(3),
                character_id: "ryu".to_string(),
                move_category_id: category_id.map(ToString::to_string),
                move_name: "Jab".to_string(),
                effects: effects.map(|e| e.into_iter().map(ToString::to_string).collect()),
                ..Move::default()
            }),
        )
    }

    fn lookup() -> KeyLookup {
        let mut lookup = KeyLookup::new();
        lookup.insert(
            RecordKind::MoveCategory,
            [(RecordId::new("cat-1"), "normal".to_string())]
                .into_iter()
                .collect(),
        );
        lookup
    }

    #[test]
    fn test_move_row_translates_category() {
        let (row, dangling) = to_export_row(&jab(Some("cat-1"), Some(vec!["a", "b"])), &lookup())
            .unwrap();
        assert_eq!(dangling, 0);
        assert_eq!(row.get("move_category_id"), "normal");
        assert_eq!(row.get("move_num"), "3");
        assert_eq!(row.get("effect_id_1"), "a");
        assert_eq!(row.get("effect_id_2"), "b");
        assert_eq!(row.get("effect_id_3"), "");
        assert_eq!(row.get("startup_frame"), "");
    }

    #[test]
    fn test_dangling_category_keeps_raw_id() {
        let (row, dangling) = to_export_row(&jab(Some("gone"), None), &lookup()).unwrap();
        assert_eq!(dangling, 1);
        assert_eq!(row.get("move_category_id"), "gone");
    }

    #[test]
    fn test_wide_arrays_are_truncated() {
        let effects = vec!["1", "2", "3", "4", "5", "6"];
        let (row, _) = to_export_row(&jab(Some("cat-1"), Some(effects)), &lookup()).unwrap();
        assert_eq!(row.get("effect_id_5"), "5");
        assert_eq!(row.get("effect_id_6"), "");
    }

    #[test]
    fn test_export_records_to_csv() {
        let mut output = Vec::new();
        {
            let mut sink = CsvExportSink::new(&mut output, RecordKind::Move.descriptor());
            let result = export_records(&[jab(Some("cat-1"), None)], &lookup(), &mut sink).unwrap();
            assert_eq!(result.exported, 1);
            Box::new(sink).finalize().unwrap();
        }
        let output = String::from_utf8(output).unwrap();
        let mut lines = output.lines();
        assert!(lines.next().unwrap().starts_with("move_id,move_num,character_id"));
        assert!(lines.next().unwrap().starts_with("m1,3,ryu,normal,Jab,"));
    }

    #[tokio::test]
    async fn test_export_from_store() {
        let store = Arc::new(MemoryStore::new());
        store
            .create(RecordFields::MoveCategory(MoveCategory {
                move_category_id: "special".to_string(),
                move_category: "Special".to_string(),
            }))
            .await
            .unwrap();

        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("categories.csv");
        let result = ExportService::new(store)
            .export_to_file(&path, ExportOptions::for_kind(RecordKind::MoveCategory))
            .await
            .unwrap();

        assert_eq!(result.exported, 1);
        assert_eq!(
            std::fs::read_to_string(&path).unwrap(),
            "move_category_id,move_category\nspecial,Special\n"
        );
    }
}
