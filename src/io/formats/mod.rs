//! Format adapters for import/export.
//!
//! Each format implements [`ImportSource`] and/or [`ExportSink`]. CSV is the
//! only interchange format for record kinds.

pub mod csv;

use super::traits::{ExportSink, ImportSource};
use crate::models::RecordKind;
use crate::{Error, Result};
use std::io::{Read, Write};
use std::path::Path;

/// Checks that a path looks like a CSV file.
///
/// # Errors
///
/// Returns an error if the extension is missing or not `.csv`.
pub fn ensure_csv_path(path: &Path) -> Result<()> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_lowercase);

    match ext.as_deref() {
        Some("csv") => Ok(()),
        Some(ext) => Err(Error::InvalidInput(format!(
            "Unsupported file extension: .{ext} (expected .csv)"
        ))),
        None => Err(Error::InvalidInput(
            "Cannot determine format: file has no extension".to_string(),
        )),
    }
}

/// Creates an import source for a record kind.
///
/// # Errors
///
/// Returns an error if the header row cannot be read.
pub fn create_import_source<R: Read + 'static>(
    reader: R,
    kind: RecordKind,
) -> Result<Box<dyn ImportSource>> {
    Ok(Box::new(csv::CsvImportSource::new(
        reader,
        kind.descriptor(),
    )?))
}

/// Creates an export sink for a record kind.
#[must_use]
pub fn create_export_sink<W: Write + 'static>(writer: W, kind: RecordKind) -> Box<dyn ExportSink> {
    Box::new(csv::CsvExportSink::new(writer, kind.descriptor()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ensure_csv_path() {
        assert!(ensure_csv_path(Path::new("moves.csv")).is_ok());
        assert!(ensure_csv_path(Path::new("MOVES.CSV")).is_ok());
        assert!(ensure_csv_path(Path::new("moves.json")).is_err());
        assert!(ensure_csv_path(Path::new("moves")).is_err());
    }
}
