//! Core traits for import/export operations.
//!
//! Defines the [`ImportSource`] and [`ExportSink`] traits that format adapters
//! implement. Both speak in canonical column names (see
//! [`KindDescriptor::headers`](crate::models::KindDescriptor::headers)), so
//! header aliases never leak past the adapter.

use crate::Result;
use std::collections::HashMap;

/// One data row read from an import source.
///
/// Values are keyed by canonical column name and already trimmed. Columns
/// the kind does not know are dropped by the adapter.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImportRow {
    values: HashMap<String, String>,
}

impl ImportRow {
    /// Creates an empty row.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets a column value.
    #[must_use]
    pub fn with(mut self, column: impl Into<String>, value: impl Into<String>) -> Self {
        self.insert(column, value);
        self
    }

    /// Sets a column value in place.
    pub fn insert(&mut self, column: impl Into<String>, value: impl Into<String>) {
        self.values.insert(column.into(), value.into());
    }

    /// Returns the raw value of a column, if the column was present.
    #[must_use]
    pub fn get(&self, column: &str) -> Option<&str> {
        self.values.get(column).map(String::as_str)
    }
}

/// Source of import rows.
///
/// Implementations read rows from a specific format and yield them one at a
/// time in file order.
pub trait ImportSource {
    /// Reads the next row from the source.
    ///
    /// Returns `Ok(None)` when the source is exhausted.
    ///
    /// # Errors
    ///
    /// Returns an error if parsing fails or I/O errors occur.
    fn next(&mut self) -> Result<Option<ImportRow>>;

    /// Reads every remaining row.
    ///
    /// # Errors
    ///
    /// Returns the first parse error; no partial result is returned.
    fn read_all(&mut self) -> Result<Vec<ImportRow>> {
        let mut rows = Vec::new();
        while let Some(row) = self.next()? {
            rows.push(row);
        }
        Ok(rows)
    }
}

/// One record flattened for export, keyed by canonical column name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExportRow {
    values: HashMap<String, String>,
}

impl ExportRow {
    /// Creates an empty row.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets a column value; `None` leaves the column blank.
    pub fn set(&mut self, column: impl Into<String>, value: Option<String>) {
        if let Some(value) = value {
            self.values.insert(column.into(), value);
        }
    }

    /// Returns a column value, or the empty string when unset.
    #[must_use]
    pub fn get(&self, column: &str) -> &str {
        self.values.get(column).map_or("", String::as_str)
    }
}

/// Sink for exported rows.
///
/// # Lifecycle
///
/// 1. Create sink with output destination
/// 2. Call `write()` for each row
/// 3. Call `finalize()` to complete the export
pub trait ExportSink {
    /// Writes a single row to the sink.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or I/O fails.
    fn write(&mut self, row: &ExportRow) -> Result<()>;

    /// Finalizes the export, flushing buffers.
    ///
    /// # Errors
    ///
    /// Returns an error if I/O fails.
    fn finalize(self: Box<Self>) -> Result<()>;
}
