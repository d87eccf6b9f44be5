//! CSV format adapter for import/export.
//!
//! Headers are mapped to canonical columns through the kind's descriptor, so
//! both canonical names and their aliases are accepted in any case and order.

use crate::io::traits::{ExportRow, ExportSink, ImportRow, ImportSource};
use crate::models::KindDescriptor;
use crate::{Error, Result};
use std::io::{Read, Write};

/// CSV import source.
///
/// The first row is the header row. Rows may be shorter or longer than the
/// header; missing cells read as blank and extra cells are ignored. Blank
/// lines are skipped.
pub struct CsvImportSource<R: Read> {
    reader: csv::Reader<R>,
    column_map: ColumnMap,
}

/// Maps CSV column indices to canonical columns.
#[derive(Debug, Default)]
struct ColumnMap {
    columns: Vec<(usize, String)>,
}

impl ColumnMap {
    fn from_headers(headers: &csv::StringRecord, descriptor: &KindDescriptor) -> Self {
        let columns: Vec<(usize, String)> = headers
            .iter()
            .enumerate()
            .filter_map(|(i, header)| descriptor.canonical_column(header).map(|c| (i, c)))
            .collect();

        for required in descriptor.required {
            if !columns.iter().any(|(_, c)| c == required) {
                tracing::warn!(
                    kind = %descriptor.kind,
                    column = required,
                    "CSV has no column for required field; every row will fail validation"
                );
            }
        }

        Self { columns }
    }

    fn row(&self, record: &csv::StringRecord) -> ImportRow {
        let mut row = ImportRow::new();
        for (i, column) in &self.columns {
            row.insert(column.clone(), record.get(*i).unwrap_or_default());
        }
        row
    }
}

impl<R: Read> CsvImportSource<R> {
    /// Creates a new CSV import source for a record kind.
    ///
    /// # Errors
    ///
    /// Returns an error if the header row cannot be read.
    pub fn new(reader: R, descriptor: &KindDescriptor) -> Result<Self> {
        let mut csv_reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .trim(csv::Trim::All)
            .from_reader(reader);

        let headers = csv_reader
            .headers()
            .map_err(|e| Error::operation("read_csv_headers", e))?
            .clone();
        let column_map = ColumnMap::from_headers(&headers, descriptor);

        Ok(Self {
            reader: csv_reader,
            column_map,
        })
    }
}

impl<R: Read> ImportSource for CsvImportSource<R> {
    fn next(&mut self) -> Result<Option<ImportRow>> {
        let mut record = csv::StringRecord::new();
        loop {
            let has_record = self
                .reader
                .read_record(&mut record)
                .map_err(|e| Error::operation("read_csv", e))?;
            if !has_record {
                return Ok(None);
            }
            // A whitespace-only line parses as one empty field.
            if record.len() == 1 && record.get(0).is_some_and(str::is_empty) {
                continue;
            }
            return Ok(Some(self.column_map.row(&record)));
        }
    }
}

/// CSV export sink.
///
/// Writes the descriptor's canonical headers, then one line per row.
pub struct CsvExportSink<W: Write> {
    writer: csv::Writer<W>,
    headers: Vec<String>,
    headers_written: bool,
}

impl<W: Write> CsvExportSink<W> {
    /// Creates a new CSV export sink for a record kind.
    #[must_use]
    pub fn new(writer: W, descriptor: &KindDescriptor) -> Self {
        Self {
            writer: csv::WriterBuilder::new()
                .has_headers(false)
                .from_writer(writer),
            headers: descriptor.headers(),
            headers_written: false,
        }
    }

    fn ensure_headers(&mut self) -> Result<()> {
        if !self.headers_written {
            self.writer
                .write_record(&self.headers)
                .map_err(|e| Error::operation("write_csv_headers", e))?;
            self.headers_written = true;
        }
        Ok(())
    }
}

impl<W: Write> ExportSink for CsvExportSink<W> {
    fn write(&mut self, row: &ExportRow) -> Result<()> {
        self.ensure_headers()?;
        self.writer
            .write_record(self.headers.iter().map(|h| row.get(h)))
            .map_err(|e| Error::operation("write_csv", e))
    }

    fn finalize(mut self: Box<Self>) -> Result<()> {
        // An empty export still gets a header row.
        self.ensure_headers()?;
        self.writer
            .flush()
            .map_err(|e| Error::operation("flush_csv", e))
    }
}
