//! Record import service.
//!
//! One run imports a single CSV file into a single record kind:
//!
//! 1. fetch the kind's collection and every referenced collection;
//! 2. replace-all: delete the existing collection in concurrent batches,
//!    otherwise index existing natural keys;
//! 3. process rows in file order: validate, resolve references, skip
//!    duplicates, create.
//!
//! Failures in steps 1 and 2 abort the run. Row failures never do.

use crate::config::{DEFAULT_DELETE_BATCH_SIZE, ImportSettings};
use crate::io::formats::{create_import_source, ensure_csv_path};
use crate::io::reconcile::{NaturalKeyIndex, ReferenceIndex, batch_delete};
use crate::io::traits::ImportRow;
use crate::io::validation::{RowError, RowValidator};
use crate::models::RecordKind;
use crate::observability::metrics::{self, RowOutcome};
use crate::store::{DEFAULT_PAGE_SIZE, FetchProgress, RecordStore, fetch_all};
use crate::{Error, Result};
use std::io::Read;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Mutex;

/// Options for one import run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImportOptions {
    /// Record kind the rows belong to.
    pub kind: RecordKind,
    /// Delete the existing collection before importing.
    pub replace_all: bool,
    /// Validate without mutating the store.
    pub dry_run: bool,
    /// Page size for collection fetches.
    pub page_size: usize,
    /// Concurrent deletes per batch.
    pub delete_batch_size: usize,
}

impl ImportOptions {
    /// Creates default options for a kind: skip duplicates, real run.
    #[must_use]
    pub const fn for_kind(kind: RecordKind) -> Self {
        Self {
            kind,
            replace_all: false,
            dry_run: false,
            page_size: DEFAULT_PAGE_SIZE,
            delete_batch_size: DEFAULT_DELETE_BATCH_SIZE,
        }
    }

    /// Enables or disables replace-all mode.
    #[must_use]
    pub const fn with_replace_all(mut self, replace_all: bool) -> Self {
        self.replace_all = replace_all;
        self
    }

    /// Enables or disables dry run mode.
    #[must_use]
    pub const fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// Sets the fetch page size.
    #[must_use]
    pub const fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size;
        self
    }

    /// Sets the delete batch size.
    #[must_use]
    pub const fn with_delete_batch_size(mut self, size: usize) -> Self {
        self.delete_batch_size = size;
        self
    }

    /// Applies page and batch sizes from configuration.
    #[must_use]
    pub const fn with_settings(mut self, settings: &ImportSettings) -> Self {
        self.page_size = settings.page_size;
        self.delete_batch_size = settings.delete_batch_size;
        self
    }

    /// Whether this run deletes the existing collection.
    const fn deletes_existing(&self) -> bool {
        self.replace_all && !self.dry_run
    }
}

/// Progress callback for import operations.
pub type ProgressCallback = Box<dyn Fn(&ImportProgress) + Send + Sync>;

/// Progress notification during import.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportProgress {
    /// Human-readable phase description.
    pub message: String,
    /// Overall completion, 0 to 100.
    pub percent: u8,
}

/// Result of an import run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImportResult {
    /// Rows created (or that would have been, in a dry run).
    pub success: usize,
    /// Rows skipped because their natural key already existed.
    pub skipped: usize,
    /// Rows that failed.
    pub error: usize,
    /// Data rows in the input.
    pub total: usize,
    /// One `"row N: <message>"` entry per failed row, in row order.
    pub errors: Vec<String>,
    /// Existing records deleted by replace-all.
    pub deleted: usize,
    /// Existing records replace-all failed to delete.
    pub delete_failed: usize,
    /// One entry per failed delete.
    pub delete_errors: Vec<String>,
}

impl ImportResult {
    /// Returns the first `limit` row errors.
    #[must_use]
    pub fn preview_errors(&self, limit: usize) -> &[String] {
        &self.errors[..self.errors.len().min(limit)]
    }

    /// Returns how many row errors a preview of `limit` leaves out.
    #[must_use]
    pub const fn hidden_errors(&self, limit: usize) -> usize {
        self.errors.len().saturating_sub(limit)
    }

    /// Returns whether any row or delete failed.
    #[must_use]
    pub const fn has_errors(&self) -> bool {
        self.error > 0 || self.delete_failed > 0
    }
}

/// Service for importing records from CSV.
pub struct ImportService {
    store: Arc<dyn RecordStore>,
    /// Serializes runs issued through this service.
    run_lock: Mutex<()>,
}

impl ImportService {
    /// Creates a new import service.
    #[must_use]
    pub fn new(store: Arc<dyn RecordStore>) -> Self {
        Self {
            store,
            run_lock: Mutex::new(()),
        }
    }

    /// Imports records from a CSV file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed, is empty, or
    /// the fetch or delete phase fails.
    pub async fn import_from_file(
        &self,
        path: &Path,
        options: ImportOptions,
        progress: Option<ProgressCallback>,
    ) -> Result<ImportResult> {
        ensure_csv_path(path)?;
        let file = std::fs::File::open(path).map_err(|e| Error::OperationFailed {
            operation: "open_import_file".to_string(),
            cause: format!("{}: {e}", path.display()),
        })?;
        self.import_from_reader(std::io::BufReader::new(file), options, progress)
            .await
    }

    /// Imports records from a CSV reader.
    ///
    /// # Errors
    ///
    /// Returns an error if parsing fails, the input is empty, or the fetch or
    /// delete phase fails.
    pub async fn import_from_reader<R: Read + 'static>(
        &self,
        reader: R,
        options: ImportOptions,
        progress: Option<ProgressCallback>,
    ) -> Result<ImportResult> {
        let rows = create_import_source(reader, options.kind)?.read_all()?;
        self.import_rows(rows, options, progress).await
    }

    /// Imports already-parsed rows.
    ///
    /// # Errors
    ///
    /// Returns an error if `rows` is empty or the fetch or delete phase fails.
    #[tracing::instrument(
        skip_all,
        fields(
            kind = %options.kind,
            rows = rows.len(),
            replace_all = options.replace_all,
            dry_run = options.dry_run
        )
    )]
    pub async fn import_rows(
        &self,
        rows: Vec<ImportRow>,
        options: ImportOptions,
        progress: Option<ProgressCallback>,
    ) -> Result<ImportResult> {
        if rows.is_empty() {
            return Err(Error::InvalidInput("CSV data is empty".to_string()));
        }

        let _run = self.run_lock.lock().await;
        let started = Instant::now();
        let kind = options.kind;
        let emit = |message: String, percent: u8| {
            if let Some(cb) = progress.as_ref() {
                cb(&ImportProgress { message, percent });
            }
        };
        let on_fetch = |p: &FetchProgress| {
            emit(
                format!("Fetching existing {} (page {})...", p.kind, p.page),
                0,
            );
        };

        let existing = fetch_all(
            self.store.as_ref(),
            kind,
            options.page_size,
            Some(&on_fetch),
        )
        .await?;

        let mut validator = RowValidator::new(kind);
        for target in validator.referenced_kinds() {
            let records = fetch_all(
                self.store.as_ref(),
                target,
                options.page_size,
                Some(&on_fetch),
            )
            .await?;
            validator = validator.with_reference(target, ReferenceIndex::from_records(&records));
        }

        let mut result = ImportResult {
            total: rows.len(),
            ..ImportResult::default()
        };

        if options.deletes_existing() && !existing.is_empty() {
            let report = batch_delete(
                self.store.as_ref(),
                kind,
                &existing,
                options.delete_batch_size,
                |done, total| {
                    emit(
                        format!("Deleting existing records... {done}/{total}"),
                        scaled_percent(done, total, 50),
                    );
                },
            )
            .await;
            result.deleted = report.deleted;
            result.delete_failed = report.failed;
            result.delete_errors = report.errors;
        }

        // Replace-all never skips: the real run starts from an empty collection.
        let duplicates = if options.replace_all {
            NaturalKeyIndex::default()
        } else {
            NaturalKeyIndex::from_records(&existing)
        };

        let (offset, scale) = if options.deletes_existing() {
            (50, 50)
        } else {
            (0, 100)
        };
        let prefix = if options.dry_run { "[dry run] " } else { "" };
        let total = rows.len();

        for (i, row) in rows.iter().enumerate() {
            let row_number = i + 2;
            emit(
                format!("{prefix}Importing... {}/{total}", i + 1),
                offset + scaled_percent(i + 1, total, scale),
            );

            match self
                .import_row(&validator, &duplicates, row, &options)
                .await
            {
                Ok(RowOutcome::Skipped) => {
                    result.skipped += 1;
                    metrics::record_row(kind, RowOutcome::Skipped);
                },
                Ok(outcome) => {
                    result.success += 1;
                    metrics::record_row(kind, outcome);
                },
                Err(e) => {
                    tracing::debug!(row = row_number, error = %e, "row rejected");
                    result.error += 1;
                    result.errors.push(format!("row {row_number}: {e}"));
                    metrics::record_row(kind, RowOutcome::Error);
                },
            }
        }

        metrics::record_run_duration(kind, started.elapsed().as_secs_f64());
        tracing::info!(
            success = result.success,
            skipped = result.skipped,
            error = result.error,
            deleted = result.deleted,
            delete_failed = result.delete_failed,
            "import finished"
        );
        Ok(result)
    }

    async fn import_row(
        &self,
        validator: &RowValidator,
        duplicates: &NaturalKeyIndex,
        row: &ImportRow,
        options: &ImportOptions,
    ) -> std::result::Result<RowOutcome, RowError> {
        let fields = validator.validate(row)?;

        if !options.replace_all && fields.natural_key().is_some_and(|k| duplicates.contains(k)) {
            return Ok(RowOutcome::Skipped);
        }

        if !options.dry_run {
            self.store
                .create(fields)
                .await
                .map_err(|e| RowError::Store(e.to_string()))?;
        }
        Ok(RowOutcome::Success)
    }
}

/// `round(done / total * scale)`, rounding halves up.
fn scaled_percent(done: usize, total: usize, scale: u8) -> u8 {
    if total == 0 {
        return scale;
    }
    let scale = usize::from(scale);
    let value = (done * scale * 2 + total) / (2 * total);
    u8::try_from(value.min(scale)).unwrap_or(u8::MAX)
}
