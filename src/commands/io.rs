//! Import, validate and export command handlers.

use std::io::Write;
use std::path::Path;
use std::process::ExitCode;

use anyhow::Context;
use framedex::config::{FramedexConfig, StoreBackend};
use framedex::io::{
    ExportOptions, ExportService, ImportOptions, ImportProgress, ImportResult, ImportService,
    ProgressCallback,
};
use framedex::models::RecordKind;
use framedex::store::build_store;

/// Number of row errors printed after a run.
const ERROR_PREVIEW: usize = 10;

/// Executes the import command.
pub async fn cmd_import(
    config: &FramedexConfig,
    kind: RecordKind,
    file: &Path,
    replace_all: bool,
    dry_run: bool,
) -> anyhow::Result<ExitCode> {
    if config.store.backend == StoreBackend::Memory && !dry_run {
        tracing::warn!("memory backend: imported records are discarded on exit");
    }

    let store = build_store(&config.store)?;
    let service = ImportService::new(store);
    let options = ImportOptions::for_kind(kind)
        .with_settings(&config.import)
        .with_replace_all(replace_all)
        .with_dry_run(dry_run);

    let result = service
        .import_from_file(file, options, Some(progress_printer()))
        .await
        .with_context(|| format!("importing {} from {}", kind, file.display()))?;

    // Clear progress line and print final summary
    eprintln!();
    print_summary(&result, dry_run);
    Ok(ExitCode::SUCCESS)
}

/// Executes the validate command: a dry run that fails when any row fails.
pub async fn cmd_validate(
    config: &FramedexConfig,
    kind: RecordKind,
    file: &Path,
) -> anyhow::Result<ExitCode> {
    let store = build_store(&config.store)?;
    let service = ImportService::new(store);
    let options = ImportOptions::for_kind(kind)
        .with_settings(&config.import)
        .with_dry_run(true);

    let result = service
        .import_from_file(file, options, None)
        .await
        .with_context(|| format!("validating {} from {}", kind, file.display()))?;

    print_summary(&result, true);
    Ok(if result.error == 0 {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

/// Executes the export command.
pub async fn cmd_export(
    config: &FramedexConfig,
    kind: RecordKind,
    file: &Path,
) -> anyhow::Result<ExitCode> {
    let store = build_store(&config.store)?;
    let service = ExportService::new(store);
    let options = ExportOptions::for_kind(kind).with_page_size(config.import.page_size);

    let result = service
        .export_to_file(file, options)
        .await
        .with_context(|| format!("exporting {} to {}", kind, file.display()))?;

    println!("Export completed:");
    println!("  Exported: {}", result.exported);
    if result.dangling_references > 0 {
        println!(
            "  Dangling references: {} (written as raw ids)",
            result.dangling_references
        );
    }
    if let Some(path) = result.output_path {
        println!("  Output:   {path}");
    }
    Ok(ExitCode::SUCCESS)
}

/// Progress callback that rewrites one stderr line.
fn progress_printer() -> ProgressCallback {
    Box::new(|progress: &ImportProgress| {
        eprint!("\r\x1b[2K[{:>3}%] {}", progress.percent, progress.message);
        let _ = std::io::stderr().flush();
    })
}

fn print_summary(result: &ImportResult, dry_run: bool) {
    if dry_run {
        println!("Dry run completed (no changes made):");
    } else {
        println!("Import completed:");
    }

    println!("  Success: {}", result.success);
    println!("  Skipped: {}", result.skipped);
    println!("  Errors:  {}", result.error);
    println!("  Total:   {}", result.total);
    if result.deleted > 0 || result.delete_failed > 0 {
        println!("  Deleted: {}", result.deleted);
        println!("  Delete failures: {}", result.delete_failed);
    }

    if !result.errors.is_empty() {
        println!();
        println!("Errors ({}):", result.errors.len());
        for error in result.preview_errors(ERROR_PREVIEW) {
            println!("  - {error}");
        }
        let hidden = result.hidden_errors(ERROR_PREVIEW);
        if hidden > 0 {
            println!("  ... and {hidden} more");
        }
    }

    if !result.delete_errors.is_empty() {
        println!();
        println!("Delete failures ({}):", result.delete_errors.len());
        for error in result.delete_errors.iter().take(ERROR_PREVIEW) {
            println!("  - {error}");
        }
    }
}
