//! Import and export service implementations.
//!
//! Orchestrates CSV parsing, reconciliation, validation, and store calls.

pub mod export;
pub mod import;
pub mod stats;

pub use export::{ExportOptions, ExportResult, ExportService};
pub use import::{ImportOptions, ImportProgress, ImportResult, ImportService, ProgressCallback};
pub use stats::{KindCount, StatsService, StoreStats};
