//! Import/Export I/O subsystem.
//!
//! Bulk CSV import with store reconciliation, and CSV export of whole
//! collections.
//!
//! # Architecture
//!
//! - **Format adapters** implement [`ImportSource`] and [`ExportSink`]
//! - **Validation** coerces rows and resolves foreign keys ([`RowValidator`])
//! - **Reconciliation** deletes or indexes the existing collection
//!   ([`batch_delete`], [`NaturalKeyIndex`], [`ReferenceIndex`])
//! - **Services** orchestrate fetch, reconcile, and row import, and count
//!   collections for `stats`
//!
//! # Examples
//!
//! ## Replace every move from a CSV file
//!
//! ```rust,ignore
//! use framedex::io::{ImportOptions, ImportService};
//! use framedex::models::RecordKind;
//!
//! let result = service
//!     .import_from_file(
//!         "moves.csv".as_ref(),
//!         ImportOptions::for_kind(RecordKind::Move).with_replace_all(true),
//!         None,
//!     )
//!     .await?;
//! println!("deleted {}, imported {}", result.deleted, result.success);
//! ```
//!
//! ## Export characters
//!
//! ```rust,ignore
//! use framedex::io::{ExportOptions, ExportService};
//! use framedex::models::RecordKind;
//!
//! let result = service
//!     .export_to_file("characters.csv".as_ref(), ExportOptions::for_kind(RecordKind::Character))
//!     .await?;
//! println!("exported {}", result.exported);
//! ```

pub mod formats;
pub mod reconcile;
pub mod services;
pub mod traits;
pub mod validation;

pub use reconcile::{DeleteReport, NaturalKeyIndex, ReferenceIndex, batch_delete};
pub use services::export::{ExportOptions, ExportResult, ExportService};
pub use services::import::{
    ImportOptions, ImportProgress, ImportResult, ImportService, ProgressCallback,
};
pub use services::stats::{KindCount, StatsService, StoreStats};
pub use traits::{ExportRow, ExportSink, ImportRow, ImportSource};
pub use validation::{RowError, RowValidator};
