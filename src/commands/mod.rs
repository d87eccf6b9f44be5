//! Command handlers module.
//!
//! - `io.rs`: import, validate and export commands
//! - `config.rs`: configuration display command
//! - `stats.rs`: per-kind record counts

mod config;
mod io;
mod stats;

pub use config::cmd_config;
pub use io::{cmd_export, cmd_import, cmd_validate};
pub use stats::cmd_stats;
