//! Stats command handler.

use std::process::ExitCode;

use anyhow::Context;
use framedex::config::FramedexConfig;
use framedex::io::{StatsService, StoreStats};
use framedex::store::build_store;

/// Executes the stats command.
pub async fn cmd_stats(config: &FramedexConfig) -> anyhow::Result<ExitCode> {
    let store = build_store(&config.store)?;
    let backend = store.name();
    let stats = StatsService::new(store)
        .collect(config.import.page_size)
        .await
        .context("collecting store statistics")?;

    print_stats(backend, &stats);
    Ok(ExitCode::SUCCESS)
}

fn print_stats(backend: &str, stats: &StoreStats) {
    println!("Store Statistics ({backend})");
    println!("================");
    for entry in &stats.counts {
        println!("  {:<14} {}", entry.kind.plural_type_name(), entry.count);
    }
    println!("  {:<14} {}", "Total", stats.total());
}
