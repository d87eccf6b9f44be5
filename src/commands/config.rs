//! Config command handler.

use framedex::config::FramedexConfig;

/// Config command.
pub fn cmd_config(config: &FramedexConfig, show: bool) {
    if !show {
        println!("Use --show to print the effective configuration.");
        return;
    }

    println!("Current Configuration");
    println!("=====================");
    println!();

    println!("Store:");
    println!("  Backend: {}", config.store.backend.as_str());
    println!(
        "  Endpoint: {}",
        config.store.endpoint.as_deref().unwrap_or("(not set)")
    );
    println!(
        "  API Key: {}",
        if config.store.api_key.is_some() {
            "(set)"
        } else {
            "(not set)"
        }
    );
    println!("  Timeout: {}s", config.store.timeout_secs);
    println!("  Data Directory: {}", config.store.data_dir.display());
    println!();

    println!("Import:");
    println!("  Page Size: {}", config.import.page_size);
    println!("  Delete Batch Size: {}", config.import.delete_batch_size);
    println!();

    println!("Logging:");
    println!("  Format: {:?}", config.logging.format);
    println!(
        "  File: {}",
        config
            .logging
            .file
            .as_ref()
            .map_or_else(|| "(stderr)".to_string(), |p| p.display().to_string())
    );
    println!(
        "  Level: {}",
        config.logging.level.as_deref().unwrap_or("(default)")
    );
    println!();

    println!("Metrics:");
    println!("  Enabled: {}", config.metrics.enabled);
    println!("  Port: {}", config.metrics.port);
}
