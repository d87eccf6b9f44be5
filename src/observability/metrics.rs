//! Prometheus metrics.
//!
//! | Metric | Labels |
//! |--------|--------|
//! | `framedex_import_rows_total` | `kind`, `outcome` (`success`, `skipped`, `error`) |
//! | `framedex_delete_total` | `kind`, `outcome` (`deleted`, `failed`) |
//! | `framedex_store_pages_total` | `kind` |
//! | `framedex_import_duration_seconds` | `kind` |
//!
//! Recording is a no-op until a recorder is installed.

use crate::config::MetricsSettings;
use crate::models::RecordKind;
use crate::{Error, Result};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::thread;

/// Outcome label for an imported row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowOutcome {
    /// Row was created (or would have been, in a dry run).
    Success,
    /// Row duplicated an existing natural key.
    Skipped,
    /// Row failed validation, reference resolution, or creation.
    Error,
}

impl RowOutcome {
    const fn as_str(self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Skipped => "skipped",
            Self::Error => "error",
        }
    }
}

/// Installs the Prometheus recorder and HTTP listener if enabled.
///
/// # Errors
///
/// Returns an error if the exporter cannot be built or a recorder is
/// already installed.
pub fn install_prometheus(settings: &MetricsSettings) -> Result<Option<PrometheusHandle>> {
    if !settings.enabled {
        return Ok(None);
    }

    let listen_addr = SocketAddr::new(IpAddr::V4(Ipv4Addr::UNSPECIFIED), settings.port);
    let builder = PrometheusBuilder::new().with_http_listener(listen_addr);
    install_listener(builder).map(Some)
}

fn install_listener(builder: PrometheusBuilder) -> Result<PrometheusHandle> {
    if let Ok(handle) = tokio::runtime::Handle::try_current() {
        return install_with_runtime(builder, &handle);
    }
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(|e| Error::operation("metrics_runtime_init", e))?;
    let handle = runtime.handle().clone();
    let prometheus = install_with_runtime(builder, &handle)?;
    thread::Builder::new()
        .name("framedex-metrics-http".to_string())
        .spawn(move || runtime.block_on(std::future::pending::<()>()))
        .map_err(|e| Error::operation("metrics_runtime_thread", e))?;
    Ok(prometheus)
}

fn install_with_runtime(
    builder: PrometheusBuilder,
    runtime_handle: &tokio::runtime::Handle,
) -> Result<PrometheusHandle> {
    let (recorder, exporter) = {
        let _guard = runtime_handle.enter();
        builder
            .build()
            .map_err(|e| Error::operation("metrics_exporter_build", e))?
    };
    let handle = recorder.handle();
    metrics::set_global_recorder(recorder)
        .map_err(|e| Error::operation("metrics_recorder_install", e))?;
    runtime_handle.spawn(exporter);
    Ok(handle)
}

/// Counts one fetched page.
pub fn record_page(kind: RecordKind) {
    metrics::counter!("framedex_store_pages_total", "kind" => kind.as_str()).increment(1);
}

/// Counts one processed row.
pub fn record_row(kind: RecordKind, outcome: RowOutcome) {
    metrics::counter!(
        "framedex_import_rows_total",
        "kind" => kind.as_str(),
        "outcome" => outcome.as_str()
    )
    .increment(1);
}

/// Counts one attempted delete.
pub fn record_delete(kind: RecordKind, deleted: bool) {
    let outcome = if deleted { "deleted" } else { "failed" };
    metrics::counter!("framedex_delete_total", "kind" => kind.as_str(), "outcome" => outcome)
        .increment(1);
}

/// Records the wall-clock duration of one import run.
pub fn record_run_duration(kind: RecordKind, seconds: f64) {
    metrics::histogram!("framedex_import_duration_seconds", "kind" => kind.as_str())
        .record(seconds);
}
