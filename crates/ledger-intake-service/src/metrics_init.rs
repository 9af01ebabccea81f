//! Prometheus metrics registry setup (§4.11, §6 "Counters (names are
//! contract)"). Installed once at process start; the resulting handle is
//! the only thing `/metrics` needs to render the current snapshot.

use std::sync::OnceLock;

use anyhow::{Context, Result};
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder, PrometheusHandle};

/// Histogram buckets (milliseconds) for `payments_request_latency_ms`,
/// per §6.
const REQUEST_LATENCY_BUCKETS: &[f64] = &[
    5.0, 10.0, 25.0, 50.0, 100.0, 250.0, 500.0, 1000.0, 2000.0,
];

static HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

/// Install the global Prometheus recorder, or return the already-installed
/// handle. The recorder can only be installed once per process — tests that
/// build multiple `AppState`s in the same binary all share one handle.
pub fn install() -> Result<PrometheusHandle> {
    if let Some(handle) = HANDLE.get() {
        return Ok(handle.clone());
    }

    let handle = PrometheusBuilder::new()
        .set_buckets_for_metric(
            Matcher::Full("payments_request_latency_ms".to_string()),
            REQUEST_LATENCY_BUCKETS,
        )
        .context("invalid histogram buckets")?
        .install_recorder()
        .context("failed to install Prometheus recorder")?;

    Ok(HANDLE.get_or_init(|| handle).clone())
}
