//! Prometheus metrics registry setup for the worker (§4.11, §6
//! `LEDGER_WORKER_METRICS_PORT`).
//!
//! Unlike the intake service (which serves `/metrics` as one more route on
//! its own router), the worker has no HTTP router of its own — its whole
//! job is the outbox loop — so it asks the exporter to run its own tiny
//! HTTP listener directly.

use std::net::SocketAddr;

use anyhow::{Context, Result};
use metrics_exporter_prometheus::PrometheusBuilder;

pub fn install(port: u16) -> Result<()> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
        .context("failed to install Prometheus exporter with HTTP listener")?;
    Ok(())
}
