//! Shared runtime state for the intake service.
//!
//! `AppState` is constructed once in `main.rs` and cloned (cheaply, via
//! `Arc`/`PgPool`'s own internal `Arc`) into every Axum handler, mirroring
//! one `Clone`-able struct threaded through every handler via axum's
//! `State` extractor.

use ledger_config::Settings;
use ledger_schemas::ConsistencyMode;
use metrics_exporter_prometheus::PrometheusHandle;
use sqlx::PgPool;

#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub mode: ConsistencyMode,
    pub metrics_handle: PrometheusHandle,
}

impl AppState {
    pub fn new(pool: PgPool, settings: &Settings, metrics_handle: PrometheusHandle) -> Self {
        Self {
            pool,
            mode: settings.consistency_mode,
            metrics_handle,
        }
    }
}
