//! Settlement worker entry point (§2, §4.3, §6).
//!
//! Kept thin, following the same shape as `ledger-intake-service::main`:
//! load config, connect + migrate, install metrics, spawn the
//! reconciliation tick, then run the outbox poll loop until the process is
//! asked to stop.

use anyhow::Context;
use ledger_config::Settings;
use ledger_worker_core::FailureInjector;
use tracing::{info, warn};

const OUTBOX_BATCH_SIZE: i64 = 25;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::from_filename(".env.local");
    init_tracing();

    let settings = Settings::from_env().context("failed to load settings")?;
    let pool = ledger_db::connect(&settings.database_url).await?;
    if settings.migrate_recreate_schema {
        ledger_db::migrate(&pool).await?;
    }

    ledger_worker_service::metrics_init::install(settings.ledger_worker_metrics_port)
        .context("failed to install metrics exporter")?;

    let failure_injector = FailureInjector::new(&settings.fail_profile, settings.experiment_seed)
        .map_err(|e| anyhow::anyhow!("{e}"))
        .context("invalid FAIL_PROFILE")?;

    ledger_worker_service::reconcile_loop::spawn(
        pool.clone(),
        settings.reconciliation_interval_seconds,
    );

    info!(
        mode = ?settings.consistency_mode,
        fail_profile = %settings.fail_profile,
        "ledger-worker-service starting outbox poll loop"
    );

    let mut shutdown = std::pin::pin!(tokio::signal::ctrl_c());
    let poll_interval = std::time::Duration::from_secs_f64(settings.outbox_poll_interval_seconds);

    loop {
        tokio::select! {
            _ = &mut shutdown => {
                info!("shutdown signal received, draining current tick and exiting");
                break;
            }
            _ = tokio::time::sleep(poll_interval) => {
                match ledger_worker_service::batch::run_once(
                    &pool,
                    settings.consistency_mode,
                    &failure_injector,
                    OUTBOX_BATCH_SIZE,
                    settings.outbox_processing_timeout_seconds,
                )
                .await
                {
                    Ok(outcome) if outcome.claimed > 0 => {
                        info!(
                            claimed = outcome.claimed,
                            processed = outcome.processed,
                            retried = outcome.retried,
                            dead_lettered = outcome.dead_lettered,
                            "outbox batch drained"
                        );
                    }
                    Ok(_) => {}
                    Err(err) => {
                        warn!(%err, "outbox batch poll failed");
                    }
                }
            }
        }
    }

    Ok(())
}

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()),
        )
        .init();
}
