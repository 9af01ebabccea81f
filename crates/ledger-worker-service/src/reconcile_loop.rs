//! Background reconciliation tick (§4.6, §6 `RECONCILIATION_INTERVAL_SECONDS`).
//!
//! Spawned once at startup as a detached task ticking on a fixed interval
//! for the life of the process, logging its own failures rather than
//! propagating them to the caller.

use sqlx::PgPool;
use tokio::task::JoinHandle;
use tracing::{error, info};

pub fn spawn(pool: PgPool, interval_seconds: f64) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(std::time::Duration::from_secs_f64(interval_seconds));
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            match ledger_reconcile::reconcile_once(&pool).await {
                Ok(report) if report.is_clean() => {
                    info!(
                        imbalance = report.ledger_imbalance,
                        negative_balances = report.negative_balance_count,
                        "reconciliation pass clean"
                    );
                }
                Ok(report) => {
                    error!(
                        imbalance = report.ledger_imbalance,
                        negative_balances = report.negative_balance_count,
                        "reconciliation pass found an invariant violation"
                    );
                }
                Err(err) => {
                    error!(%err, "reconciliation pass failed to run");
                }
            }
        }
    })
}
