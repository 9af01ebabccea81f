//! One poll tick of the settlement worker loop (§4.3, §4.4, §4.5, §5).
//!
//! Claims a batch under the outbox lease, then processes each event in its
//! own transaction. A failing event is handled by the two-phase split
//! carried over from `original_source` (§4.12): the settlement attempt and
//! the event's terminal/retry state are two separate transactions, so a
//! worker crash between them can never leave an event's status
//! inconsistent with whatever it already committed.

use chrono::{Duration as ChronoDuration, Utc};
use ledger_schemas::{ConsistencyMode, OutboxEventRow};
use ledger_worker_core::{process_event, retry_delay_seconds, FailureInjector, WorkerError};
use sqlx::PgPool;
use tracing::{info, warn};

#[derive(Debug, Clone, Copy, Default)]
pub struct BatchOutcome {
    pub claimed: usize,
    pub processed: usize,
    pub retried: usize,
    pub dead_lettered: usize,
}

/// Claim up to `batch_size` due events and drive each to a terminal
/// state for this attempt: `processed`, rescheduled (`pending` with a
/// backoff), or `dead`.
pub async fn run_once(
    pool: &PgPool,
    mode: ConsistencyMode,
    failure_injector: &FailureInjector,
    batch_size: i64,
    lease_seconds: f64,
) -> anyhow::Result<BatchOutcome> {
    let events = ledger_db::outbox::claim_batch(pool, batch_size, lease_seconds).await?;
    let mut outcome = BatchOutcome {
        claimed: events.len(),
        ..Default::default()
    };

    for event in &events {
        match process_one(pool, mode, failure_injector, event).await? {
            Disposition::Processed => outcome.processed += 1,
            Disposition::Retried => outcome.retried += 1,
            Disposition::DeadLettered => outcome.dead_lettered += 1,
        }
    }

    Ok(outcome)
}

enum Disposition {
    Processed,
    Retried,
    DeadLettered,
}

async fn process_one(
    pool: &PgPool,
    mode: ConsistencyMode,
    failure_injector: &FailureInjector,
    event: &OutboxEventRow,
) -> anyhow::Result<Disposition> {
    let mut tx = pool.begin().await?;
    let attempt_result = process_event(&mut tx, mode, failure_injector, event).await;

    match attempt_result {
        Ok(()) => {
            tx.commit().await?;
            info!(event_id = %event.id, event_type = event.event_type.as_str(), "event processed");
            Ok(Disposition::Processed)
        }
        Err(WorkerError::Permanent { error_code, message }) => {
            tx.rollback().await.ok();
            let mut tx2 = pool.begin().await?;
            ledger_db::outbox::mark_dead(&mut tx2, &event.id).await?;
            tx2.commit().await?;
            warn!(
                event_id = %event.id,
                error_code = ?error_code,
                message,
                "event dead-lettered (permanent failure)"
            );
            Ok(Disposition::DeadLettered)
        }
        Err(WorkerError::Transient(err)) => {
            tx.rollback().await.ok();
            let mut tx2 = pool.begin().await?;
            let delay = retry_delay_seconds(event.attempts);
            let next_retry_at = Utc::now() + ChronoDuration::seconds(delay);
            let became_dead =
                ledger_db::outbox::mark_retry(&mut tx2, &event.id, event.attempts, next_retry_at)
                    .await?;
            tx2.commit().await?;

            if became_dead {
                warn!(event_id = %event.id, %err, "event dead-lettered after exhausting retries");
                Ok(Disposition::DeadLettered)
            } else {
                metrics::counter!("outbox_retry_total").increment(1);
                warn!(event_id = %event.id, %err, delay_seconds = delay, "event rescheduled after transient failure");
                Ok(Disposition::Retried)
            }
        }
    }
}
