use std::time::Duration;

use ledger_schemas::{messages::worker, ConsistencyMode, ErrorCode, OutboxEventRow, OutboxEventType, PaymentStatus};
use uuid::Uuid;

use crate::errors::WorkerError;
use crate::failure_injector::FailureInjector;
use crate::payload::parse_payload;

/// Process one claimed outbox event inside `tx` (§4.2, §4.4, §4.5).
///
/// On success the event is marked `processed` as part of the same
/// transaction as the settlement it performed. On error nothing here is
/// committed — the caller rolls back and opens a fresh transaction to stamp
/// the event `dead` ([`WorkerError::Permanent`]) or reschedule it
/// ([`WorkerError::Transient`]), per the two-phase split in §4.12.
pub async fn process_event(
    tx: &mut ledger_db::Tx<'_>,
    mode: ConsistencyMode,
    failure_injector: &FailureInjector,
    event: &OutboxEventRow,
) -> Result<(), WorkerError> {
    let payload = parse_payload(&event.payload_json)?;
    let attempt = (event.attempts + 1) as u32;

    if failure_injector.should_apply_db_delay(&event.id, attempt) {
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    if failure_injector.should_raise_worker_exception(&event.id, attempt) {
        return Err(WorkerError::Transient(anyhow::anyhow!(
            worker::DETERMINISTIC_WORKER_FAILURE
        )));
    }
    if failure_injector.should_fail_redis_simulation(&event.id, attempt) {
        return Err(WorkerError::Transient(anyhow::anyhow!(
            worker::DETERMINISTIC_REDIS_FAILURE
        )));
    }

    match mode {
        // Strong-mode payments settle synchronously at intake and never
        // enqueue an outbox event; if one somehow exists, discard it rather
        // than apply business logic to an event no strategy recognizes.
        ConsistencyMode::Strong => {
            ledger_db::outbox::mark_processed(tx, &event.id).await?;
            Ok(())
        }
        ConsistencyMode::Hybrid => {
            require_event_type(event, OutboxEventType::PaymentReserved)?;
            handle_hybrid(tx, event, &payload).await
        }
        ConsistencyMode::Eventual => {
            require_event_type(event, OutboxEventType::PaymentRequested)?;
            handle_eventual(tx, event, &payload).await
        }
    }
}

fn require_event_type(
    event: &OutboxEventRow,
    expected: OutboxEventType,
) -> Result<(), WorkerError> {
    if event.event_type != expected {
        return Err(WorkerError::permanent(
            ErrorCode::InvariantViolation,
            format!("{}: {}", worker::UNEXPECTED_EVENT_TYPE, event.event_type.as_str()),
        ));
    }
    Ok(())
}

async fn handle_hybrid(
    tx: &mut ledger_db::Tx<'_>,
    event: &OutboxEventRow,
    payload: &ledger_schemas::OutboxEventPayload,
) -> Result<(), WorkerError> {
    let payment = ledger_db::payments::fetch_payment_for_update(tx, &payload.payment_id)
        .await?
        .ok_or_else(|| WorkerError::permanent(ErrorCode::InvariantViolation, worker::PAYMENT_NOT_FOUND))?;

    if payment.status.is_terminal() {
        ledger_db::outbox::mark_processed(tx, &event.id).await?;
        return Ok(());
    }

    let (mut source, mut destination) = ledger_db::lock_accounts_sorted(
        tx,
        &payload.source_account_id,
        &payload.destination_account_id,
    )
    .await
    .map_err(|_| WorkerError::permanent(ErrorCode::InvariantViolation, worker::ACCOUNT_NOT_FOUND))?;

    if source.reserved_cents < payload.amount_cents {
        return Err(WorkerError::permanent(
            ErrorCode::InvariantViolation,
            worker::RESERVED_FUNDS_BELOW_AMOUNT,
        ));
    }

    source.reserved_cents -= payload.amount_cents;
    source.version += 1;
    destination.available_cents += payload.amount_cents;
    destination.version += 1;

    save_account_checked(tx, &source, source.version - 1).await?;
    save_account_checked(tx, &destination, destination.version - 1).await?;
    ledger_db::payments::update_status(tx, &payment.id, PaymentStatus::Completed).await?;
    ledger_db::ledger::insert_transfer_pair(
        tx,
        &format!("led-{}", Uuid::new_v4().simple()),
        &format!("led-{}", Uuid::new_v4().simple()),
        &payment.id,
        &payload.source_account_id,
        &payload.destination_account_id,
        payload.amount_cents,
    )
    .await?;
    ledger_db::outbox::mark_processed(tx, &event.id).await?;
    metrics::counter!("payments_processed_total").increment(1);

    Ok(())
}

async fn handle_eventual(
    tx: &mut ledger_db::Tx<'_>,
    event: &OutboxEventRow,
    payload: &ledger_schemas::OutboxEventPayload,
) -> Result<(), WorkerError> {
    let payment = ledger_db::payments::fetch_payment_for_update(tx, &payload.payment_id)
        .await?
        .ok_or_else(|| WorkerError::permanent(ErrorCode::InvariantViolation, worker::PAYMENT_NOT_FOUND))?;

    if payment.status.is_terminal() {
        ledger_db::outbox::mark_processed(tx, &event.id).await?;
        return Ok(());
    }

    let (mut source, mut destination) = ledger_db::lock_accounts_sorted(
        tx,
        &payload.source_account_id,
        &payload.destination_account_id,
    )
    .await
    .map_err(|_| WorkerError::permanent(ErrorCode::InvariantViolation, worker::ACCOUNT_NOT_FOUND))?;

    if source.available_cents < payload.amount_cents {
        ledger_db::payments::update_status(tx, &payment.id, PaymentStatus::Rejected).await?;
        ledger_db::outbox::mark_processed(tx, &event.id).await?;
        metrics::counter!("payments_processed_total").increment(1);
        return Ok(());
    }

    source.available_cents -= payload.amount_cents;
    source.version += 1;
    destination.available_cents += payload.amount_cents;
    destination.version += 1;

    save_account_checked(tx, &source, source.version - 1).await?;
    save_account_checked(tx, &destination, destination.version - 1).await?;
    ledger_db::payments::update_status(tx, &payment.id, PaymentStatus::Completed).await?;
    ledger_db::ledger::insert_transfer_pair(
        tx,
        &format!("led-{}", Uuid::new_v4().simple()),
        &format!("led-{}", Uuid::new_v4().simple()),
        &payment.id,
        &payload.source_account_id,
        &payload.destination_account_id,
        payload.amount_cents,
    )
    .await?;
    ledger_db::outbox::mark_processed(tx, &event.id).await?;
    metrics::counter!("payments_processed_total").increment(1);

    Ok(())
}

/// Persist an account inside a worker settlement transaction, incrementing
/// `optimistic_lock_conflict_total` if the version check fails. Treated as
/// transient (retry the whole event) rather than permanent: unlike a
/// malformed payload, a lost race is not evidence the event itself is bad.
async fn save_account_checked(
    tx: &mut ledger_db::Tx<'_>,
    account: &ledger_schemas::AccountRow,
    expected_version: i32,
) -> Result<(), WorkerError> {
    let saved = ledger_db::accounts::save_account(tx, account, expected_version).await?;
    if !saved {
        metrics::counter!("optimistic_lock_conflict_total").increment(1);
        return Err(WorkerError::Transient(anyhow::anyhow!(
            "optimistic lock conflict saving account {}",
            account.id
        )));
    }
    Ok(())
}

/// Compute the next retry delay for a transient failure: `2^min(attempts+1, 6)`
/// seconds off the pre-increment attempts count, capped at 64s (§4.5).
pub fn retry_delay_seconds(attempts_before: i32) -> i64 {
    let exponent = (attempts_before + 1).clamp(0, 6);
    1i64 << exponent
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retry_delay_doubles_up_to_the_cap() {
        assert_eq!(retry_delay_seconds(0), 2);
        assert_eq!(retry_delay_seconds(1), 4);
        assert_eq!(retry_delay_seconds(2), 8);
        assert_eq!(retry_delay_seconds(3), 16);
        assert_eq!(retry_delay_seconds(4), 32);
        assert_eq!(retry_delay_seconds(5), 64);
        assert_eq!(retry_delay_seconds(6), 64, "delay must stay capped at 64s past attempt 5");
        assert_eq!(retry_delay_seconds(100), 64);
    }
}
