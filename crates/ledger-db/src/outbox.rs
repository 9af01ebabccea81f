use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use ledger_schemas::{OutboxEventRow, OutboxEventType, OutboxStatus};
use sqlx::{PgPool, Row};

use crate::Tx;

/// Append an outbox row in the same transaction as the business-state write
/// it describes (§4.2, §4.3 — the transactional outbox pattern).
pub async fn enqueue(
    tx: &mut Tx<'_>,
    id: &str,
    aggregate_type: &str,
    aggregate_id: &str,
    event_type: OutboxEventType,
    payload_json: &serde_json::Value,
) -> Result<()> {
    sqlx::query(
        r#"
        insert into outbox_events (
            id, aggregate_type, aggregate_id, event_type, payload_json, status, attempts, next_retry_at
        ) values ($1, $2, $3, $4, $5, 'pending', 0, null)
        "#,
    )
    .bind(id)
    .bind(aggregate_type)
    .bind(aggregate_id)
    .bind(event_type.as_str())
    .bind(payload_json)
    .execute(&mut **tx)
    .await
    .context("outbox::enqueue failed")?;

    Ok(())
}

/// Atomically claim up to `batch_size` due events and stamp them `processing`
/// with a lease that expires `lease_seconds` from now.
///
/// `FOR UPDATE SKIP LOCKED` lets multiple worker instances poll concurrently
/// without claiming the same row twice. An event already in `processing`
/// whose lease (`next_retry_at`) has expired is claimable again — that is
/// how a worker that crashed mid-processing gets its events picked back up
/// (§4.3 "the lease doubles as the retry timer").
pub async fn claim_batch(
    pool: &PgPool,
    batch_size: i64,
    lease_seconds: f64,
) -> Result<Vec<OutboxEventRow>> {
    let rows = sqlx::query(
        r#"
        with to_claim as (
            select id
            from outbox_events
            where status in ('pending', 'processing')
              and (next_retry_at is null or next_retry_at <= now())
            order by created_at asc, id asc
            limit $1
            for update skip locked
        )
        update outbox_events
        set status = 'processing',
            next_retry_at = now() + make_interval(secs => $2)
        where id in (select id from to_claim)
        returning id, aggregate_id, event_type, payload_json, status, attempts, next_retry_at, created_at
        "#,
    )
    .bind(batch_size)
    .bind(lease_seconds)
    .fetch_all(pool)
    .await
    .context("outbox::claim_batch failed")?;

    rows.into_iter().map(row_to_event).collect()
}

pub async fn fetch_for_update(tx: &mut Tx<'_>, id: &str) -> Result<Option<OutboxEventRow>> {
    let row = sqlx::query(
        r#"
        select id, aggregate_id, event_type, payload_json, status, attempts, next_retry_at, created_at
        from outbox_events where id = $1
        for update
        "#,
    )
    .bind(id)
    .fetch_optional(&mut **tx)
    .await
    .context("outbox::fetch_for_update failed")?;

    row.map(row_to_event).transpose()
}

pub async fn mark_processed(tx: &mut Tx<'_>, id: &str) -> Result<()> {
    sqlx::query("update outbox_events set status = 'processed', next_retry_at = null where id = $1")
        .bind(id)
        .execute(&mut **tx)
        .await
        .context("outbox::mark_processed failed")?;
    Ok(())
}

pub async fn mark_dead(tx: &mut Tx<'_>, id: &str) -> Result<()> {
    sqlx::query("update outbox_events set status = 'dead', next_retry_at = null where id = $1")
        .bind(id)
        .execute(&mut **tx)
        .await
        .context("outbox::mark_dead failed")?;
    Ok(())
}

/// Increment `attempts` and either dead-letter the event (at 7 attempts) or
/// reschedule it. `attempts_before` is the attempts count the caller already
/// loaded under `FOR UPDATE` earlier in the same transaction, matching the
/// worker's retry-delay formula which is keyed off attempts *before* this
/// increment (§4.5).
///
/// Returns `true` if the event was dead-lettered.
pub async fn mark_retry(
    tx: &mut Tx<'_>,
    id: &str,
    attempts_before: i32,
    next_retry_at: DateTime<Utc>,
) -> Result<bool> {
    let new_attempts = attempts_before + 1;
    if new_attempts >= 7 {
        sqlx::query(
            "update outbox_events set status = 'dead', attempts = $1, next_retry_at = null where id = $2",
        )
        .bind(new_attempts)
        .bind(id)
        .execute(&mut **tx)
        .await
        .context("outbox::mark_retry (dead) failed")?;
        return Ok(true);
    }

    sqlx::query(
        "update outbox_events set status = 'pending', attempts = $1, next_retry_at = $2 where id = $3",
    )
    .bind(new_attempts)
    .bind(next_retry_at)
    .bind(id)
    .execute(&mut **tx)
    .await
    .context("outbox::mark_retry (pending) failed")?;

    Ok(false)
}

pub async fn count_by_status(pool: &PgPool, status: OutboxStatus) -> Result<i64> {
    let (n,): (i64,) =
        sqlx::query_as("select count(*)::bigint from outbox_events where status = $1")
            .bind(status.as_str())
            .fetch_one(pool)
            .await
            .context("outbox::count_by_status failed")?;
    Ok(n)
}

fn row_to_event(row: sqlx::postgres::PgRow) -> Result<OutboxEventRow> {
    let event_type_raw: String = row.try_get("event_type")?;
    let event_type = OutboxEventType::parse(&event_type_raw)
        .ok_or_else(|| anyhow::anyhow!("unrecognized outbox event_type: {event_type_raw}"))?;

    let status_raw: String = row.try_get("status")?;
    let status = OutboxStatus::parse(&status_raw)
        .ok_or_else(|| anyhow::anyhow!("unrecognized outbox status: {status_raw}"))?;

    Ok(OutboxEventRow {
        id: row.try_get("id")?,
        aggregate_id: row.try_get("aggregate_id")?,
        event_type,
        payload_json: row.try_get("payload_json")?,
        status,
        attempts: row.try_get("attempts")?,
        next_retry_at: row.try_get("next_retry_at")?,
        created_at: row.try_get("created_at")?,
    })
}
