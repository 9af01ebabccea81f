use anyhow::{Context, Result};
use ledger_schemas::IdempotencyKeyRow;
use sqlx::Row;

use crate::Tx;

pub async fn get(tx: &mut Tx<'_>, key: &str) -> Result<Option<IdempotencyKeyRow>> {
    let row = sqlx::query(
        "select key, request_hash, response_payload_json from idempotency_keys where key = $1",
    )
    .bind(key)
    .fetch_optional(&mut **tx)
    .await
    .context("idempotency::get failed")?;

    row.map(|row| {
        Ok(IdempotencyKeyRow {
            key: row.try_get("key")?,
            request_hash: row.try_get("request_hash")?,
            response_json: row.try_get("response_payload_json")?,
        })
    })
    .transpose()
}

/// Record a response under `key`. The `idempotency_keys.key` primary key
/// makes this a race detector: if a concurrent request already inserted the
/// same key between this transaction's `get` and `save`, the insert raises
/// a unique-violation the caller must catch with [`crate::is_unique_violation`],
/// roll back, and re-read via `get`.
pub async fn save(
    tx: &mut Tx<'_>,
    key: &str,
    request_hash: &str,
    response_payload_json: &str,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        insert into idempotency_keys (key, request_hash, response_payload_json)
        values ($1, $2, $3)
        "#,
    )
    .bind(key)
    .bind(request_hash)
    .bind(response_payload_json)
    .execute(&mut **tx)
    .await?;

    Ok(())
}
