use anyhow::{Context, Result};
use chrono::Utc;
use ledger_schemas::{PaymentRow, PaymentStatus};
use sqlx::{PgPool, Row};

use crate::Tx;

pub async fn insert_payment(
    tx: &mut Tx<'_>,
    id: &str,
    idempotency_key: &str,
    request_hash: &str,
    source_account_id: &str,
    destination_account_id: &str,
    amount_cents: i64,
    method: &str,
    status: PaymentStatus,
) -> Result<()> {
    sqlx::query(
        r#"
        insert into payments (
            id, idempotency_key, request_hash, source_account_id,
            destination_account_id, amount_cents, method, status, created_at
        ) values ($1, $2, $3, $4, $5, $6, $7, $8, $9)
        "#,
    )
    .bind(id)
    .bind(idempotency_key)
    .bind(request_hash)
    .bind(source_account_id)
    .bind(destination_account_id)
    .bind(amount_cents)
    .bind(method)
    .bind(status.as_str())
    .bind(Utc::now())
    .execute(&mut **tx)
    .await
    .context("insert_payment failed")?;

    Ok(())
}

pub async fn fetch_payment(pool: &PgPool, id: &str) -> Result<Option<PaymentRow>> {
    let row = sqlx::query(
        r#"
        select id, idempotency_key, request_hash, source_account_id,
               destination_account_id, amount_cents, method, status, created_at
        from payments where id = $1
        "#,
    )
    .bind(id)
    .fetch_optional(pool)
    .await
    .context("fetch_payment failed")?;

    row.map(row_to_payment).transpose()
}

pub async fn fetch_payment_for_update(tx: &mut Tx<'_>, id: &str) -> Result<Option<PaymentRow>> {
    let row = sqlx::query(
        r#"
        select id, idempotency_key, request_hash, source_account_id,
               destination_account_id, amount_cents, method, status, created_at
        from payments where id = $1
        for update
        "#,
    )
    .bind(id)
    .fetch_optional(&mut **tx)
    .await
    .context("fetch_payment_for_update failed")?;

    row.map(row_to_payment).transpose()
}

pub async fn update_status(tx: &mut Tx<'_>, id: &str, status: PaymentStatus) -> Result<()> {
    sqlx::query("update payments set status = $1 where id = $2")
        .bind(status.as_str())
        .bind(id)
        .execute(&mut **tx)
        .await
        .context("update_status failed")?;
    Ok(())
}

pub async fn count_by_status(pool: &PgPool, status: PaymentStatus) -> Result<i64> {
    let (n,): (i64,) = sqlx::query_as("select count(*)::bigint from payments where status = $1")
        .bind(status.as_str())
        .fetch_one(pool)
        .await
        .context("count_by_status failed")?;
    Ok(n)
}

fn row_to_payment(row: sqlx::postgres::PgRow) -> Result<PaymentRow> {
    let status_raw: String = row.try_get("status")?;
    let status = PaymentStatus::parse(&status_raw)
        .ok_or_else(|| anyhow::anyhow!("unrecognized payment status: {status_raw}"))?;

    Ok(PaymentRow {
        id: row.try_get("id")?,
        idempotency_key: row.try_get("idempotency_key")?,
        request_hash: row.try_get("request_hash")?,
        src_id: row.try_get("source_account_id")?,
        dst_id: row.try_get("destination_account_id")?,
        amount_cents: row.try_get("amount_cents")?,
        method: row.try_get("method")?,
        status,
        created_at: row.try_get("created_at")?,
    })
}
