use anyhow::{Context, Result};
use sqlx::Postgres;

/// Sum of ledger entries, DEBITs positive and CREDITs negative. A balanced
/// ledger always sums to zero; a nonzero result means some payment's write
/// path lost or duplicated one side of a transfer (§4.6).
///
/// Generic over `impl Executor` so a caller can run both invariant queries
/// against the same snapshot by passing `&mut *tx` for both (§4.6 "ordinary,
/// non-locking transaction"), or pass a bare `&PgPool` outside a transaction.
pub async fn ledger_imbalance<'e, E>(executor: E) -> Result<i64>
where
    E: sqlx::Executor<'e, Database = Postgres>,
{
    let (value,): (i64,) = sqlx::query_as(
        r#"
        select coalesce(sum(
            case when direction = 'DEBIT' then amount_cents else -amount_cents end
        ), 0)::bigint
        from ledger_entries
        "#,
    )
    .fetch_one(executor)
    .await
    .context("ledger_imbalance failed")?;

    Ok(value)
}

/// Count of accounts with a negative available or reserved balance — should
/// always be zero; a debit path that doesn't validate funds first would
/// show up here.
pub async fn negative_balance_count<'e, E>(executor: E) -> Result<i64>
where
    E: sqlx::Executor<'e, Database = Postgres>,
{
    let (value,): (i64,) = sqlx::query_as(
        r#"
        select count(*)::bigint from accounts
        where available_balance_cents < 0 or reserved_balance_cents < 0
        "#,
    )
    .fetch_one(executor)
    .await
    .context("negative_balance_count failed")?;

    Ok(value)
}
