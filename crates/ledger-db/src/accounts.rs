use anyhow::{anyhow, Context, Result};
use ledger_schemas::AccountRow;
use sqlx::{PgPool, Row};

use crate::Tx;

pub async fn fetch_account(pool: &PgPool, id: &str) -> Result<Option<AccountRow>> {
    let row = sqlx::query(
        r#"
        select id, available_balance_cents, reserved_balance_cents, version
        from accounts where id = $1
        "#,
    )
    .bind(id)
    .fetch_optional(pool)
    .await
    .context("fetch_account failed")?;

    row.map(row_to_account).transpose()
}

/// Lock one account row for the duration of `tx`. Callers that need more
/// than one account MUST go through [`lock_accounts_sorted`] instead of
/// calling this directly, to keep lock acquisition order consistent.
pub async fn fetch_account_for_update(tx: &mut Tx<'_>, id: &str) -> Result<Option<AccountRow>> {
    let row = sqlx::query(
        r#"
        select id, available_balance_cents, reserved_balance_cents, version
        from accounts where id = $1
        for update
        "#,
    )
    .bind(id)
    .fetch_optional(&mut **tx)
    .await
    .context("fetch_account_for_update failed")?;

    row.map(row_to_account).transpose()
}

/// Lock `source_id` and `destination_id` in ascending-id order and return
/// them as `(source, destination)` regardless of which one sorts first.
///
/// Every code path that debits one account and credits another (intake's
/// strong-mode transfer, the worker's hybrid/eventual settlement) MUST go
/// through this helper rather than locking the two rows itself — two
/// transfers moving money in opposite directions between the same pair of
/// accounts deadlock if they lock in request order instead of a canonical
/// order (§9).
pub async fn lock_accounts_sorted(
    tx: &mut Tx<'_>,
    source_id: &str,
    destination_id: &str,
) -> Result<(AccountRow, AccountRow)> {
    let mut ids = [source_id, destination_id];
    ids.sort_unstable();

    let first = fetch_account_for_update(tx, ids[0])
        .await?
        .ok_or_else(|| anyhow!("account not found: {}", ids[0]))?;
    let second = fetch_account_for_update(tx, ids[1])
        .await?
        .ok_or_else(|| anyhow!("account not found: {}", ids[1]))?;

    if first.id == source_id {
        Ok((first, second))
    } else {
        Ok((second, first))
    }
}

/// Persist an account's balances/version, enforcing optimistic concurrency:
/// the update only applies if `version` still matches `expected_version`.
/// Returns `false` if another writer advanced the version first (the
/// caller's transaction already holds the row lock from
/// [`fetch_account_for_update`], so in practice this only fires on a bug —
/// it exists as a defense-in-depth check, not the primary concurrency
/// mechanism).
pub async fn save_account(
    tx: &mut Tx<'_>,
    account: &AccountRow,
    expected_version: i32,
) -> Result<bool> {
    let result = sqlx::query(
        r#"
        update accounts
        set available_balance_cents = $1,
            reserved_balance_cents = $2,
            version = $3
        where id = $4 and version = $5
        "#,
    )
    .bind(account.available_cents)
    .bind(account.reserved_cents)
    .bind(account.version)
    .bind(&account.id)
    .bind(expected_version)
    .execute(&mut **tx)
    .await
    .context("save_account failed")?;

    Ok(result.rows_affected() == 1)
}

pub async fn seed_account(pool: &PgPool, id: &str, available_cents: i64) -> Result<()> {
    sqlx::query(
        r#"
        insert into accounts (id, available_balance_cents, reserved_balance_cents, version)
        values ($1, $2, 0, 0)
        on conflict (id) do nothing
        "#,
    )
    .bind(id)
    .bind(available_cents)
    .execute(pool)
    .await
    .context("seed_account failed")?;

    Ok(())
}

fn row_to_account(row: sqlx::postgres::PgRow) -> Result<AccountRow> {
    Ok(AccountRow {
        id: row.try_get("id")?,
        available_cents: row.try_get("available_balance_cents")?,
        reserved_cents: row.try_get("reserved_balance_cents")?,
        version: row.try_get("version")?,
    })
}
