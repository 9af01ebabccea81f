use anyhow::{Context, Result};
use ledger_schemas::LedgerDirection;

use crate::Tx;

/// Write one ledger entry. A completed payment always writes exactly two —
/// one DEBIT on the source account, one CREDIT on the destination — in the
/// same transaction as the balance mutation (§3 Ledger invariants).
pub async fn insert_entry(
    tx: &mut Tx<'_>,
    id: &str,
    payment_id: &str,
    account_id: &str,
    direction: LedgerDirection,
    amount_cents: i64,
) -> Result<()> {
    sqlx::query(
        r#"
        insert into ledger_entries (id, payment_id, account_id, direction, amount_cents)
        values ($1, $2, $3, $4, $5)
        "#,
    )
    .bind(id)
    .bind(payment_id)
    .bind(account_id)
    .bind(direction.as_str())
    .bind(amount_cents)
    .execute(&mut **tx)
    .await
    .context("ledger::insert_entry failed")?;

    Ok(())
}

/// Write the debit/credit pair for a completed transfer of `amount_cents`
/// from `source_id` to `destination_id`.
pub async fn insert_transfer_pair(
    tx: &mut Tx<'_>,
    debit_id: &str,
    credit_id: &str,
    payment_id: &str,
    source_id: &str,
    destination_id: &str,
    amount_cents: i64,
) -> Result<()> {
    insert_entry(
        tx,
        debit_id,
        payment_id,
        source_id,
        LedgerDirection::Debit,
        amount_cents,
    )
    .await?;
    insert_entry(
        tx,
        credit_id,
        payment_id,
        destination_id,
        LedgerDirection::Credit,
        amount_cents,
    )
    .await
}
