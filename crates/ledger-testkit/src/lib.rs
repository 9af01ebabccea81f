//! Shared test fixtures for the ledger workspace (§4.10, §6 Seed data).
//!
//! A shared `testkit_db_pool` helper used by every crate's integration
//! tests: connect
//! with the same env var the binaries use, apply migrations, and hand back a
//! ready pool. Every DB-touching scenario test across the workspace starts
//! from here instead of hand-rolling its own connect+migrate dance.

use anyhow::Result;
use sqlx::PgPool;

/// The four seeded accounts (§6 Seed data), each starting at this balance.
pub const SEED_ACCOUNT_IDS: [&str; 4] = ["acc-001", "acc-002", "acc-003", "acc-004"];
pub const SEED_ACCOUNT_BALANCE_CENTS: i64 = 1_000_000;

/// Connect using `DATABASE_URL` and apply migrations, ready for a test.
pub async fn testkit_db_pool() -> Result<PgPool> {
    let pool = ledger_db::connect_from_env().await?;
    ledger_db::migrate(&pool).await?;
    Ok(pool)
}

/// Seed the four default accounts at 1,000,000 cents available / 0 reserved
/// (§6). Idempotent: existing rows are left untouched via `on conflict do
/// nothing`, so repeated test runs against a persistent DB don't reset
/// balances another concurrent test is relying on.
pub async fn seed_default_accounts(pool: &PgPool) -> Result<()> {
    for id in SEED_ACCOUNT_IDS {
        ledger_db::accounts::seed_account(pool, id, SEED_ACCOUNT_BALANCE_CENTS).await?;
    }
    Ok(())
}

/// Seed a single fresh account with a unique id, for tests that don't want
/// to share the default fixtures with other concurrently running tests.
pub async fn seed_account_with_balance(pool: &PgPool, prefix: &str, available_cents: i64) -> Result<String> {
    let id = format!("{prefix}-{}", uuid::Uuid::new_v4().simple());
    ledger_db::accounts::seed_account(pool, &id, available_cents).await?;
    Ok(id)
}
