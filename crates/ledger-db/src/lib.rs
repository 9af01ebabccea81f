//! Postgres repository layer for the payment ledger (§3, §4, §6).
//!
//! Every function that needs row locks (`FOR UPDATE`) takes an explicit
//! `&mut Tx<'_>` so the caller controls the transaction boundary; functions
//! that only read committed state take `&PgPool` directly.

use anyhow::{Context, Result};
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;

pub mod accounts;
pub mod idempotency;
pub mod ledger;
pub mod outbox;
pub mod payments;
pub mod reconcile;

pub use accounts::lock_accounts_sorted;

pub const ENV_DATABASE_URL: &str = "DATABASE_URL";

/// A transaction against the ledger schema. All multi-statement invariants
/// (lock ordering, read-then-write) are expressed as functions taking this
/// type so they can only run inside a single atomic unit.
pub type Tx<'a> = sqlx::Transaction<'a, sqlx::Postgres>;

/// Connect to Postgres using `DATABASE_URL`.
pub async fn connect_from_env() -> Result<PgPool> {
    let url = std::env::var(ENV_DATABASE_URL)
        .with_context(|| format!("missing env var {ENV_DATABASE_URL}"))?;
    connect(&url).await
}

pub async fn connect(url: &str) -> Result<PgPool> {
    let pool = PgPoolOptions::new()
        .max_connections(10)
        .connect(url)
        .await
        .context("failed to connect to Postgres")?;
    Ok(pool)
}

/// Run embedded SQLx migrations.
pub async fn migrate(pool: &PgPool) -> Result<()> {
    sqlx::migrate!("./migrations")
        .run(pool)
        .await
        .context("db migrate failed")?;
    Ok(())
}

/// Begin a transaction against `pool`.
pub async fn begin(pool: &PgPool) -> Result<Tx<'_>> {
    pool.begin().await.context("begin transaction failed")
}

/// Simple connectivity + schema-presence status query, used by `/health`.
pub async fn status(pool: &PgPool) -> Result<DbStatus> {
    let (one,): (i32,) = sqlx::query_as("select 1")
        .fetch_one(pool)
        .await
        .context("status connectivity query failed")?;

    let (has_accounts_table,): (bool,) = sqlx::query_as(
        r#"
        select exists (
            select 1 from information_schema.tables
            where table_schema = 'public' and table_name = 'accounts'
        )
        "#,
    )
    .fetch_one(pool)
    .await
    .context("status table-exists query failed")?;

    Ok(DbStatus {
        ok: one == 1,
        has_accounts_table,
    })
}

#[derive(Debug, Clone)]
pub struct DbStatus {
    pub ok: bool,
    pub has_accounts_table: bool,
}

/// Detect a Postgres unique constraint violation, optionally by name.
///
/// `constraint` may be `None` to match any unique violation (23505) — used
/// at call sites that only have one unique constraint to worry about and
/// don't want to hardcode its (possibly autogenerated) name.
pub fn is_unique_violation(err: &sqlx::Error, constraint: Option<&str>) -> bool {
    match err {
        sqlx::Error::Database(db_err) => {
            let is_unique = db_err.code().as_deref() == Some("23505");
            match constraint {
                Some(name) => is_unique && db_err.constraint() == Some(name),
                None => is_unique,
            }
        }
        _ => false,
    }
}
