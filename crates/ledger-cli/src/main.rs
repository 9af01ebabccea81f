//! Operator CLI: schema bootstrap and seed-data commands.
//!
//! Migration bootstrap is an external collaborator (§1) — this binary
//! exists only so a human (or a deploy script) has something to invoke; it
//! carries no business logic of its own.

use anyhow::Result;
use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "ledger-cli")]
#[command(about = "Operator CLI for the payment ledger's schema and seed data")]
struct Cli {
    #[command(subcommand)]
    cmd: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Database bootstrap commands.
    Db {
        #[command(subcommand)]
        cmd: DbCmd,
    },
    /// Insert the four default seed accounts (§6 Seed data), if absent.
    Seed,
}

#[derive(Subcommand)]
enum DbCmd {
    /// Print connectivity + schema-presence status.
    Status,
    /// Apply pending migrations.
    Migrate,
}

#[tokio::main]
async fn main() -> Result<()> {
    let _ = dotenvy::from_filename(".env.local");
    init_tracing();

    let cli = Cli::parse();
    let pool = ledger_db::connect_from_env().await?;

    match cli.cmd {
        Commands::Db { cmd } => match cmd {
            DbCmd::Status => {
                let status = ledger_db::status(&pool).await?;
                println!(
                    "db_ok={} has_accounts_table={}",
                    status.ok, status.has_accounts_table
                );
            }
            DbCmd::Migrate => {
                ledger_db::migrate(&pool).await?;
                println!("migrations_applied=true");
            }
        },
        Commands::Seed => {
            ledger_testkit::seed_default_accounts(&pool).await?;
            println!(
                "seeded_accounts={}",
                ledger_testkit::SEED_ACCOUNT_IDS.join(",")
            );
        }
    }

    Ok(())
}

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()),
        )
        .init();
}
