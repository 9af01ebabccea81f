//! Intake service entry point (§2, §6).
//!
//! Kept thin: load config, connect + migrate, install the metrics
//! recorder, build the router, attach middleware, serve.

use std::net::SocketAddr;

use anyhow::Context;
use ledger_config::Settings;
use ledger_intake_service::{metrics_init, routes, state::AppState};
use tower_http::trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer};
use tracing::{info, Level};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::from_filename(".env.local");
    init_tracing();

    let settings = Settings::from_env().context("failed to load settings")?;
    let pool = ledger_db::connect(&settings.database_url).await?;
    if settings.migrate_recreate_schema {
        ledger_db::migrate(&pool).await?;
    }

    let metrics_handle = metrics_init::install()?;
    let state = AppState::new(pool, &settings, metrics_handle);

    let app = routes::build_router(state).layer(
        TraceLayer::new_for_http()
            .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
            .on_response(DefaultOnResponse::new().level(Level::INFO)),
    );

    let addr = bind_addr_from_env().unwrap_or_else(|| SocketAddr::from(([0, 0, 0, 0], 8080)));
    info!(mode = ?settings.consistency_mode, "ledger-intake-service listening on http://{}", addr);

    axum::serve(tokio::net::TcpListener::bind(addr).await?, app)
        .await
        .context("server crashed")?;

    Ok(())
}

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()),
        )
        .init();
}

fn bind_addr_from_env() -> Option<SocketAddr> {
    std::env::var("LEDGER_INTAKE_ADDR").ok()?.parse().ok()
}
