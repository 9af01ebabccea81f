//! Axum router and handlers for the intake service (§6).
//!
//! `build_router` is the single entry point; `main.rs` attaches middleware
//! after calling it, so scenario tests can drive the bare router, exactly
//! routes gathered in one place, handlers below.

use std::time::Instant;

use axum::{
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use ledger_domain::DomainError;
use ledger_schemas::{
    ApiErrorResponse, CreatePaymentRequest, ErrorCode, OutboxStatus, PaymentStatus, StatsResponse,
};

use crate::api_types::{HealthResponse, TRACEPARENT_HEADER};
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/v1/payments", post(create_payment))
        .route("/health", get(health))
        .route("/internal/stats", get(stats))
        .route("/metrics", get(metrics_export))
        .with_state(state)
}

async fn health() -> impl IntoResponse {
    (StatusCode::OK, Json(HealthResponse { status: "ok" }))
}

async fn metrics_export(State(state): State<AppState>) -> impl IntoResponse {
    (StatusCode::OK, state.metrics_handle.render())
}

async fn stats(State(state): State<AppState>) -> Response {
    match stats_snapshot(&state).await {
        Ok(body) => (StatusCode::OK, Json(body)).into_response(),
        Err(_) => domain_error_response(&DomainError::new(
            ErrorCode::DependencyUnavailable,
            ledger_schemas::messages::domain::DATABASE_UNAVAILABLE,
        )),
    }
}

async fn stats_snapshot(state: &AppState) -> anyhow::Result<StatsResponse> {
    let completed = ledger_db::payments::count_by_status(&state.pool, PaymentStatus::Completed).await?;
    let rejected = ledger_db::payments::count_by_status(&state.pool, PaymentStatus::Rejected).await?;
    let outbox_pending = ledger_db::outbox::count_by_status(&state.pool, OutboxStatus::Pending).await?;
    let outbox_dead = ledger_db::outbox::count_by_status(&state.pool, OutboxStatus::Dead).await?;
    let ledger_imbalance = ledger_db::reconcile::ledger_imbalance(&state.pool).await?;
    let negative_balance_detected =
        i64::from(ledger_db::reconcile::negative_balance_count(&state.pool).await? > 0);

    Ok(StatsResponse {
        completed,
        rejected,
        outbox_pending,
        outbox_dead,
        ledger_imbalance,
        negative_balance_detected,
    })
}

/// `POST /v1/payments` (§6). Body parsing is manual (rather than an
/// `axum::Json` extractor) so a malformed body maps to the same
/// `{error_code, message}` shape every other domain error uses, instead of
/// Axum's default plaintext rejection body.
async fn create_payment(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let started = Instant::now();

    let request: CreatePaymentRequest = match serde_json::from_slice(&body) {
        Ok(request) => request,
        Err(e) => {
            return domain_error_response(&DomainError::new(
                ErrorCode::InvalidPayment,
                format!("malformed request body: {e}"),
            ))
        }
    };

    let traceparent = headers
        .get(TRACEPARENT_HEADER)
        .and_then(|v| v.to_str().ok());

    let result = ledger_domain::create_payment(&state.pool, state.mode, &request, traceparent).await;

    metrics::histogram!("payments_request_latency_ms")
        .record(started.elapsed().as_secs_f64() * 1000.0);

    match result {
        Ok(outcome) => {
            metrics::counter!("payments_received_total").increment(1);
            (StatusCode::OK, Json(outcome.response)).into_response()
        }
        Err(err) => domain_error_response(&err),
    }
}

fn domain_error_response(err: &DomainError) -> Response {
    let status =
        StatusCode::from_u16(err.http_status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    (
        status,
        Json(ApiErrorResponse {
            error_code: err.error_code,
            message: err.message.clone(),
        }),
    )
        .into_response()
}
