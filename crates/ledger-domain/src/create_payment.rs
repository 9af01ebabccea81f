use anyhow::Context;
use ledger_config::canonical_json_sha256;
use ledger_schemas::{
    messages::domain, ConsistencyMode, CreatePaymentRequest, ErrorCode, OutboxEventType,
    PaymentResponse, PaymentStatus,
};
use sqlx::PgPool;
use uuid::Uuid;

use crate::errors::DomainError;
use crate::validate::validate_request;

/// Outcome of [`execute`]: the response the client sees, plus whether this
/// call replayed a prior submission rather than performing new writes
/// (§4.1 "increment the idempotency_replay counter"). The intake HTTP
/// handler uses `is_replay` to decide which counter to bump; it carries no
/// other meaning for the caller.
#[derive(Debug, Clone)]
pub struct CreatePaymentOutcome {
    pub response: PaymentResponse,
    pub is_replay: bool,
}

/// `POST /v1/payments` (§4.1, §4.2). Runs request validation, the
/// idempotency check-and-save, and the mode-specific transfer logic in one
/// database transaction so a crash between steps can never leave a payment
/// half-recorded.
pub async fn execute(
    pool: &PgPool,
    mode: ConsistencyMode,
    request: &CreatePaymentRequest,
    traceparent: Option<&str>,
) -> Result<CreatePaymentOutcome, DomainError> {
    validate_request(request)?;
    let request_hash = compute_request_hash(request);

    match run_transaction(pool, mode, request, &request_hash, traceparent).await {
        Ok(outcome) => Ok(outcome),
        Err(TransactionOutcome::Domain(err)) => Err(err),
        Err(TransactionOutcome::UniqueViolation) => {
            match read_idempotent_replay(pool, &request.idempotency_key, &request_hash).await {
                Ok(Some(response)) => {
                    metrics::counter!("idempotency_replay_total").increment(1);
                    Ok(CreatePaymentOutcome {
                        response,
                        is_replay: true,
                    })
                }
                Ok(None) => Err(DomainError::new(
                    ErrorCode::IdempotencyUnavailable,
                    domain::IDEMPOTENCY_RACE,
                )),
                Err(_) => Err(unavailable()),
            }
        }
        Err(TransactionOutcome::Unavailable) => Err(unavailable()),
    }
}

fn unavailable() -> DomainError {
    DomainError::new(ErrorCode::DependencyUnavailable, domain::DATABASE_UNAVAILABLE)
}

enum TransactionOutcome {
    Domain(DomainError),
    UniqueViolation,
    Unavailable,
}

impl From<DomainError> for TransactionOutcome {
    fn from(value: DomainError) -> Self {
        TransactionOutcome::Domain(value)
    }
}

async fn run_transaction(
    pool: &PgPool,
    mode: ConsistencyMode,
    request: &CreatePaymentRequest,
    request_hash: &str,
    traceparent: Option<&str>,
) -> Result<CreatePaymentOutcome, TransactionOutcome> {
    let mut tx = pool
        .begin()
        .await
        .map_err(|_| TransactionOutcome::Unavailable)?;

    if let Some(replay) = resolve_idempotency(&mut tx, &request.idempotency_key, request_hash)
        .await
        .map_err(TransactionOutcome::from)?
    {
        // No writes happened on this path, commit is a no-op but keeps the
        // transaction lifecycle symmetric.
        let _ = tx.commit().await;
        metrics::counter!("idempotency_replay_total").increment(1);
        return Ok(CreatePaymentOutcome {
            response: replay,
            is_replay: true,
        });
    }

    let response = execute_mode(&mut tx, mode, request, request_hash, traceparent)
        .await
        .map_err(|e| {
            e.downcast::<DomainError>()
                .map(TransactionOutcome::Domain)
                .unwrap_or(TransactionOutcome::Unavailable)
        })?;

    let response_json =
        serde_json::to_string(&response).expect("PaymentResponse serialization must not fail");

    match ledger_db::idempotency::save(&mut tx, &request.idempotency_key, request_hash, &response_json)
        .await
    {
        Ok(()) => {}
        Err(e) if ledger_db::is_unique_violation(&e, None) => {
            let _ = tx.rollback().await;
            return Err(TransactionOutcome::UniqueViolation);
        }
        Err(_) => return Err(TransactionOutcome::Unavailable),
    }

    tx.commit()
        .await
        .map_err(|_| TransactionOutcome::Unavailable)?;

    Ok(CreatePaymentOutcome {
        response,
        is_replay: false,
    })
}

async fn resolve_idempotency(
    tx: &mut ledger_db::Tx<'_>,
    key: &str,
    request_hash: &str,
) -> Result<Option<PaymentResponse>, DomainError> {
    let existing = ledger_db::idempotency::get(tx, key)
        .await
        .map_err(|_| unavailable())?;

    let Some(existing) = existing else {
        return Ok(None);
    };

    if existing.request_hash != request_hash {
        return Err(DomainError::new(
            ErrorCode::IdempotencyConflict,
            domain::IDEMPOTENCY_CONFLICT,
        ));
    }

    let Some(response_json) = existing.response_json.filter(|s| !s.is_empty()) else {
        return Err(DomainError::new(
            ErrorCode::IdempotencyUnavailable,
            domain::IDEMPOTENCY_IN_PROGRESS,
        ));
    };

    let response: PaymentResponse =
        serde_json::from_str(&response_json).map_err(|_| unavailable())?;
    Ok(Some(response))
}

async fn read_idempotent_replay(
    pool: &PgPool,
    key: &str,
    request_hash: &str,
) -> anyhow::Result<Option<PaymentResponse>> {
    let mut tx = pool.begin().await.context("begin replay read failed")?;
    let result = resolve_idempotency(&mut tx, key, request_hash).await;
    let _ = tx.rollback().await;
    result.map_err(|e| anyhow::anyhow!(e.message))
}

/// Dispatch to the consistency mode's transfer logic (§4.2). Python models
/// this as a strategy-object table; a match arm is the idiomatic Rust
/// equivalent for a fixed, closed set of three variants (see DESIGN.md).
async fn execute_mode(
    tx: &mut ledger_db::Tx<'_>,
    mode: ConsistencyMode,
    request: &CreatePaymentRequest,
    request_hash: &str,
    traceparent: Option<&str>,
) -> anyhow::Result<PaymentResponse> {
    match mode {
        ConsistencyMode::Strong => strong_mode(tx, request, request_hash).await,
        ConsistencyMode::Hybrid => hybrid_mode(tx, request, request_hash, traceparent).await,
        ConsistencyMode::Eventual => eventual_mode(tx, request, request_hash, traceparent).await,
    }
}

async fn strong_mode(
    tx: &mut ledger_db::Tx<'_>,
    request: &CreatePaymentRequest,
    request_hash: &str,
) -> anyhow::Result<PaymentResponse> {
    let (mut source, mut destination) = ledger_db::lock_accounts_sorted(
        tx,
        &request.source_account_id,
        &request.destination_account_id,
    )
    .await
    .map_err(|_| domain_err(ErrorCode::InvalidPayment, domain::ACCOUNT_NOT_FOUND))?;

    if source.available_cents < request.amount_cents {
        return Err(domain_err(ErrorCode::InsufficientFunds, domain::INSUFFICIENT_FUNDS));
    }

    source.available_cents -= request.amount_cents;
    source.version += 1;
    destination.available_cents += request.amount_cents;
    destination.version += 1;

    save_account_checked(tx, &source, source.version - 1).await?;
    save_account_checked(tx, &destination, destination.version - 1).await?;

    let payment_id = format!("pay-{}", Uuid::new_v4().simple());
    ledger_db::payments::insert_payment(
        tx,
        &payment_id,
        &request.idempotency_key,
        request_hash,
        &request.source_account_id,
        &request.destination_account_id,
        request.amount_cents,
        method_str(request),
        PaymentStatus::Completed,
    )
    .await?;

    ledger_db::ledger::insert_transfer_pair(
        tx,
        &format!("led-{}", Uuid::new_v4().simple()),
        &format!("led-{}", Uuid::new_v4().simple()),
        &payment_id,
        &request.source_account_id,
        &request.destination_account_id,
        request.amount_cents,
    )
    .await?;

    metrics::counter!("payments_processed_total").increment(1);
    Ok(PaymentResponse {
        payment_id,
        status: PaymentStatus::Completed,
    })
}

async fn hybrid_mode(
    tx: &mut ledger_db::Tx<'_>,
    request: &CreatePaymentRequest,
    request_hash: &str,
    traceparent: Option<&str>,
) -> anyhow::Result<PaymentResponse> {
    let (mut source, _destination) = ledger_db::lock_accounts_sorted(
        tx,
        &request.source_account_id,
        &request.destination_account_id,
    )
    .await
    .map_err(|_| domain_err(ErrorCode::InvalidPayment, domain::ACCOUNT_NOT_FOUND))?;

    if source.available_cents < request.amount_cents {
        return Err(domain_err(ErrorCode::InsufficientFunds, domain::INSUFFICIENT_FUNDS));
    }

    source.available_cents -= request.amount_cents;
    source.reserved_cents += request.amount_cents;
    source.version += 1;
    save_account_checked(tx, &source, source.version - 1).await?;

    let payment_id = format!("pay-{}", Uuid::new_v4().simple());
    ledger_db::payments::insert_payment(
        tx,
        &payment_id,
        &request.idempotency_key,
        request_hash,
        &request.source_account_id,
        &request.destination_account_id,
        request.amount_cents,
        method_str(request),
        PaymentStatus::Reserved,
    )
    .await?;

    enqueue_event(
        tx,
        &payment_id,
        OutboxEventType::PaymentReserved,
        request,
        traceparent,
    )
    .await?;

    Ok(PaymentResponse {
        payment_id,
        status: PaymentStatus::Reserved,
    })
}

async fn eventual_mode(
    tx: &mut ledger_db::Tx<'_>,
    request: &CreatePaymentRequest,
    request_hash: &str,
    traceparent: Option<&str>,
) -> anyhow::Result<PaymentResponse> {
    let payment_id = format!("pay-{}", Uuid::new_v4().simple());
    ledger_db::payments::insert_payment(
        tx,
        &payment_id,
        &request.idempotency_key,
        request_hash,
        &request.source_account_id,
        &request.destination_account_id,
        request.amount_cents,
        method_str(request),
        PaymentStatus::Received,
    )
    .await?;

    enqueue_event(
        tx,
        &payment_id,
        OutboxEventType::PaymentRequested,
        request,
        traceparent,
    )
    .await?;

    Ok(PaymentResponse {
        payment_id,
        status: PaymentStatus::Received,
    })
}

async fn enqueue_event(
    tx: &mut ledger_db::Tx<'_>,
    payment_id: &str,
    event_type: OutboxEventType,
    request: &CreatePaymentRequest,
    traceparent: Option<&str>,
) -> anyhow::Result<()> {
    let payload = serde_json::json!({
        "payment_id": payment_id,
        "source_account_id": request.source_account_id,
        "destination_account_id": request.destination_account_id,
        "amount_cents": request.amount_cents,
        "traceparent": traceparent,
    });

    ledger_db::outbox::enqueue(
        tx,
        &format!("evt-{}", Uuid::new_v4().simple()),
        "payment",
        payment_id,
        event_type,
        &payload,
    )
    .await
}

/// Persist an account, incrementing `optimistic_lock_conflict_total` if the
/// version check fails. Every code path in this file locks its accounts
/// `FOR UPDATE` first, so a conflict here means a second writer slipped in
/// without taking that lock — a bug, not a normal occurrence — which is why
/// this surfaces as an error rather than a silent retry (§9).
async fn save_account_checked(
    tx: &mut ledger_db::Tx<'_>,
    account: &ledger_schemas::AccountRow,
    expected_version: i32,
) -> anyhow::Result<()> {
    let saved = ledger_db::accounts::save_account(tx, account, expected_version).await?;
    if !saved {
        metrics::counter!("optimistic_lock_conflict_total").increment(1);
        anyhow::bail!("optimistic lock conflict saving account {}", account.id);
    }
    Ok(())
}

fn method_str(request: &CreatePaymentRequest) -> &'static str {
    match request.method {
        ledger_schemas::PaymentMethod::Pix => "pix",
        ledger_schemas::PaymentMethod::Ted => "ted",
    }
}

fn domain_err(code: ErrorCode, message: &str) -> anyhow::Error {
    anyhow::Error::new(DomainError::new(code, message))
}

/// Canonical-JSON SHA-256 of the whole request (§4.1). Hashing the full
/// request — including the idempotency key itself — is what lets a replay
/// with an identical body short-circuit while a reused key with a different
/// body is rejected as a conflict.
pub fn compute_request_hash(request: &CreatePaymentRequest) -> String {
    let value = serde_json::to_value(request).expect("CreatePaymentRequest must serialize");
    canonical_json_sha256(&value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ledger_schemas::PaymentMethod;

    #[test]
    fn request_hash_is_stable_for_identical_requests() {
        let a = CreatePaymentRequest {
            idempotency_key: "key-0123456789".to_string(),
            source_account_id: "acct-a".to_string(),
            destination_account_id: "acct-b".to_string(),
            amount_cents: 500,
            method: PaymentMethod::Pix,
        };
        let b = a.clone();
        assert_eq!(compute_request_hash(&a), compute_request_hash(&b));
    }

    #[test]
    fn request_hash_changes_with_amount() {
        let mut a = CreatePaymentRequest {
            idempotency_key: "key-0123456789".to_string(),
            source_account_id: "acct-a".to_string(),
            destination_account_id: "acct-b".to_string(),
            amount_cents: 500,
            method: PaymentMethod::Pix,
        };
        let hash_a = compute_request_hash(&a);
        a.amount_cents = 600;
        assert_ne!(hash_a, compute_request_hash(&a));
    }
}
