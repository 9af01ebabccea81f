//! Wire and persistence contracts shared by the intake service, the
//! settlement worker, and their repositories.
//!
//! Enum wire/persistence forms are exact string values (§3):
//! changing a `rename_all`/`rename` here changes what is stored in
//! Postgres and what clients see over HTTP.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub mod messages;

// ---------------------------------------------------------------------------
// Enumerations
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConsistencyMode {
    Strong,
    Hybrid,
    Eventual,
}

impl ConsistencyMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConsistencyMode::Strong => "strong",
            ConsistencyMode::Hybrid => "hybrid",
            ConsistencyMode::Eventual => "eventual",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "strong" => Some(ConsistencyMode::Strong),
            "hybrid" => Some(ConsistencyMode::Hybrid),
            "eventual" => Some(ConsistencyMode::Eventual),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    InsufficientFunds,
    InvalidPayment,
    IdempotencyConflict,
    IdempotencyUnavailable,
    DependencyUnavailable,
    InvariantViolation,
}

impl ErrorCode {
    /// HTTP status this error code maps to at the intake boundary (§7).
    pub fn http_status(&self) -> u16 {
        match self {
            ErrorCode::InsufficientFunds | ErrorCode::InvalidPayment => 422,
            ErrorCode::IdempotencyConflict => 409,
            ErrorCode::IdempotencyUnavailable | ErrorCode::DependencyUnavailable => 503,
            ErrorCode::InvariantViolation => 500,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IncidentSeverity {
    Info,
    P2,
    P1,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    Received,
    Reserved,
    Completed,
    Rejected,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Received => "received",
            PaymentStatus::Reserved => "reserved",
            PaymentStatus::Completed => "completed",
            PaymentStatus::Rejected => "rejected",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "received" => Some(PaymentStatus::Received),
            "reserved" => Some(PaymentStatus::Reserved),
            "completed" => Some(PaymentStatus::Completed),
            "rejected" => Some(PaymentStatus::Rejected),
            _ => None,
        }
    }

    /// Terminal statuses are permanent (§3 Payment invariants).
    pub fn is_terminal(&self) -> bool {
        matches!(self, PaymentStatus::Completed | PaymentStatus::Rejected)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentMethod {
    Pix,
    Ted,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum LedgerDirection {
    Debit,
    Credit,
}

impl LedgerDirection {
    pub fn as_str(&self) -> &'static str {
        match self {
            LedgerDirection::Debit => "DEBIT",
            LedgerDirection::Credit => "CREDIT",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutboxStatus {
    Pending,
    Processing,
    Processed,
    Dead,
}

impl OutboxStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OutboxStatus::Pending => "pending",
            OutboxStatus::Processing => "processing",
            OutboxStatus::Processed => "processed",
            OutboxStatus::Dead => "dead",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(OutboxStatus::Pending),
            "processing" => Some(OutboxStatus::Processing),
            "processed" => Some(OutboxStatus::Processed),
            "dead" => Some(OutboxStatus::Dead),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OutboxEventType {
    PaymentReserved,
    PaymentRequested,
}

impl OutboxEventType {
    pub fn as_str(&self) -> &'static str {
        match self {
            OutboxEventType::PaymentReserved => "PAYMENT_RESERVED",
            OutboxEventType::PaymentRequested => "PAYMENT_REQUESTED",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "PAYMENT_RESERVED" => Some(OutboxEventType::PaymentReserved),
            "PAYMENT_REQUESTED" => Some(OutboxEventType::PaymentRequested),
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// HTTP / intake DTOs
// ---------------------------------------------------------------------------

/// `POST /v1/payments` request body (§4.1). Field ranges are enforced by
/// `ledger_domain::validate_request`, not by this type itself — keeping
/// validation in one place lets the use case attach the right `ErrorCode`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreatePaymentRequest {
    pub idempotency_key: String,
    pub source_account_id: String,
    pub destination_account_id: String,
    pub amount_cents: i64,
    pub method: PaymentMethod,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentResponse {
    pub payment_id: String,
    pub status: PaymentStatus,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiErrorResponse {
    pub error_code: ErrorCode,
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: &'static str,
}

/// `GET /internal/stats` response (§6). All fields are integers by contract.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatsResponse {
    pub completed: i64,
    pub rejected: i64,
    pub outbox_pending: i64,
    pub outbox_dead: i64,
    pub ledger_imbalance: i64,
    pub negative_balance_detected: i64,
}

// ---------------------------------------------------------------------------
// Outbox event payload (§4.2)
// ---------------------------------------------------------------------------

/// The canonical JSON body stored in `outbox_events.payload_json` and
/// parsed back out by the worker (§4.2). Field order here is stable across
/// intake and worker builds so the canonical (sorted-key) serialization
/// never drifts between them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutboxEventPayload {
    pub payment_id: String,
    pub source_account_id: String,
    pub destination_account_id: String,
    pub amount_cents: i64,
    pub traceparent: Option<String>,
}

// ---------------------------------------------------------------------------
// Row types shared between ledger-db and its consumers
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct AccountRow {
    pub id: String,
    pub available_cents: i64,
    pub reserved_cents: i64,
    pub version: i32,
}

#[derive(Debug, Clone)]
pub struct PaymentRow {
    pub id: String,
    pub idempotency_key: String,
    pub request_hash: String,
    pub src_id: String,
    pub dst_id: String,
    pub amount_cents: i64,
    pub method: String,
    pub status: PaymentStatus,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct OutboxEventRow {
    pub id: String,
    pub aggregate_id: String,
    pub event_type: OutboxEventType,
    pub payload_json: serde_json::Value,
    pub status: OutboxStatus,
    pub attempts: i32,
    pub next_retry_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct IdempotencyKeyRow {
    pub key: String,
    pub request_hash: String,
    pub response_json: Option<String>,
}
