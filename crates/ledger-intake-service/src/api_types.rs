//! HTTP-layer request/response glue specific to this transport.
//!
//! Wire payloads and error/response bodies that are part of the
//! contract live in `ledger_schemas` so the worker side can share them;
//! this module only holds types the HTTP transport itself needs.

use serde::Serialize;

pub const TRACEPARENT_HEADER: &str = "traceparent";

#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
}
