use ledger_schemas::{messages::worker, ErrorCode, OutboxEventPayload};

use crate::errors::WorkerError;

/// Re-parse and strictly validate an outbox event's stored payload (§4.12).
/// A payload a prior version wrote with a missing/mistyped field is a
/// permanent failure, not something retrying will fix.
pub fn parse_payload(payload_json: &serde_json::Value) -> Result<OutboxEventPayload, WorkerError> {
    Ok(OutboxEventPayload {
        payment_id: required_str(payload_json, "payment_id")?,
        source_account_id: required_str(payload_json, "source_account_id")?,
        destination_account_id: required_str(payload_json, "destination_account_id")?,
        amount_cents: required_int(payload_json, "amount_cents")?,
        traceparent: optional_str(payload_json, "traceparent"),
    })
}

fn required_str(payload: &serde_json::Value, field: &str) -> Result<String, WorkerError> {
    match payload.get(field).and_then(|v| v.as_str()) {
        Some(value) if !value.is_empty() => Ok(value.to_string()),
        _ => Err(invalid_field(field)),
    }
}

fn required_int(payload: &serde_json::Value, field: &str) -> Result<i64, WorkerError> {
    match payload.get(field) {
        Some(value) if value.is_i64() || value.is_u64() => {
            value.as_i64().ok_or_else(|| invalid_field(field))
        }
        Some(value) => value
            .as_str()
            .and_then(|s| s.parse::<i64>().ok())
            .ok_or_else(|| invalid_field(field)),
        None => Err(invalid_field(field)),
    }
}

fn optional_str(payload: &serde_json::Value, field: &str) -> Option<String> {
    match payload.get(field).and_then(|v| v.as_str()) {
        Some(value) if !value.is_empty() => Some(value.to_string()),
        _ => None,
    }
}

fn invalid_field(field: &str) -> WorkerError {
    WorkerError::permanent(
        ErrorCode::InvariantViolation,
        format!("{}: {field}", worker::INVALID_PAYLOAD_FIELD),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_a_well_formed_payload() {
        let value = json!({
            "payment_id": "pay-1",
            "source_account_id": "acct-a",
            "destination_account_id": "acct-b",
            "amount_cents": 500,
            "traceparent": "00-trace-01",
        });
        let payload = parse_payload(&value).unwrap();
        assert_eq!(payload.payment_id, "pay-1");
        assert_eq!(payload.amount_cents, 500);
        assert_eq!(payload.traceparent.as_deref(), Some("00-trace-01"));
    }

    #[test]
    fn missing_field_is_a_permanent_error() {
        let value = json!({
            "payment_id": "pay-1",
            "source_account_id": "acct-a",
            "amount_cents": 500,
        });
        let err = parse_payload(&value).unwrap_err();
        assert!(matches!(err, WorkerError::Permanent { .. }));
    }

    #[test]
    fn amount_cents_accepts_numeric_strings() {
        let value = json!({
            "payment_id": "pay-1",
            "source_account_id": "acct-a",
            "destination_account_id": "acct-b",
            "amount_cents": "500",
        });
        let payload = parse_payload(&value).unwrap();
        assert_eq!(payload.amount_cents, 500);
    }

    #[test]
    fn null_traceparent_is_none() {
        let value = json!({
            "payment_id": "pay-1",
            "source_account_id": "acct-a",
            "destination_account_id": "acct-b",
            "amount_cents": 500,
            "traceparent": null,
        });
        let payload = parse_payload(&value).unwrap();
        assert!(payload.traceparent.is_none());
    }
}
