use ledger_schemas::{messages::domain, CreatePaymentRequest, ErrorCode};

use crate::errors::DomainError;

const IDEMPOTENCY_KEY_LEN: std::ops::RangeInclusive<usize> = 8..=128;
const ACCOUNT_ID_LEN: std::ops::RangeInclusive<usize> = 3..=64;
const AMOUNT_CENTS_RANGE: std::ops::RangeInclusive<i64> = 1..=50_000_000;

/// Field-level validation for `POST /v1/payments` (§3, §4.1). The ranges
/// mirror the wire contract's field constraints; `source != destination` is
/// the one cross-field business rule.
pub fn validate_request(request: &CreatePaymentRequest) -> Result<(), DomainError> {
    if !IDEMPOTENCY_KEY_LEN.contains(&request.idempotency_key.len()) {
        return Err(out_of_range("idempotency_key"));
    }
    if !ACCOUNT_ID_LEN.contains(&request.source_account_id.len()) {
        return Err(out_of_range("source_account_id"));
    }
    if !ACCOUNT_ID_LEN.contains(&request.destination_account_id.len()) {
        return Err(out_of_range("destination_account_id"));
    }
    if !AMOUNT_CENTS_RANGE.contains(&request.amount_cents) {
        return Err(out_of_range("amount_cents"));
    }
    if request.source_account_id == request.destination_account_id {
        return Err(DomainError::new(
            ErrorCode::InvalidPayment,
            domain::SOURCE_DESTINATION_MUST_DIFFER,
        ));
    }
    Ok(())
}

fn out_of_range(field: &str) -> DomainError {
    DomainError::new(
        ErrorCode::InvalidPayment,
        format!("{}: {field}", domain::FIELD_OUT_OF_RANGE),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use ledger_schemas::PaymentMethod;

    fn valid_request() -> CreatePaymentRequest {
        CreatePaymentRequest {
            idempotency_key: "key-0123456789".to_string(),
            source_account_id: "acct-source".to_string(),
            destination_account_id: "acct-dest".to_string(),
            amount_cents: 1_000,
            method: PaymentMethod::Pix,
        }
    }

    #[test]
    fn accepts_a_well_formed_request() {
        assert!(validate_request(&valid_request()).is_ok());
    }

    #[test]
    fn rejects_amount_cents_zero() {
        let mut req = valid_request();
        req.amount_cents = 0;
        let err = validate_request(&req).unwrap_err();
        assert_eq!(err.error_code, ErrorCode::InvalidPayment);
    }

    #[test]
    fn rejects_amount_cents_above_cap() {
        let mut req = valid_request();
        req.amount_cents = 50_000_001;
        assert!(validate_request(&req).is_err());
    }

    #[test]
    fn rejects_short_idempotency_key() {
        let mut req = valid_request();
        req.idempotency_key = "short".to_string();
        assert!(validate_request(&req).is_err());
    }

    #[test]
    fn rejects_same_source_and_destination() {
        let mut req = valid_request();
        req.destination_account_id = req.source_account_id.clone();
        let err = validate_request(&req).unwrap_err();
        assert_eq!(err.message, domain::SOURCE_DESTINATION_MUST_DIFFER);
    }
}
