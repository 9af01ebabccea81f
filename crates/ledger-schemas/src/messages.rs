//! Stable human-readable messages, kept as named constants so call sites
//! read as intent rather than free-form strings (mirrors the enum-of-
//! messages idiom `original_source` used to keep wording centralized).

pub mod domain {
    pub const SOURCE_DESTINATION_MUST_DIFFER: &str = "source and destination must differ";
    pub const FIELD_OUT_OF_RANGE: &str = "field out of range";
    pub const IDEMPOTENCY_CONFLICT: &str = "idempotency key reused with different payload";
    pub const IDEMPOTENCY_IN_PROGRESS: &str = "idempotency key is being processed";
    pub const IDEMPOTENCY_RACE: &str = "idempotency persistence race";
    pub const DATABASE_UNAVAILABLE: &str = "database unavailable";
    pub const ACCOUNT_NOT_FOUND: &str = "account not found";
    pub const INSUFFICIENT_FUNDS: &str = "insufficient funds";
}

pub mod worker {
    pub const INVALID_FAIL_PROFILE: &str = "invalid FAIL_PROFILE";
    pub const DETERMINISTIC_WORKER_FAILURE: &str = "deterministic worker failure";
    pub const DETERMINISTIC_REDIS_FAILURE: &str = "deterministic redis failure simulation";
    pub const PAYMENT_NOT_FOUND: &str = "payment not found";
    pub const RESERVED_FUNDS_BELOW_AMOUNT: &str = "reserved funds below amount";
    pub const ACCOUNT_NOT_FOUND: &str = "account not found";
    pub const UNEXPECTED_EVENT_TYPE: &str = "unexpected event type for configured mode";
    pub const INVALID_PAYLOAD_FIELD: &str = "invalid payload field";
}
