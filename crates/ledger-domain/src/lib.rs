//! Payment intake business logic: request validation, idempotency
//! resolution, and the three consistency-mode transfer strategies (§4.1,
//! §4.2).

pub mod create_payment;
pub mod errors;
pub mod validate;

pub use create_payment::{compute_request_hash, execute as create_payment, CreatePaymentOutcome};
pub use errors::DomainError;
pub use validate::validate_request;
