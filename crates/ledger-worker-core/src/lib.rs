//! Settlement worker business logic: payload re-validation, the per-mode
//! settlement strategies, deterministic failure injection, and the retry
//! backoff schedule (§4.2, §4.4, §4.5).

pub mod errors;
pub mod failure_injector;
pub mod payload;
pub mod processor;

pub use errors::WorkerError;
pub use failure_injector::FailureInjector;
pub use processor::{process_event, retry_delay_seconds};
