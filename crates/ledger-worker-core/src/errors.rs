use ledger_schemas::ErrorCode;

/// A settlement event's failure is either permanent (dead-letter immediately,
/// no point retrying) or transient (bump attempts, reschedule). `anyhow`
/// errors from the repository layer are always transient — a dropped
/// connection isn't evidence the event itself is bad (§4.4, §4.5, §4.12).
#[derive(Debug, thiserror::Error)]
pub enum WorkerError {
    #[error("{message}")]
    Permanent { error_code: ErrorCode, message: String },
    #[error(transparent)]
    Transient(#[from] anyhow::Error),
}

impl WorkerError {
    /// Construct a permanent failure, incrementing `invariant_violation_total`
    /// at the point of detection (§4.3, §4.5) — every permanent worker
    /// failure is, by definition, an invariant violation.
    pub fn permanent(error_code: ErrorCode, message: impl Into<String>) -> Self {
        metrics::counter!("invariant_violation_total").increment(1);
        WorkerError::Permanent {
            error_code,
            message: message.into(),
        }
    }
}
