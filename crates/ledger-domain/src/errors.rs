use ledger_schemas::ErrorCode;

/// A business-rule failure the intake boundary must translate into an HTTP
/// response (§4.1, §7). Anything that is not a `DomainError` — a lost
/// connection, a timeout — stays an `anyhow::Error` and is mapped to
/// `DependencyUnavailable` at the boundary instead of being modeled here.
#[derive(Debug, thiserror::Error)]
#[error("{message}")]
pub struct DomainError {
    pub error_code: ErrorCode,
    pub message: String,
}

impl DomainError {
    pub fn new(error_code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            error_code,
            message: message.into(),
        }
    }

    pub fn http_status(&self) -> u16 {
        self.error_code.http_status()
    }
}
