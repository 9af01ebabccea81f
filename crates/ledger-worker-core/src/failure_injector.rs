use sha2::{Digest, Sha256};

use crate::errors::WorkerError;
use ledger_schemas::{messages::worker, ErrorCode};

/// Deterministic, reproducible failure injection for settlement experiments
/// (§4.5). Every decision is a pure function of `(seed, profile, namespace,
/// event_id, attempt)` so a run can be replayed bit-for-bit from its seed.
#[derive(Debug, Clone, Copy)]
pub struct FailurePreset {
    pub db_delay_probability: f64,
    pub worker_exception_probability: f64,
    pub redis_failure_probability: f64,
}

const NONE: FailurePreset = FailurePreset {
    db_delay_probability: 0.0,
    worker_exception_probability: 0.0,
    redis_failure_probability: 0.0,
};
const MILD: FailurePreset = FailurePreset {
    db_delay_probability: 0.02,
    worker_exception_probability: 0.01,
    redis_failure_probability: 0.0,
};
const HARSH: FailurePreset = FailurePreset {
    db_delay_probability: 0.10,
    worker_exception_probability: 0.05,
    redis_failure_probability: 0.05,
};

#[derive(Debug, Clone)]
pub struct FailureInjector {
    profile: String,
    seed: u64,
    preset: FailurePreset,
}

impl FailureInjector {
    pub fn new(profile: &str, seed: u64) -> Result<Self, WorkerError> {
        let preset = match profile {
            "none" => NONE,
            "mild" => MILD,
            "harsh" => HARSH,
            _ => {
                return Err(WorkerError::permanent(
                    ErrorCode::InvariantViolation,
                    format!("{}: {profile}", worker::INVALID_FAIL_PROFILE),
                ))
            }
        };

        Ok(Self {
            profile: profile.to_string(),
            seed,
            preset,
        })
    }

    /// `true` if the configured DB-delay probability fires for this event
    /// and attempt. The caller is responsible for actually sleeping — this
    /// function only decides.
    pub fn should_apply_db_delay(&self, event_id: &str, attempt: u32) -> bool {
        self.score("db_delay", event_id, attempt) < self.preset.db_delay_probability
    }

    pub fn should_raise_worker_exception(&self, event_id: &str, attempt: u32) -> bool {
        self.score("worker_exception", event_id, attempt) < self.preset.worker_exception_probability
    }

    pub fn should_fail_redis_simulation(&self, event_id: &str, attempt: u32) -> bool {
        self.score("redis_failure", event_id, attempt) < self.preset.redis_failure_probability
    }

    fn score(&self, namespace: &str, event_id: &str, attempt: u32) -> f64 {
        let payload = format!("{}:{}:{namespace}:{event_id}:{attempt}", self.seed, self.profile);
        let digest = Sha256::digest(payload.as_bytes());
        let value = u64::from_be_bytes(digest[..8].try_into().expect("sha256 digest is 32 bytes"));
        value as f64 / (u64::MAX as f64 + 1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn none_profile_never_fires() {
        let injector = FailureInjector::new("none", 42).unwrap();
        for attempt in 0..50 {
            assert!(!injector.should_raise_worker_exception("evt-1", attempt));
            assert!(!injector.should_apply_db_delay("evt-1", attempt));
            assert!(!injector.should_fail_redis_simulation("evt-1", attempt));
        }
    }

    #[test]
    fn unknown_profile_is_rejected() {
        let err = FailureInjector::new("extreme", 1).unwrap_err();
        assert!(matches!(
            err,
            WorkerError::Permanent { error_code: ErrorCode::InvariantViolation, .. }
        ));
    }

    #[test]
    fn decisions_are_deterministic_for_the_same_inputs() {
        let a = FailureInjector::new("harsh", 7).unwrap();
        let b = FailureInjector::new("harsh", 7).unwrap();
        for attempt in 0..20 {
            assert_eq!(
                a.should_raise_worker_exception("evt-x", attempt),
                b.should_raise_worker_exception("evt-x", attempt)
            );
        }
    }

    #[test]
    fn different_event_ids_diverge() {
        let injector = FailureInjector::new("harsh", 7).unwrap();
        let scores: Vec<bool> = (0..10)
            .map(|i| injector.should_raise_worker_exception(&format!("evt-{i}"), 0))
            .collect();
        assert!(scores.iter().any(|v| *v) || scores.iter().any(|v| !*v));
    }
}
