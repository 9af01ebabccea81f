//! Process-wide configuration (§6, §9 "process-wide state").
//!
//! `Settings::from_env()` is called once at each binary's startup and the
//! result is never mutated afterward — no module-level mutable caches.

use anyhow::{anyhow, Context, Result};
use ledger_schemas::ConsistencyMode;

pub const ENV_DATABASE_URL: &str = "DATABASE_URL";

#[derive(Debug, Clone)]
pub struct Settings {
    pub database_url: String,
    pub consistency_mode: ConsistencyMode,
    pub fail_profile: String,
    pub experiment_seed: u64,
    pub outbox_poll_interval_seconds: f64,
    pub reconciliation_interval_seconds: f64,
    pub outbox_processing_timeout_seconds: f64,
    pub ledger_worker_metrics_port: u16,
    pub migrate_recreate_schema: bool,
}

impl Settings {
    pub fn from_env() -> Result<Self> {
        let database_url = std::env::var(ENV_DATABASE_URL)
            .with_context(|| format!("missing env var {ENV_DATABASE_URL}"))?;

        let raw_mode = env_or("CONSISTENCY_MODE", "hybrid");
        let consistency_mode = ConsistencyMode::parse(&raw_mode)
            .ok_or_else(|| anyhow!("invalid CONSISTENCY_MODE: {raw_mode}"))?;

        Ok(Self {
            database_url,
            consistency_mode,
            fail_profile: env_or("FAIL_PROFILE", "none"),
            experiment_seed: env_parse_or("EXPERIMENT_SEED", 42)?,
            outbox_poll_interval_seconds: env_parse_or("OUTBOX_POLL_INTERVAL_SECONDS", 0.2)?,
            reconciliation_interval_seconds: env_parse_or(
                "RECONCILIATION_INTERVAL_SECONDS",
                5.0,
            )?,
            outbox_processing_timeout_seconds: env_parse_or(
                "OUTBOX_PROCESSING_TIMEOUT_SECONDS",
                30.0,
            )?,
            ledger_worker_metrics_port: env_parse_or("LEDGER_WORKER_METRICS_PORT", 8001)?,
            migrate_recreate_schema: env_or("MIGRATE_RECREATE_SCHEMA", "1") == "1",
        })
    }
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

fn env_parse_or<T: std::str::FromStr>(key: &str, default: T) -> Result<T>
where
    T::Err: std::fmt::Display,
{
    match std::env::var(key) {
        Ok(raw) => raw
            .parse::<T>()
            .map_err(|e| anyhow!("invalid {key}: {e}")),
        Err(_) => Ok(default),
    }
}

// ---------------------------------------------------------------------------
// Canonical JSON hashing — request_hash (§4.1) and general auditability
// ---------------------------------------------------------------------------

/// Serialize `value` with recursively sorted object keys and no whitespace,
/// then return the lowercase-hex SHA-256 of the resulting bytes.
///
/// This is the stable "canonical JSON" hash §4.1 requires for the
/// idempotency request hash. Sorting keys recursively (rather than relying
/// on `serde_json::Value`'s default `Map` ordering) guarantees the hash is
/// independent of the order fields were inserted in.
pub fn canonical_json_sha256(value: &serde_json::Value) -> String {
    use sha2::{Digest, Sha256};
    let canonical = canonical_json_string(value);
    let mut hasher = Sha256::new();
    hasher.update(canonical.as_bytes());
    hex::encode(hasher.finalize())
}

pub fn canonical_json_string(value: &serde_json::Value) -> String {
    let sorted = sort_keys(value);
    serde_json::to_string(&sorted).expect("canonical json serialization must not fail")
}

fn sort_keys(v: &serde_json::Value) -> serde_json::Value {
    match v {
        serde_json::Value::Object(map) => {
            let mut keys: Vec<_> = map.keys().cloned().collect();
            keys.sort();
            let mut new = serde_json::Map::new();
            for k in keys {
                new.insert(k.clone(), sort_keys(&map[&k]));
            }
            serde_json::Value::Object(new)
        }
        serde_json::Value::Array(arr) => serde_json::Value::Array(arr.iter().map(sort_keys).collect()),
        other => other.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn canonical_json_is_order_independent() {
        let a = json!({"b": 1, "a": 2});
        let b = json!({"a": 2, "b": 1});
        assert_eq!(canonical_json_string(&a), canonical_json_string(&b));
        assert_eq!(canonical_json_sha256(&a), canonical_json_sha256(&b));
    }

    #[test]
    fn canonical_json_has_no_whitespace() {
        let v = json!({"a": [1, 2, 3], "b": "x"});
        let s = canonical_json_string(&v);
        assert!(!s.contains(' '));
        assert_eq!(s, r#"{"a":[1,2,3],"b":"x"}"#);
    }

    #[test]
    fn canonical_json_sorts_nested_objects() {
        let v = json!({"z": {"y": 1, "x": 2}, "a": 1});
        let s = canonical_json_string(&v);
        assert_eq!(s, r#"{"a":1,"z":{"x":2,"y":1}}"#);
    }
}
