//! Read-only invariant scan over the ledger (§4.6).
//!
//! Runs in its own transaction so it never blocks or is blocked by the
//! intake/worker write paths, and never mutates anything itself.

use anyhow::Result;
use sqlx::PgPool;

/// Outcome of one reconciliation pass. A clean pass has `imbalance == 0` and
/// `negative_balance_count == 0`; any other combination means an invariant
/// that should be impossible by construction was violated somewhere
/// upstream, and is worth paging on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReconciliationReport {
    pub ledger_imbalance: i64,
    pub negative_balance_count: i64,
}

impl ReconciliationReport {
    pub fn is_clean(&self) -> bool {
        self.ledger_imbalance == 0 && self.negative_balance_count == 0
    }
}

/// Run one reconciliation pass and record the outcome on the worker's
/// metrics (§4.11). Call this on a fixed interval from the worker's main
/// loop (§4.6 "Reconciliation interval").
pub async fn reconcile_once(pool: &PgPool) -> Result<ReconciliationReport> {
    let mut tx = pool.begin().await?;
    let ledger_imbalance = ledger_db::reconcile::ledger_imbalance(&mut *tx).await;
    let negative_balance_count = ledger_db::reconcile::negative_balance_count(&mut *tx).await;
    tx.rollback().await.ok();

    let ledger_imbalance = ledger_imbalance?;
    let negative_balance_count = negative_balance_count?;

    let report = ReconciliationReport {
        ledger_imbalance,
        negative_balance_count,
    };

    if report.ledger_imbalance != 0 {
        tracing::error!(imbalance = report.ledger_imbalance, "ledger imbalance detected");
        metrics::counter!("ledger_imbalance_total").increment(1);
    }
    if report.negative_balance_count > 0 {
        tracing::error!(
            count = report.negative_balance_count,
            "negative account balance detected"
        );
        metrics::counter!("negative_balance_detected_total").increment(1);
    }
    if !report.is_clean() {
        metrics::counter!("invariant_violation_total").increment(1);
    }

    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clean_report_has_zero_imbalance_and_zero_negatives() {
        let report = ReconciliationReport {
            ledger_imbalance: 0,
            negative_balance_count: 0,
        };
        assert!(report.is_clean());
    }

    #[test]
    fn nonzero_imbalance_is_not_clean() {
        let report = ReconciliationReport {
            ledger_imbalance: 5,
            negative_balance_count: 0,
        };
        assert!(!report.is_clean());
    }

    #[test]
    fn negative_balance_count_is_not_clean() {
        let report = ReconciliationReport {
            ledger_imbalance: 0,
            negative_balance_count: 1,
        };
        assert!(!report.is_clean());
    }
}
