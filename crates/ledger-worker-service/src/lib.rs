//! Settlement worker library target: the outbox-drain loop and the
//! periodic reconciliation tick (§4.3, §4.4, §4.6).

pub mod batch;
pub mod metrics_init;
pub mod reconcile_loop;
