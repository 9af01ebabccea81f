//! Intake HTTP service library target (§6).
//!
//! `main.rs` is kept thin: tracing init, state construction, middleware
//! attach, serve. Everything else lives here so scenario tests can build
//! the router in-process without a TCP socket.

pub mod api_types;
pub mod metrics_init;
pub mod routes;
pub mod state;
