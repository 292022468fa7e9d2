//! Metrics collection.
//!
//! # Metrics
//! - `stark_client_rpc_requests_total` (counter): node requests by method, outcome
//! - `stark_client_transactions_total` (counter): waited transactions by outcome
//!
//! # Design Decisions
//! - Only the `metrics` facade is used; without an installed recorder every
//!   update is a no-op, so a host application decides on exposition

/// Record one node request.
pub fn record_rpc_request(method: &'static str, outcome: &'static str) {
    metrics::counter!(
        "stark_client_rpc_requests_total",
        "method" => method,
        "outcome" => outcome
    )
    .increment(1);
}

/// Record the terminal outcome of a transaction wait.
pub fn record_transaction(outcome: &'static str) {
    metrics::counter!("stark_client_transactions_total", "outcome" => outcome).increment(1);
}
