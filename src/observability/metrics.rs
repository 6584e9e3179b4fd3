//! Metrics collection and exposition.
//!
//! # Metrics
//! - `bridge_requests_total` (counter): finished requests by outcome
//! - `bridge_request_duration_seconds` (histogram): latency by outcome
//! - `bridge_admission_rejected_total` (counter): admission timeouts
//! - `bridge_admission_in_use` (gauge): admitted requests right now
//! - `bridge_pending_slots` (gauge): requests waiting for a response
//! - `bridge_events_evicted_total` (counter): push-queue load shedding
//! - `bridge_queue_depth` (gauge): buffered events by mode
//! - `bridge_responses_rejected_total` (counter): bad submissions by reason
//! - `bridge_handler_failures_total` (counter): handler errors/panics by kind
//!
//! # Design Decisions
//! - Facade calls are no-ops until `init_metrics` installs a recorder
//! - Labels are low-cardinality (outcome, mode, reason), never request ids

use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};
use std::net::SocketAddr;
use std::time::Instant;

/// Install the Prometheus recorder and its HTTP scrape listener.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    tracing::info!(address = %addr, "Metrics exporter listening");
    Ok(())
}

pub fn record_request(outcome: &'static str, start: Instant) {
    ::metrics::counter!("bridge_requests_total", "outcome" => outcome).increment(1);
    ::metrics::histogram!("bridge_request_duration_seconds", "outcome" => outcome)
        .record(start.elapsed().as_secs_f64());
}

pub fn record_admission_rejected() {
    ::metrics::counter!("bridge_admission_rejected_total").increment(1);
}

pub fn record_admission_in_use(in_use: usize) {
    ::metrics::gauge!("bridge_admission_in_use").set(in_use as f64);
}

pub fn record_pending_slots(delta: i64) {
    let gauge = ::metrics::gauge!("bridge_pending_slots");
    if delta >= 0 {
        gauge.increment(delta as f64);
    } else {
        gauge.decrement((-delta) as f64);
    }
}

pub fn record_event_evicted() {
    ::metrics::counter!("bridge_events_evicted_total").increment(1);
}

pub fn record_queue_depth(mode: &'static str, depth: usize) {
    ::metrics::gauge!("bridge_queue_depth", "mode" => mode).set(depth as f64);
}

pub fn record_response_rejected(reason: &'static str) {
    ::metrics::counter!("bridge_responses_rejected_total", "reason" => reason).increment(1);
}

pub fn record_handler_failure(kind: &'static str) {
    ::metrics::counter!("bridge_handler_failures_total", "kind" => kind).increment(1);
}
