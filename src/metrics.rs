// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Metrics instrumentation for view-sync.
//!
//! Uses the `metrics` crate for backend-agnostic metrics collection.
//! The embedding application is responsible for choosing the exporter.
//!
//! # Metric Naming Convention
//! - `view_sync_` prefix for all metrics
//! - `_total` suffix for counters
//! - `_seconds` suffix for duration histograms
//!
//! # Labels
//! - `pass`: init, update
//! - `edge`: immediate, leading, trailing, flush
//! - `reason`: destroyed, host_not_ready

use metrics::{counter, gauge, histogram};
use std::time::{Duration, Instant};

/// Record the outcome of a sync pass
pub fn record_sync(pass: &str, outcome: &str) {
    counter!(
        "view_sync_passes_total",
        "pass" => pass.to_string(),
        "outcome" => outcome.to_string()
    )
    .increment(1);
}

/// Record a pass that was skipped before any diffing
pub fn record_skip(pass: &str, reason: &str) {
    counter!(
        "view_sync_skipped_total",
        "pass" => pass.to_string(),
        "reason" => reason.to_string()
    )
    .increment(1);
}

/// Record how many field paths a diff produced
pub fn record_patch_entries(pass: &str, entries: usize) {
    histogram!(
        "view_sync_patch_entries",
        "pass" => pass.to_string()
    )
    .record(entries as f64);
}

/// Record how many records a full flatten produced
pub fn record_snapshot_records(count: usize) {
    histogram!("view_sync_snapshot_records").record(count as f64);
}

/// Record pass latency (flatten + diff + hand-off)
pub fn record_latency(pass: &str, duration: Duration) {
    histogram!(
        "view_sync_pass_seconds",
        "pass" => pass.to_string()
    )
    .record(duration.as_secs_f64());
}

/// Record a host delivery
pub fn record_delivery(edge: &str) {
    counter!(
        "view_sync_deliveries_total",
        "edge" => edge.to_string()
    )
    .increment(1);
}

/// Record a failed host delivery
pub fn record_delivery_error(edge: &str) {
    counter!(
        "view_sync_delivery_errors_total",
        "edge" => edge.to_string()
    )
    .increment(1);
}

/// Record a submission merged into the pending buffer instead of delivered
pub fn record_coalesced() {
    counter!("view_sync_coalesced_total").increment(1);
}

/// Set the size of the pending (undelivered) buffer
pub fn set_pending_entries(count: usize) {
    gauge!("view_sync_pending_entries").set(count as f64);
}

/// RAII timer that records pass latency on drop
pub struct LatencyTimer {
    pass: &'static str,
    start: Instant,
}

impl LatencyTimer {
    /// Start a new latency timer
    pub fn new(pass: &'static str) -> Self {
        Self {
            pass,
            start: Instant::now(),
        }
    }
}

impl Drop for LatencyTimer {
    fn drop(&mut self) {
        record_latency(self.pass, self.start.elapsed());
    }
}
