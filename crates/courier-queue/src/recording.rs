// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Job outcome metrics.
//!
//! Uses the metrics-rs facade so any installed recorder can collect these.

use metrics::{describe_counter, describe_histogram};

/// Register metric descriptions. Call once at startup after installing a recorder.
pub fn register_metrics() {
    describe_counter!("courier_jobs_completed_total", "Jobs that finished successfully");
    describe_counter!(
        "courier_jobs_failed_total",
        "Failed job attempts, including ones that will be retried"
    );
    describe_counter!("courier_jobs_dead_total", "Jobs moved to the dead state");
    describe_histogram!(
        "courier_job_duration_seconds",
        "Handler execution time in seconds"
    );
}

pub fn record_completed(queue: &str) {
    metrics::counter!("courier_jobs_completed_total", "queue" => queue.to_string()).increment(1);
}

pub fn record_failed(queue: &str) {
    metrics::counter!("courier_jobs_failed_total", "queue" => queue.to_string()).increment(1);
}

pub fn record_dead(queue: &str) {
    metrics::counter!("courier_jobs_dead_total", "queue" => queue.to_string()).increment(1);
}

pub fn record_duration(queue: &str, seconds: f64) {
    metrics::histogram!("courier_job_duration_seconds", "queue" => queue.to_string())
        .record(seconds);
}
